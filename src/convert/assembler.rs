//! Frame assembly
//!
//! Turns one `QueryOutput` into host frames. Layout is decided by the
//! columns: any time-series column produces one frame per (series column,
//! row), with the remaining scalar columns as labels; otherwise all columns
//! go into a single table frame, optionally reshaped from long to wide.
//!
//! Notices and `QueryResultMeta` are attached to the first frame only.

use tracing::{debug, warn};

use super::builder::FieldBuilder;
use super::error::AssembleError;
use super::parsers;
use crate::frame::{
    long_to_wide, Field, FieldType, Frame, Labels, Notice, TimeSeriesSchema, TimeSeriesType,
    Value,
};
use crate::models::{FormatOption, QueryResultMeta, QueryStatusMeta};
use crate::wire::{Datum, QueryOutput};

static MISSING: Datum = Datum {
    scalar_value: None,
    time_series_value: None,
    array_value: None,
    row_value: None,
    null_value: None,
};

/// A resolved column
struct Column {
    index: usize,
    name: String,
    builder: FieldBuilder,
}

/// Tracks the single cell-error notice of a response
#[derive(Default)]
struct CellErrors {
    notice: Option<Notice>,
}

impl CellErrors {
    fn record(&mut self, row: usize, column: usize) {
        if self.notice.is_none() {
            self.notice = Some(Notice::error(format!(
                "Error parsing: row:{}, column:{}",
                row, column
            )));
        }
    }
}

/// Build frames from one page of results
pub fn assemble(output: &QueryOutput, format: FormatOption) -> Result<Vec<Frame>, AssembleError> {
    let mut notices = Vec::new();
    let mut series_columns = Vec::new();
    let mut scalar_columns = Vec::new();

    for (index, info) in output.column_info.iter().enumerate() {
        let builder = match info.column_type().and_then(|t| FieldBuilder::resolve(&t)) {
            Ok(builder) => builder,
            Err(err) => {
                warn!(column = info.name(), index, error = %err, "dropping column");
                notices.push(Notice::warning(err.to_string()));
                continue;
            }
        };
        let column = Column {
            index,
            name: info.name().to_string(),
            builder,
        };
        if column.builder.is_time_series {
            series_columns.push(column);
        } else {
            scalar_columns.push(column);
        }
    }

    let mut cells = CellErrors::default();
    let has_series = !series_columns.is_empty();
    let mut frames = if has_series {
        series_frames(output, &series_columns, &scalar_columns, &mut cells)?
    } else {
        vec![table_frame(output, &scalar_columns, format, &mut cells)?]
    };
    notices.extend(cells.notice);

    debug!(
        rows = output.rows.len(),
        frames = frames.len(),
        has_series,
        "assembled frames"
    );

    if frames.is_empty() {
        frames.push(Frame::new(""));
    }
    let first = &mut frames[0];
    if !notices.is_empty() {
        first.append_notices(notices);
    }
    first.meta_mut().custom = Some(QueryResultMeta {
        query_id: output.query_id.clone().unwrap_or_default(),
        next_token: output.next_token.clone().unwrap_or_default(),
        has_series,
        status: output.query_status.as_ref().map(QueryStatusMeta::from),
        ..Default::default()
    });
    Ok(frames)
}

/// One frame per (series column, row), series columns outermost
fn series_frames(
    output: &QueryOutput,
    series_columns: &[Column],
    scalar_columns: &[Column],
    cells: &mut CellErrors,
) -> Result<Vec<Frame>, AssembleError> {
    let mut frames = Vec::with_capacity(series_columns.len() * output.rows.len());

    for column in series_columns {
        for (row_index, row) in output.rows.iter().enumerate() {
            let datum = row.data.get(column.index).unwrap_or(&MISSING);
            let points = match &datum.time_series_value {
                Some(points) => points.as_slice(),
                None if datum.is_null() => &[],
                None => return Err(AssembleError::MalformedSeries(column.index)),
            };

            let labels: Labels = scalar_columns
                .iter()
                .filter_map(|c| {
                    let value = row.data.get(c.index)?.scalar_value.as_ref()?;
                    Some((c.name.clone(), value.clone()))
                })
                .collect();

            let mut time = Field::new("time", FieldType::Time, points.len());
            let mut value = Field::new(column.name.clone(), column.builder.field_type, points.len())
                .with_labels(labels);

            for (i, point) in points.iter().enumerate() {
                match point.time.as_deref().map(parsers::timestamp) {
                    Some(Ok(t)) => {
                        if time.set(i, Some(Value::Time(t))).is_err() {
                            cells.record(row_index, column.index);
                        }
                    }
                    _ => cells.record(row_index, column.index),
                }
                let parsed = column
                    .builder
                    .parse(point.value.as_ref().unwrap_or(&MISSING))
                    .and_then(|v| value.set(i, v).map_err(Into::into));
                if parsed.is_err() {
                    cells.record(row_index, column.index);
                }
            }

            frames.push(Frame::new("").with_fields(vec![time, value]));
        }
    }
    Ok(frames)
}

/// A single frame with one field per column
fn table_frame(
    output: &QueryOutput,
    columns: &[Column],
    format: FormatOption,
    cells: &mut CellErrors,
) -> Result<Frame, AssembleError> {
    let length = output.rows.len();
    let mut fields = Vec::with_capacity(columns.len());

    for column in columns {
        let mut field = Field::new(column.name.clone(), column.builder.field_type, length);
        if let Some(config) = &column.builder.config {
            field.config = Some(config.clone());
        }
        for (i, row) in output.rows.iter().enumerate() {
            let datum = row.data.get(column.index).unwrap_or(&MISSING);
            let parsed = column
                .builder
                .parse(datum)
                .and_then(|v| field.set(i, v).map_err(Into::into));
            if parsed.is_err() {
                cells.record(i, column.index);
            }
        }
        fields.push(field);
    }

    let frame = Frame::new("").with_fields(fields);
    if length > 0
        && format == FormatOption::TimeSeries
        && TimeSeriesSchema::of(&frame).kind == TimeSeriesType::Long
    {
        return long_to_wide(&frame).map_err(AssembleError::Reshape);
    }
    Ok(frame)
}
