//! Time-series schema detection and long-to-wide reshaping
//!
//! A frame is *long* when it has a time field, at least one value field
//! (numeric or bool) and at least one string factor field. Long frames hold
//! one row per observation; `long_to_wide` turns them into one value field
//! per distinct (value column, factor tuple), with null for missing cells.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::data::Frame;
use super::error::{FrameError, FrameResult};
use super::field::{Field, FieldType, FieldValues, Labels, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSeriesType {
    /// No time field or no value field
    Not,
    /// Time, values and string factors
    Long,
    /// Time and values only
    Wide,
}

/// Roles of the fields of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesSchema {
    pub kind: TimeSeriesType,
    pub time_index: Option<usize>,
    pub value_indices: Vec<usize>,
    pub factor_indices: Vec<usize>,
}

impl TimeSeriesSchema {
    /// Classify the fields of a frame; the first time field is the time axis
    pub fn of(frame: &Frame) -> Self {
        let mut time_index = None;
        let mut value_indices = Vec::new();
        let mut factor_indices = Vec::new();

        for (i, field) in frame.fields.iter().enumerate() {
            let field_type = field.field_type();
            if field_type.is_time() {
                if time_index.is_none() {
                    time_index = Some(i);
                }
            } else if field_type.is_numeric() || field_type == FieldType::NullableBool {
                value_indices.push(i);
            } else if field_type == FieldType::NullableString {
                factor_indices.push(i);
            }
        }

        let kind = if time_index.is_none() || value_indices.is_empty() {
            TimeSeriesType::Not
        } else if factor_indices.is_empty() {
            TimeSeriesType::Wide
        } else {
            TimeSeriesType::Long
        };

        Self {
            kind,
            time_index,
            value_indices,
            factor_indices,
        }
    }
}

/// Convert a long frame into a wide one
///
/// The time axis becomes the distinct timestamps of the input, which must be
/// ascending and non-null. Value fields appear in order of first appearance.
pub fn long_to_wide(frame: &Frame) -> FrameResult<Frame> {
    let schema = TimeSeriesSchema::of(frame);
    let time_index = match (schema.kind, schema.time_index) {
        (TimeSeriesType::Long, Some(i)) => i,
        _ => {
            return Err(FrameError::Reshape(
                "input frame is not a long time series".to_string(),
            ))
        }
    };
    let rows = frame.row_len()?;
    let time_field = &frame.fields[time_index];

    let mut times: Vec<DateTime<Utc>> = Vec::new();
    let mut slots = Vec::with_capacity(rows);
    for row in 0..rows {
        let t = match time_field.get(row) {
            Some(Value::Time(t)) => t,
            _ => {
                return Err(FrameError::Reshape(
                    "input has null time values".to_string(),
                ))
            }
        };
        match times.last() {
            Some(last) if t < *last => {
                return Err(FrameError::Reshape(
                    "long series must be sorted ascending by time".to_string(),
                ))
            }
            Some(last) if t == *last => {}
            _ => times.push(t),
        }
        slots.push(times.len() - 1);
    }

    let width = times.len();
    let mut fields = vec![Field::from_values(
        time_field.name.clone(),
        FieldValues::Time(times),
    )];
    let mut positions: HashMap<(usize, Labels), usize> = HashMap::new();

    for (row, slot) in slots.iter().enumerate() {
        let labels: Labels = schema
            .factor_indices
            .iter()
            .map(|&i| {
                let factor = &frame.fields[i];
                let value = factor.get(row).map(|v| v.to_text()).unwrap_or_default();
                (factor.name.clone(), value)
            })
            .collect();

        for &value_index in &schema.value_indices {
            let source = &frame.fields[value_index];
            let key = (value_index, labels.clone());
            let position = match positions.get(&key) {
                Some(p) => *p,
                None => {
                    let mut field = Field::new(
                        source.name.clone(),
                        source.field_type().nullable(),
                        width,
                    )
                    .with_labels(labels.clone());
                    field.config = source.config.clone();
                    fields.push(field);
                    positions.insert(key, fields.len() - 1);
                    fields.len() - 1
                }
            };
            fields[position].set(*slot, source.get(row))?;
        }
    }

    Ok(Frame {
        name: frame.name.clone(),
        fields,
        meta: frame.meta.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(minute: u32) -> Value {
        Value::Time(Utc.with_ymd_and_hms(2020, 8, 8, 1, minute, 0).unwrap())
    }

    fn long_frame(rows: &[(u32, &str, f64)]) -> Frame {
        let mut time = Field::new("time", FieldType::NullableTime, rows.len());
        let mut host = Field::new("host", FieldType::NullableString, rows.len());
        let mut value = Field::new("value", FieldType::NullableFloat64, rows.len());
        for (i, (minute, name, v)) in rows.iter().enumerate() {
            time.set(i, Some(ts(*minute))).unwrap();
            host.set(i, Some(Value::String(name.to_string()))).unwrap();
            value.set(i, Some(Value::Float64(*v))).unwrap();
        }
        Frame::new("").with_fields(vec![time, host, value])
    }

    #[test]
    fn test_schema_detection() {
        let frame = long_frame(&[(0, "a", 1.0)]);
        let schema = TimeSeriesSchema::of(&frame);
        assert_eq!(schema.kind, TimeSeriesType::Long);
        assert_eq!(schema.time_index, Some(0));
        assert_eq!(schema.value_indices, vec![2]);
        assert_eq!(schema.factor_indices, vec![1]);

        let wide = Frame::new("").with_fields(vec![
            Field::new("time", FieldType::Time, 1),
            Field::new("v", FieldType::NullableInt64, 1),
        ]);
        assert_eq!(TimeSeriesSchema::of(&wide).kind, TimeSeriesType::Wide);

        let table = Frame::new("").with_fields(vec![Field::new("v", FieldType::NullableInt64, 1)]);
        assert_eq!(TimeSeriesSchema::of(&table).kind, TimeSeriesType::Not);
    }

    #[test]
    fn test_long_to_wide_fills_gaps() {
        let frame = long_frame(&[(0, "zeus", 1.0), (0, "apollo", 2.0), (1, "zeus", 3.0)]);
        let wide = long_to_wide(&frame).unwrap();

        assert_eq!(wide.fields.len(), 3);
        assert_eq!(wide.row_len().unwrap(), 2);
        assert_eq!(wide.fields[0].field_type(), FieldType::Time);

        let zeus = &wide.fields[1];
        assert_eq!(zeus.name, "value");
        assert_eq!(zeus.labels.get("host").map(String::as_str), Some("zeus"));
        assert_eq!(zeus.get(0), Some(Value::Float64(1.0)));
        assert_eq!(zeus.get(1), Some(Value::Float64(3.0)));

        let apollo = &wide.fields[2];
        assert_eq!(apollo.labels.get("host").map(String::as_str), Some("apollo"));
        assert_eq!(apollo.get(0), Some(Value::Float64(2.0)));
        assert_eq!(apollo.get(1), None);
    }

    #[test]
    fn test_long_to_wide_rejects_unsorted() {
        let frame = long_frame(&[(1, "a", 1.0), (0, "a", 2.0)]);
        assert!(matches!(long_to_wide(&frame), Err(FrameError::Reshape(_))));
    }

    #[test]
    fn test_long_to_wide_rejects_null_time() {
        let mut frame = long_frame(&[(0, "a", 1.0), (1, "a", 2.0)]);
        frame.fields[0].set(1, None).unwrap();
        let err = long_to_wide(&frame).unwrap_err();
        assert_eq!(
            err,
            FrameError::Reshape("input has null time values".to_string())
        );
    }

    #[test]
    fn test_long_to_wide_requires_long_input() {
        let frame = Frame::new("").with_fields(vec![Field::new("v", FieldType::NullableInt64, 1)]);
        assert!(long_to_wide(&frame).is_err());
    }
}
