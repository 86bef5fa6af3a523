//! Plain-text frame rendering for the CLI

use std::fmt::Write;

use super::data::Frame;

/// Render a frame as an aligned text table, followed by its notices
pub fn render(frame: &Frame) -> String {
    let mut out = String::new();
    if frame.fields.is_empty() {
        out.push_str("(no fields)\n");
    } else {
        let headers: Vec<String> = frame.fields.iter().map(|f| f.display_name()).collect();
        let rows = frame.fields.iter().map(|f| f.len()).max().unwrap_or(0);

        let cells: Vec<Vec<String>> = (0..rows)
            .map(|row| {
                frame
                    .fields
                    .iter()
                    .map(|f| f.get(row).map(|v| v.to_text()).unwrap_or_else(|| "null".to_string()))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                cells
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_row(&mut out, &headers, &widths);
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(total));
        out.push('\n');
        for row in &cells {
            write_row(&mut out, row, &widths);
        }
    }

    for notice in frame.notices() {
        let _ = writeln!(out, "[{:?}] {}", notice.severity, notice.text);
    }
    out
}

fn write_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Field, FieldType, Notice, Value};

    #[test]
    fn test_render_table() {
        let mut name = Field::new("name", FieldType::NullableString, 2);
        name.set(0, Some(Value::String("alpha".to_string()))).unwrap();
        let mut count = Field::new("count", FieldType::NullableInt64, 2);
        count.set(0, Some(Value::Int64(7))).unwrap();
        count.set(1, Some(Value::Int64(12))).unwrap();

        let mut frame = Frame::new("").with_fields(vec![name, count]);
        frame.append_notices(vec![Notice::warning("partial")]);

        let text = render(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "name   count");
        assert_eq!(lines[1], "------------");
        assert_eq!(lines[2], "alpha  7");
        assert_eq!(lines[3], "null   12");
        assert_eq!(lines[4], "[Warning] partial");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&Frame::new("")), "(no fields)\n");
    }
}
