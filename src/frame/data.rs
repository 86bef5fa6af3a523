//! Frames and their metadata

use serde::Serialize;

use super::error::{FrameError, FrameResult};
use super::field::Field;
use crate::models::QueryResultMeta;

/// Severity of a notice shown next to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
    Warning,
    Error,
}

/// A non-fatal annotation attached to a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub text: String,
}

impl Notice {
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            text: text.into(),
        }
    }
}

/// A named numeric statistic about the query that produced a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub display_name: String,
    pub value: f64,
    pub unit: String,
}

/// Frame metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMeta {
    /// Query id, continuation token, timing and status of the backing query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<QueryResultMeta>,
    /// The query text after macro interpolation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_query_string: Option<String>,
    /// Stream path a host can subscribe to for further pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<Stat>,
}

/// A named set of equal-length fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<FrameMeta>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta: None,
        }
    }

    /// Builder method: set fields
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Number of rows, checking every field has the same length
    pub fn row_len(&self) -> FrameResult<usize> {
        let expected = match self.fields.first() {
            Some(field) => field.len(),
            None => return Ok(0),
        };
        for field in &self.fields {
            if field.len() != expected {
                return Err(FrameError::LengthMismatch {
                    name: field.name.clone(),
                    len: field.len(),
                    expected,
                });
            }
        }
        Ok(expected)
    }

    /// Metadata, created on first access
    pub fn meta_mut(&mut self) -> &mut FrameMeta {
        self.meta.get_or_insert_with(FrameMeta::default)
    }

    pub fn append_notices(&mut self, notices: impl IntoIterator<Item = Notice>) {
        self.meta_mut().notices.extend(notices);
    }

    /// Notices attached to this frame
    pub fn notices(&self) -> &[Notice] {
        self.meta
            .as_ref()
            .map(|m| m.notices.as_slice())
            .unwrap_or_default()
    }

    /// Custom query metadata, if any
    pub fn custom_meta(&self) -> Option<&QueryResultMeta> {
        self.meta.as_ref().and_then(|m| m.custom.as_ref())
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FieldType;

    #[test]
    fn test_row_len() {
        let frame = Frame::new("").with_fields(vec![
            Field::new("a", FieldType::NullableInt64, 3),
            Field::new("b", FieldType::NullableString, 3),
        ]);
        assert_eq!(frame.row_len().unwrap(), 3);

        let frame = Frame::new("").with_fields(vec![
            Field::new("a", FieldType::NullableInt64, 3),
            Field::new("b", FieldType::NullableString, 2),
        ]);
        assert!(matches!(
            frame.row_len(),
            Err(FrameError::LengthMismatch { len: 2, expected: 3, .. })
        ));

        assert_eq!(Frame::new("").row_len().unwrap(), 0);
    }

    #[test]
    fn test_notices_create_meta() {
        let mut frame = Frame::new("");
        assert!(frame.meta.is_none());
        assert!(frame.notices().is_empty());

        frame.append_notices(vec![Notice::warning("dropped column")]);
        assert_eq!(frame.notices().len(), 1);
        assert_eq!(frame.notices()[0].severity, NoticeSeverity::Warning);
    }

    #[test]
    fn test_serialize_skips_empty_meta_parts() {
        let mut frame = Frame::new("");
        frame.meta_mut().executed_query_string = Some("SELECT 1".to_string());

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["meta"]["executedQueryString"], "SELECT 1");
        assert!(json["meta"].get("notices").is_none());
        assert!(json["meta"].get("custom").is_none());
        assert_eq!(json["fields"].as_array().unwrap().len(), 0);
    }
}
