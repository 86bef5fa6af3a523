//! Typed field vectors
//!
//! A `Field` owns one `FieldValues` vector. All field types except `Time`
//! are nullable; `Time` is reserved for the time axis of a series.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::error::{FrameError, FrameResult};

/// Field-level labels (dimension name to value), ordered by key
pub type Labels = BTreeMap<String, String>;

/// In-memory type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Time,
    NullableTime,
    NullableBool,
    NullableInt32,
    NullableInt64,
    NullableFloat64,
    NullableString,
}

impl FieldType {
    /// True for the two time types
    pub fn is_time(&self) -> bool {
        matches!(self, FieldType::Time | FieldType::NullableTime)
    }

    /// True for the integer and floating point types
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::NullableInt32 | FieldType::NullableInt64 | FieldType::NullableFloat64
        )
    }

    /// The nullable counterpart of this type
    pub fn nullable(&self) -> FieldType {
        match self {
            FieldType::Time => FieldType::NullableTime,
            other => *other,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Time => "time",
            FieldType::NullableTime => "nullable time",
            FieldType::NullableBool => "nullable bool",
            FieldType::NullableInt32 => "nullable int32",
            FieldType::NullableInt64 => "nullable int64",
            FieldType::NullableFloat64 => "nullable float64",
            FieldType::NullableString => "nullable string",
        };
        f.write_str(name)
    }
}

/// One cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Time(DateTime<Utc>),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Time(_) => "time",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
        }
    }

    /// Plain text form, as used for labels and table cells
    pub fn to_text(&self) -> String {
        match self {
            Value::Time(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            Value::Bool(b) => b.to_string(),
            Value::Int32(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

/// Typed column storage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "camelCase")]
pub enum FieldValues {
    Time(Vec<DateTime<Utc>>),
    NullableTime(Vec<Option<DateTime<Utc>>>),
    NullableBool(Vec<Option<bool>>),
    NullableInt32(Vec<Option<i32>>),
    NullableInt64(Vec<Option<i64>>),
    NullableFloat64(Vec<Option<f64>>),
    NullableString(Vec<Option<String>>),
}

impl FieldValues {
    /// Allocate `len` empty cells; `Time` cells start at the epoch
    pub fn with_len(field_type: FieldType, len: usize) -> Self {
        match field_type {
            FieldType::Time => FieldValues::Time(vec![DateTime::<Utc>::default(); len]),
            FieldType::NullableTime => FieldValues::NullableTime(vec![None; len]),
            FieldType::NullableBool => FieldValues::NullableBool(vec![None; len]),
            FieldType::NullableInt32 => FieldValues::NullableInt32(vec![None; len]),
            FieldType::NullableInt64 => FieldValues::NullableInt64(vec![None; len]),
            FieldType::NullableFloat64 => FieldValues::NullableFloat64(vec![None; len]),
            FieldType::NullableString => FieldValues::NullableString(vec![None; len]),
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValues::Time(_) => FieldType::Time,
            FieldValues::NullableTime(_) => FieldType::NullableTime,
            FieldValues::NullableBool(_) => FieldType::NullableBool,
            FieldValues::NullableInt32(_) => FieldType::NullableInt32,
            FieldValues::NullableInt64(_) => FieldType::NullableInt64,
            FieldValues::NullableFloat64(_) => FieldType::NullableFloat64,
            FieldValues::NullableString(_) => FieldType::NullableString,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(v) => v.len(),
            FieldValues::NullableTime(v) => v.len(),
            FieldValues::NullableBool(v) => v.len(),
            FieldValues::NullableInt32(v) => v.len(),
            FieldValues::NullableInt64(v) => v.len(),
            FieldValues::NullableFloat64(v) => v.len(),
            FieldValues::NullableString(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one cell; `None` for nulls and out-of-range indices
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            FieldValues::Time(v) => v.get(index).copied().map(Value::Time),
            FieldValues::NullableTime(v) => v.get(index).copied().flatten().map(Value::Time),
            FieldValues::NullableBool(v) => v.get(index).copied().flatten().map(Value::Bool),
            FieldValues::NullableInt32(v) => v.get(index).copied().flatten().map(Value::Int32),
            FieldValues::NullableInt64(v) => v.get(index).copied().flatten().map(Value::Int64),
            FieldValues::NullableFloat64(v) => {
                v.get(index).copied().flatten().map(Value::Float64)
            }
            FieldValues::NullableString(v) => {
                v.get(index).cloned().flatten().map(Value::String)
            }
        }
    }

    /// Write one cell
    pub fn set(&mut self, index: usize, value: Option<Value>) -> FrameResult<()> {
        let len = self.len();
        if index >= len {
            return Err(FrameError::OutOfRange { index, len });
        }
        let field_type = self.field_type();
        let mismatch = |v: &Value| FrameError::TypeMismatch {
            field_type,
            value: v.kind(),
        };

        match (self, value) {
            (FieldValues::Time(_), None) => return Err(FrameError::NotNullable(field_type)),
            (FieldValues::Time(v), Some(Value::Time(t))) => v[index] = t,
            (FieldValues::NullableTime(v), None) => v[index] = None,
            (FieldValues::NullableTime(v), Some(Value::Time(t))) => v[index] = Some(t),
            (FieldValues::NullableBool(v), None) => v[index] = None,
            (FieldValues::NullableBool(v), Some(Value::Bool(b))) => v[index] = Some(b),
            (FieldValues::NullableInt32(v), None) => v[index] = None,
            (FieldValues::NullableInt32(v), Some(Value::Int32(i))) => v[index] = Some(i),
            (FieldValues::NullableInt64(v), None) => v[index] = None,
            (FieldValues::NullableInt64(v), Some(Value::Int64(i))) => v[index] = Some(i),
            (FieldValues::NullableFloat64(v), None) => v[index] = None,
            (FieldValues::NullableFloat64(v), Some(Value::Float64(f))) => v[index] = Some(f),
            (FieldValues::NullableString(v), None) => v[index] = None,
            (FieldValues::NullableString(v), Some(Value::String(s))) => v[index] = Some(s),
            (_, Some(other)) => return Err(mismatch(&other)),
        }
        Ok(())
    }
}

/// Field display configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldConfig {
    /// Free-form hints for the host (for example `displayMode`)
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl FieldConfig {
    /// Builder method: add a custom display hint
    pub fn custom(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

/// A named, typed column of a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(skip_serializing_if = "Labels::is_empty")]
    pub labels: Labels,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<FieldConfig>,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Field {
    /// Create a field of `len` empty cells
    pub fn new(name: impl Into<String>, field_type: FieldType, len: usize) -> Self {
        Self::from_values(name, FieldValues::with_len(field_type, len))
    }

    /// Wrap existing values
    pub fn from_values(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            labels: Labels::new(),
            config: None,
            values,
        }
    }

    /// Builder method: set labels
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Builder method: set display config
    pub fn with_config(mut self, config: FieldConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.values.field_type()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index)
    }

    pub fn set(&mut self, index: usize, value: Option<Value>) -> FrameResult<()> {
        self.values.set(index, value)
    }

    /// Name with labels appended, as shown in table headers
    pub fn display_name(&self) -> String {
        if self.labels.is_empty() {
            return self.name.clone();
        }
        let labels: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{} {{{}}}", self.name, labels.join(", "))
    }
}
