//! Field schema: the ordered, typed dimension fields plus the metric field.
//!
//! The schema is fixed when a [`Counter`](crate::Counter) is built. It drives
//! type checking in the [`KeyCodec`](crate::codec::KeyCodec) and the column
//! layout of the exported [`RecordBatch`](arrow_array::RecordBatch).
//!
//! # Type codes
//!
//! | Codes (case-insensitive)     | Type                     |
//! |------------------------------|--------------------------|
//! | `i`, `int`, `int64`          | [`FieldType::Int64`]     |
//! | `s`, `str`, `string`         | [`FieldType::String`]    |
//! | `t`, `time`, `timestamp`     | [`FieldType::Timestamp`] |
//!
//! # Example
//!
//! ```rust
//! use dimcount::schema::{FieldSchema, FieldType};
//!
//! let schema = FieldSchema::build(&["event_time", "id", "host"], &["T", "i", "s"], "requests")
//!     .unwrap();
//!
//! assert_eq!(schema.len(), 3);
//! assert_eq!(schema.dimensions()[0].field_type(), FieldType::Timestamp);
//! assert_eq!(schema.metric().name(), "requests");
//! ```

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use arrow_schema::{DataType, Field as ArrowField, Schema, SchemaRef, TimeUnit};

use crate::error::{Error, Result};

/// The type of a dimension field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldType {
    /// Signed 64-bit integer.
    Int64,
    /// UTF-8 string.
    String,
    /// Point in time with one-second resolution.
    Timestamp,
}

impl FieldType {
    /// Returns the Arrow data type of a column holding this field.
    ///
    /// Timestamp columns carry the counter's time zone name.
    pub fn arrow_type(&self, time_zone: &str) -> DataType {
        match self {
            FieldType::Int64 => DataType::Int64,
            FieldType::String => DataType::Utf8,
            FieldType::Timestamp => DataType::Timestamp(TimeUnit::Second, Some(time_zone.into())),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int64 => f.write_str("int64"),
            FieldType::String => f.write_str("string"),
            FieldType::Timestamp => f.write_str("timestamp"),
        }
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(code: &str) -> std::result::Result<Self, Self::Err> {
        match code.to_ascii_lowercase().as_str() {
            "i" | "int" | "int64" => Ok(FieldType::Int64),
            "s" | "str" | "string" => Ok(FieldType::String),
            "t" | "time" | "timestamp" => Ok(FieldType::Timestamp),
            _ => Err(()),
        }
    }
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    field_type: FieldType,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Ordered dimension fields followed by a single Int64 metric field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Dimensions in order, then the metric as the last element.
    fields: Vec<Field>,
}

impl FieldSchema {
    /// Builds a schema from parallel lists of names and type codes.
    ///
    /// The metric field is always appended last with type Int64.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSchema`] if either list is empty or their lengths differ.
    /// - [`Error::InvalidType`] naming the first unrecognized type code.
    pub fn build<N, C>(names: &[N], type_codes: &[C], metric_name: &str) -> Result<Self>
    where
        N: AsRef<str>,
        C: AsRef<str>,
    {
        if names.is_empty() {
            return Err(Error::InvalidSchema("no field names provided".to_string()));
        }
        if type_codes.is_empty() {
            return Err(Error::InvalidSchema("no field types provided".to_string()));
        }
        if names.len() != type_codes.len() {
            return Err(Error::InvalidSchema(format!(
                "number of fields ({}) and number of field types ({}) mismatch",
                names.len(),
                type_codes.len()
            )));
        }

        let mut fields = Vec::with_capacity(names.len() + 1);
        for (position, (name, code)) in names.iter().zip(type_codes).enumerate() {
            let code = code.as_ref();
            let field_type = code.parse::<FieldType>().map_err(|_| Error::InvalidType {
                position,
                code: code.to_string(),
            })?;
            fields.push(Field::new(name.as_ref(), field_type));
        }
        fields.push(Field::new(metric_name, FieldType::Int64));

        Ok(Self { fields })
    }

    /// Returns the dimension fields in order.
    pub fn dimensions(&self) -> &[Field] {
        &self.fields[..self.fields.len() - 1]
    }

    /// Returns the metric field.
    pub fn metric(&self) -> &Field {
        &self.fields[self.fields.len() - 1]
    }

    /// Returns every field: dimensions followed by the metric.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the number of dimension fields.
    pub fn len(&self) -> usize {
        self.fields.len() - 1
    }

    /// Always `false`: a schema holds at least one dimension.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the position of the dimension named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.dimensions().iter().position(|f| f.name == name)
    }

    /// Returns the Arrow schema of exported batches.
    pub fn arrow_schema(&self, time_zone: &str) -> SchemaRef {
        let fields: Vec<ArrowField> = self
            .fields
            .iter()
            .map(|f| ArrowField::new(&f.name, f.field_type.arrow_type(time_zone), false))
            .collect();
        Arc::new(Schema::new(fields))
    }
}
