//! Unified error type for counter construction, key handling and export.
//!
//! Every fallible operation in this crate returns [`Result`], so callers
//! handle schema, codec and export failures through a single [`Error`] enum.
//!
//! # Example
//!
//! ```rust
//! use dimcount::{Counter, CounterConfig, Error};
//!
//! let counter = Counter::new(&["id"], &["i"], "hits", CounterConfig::default()).unwrap();
//!
//! match counter.increment(1, ("not-an-int",)) {
//!     Err(Error::TypeMismatch { field, .. }) => assert_eq!(field, "id"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use arrow_schema::ArrowError;
use thiserror::Error;

use crate::schema::FieldType;

/// Unified error type for all counter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong number of dimension values supplied.
    #[error("{actual} dimension values provided, want {expected}")]
    Arity {
        /// Number of dimension fields in the schema.
        expected: usize,
        /// Number of values supplied by the caller.
        actual: usize,
    },

    /// A supplied value's type disagrees with the declared field type.
    #[error("field type mismatch on {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// Declared type of the field.
        expected: FieldType,
        /// Type of the supplied value.
        actual: FieldType,
    },

    /// A string value too long to be encoded in a key.
    #[error("value of field {field} is {len} bytes long, exceeding the key limit")]
    Oversized {
        /// Name of the offending field.
        field: String,
        /// Length of the value in bytes.
        len: usize,
    },

    /// Unrecognized field type code at construction.
    #[error("invalid field type at position {position} - {code}")]
    InvalidType {
        /// Zero-based position of the offending code.
        position: usize,
        /// The code as supplied.
        code: String,
    },

    /// Field names and type codes do not describe a usable schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A stored or textual key could not be decoded.
    #[error("cannot parse key segment {position} ({segment:?}): {reason}")]
    Parse {
        /// Zero-based field position at which decoding failed.
        position: usize,
        /// The offending segment.
        segment: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Invalid configuration value.
    #[error("could not create counter - {0}")]
    Config(String),

    /// Error assembling the columnar batch.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error serializing a snapshot to JSON.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn parse(
        position: usize,
        segment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Parse {
            position,
            segment: segment.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, Error>;
