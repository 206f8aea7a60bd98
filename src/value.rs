//! Typed dimension values and conversions from Rust tuples.
//!
//! A [`Value`] is one component of a composite key. Counter operations accept
//! anything implementing [`IntoDimensions`], so call sites can pass plain
//! tuples whose element types mirror the schema:
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use dimcount::value::{IntoDimensions, Value};
//!
//! let ts = Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap();
//! let dims = (ts, 39, "HOST1").into_dimensions();
//!
//! assert_eq!(dims, vec![Value::Timestamp(ts), Value::Int64(39), Value::from("HOST1")]);
//! ```

use std::fmt::{self, Display};

use chrono::{DateTime, SubsecRound, TimeZone, Utc};

use crate::schema::FieldType;

/// A single typed dimension value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Signed 64-bit integer.
    Int64(i64),
    /// UTF-8 string.
    String(String),
    /// Point in time, normalized to UTC.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the schema type this value satisfies.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Int64(_) => FieldType::Int64,
            Value::String(_) => FieldType::String,
            Value::Timestamp(_) => FieldType::Timestamp,
        }
    }

    /// Returns the value as stored in a key: timestamps lose sub-second precision.
    pub fn truncated(self) -> Self {
        match self {
            Value::Timestamp(ts) => Value::Timestamp(ts.trunc_subsecs(0)),
            other => other,
        }
    }

    /// Returns the integer, if this is an [`Value::Int64`].
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string, if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a [`Value::Timestamp`].
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int64(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(v: $t) -> Self {
                    Value::Int64(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::Timestamp(v.with_timezone(&Utc))
    }
}

/// Conversion into an ordered list of dimension values.
///
/// Implemented for tuples of up to eight elements convertible into [`Value`],
/// for arrays and vectors of [`Value`] and for slices of [`Value`].
pub trait IntoDimensions {
    /// Converts `self` into dimension values in field order.
    fn into_dimensions(self) -> Vec<Value>;
}

impl IntoDimensions for Vec<Value> {
    fn into_dimensions(self) -> Vec<Value> {
        self
    }
}

impl IntoDimensions for &Vec<Value> {
    fn into_dimensions(self) -> Vec<Value> {
        self.clone()
    }
}

impl IntoDimensions for &[Value] {
    fn into_dimensions(self) -> Vec<Value> {
        self.to_vec()
    }
}

impl<const N: usize> IntoDimensions for [Value; N] {
    fn into_dimensions(self) -> Vec<Value> {
        self.into()
    }
}

macro_rules! impl_into_dimensions {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> IntoDimensions for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_dimensions(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

impl_into_dimensions!(A);
impl_into_dimensions!(A, B);
impl_into_dimensions!(A, B, C);
impl_into_dimensions!(A, B, C, D);
impl_into_dimensions!(A, B, C, D, E);
impl_into_dimensions!(A, B, C, D, E, F);
impl_into_dimensions!(A, B, C, D, E, F, G);
impl_into_dimensions!(A, B, C, D, E, F, G, H);
