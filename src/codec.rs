//! Composite key encoding.
//!
//! A [`KeyCodec`] turns an ordered tuple of [`Value`]s into an [`EncodedKey`]
//! and back. The stored key is a canonical tagged byte string, so no dimension
//! value can ever be confused with a field boundary:
//!
//! ```text
//!   Int64      'i' | 8 bytes big-endian
//!   Timestamp  't' | 8 bytes big-endian Unix seconds
//!   String     's' | 4 bytes big-endian length | UTF-8 bytes
//! ```
//!
//! Timestamps are stored as the start of their layout bucket: the value is
//! rendered with the configured strftime layout in the configured zone and
//! read back, so with a date-only layout every instant of a local day shares
//! one key. The default layout buckets by whole seconds.
//!
//! The codec also owns the textual form of a key (fields joined by a
//! separator, timestamps rendered with the layout in the zone), used for
//! display and for parsing keys coming from text sources. Only that textual
//! surface is subject to separator collisions: a string value containing the
//! separator renders fine but cannot be parsed back.

use std::fmt::{self, Debug, Write};
use std::sync::Arc;

use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{Error, Result};
use crate::schema::{FieldSchema, FieldType};
use crate::value::Value;

const TAG_INT64: u8 = b'i';
const TAG_STRING: u8 = b's';
const TAG_TIMESTAMP: u8 = b't';

/// Default separator of the textual key form.
pub const DEFAULT_SEPARATOR: &str = "|";

/// Default strftime layout for timestamps (`YYYY-MM-DD HH:MM:SS`).
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn tag_of(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Int64 => TAG_INT64,
        FieldType::String => TAG_STRING,
        FieldType::Timestamp => TAG_TIMESTAMP,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// An encoded composite key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedKey(Box<[u8]>);

impl EncodedKey {
    /// Wraps raw bytes as a key without validation.
    ///
    /// Keys built this way are checked only when decoded.
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        EncodedKey(bytes.into())
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the key length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the key holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for EncodedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedKey({})", hex(&self.0))
    }
}

/// Textual key settings: separator, timestamp layout and time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFormat {
    /// Separator placed between fields.
    pub separator: String,
    /// strftime layout used to render and parse timestamps.
    pub time_format: String,
    /// Zone timestamps are rendered in and parsed from.
    pub time_zone: Tz,
}

impl Default for KeyFormat {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            time_zone: Tz::UTC,
        }
    }
}

impl KeyFormat {
    /// Renders `ts` with the layout in the configured zone.
    pub fn render_time(&self, ts: &DateTime<Utc>) -> Result<String> {
        let mut out = String::new();
        write!(
            out,
            "{}",
            ts.with_timezone(&self.time_zone).format(&self.time_format)
        )
        .map_err(|_| Error::Config(format!("invalid time format {:?}", self.time_format)))?;
        Ok(out)
    }

    /// Returns the start of the layout bucket holding `ts`.
    ///
    /// On a repeated local hour the later reading is kept when it does not
    /// pass `ts`, so an instant never moves into the previous bucket.
    pub(crate) fn bucket(
        &self,
        ts: &DateTime<Utc>,
    ) -> std::result::Result<DateTime<Utc>, String> {
        let text = self.render_time(ts).map_err(|e| e.to_string())?;
        self.read_time(&text, Some(*ts))
    }

    /// Reads a timestamp written with the layout.
    ///
    /// An explicit offset in the text wins over the configured zone. Layouts
    /// without a time of day read as midnight. A local time skipped by a
    /// zone transition reads as one hour later.
    pub(crate) fn read_time(
        &self,
        text: &str,
        not_after: Option<DateTime<Utc>>,
    ) -> std::result::Result<DateTime<Utc>, String> {
        let layout = self.time_format.as_str();
        if let Ok(ts) = DateTime::parse_from_str(text, layout) {
            return Ok(ts.with_timezone(&Utc));
        }

        let naive = match NaiveDateTime::parse_from_str(text, layout) {
            Ok(naive) => naive,
            Err(err) => match NaiveDate::parse_from_str(text, layout) {
                Ok(date) => date.and_time(NaiveTime::MIN),
                Err(_) => return Err(err.to_string()),
            },
        };

        let resolved = match self.time_zone.from_local_datetime(&naive) {
            LocalResult::Single(ts) => Some(ts),
            LocalResult::Ambiguous(early, late) => match not_after {
                Some(limit) if late.with_timezone(&Utc) <= limit => Some(late),
                _ => Some(early),
            },
            LocalResult::None => naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|shifted| self.time_zone.from_local_datetime(&shifted).earliest()),
        };
        resolved
            .map(|ts| ts.with_timezone(&Utc))
            .ok_or_else(|| format!("no such local time in {}", self.time_zone.name()))
    }
}

/// Encodes and decodes composite keys for a given [`FieldSchema`].
#[derive(Debug, Clone)]
pub struct KeyCodec {
    schema: Arc<FieldSchema>,
    format: KeyFormat,
}

impl KeyCodec {
    /// Creates a codec for `schema` with the given textual format.
    pub fn new(schema: Arc<FieldSchema>, format: KeyFormat) -> Self {
        Self { schema, format }
    }

    /// Returns the schema this codec validates against.
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Returns the textual key format.
    pub fn format(&self) -> &KeyFormat {
        &self.format
    }

    /// Checks arity and per-position types without encoding.
    pub fn validate(&self, values: &[Value]) -> Result<()> {
        let fields = self.schema.dimensions();
        if values.len() != fields.len() {
            return Err(Error::Arity {
                expected: fields.len(),
                actual: values.len(),
            });
        }
        for (field, value) in fields.iter().zip(values) {
            if field.field_type() != value.field_type() {
                return Err(Error::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.field_type(),
                    actual: value.field_type(),
                });
            }
        }
        Ok(())
    }

    /// Encodes `values` in field order.
    ///
    /// Timestamps are replaced by the start of their layout bucket, in whole
    /// seconds.
    ///
    /// # Errors
    ///
    /// [`Error::Arity`] or [`Error::TypeMismatch`] when `values` does not
    /// match the schema, [`Error::Parse`] when a timestamp rendered with the
    /// layout cannot be read back.
    pub fn encode(&self, values: &[Value]) -> Result<EncodedKey> {
        self.validate(values)?;

        let fields = self.schema.dimensions();
        let mut buf = Vec::with_capacity(values.len() * 9);
        for (position, (field, value)) in fields.iter().zip(values).enumerate() {
            match value {
                Value::Int64(v) => {
                    buf.push(TAG_INT64);
                    buf.extend_from_slice(&v.to_be_bytes());
                }
                Value::Timestamp(ts) => {
                    let start = self
                        .format
                        .bucket(ts)
                        .map_err(|reason| Error::parse(position, ts.to_rfc3339(), reason))?;
                    buf.push(TAG_TIMESTAMP);
                    buf.extend_from_slice(&start.timestamp().to_be_bytes());
                }
                Value::String(s) => {
                    let len = u32::try_from(s.len()).map_err(|_| Error::Oversized {
                        field: field.name().to_string(),
                        len: s.len(),
                    })?;
                    buf.push(TAG_STRING);
                    buf.extend_from_slice(&len.to_be_bytes());
                    buf.extend_from_slice(s.as_bytes());
                }
            }
        }
        Ok(EncodedKey(buf.into_boxed_slice()))
    }

    /// Decodes a key back into typed values in field order.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] naming the position and offending bytes when the key
    /// is truncated, carries an unexpected tag, holds invalid UTF-8 or an
    /// out-of-range timestamp, or has trailing bytes.
    pub fn decode(&self, key: &EncodedKey) -> Result<Vec<Value>> {
        let fields = self.schema.dimensions();
        let mut values = Vec::with_capacity(fields.len());
        let mut rest = key.as_bytes();

        for (position, field) in fields.iter().enumerate() {
            let segment = rest;
            let fail = |reason: &str| Error::parse(position, hex(segment), reason);

            let (&tag, payload) = rest.split_first().ok_or_else(|| fail("truncated key"))?;
            if tag != tag_of(field.field_type()) {
                return Err(fail(&format!(
                    "unexpected tag {:?} for {} field {}",
                    tag as char,
                    field.field_type(),
                    field.name()
                )));
            }

            match field.field_type() {
                FieldType::Int64 => {
                    let (bytes, tail) = take8(payload).ok_or_else(|| fail("truncated int64"))?;
                    values.push(Value::Int64(i64::from_be_bytes(bytes)));
                    rest = tail;
                }
                FieldType::Timestamp => {
                    let (bytes, tail) =
                        take8(payload).ok_or_else(|| fail("truncated timestamp"))?;
                    let secs = i64::from_be_bytes(bytes);
                    let ts = DateTime::<Utc>::from_timestamp(secs, 0)
                        .ok_or_else(|| fail("timestamp out of range"))?;
                    values.push(Value::Timestamp(ts));
                    rest = tail;
                }
                FieldType::String => {
                    if payload.len() < 4 {
                        return Err(fail("truncated string length"));
                    }
                    let (len, tail) = payload.split_at(4);
                    let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
                    if tail.len() < len {
                        return Err(fail("truncated string"));
                    }
                    let (bytes, tail) = tail.split_at(len);
                    let s = std::str::from_utf8(bytes).map_err(|e| fail(&e.to_string()))?;
                    values.push(Value::String(s.to_string()));
                    rest = tail;
                }
            }
        }

        if !rest.is_empty() {
            return Err(Error::parse(fields.len(), hex(rest), "trailing bytes"));
        }
        Ok(values)
    }

    /// Renders a single value the way it appears in the textual key form.
    pub fn render_value(&self, value: &Value) -> Result<String> {
        match value {
            Value::Int64(v) => Ok(v.to_string()),
            Value::String(v) => Ok(v.clone()),
            Value::Timestamp(ts) => self.format.render_time(ts),
        }
    }

    /// Decodes a key and renders each value as in the textual key form.
    pub fn render_values(&self, key: &EncodedKey) -> Result<Vec<String>> {
        self.decode(key)?
            .iter()
            .map(|v| self.render_value(v))
            .collect()
    }

    /// Renders a key as separator-joined text.
    pub fn render(&self, key: &EncodedKey) -> Result<String> {
        Ok(self.render_values(key)?.join(&self.format.separator))
    }

    /// Parses separator-joined text into a key.
    ///
    /// # Errors
    ///
    /// [`Error::Parse`] when the text does not split into exactly one segment
    /// per dimension or a segment does not parse as its field type.
    pub fn parse(&self, text: &str) -> Result<EncodedKey> {
        let fields = self.schema.dimensions();
        let parts: Vec<&str> = text.split(self.format.separator.as_str()).collect();
        if parts.len() != fields.len() {
            return Err(Error::parse(
                0,
                text,
                format!(
                    "expected {} segments separated by {:?}, found {}",
                    fields.len(),
                    self.format.separator,
                    parts.len()
                ),
            ));
        }

        let values = fields
            .iter()
            .zip(parts)
            .enumerate()
            .map(|(position, (field, part))| match field.field_type() {
                FieldType::Int64 => part
                    .parse::<i64>()
                    .map(Value::Int64)
                    .map_err(|e| Error::parse(position, part, e.to_string())),
                FieldType::String => Ok(Value::String(part.to_string())),
                FieldType::Timestamp => self.parse_time(position, part).map(Value::Timestamp),
            })
            .collect::<Result<Vec<_>>>()?;

        self.encode(&values)
    }

    fn parse_time(&self, position: usize, part: &str) -> Result<DateTime<Utc>> {
        self.format
            .read_time(part, None)
            .map_err(|reason| Error::parse(position, part, reason))
    }
}

fn take8(bytes: &[u8]) -> Option<([u8; 8], &[u8])> {
    if bytes.len() < 8 {
        return None;
    }
    let (head, tail) = bytes.split_at(8);
    let mut out = [0u8; 8];
    out.copy_from_slice(head);
    Some((out, tail))
}
