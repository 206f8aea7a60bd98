//! Counter configuration.
//!
//! [`CounterConfig`] is a plain struct with defaulted fields. It can be built
//! with the `with_*` setters or, with the `serde` feature, deserialized from
//! any serde format. Validation happens once, when the counter is created.
//!
//! | Field           | Default               | Notes                          |
//! |-----------------|-----------------------|--------------------------------|
//! | `shard_count`   | 32                    | values below 1 are ignored     |
//! | `size_hint`     | 64                    | values below 1 are ignored     |
//! | `time_format`   | `%Y-%m-%d %H:%M:%S`   | strftime layout, readable back |
//! | `time_location` | `UTC`                 | IANA zone name                 |
//! | `separator`     | `\|`                  | non-empty                      |
//!
//! # Example
//!
//! ```rust
//! use dimcount::CounterConfig;
//!
//! let config = CounterConfig::default()
//!     .with_shard_count(64)
//!     .with_time_format("%d %b %y %H:%M %z")
//!     .with_time_location("Europe/Rome");
//!
//! assert!(config.key_format().is_ok());
//! ```

use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use chrono_tz::Tz;

use crate::codec::{KeyFormat, DEFAULT_SEPARATOR, DEFAULT_TIME_FORMAT};
use crate::error::{Error, Result};
use crate::table::{DEFAULT_SHARD_COUNT, DEFAULT_SIZE_HINT};

// 2014-02-04 12:34:56 UTC
const REFERENCE_SECS: i64 = 1_391_517_296;

/// Construction options for a [`Counter`](crate::Counter).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CounterConfig {
    /// Number of table shards.
    pub shard_count: usize,
    /// Initial capacity hint for the whole table.
    pub size_hint: usize,
    /// strftime layout for timestamp dimensions. Timestamps that render to
    /// the same text share a key.
    pub time_format: String,
    /// IANA name of the zone timestamps are rendered in.
    pub time_location: String,
    /// Separator of the textual key form.
    pub separator: String,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            shard_count: DEFAULT_SHARD_COUNT,
            size_hint: DEFAULT_SIZE_HINT,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            time_location: "UTC".to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl CounterConfig {
    /// Sets the shard count. Values below 1 keep the current setting.
    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        if shard_count >= 1 {
            self.shard_count = shard_count;
        }
        self
    }

    /// Sets the size hint. Values below 1 keep the current setting.
    pub fn with_size_hint(mut self, size_hint: usize) -> Self {
        if size_hint >= 1 {
            self.size_hint = size_hint;
        }
        self
    }

    /// Sets the timestamp layout.
    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    /// Sets the time zone by IANA name.
    pub fn with_time_location(mut self, time_location: impl Into<String>) -> Self {
        self.time_location = time_location.into();
        self
    }

    /// Sets the textual key separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Validates the textual settings and resolves the time zone.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the time format is empty, malformed or cannot be
    /// read back into a timestamp, the time location is empty or unknown, or
    /// the separator is empty.
    pub fn key_format(&self) -> Result<KeyFormat> {
        if self.time_format.is_empty() {
            return Err(Error::Config("empty time format string".to_string()));
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::Config(format!(
                "invalid time format string {:?}",
                self.time_format
            )));
        }
        if self.time_location.is_empty() {
            return Err(Error::Config("empty time location string".to_string()));
        }
        let time_zone: Tz = self
            .time_location
            .parse()
            .map_err(|e| Error::Config(format!("time location - {e}")))?;
        if self.separator.is_empty() {
            return Err(Error::Config(
                "custom separator cannot be empty string".to_string(),
            ));
        }

        let format = KeyFormat {
            separator: self.separator.clone(),
            time_format: self.time_format.clone(),
            time_zone,
        };
        let reference = DateTime::from_timestamp(REFERENCE_SECS, 0)
            .ok_or_else(|| Error::Config("reference time out of range".to_string()))?;
        format.bucket(&reference).map_err(|reason| {
            Error::Config(format!(
                "time format {:?} cannot be read back - {reason}",
                self.time_format
            ))
        })?;
        Ok(format)
    }
}
