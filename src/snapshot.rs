//! Serializable snapshots of counter contents.
//!
//! A [`CounterSnapshot`] captures every entry of a [`Counter`] with dimension
//! values rendered by the counter's [`KeyCodec`](crate::codec::KeyCodec), so it
//! can be written with any serde format. Like [`Counter::export`], taking a
//! snapshot is a best-effort sweep, not an isolated read.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature; [`CounterSnapshot::to_json`]
//! additionally requires `json`:
//!
//! ```toml
//! [dependencies]
//! dimcount = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use dimcount::{Counter, CounterConfig};
//!
//! let counter = Counter::new(&["host"], &["s"], "requests", CounterConfig::default())?;
//! counter.increment(42, ("web-1",))?;
//!
//! let snapshot = counter.snapshot()?;
//! assert_eq!(snapshot.get(&["web-1"]).map(|r| r.value), Some(42));
//!
//! let json = snapshot.to_json(false)?;
//! ```

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::counter::Counter;
use crate::error::Result;

/// One entry of a counter: rendered dimension values and the count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowSnapshot {
    /// Dimension values in field order, rendered as text.
    pub dimensions: Vec<String>,
    /// The count.
    pub value: i64,
}

/// A point-in-time capture of all entries of a counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Name of the metric field.
    pub metric: String,
    /// Names of the dimension fields, in order.
    pub fields: Vec<String>,
    /// One row per entry, sorted by dimension values.
    pub rows: Vec<RowSnapshot>,
}

impl CounterSnapshot {
    /// Captures every entry of `counter`.
    ///
    /// # Errors
    ///
    /// The first key that fails to decode aborts the capture.
    pub fn collect(counter: &Counter) -> Result<Self> {
        let codec = counter.codec();
        let mut rows = Vec::with_capacity(counter.table().len());
        let mut failure = None;

        counter.table().range(|key, value| {
            match codec.render_values(key) {
                Ok(dimensions) => {
                    rows.push(RowSnapshot { dimensions, value });
                    ControlFlow::Continue(())
                }
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }
        rows.sort_by(|a, b| a.dimensions.cmp(&b.dimensions));

        let schema = counter.schema();
        Ok(Self {
            metric: schema.metric().name().to_string(),
            fields: schema
                .dimensions()
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            rows,
        })
    }

    /// Finds the row whose rendered dimensions equal `dimensions`.
    pub fn get<S: AsRef<str>>(&self, dimensions: &[S]) -> Option<&RowSnapshot> {
        self.rows.iter().find(|row| {
            row.dimensions.len() == dimensions.len()
                && row
                    .dimensions
                    .iter()
                    .zip(dimensions)
                    .all(|(a, b)| a == b.as_ref())
        })
    }

    /// Returns the sum of all counts.
    pub fn total(&self) -> i64 {
        self.rows
            .iter()
            .fold(0i64, |acc, row| acc.wrapping_add(row.value))
    }

    /// Serializes the snapshot to JSON.
    #[cfg(feature = "json")]
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

impl Counter {
    /// Captures every entry as a serializable [`CounterSnapshot`].
    pub fn snapshot(&self) -> Result<CounterSnapshot> {
        CounterSnapshot::collect(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CounterConfig;
    use chrono::{TimeZone, Utc};

    fn counter() -> Counter {
        Counter::new(
            &["event_time", "id", "host"],
            &["t", "i", "s"],
            "requests",
            CounterConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_collect() {
        let c = counter();
        let day = Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap();
        c.increment(8, (day, 39, "HOST1")).unwrap();
        c.increment(5, (day, 39, "HOST2")).unwrap();

        let snapshot = c.snapshot().unwrap();
        assert_eq!(snapshot.metric, "requests");
        assert_eq!(snapshot.fields, vec!["event_time", "id", "host"]);
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(
            snapshot.rows[0],
            RowSnapshot {
                dimensions: vec![
                    "2014-02-04 00:00:00".to_string(),
                    "39".to_string(),
                    "HOST1".to_string()
                ],
                value: 8,
            }
        );
        assert_eq!(
            snapshot
                .get(&["2014-02-04 00:00:00", "39", "HOST2"])
                .map(|r| r.value),
            Some(5)
        );
        assert!(snapshot.get(&["nope"]).is_none());
        assert_eq!(snapshot.total(), 13);
    }

    #[test]
    fn test_empty() {
        let snapshot = counter().snapshot().unwrap();
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.total(), 0);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_to_json() {
        let c = Counter::new(&["host"], &["s"], "hits", CounterConfig::default()).unwrap();
        c.increment(42, ("web-1",)).unwrap();

        let json = c.snapshot().unwrap().to_json(false).unwrap();
        assert_eq!(
            json,
            r#"{"metric":"hits","fields":["host"],"rows":[{"dimensions":["web-1"],"value":42}]}"#
        );

        let back: CounterSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.rows[0].value, 42);
    }
}
