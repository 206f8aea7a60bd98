//! The dimensional counter facade.
//!
//! [`Counter`] ties together the [`FieldSchema`], the [`KeyCodec`] and the
//! [`ShardedTable`]: dimension values are type checked and encoded, then the
//! resulting key is updated in the table. [`Counter::export`] materializes
//! the table as an Arrow [`RecordBatch`].
//!
//! # Thread Safety
//!
//! `Counter` is `Send + Sync`; share it with `Arc<Counter>`. Every update to
//! a single key is atomic, so concurrent increments never lose counts.
//! Exports are best-effort sweeps with no isolation from concurrent updates.

use std::fmt::{self, Debug};
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use tracing::debug;

use crate::codec::{EncodedKey, KeyCodec};
use crate::config::CounterConfig;
use crate::error::Result;
use crate::export;
use crate::schema::FieldSchema;
use crate::table::ShardedTable;
use crate::value::IntoDimensions;

/// A concurrent counter keyed by typed dimension tuples.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use dimcount::{Counter, CounterConfig};
///
/// let counter = Counter::new(
///     &["event_time", "id", "host"],
///     &["T", "I", "S"],
///     "requests",
///     CounterConfig::default(),
/// )
/// .unwrap();
///
/// let day = Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap();
/// counter.increment(1, (day, 39, "HOST1")).unwrap();
/// counter.increment(7, (day, 39, "HOST1")).unwrap();
/// counter.increment(5, (day, 39, "HOST2")).unwrap();
///
/// assert_eq!(counter.get((day, 39, "HOST1")).unwrap(), 8);
///
/// let batch = counter.export().unwrap();
/// assert_eq!(batch.num_rows(), 2);
/// ```
pub struct Counter {
    schema: Arc<FieldSchema>,
    codec: KeyCodec,
    table: ShardedTable<EncodedKey>,
    config: CounterConfig,
}

impl Counter {
    /// Creates a counter over the given dimension fields and metric name.
    ///
    /// `type_codes` lists one code per field name; see
    /// [`schema`](crate::schema) for accepted codes.
    ///
    /// # Errors
    ///
    /// Schema errors from [`FieldSchema::build`] and configuration errors
    /// from [`CounterConfig::key_format`].
    pub fn new<N, C>(
        field_names: &[N],
        type_codes: &[C],
        metric_name: &str,
        config: CounterConfig,
    ) -> Result<Self>
    where
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let schema = Arc::new(FieldSchema::build(field_names, type_codes, metric_name)?);
        let format = config.key_format()?;
        let codec = KeyCodec::new(Arc::clone(&schema), format);
        let table = ShardedTable::with_shards(config.shard_count, config.size_hint);

        debug!(
            metric = metric_name,
            dimensions = schema.len(),
            shards = table.shard_count(),
            "created counter"
        );

        Ok(Self {
            schema,
            codec,
            table,
            config,
        })
    }

    #[inline]
    fn key(&self, dims: impl IntoDimensions) -> Result<EncodedKey> {
        self.codec.encode(&dims.into_dimensions())
    }

    /// Adds `delta` to the count of `dims` and returns the new count.
    ///
    /// Invalid dimensions are rejected before the table is touched.
    pub fn increment(&self, delta: i64, dims: impl IntoDimensions) -> Result<i64> {
        let key = self.key(dims)?;
        Ok(self.table.increment(key, delta))
    }

    /// Subtracts `delta` from the count of `dims` and returns the new count.
    ///
    /// Counts may go negative.
    pub fn decrement(&self, delta: i64, dims: impl IntoDimensions) -> Result<i64> {
        let key = self.key(dims)?;
        Ok(self.table.decrement(key, delta))
    }

    /// Returns the count of `dims`, or 0 if never counted.
    pub fn get(&self, dims: impl IntoDimensions) -> Result<i64> {
        let key = self.key(dims)?;
        Ok(self.table.get(&key))
    }

    /// Returns `true` if `dims` has an entry, including one counted down to 0.
    pub fn contains(&self, dims: impl IntoDimensions) -> Result<bool> {
        let key = self.key(dims)?;
        Ok(self.table.contains(&key))
    }

    /// Removes the entry of `dims`, returning `true` if it existed.
    pub fn delete(&self, dims: impl IntoDimensions) -> Result<bool> {
        let key = self.key(dims)?;
        Ok(self.table.delete(&key))
    }

    /// Removes every entry.
    pub fn reset(&self) {
        self.table.reset();
        debug!(metric = self.schema.metric().name(), "counter reset");
    }

    /// Exports every entry as one row of a [`RecordBatch`].
    ///
    /// Columns are the dimensions in schema order followed by the metric.
    pub fn export(&self) -> Result<RecordBatch> {
        export::export(&self.table, &self.schema, &self.codec)
    }

    /// Exports every entry and empties the table.
    ///
    /// Each shard is emptied atomically, so no update is lost or counted
    /// twice across consecutive calls. If the export fails the drained
    /// entries are put back.
    pub fn export_and_reset(&self) -> Result<RecordBatch> {
        let rows = self.table.drain();
        match export::export_rows(rows.iter().cloned(), &self.schema, &self.codec) {
            Ok(batch) => Ok(batch),
            Err(err) => {
                for (key, count) in rows {
                    self.table.increment(key, count);
                }
                Err(err)
            }
        }
    }

    /// Returns the underlying table for direct iteration.
    pub fn table(&self) -> &ShardedTable<EncodedKey> {
        &self.table
    }

    /// Returns the field schema.
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Returns the Arrow schema of exported batches.
    pub fn arrow_schema(&self) -> SchemaRef {
        self.schema.arrow_schema(self.codec.format().time_zone.name())
    }

    /// Returns the key codec.
    pub fn codec(&self) -> &KeyCodec {
        &self.codec
    }

    /// Returns the configuration the counter was built with.
    pub fn config(&self) -> &CounterConfig {
        &self.config
    }
}

impl Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("metric", &self.schema.metric().name())
            .field("dimensions", &self.schema.dimensions())
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::value::Value;
    use arrow_array::cast::AsArray;
    use arrow_array::types::Int64Type;
    use chrono::{DateTime, TimeZone, Utc};
    use std::thread;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap()
    }

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
    fn test_increment_decrement() {
        let c = Counter::new(
            &["event_time", "field1_id", "field2_id", "field3_id", "field4_name"],
            &["t", "i", "i", "i", "s"],
            "requests",
            CounterConfig::default(),
        )
        .unwrap();
        let dims = (day(), 39, 12345, 11, "STRING4");

        c.increment(9, dims).unwrap();
        c.decrement(3, dims).unwrap();
        assert_eq!(c.get(dims).unwrap(), 6);
    }

    #[test]
    fn test_get_untouched() {
        let c = counter();
        assert_eq!(c.get((day(), 1, "x")).unwrap(), 0);
        assert!(!c.contains((day(), 1, "x")).unwrap());
    }

    #[test]
    fn test_delete() {
        let c = counter();
        assert!(!c.delete((day(), 1, "x")).unwrap());
        c.increment(4, (day(), 1, "x")).unwrap();
        assert!(c.delete((day(), 1, "x")).unwrap());
        assert_eq!(c.get((day(), 1, "x")).unwrap(), 0);
    }

    #[test]
    fn test_zero_count_is_still_present() {
        let c = counter();
        c.increment(0, (day(), 1, "x")).unwrap();
        assert_eq!(c.get((day(), 1, "x")).unwrap(), 0);
        assert!(c.contains((day(), 1, "x")).unwrap());
        assert_eq!(c.export().unwrap().num_rows(), 1);
        assert!(c.delete((day(), 1, "x")).unwrap());
    }

    #[test]
    fn test_arity_error_leaves_table_unchanged() {
        let c = counter();
        c.increment(1, (day(), 1, "x")).unwrap();

        assert!(matches!(
            c.increment(1, (day(), 1)),
            Err(Error::Arity {
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            c.increment(1, (day(), 1, "x", "extra")),
            Err(Error::Arity {
                expected: 3,
                actual: 4
            })
        ));
        assert_eq!(c.table().len(), 1);
        assert_eq!(c.get((day(), 1, "x")).unwrap(), 1);
    }

    #[test]
    fn test_type_mismatch() {
        let c = counter();
        assert!(matches!(
            c.increment(1, ("2014-02-04", 1, "x")),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            c.get(vec![Value::from(day()), Value::from("1"), Value::from("x")]),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(c.table().is_empty());
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            Counter::new(&["a"], &["q"], "m", CounterConfig::default()),
            Err(Error::InvalidType { position: 0, .. })
        ));
        assert!(matches!(
            Counter::new(
                &["a"],
                &["i"],
                "m",
                CounterConfig::default().with_separator("")
            ),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_reset() {
        let c = counter();
        c.increment(1, (day(), 1, "a")).unwrap();
        c.increment(1, (day(), 2, "b")).unwrap();
        c.reset();
        assert!(c.table().is_empty());
        assert_eq!(c.export().unwrap().num_rows(), 0);
    }

    #[test]
    fn test_export_and_reset() {
        let c = counter();
        c.increment(2, (day(), 1, "a")).unwrap();
        c.increment(3, (day(), 2, "b")).unwrap();

        let batch = c.export_and_reset().unwrap();
        assert_eq!(batch.num_rows(), 2);
        let total: i64 = batch
            .column(3)
            .as_primitive::<Int64Type>()
            .values()
            .iter()
            .sum();
        assert_eq!(total, 5);
        assert!(c.table().is_empty());
    }

    #[test]
    fn test_export_and_reset_restores_on_failure() {
        let c = counter();
        c.increment(2, (day(), 1, "a")).unwrap();
        c.table().increment(EncodedKey::from_bytes(vec![0xff]), 1);

        assert!(c.export_and_reset().is_err());
        assert_eq!(c.table().len(), 2);
        assert_eq!(c.get((day(), 1, "a")).unwrap(), 2);
    }

    #[test]
    fn test_arrow_schema_matches_export() {
        let c = Counter::new(
            &["ts", "host"],
            &["t", "s"],
            "n",
            CounterConfig::default().with_time_location("Asia/Tokyo"),
        )
        .unwrap();
        c.increment(1, (day(), "h")).unwrap();
        assert_eq!(c.export().unwrap().schema(), c.arrow_schema());
    }

    #[test]
    fn test_concurrent_same_key() {
        let c = counter();
        thread::scope(|s| {
            for i in 0..8 {
                let c = &c;
                s.spawn(move || {
                    for _ in 0..5_000 {
                        if i % 2 == 0 {
                            c.increment(2, (day(), 7, "hot")).unwrap();
                        } else {
                            c.decrement(1, (day(), 7, "hot")).unwrap();
                        }
                    }
                });
            }
        });
        assert_eq!(c.get((day(), 7, "hot")).unwrap(), 4 * 5_000 * 2 - 4 * 5_000);
    }

    #[test]
    fn test_debug() {
        let c = counter();
        let debug_str = format!("{:?}", c);
        assert!(debug_str.contains("Counter"));
        assert!(debug_str.contains("requests"));
    }
}
