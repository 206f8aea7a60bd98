//! Columnar export of counter contents.
//!
//! The exporter walks a [`ShardedTable`] once, decodes every key with the
//! [`KeyCodec`] and appends one row per entry to a set of Arrow column
//! builders laid out by the [`FieldSchema`]: dimension columns in schema
//! order, then the metric column.
//!
//! The builders live only for the duration of a single export call. The walk
//! is a best-effort sweep over the shards, not an isolated snapshot, and rows
//! come out in no particular order.

use std::ops::ControlFlow;
use std::sync::Arc;

use arrow_array::builder::{Int64Builder, StringBuilder, TimestampSecondBuilder};
use arrow_array::{ArrayRef, RecordBatch};
use tracing::{debug, warn};

use crate::codec::{EncodedKey, KeyCodec};
use crate::error::{Error, Result};
use crate::schema::{FieldSchema, FieldType};
use crate::table::ShardedTable;
use crate::value::Value;

/// One Arrow builder per dimension column.
enum ColumnBuilder {
    Int64(Int64Builder),
    String(StringBuilder),
    Timestamp(TimestampSecondBuilder),
}

impl ColumnBuilder {
    fn new(field_type: FieldType, time_zone: &str, capacity: usize) -> Self {
        match field_type {
            FieldType::Int64 => ColumnBuilder::Int64(Int64Builder::with_capacity(capacity)),
            FieldType::String => {
                ColumnBuilder::String(StringBuilder::with_capacity(capacity, capacity * 16))
            }
            FieldType::Timestamp => ColumnBuilder::Timestamp(
                TimestampSecondBuilder::with_capacity(capacity).with_timezone(time_zone),
            ),
        }
    }

    fn append(&mut self, position: usize, value: Value) -> Result<()> {
        match (self, value) {
            (ColumnBuilder::Int64(b), Value::Int64(v)) => b.append_value(v),
            (ColumnBuilder::String(b), Value::String(v)) => b.append_value(v),
            (ColumnBuilder::Timestamp(b), Value::Timestamp(v)) => b.append_value(v.timestamp()),
            (_, value) => {
                return Err(Error::parse(
                    position,
                    value.to_string(),
                    format!("decoded {} does not match column type", value.field_type()),
                ))
            }
        }
        Ok(())
    }

    fn finish(self) -> ArrayRef {
        match self {
            ColumnBuilder::Int64(mut b) => Arc::new(b.finish()),
            ColumnBuilder::String(mut b) => Arc::new(b.finish()),
            ColumnBuilder::Timestamp(mut b) => Arc::new(b.finish()),
        }
    }
}

/// Accumulates decoded rows into Arrow builders.
///
/// Not shared across threads: each export owns its own instance.
struct BatchBuilder<'a> {
    schema: &'a FieldSchema,
    codec: &'a KeyCodec,
    columns: Vec<ColumnBuilder>,
    metric: Int64Builder,
}

impl<'a> BatchBuilder<'a> {
    fn new(schema: &'a FieldSchema, codec: &'a KeyCodec, capacity: usize) -> Self {
        let time_zone = codec.format().time_zone.name();
        let columns = schema
            .dimensions()
            .iter()
            .map(|f| ColumnBuilder::new(f.field_type(), time_zone, capacity))
            .collect();
        Self {
            schema,
            codec,
            columns,
            metric: Int64Builder::with_capacity(capacity),
        }
    }

    /// Decodes `key` fully before touching any column, so a failing key
    /// never leaves columns of unequal length.
    fn append(&mut self, key: &EncodedKey, count: i64) -> Result<()> {
        let values = self.codec.decode(key)?;
        for (position, (column, value)) in self.columns.iter_mut().zip(values).enumerate() {
            column.append(position, value)?;
        }
        self.metric.append_value(count);
        Ok(())
    }

    fn finish(self) -> Result<RecordBatch> {
        let arrow_schema = self.schema.arrow_schema(self.codec.format().time_zone.name());
        let mut arrays: Vec<ArrayRef> = self
            .columns
            .into_iter()
            .map(ColumnBuilder::finish)
            .collect();
        let mut metric = self.metric;
        arrays.push(Arc::new(metric.finish()));
        Ok(RecordBatch::try_new(arrow_schema, arrays)?)
    }
}

/// Exports every entry of `table` as one row of a [`RecordBatch`].
///
/// # Errors
///
/// The first key that fails to decode aborts the export and its
/// [`Error::Parse`] is returned; no partial batch is produced.
pub fn export(
    table: &ShardedTable<EncodedKey>,
    schema: &FieldSchema,
    codec: &KeyCodec,
) -> Result<RecordBatch> {
    let mut builder = BatchBuilder::new(schema, codec, table.len());
    let mut failure = None;

    table.range(|key, count| match builder.append(key, count) {
        Ok(()) => ControlFlow::Continue(()),
        Err(err) => {
            failure = Some(err);
            ControlFlow::Break(())
        }
    });

    if let Some(err) = failure {
        warn!(error = %err, "export aborted");
        return Err(err);
    }

    let batch = builder.finish()?;
    debug!(rows = batch.num_rows(), "exported counter table");
    Ok(batch)
}

/// Exports an owned list of entries, e.g. the result of
/// [`ShardedTable::drain`], with the same layout as [`export`].
pub fn export_rows<I>(rows: I, schema: &FieldSchema, codec: &KeyCodec) -> Result<RecordBatch>
where
    I: IntoIterator<Item = (EncodedKey, i64)>,
{
    let rows = rows.into_iter();
    let mut builder = BatchBuilder::new(schema, codec, rows.size_hint().0);
    for (key, count) in rows {
        if let Err(err) = builder.append(&key, count) {
            warn!(error = %err, "export aborted");
            return Err(err);
        }
    }

    let batch = builder.finish()?;
    debug!(rows = batch.num_rows(), "exported drained entries");
    Ok(batch)
}
