//! # dimcount - Concurrent Dimensional Counters
//!
//! A Rust library for counting events keyed by a tuple of typed dimensions
//! (timestamps, strings, integers) from many threads at once, and exporting
//! the accumulated counts as an Apache Arrow [`RecordBatch`] ready for a
//! columnar writer.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`schema`] | Ordered typed dimension fields plus the Int64 metric field |
//! | [`value`] | Typed dimension values and tuple conversions |
//! | [`codec`] | Composite key encoding, decoding and textual rendering |
//! | [`table`] | Sharded, mutex-guarded `key -> i64` table |
//! | [`export`] | Schema-driven Arrow export of the table |
//! | [`config`] | Counter configuration with defaults |
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use dimcount::{Counter, CounterConfig};
//!
//! let counter = Counter::new(
//!     &["event_time", "id", "host"],
//!     &["T", "I", "S"],
//!     "requests",
//!     CounterConfig::default(),
//! )
//! .unwrap();
//!
//! let day = Utc.with_ymd_and_hms(2014, 2, 4, 0, 0, 0).unwrap();
//!
//! // Increment from any thread
//! counter.increment(1, (day, 39, "HOST1")).unwrap();
//! counter.increment(7, (day, 39, "HOST1")).unwrap();
//! counter.decrement(2, (day, 39, "HOST2")).unwrap();
//!
//! assert_eq!(counter.get((day, 39, "HOST1")).unwrap(), 8);
//! assert_eq!(counter.get((day, 39, "HOST2")).unwrap(), -2);
//!
//! // Materialize as a columnar batch
//! let batch = counter.export().unwrap();
//! assert_eq!(batch.num_rows(), 2);
//! assert_eq!(batch.num_columns(), 4);
//! ```
//!
//! ## Thread Safety
//!
//! [`Counter`] is `Send + Sync` and is shared across threads with
//! `Arc<Counter>`. Keys are spread over independent shards (32 by default),
//! each guarded by its own mutex held across the whole read-modify-write, so
//! concurrent increments of the same key are never lost.
//!
//! Exports walk the shards one at a time. They are not isolated from
//! concurrent updates: an update racing with an export may or may not be
//! included, and rows come out in no particular order.
//!
//! ## Zero Counts
//!
//! An entry stays in the table once created, even if its count returns to
//! zero. [`Counter::get`] reads 0 for both absent and zeroed entries; use
//! [`Counter::contains`] to tell them apart. Zeroed entries are exported.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | `Serialize`/`Deserialize` for config and values, [`snapshot`] module |
//! | `json` | JSON rendering of snapshots |
//! | `table` | [`observers::table`] ASCII table rendering |
//! | `full` | All of the above |
//!
//! [`RecordBatch`]: arrow_array::RecordBatch

pub mod codec;
pub mod config;
pub mod counter;
pub mod error;
pub mod export;
pub mod observers;
pub mod schema;
pub mod table;
pub mod value;

#[cfg(feature = "serde")]
pub mod snapshot;

pub use config::CounterConfig;
pub use counter::Counter;
pub use error::{Error, Result};
pub use value::{IntoDimensions, Value};
