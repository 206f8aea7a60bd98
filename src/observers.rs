//! Observer implementations for inspecting counter contents.
//!
//! - [`table`] - Pretty-print a counter as a table using the `tabled` crate
//!
//! Observers render the same rows as [`Counter::export`](crate::Counter::export)
//! but for humans rather than columnar storage. Each observer is gated behind
//! a feature flag to minimize dependencies:
//!
//! - `table` - Enables the [`table`] module
//! - `full` - Enables all observer modules and JSON snapshots

#[cfg(feature = "table")]
pub mod table;
