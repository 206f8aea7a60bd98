//! Sharded, mutex-guarded counting table.
//!
//! [`ShardedTable`] maps keys to `i64` counts. Keys are spread over a fixed
//! number of shards by hash, and each shard is an independent
//! `Mutex<HashMap>` so that threads updating different keys rarely contend.
//!
//! ```text
//!                          ┌─────────────────────────────────────┐
//!                          │           ShardedTable              │
//!                          ├─────────────────────────────────────┤
//!   hash(k1) % N ──────►   │ [Shard 0] Mutex<map> (CachePadded)  │
//!   hash(k2) % N ──────►   │ [Shard 1] Mutex<map> (CachePadded)  │
//!        ...               │    ...                              │
//!   hash(kn) % N ──────►   │ [Shard N-1] Mutex<map>              │
//!                          └─────────────────────────────────────┘
//! ```
//!
//! # Atomicity
//!
//! [`increment`](ShardedTable::increment) and
//! [`decrement`](ShardedTable::decrement) hold the shard lock across the whole
//! read-modify-write, so concurrent updates to the same key are never lost:
//! the final count always equals the sum of all deltas applied.
//!
//! [`range`](ShardedTable::range) and [`drain`](ShardedTable::drain) lock one
//! shard at a time. They are best-effort sweeps: updates racing with them may
//! or may not be observed, and there is no cross-shard snapshot.

use std::fmt::{self, Debug};
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::ops::ControlFlow;

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHasher};

/// Default number of shards.
pub const DEFAULT_SHARD_COUNT: usize = 32;

/// Default initial capacity hint for the whole table.
pub const DEFAULT_SIZE_HINT: usize = 64;

type Shard<K> = CachePadded<Mutex<FxHashMap<K, i64>>>;

/// A concurrent map from keys to signed 64-bit counts.
///
/// # Examples
///
/// ```rust
/// use dimcount::table::ShardedTable;
///
/// let table = ShardedTable::new();
/// table.increment("a", 5);
/// table.decrement("a", 2);
///
/// assert_eq!(table.get(&"a"), 3);
/// assert_eq!(table.get(&"missing"), 0);
/// assert!(table.delete(&"a"));
/// assert!(!table.delete(&"a"));
/// ```
pub struct ShardedTable<K> {
    shards: Box<[Shard<K>]>,
    hasher: BuildHasherDefault<FxHasher>,
}

impl<K: Hash + Eq> ShardedTable<K> {
    /// Creates a table with the default shard count and size hint.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT, DEFAULT_SIZE_HINT)
    }

    /// Creates a table with `shard_count` shards and room for about
    /// `size_hint` entries.
    ///
    /// Values below 1 are ignored and the defaults are used instead.
    pub fn with_shards(shard_count: usize, size_hint: usize) -> Self {
        let shard_count = if shard_count < 1 {
            DEFAULT_SHARD_COUNT
        } else {
            shard_count
        };
        let size_hint = if size_hint < 1 {
            DEFAULT_SIZE_HINT
        } else {
            size_hint
        };
        let per_shard = size_hint.div_ceil(shard_count);

        let shards = (0..shard_count)
            .map(|_| {
                CachePadded::new(Mutex::new(FxHashMap::with_capacity_and_hasher(
                    per_shard,
                    Default::default(),
                )))
            })
            .collect();

        Self {
            shards,
            hasher: BuildHasherDefault::default(),
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &Mutex<FxHashMap<K, i64>> {
        let idx = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Returns the count for `key`, or 0 if absent.
    #[inline]
    pub fn get(&self, key: &K) -> i64 {
        self.shard(key).lock().get(key).copied().unwrap_or(0)
    }

    /// Returns `true` if `key` has an entry, even one whose count is 0.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).lock().contains_key(key)
    }

    /// Removes `key`, returning `true` if it was present.
    pub fn delete(&self, key: &K) -> bool {
        self.shard(key).lock().remove(key).is_some()
    }

    /// Adds `delta` to the count of `key` and returns the new count.
    ///
    /// Absent keys start from 0. Overflow wraps.
    #[inline]
    pub fn increment(&self, key: K, delta: i64) -> i64 {
        let mut shard = self.shard(&key).lock();
        let count = shard.entry(key).or_insert(0);
        *count = count.wrapping_add(delta);
        *count
    }

    /// Subtracts `delta` from the count of `key` and returns the new count.
    ///
    /// Counts may go negative; they are never clamped.
    #[inline]
    pub fn decrement(&self, key: K, delta: i64) -> i64 {
        let mut shard = self.shard(&key).lock();
        let count = shard.entry(key).or_insert(0);
        *count = count.wrapping_sub(delta);
        *count
    }

    /// Visits every entry in unspecified order.
    ///
    /// Returning [`ControlFlow::Break`] from `visit` stops the walk. The shard
    /// being visited stays locked while `visit` runs, so `visit` must not call
    /// back into this table.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, i64) -> ControlFlow<()>,
    {
        for shard in self.shards.iter() {
            let shard = shard.lock();
            for (key, value) in shard.iter() {
                if visit(key, *value).is_break() {
                    return;
                }
            }
        }
    }

    /// Removes every entry.
    pub fn reset(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
    }

    /// Removes and returns every entry.
    ///
    /// Each shard is emptied atomically; the table as a whole is not.
    pub fn drain(&self) -> Vec<(K, i64)> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            let taken = std::mem::take(&mut *shard.lock());
            out.extend(taken);
        }
        out
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().len()).sum()
    }

    /// Returns `true` if no shard holds an entry.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.lock().is_empty())
    }
}

impl<K: Hash + Eq> Default for ShardedTable<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug> Debug for ShardedTable<K> {
    /// Formats the table showing non-empty shards.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardedTable{{")?;
        for (i, shard) in self.shards.iter().enumerate() {
            let shard = shard.lock();
            if !shard.is_empty() {
                write!(f, " [{i}]:{}", shard.len())?;
            }
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new() {
        let table: ShardedTable<u32> = ShardedTable::new();
        assert_eq!(table.shard_count(), DEFAULT_SHARD_COUNT);
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_shard_count_clamped() {
        let table: ShardedTable<u32> = ShardedTable::with_shards(0, 0);
        assert_eq!(table.shard_count(), DEFAULT_SHARD_COUNT);

        let table: ShardedTable<u32> = ShardedTable::with_shards(3, 1);
        assert_eq!(table.shard_count(), 3);
    }

    #[test]
    fn test_get_absent() {
        let table: ShardedTable<&str> = ShardedTable::new();
        assert_eq!(table.get(&"nope"), 0);
        assert!(!table.contains(&"nope"));
    }

    #[test]
    fn test_increment_decrement() {
        let table = ShardedTable::new();
        assert_eq!(table.increment("k", 9), 9);
        assert_eq!(table.decrement("k", 3), 6);
        assert_eq!(table.get(&"k"), 6);
    }

    #[test]
    fn test_negative_counts() {
        let table = ShardedTable::new();
        assert_eq!(table.decrement("k", 5), -5);
        assert_eq!(table.increment("k", -1), -6);
        assert_eq!(table.get(&"k"), -6);
    }

    #[test]
    fn test_wrapping() {
        let table = ShardedTable::new();
        table.increment("k", i64::MAX);
        assert_eq!(table.increment("k", 1), i64::MIN);
    }

    #[test]
    fn test_zero_count_entry_is_kept() {
        let table = ShardedTable::new();
        table.increment("k", 3);
        table.decrement("k", 3);
        assert_eq!(table.get(&"k"), 0);
        assert!(table.contains(&"k"));
        assert!(table.delete(&"k"));
        assert!(!table.contains(&"k"));
    }

    #[test]
    fn test_delete() {
        let table = ShardedTable::new();
        assert!(!table.delete(&"k"));
        table.increment("k", 1);
        assert!(table.delete(&"k"));
        assert_eq!(table.get(&"k"), 0);
        assert!(!table.delete(&"k"));
    }

    #[test]
    fn test_range_visits_all() {
        let table = ShardedTable::with_shards(4, 16);
        for i in 0..100u32 {
            table.increment(i, i as i64);
        }
        let mut sum = 0;
        let mut seen = 0;
        table.range(|_, v| {
            sum += v;
            seen += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(seen, 100);
        assert_eq!(sum, (0..100).sum::<i64>());
    }

    #[test]
    fn test_range_early_stop() {
        let table = ShardedTable::new();
        for i in 0..50u32 {
            table.increment(i, 1);
        }
        let mut seen = 0;
        table.range(|_, _| {
            seen += 1;
            if seen == 10 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 10);
    }

    #[test]
    fn test_reset() {
        let table = ShardedTable::new();
        for i in 0..10u32 {
            table.increment(i, 1);
        }
        assert_eq!(table.len(), 10);
        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.get(&3), 0);
    }

    #[test]
    fn test_drain() {
        let table = ShardedTable::new();
        table.increment("a", 1);
        table.increment("b", 2);
        let mut drained = table.drain();
        drained.sort();
        assert_eq!(drained, vec![("a", 1), ("b", 2)]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_debug() {
        let table = ShardedTable::with_shards(1, 1);
        table.increment("a", 1);
        let debug_str = format!("{:?}", table);
        assert!(debug_str.starts_with("ShardedTable{"));
        assert!(debug_str.contains("[0]:1"));
    }

    #[test]
    fn test_multiple_threads_same_key() {
        let table = Arc::new(ShardedTable::new());
        let mut handles = vec![];

        // Half threads increment, half decrement by a different step
        for i in 0..8 {
            let table_clone = Arc::clone(&table);
            let handle = thread::spawn(move || {
                for _ in 0..10_000 {
                    if i % 2 == 0 {
                        table_clone.increment("hot", 3);
                    } else {
                        table_clone.decrement("hot", 1);
                    }
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(table.get(&"hot"), 4 * 10_000 * 3 - 4 * 10_000);
    }

    #[test]
    fn test_multiple_threads_many_keys() {
        let table = Arc::new(ShardedTable::with_shards(4, 64));
        let mut handles = vec![];

        for _ in 0..4 {
            let table_clone = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for round in 0..1_000u32 {
                    table_clone.increment(round % 37, 1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(table.len(), 37);
        let mut total = 0;
        table.range(|_, v| {
            total += v;
            ControlFlow::Continue(())
        });
        assert_eq!(total, 4_000);
    }
}
