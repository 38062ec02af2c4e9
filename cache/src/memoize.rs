use crate::entry::Outcome;
use crate::metrics::MetricsSnapshot;

/// The contract shared by every memo cache strategy.
///
/// For any key, the first `get` runs its `compute` closure and stores the
/// result, success or failure. Every other `get` for that key, concurrent or
/// later, returns that same stored result without running its own closure.
/// Failures are memoized exactly like values and are never retried.
///
/// Code that only needs memoization should be generic over this trait so the
/// backing strategy can be swapped freely.
pub trait Memoize<K, V, E> {
  /// Returns the memoized result for `key`, running `compute` only if no
  /// caller has claimed this key before.
  ///
  /// The cache never produces an error of its own; an `Err` is always the
  /// error returned by the single authoritative `compute`.
  ///
  /// # Panics
  ///
  /// Propagates a panic from `compute`. Once a key's computation has
  /// panicked, every later call for that key panics as well.
  fn get<F>(&self, key: &K, compute: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>;

  /// Returns the stored result for `key` without ever computing it.
  ///
  /// Returns `None` if the key has never been requested, is still being
  /// computed, or was poisoned by a panicking computation.
  fn peek(&self, key: &K) -> Option<Outcome<V, E>>;

  /// Returns `true` if `key` has been claimed, whether or not its
  /// computation has finished.
  fn contains_key(&self, key: &K) -> bool;

  /// The number of keys in the table. Keys are never removed.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn metrics(&self) -> MetricsSnapshot;
}
