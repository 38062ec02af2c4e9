use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// A thread-safe, internal metrics collector for a memo cache.
/// All fields are atomic to allow for lock-free updates.
#[derive(Debug)]
pub struct Metrics {
  // --- Hit/Miss Ratios ---
  pub(crate) hits: CachePadded<AtomicU64>,
  pub(crate) misses: CachePadded<AtomicU64>,
  pub(crate) coalesced: CachePadded<AtomicU64>,

  // --- Computation Outcomes ---
  pub(crate) failures: CachePadded<AtomicU64>,
  pub(crate) panics: CachePadded<AtomicU64>,

  created_at: Instant,
}

impl Default for Metrics {
  fn default() -> Self {
    Self {
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      coalesced: CachePadded::new(AtomicU64::new(0)),
      failures: CachePadded::new(AtomicU64::new(0)),
      panics: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl Metrics {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  /// Records a call that returned without running its computation.
  #[inline]
  pub(crate) fn record_hit(&self) {
    self.hits.fetch_add(1, Ordering::Relaxed);
  }

  /// Records a call that joined a computation already in flight.
  #[inline]
  pub(crate) fn record_coalesced(&self) {
    self.hits.fetch_add(1, Ordering::Relaxed);
    self.coalesced.fetch_add(1, Ordering::Relaxed);
  }

  /// Records a call that inserted a new key and ran its computation.
  #[inline]
  pub(crate) fn record_miss(&self) {
    self.misses.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_failure(&self) {
    self.failures.fetch_add(1, Ordering::Relaxed);
  }

  #[inline]
  pub(crate) fn record_panic(&self) {
    self.panics.fetch_add(1, Ordering::Relaxed);
  }

  /// Creates a point-in-time snapshot of the current metrics.
  pub(crate) fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      coalesced: self.coalesced.load(Ordering::Relaxed),
      failures: self.failures.load(Ordering::Relaxed),
      panics: self.panics.load(Ordering::Relaxed),
      // Each miss inserts exactly one key and keys are never removed.
      entries: misses,
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

/// A point-in-time, public-facing snapshot of a memo cache's metrics.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MetricsSnapshot {
  /// Calls answered without running their computation, including calls that
  /// waited on another caller's in-flight computation.
  pub hits: u64,
  /// Calls that ran their computation. This is also the number of keys ever
  /// computed, since each key is computed at most once.
  pub misses: u64,
  /// The cache hit ratio (hits / (hits + misses)).
  pub hit_ratio: f64,
  /// The subset of `hits` that blocked on an in-flight computation.
  pub coalesced: u64,
  /// Computations that returned an error (which is now cached).
  pub failures: u64,
  /// Computations that panicked or were cancelled, poisoning their key.
  pub panics: u64,
  /// Keys currently held in the table, pending or resolved. Always equal to
  /// `misses`, since only a miss inserts a key and nothing removes one.
  pub entries: u64,
  /// The number of seconds the cache has been running.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("coalesced", &self.coalesced)
      .field("failures", &self.failures)
      .field("panics", &self.panics)
      .field("entries", &self.entries)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entries_track_misses() {
    let metrics = Metrics::new();
    metrics.record_miss();
    metrics.record_hit();
    metrics.record_coalesced();
    metrics.record_miss();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.misses, 2);
    assert_eq!(snapshot.entries, 2);
    assert_eq!(snapshot.hits, 2);
    assert_eq!(snapshot.coalesced, 1);
  }
}
