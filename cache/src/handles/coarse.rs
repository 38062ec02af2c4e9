use crate::entry::{clone_outcome, share, Outcome, Resolution};
use crate::memoize::Memoize;
use crate::metrics::{Metrics, MetricsSnapshot};

use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

pub(crate) struct CoarseShared<K, V, E, H> {
  pub(crate) table: Mutex<HashMap<K, Resolution<V, E>, H>>,
  pub(crate) metrics: Metrics,
}

/// A memo cache that serializes all traffic behind one lock.
///
/// The lock is held for the whole lookup, compute and store sequence, so a
/// slow computation for one key blocks every other key until it finishes.
/// This is the simplest correct strategy and the baseline the single-flight
/// cache is measured against.
pub struct CoarseCache<K, V, E, H = ahash::RandomState> {
  pub(crate) shared: Arc<CoarseShared<K, V, E, H>>,
}

impl<K, V, E, H> Clone for CoarseCache<K, V, E, H> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<K, V, E, H> fmt::Debug for CoarseCache<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CoarseCache")
      .field("metrics", &self.shared.metrics.snapshot())
      .finish_non_exhaustive()
  }
}

impl<K, V, E, H> CoarseCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher,
{
  pub(crate) fn with_hasher(hasher: H) -> Self {
    Self {
      shared: Arc::new(CoarseShared {
        table: Mutex::new(HashMap::with_hasher(hasher)),
        metrics: Metrics::new(),
      }),
    }
  }
}

impl<K, V, E, H> Memoize<K, V, E> for CoarseCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher,
{
  fn get<F>(&self, key: &K, compute: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    let metrics = &self.shared.metrics;
    let mut table = self.shared.table.lock();

    if let Some(resolution) = table.get(key) {
      metrics.record_hit();
      return resolution.expect_outcome();
    }

    metrics.record_miss();
    tracing::trace!("computing missing key under the coarse lock");

    // The lock stays held while `compute` runs.
    match panic::catch_unwind(AssertUnwindSafe(compute)) {
      Ok(result) => {
        if result.is_err() {
          metrics.record_failure();
          tracing::debug!("memoized computation failed; the error is now cached");
        }
        let outcome = share(result);
        table.insert(key.clone(), Resolution::Resolved(clone_outcome(&outcome)));
        outcome
      }
      Err(payload) => {
        metrics.record_panic();
        tracing::warn!("memoized computation panicked; poisoning its key");
        table.insert(key.clone(), Resolution::Poisoned);
        drop(table);
        panic::resume_unwind(payload)
      }
    }
  }

  fn peek(&self, key: &K) -> Option<Outcome<V, E>> {
    self
      .shared
      .table
      .lock()
      .get(key)
      .and_then(Resolution::outcome)
  }

  fn contains_key(&self, key: &K) -> bool {
    self.shared.table.lock().contains_key(key)
  }

  fn len(&self) -> usize {
    self.shared.table.lock().len()
  }

  fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
