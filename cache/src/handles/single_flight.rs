use crate::entry::Outcome;
use crate::memoize::Memoize;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::slot::{ResolveGuard, Slot};
use crate::store::ShardedTable;

use std::fmt;
use std::future::Future;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

pub(crate) struct SingleFlightShared<K, V, E, H> {
  pub(crate) table: ShardedTable<K, Arc<Slot<V, E>>, H>,
  pub(crate) metrics: Metrics,
}

/// The result of racing for a key under its shard lock.
enum Claim<V, E> {
  /// This caller inserted the slot and must resolve it.
  Leader(Arc<Slot<V, E>>),
  /// A slot already existed; this caller only waits on it.
  Follower(Arc<Slot<V, E>>),
}

/// A memo cache that collapses concurrent requests for the same key into one
/// in-flight computation.
///
/// The table lock is only held long enough to look up or insert a key's
/// pending slot. Computations run outside it, so unrelated keys compute in
/// parallel; callers that race on the same key block on that key's slot until
/// the first caller's computation finishes, then share its result.
///
/// Sync callers ([`Memoize::get`]) and async callers
/// ([`get_async`](SingleFlightCache::get_async)) can be freely mixed on the
/// same key.
pub struct SingleFlightCache<K, V, E, H = ahash::RandomState> {
  pub(crate) shared: Arc<SingleFlightShared<K, V, E, H>>,
}

impl<K, V, E, H> Clone for SingleFlightCache<K, V, E, H> {
  fn clone(&self) -> Self {
    Self {
      shared: Arc::clone(&self.shared),
    }
  }
}

impl<K, V, E, H> fmt::Debug for SingleFlightCache<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SingleFlightCache")
      .field("table", &self.shared.table)
      .field("metrics", &self.shared.metrics.snapshot())
      .finish()
  }
}

impl<K, V, E, H> SingleFlightCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  pub(crate) fn with_shards(num_shards: usize, hasher: H) -> Self {
    Self {
      shared: Arc::new(SingleFlightShared {
        table: ShardedTable::new(num_shards, hasher),
        metrics: Metrics::new(),
      }),
    }
  }

  /// The number of independently locked table shards.
  pub fn shards(&self) -> usize {
    self.shared.table.num_shards()
  }

  /// Returns `true` if a computation for `key` has started but not finished.
  pub fn is_pending(&self, key: &K) -> bool {
    self.slot(key).is_some_and(|slot| slot.is_pending())
  }

  /// The async counterpart of [`Memoize::get`].
  ///
  /// If this call wins the race for `key`, `compute()` is awaited in the
  /// calling task. Otherwise the call waits, without blocking the thread, for
  /// the winner to finish. Dropping the returned future while it is running
  /// the computation poisons the key, exactly like a panic would.
  pub async fn get_async<F, Fut>(&self, key: &K, compute: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
  {
    match self.claim(key) {
      Claim::Leader(slot) => {
        let guard = ResolveGuard::new(&slot, &self.shared.metrics);
        let result = compute().await;
        guard.resolve(result)
      }
      Claim::Follower(slot) => (&*slot).await,
    }
  }

  /// Makes the single atomic "does this key have an entry yet" decision.
  ///
  /// The shard lock is released before this returns; nothing is computed or
  /// awaited while it is held.
  fn claim(&self, key: &K) -> Claim<V, E> {
    let shard_index = self.shared.table.shard_index(key);
    let mut shard = self.shared.table.shard(key).lock();

    if let Some(slot) = shard.get(key) {
      let slot = Arc::clone(slot);
      drop(shard);
      if slot.is_pending() {
        self.shared.metrics.record_coalesced();
        tracing::trace!(shard = shard_index, "joining in-flight computation");
      } else {
        self.shared.metrics.record_hit();
      }
      return Claim::Follower(slot);
    }

    let slot = Arc::new(Slot::new());
    shard.insert(key.clone(), Arc::clone(&slot));
    drop(shard);

    self.shared.metrics.record_miss();
    tracing::trace!(shard = shard_index, "claimed key; running computation");
    Claim::Leader(slot)
  }

  fn slot(&self, key: &K) -> Option<Arc<Slot<V, E>>> {
    self.shared.table.shard(key).lock().get(key).cloned()
  }
}

impl<K, V, E, H> Memoize<K, V, E> for SingleFlightCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  fn get<F>(&self, key: &K, compute: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    match self.claim(key) {
      Claim::Leader(slot) => {
        let guard = ResolveGuard::new(&slot, &self.shared.metrics);
        guard.resolve(compute())
      }
      Claim::Follower(slot) => slot.wait(),
    }
  }

  fn peek(&self, key: &K) -> Option<Outcome<V, E>> {
    self.slot(key).and_then(|slot| slot.peek())
  }

  fn contains_key(&self, key: &K) -> bool {
    self.shared.table.shard(key).lock().contains_key(key)
  }

  fn len(&self) -> usize {
    self.shared.table.len()
  }

  fn metrics(&self) -> MetricsSnapshot {
    self.shared.metrics.snapshot()
  }
}
