mod coarse;
mod single_flight;

pub use coarse::CoarseCache;
pub use single_flight::SingleFlightCache;

use crate::config::Strategy;
use crate::entry::Outcome;
use crate::memoize::Memoize;
use crate::metrics::MetricsSnapshot;

use std::fmt;
use std::hash::{BuildHasher, Hash};

/// A memo cache whose strategy is chosen at build time.
///
/// Both variants honor the same [`Memoize`] contract, so code holding a
/// `MemoCache` behaves identically whichever one backs it; only throughput
/// and cross-key blocking differ.
pub enum MemoCache<K, V, E, H = ahash::RandomState> {
  Coarse(CoarseCache<K, V, E, H>),
  SingleFlight(SingleFlightCache<K, V, E, H>),
}

impl<K, V, E, H> Clone for MemoCache<K, V, E, H> {
  fn clone(&self) -> Self {
    match self {
      MemoCache::Coarse(cache) => MemoCache::Coarse(cache.clone()),
      MemoCache::SingleFlight(cache) => MemoCache::SingleFlight(cache.clone()),
    }
  }
}

impl<K, V, E, H> fmt::Debug for MemoCache<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MemoCache::Coarse(cache) => f.debug_tuple("Coarse").field(cache).finish(),
      MemoCache::SingleFlight(cache) => f.debug_tuple("SingleFlight").field(cache).finish(),
    }
  }
}

impl<K, V, E, H> MemoCache<K, V, E, H> {
  /// Reports which strategy backs this cache.
  pub fn strategy(&self) -> Strategy {
    match self {
      MemoCache::Coarse(_) => Strategy::Coarse,
      MemoCache::SingleFlight(_) => Strategy::SingleFlight,
    }
  }
}

impl<K, V, E, H> From<CoarseCache<K, V, E, H>> for MemoCache<K, V, E, H> {
  fn from(cache: CoarseCache<K, V, E, H>) -> Self {
    MemoCache::Coarse(cache)
  }
}

impl<K, V, E, H> From<SingleFlightCache<K, V, E, H>> for MemoCache<K, V, E, H> {
  fn from(cache: SingleFlightCache<K, V, E, H>) -> Self {
    MemoCache::SingleFlight(cache)
  }
}

impl<K, V, E, H> Memoize<K, V, E> for MemoCache<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  fn get<F>(&self, key: &K, compute: F) -> Outcome<V, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    match self {
      MemoCache::Coarse(cache) => cache.get(key, compute),
      MemoCache::SingleFlight(cache) => cache.get(key, compute),
    }
  }

  fn peek(&self, key: &K) -> Option<Outcome<V, E>> {
    match self {
      MemoCache::Coarse(cache) => cache.peek(key),
      MemoCache::SingleFlight(cache) => cache.peek(key),
    }
  }

  fn contains_key(&self, key: &K) -> bool {
    match self {
      MemoCache::Coarse(cache) => cache.contains_key(key),
      MemoCache::SingleFlight(cache) => cache.contains_key(key),
    }
  }

  fn len(&self) -> usize {
    match self {
      MemoCache::Coarse(cache) => cache.len(),
      MemoCache::SingleFlight(cache) => cache.len(),
    }
  }

  fn metrics(&self) -> MetricsSnapshot {
    match self {
      MemoCache::Coarse(cache) => cache.metrics(),
      MemoCache::SingleFlight(cache) => cache.metrics(),
    }
  }
}
