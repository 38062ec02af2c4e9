use crate::config::{MemoConfig, Strategy};
use crate::error::BuildError;
use crate::handles::{CoarseCache, MemoCache, SingleFlightCache};

use core::fmt;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

/// The largest shard count a single-flight cache accepts.
pub const MAX_SHARDS: usize = 1 << 16;

/// A builder for creating memo caches.
///
/// ```
/// use fibre_memo::{MemoCache, MemoCacheBuilder, Memoize, Strategy};
///
/// let cache: MemoCache<u32, String, std::io::Error> = MemoCacheBuilder::new()
///   .strategy(Strategy::SingleFlight)
///   .build()
///   .unwrap();
///
/// let value = cache.get(&7, || Ok("seven".to_string())).unwrap();
/// assert_eq!(value.as_str(), "seven");
/// ```
pub struct MemoCacheBuilder<K, V, E, H = ahash::RandomState> {
  pub(crate) strategy: Strategy,
  pub(crate) shards: usize,
  pub(crate) hasher: H,
  _marker: PhantomData<fn() -> (K, V, E)>,
}

impl<K, V, E, H> fmt::Debug for MemoCacheBuilder<K, V, E, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MemoCacheBuilder")
      .field("strategy", &self.strategy)
      .field("shards", &self.shards)
      .finish_non_exhaustive()
  }
}

// --- General Configuration Methods ---
impl<K, V, E, H> MemoCacheBuilder<K, V, E, H> {
  /// Selects the concurrency strategy. Defaults to [`Strategy::SingleFlight`].
  pub fn strategy(mut self, strategy: Strategy) -> Self {
    self.strategy = strategy;
    self
  }

  /// Sets the number of independently locked table shards.
  ///
  /// Defaults to `1`, a single table lock. Values are rounded up to the next
  /// power of two at build time and may not exceed [`MAX_SHARDS`]. Only the
  /// single-flight strategy can be sharded.
  pub fn shards(mut self, shards: usize) -> Self {
    self.shards = shards;
    self
  }

  /// Applies every setting from a [`MemoConfig`].
  pub fn config(self, config: MemoConfig) -> Self {
    self.strategy(config.strategy).shards(config.shards)
  }

  /// Sets the hasher for the cache's table.
  pub fn hasher<H2>(self, hasher: H2) -> MemoCacheBuilder<K, V, E, H2> {
    MemoCacheBuilder {
      strategy: self.strategy,
      shards: self.shards,
      hasher,
      _marker: PhantomData,
    }
  }

  /// Validates the builder configuration.
  pub(crate) fn validate(&self) -> Result<(), BuildError> {
    if self.shards == 0 {
      return Err(BuildError::ZeroShards);
    }
    if self.strategy == Strategy::Coarse && self.shards > 1 {
      return Err(BuildError::ShardedCoarse(self.shards));
    }
    match self.shards.checked_next_power_of_two() {
      Some(rounded) if rounded <= MAX_SHARDS => Ok(()),
      _ => Err(BuildError::TooManyShards(self.shards)),
    }
  }
}

// --- Default Constructor ---
impl<K, V, E, H: BuildHasher + Default> MemoCacheBuilder<K, V, E, H> {
  /// Creates a new `MemoCacheBuilder` with default settings.
  pub fn new() -> Self {
    Self {
      strategy: Strategy::default(),
      shards: 1,
      hasher: H::default(),
      _marker: PhantomData,
    }
  }
}

impl<K, V, E> Default for MemoCacheBuilder<K, V, E, ahash::RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

// --- Build Methods ---
impl<K, V, E, H> MemoCacheBuilder<K, V, E, H>
where
  K: Eq + Hash + Clone,
  H: BuildHasher + Clone,
{
  /// Builds a cache backed by the configured strategy.
  pub fn build(self) -> Result<MemoCache<K, V, E, H>, BuildError> {
    match self.strategy {
      Strategy::Coarse => self.build_coarse().map(MemoCache::Coarse),
      Strategy::SingleFlight => self.build_single_flight().map(MemoCache::SingleFlight),
    }
  }

  /// Builds a [`CoarseCache`], ignoring the configured strategy.
  pub fn build_coarse(self) -> Result<CoarseCache<K, V, E, H>, BuildError> {
    self.strategy(Strategy::Coarse).validate_into(|b| {
      CoarseCache::with_hasher(b.hasher)
    })
  }

  /// Builds a [`SingleFlightCache`], ignoring the configured strategy.
  pub fn build_single_flight(self) -> Result<SingleFlightCache<K, V, E, H>, BuildError> {
    self.strategy(Strategy::SingleFlight).validate_into(|b| {
      let shards = b.shards.next_power_of_two();
      tracing::debug!(shards, "building single-flight memo cache");
      SingleFlightCache::with_shards(shards, b.hasher)
    })
  }

  fn validate_into<C>(self, build: impl FnOnce(Self) -> C) -> Result<C, BuildError> {
    self.validate()?;
    Ok(build(self))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Builder = MemoCacheBuilder<u32, u32, ()>;

  #[test]
  fn defaults_to_single_unsharded_flight() {
    let builder = Builder::default();
    assert_eq!(builder.strategy, Strategy::SingleFlight);
    assert_eq!(builder.shards, 1);

    let cache = builder.build_single_flight().unwrap();
    assert_eq!(cache.shards(), 1);
  }

  #[test]
  fn rounds_shards_up() {
    let cache = Builder::new().shards(5).build_single_flight().unwrap();
    assert_eq!(cache.shards(), 8);
  }

  #[test]
  fn rejects_invalid_shards() {
    assert_eq!(
      Builder::new().shards(0).build().unwrap_err(),
      BuildError::ZeroShards
    );
    assert_eq!(
      Builder::new().shards(4).build_coarse().unwrap_err(),
      BuildError::ShardedCoarse(4)
    );
    assert_eq!(
      Builder::new().shards(MAX_SHARDS + 1).build().unwrap_err(),
      BuildError::TooManyShards(MAX_SHARDS + 1)
    );
    let huge = (usize::MAX >> 1) + 2;
    assert_eq!(
      Builder::new().shards(huge).build_single_flight().unwrap_err(),
      BuildError::TooManyShards(huge)
    );
  }

  #[test]
  fn accepts_max_shards() {
    let cache = Builder::new().shards(MAX_SHARDS).build_single_flight().unwrap();
    assert_eq!(cache.shards(), MAX_SHARDS);
  }

  #[test]
  fn config_selects_strategy() {
    let config = MemoConfig {
      strategy: Strategy::Coarse,
      shards: 1,
    };
    let cache = Builder::new().config(config).build().unwrap();
    assert_eq!(cache.strategy(), Strategy::Coarse);
  }
}
