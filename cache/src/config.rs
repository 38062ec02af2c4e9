//! Plain-data configuration for building a memo cache.
//!
//! With the `serde` feature enabled, [`MemoConfig`] can be deserialized
//! straight out of an application's configuration file and handed to
//! [`MemoCacheBuilder::config`](crate::MemoCacheBuilder::config).

/// Which concurrency discipline backs a memo cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
  /// One lock held across lookup, compute and store.
  Coarse,
  /// A short-lived lock that only registers per-key in-flight slots.
  #[default]
  SingleFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MemoConfig {
  pub strategy: Strategy,
  /// Number of table shards. Only meaningful for [`Strategy::SingleFlight`];
  /// rounded up to a power of two when the cache is built.
  pub shards: usize,
}

impl Default for MemoConfig {
  fn default() -> Self {
    Self {
      strategy: Strategy::default(),
      shards: 1,
    }
  }
}
