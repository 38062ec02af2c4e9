use thiserror::Error;

/// Errors that can occur when building a memo cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The cache was configured with zero shards, which is not allowed.
  #[error("shard count cannot be zero")]
  ZeroShards,
  /// More than one shard was requested for the coarse strategy, which by
  /// definition serializes every key on a single lock.
  #[error("the coarse strategy uses a single lock and cannot be split into {0} shards")]
  ShardedCoarse(usize),
  /// The requested shard count exceeds the supported maximum once rounded up
  /// to a power of two.
  #[error("shard count {0} exceeds the maximum of {max}", max = crate::builder::MAX_SHARDS)]
  TooManyShards(usize),
}
