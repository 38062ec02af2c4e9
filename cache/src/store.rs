use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;

/// A helper function to hash a key using a `BuildHasher`.
#[inline]
pub(crate) fn hash_key<Q: Hash + ?Sized, H: BuildHasher>(hasher: &H, key: &Q) -> u64 {
  let mut state = hasher.build_hasher();
  key.hash(&mut state);
  state.finish()
}

/// A key table partitioned into independently locked shards.
///
/// Each shard is a plain `HashMap` behind an exclusive lock. A key always
/// hashes to the same shard, so "does this key have an entry yet" is decided
/// under exactly one lock no matter how many shards there are.
pub(crate) struct ShardedTable<K, S, H> {
  shards: Box<[CachePadded<Mutex<HashMap<K, S, H>>>]>,
  hasher: H,
}

impl<K, S, H> fmt::Debug for ShardedTable<K, S, H> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShardedTable")
      .field("num_shards", &self.shards.len())
      .finish()
  }
}

impl<K, S, H> ShardedTable<K, S, H>
where
  K: Eq + Hash,
  H: BuildHasher + Clone,
{
  /// Creates a table with `num_shards` shards. The builder guarantees
  /// `num_shards` is a non-zero power of two.
  pub(crate) fn new(num_shards: usize, hasher: H) -> Self {
    debug_assert!(num_shards.is_power_of_two());
    let mut shards = Vec::with_capacity(num_shards);
    for _ in 0..num_shards {
      let shard_map = HashMap::with_hasher(hasher.clone());
      shards.push(CachePadded::new(Mutex::new(shard_map)));
    }

    Self {
      shards: shards.into_boxed_slice(),
      hasher,
    }
  }

  /// Returns the index of the shard responsible for `key`.
  #[inline]
  pub(crate) fn shard_index<Q>(&self, key: &Q) -> usize
  where
    K: Borrow<Q>,
    Q: Hash + ?Sized,
  {
    let hash = hash_key(&self.hasher, key);
    hash as usize & (self.shards.len() - 1)
  }

  /// Returns the lock guarding the shard for a given key.
  #[inline]
  pub(crate) fn shard<Q>(&self, key: &Q) -> &Mutex<HashMap<K, S, H>>
  where
    K: Borrow<Q>,
    Q: Hash + ?Sized,
  {
    &self.shards[self.shard_index(key)]
  }

  pub(crate) fn num_shards(&self) -> usize {
    self.shards.len()
  }

  /// Counts the keys across all shards, locking each shard in turn.
  pub(crate) fn len(&self) -> usize {
    self.shards.iter().map(|shard| shard.lock().len()).sum()
  }
}
