#![allow(dead_code)]

use fibre_memo::{MemoCache, MemoCacheBuilder, SingleFlightCache, Strategy};

use tracing_subscriber::EnvFilter;

/// Every strategy, so contract tests can run against both.
pub const STRATEGIES: [Strategy; 2] = [Strategy::Coarse, Strategy::SingleFlight];

/// Installs a test-friendly subscriber once per test binary.
/// Set `RUST_LOG=fibre_memo=trace` to see leader/follower decisions.
pub fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn build_test_cache<V, E>(strategy: Strategy) -> MemoCache<String, V, E> {
  init_tracing();
  MemoCacheBuilder::new().strategy(strategy).build().unwrap()
}

pub fn build_single_flight<V, E>(shards: usize) -> SingleFlightCache<String, V, E> {
  init_tracing();
  MemoCacheBuilder::new()
    .shards(shards)
    .build_single_flight()
    .unwrap()
}
