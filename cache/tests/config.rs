#![cfg(feature = "serde")]

mod common;

use common::init_tracing;
use fibre_memo::{BuildError, MemoCache, MemoCacheBuilder, MemoConfig, Memoize, Strategy};

fn build_from_json(json: &str) -> Result<MemoCache<String, u64, String>, BuildError> {
  init_tracing();
  let config: MemoConfig = serde_json::from_str(json).unwrap();
  MemoCacheBuilder::new().config(config).build()
}

#[test]
fn test_config_defaults() {
  let config: MemoConfig = serde_json::from_str("{}").unwrap();
  assert_eq!(config, MemoConfig::default());
  assert_eq!(config.strategy, Strategy::SingleFlight);
  assert_eq!(config.shards, 1);
}

#[test]
fn test_config_selects_strategy() {
  let coarse = build_from_json(r#"{ "strategy": "coarse" }"#).unwrap();
  assert_eq!(coarse.strategy(), Strategy::Coarse);

  let single_flight = build_from_json(r#"{ "strategy": "single_flight", "shards": 12 }"#).unwrap();
  match &single_flight {
    MemoCache::SingleFlight(cache) => assert_eq!(cache.shards(), 16),
    MemoCache::Coarse(_) => panic!("expected a single-flight cache"),
  }

  // Either way the contract is the same.
  for cache in [coarse, single_flight] {
    assert_eq!(*cache.get(&"k".to_string(), || Ok(3)).unwrap(), 3);
    assert_eq!(*cache.get(&"k".to_string(), || Ok(4)).unwrap(), 3);
  }
}

#[test]
fn test_config_validation_errors() {
  let err = build_from_json(r#"{ "strategy": "coarse", "shards": 8 }"#).unwrap_err();
  assert_eq!(err, BuildError::ShardedCoarse(8));
  assert!(err.to_string().contains("single lock"));

  let err = build_from_json(r#"{ "shards": 0 }"#).unwrap_err();
  assert_eq!(err, BuildError::ZeroShards);

  // A shard count read from a config file must fail cleanly, not overflow.
  let huge = (usize::MAX >> 1) + 2;
  let err = build_from_json(&format!(r#"{{ "strategy": "single_flight", "shards": {huge} }}"#))
    .unwrap_err();
  assert_eq!(err, BuildError::TooManyShards(huge));
  assert!(err.to_string().contains("exceeds the maximum"));
}

#[test]
fn test_metrics_snapshot_serializes() {
  let cache = build_from_json("{}").unwrap();
  cache.get(&"a".to_string(), || Ok(1)).unwrap();
  cache.get(&"a".to_string(), || Ok(2)).unwrap();
  let _ = cache.get(&"b".to_string(), || Err("nope".to_string()));

  let json = serde_json::to_value(cache.metrics()).unwrap();
  assert_eq!(json["misses"], 2);
  assert_eq!(json["hits"], 1);
  assert_eq!(json["failures"], 1);
  assert_eq!(json["entries"], 2);
}
