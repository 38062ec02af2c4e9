//! Once-only, concurrent memoization.
//!
//! A memo cache maps a key to the result of the first computation requested
//! for it. The computation runs at most once per key for the lifetime of the
//! cache, no matter how many threads ask for that key at the same time, and
//! its result (a value *or* an error) is handed to every caller.
//!
//! # Strategies
//! - **[`CoarseCache`]**: one lock held across lookup, compute and store.
//!   Trivially correct, but a slow computation blocks every other key.
//! - **[`SingleFlightCache`]**: the lock only registers a per-key in-flight
//!   slot. Unrelated keys compute in parallel; callers racing on the same key
//!   wait for the first computation and share its result. Supports async
//!   callers via [`SingleFlightCache::get_async`].
//!
//! Both implement [`Memoize`], and [`MemoCache`] erases the choice so it can
//! be made from configuration at runtime.
//!
//! # Non-goals
//! There is no eviction, expiry, size bound or invalidation. Keys are never
//! removed, and failed computations are never retried.

// Public modules that form the API
pub mod builder;
pub mod config;
pub mod entry;
pub mod error;
pub mod handles;
pub mod memoize;
pub mod metrics;

// Internal, crate-only modules
mod slot;
mod store;

// Re-export the primary user-facing types for convenience
pub use builder::MemoCacheBuilder;
pub use config::{MemoConfig, Strategy};
pub use entry::Outcome;
pub use error::BuildError;
pub use handles::{CoarseCache, MemoCache, SingleFlightCache};
pub use memoize::Memoize;
pub use metrics::MetricsSnapshot;
