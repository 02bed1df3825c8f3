//! Tiered cache: per-category partitions with TTL classes.

pub mod manager;
pub mod partition;
pub mod snapshot;

pub use manager::{
    event_binding, location_tags, CacheRead, CacheStats, EventBinding, FetchTicket, InvalidationReport,
    TieredCacheManager, EVENTS,
};
pub use partition::{CacheEntry, Category, TtlClass, TtlPolicy, WriteOutcome};
