//! Representative records, upstream sources and per-level aggregation.

pub mod aggregator;
pub mod normalize;
pub mod sources;
pub mod types;

pub use aggregator::{sort_records, LevelAggregator, LevelFetch};
pub use sources::{CommitteeSource, HttpSource, RegistrySource, RepresentativeSource, SourceQuery};
pub use types::{
    Address, Candidate, Chamber, CommitteeDetail, CommitteeMembership, ContactInfo, RepresentativeRecord, Term,
};
