//! Civic Locator: postal code → elected officials across federal, state,
//! county and municipal government, for California.

pub mod cache;
pub mod collision;
pub mod config;
pub mod error;
pub mod geo;
pub mod jurisdiction;
pub mod orchestrator;
pub mod preload;
pub mod reference;
pub mod representatives;
pub mod scheduler;
pub mod server;
pub mod validation;

pub use error::{ResolveError, Warning, WarningKind};
pub use orchestrator::{AggregateResult, Collaborators, ResolutionOrchestrator, ResolveFlags};
