//! Jurisdiction classification: which government levels apply to a location.

pub mod classifier;
pub mod rules;
pub mod types;

pub use classifier::{ClassifierState, JurisdictionClassifier};
pub use rules::{Rule, DECISION_TABLE};
pub use types::{ApplicableLevels, ClassificationSource, Jurisdiction, JurisdictionType, Level};
