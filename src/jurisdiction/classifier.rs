//! Jurisdiction classifier.
//!
//! Walks `Unclassified → Classifying(rule) → Classified(type) | Fallback`
//! over the decision table. Never fails: a location that no rule matches
//! falls back to an unincorporated area with low confidence.

use std::fmt;
use tracing::debug;

use super::rules::{Rule, RuleInput, DECISION_TABLE};
use super::types::{ApplicableLevels, ClassificationSource, Jurisdiction, JurisdictionType};
use crate::geo::PostalLocation;

pub const FALLBACK_CONFIDENCE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    Unclassified,
    Classifying { rule_index: usize },
    Classified(JurisdictionType),
    Fallback,
}

impl fmt::Display for ClassifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclassified => write!(f, "Unclassified"),
            Self::Classifying { rule_index } => match DECISION_TABLE.get(*rule_index) {
                Some(rule) => write!(f, "Classifying({})", rule.name()),
                None => write!(f, "Classifying(#{})", rule_index),
            },
            Self::Classified(kind) => write!(f, "Classified({})", kind),
            Self::Fallback => write!(f, "Fallback"),
        }
    }
}

pub struct JurisdictionClassifier {
    rules: &'static [Rule],
}

impl Default for JurisdictionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl JurisdictionClassifier {
    pub fn new() -> Self {
        Self { rules: DECISION_TABLE }
    }

    pub fn classify(&self, location: &PostalLocation) -> Jurisdiction {
        let input = RuleInput {
            locality: location.locality.as_deref(),
            county: &location.county,
        };

        let mut state = ClassifierState::Unclassified;
        let mut trace = vec![state.to_string()];
        let mut outcome = None;

        loop {
            state = match state {
                ClassifierState::Unclassified if self.rules.is_empty() => ClassifierState::Fallback,
                ClassifierState::Unclassified => ClassifierState::Classifying { rule_index: 0 },
                ClassifierState::Classifying { rule_index } => {
                    match self.rules[rule_index].evaluate(&input) {
                        Some(out) => {
                            let kind = out.kind;
                            outcome = Some((self.rules[rule_index].name(), out));
                            ClassifierState::Classified(kind)
                        }
                        None if rule_index + 1 < self.rules.len() => {
                            ClassifierState::Classifying { rule_index: rule_index + 1 }
                        }
                        None => ClassifierState::Fallback,
                    }
                }
                ClassifierState::Classified(_) | ClassifierState::Fallback => break,
            };
            trace.push(state.to_string());
        }

        let jurisdiction = match (state, outcome) {
            (ClassifierState::Classified(kind), Some((rule, out))) => Jurisdiction {
                kind,
                confidence: out.confidence,
                source: out.source,
                applicable_levels: ApplicableLevels::for_type(kind),
                rationale: out.rationale,
                matched_rule: Some(rule.to_string()),
                place: out.place,
                county: Some(location.county.clone()),
                trace,
            },
            _ => Jurisdiction {
                kind: JurisdictionType::UnincorporatedArea,
                confidence: FALLBACK_CONFIDENCE,
                source: ClassificationSource::Fallback,
                applicable_levels: ApplicableLevels::for_type(JurisdictionType::UnincorporatedArea),
                rationale: format!(
                    "no locality evidence for {}; assuming unincorporated {}",
                    location.postal_code, location.county
                ),
                matched_rule: None,
                place: None,
                county: Some(location.county.clone()),
                trace,
            },
        };

        debug!(
            postal = %location.postal_code,
            kind = %jurisdiction.kind,
            confidence = jurisdiction.confidence,
            rule = jurisdiction.matched_rule.as_deref().unwrap_or("fallback"),
            "classified jurisdiction"
        );
        jurisdiction
    }
}
