//! The jurisdiction decision table.
//!
//! Rules are evaluated strictly in table order; the first rule that fires
//! decides the classification. Each rule carries its own confidence so the
//! outcome of every row can be tested in isolation.

use super::types::{ClassificationSource, JurisdictionType};
use crate::reference::{self, places};

/// Inputs the rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub locality: Option<&'a str>,
    pub county: &'a str,
}

/// What a fired rule decided.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub kind: JurisdictionType,
    pub confidence: f64,
    pub source: ClassificationSource,
    pub rationale: String,
    pub place: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registry {
    Incorporated,
    CensusDesignated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPosition {
    Prefix,
    Suffix,
    Anywhere,
}

/// One row of the decision table.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Exact (case-insensitive) match against a curated registry.
    RegistryMatch {
        name: &'static str,
        registry: Registry,
        confidence: f64,
        /// Confidence used when the registry county disagrees with the
        /// location's county.
        mismatch_confidence: f64,
    },
    /// A name marker in the locality guess.
    LocalityMarker {
        name: &'static str,
        markers: &'static [&'static str],
        position: MarkerPosition,
        kind: JurisdictionType,
        confidence: f64,
    },
    /// The locality is just the county's own name.
    CountyEcho { name: &'static str, confidence: f64 },
    /// A locality with no municipal-government marker and no registry entry.
    NoMunicipalMarker { name: &'static str, confidence: f64 },
}

pub const DECISION_TABLE: &[Rule] = &[
    Rule::RegistryMatch {
        name: "incorporated_registry",
        registry: Registry::Incorporated,
        confidence: 0.95,
        mismatch_confidence: 0.6,
    },
    Rule::RegistryMatch {
        name: "cdp_registry",
        registry: Registry::CensusDesignated,
        confidence: 0.75,
        mismatch_confidence: 0.5,
    },
    Rule::LocalityMarker {
        name: "unincorporated_marker",
        markers: &["unincorporated"],
        position: MarkerPosition::Anywhere,
        kind: JurisdictionType::UnincorporatedArea,
        confidence: 0.55,
    },
    Rule::LocalityMarker {
        name: "cdp_marker",
        markers: &[" cdp", "census designated place"],
        position: MarkerPosition::Suffix,
        kind: JurisdictionType::CensusDesignatedPlace,
        confidence: 0.5,
    },
    Rule::LocalityMarker {
        name: "municipal_marker",
        markers: &["city of ", "town of "],
        position: MarkerPosition::Prefix,
        kind: JurisdictionType::IncorporatedCity,
        confidence: 0.45,
    },
    Rule::CountyEcho {
        name: "county_echo",
        confidence: 0.4,
    },
    Rule::NoMunicipalMarker {
        name: "no_municipal_marker",
        confidence: 0.35,
    },
];

/// Strip a leading "City of " / "Town of " so registry lookups see the
/// bare place name.
fn strip_municipal_prefix(locality: &str) -> &str {
    let trimmed = locality.trim();
    for prefix in ["city of ", "town of "] {
        let head = trimmed.get(..prefix.len());
        if trimmed.len() > prefix.len() && head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) {
            return trimmed[prefix.len()..].trim();
        }
    }
    trimmed
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegistryMatch { name, .. }
            | Self::LocalityMarker { name, .. }
            | Self::CountyEcho { name, .. }
            | Self::NoMunicipalMarker { name, .. } => name,
        }
    }

    pub fn evaluate(&self, input: &RuleInput<'_>) -> Option<RuleOutcome> {
        let locality = input.locality.map(str::trim).filter(|l| !l.is_empty())?;

        match *self {
            Rule::RegistryMatch { registry, confidence, mismatch_confidence, .. } => {
                let bare = strip_municipal_prefix(locality);
                let (entry, kind, source, label) = match registry {
                    Registry::Incorporated => (
                        places::incorporated_city(bare)?,
                        JurisdictionType::IncorporatedCity,
                        ClassificationSource::IncorporatedRegistry,
                        "incorporated-city registry",
                    ),
                    Registry::CensusDesignated => (
                        places::census_designated_place(bare)?,
                        JurisdictionType::CensusDesignatedPlace,
                        ClassificationSource::CdpRegistry,
                        "census-designated-place registry",
                    ),
                };
                let (place, registry_county) = entry;
                let (confidence, rationale) = if registry_county == input.county {
                    (confidence, format!("'{}' is listed in the {} ({})", place, label, registry_county))
                } else {
                    (
                        mismatch_confidence,
                        format!(
                            "'{}' is listed in the {} under {}, but the location resolved to {}",
                            place, label, registry_county, input.county
                        ),
                    )
                };
                Some(RuleOutcome {
                    kind,
                    confidence,
                    source,
                    rationale,
                    place: Some(place.to_string()),
                })
            }
            Rule::LocalityMarker { markers, position, kind, confidence, .. } => {
                let lower = locality.to_lowercase();
                let marker = markers.iter().find(|m| match position {
                    MarkerPosition::Prefix => lower.starts_with(*m),
                    MarkerPosition::Suffix => lower.ends_with(*m),
                    MarkerPosition::Anywhere => lower.contains(*m),
                })?;
                Some(RuleOutcome {
                    kind,
                    confidence,
                    source: ClassificationSource::LocalityHeuristic,
                    rationale: format!("locality '{}' carries the marker '{}'", locality, marker.trim()),
                    place: None,
                })
            }
            Rule::CountyEcho { confidence, .. } => {
                if reference::name_stem(locality) != reference::name_stem(input.county) {
                    return None;
                }
                Some(RuleOutcome {
                    kind: JurisdictionType::UnincorporatedArea,
                    confidence,
                    source: ClassificationSource::LocalityHeuristic,
                    rationale: format!(
                        "locality '{}' only names the county and no city registry matched",
                        locality
                    ),
                    place: None,
                })
            }
            Rule::NoMunicipalMarker { confidence, .. } => Some(RuleOutcome {
                kind: JurisdictionType::UnincorporatedArea,
                confidence,
                source: ClassificationSource::LocalityHeuristic,
                rationale: format!(
                    "locality '{}' has no municipal-government marker and no registry entry",
                    locality
                ),
                place: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(locality: Option<&'a str>, county: &'a str) -> RuleInput<'a> {
        RuleInput { locality, county }
    }

    fn rule(name: &str) -> &'static Rule {
        DECISION_TABLE.iter().find(|r| r.name() == name).unwrap()
    }

    #[test]
    fn test_incorporated_registry() {
        let out = rule("incorporated_registry")
            .evaluate(&input(Some("City of Sacramento"), "Sacramento County"))
            .unwrap();
        assert_eq!(out.kind, JurisdictionType::IncorporatedCity);
        assert_eq!(out.place.as_deref(), Some("Sacramento"));
        approx::assert_abs_diff_eq!(out.confidence, 0.95);
    }

    #[test]
    fn test_registry_county_mismatch_lowers_confidence() {
        let out = rule("incorporated_registry")
            .evaluate(&input(Some("Riverside"), "San Bernardino County"))
            .unwrap();
        approx::assert_abs_diff_eq!(out.confidence, 0.6);
        assert!(out.rationale.contains("San Bernardino County"));
    }

    #[test]
    fn test_cdp_registry() {
        let out = rule("cdp_registry")
            .evaluate(&input(Some("Carmichael"), "Sacramento County"))
            .unwrap();
        assert_eq!(out.kind, JurisdictionType::CensusDesignatedPlace);
    }

    #[test]
    fn test_markers() {
        let out = rule("unincorporated_marker")
            .evaluate(&input(Some("Unincorporated Sacramento County"), "Sacramento County"))
            .unwrap();
        assert_eq!(out.kind, JurisdictionType::UnincorporatedArea);

        let out = rule("cdp_marker")
            .evaluate(&input(Some("Sloughhouse CDP"), "Sacramento County"))
            .unwrap();
        assert_eq!(out.kind, JurisdictionType::CensusDesignatedPlace);

        let out = rule("municipal_marker")
            .evaluate(&input(Some("Town of Nowhere"), "Sacramento County"))
            .unwrap();
        assert_eq!(out.kind, JurisdictionType::IncorporatedCity);
        assert!(rule("municipal_marker").evaluate(&input(Some("Sloughhouse"), "Sacramento County")).is_none());
    }

    #[test]
    fn test_county_echo() {
        let r = rule("county_echo");
        assert!(r.evaluate(&input(Some("Sacramento County"), "Sacramento County")).is_some());
        assert!(r.evaluate(&input(Some("Sloughhouse"), "Sacramento County")).is_none());
    }

    #[test]
    fn test_no_locality_never_fires() {
        for r in DECISION_TABLE {
            assert!(r.evaluate(&input(None, "Sacramento County")).is_none(), "{}", r.name());
            assert!(r.evaluate(&input(Some("  "), "Sacramento County")).is_none(), "{}", r.name());
        }
    }

    #[test]
    fn test_table_order_is_registry_first() {
        assert_eq!(DECISION_TABLE[0].name(), "incorporated_registry");
        assert_eq!(DECISION_TABLE[1].name(), "cdp_registry");
        assert_eq!(DECISION_TABLE.last().unwrap().name(), "no_municipal_marker");
    }
}
