//! Government levels and jurisdiction records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A level of government. Ordered from widest to narrowest scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Federal,
    State,
    County,
    Municipal,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Federal, Level::State, Level::County, Level::Municipal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => "federal",
            Self::State => "state",
            Self::County => "county",
            Self::Municipal => "municipal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "federal" | "national" | "us" | "congress" => Ok(Self::Federal),
            "state" => Ok(Self::State),
            "county" => Ok(Self::County),
            "municipal" | "city" | "local" | "town" => Ok(Self::Municipal),
            other => Err(format!("Unknown government level '{}'", other)),
        }
    }
}

/// Incorporation status of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionType {
    IncorporatedCity,
    CensusDesignatedPlace,
    UnincorporatedArea,
    Unknown,
}

impl fmt::Display for JurisdictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncorporatedCity => write!(f, "incorporated_city"),
            Self::CensusDesignatedPlace => write!(f, "census_designated_place"),
            Self::UnincorporatedArea => write!(f, "unincorporated_area"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The set of government levels that apply to a location.
///
/// Only constructible through [`ApplicableLevels::for_type`], so federal and
/// state are always present and municipal is present exactly for
/// incorporated cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Level>", into = "Vec<Level>")]
pub struct ApplicableLevels(BTreeSet<Level>);

impl ApplicableLevels {
    pub fn for_type(kind: JurisdictionType) -> Self {
        let levels: &[Level] = match kind {
            JurisdictionType::IncorporatedCity => &Level::ALL,
            JurisdictionType::CensusDesignatedPlace | JurisdictionType::UnincorporatedArea => {
                &[Level::Federal, Level::State, Level::County]
            }
            JurisdictionType::Unknown => &[Level::Federal, Level::State],
        };
        Self(levels.iter().copied().collect())
    }

    pub fn contains(&self, level: Level) -> bool {
        self.0.contains(&level)
    }

    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<Level>> for ApplicableLevels {
    type Error = String;

    fn try_from(levels: Vec<Level>) -> Result<Self, Self::Error> {
        let set: BTreeSet<Level> = levels.into_iter().collect();
        if !set.contains(&Level::Federal) || !set.contains(&Level::State) {
            return Err("applicable levels must include federal and state".into());
        }
        Ok(Self(set))
    }
}

impl From<ApplicableLevels> for Vec<Level> {
    fn from(levels: ApplicableLevels) -> Self {
        levels.0.into_iter().collect()
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    IncorporatedRegistry,
    CdpRegistry,
    LocalityHeuristic,
    Fallback,
    Unresolved,
}

/// A classified location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub kind: JurisdictionType,
    pub confidence: f64,
    pub source: ClassificationSource,
    pub applicable_levels: ApplicableLevels,
    pub rationale: String,
    /// Name of the decision-table rule that fired, if any.
    #[serde(default)]
    pub matched_rule: Option<String>,
    /// Canonical place name when a registry matched.
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    /// States the classifier walked through, in order.
    #[serde(default)]
    pub trace: Vec<String>,
}

impl Jurisdiction {
    /// Classification for a postal code whose location could not be resolved.
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self {
            kind: JurisdictionType::Unknown,
            confidence: 0.0,
            source: ClassificationSource::Unresolved,
            applicable_levels: ApplicableLevels::for_type(JurisdictionType::Unknown),
            rationale: reason.into(),
            matched_rule: None,
            place: None,
            county: None,
            trace: vec!["Unclassified".into(), "Fallback".into()],
        }
    }
}
