//! Representative records and the candidate shape produced by aggregators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::jurisdiction::Level;

/// The body or office kind a representative sits in. Selects the legal
/// district range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chamber {
    UsSenate,
    UsHouse,
    StateSenate,
    StateAssembly,
    /// Statewide executive office (governor, attorney general, ...).
    Executive,
    CountyBoard,
    /// Elected county row office (sheriff, assessor, ...).
    CountyOffice,
    CityCouncil,
    /// Elected or appointed city office (mayor, city attorney, ...).
    CityOffice,
}

impl Chamber {
    /// The level a chamber belongs to.
    pub fn level(&self) -> Level {
        match self {
            Self::UsSenate | Self::UsHouse => Level::Federal,
            Self::StateSenate | Self::StateAssembly | Self::Executive => Level::State,
            Self::CountyBoard | Self::CountyOffice => Level::County,
            Self::CityCouncil | Self::CityOffice => Level::Municipal,
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UsSenate => "us_senate",
            Self::UsHouse => "us_house",
            Self::StateSenate => "state_senate",
            Self::StateAssembly => "state_assembly",
            Self::Executive => "executive",
            Self::CountyBoard => "county_board",
            Self::CountyOffice => "county_office",
            Self::CityCouncil => "city_council",
            Self::CityOffice => "city_office",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.street.is_none() && self.city.is_none() && self.state.is_none() && self.postal_code.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub office: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub start: NaiveDate,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeMembership {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// An elected official, tagged with exactly one government level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentativeRecord {
    /// Stable upstream identifier.
    pub id: String,
    pub name: String,
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub chamber: Option<Chamber>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub district: Option<u32>,
    /// The governed entity ("Sacramento County", "Sacramento", "California").
    pub jurisdiction: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub term: Option<Term>,
    #[serde(default)]
    pub committees: Vec<CommitteeMembership>,
    /// Collaborator the record came from.
    pub source: String,
}

/// A normalized upstream record whose level has not been decided yet.
///
/// Aggregators attach `level_tag` only when the upstream record states its
/// level explicitly; the collision resolver decides the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub title: String,
    pub level_tag: Option<Level>,
    /// Jurisdictional scope metadata (OCD division id or `kind:name`).
    pub scope: Option<String>,
    /// The aggregator that fetched this record.
    pub origin: Level,
    pub chamber: Option<Chamber>,
    pub party: Option<String>,
    pub district: Option<u32>,
    pub jurisdiction: String,
    pub contact: ContactInfo,
    pub term: Option<Term>,
    pub committees: Vec<CommitteeMembership>,
    pub source: String,
}

impl Candidate {
    /// Seal the candidate into a record at the decided level.
    pub fn into_record(self, level: Level) -> RepresentativeRecord {
        let chamber = self.chamber.filter(|c| c.level() == level);
        RepresentativeRecord {
            id: self.id,
            name: self.name,
            title: self.title,
            level,
            chamber,
            party: self.party,
            district: self.district,
            jurisdiction: self.jurisdiction,
            contact: self.contact,
            term: self.term,
            committees: self.committees,
            source: self.source,
        }
    }
}

/// Committee detail fetched for a representative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeDetail {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub chamber: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}
