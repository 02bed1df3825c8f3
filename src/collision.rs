//! Name-collision resolution.
//!
//! A county and a city often share a proper name ("Riverside" city inside
//! "Riverside County"), so a name-keyed registry join returns officials of
//! both governments together. Each candidate is attributed to a level by a
//! priority-ordered discriminator chain:
//!
//! 1. the explicit level tag the aggregator attached (authoritative),
//! 2. the official-title taxonomy,
//! 3. jurisdictional-scope metadata (OCD division ids or `kind:name`).
//!
//! A candidate none of them can place is excluded, never guessed.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::error::{Warning, WarningKind};
use crate::jurisdiction::Level;
use crate::reference;
use crate::representatives::{Candidate, Chamber, RepresentativeRecord};

/// Title phrases, most specific first. Matching is on whole words after
/// punctuation is folded to spaces.
const TITLE_TAXONOMY: &[(&str, Chamber)] = &[
    // federal
    ("u s senator", Chamber::UsSenate),
    ("us senator", Chamber::UsSenate),
    ("united states senator", Chamber::UsSenate),
    ("u s representative", Chamber::UsHouse),
    ("us representative", Chamber::UsHouse),
    ("representative in congress", Chamber::UsHouse),
    ("member of congress", Chamber::UsHouse),
    ("congressman", Chamber::UsHouse),
    ("congresswoman", Chamber::UsHouse),
    ("congressmember", Chamber::UsHouse),
    // state
    ("state senator", Chamber::StateSenate),
    ("assembly member", Chamber::StateAssembly),
    ("assemblymember", Chamber::StateAssembly),
    ("assemblyman", Chamber::StateAssembly),
    ("assemblywoman", Chamber::StateAssembly),
    ("lieutenant governor", Chamber::Executive),
    ("governor", Chamber::Executive),
    ("attorney general", Chamber::Executive),
    ("secretary of state", Chamber::Executive),
    ("state controller", Chamber::Executive),
    ("state treasurer", Chamber::Executive),
    ("insurance commissioner", Chamber::Executive),
    ("superintendent of public instruction", Chamber::Executive),
    // county
    ("board of supervisors", Chamber::CountyBoard),
    ("supervisor", Chamber::CountyBoard),
    ("sheriff", Chamber::CountyOffice),
    ("assessor", Chamber::CountyOffice),
    ("district attorney", Chamber::CountyOffice),
    ("county clerk", Chamber::CountyOffice),
    ("clerk recorder", Chamber::CountyOffice),
    ("auditor controller", Chamber::CountyOffice),
    ("treasurer tax collector", Chamber::CountyOffice),
    ("public defender", Chamber::CountyOffice),
    ("county counsel", Chamber::CountyOffice),
    ("county executive", Chamber::CountyOffice),
    // municipal
    ("vice mayor", Chamber::CityOffice),
    ("mayor", Chamber::CityOffice),
    ("council member", Chamber::CityCouncil),
    ("councilmember", Chamber::CityCouncil),
    ("councilman", Chamber::CityCouncil),
    ("councilwoman", Chamber::CityCouncil),
    ("city council", Chamber::CityCouncil),
    ("city manager", Chamber::CityOffice),
    ("city attorney", Chamber::CityOffice),
    ("city clerk", Chamber::CityOffice),
    ("city treasurer", Chamber::CityOffice),
    // bare words last
    ("senator", Chamber::StateSenate),
    ("representative", Chamber::UsHouse),
];

fn fold_title(title: &str) -> String {
    let folded: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    format!(" {} ", folded.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Chamber implied by an official title, if the taxonomy knows it.
pub fn title_chamber(title: &str) -> Option<Chamber> {
    let folded = fold_title(title);
    TITLE_TAXONOMY
        .iter()
        .find(|(phrase, _)| folded.contains(&format!(" {} ", phrase)))
        .map(|(_, chamber)| *chamber)
}

pub fn title_level(title: &str) -> Option<Level> {
    title_chamber(title).map(|c| c.level())
}

/// Level named by scope metadata. Reads the most specific recognized
/// segment of an OCD-style path: `ocd-division/country:us/state:ca/cd:7`.
pub fn scope_level(scope: &str) -> Option<Level> {
    scope
        .trim()
        .to_lowercase()
        .split('/')
        .rev()
        .find_map(|segment| {
            let key = segment.split(':').next()?.trim();
            match key {
                "cd" | "country" | "federal" => Some(Level::Federal),
                "sldu" | "sldl" | "state" => Some(Level::State),
                "county" => Some(Level::County),
                "place" | "city" | "council_district" | "municipal" => Some(Level::Municipal),
                _ => None,
            }
        })
}

/// Which discriminator decided a candidate's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    LevelTag(Level),
    TitleTaxonomy(Level),
    ScopeMetadata(Level),
    Ambiguous,
}

impl Attribution {
    pub fn level(&self) -> Option<Level> {
        match *self {
            Self::LevelTag(l) | Self::TitleTaxonomy(l) | Self::ScopeMetadata(l) => Some(l),
            Self::Ambiguous => None,
        }
    }
}

/// A candidate the resolver refused to place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedCandidate {
    pub id: String,
    pub name: String,
    pub title: String,
    pub origin: Level,
}

#[derive(Debug, Default)]
pub struct ResolvedSet {
    pub records: Vec<RepresentativeRecord>,
    pub excluded: Vec<ExcludedCandidate>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Default)]
pub struct NameCollisionResolver;

impl NameCollisionResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn attribute(&self, candidate: &Candidate) -> Attribution {
        if let Some(tag) = candidate.level_tag {
            return Attribution::LevelTag(tag);
        }
        if let Some(level) = title_level(&candidate.title) {
            return Attribution::TitleTaxonomy(level);
        }
        if let Some(level) = candidate.scope.as_deref().and_then(scope_level) {
            return Attribution::ScopeMetadata(level);
        }
        Attribution::Ambiguous
    }

    /// Attribute every candidate, deduplicating by id across aggregators.
    pub fn resolve(&self, candidates: Vec<Candidate>) -> ResolvedSet {
        let mut set = ResolvedSet::default();

        // The same official can arrive through two aggregators when both
        // query a name-keyed registry; keep the explicitly tagged copy.
        let mut unique: Vec<Candidate> = Vec::with_capacity(candidates.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for c in candidates {
            match index.get(&c.id) {
                Some(&i) => {
                    if unique[i].level_tag.is_none() && c.level_tag.is_some() {
                        unique[i] = c;
                    }
                }
                None => {
                    index.insert(c.id.clone(), unique.len());
                    unique.push(c);
                }
            }
        }

        // stem -> levels its records resolved to, for collision reporting
        let mut stems: BTreeMap<String, (BTreeSet<Level>, usize)> = BTreeMap::new();

        for c in unique {
            let attribution = self.attribute(&c);

            if let (Attribution::LevelTag(tag), Some(title)) = (attribution, title_level(&c.title)) {
                if tag != title {
                    warn!(id = %c.id, title = %c.title, tag = %tag, taxonomy = %title,
                        "level tag conflicts with title taxonomy; keeping tag");
                    set.warnings.push(Warning::for_level(
                        WarningKind::LevelConflict,
                        tag,
                        format!(
                            "'{}' is tagged {} but the title '{}' suggests {}; the tag was kept",
                            c.name, tag, c.title, title
                        ),
                    ));
                }
            }

            let Some(level) = attribution.level() else {
                warn!(id = %c.id, name = %c.name, title = %c.title, origin = %c.origin,
                    "ambiguous level; record excluded");
                set.warnings.push(Warning::for_level(
                    WarningKind::AmbiguousClassification,
                    c.origin,
                    format!(
                        "'{}' ({}) excluded: no level tag, title '{}' is not in the taxonomy, no scope metadata",
                        c.name, c.id, c.title
                    ),
                ));
                set.excluded.push(ExcludedCandidate {
                    id: c.id,
                    name: c.name,
                    title: c.title,
                    origin: c.origin,
                });
                continue;
            };

            if matches!(attribution, Attribution::TitleTaxonomy(_) | Attribution::ScopeMetadata(_)) {
                let entry = stems.entry(reference::name_stem(&c.jurisdiction)).or_default();
                entry.0.insert(level);
                entry.1 += 1;
            }
            if level != c.origin {
                debug!(id = %c.id, from = %c.origin, to = %level, "candidate re-attributed");
            }
            set.records.push(c.into_record(level));
        }

        for (stem, (levels, untagged)) in stems {
            if levels.contains(&Level::County) && levels.contains(&Level::Municipal) {
                set.warnings.push(Warning::for_level(
                    WarningKind::NameCollision,
                    Level::County,
                    format!(
                        "'{}' names both a county and a city; {} untagged record(s) placed by title or scope",
                        stem, untagged
                    ),
                ));
            }
        }

        set
    }
}
