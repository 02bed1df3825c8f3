//! Boundary normalization of duck-typed upstream records.
//!
//! Providers disagree on field names, date formats, district encodings and
//! party spellings. Everything is folded into [`Candidate`] here so shared
//! logic only ever sees one shape.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Address, Candidate, Chamber, CommitteeMembership, ContactInfo, Term};
use crate::collision;
use crate::jurisdiction::Level;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no stable id (name: {0:?})")]
    MissingId(Option<String>),
}

/// Context the aggregator supplies for fields the upstream omitted.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub origin: Level,
    pub source: &'a str,
    pub default_jurisdiction: &'a str,
    /// The source answers for `origin` only, so untagged records take it.
    pub dedicated: bool,
}

const ID_KEYS: &[&str] = &["id", "external_id", "bioguide_id", "openstates_id", "person_id"];
const NAME_KEYS: &[&str] = &["name", "full_name", "official_name", "display_name"];
const TITLE_KEYS: &[&str] = &["title", "office", "role", "position"];
const LEVEL_KEYS: &[&str] = &["level", "government_level"];
const SCOPE_KEYS: &[&str] = &["jurisdiction_scope", "ocd_division_id", "division_id", "ocd_id"];
const JURISDICTION_KEYS: &[&str] = &["jurisdiction", "body", "district_name"];

pub fn normalize(raw: &Value, ctx: &NormalizeContext<'_>) -> Result<Candidate, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let name = str_field(obj, NAME_KEYS).or_else(|| {
        let first = str_field(obj, &["first_name", "given_name"])?;
        let last = str_field(obj, &["last_name", "family_name"])?;
        Some(format!("{} {}", first, last))
    });
    let id = str_field(obj, ID_KEYS).ok_or_else(|| NormalizeError::MissingId(name.clone()))?;

    let title = str_field(obj, TITLE_KEYS).unwrap_or_default();
    let level_tag = str_field(obj, LEVEL_KEYS)
        .and_then(|l| l.parse::<Level>().ok())
        .or(ctx.dedicated.then_some(ctx.origin));
    // a title chamber from another level ("Senator" on a federal feed) is noise
    let chamber = obj
        .get("chamber")
        .and_then(Value::as_str)
        .and_then(|c| parse_chamber(c, level_tag.unwrap_or(ctx.origin)))
        .or_else(|| collision::title_chamber(&title).filter(|c| level_tag.map_or(true, |l| c.level() == l)));

    let jurisdiction = str_field(obj, JURISDICTION_KEYS)
        .or_else(|| match level_tag.unwrap_or(ctx.origin) {
            Level::County => str_field(obj, &["county"]),
            Level::Municipal => str_field(obj, &["city"]),
            _ => None,
        })
        .unwrap_or_else(|| ctx.default_jurisdiction.to_string());

    Ok(Candidate {
        id,
        name: name.unwrap_or_default(),
        title,
        level_tag,
        scope: str_field(obj, SCOPE_KEYS),
        origin: ctx.origin,
        chamber,
        party: str_field(obj, &["party", "party_name", "affiliation"]).map(|p| normalize_party(&p)),
        district: obj
            .get("district")
            .or_else(|| obj.get("district_number"))
            .and_then(parse_district),
        jurisdiction,
        contact: contact(obj),
        term: term(obj),
        committees: committees(obj),
        source: ctx.source.to_string(),
    })
}

/// First non-empty string (or number) among `keys`.
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First string of a string-or-array field.
fn first_of(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    str_field(obj, keys).or_else(|| {
        keys.iter().find_map(|k| {
            obj.get(*k)?
                .as_array()?
                .iter()
                .find_map(|v| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(String::from))
        })
    })
}

pub fn normalize_party(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "d" | "dem" | "democrat" | "democratic" | "democratic party" => "Democratic".into(),
        "r" | "rep" | "gop" | "republican" | "republican party" => "Republican".into(),
        "i" | "ind" | "independent" => "Independent".into(),
        "npp" | "no party preference" | "decline to state" => "No Party Preference".into(),
        "np" | "nonpartisan" | "non-partisan" => "Nonpartisan".into(),
        _ => raw.trim().to_string(),
    }
}

/// Accepts `7`, `"7"`, `"07"`, `"CA-07"`, `"District 7"`. At-large and
/// unparseable values yield `None`. Negative numbers yield `Some(0)` and
/// values too large for a `u32` yield `Some(u32::MAX)`, so the validator
/// rejects them instead of the field silently disappearing.
pub fn parse_district(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) if i < 0 => Some(0),
            (_, Some(u)) => Some(u32::try_from(u).unwrap_or(u32::MAX)),
            _ => None,
        },
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .rev()
                .take_while(|c| c.is_ascii_digit())
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            if digits.is_empty() {
                return None;
            }
            // all ASCII digits, so the only parse failure is overflow
            Some(digits.parse().unwrap_or(u32::MAX))
        }
        _ => None,
    }
}

fn parse_chamber(raw: &str, level: Level) -> Option<Chamber> {
    let r = raw.trim().to_lowercase();
    match (level, r.as_str()) {
        (Level::Federal, "senate" | "upper") => Some(Chamber::UsSenate),
        (Level::Federal, "house" | "lower") => Some(Chamber::UsHouse),
        (Level::State, "senate" | "upper") => Some(Chamber::StateSenate),
        (Level::State, "assembly" | "house" | "lower") => Some(Chamber::StateAssembly),
        (Level::State, "executive") => Some(Chamber::Executive),
        (Level::County, "board" | "board of supervisors") => Some(Chamber::CountyBoard),
        (Level::County, "office" | "executive") => Some(Chamber::CountyOffice),
        (Level::Municipal, "council" | "city council") => Some(Chamber::CityCouncil),
        (Level::Municipal, "office" | "executive") => Some(Chamber::CityOffice),
        _ => None,
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(s, "%m/%d/%Y").ok())
}

fn term(obj: &Map<String, Value>) -> Option<Term> {
    let nested = obj.get("term").and_then(Value::as_object);
    let start = nested
        .and_then(|t| str_field(t, &["start", "start_date"]))
        .or_else(|| str_field(obj, &["term_start", "start_date"]))
        .and_then(|s| parse_date(&s))?;
    let end = nested
        .and_then(|t| str_field(t, &["end", "end_date"]))
        .or_else(|| str_field(obj, &["term_end", "end_date"]))
        .and_then(|s| parse_date(&s));
    Some(Term { start, end })
}

fn address(obj: &Map<String, Value>) -> Option<Address> {
    let a = ["address", "office_address", "office"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_object))?;
    let addr = Address {
        street: str_field(a, &["street", "line1", "address_line1"]),
        city: str_field(a, &["city"]),
        state: str_field(a, &["state"]),
        postal_code: str_field(a, &["postal_code", "zip", "zip_code"]),
    };
    (!addr.is_empty()).then_some(addr)
}

fn contact(obj: &Map<String, Value>) -> ContactInfo {
    let nested = obj.get("contact").and_then(Value::as_object);
    let pick = |keys: &[&str]| nested.and_then(|c| first_of(c, keys)).or_else(|| first_of(obj, keys));
    ContactInfo {
        phone: pick(&["phone", "phones", "telephone"]),
        email: pick(&["email", "emails"]),
        website: pick(&["website", "url", "urls"]),
        office: nested.and_then(address).or_else(|| address(obj)),
    }
}

fn committees(obj: &Map<String, Value>) -> Vec<CommitteeMembership> {
    let Some(items) = obj.get("committees").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|c| match c {
            Value::String(s) if !s.trim().is_empty() => Some(CommitteeMembership {
                name: s.trim().to_string(),
                role: None,
            }),
            Value::Object(o) => Some(CommitteeMembership {
                name: str_field(o, &["name", "committee"])?,
                role: str_field(o, &["role", "position"]),
            }),
            _ => None,
        })
        .collect()
}
