//! Data-quality gate.
//!
//! Every location, jurisdiction and representative record passes through
//! here before it is cached or returned. CRITICAL findings drop the item
//! and are logged with `{field, value, rule}`; WARNING findings travel with
//! the response as metadata.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::error::{Warning, WarningKind};
use crate::geo::PostalLocation;
use crate::jurisdiction::{Jurisdiction, JurisdictionType, Level};
use crate::reference::{self, counties, StateProfile};
use crate::representatives::{Chamber, RepresentativeRecord};

pub const DEFAULT_LOW_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    ForbiddenValue,
    DistrictOutOfRange,
    CoordinateSentinel,
    OutsideStateBounds,
    CountyNotAuthoritative,
    ConfidenceOutOfRange,
    LevelsMissingBase,
    MunicipalMismatch,
    LowConfidence,
    UnusualName,
    MissingTitle,
    TermExpired,
    UndistrictedSeat,
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ForbiddenValue => "forbidden_value",
            Self::DistrictOutOfRange => "district_out_of_range",
            Self::CoordinateSentinel => "coordinate_sentinel",
            Self::OutsideStateBounds => "outside_state_bounds",
            Self::CountyNotAuthoritative => "county_not_authoritative",
            Self::ConfidenceOutOfRange => "confidence_out_of_range",
            Self::LevelsMissingBase => "levels_missing_federal_or_state",
            Self::MunicipalMismatch => "municipal_level_mismatch",
            Self::LowConfidence => "low_confidence",
            Self::UnusualName => "unusual_name",
            Self::MissingTitle => "missing_title",
            Self::TermExpired => "term_expired",
            Self::UndistrictedSeat => "district_on_undistricted_seat",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub field: String,
    pub value: String,
    pub rule: ValidationRule,
    pub severity: Severity,
}

impl ValidationResult {
    fn critical(field: &str, value: impl fmt::Display, rule: ValidationRule) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            rule,
            severity: Severity::Critical,
        }
    }

    fn warning(field: &str, value: impl fmt::Display, rule: ValidationRule) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            rule,
            severity: Severity::Warning,
        }
    }

    pub fn to_warning(&self, level: Option<Level>, subject: &str) -> Warning {
        let kind = match (self.severity, self.rule) {
            (Severity::Critical, _) => WarningKind::DataQualityViolation,
            (Severity::Warning, ValidationRule::LowConfidence) => WarningKind::LowConfidence,
            (Severity::Warning, _) => WarningKind::UnusualValue,
        };
        let message = format!("{}: {} = '{}' ({})", subject, self.field, self.value, self.rule);
        Warning { kind, level, message }
    }
}

/// Findings for one validated item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub results: Vec<ValidationResult>,
}

impl Report {
    pub fn is_critical(&self) -> bool {
        self.results.iter().any(|r| r.severity == Severity::Critical)
    }

    pub fn criticals(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.severity == Severity::Critical)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.severity == Severity::Warning)
    }

    pub fn is_clean(&self) -> bool {
        self.results.is_empty()
    }

    fn push(&mut self, r: ValidationResult) {
        self.results.push(r);
    }

    fn check_text(&mut self, field: &str, value: &str) {
        if reference::is_forbidden(value) {
            self.push(ValidationResult::critical(field, value, ValidationRule::ForbiddenValue));
        }
    }

    fn check_county(&mut self, field: &str, value: &str) {
        if reference::is_forbidden(value) {
            self.push(ValidationResult::critical(field, value, ValidationRule::ForbiddenValue));
        } else if !counties::is_authoritative(value) {
            self.push(ValidationResult::critical(field, value, ValidationRule::CountyNotAuthoritative));
        }
    }

    fn check_confidence(&mut self, value: f64, threshold: f64) {
        if !(0.0..=1.0).contains(&value) {
            self.push(ValidationResult::critical("confidence", value, ValidationRule::ConfidenceOutOfRange));
        } else if value < threshold {
            self.push(ValidationResult::warning(
                "confidence",
                format!("{:.2}", value),
                ValidationRule::LowConfidence,
            ));
        }
    }
}

pub struct DataQualityValidator {
    profile: &'static StateProfile,
    low_confidence: f64,
    today: Option<NaiveDate>,
}

impl Default for DataQualityValidator {
    fn default() -> Self {
        Self::new(&reference::CALIFORNIA, DEFAULT_LOW_CONFIDENCE)
    }
}

impl DataQualityValidator {
    pub fn new(profile: &'static StateProfile, low_confidence: f64) -> Self {
        Self {
            profile,
            low_confidence,
            today: None,
        }
    }

    /// Pin the date used for term-expiry checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    pub fn validate_location(&self, loc: &PostalLocation) -> Report {
        let mut report = Report::default();
        report.check_county("county", &loc.county);
        if let Some(locality) = &loc.locality {
            report.check_text("locality", locality);
        }
        if reference::is_coordinate_sentinel(loc.lat, loc.lon) {
            report.push(ValidationResult::critical(
                "coordinates",
                format!("{},{}", loc.lat, loc.lon),
                ValidationRule::CoordinateSentinel,
            ));
        } else if !self.profile.contains_coords(loc.lat, loc.lon) {
            report.push(ValidationResult::critical(
                "coordinates",
                format!("{:.4},{:.4}", loc.lat, loc.lon),
                ValidationRule::OutsideStateBounds,
            ));
        }
        report.check_confidence(loc.confidence, self.low_confidence);
        report
    }

    pub fn validate_jurisdiction(&self, j: &Jurisdiction) -> Report {
        let mut report = Report::default();
        let levels = &j.applicable_levels;
        if !levels.contains(Level::Federal) || !levels.contains(Level::State) {
            report.push(ValidationResult::critical(
                "applicable_levels",
                format!("{:?}", levels.iter().collect::<Vec<_>>()),
                ValidationRule::LevelsMissingBase,
            ));
        }
        if levels.contains(Level::Municipal) != (j.kind == JurisdictionType::IncorporatedCity) {
            report.push(ValidationResult::critical(
                "applicable_levels",
                format!("municipal with {}", j.kind),
                ValidationRule::MunicipalMismatch,
            ));
        }
        if let Some(county) = &j.county {
            report.check_county("county", county);
        }
        if let Some(place) = &j.place {
            report.check_text("place", place);
        }
        if j.kind != JurisdictionType::Unknown {
            report.check_confidence(j.confidence, self.low_confidence);
        }
        report
    }

    pub fn validate_record(&self, r: &RepresentativeRecord) -> Report {
        let mut report = Report::default();

        report.check_text("name", &r.name);
        if r.title.trim().is_empty() {
            report.push(ValidationResult::warning("title", "", ValidationRule::MissingTitle));
        } else {
            report.check_text("title", &r.title);
        }
        if r.level == Level::County {
            report.check_county("jurisdiction", &r.jurisdiction);
        } else {
            report.check_text("jurisdiction", &r.jurisdiction);
        }
        if let Some(office) = &r.contact.office {
            if let Some(city) = &office.city {
                report.check_text("contact.office.city", city);
            }
            if let Some(state) = &office.state {
                report.check_text("contact.office.state", state);
            }
        }

        if let Some(district) = r.district {
            match self.district_bounds(r.level, r.chamber) {
                Some((lo, hi)) if district < lo || district > hi => {
                    report.push(ValidationResult::critical(
                        "district",
                        district,
                        ValidationRule::DistrictOutOfRange,
                    ));
                }
                Some(_) => {}
                None => report.push(ValidationResult::warning(
                    "district",
                    district,
                    ValidationRule::UndistrictedSeat,
                )),
            }
        }

        if !reference::is_forbidden(&r.name) && is_unusual_name(&r.name) {
            report.push(ValidationResult::warning("name", &r.name, ValidationRule::UnusualName));
        }
        if let Some(end) = r.term.as_ref().and_then(|t| t.end) {
            if end < self.today() {
                report.push(ValidationResult::warning("term.end", end, ValidationRule::TermExpired));
            }
        }
        report
    }

    /// District range for a seat. Without a chamber the widest range of
    /// the level is used.
    fn district_bounds(&self, level: Level, chamber: Option<Chamber>) -> Option<(u32, u32)> {
        match chamber {
            Some(c) => self.profile.district_bounds(c),
            None => match level {
                Level::Federal => self.profile.district_bounds(Chamber::UsHouse),
                Level::State => Some((1, self.profile.senate_districts.max(self.profile.assembly_districts))),
                Level::County => self.profile.district_bounds(Chamber::CountyBoard),
                Level::Municipal => self.profile.district_bounds(Chamber::CityCouncil),
            },
        }
    }

    /// Drop CRITICAL records, returning survivors and the warnings to attach.
    pub fn filter_records(
        &self,
        level: Level,
        records: Vec<RepresentativeRecord>,
    ) -> (Vec<RepresentativeRecord>, Vec<Warning>) {
        let mut kept = Vec::with_capacity(records.len());
        let mut warnings = Vec::new();
        for record in records {
            let report = self.validate_record(&record);
            let subject = format!("record {}", record.id);
            if report.is_critical() {
                for v in report.criticals() {
                    warn!(
                        id = %record.id,
                        level = %level,
                        field = %v.field,
                        value = %v.value,
                        rule = %v.rule,
                        "record dropped by data-quality gate"
                    );
                    warnings.push(v.to_warning(Some(level), &subject));
                }
                continue;
            }
            warnings.extend(report.warnings().map(|v| v.to_warning(Some(level), &subject)));
            kept.push(record);
        }
        (kept, warnings)
    }
}

/// A name with digits, a single token, or all capitals.
fn is_unusual_name(name: &str) -> bool {
    let trimmed = name.trim();
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    trimmed.chars().any(|c| c.is_ascii_digit())
        || !trimmed.contains(char::is_whitespace)
        || (letters.len() > 3 && letters.iter().all(|c| c.is_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoSource, PostalCode};
    use crate::jurisdiction::{ApplicableLevels, ClassificationSource};
    use crate::representatives::{Address, ContactInfo, Term};

    fn record(name: &str, level: Level, chamber: Option<Chamber>, district: Option<u32>) -> RepresentativeRecord {
        RepresentativeRecord {
            id: "r1".into(),
            name: name.into(),
            title: "Assembly Member".into(),
            level,
            chamber,
            party: None,
            district,
            jurisdiction: "California".into(),
            contact: ContactInfo::default(),
            term: None,
            committees: vec![],
            source: "test".into(),
        }
    }

    fn location(county: &str, lat: f64, lon: f64, confidence: f64) -> PostalLocation {
        PostalLocation {
            postal_code: PostalCode::parse("95814").unwrap(),
            lat,
            lon,
            county: county.into(),
            locality: Some("Sacramento".into()),
            confidence,
            source: GeoSource::Geocoder,
            notes: vec![],
        }
    }

    #[test]
    fn test_clean_record() {
        let v = DataQualityValidator::default();
        let r = record("Samuel Ortega", Level::State, Some(Chamber::StateAssembly), Some(7));
        assert!(v.validate_record(&r).is_clean());
    }

    #[test]
    fn test_district_bounds_per_chamber() {
        let v = DataQualityValidator::default();
        let over = record("Samuel Ortega", Level::State, Some(Chamber::StateSenate), Some(41));
        assert_eq!(v.validate_record(&over).criticals().next().unwrap().rule, ValidationRule::DistrictOutOfRange);
        let assembly = record("Samuel Ortega", Level::State, Some(Chamber::StateAssembly), Some(80));
        assert!(!v.validate_record(&assembly).is_critical());
        let house = record("Dana Morales", Level::Federal, Some(Chamber::UsHouse), Some(53));
        assert!(v.validate_record(&house).is_critical());
        let zero = record("Dana Morales", Level::Federal, None, Some(0));
        assert!(v.validate_record(&zero).is_critical());
    }

    #[test]
    fn test_oversized_district_is_critical() {
        let v = DataQualityValidator::default();
        for raw in [serde_json::json!(5_000_000_000u64), serde_json::json!("CA-99999999999")] {
            let district = crate::representatives::normalize::parse_district(&raw);
            let r = record("Dana Morales", Level::Federal, Some(Chamber::UsHouse), district);
            let report = v.validate_record(&r);
            assert_eq!(report.criticals().next().unwrap().rule, ValidationRule::DistrictOutOfRange, "{}", raw);
        }
    }

    #[test]
    fn test_undistricted_seat_warns() {
        let v = DataQualityValidator::default();
        let r = record("Elena Marquez", Level::Federal, Some(Chamber::UsSenate), Some(2));
        let report = v.validate_record(&r);
        assert!(!report.is_critical());
        assert_eq!(report.warnings().next().unwrap().rule, ValidationRule::UndistrictedSeat);
    }

    #[test]
    fn test_forbidden_values_are_critical() {
        let v = DataQualityValidator::default();
        let mut r = record("Unknown City", Level::Municipal, None, None);
        r.jurisdiction = "Sacramento".into();
        assert!(v.validate_record(&r).is_critical());

        let mut r = record("Daniel Kim", Level::Municipal, None, None);
        r.contact.office = Some(Address {
            street: Some("915 I Street".into()),
            city: Some("N/A".into()),
            state: Some("CA".into()),
            postal_code: None,
        });
        let report = v.validate_record(&r);
        assert_eq!(report.criticals().next().unwrap().field, "contact.office.city");
    }

    #[test]
    fn test_county_record_needs_suffixed_county() {
        let v = DataQualityValidator::default();
        let mut r = record("Maria Delgado", Level::County, Some(Chamber::CountyBoard), Some(1));
        r.jurisdiction = "Sacramento".into();
        assert_eq!(
            v.validate_record(&r).criticals().next().unwrap().rule,
            ValidationRule::CountyNotAuthoritative
        );
        r.jurisdiction = "Sacramento County".into();
        assert!(!v.validate_record(&r).is_critical());
    }

    #[test]
    fn test_expired_term_and_unusual_name_warn() {
        let v = DataQualityValidator::default().with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        let mut r = record("SMITH", Level::State, Some(Chamber::StateAssembly), Some(7));
        r.term = Some(Term {
            start: NaiveDate::from_ymd_opt(2022, 12, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 11, 30),
        });
        let rules: Vec<ValidationRule> = v.validate_record(&r).warnings().map(|w| w.rule).collect();
        assert!(rules.contains(&ValidationRule::TermExpired));
        assert!(rules.contains(&ValidationRule::UnusualName));
    }

    #[test]
    fn test_filter_records_drops_and_warns() {
        let v = DataQualityValidator::default();
        let good = record("Samuel Ortega", Level::State, Some(Chamber::StateAssembly), Some(7));
        let mut bad = record("Unknown", Level::State, Some(Chamber::StateAssembly), Some(7));
        bad.id = "bad".into();
        let (kept, warnings) = v.filter_records(Level::State, vec![good, bad]);
        assert_eq!(kept.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DataQualityViolation);
        assert!(warnings[0].message.contains("record bad"));
    }

    #[test]
    fn test_location_checks() {
        let v = DataQualityValidator::default();
        assert!(v.validate_location(&location("Sacramento County", 38.58, -121.49, 0.9)).is_clean());
        assert!(v.validate_location(&location("Sacramento", 38.58, -121.49, 0.9)).is_critical());
        assert!(v.validate_location(&location("Sacramento County", 0.0, 0.0, 0.9)).is_critical());
        assert!(v.validate_location(&location("Sacramento County", 40.71, -74.0, 0.9)).is_critical());
        let low = v.validate_location(&location("Sacramento County", 38.58, -121.49, 0.4));
        assert!(!low.is_critical());
        assert_eq!(low.warnings().next().unwrap().to_warning(None, "x").kind, WarningKind::LowConfidence);
    }

    #[test]
    fn test_jurisdiction_invariants() {
        let v = DataQualityValidator::default();
        let mut j = Jurisdiction::unresolved("no location");
        assert!(!v.validate_jurisdiction(&j).is_critical());

        j.kind = JurisdictionType::CensusDesignatedPlace;
        j.applicable_levels = ApplicableLevels::for_type(JurisdictionType::IncorporatedCity);
        j.source = ClassificationSource::CdpRegistry;
        j.confidence = 0.75;
        let report = v.validate_jurisdiction(&j);
        assert_eq!(report.criticals().next().unwrap().rule, ValidationRule::MunicipalMismatch);
    }
}
