mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use civic_locator::cache::Category;
use civic_locator::jurisdiction::{JurisdictionType, Level};
use civic_locator::representatives::RegistrySource;
use civic_locator::{ResolveError, ResolveFlags, WarningKind};

use common::{harness, harness_with, ids, orchestrator_with, FailingSource, FixedSource};

#[tokio::test]
async fn test_capital_city_populates_every_level() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(r.postal_code, "95814");
    assert_eq!(r.jurisdiction.kind, JurisdictionType::IncorporatedCity);
    assert_eq!(r.location.as_ref().map(|l| l.county.as_str()), Some("Sacramento County"));
    for level in Level::ALL {
        assert!(!r.records(level).is_empty(), "{} should not be empty", level);
    }
    assert!(!r.degraded);
    assert!(r.degraded_levels.is_empty());

    assert!(ids(r.records(Level::Federal)).contains(&"ca-h-07"));
    assert!(ids(r.records(Level::State)).contains(&"ca-ad-07"));
    assert!(ids(r.records(Level::County)).contains(&"sac-bos-1"));
    let municipal = ids(r.records(Level::Municipal));
    assert!(municipal.contains(&"sac-mayor"));
    assert!(municipal.contains(&"sac-cc-4"));
    assert_eq!(h.calls(), [1, 1, 1, 1]);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unincorporated_area_has_no_municipal_officials() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation("95683", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(r.jurisdiction.kind, JurisdictionType::UnincorporatedArea);
    assert!(r.records(Level::Municipal).is_empty());
    assert!(!r.records(Level::County).is_empty());
    assert!(ids(r.records(Level::State)).contains(&"ca-ad-09"));
    assert!(r
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::LevelNotApplicable && w.level == Some(Level::Municipal)));
    // the municipal source is never consulted for a non-applicable level
    assert_eq!(h.municipal.calls(), 0);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_census_designated_place_is_county_governed() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation("95608", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(r.jurisdiction.kind, JurisdictionType::CensusDesignatedPlace);
    assert!(r.records(Level::Municipal).is_empty());
    assert!(ids(r.records(Level::County)).contains(&"sac-sheriff"));
    let note = r
        .warnings
        .iter()
        .find(|w| w.kind == WarningKind::LevelNotApplicable)
        .unwrap();
    assert!(note.message.contains("census-designated"));
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_malformed_postal_codes_are_rejected_without_side_effects() {
    let h = harness();
    for input in ["00000", "9581", "ABCDE", "958140", "10001", ""] {
        let err = h
            .orchestrator
            .resolve_representation(input, ResolveFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InputValidation { .. }), "{}", input);
    }
    assert_eq!(h.orchestrator.cache().stats().total_entries(), 0);
    assert_eq!(h.total_calls(), 0);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_zip_plus_four_is_truncated() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation(" 95814-2301 ", ResolveFlags::default())
        .await
        .unwrap();
    assert_eq!(r.postal_code, "95814");
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_municipal_timeout_degrades_only_that_level() {
    let h = harness_with(RegistrySource::bundled().unwrap(), Duration::from_millis(800));
    let r = h
        .orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();

    assert!(r.degraded);
    assert_eq!(r.degraded_levels, vec![Level::Municipal]);
    assert!(r.records(Level::Municipal).is_empty());
    assert!(!r.records(Level::Federal).is_empty());
    assert!(!r.records(Level::State).is_empty());
    assert!(!r.records(Level::County).is_empty());
    // the mayor came back through the county join, but its level is degraded
    assert!(!ids(r.records(Level::County)).contains(&"sac-mayor"));
    assert!(r
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::UpstreamUnavailable && w.level == Some(Level::Municipal)));

    let cache = h.orchestrator.cache();
    assert!(cache.contains(Category::CountyReps, "95814"));
    assert!(!cache.contains(Category::MunicipalReps, "95814"));
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_placeholder_records_are_dropped() {
    let registry = RegistrySource::from_json(
        "fixture",
        r#"{"federal": [
            {"id": "ok-1", "name": "Elena Marquez", "title": "U.S. Senator", "level": "federal", "jurisdiction": "California"},
            {"id": "bad-1", "name": "Pat Lee", "title": "U.S. Representative", "level": "federal", "district": 7, "jurisdiction": "Unknown City"},
            {"id": "bad-2", "name": "Unknown", "title": "U.S. Senator", "level": "federal", "jurisdiction": "California"},
            {"id": "bad-3", "name": "Chris Park", "title": "U.S. Representative", "level": "federal", "district": 99, "jurisdiction": "California"},
            {"id": "bad-4", "name": "Lena Ortiz", "title": "U.S. Representative", "level": "federal", "district": 5000000000, "jurisdiction": "California"},
            {"id": "bad-5", "name": "Omar Haddad", "title": "U.S. Representative", "level": "federal", "district": "CA-99999999999", "jurisdiction": "California"}
        ]}"#,
    )
    .unwrap();
    let h = harness_with(registry, Duration::ZERO);
    let r = h
        .orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(ids(r.records(Level::Federal)), vec!["ok-1"]);
    let violations = r
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::DataQualityViolation)
        .count();
    assert!(violations >= 5);
    assert!(r
        .representatives
        .values()
        .flatten()
        .all(|rec| !rec.jurisdiction.eq_ignore_ascii_case("unknown city")));
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_repeat_resolution_is_identical_and_served_from_cache() {
    let h = harness();
    let first = h
        .orchestrator
        .resolve_representation("92501", ResolveFlags::default())
        .await
        .unwrap();
    let calls = h.calls();

    let second = h
        .orchestrator
        .resolve_representation("92501", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(h.calls(), calls);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_supervisor_and_mayor_sharing_a_name_are_separated() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation("92501", ResolveFlags::default())
        .await
        .unwrap();

    let county = ids(r.records(Level::County));
    let municipal = ids(r.records(Level::Municipal));
    assert_eq!(county, vec!["riv-bos-2"]);
    assert!(municipal.contains(&"riv-mayor"));
    assert!(municipal.contains(&"riv-cc-1"));
    assert!(r.has_warning(WarningKind::NameCollision));

    // untagged entries of the level-keyed pools keep their aggregator's level
    assert!(ids(r.records(Level::Federal)).contains(&"ca-h-39"));
    assert!(ids(r.records(Level::State)).contains(&"ca-sd-31"));
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_invalidation_event_forces_refetch() {
    let h = harness();
    let flags = ResolveFlags::default();
    h.orchestrator.resolve_representation("95814", flags).await.unwrap();
    assert_eq!(h.calls(), [1, 1, 1, 1]);

    let report = h.orchestrator.invalidate("representative_update").unwrap();
    assert_eq!(report.removed, 4);
    assert!(h.orchestrator.invalidate("solar_eclipse").is_err());

    h.orchestrator.resolve_representation("95814", flags).await.unwrap();
    assert_eq!(h.calls(), [2, 2, 2, 2]);
    // location and jurisdiction survived the event
    assert!(h.orchestrator.cache().contains(Category::Location, "95814"));
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_force_refresh_bypasses_cache() {
    let h = harness();
    h.orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();
    let flags = ResolveFlags {
        include_committees: false,
        force_refresh: true,
    };
    h.orchestrator.resolve_representation("95814", flags).await.unwrap();
    assert_eq!(h.calls(), [2, 2, 2, 2]);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_unresolvable_location_keeps_federal_and_state() {
    let h = harness();
    let r = h
        .orchestrator
        .resolve_representation("91801", ResolveFlags::default())
        .await
        .unwrap();

    assert!(r.location.is_none());
    assert!(r.degraded);
    assert_eq!(r.jurisdiction.kind, JurisdictionType::Unknown);
    assert!(!r.records(Level::Federal).is_empty());
    assert!(!r.records(Level::State).is_empty());
    assert!(r.records(Level::County).is_empty());
    assert!(r.has_warning(WarningKind::UpstreamUnavailable));
    assert_eq!(h.county.calls() + h.municipal.calls(), 0);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_committees_attached_when_requested() {
    let h = harness();
    let flags = ResolveFlags {
        include_committees: true,
        force_refresh: false,
    };
    let r = h.orchestrator.resolve_representation("95814", flags).await.unwrap();
    assert!(r.committees.contains_key("ca-sen-1"));
    assert!(r.committees.contains_key("ca-sd-08"));

    let plain = h
        .orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();
    assert!(plain.committees.is_empty());
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_refresh_level_rewrites_cached_keys() {
    let h = harness();
    for zip in ["95814", "92501", "95683"] {
        h.orchestrator
            .resolve_representation(zip, ResolveFlags::default())
            .await
            .unwrap();
    }
    let before = h.county.calls();
    let report = h.orchestrator.refresh(Level::County).await;
    assert_eq!(report.keys, 3);
    assert_eq!(report.refreshed, 3);
    assert_eq!(h.county.calls(), before + 3);
    h.orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_dedicated_federal_source_keeps_untagged_officials_federal() {
    let registry: Arc<RegistrySource> = Arc::new(RegistrySource::bundled().unwrap());
    let federal = Arc::new(FixedSource(vec![
        json!({"id": "us-sen-1", "name": "Alex Padilla", "title": "Senator"}),
        json!({"id": "us-h-07", "name": "Doris Matsui", "title": "Member, House of Representatives"}),
    ]));
    let orchestrator = orchestrator_with(federal, registry.clone(), registry.clone(), registry);
    let r = orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();

    assert_eq!(ids(r.records(Level::Federal)), vec!["us-sen-1", "us-h-07"]);
    let state = ids(r.records(Level::State));
    assert!(!state.contains(&"us-sen-1"));
    assert!(state.contains(&"ca-ad-07"));
    assert!(!r.has_warning(WarningKind::AmbiguousClassification));
    // "Senator" reads as a state title, but the federal source's tag wins
    assert!(r
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::LevelConflict && w.message.contains("Alex Padilla")));
    assert!(!r.degraded);
    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_total_upstream_outage_degrades_every_level() {
    let down = Arc::new(FailingSource);
    let orchestrator = orchestrator_with(down.clone(), down.clone(), down.clone(), down);
    let r = orchestrator
        .resolve_representation("95814", ResolveFlags::default())
        .await
        .unwrap();

    assert!(r.degraded);
    let mut degraded = r.degraded_levels.clone();
    degraded.sort();
    assert_eq!(degraded, Level::ALL.to_vec());
    assert_eq!(r.total_records(), 0);
    for level in Level::ALL {
        assert!(
            r.warnings
                .iter()
                .any(|w| w.kind == WarningKind::UpstreamUnavailable && w.level == Some(level)),
            "{} should report its outage",
            level
        );
    }
    // nothing degraded is cached, so recovery is picked up on the next request
    assert!(!orchestrator.cache().contains(Category::FederalReps, "95814"));
    assert!(!orchestrator.cache().contains(Category::MunicipalReps, "95814"));
    orchestrator.shutdown().await;
}
