use super::*;
use chrono::TimeZone;
use spawn_ledger_core::Stat;

const GALAXY: Galaxy = Galaxy(7);

fn sample_export() -> &'static str {
    r#"<?xml version="1.0"?>
<resources galaxy="7" last_updated="2021-03-01 10:00:00 UTC">
  <resource id="42" name="Hansolo" class="copper_desh"
            stats="0 0 0 0 0 0 0 500 0 0 0">
    <planet id="3" reported="2021-03-01 09:12:44 UTC" reporter="chani"/>
    <planet id="5" reported="2021-03-01 09:40:02 UTC" reporter="duncan"/>
    <waypoint id="9">NW of the outpost</waypoint>
  </resource>
  <resource id="43" name="Tarkin" class="copper_polysteel"
            stats="0 0 0 0 0 0 0 750 0 0 0"/>
</resources>
"#
}

fn class_registry() -> ClassRegistry {
    let mut classes = ClassRegistry::new();
    classes.insert(ResourceClass {
        token: "copper_desh".into(),
        name: "Desh Copper".into(),
        parent: Some("copper".into()),
        caps: StatVector::from_pairs(&[(Stat::Oq, 1000)]).unwrap(),
        spawnable: true,
        space_or_recycled: false,
    });
    classes.insert(ResourceClass {
        token: "copper_polysteel".into(),
        name: "Polysteel Copper".into(),
        parent: Some("copper".into()),
        caps: StatVector::from_pairs(&[(Stat::Oq, 1000)]).unwrap(),
        spawnable: true,
        space_or_recycled: false,
    });
    classes.insert(ResourceClass {
        token: "ore_recycled".into(),
        name: "Recycled Ore".into(),
        parent: None,
        caps: StatVector::from_pairs(&[(Stat::Oq, 1000)]).unwrap(),
        spawnable: false,
        space_or_recycled: true,
    });
    classes
}

#[test]
fn parses_resources_with_sub_records() {
    let parsed = parse_current_resources(sample_export(), GALAXY).unwrap();
    assert_eq!(
        parsed.last_updated,
        Some(Utc.with_ymd_and_hms(2021, 3, 1, 10, 0, 0).unwrap())
    );
    assert!(parsed.skipped.is_empty());
    assert_eq!(parsed.drafts.len(), 2);

    let hansolo = &parsed.drafts[0];
    assert_eq!(hansolo.remote_id, 42);
    assert_eq!(hansolo.stats.get(Stat::Oq), 500);
    assert_eq!(hansolo.availability.len(), 2);
    assert_eq!(hansolo.availability[0].planet_id, 3);
    assert_eq!(hansolo.availability[0].reporter, "chani");
    assert_eq!(hansolo.waypoints.len(), 1);
    assert_eq!(hansolo.waypoints[0].text, "NW of the outpost");

    // Self-closing record without sub-records.
    assert_eq!(parsed.drafts[1].name, "Tarkin");
    assert!(parsed.drafts[1].availability.is_empty());
}

#[test]
fn bad_records_are_skipped_not_fatal() {
    let xml = r#"<resources>
      <resource id="1" name="Good" class="copper_desh" stats="0 0 0 0 0 0 0 10 0 0 0"/>
      <resource id="oops" name="BadId" class="copper_desh"/>
      <resource id="2" name="BadStats" class="copper_desh" stats="1 2"/>
      <resource id="3" class="copper_desh"/>
    </resources>"#;
    let parsed = parse_current_resources(xml, GALAXY).unwrap();
    assert_eq!(parsed.drafts.len(), 1);
    assert_eq!(parsed.drafts[0].name, "Good");
    assert_eq!(parsed.skipped.len(), 3);
}

#[test]
fn a_document_without_the_root_is_fatal() {
    assert!(parse_current_resources("<other/>", GALAXY).is_err());
    assert!(parse_categories("<other/>").is_err());
    assert!(parse_servers("<other/>").is_err());
}

#[test]
fn categories_build_a_class_registry() {
    let xml = r#"<categories last_updated="2021-03-01 10:00:00 UTC">
      <class token="copper" name="Copper" spawnable="0" space="0"
             caps="0 0 0 0 0 0 0 1000 0 0 0"/>
      <class token="copper_desh" name="Desh Copper" parent="copper" spawnable="1"
             space="0" caps="0 0 0 0 0 0 0 1000 0 0 0"/>
      <class token="broken" name="Broken" caps="not numbers"/>
    </categories>"#;
    let classes = parse_categories(xml).unwrap();
    assert_eq!(classes.len(), 2);
    let desh = classes.by_token("copper_desh").unwrap();
    assert_eq!(desh.parent.as_deref(), Some("copper"));
    assert!(desh.spawnable);
    assert!(classes.by_name("desh copper").is_some());
    assert!(classes.by_token("broken").is_none());
}

#[test]
fn servers_parse_to_galaxy_pairs() {
    let xml = r#"<servers>
      <server id="7" name="Chimaera"/>
      <server id="12" name="Europe-FarStar"/>
      <server name="broken"/>
    </servers>"#;
    let servers = parse_servers(xml).unwrap();
    assert_eq!(
        servers,
        vec![
            (Galaxy(7), "Chimaera".to_string()),
            (Galaxy(12), "Europe-FarStar".to_string()),
        ]
    );
}

#[test]
fn ingest_creates_then_updates_then_depletes() {
    let registry = ResourceRegistry::new();
    let classes = class_registry();

    let first = parse_current_resources(sample_export(), GALAXY).unwrap();
    let summary = ingest_current_resources(&registry, &classes, GALAXY, first);
    assert_eq!(summary.created, 2);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.depleted, 0);

    let hansolo = registry.lookup_id(42).unwrap();
    assert_eq!(hansolo.availability().len(), 2);

    // Second export: Hansolo's stats were corrected upstream, Tarkin is
    // gone and must be marked depleted.
    let second = r#"<resources last_updated="2021-03-01 11:00:00 UTC">
      <resource id="42" name="Hansolo" class="copper_desh"
                stats="0 0 0 0 0 0 0 512 0 0 0"/>
    </resources>"#;
    let parsed = parse_current_resources(second, GALAXY).unwrap();
    let summary = ingest_current_resources(&registry, &classes, GALAXY, parsed);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.depleted, 1);

    assert_eq!(hansolo.stats().get(Stat::Oq), 512);
    assert!(!hansolo.is_depleted());
    let tarkin = registry.lookup_id(43).unwrap();
    assert!(tarkin.is_depleted());

    // A third identical export changes nothing further.
    let parsed = parse_current_resources(second, GALAXY).unwrap();
    let summary = ingest_current_resources(&registry, &classes, GALAXY, parsed);
    assert_eq!(summary.created + summary.updated + summary.depleted, 0);
    assert_eq!(summary.unchanged, 1);
}

#[test]
fn space_and_recycled_classes_never_deplete() {
    let registry = ResourceRegistry::new();
    let classes = class_registry();

    let xml = r#"<resources>
      <resource id="50" name="Scrapheap" class="ore_recycled"
                stats="0 0 0 0 0 0 0 200 0 0 0"/>
    </resources>"#;
    let parsed = parse_current_resources(xml, GALAXY).unwrap();
    ingest_current_resources(&registry, &classes, GALAXY, parsed);

    // An empty follow-up export leaves the recycled resource available.
    let parsed = parse_current_resources("<resources></resources>", GALAXY).unwrap();
    let summary = ingest_current_resources(&registry, &classes, GALAXY, parsed);
    assert_eq!(summary.depleted, 0);
    assert!(!registry.lookup_id(50).unwrap().is_depleted());
}

#[test]
fn ingest_assigns_a_late_remote_id() {
    let registry = ResourceRegistry::new();
    let classes = class_registry();

    // Locally created (e.g. from a user submission) without an id yet.
    let local = ResourceDraft::new("Hansolo", GALAXY, "copper_desh");
    registry.resolve_or_create(&local).unwrap();

    let parsed = parse_current_resources(sample_export(), GALAXY).unwrap();
    ingest_current_resources(&registry, &classes, GALAXY, parsed);

    let by_id = registry.lookup_id(42).unwrap();
    let by_name = registry.lookup_name("Hansolo", GALAXY).unwrap();
    assert!(std::sync::Arc::ptr_eq(&by_id, &by_name));
}
