//! Parsing the remote database's bulk exports and feeding them into the
//! identity layer.
//!
//! Document-level problems (unreadable XML, missing root element) are
//! fatal. Record-level problems are not: a malformed entry is skipped,
//! counted, and reported once at the end, so one bad record never blocks a
//! whole galaxy's refresh.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use spawn_ledger_core::{ClassRegistry, Galaxy, ResourceClass, ResourceStats, StatVector};
use spawn_ledger_net::envelope::parse_timestamp;
use spawn_ledger_registry::{
    AvailabilityRecord, ResourceDraft, ResourceRegistry, Waypoint,
};

use crate::error::SyncError;

/// A parsed current-resources export.
#[derive(Debug, Default)]
pub struct ParsedResources {
    pub last_updated: Option<DateTime<Utc>>,
    pub drafts: Vec<ResourceDraft>,
    /// Per-record problems, one message each. Non-fatal.
    pub skipped: Vec<String>,
}

/// Counts from ingesting one export into the registry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub depleted: usize,
    pub skipped: usize,
}

fn attr_string(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, SyncError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8_lossy(&attr.value).to_string()));
        }
    }
    Ok(None)
}

/// Parse a current-resources export for `galaxy`.
pub fn parse_current_resources(xml: &str, galaxy: Galaxy) -> Result<ParsedResources, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut parsed = ParsedResources::default();
    let mut saw_root = false;
    let mut current: Option<ResourceDraft> = None;
    let mut skipping = false;
    let mut waypoint: Option<Waypoint> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(&event, Event::Empty(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.name().as_ref() {
                    b"resources" => {
                        saw_root = true;
                        if let Some(raw) = attr_string(e, b"last_updated")? {
                            parsed.last_updated = parse_timestamp(&raw).ok();
                        }
                    }
                    b"resource" => {
                        match parse_resource_record(e, galaxy) {
                            Ok(draft) => {
                                if empty {
                                    parsed.drafts.push(draft);
                                } else {
                                    current = Some(draft);
                                    skipping = false;
                                }
                            }
                            Err(problem) => {
                                parsed.skipped.push(problem);
                                skipping = !empty;
                            }
                        }
                    }
                    b"planet" => {
                        if let (Some(draft), false) = (current.as_mut(), skipping) {
                            match parse_planet_record(e) {
                                Ok(record) => draft.availability.push(record),
                                Err(problem) => parsed.skipped.push(problem),
                            }
                        }
                    }
                    b"waypoint" => {
                        if current.is_some() && !skipping {
                            let id = attr_string(e, b"id")?
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            waypoint = Some(Waypoint {
                                id,
                                text: String::new(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                if let Some(wp) = waypoint.as_mut() {
                    wp.text = e
                        .unescape()
                        .map_err(|err| SyncError::export(err.to_string()))?
                        .to_string();
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"resource" => {
                    if let Some(draft) = current.take() {
                        if !skipping {
                            parsed.drafts.push(draft);
                        }
                    }
                    skipping = false;
                }
                b"waypoint" => {
                    if let (Some(draft), Some(wp)) = (current.as_mut(), waypoint.take()) {
                        draft.waypoints.push(wp);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SyncError::export("missing <resources> root element"));
    }
    Ok(parsed)
}

fn parse_resource_record(e: &BytesStart<'_>, galaxy: Galaxy) -> Result<ResourceDraft, String> {
    let get = |key: &[u8]| attr_string(e, key).map_err(|err| err.to_string());

    let name = get(b"name")?.unwrap_or_default();
    if name.is_empty() {
        return Err("resource record without a name".to_string());
    }

    let mut draft = ResourceDraft::new(name.clone(), galaxy, get(b"class")?.unwrap_or_default());
    if draft.class_token.is_empty() {
        return Err(format!("'{name}': resource record without a class"));
    }

    if let Some(raw) = get(b"id")? {
        draft.remote_id = raw
            .parse()
            .map_err(|_| format!("'{name}': bad resource id '{raw}'"))?;
    }
    draft.depleted = matches!(get(b"depleted")?.as_deref(), Some("1"));
    if let Some(raw) = get(b"stats")? {
        let vector = StatVector::parse(&raw, false)
            .map_err(|err| format!("'{name}': bad stats: {err}"))?;
        draft.stats = ResourceStats::from_vector(vector);
    }
    Ok(draft)
}

fn parse_planet_record(e: &BytesStart<'_>) -> Result<AvailabilityRecord, String> {
    let get = |key: &[u8]| attr_string(e, key).map_err(|err| err.to_string());

    let planet_id = get(b"id")?
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| "planet record without an id".to_string())?;
    let reported = match get(b"reported")? {
        Some(raw) => parse_timestamp(&raw).map_err(|err| err.to_string())?,
        None => return Err(format!("planet {planet_id}: missing reported timestamp")),
    };
    Ok(AvailabilityRecord {
        planet_id,
        reported,
        reporter: get(b"reporter")?.unwrap_or_default(),
    })
}

/// Parse a categories export into a class registry.
pub fn parse_categories(xml: &str) -> Result<ClassRegistry, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut registry = ClassRegistry::new();
    let mut saw_root = false;
    let mut skipped = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"categories" => saw_root = true,
                b"class" => match parse_class_record(e) {
                    Ok(class) => registry.insert(class),
                    Err(problem) => {
                        log::warn!("skipping class record: {problem}");
                        skipped += 1;
                    }
                },
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SyncError::export("missing <categories> root element"));
    }
    if skipped > 0 {
        log::warn!("categories export: {skipped} unusable class record(s)");
    }
    Ok(registry)
}

fn parse_class_record(e: &BytesStart<'_>) -> Result<ResourceClass, String> {
    let get = |key: &[u8]| attr_string(e, key).map_err(|err| err.to_string());

    let token = get(b"token")?.unwrap_or_default();
    if token.is_empty() {
        return Err("class record without a token".to_string());
    }
    let name = get(b"name")?.unwrap_or_else(|| token.clone());
    let caps = match get(b"caps")? {
        Some(raw) => StatVector::parse(&raw, false)
            .map_err(|err| format!("'{token}': bad caps: {err}"))?,
        None => StatVector::ZERO,
    };

    Ok(ResourceClass {
        token,
        name,
        parent: get(b"parent")?.filter(|p| !p.is_empty()),
        caps,
        spawnable: matches!(get(b"spawnable")?.as_deref(), Some("1")),
        space_or_recycled: matches!(get(b"space")?.as_deref(), Some("1")),
    })
}

/// Parse a servers export into (galaxy, display name) pairs.
pub fn parse_servers(xml: &str) -> Result<Vec<(Galaxy, String)>, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut servers = Vec::new();
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"servers" => saw_root = true,
                b"server" => {
                    let id = attr_string(e, b"id")?.and_then(|v| v.parse().ok());
                    let name = attr_string(e, b"name")?.unwrap_or_default();
                    match id {
                        Some(id) if !name.is_empty() => servers.push((Galaxy(id), name)),
                        _ => log::warn!("skipping malformed server record"),
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(SyncError::export("missing <servers> root element"));
    }
    Ok(servers)
}

/// Feed a parsed current-resources export into the registry.
///
/// Resources in the export are resolved or created, corrected from the
/// export's values, and their sightings recorded. Resources the registry
/// knows for this galaxy that are *absent* from the export are marked
/// depleted — identity is long-lived, instances are never removed. Space
/// and recycled classes never deplete.
pub fn ingest_current_resources(
    registry: &ResourceRegistry,
    classes: &ClassRegistry,
    galaxy: Galaxy,
    parsed: ParsedResources,
) -> IngestSummary {
    let mut summary = IngestSummary {
        skipped: parsed.skipped.len(),
        ..Default::default()
    };
    for problem in &parsed.skipped {
        log::warn!("{galaxy}: skipping export record: {problem}");
    }

    let mut seen: HashSet<String> = HashSet::new();

    for mut draft in parsed.drafts {
        draft.galaxy = galaxy;
        seen.insert(draft.name.trim().to_lowercase());

        let mut existing = None;
        if draft.remote_id != 0 {
            existing = registry.lookup_id(draft.remote_id);
        }
        let existing = existing.or_else(|| registry.lookup_name(&draft.name, galaxy));

        let resource = match existing {
            Some(resource) => {
                match registry.apply_update(&resource, &draft) {
                    Ok(changed) if changed.is_empty() => summary.unchanged += 1,
                    Ok(_) => summary.updated += 1,
                    Err(err) => {
                        log::warn!("{galaxy}: cannot update '{}': {err}", draft.name);
                        summary.skipped += 1;
                        continue;
                    }
                }
                if let Err(err) = registry.assign_remote_id(&resource, draft.remote_id) {
                    log::warn!("{galaxy}: id conflict for '{}': {err}", draft.name);
                }
                resource
            }
            None => match registry.resolve_or_create(&draft) {
                Ok(resource) => {
                    summary.created += 1;
                    resource
                }
                Err(err) => {
                    log::warn!("{galaxy}: cannot register '{}': {err}", draft.name);
                    summary.skipped += 1;
                    continue;
                }
            },
        };

        for record in draft.availability {
            resource.record_availability(record);
        }
        for waypoint in draft.waypoints {
            resource.add_waypoint(waypoint);
        }
    }

    // Anything known for this galaxy but absent from a fresh export is no
    // longer spawned.
    for resource in registry.galaxy_snapshot(galaxy) {
        if resource.is_depleted() || seen.contains(&resource.name().to_lowercase()) {
            continue;
        }
        if let Some(class) = classes.by_token(&resource.class_token()) {
            if class.space_or_recycled {
                continue;
            }
        }
        resource.set_depleted(true);
        summary.depleted += 1;
    }

    summary
}

#[cfg(test)]
#[path = "tests/export_tests.rs"]
mod tests;
