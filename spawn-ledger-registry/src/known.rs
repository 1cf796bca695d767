//! Canonical resource instances.

use std::sync::{OnceLock, RwLock};

use chrono::{DateTime, Utc};

use spawn_ledger_core::{Galaxy, ResourceStats};

use crate::draft::{AvailabilityRecord, ResourceDraft, Waypoint};
use crate::error::RegistryError;

fn read_inner<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write_inner<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// The single long-lived instance for one resource identity.
///
/// Created only by the registry; shared everywhere as `Arc<KnownResource>`.
/// The galaxy never changes, the remote id is set at most once, and the
/// remaining fields trend toward immutable: they may be corrected through
/// [`update_from`](Self::update_from), which logs every changed field.
#[derive(Debug)]
pub struct KnownResource {
    galaxy: Galaxy,
    remote_id: OnceLock<u64>,
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    name: String,
    class_token: String,
    stats: ResourceStats,
    depleted: bool,
    availability: Vec<AvailabilityRecord>,
    waypoints: Vec<Waypoint>,
}

impl KnownResource {
    /// Build from a draft. Crate-internal: only the registry creates
    /// canonical instances.
    pub(crate) fn from_draft(draft: &ResourceDraft) -> Self {
        let instance = Self {
            galaxy: draft.galaxy,
            remote_id: OnceLock::new(),
            inner: RwLock::new(Inner {
                name: draft.name.trim().to_string(),
                class_token: draft.class_token.clone(),
                stats: draft.stats,
                depleted: draft.depleted,
                availability: draft.availability.clone(),
                waypoints: draft.waypoints.clone(),
            }),
        };
        if draft.remote_id != 0 {
            // Fresh OnceLock, cannot already be set.
            let _ = instance.remote_id.set(draft.remote_id);
        }
        instance
    }

    pub fn galaxy(&self) -> Galaxy {
        self.galaxy
    }

    /// The remote database id, once known.
    pub fn remote_id(&self) -> Option<u64> {
        self.remote_id.get().copied()
    }

    /// Supply the remote id. Succeeds once; a second call with the same id
    /// is a no-op, a different id is refused.
    pub fn assign_remote_id(&self, id: u64) -> Result<(), RegistryError> {
        if id == 0 {
            return Ok(());
        }
        match self.remote_id.set(id) {
            Ok(()) => Ok(()),
            Err(_) => {
                let current = *self.remote_id.get().unwrap_or(&0);
                if current == id {
                    Ok(())
                } else {
                    Err(RegistryError::IdImmutable {
                        name: self.name(),
                        current,
                        attempted: id,
                    })
                }
            }
        }
    }

    pub fn name(&self) -> String {
        read_inner(&self.inner).name.clone()
    }

    pub fn class_token(&self) -> String {
        read_inner(&self.inner).class_token.clone()
    }

    pub fn stats(&self) -> ResourceStats {
        read_inner(&self.inner).stats
    }

    pub fn is_depleted(&self) -> bool {
        read_inner(&self.inner).depleted
    }

    pub fn set_depleted(&self, depleted: bool) {
        write_inner(&self.inner).depleted = depleted;
    }

    pub fn availability(&self) -> Vec<AvailabilityRecord> {
        read_inner(&self.inner).availability.clone()
    }

    pub fn waypoints(&self) -> Vec<Waypoint> {
        read_inner(&self.inner).waypoints.clone()
    }

    /// Record a sighting. One record per planet is kept; a repeat sighting
    /// on a known planet refreshes nothing (the first report stands).
    pub fn record_availability(&self, record: AvailabilityRecord) {
        let mut inner = write_inner(&self.inner);
        if !inner
            .availability
            .iter()
            .any(|r| r.planet_id == record.planet_id)
        {
            inner.availability.push(record);
        }
    }

    pub fn add_waypoint(&self, waypoint: Waypoint) {
        let mut inner = write_inner(&self.inner);
        if !inner.waypoints.iter().any(|w| w.id == waypoint.id) {
            inner.waypoints.push(waypoint);
        }
    }

    /// Correct fields from a better source, logging each change.
    ///
    /// Returns the names of the fields that changed. Stats are only ever
    /// corrected from blank to measured or from measured to a different
    /// measurement delivered by the remote database — the caller vouches
    /// for the source being authoritative. Crate-internal: name changes
    /// must go through the registry so its indices stay consistent.
    pub(crate) fn update_from(&self, draft: &ResourceDraft) -> Vec<&'static str> {
        let mut changed = Vec::new();
        let mut inner = write_inner(&self.inner);

        let new_name = draft.name.trim();
        if !new_name.is_empty() && inner.name != new_name {
            log::info!("correcting name '{}' -> '{}'", inner.name, new_name);
            inner.name = new_name.to_string();
            changed.push("name");
        }
        if !draft.class_token.is_empty() && inner.class_token != draft.class_token {
            log::info!(
                "correcting class of '{}': {} -> {}",
                inner.name,
                inner.class_token,
                draft.class_token
            );
            inner.class_token = draft.class_token.clone();
            changed.push("class");
        }
        if !draft.stats.is_blank() && inner.stats != draft.stats {
            log::info!(
                "correcting stats of '{}': [{}] -> [{}]",
                inner.name,
                inner.stats.format(false),
                draft.stats.format(false)
            );
            inner.stats = draft.stats;
            changed.push("stats");
        }
        if inner.depleted != draft.depleted {
            inner.depleted = draft.depleted;
            changed.push("depleted");
        }

        changed
    }

    /// Copy the current state into a draft, for callers that persist or
    /// transmit canonical instances.
    pub fn to_draft(&self) -> ResourceDraft {
        let inner = read_inner(&self.inner);
        ResourceDraft {
            name: inner.name.clone(),
            galaxy: self.galaxy,
            class_token: inner.class_token.clone(),
            stats: inner.stats,
            remote_id: self.remote_id().unwrap_or(0),
            depleted: inner.depleted,
            availability: inner.availability.clone(),
            waypoints: inner.waypoints.clone(),
        }
    }

    /// Most recent sighting timestamp, if any.
    pub fn last_reported(&self) -> Option<DateTime<Utc>> {
        read_inner(&self.inner)
            .availability
            .iter()
            .map(|r| r.reported)
            .max()
    }
}
