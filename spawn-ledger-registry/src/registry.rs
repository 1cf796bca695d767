//! The canonical-instance registry: lookups, resolve-or-create, and the
//! per-identity serialization that keeps concurrent callers converging on
//! one instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use spawn_ledger_core::Galaxy;

use crate::draft::ResourceDraft;
use crate::error::RegistryError;
use crate::known::KnownResource;

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity key: galaxy plus case-folded name.
type NameKey = (Galaxy, String);

fn name_key(galaxy: Galaxy, name: &str) -> NameKey {
    (galaxy, name.trim().to_lowercase())
}

/// A set of locks keyed by identity, so creation for one (name, galaxy) is
/// serialized without contending with unrelated resources.
///
/// Lock objects are created on first use and kept for the registry's
/// lifetime; the set of distinct identities in a session is small enough
/// that reaping is not worth the complexity.
#[derive(Debug, Default)]
struct KeyedLocks {
    locks: Mutex<HashMap<NameKey, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn acquire(&self, key: &NameKey) -> Arc<Mutex<()>> {
        let mut locks = locked(&self.locks);
        locks.entry(key.clone()).or_default().clone()
    }
}

#[derive(Debug, Default)]
struct Indexes {
    by_id: HashMap<u64, Arc<KnownResource>>,
    by_name: HashMap<NameKey, Arc<KnownResource>>,
}

/// Registry of all canonical resource instances.
///
/// Shared across threads as a plain reference (the composition root owns
/// it); all interior state is locked. Lookups for unknown keys return
/// `None` — "unknown" is an expected outcome, not an error.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    indexes: Mutex<Indexes>,
    creation: KeyedLocks,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_id(&self, id: u64) -> Option<Arc<KnownResource>> {
        locked(&self.indexes).by_id.get(&id).cloned()
    }

    pub fn lookup_name(&self, name: &str, galaxy: Galaxy) -> Option<Arc<KnownResource>> {
        locked(&self.indexes)
            .by_name
            .get(&name_key(galaxy, name))
            .cloned()
    }

    /// Number of canonical instances.
    pub fn len(&self) -> usize {
        locked(&self.indexes).by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All instances for one galaxy, for matching and duplicate scans.
    pub fn galaxy_snapshot(&self, galaxy: Galaxy) -> Vec<Arc<KnownResource>> {
        locked(&self.indexes)
            .by_name
            .iter()
            .filter(|((g, _), _)| *g == galaxy)
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Return the canonical instance for the draft's identity, creating it
    /// if this is the first reference.
    ///
    /// Creation for a given (name, galaxy) is serialized on a lock keyed by
    /// that identity: concurrent callers converge on one instance, and
    /// callers resolving unrelated resources never contend. Blocks while a
    /// peer is mid-creation — call off latency-sensitive threads.
    pub fn resolve_or_create(
        &self,
        draft: &ResourceDraft,
    ) -> Result<Arc<KnownResource>, RegistryError> {
        draft.validate_name()?;

        // Prefer the remote id when the draft carries one.
        if draft.remote_id != 0 {
            if let Some(existing) = self.lookup_id(draft.remote_id) {
                return Ok(existing);
            }
        }

        let key = name_key(draft.galaxy, &draft.name);
        let identity_lock = self.creation.acquire(&key);
        let _guard = locked(&identity_lock);

        let existing = locked(&self.indexes).by_name.get(&key).cloned();
        if let Some(existing) = existing {
            // A draft carrying an id the instance lacks supplies it now.
            existing.assign_remote_id(draft.remote_id)?;
            self.index_id(&existing)?;
            return Ok(existing);
        }

        let created = Arc::new(KnownResource::from_draft(draft));
        {
            let mut indexes = locked(&self.indexes);
            indexes.by_name.insert(key, created.clone());
        }
        self.index_id(&created)?;
        Ok(created)
    }

    /// Supply a remote id for an existing instance and index it.
    pub fn assign_remote_id(
        &self,
        resource: &Arc<KnownResource>,
        id: u64,
    ) -> Result<(), RegistryError> {
        resource.assign_remote_id(id)?;
        self.index_id(resource)
    }

    fn index_id(&self, resource: &Arc<KnownResource>) -> Result<(), RegistryError> {
        let Some(id) = resource.remote_id() else {
            return Ok(());
        };
        let mut indexes = locked(&self.indexes);
        if let Some(existing) = indexes.by_id.get(&id) {
            if !Arc::ptr_eq(existing, resource) {
                return Err(RegistryError::IdTaken {
                    id,
                    existing: existing.name(),
                });
            }
            return Ok(());
        }
        indexes.by_id.insert(id, resource.clone());
        Ok(())
    }

    /// Correct an instance from a better source, keeping the name index
    /// consistent when the name itself was corrected.
    ///
    /// Returns the changed field names (already logged by the instance).
    pub fn apply_update(
        &self,
        resource: &Arc<KnownResource>,
        draft: &ResourceDraft,
    ) -> Result<Vec<&'static str>, RegistryError> {
        let old_key = name_key(resource.galaxy(), &resource.name());
        let new_key = name_key(resource.galaxy(), &draft.name);

        if new_key != old_key {
            // Re-key under the indexes lock so no lookup sees a gap.
            let mut indexes = locked(&self.indexes);
            if indexes.by_name.contains_key(&new_key) {
                return Err(RegistryError::NameTaken {
                    name: draft.name.clone(),
                });
            }
            let changed = resource.update_from(draft);
            if changed.contains(&"name") {
                indexes.by_name.remove(&old_key);
                indexes.by_name.insert(new_key, resource.clone());
            }
            return Ok(changed);
        }

        Ok(resource.update_from(draft))
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
