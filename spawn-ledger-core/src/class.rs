//! The resource-class taxonomy contract.
//!
//! The taxonomy itself is data, delivered by the remote database's
//! categories export (or hand-built in tests). This module defines the
//! node type and a registry with the two lookups the rest of the system
//! needs: by token and by display name.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::stat::Stat;
use crate::values::{MAX_STAT_VALUE, ResourceStats, StatVector};

/// One node in the resource-class taxonomy.
///
/// A stat is *expected* of this class iff its cap is non-zero. Caps are
/// the game's upper bounds for instances of the class, used by the rating
/// engine for normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceClass {
    /// Stable token used by the remote protocol (e.g. `steel_duranium`).
    pub token: String,
    /// Display name shown to users (e.g. "Duranium Steel").
    pub name: String,
    /// Parent class token; `None` for taxonomy roots.
    pub parent: Option<String>,
    /// Per-stat upper caps. Zero means the stat is not expected.
    pub caps: StatVector,
    /// Whether instances of this class appear as planetary spawns.
    pub spawnable: bool,
    /// Space or recycled classes never deplete and carry no availability.
    pub space_or_recycled: bool,
}

impl ResourceClass {
    /// Whether this class expects a value for `stat`.
    pub fn expects(&self, stat: Stat) -> bool {
        self.caps.get(stat) > 0
    }

    /// The cap for `stat`; zero for non-expected stats.
    pub fn cap(&self, stat: Stat) -> u16 {
        self.caps.get(stat)
    }

    /// Expected stats in internal order.
    pub fn expected_stats(&self) -> impl Iterator<Item = Stat> + '_ {
        Stat::all().iter().copied().filter(|&s| self.expects(s))
    }

    /// Number of expected stats.
    pub fn expected_count(&self) -> usize {
        self.expected_stats().count()
    }

    /// Validate a stat vector against this class: every expected stat must
    /// be 1..=1000, every non-expected stat must be exactly 0.
    ///
    /// Returns the first violation; values are never corrected.
    pub fn validate(&self, stats: &ResourceStats) -> Result<(), ValidationError> {
        for &stat in Stat::all() {
            let value = stats.get(stat);
            if self.expects(stat) {
                if value == 0 || value > MAX_STAT_VALUE {
                    return Err(ValidationError::ExpectedStatInvalid {
                        class: self.name.clone(),
                        stat: stat.abbrev(),
                        value,
                    });
                }
            } else if value != 0 {
                return Err(ValidationError::UnexpectedStat {
                    class: self.name.clone(),
                    stat: stat.abbrev(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Registry of all known resource classes, keyed by token with a secondary
/// case-insensitive display-name index.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    by_token: HashMap<String, Arc<ResourceClass>>,
    name_to_token: HashMap<String, String>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a class, replacing any previous entry for the same token.
    pub fn insert(&mut self, class: ResourceClass) {
        self.name_to_token
            .insert(class.name.to_lowercase(), class.token.clone());
        self.by_token
            .insert(class.token.clone(), Arc::new(class));
    }

    pub fn by_token(&self, token: &str) -> Option<Arc<ResourceClass>> {
        self.by_token.get(token).cloned()
    }

    /// Case-insensitive display-name lookup.
    pub fn by_name(&self, name: &str) -> Option<Arc<ResourceClass>> {
        self.name_to_token
            .get(&name.to_lowercase())
            .and_then(|t| self.by_token.get(t))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceClass>> {
        self.by_token.values()
    }
}
