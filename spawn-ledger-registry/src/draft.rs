use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use spawn_ledger_core::{Galaxy, ResourceStats, ValidationError};

/// Shortest resource name the remote database accepts.
pub const MIN_NAME_LEN: usize = 3;

/// A sighting of a resource on one planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub planet_id: u32,
    /// When the spawn was first reported.
    pub reported: DateTime<Utc>,
    /// Who reported it (remote database account name).
    pub reporter: String,
}

/// An in-game waypoint attached to a resource sighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: u64,
    pub text: String,
}

/// A transient, fully mutable resource record.
///
/// Drafts are never persisted and never deduplicated; they exist for the
/// span of a single local operation and are consumed by
/// [`ResourceRegistry::resolve_or_create`](crate::ResourceRegistry::resolve_or_create).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub name: String,
    pub galaxy: Galaxy,
    /// Taxonomy token of the resource's class.
    pub class_token: String,
    pub stats: ResourceStats,
    /// Remote database id; 0 while unknown.
    pub remote_id: u64,
    pub depleted: bool,
    pub availability: Vec<AvailabilityRecord>,
    pub waypoints: Vec<Waypoint>,
}

impl ResourceDraft {
    pub fn new(name: impl Into<String>, galaxy: Galaxy, class_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            galaxy,
            class_token: class_token.into(),
            ..Default::default()
        }
    }

    /// Validate the name against the remote database's minimum length.
    pub fn validate_name(&self) -> Result<(), ValidationError> {
        if self.name.trim().chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort(self.name.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_rejected() {
        let draft = ResourceDraft::new("Io", Galaxy(1), "iron_polysteel");
        assert!(matches!(
            draft.validate_name(),
            Err(ValidationError::NameTooShort(_))
        ));
        let ok = ResourceDraft::new("Ion", Galaxy(1), "iron_polysteel");
        assert!(ok.validate_name().is_ok());
    }

    #[test]
    fn whitespace_does_not_pad_a_name_over_the_minimum() {
        let draft = ResourceDraft::new("  a  ", Galaxy(1), "iron_polysteel");
        assert!(draft.validate_name().is_err());
    }
}
