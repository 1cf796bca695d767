use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key for one game server ("galaxy").
///
/// All per-galaxy state — canonical resource indices, cached export files,
/// download locks — is partitioned by this key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Galaxy(pub u32);

impl Galaxy {
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Galaxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "galaxy {}", self.0)
    }
}
