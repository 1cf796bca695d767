use thiserror::Error;

use spawn_ledger_core::ValidationError;

/// Failures from the identity layer.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A remote id was offered for an instance that already carries a
    /// different one. Remote ids are immutable once set.
    #[error("'{name}' already has remote id {current}, refusing {attempted}")]
    IdImmutable {
        name: String,
        current: u64,
        attempted: u64,
    },

    /// A remote id is already mapped to a different canonical instance.
    #[error("remote id {id} is already assigned to '{existing}'")]
    IdTaken { id: u64, existing: String },

    /// A name correction would collide with another canonical instance in
    /// the same galaxy.
    #[error("name '{name}' is already taken in the galaxy")]
    NameTaken { name: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
