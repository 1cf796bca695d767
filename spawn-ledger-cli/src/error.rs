use thiserror::Error;

/// Errors surfaced to the terminal user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] spawn_ledger_core::ValidationError),

    #[error(transparent)]
    Parse(#[from] spawn_ledger_core::StatParseReport),

    #[error(transparent)]
    Registry(#[from] spawn_ledger_registry::RegistryError),

    #[error(transparent)]
    Net(#[from] spawn_ledger_net::NetError),

    #[error(transparent)]
    Sync(#[from] spawn_ledger_sync::SyncError),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}
