use thiserror::Error;

use spawn_ledger_net::NetError;

/// Errors from the cache synchronization layer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Net(#[from] NetError),

    /// Local cache bookkeeping problems (no cache directory, bad metadata).
    #[error("cache error: {0}")]
    Cache(String),

    /// A bulk export document that could not be parsed at all. Per-record
    /// problems are not fatal and never surface here — they are counted
    /// and logged during ingestion.
    #[error("export parse error: {0}")]
    Export(String),
}

impl SyncError {
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }
}

impl From<quick_xml::Error> for SyncError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Export(e.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for SyncError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::Export(e.to_string())
    }
}
