//! Cache synchronization: keeping local copies of the remote database's
//! bulk exports fresh without redundant traffic, and feeding downloaded
//! data into the identity layer.
//!
//! The protocol per cache entry is: probe the server's authoritative
//! freshness timestamp (rate-limited), compare against the local file's
//! embedded timestamp or mtime (both truncated to the hour), and on any
//! mismatch download to a temporary file, rotate backups, atomically
//! replace, ingest, and notify subscribers.

pub mod cache;
pub mod error;
pub mod export;
pub mod refresh;
pub mod settings;
pub mod status_probe;

pub use cache::{CacheState, ExportKind, update_exists};
pub use error::SyncError;
pub use export::IngestSummary;
pub use refresh::{RefreshOutcome, SyncManager, UpdateReport};
pub use settings::Settings;
pub use status_probe::{ProbeResult, StatusProbe};
