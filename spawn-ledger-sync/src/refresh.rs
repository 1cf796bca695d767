//! The refresh protocol: single-flight downloads per cache entry, the
//! backup-and-replace step, ingestion, and the periodic refresher.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use spawn_ledger_core::{ClassRegistry, Galaxy};
use spawn_ledger_net::ResourceService;
use spawn_ledger_net::envelope::format_timestamp;
use spawn_ledger_registry::{Notifier, ResourceRegistry, UpdateEvent};

use crate::cache::{self, CacheState, CachedExport, ExportKind, PathLocks};
use crate::error::SyncError;
use crate::export::{self, IngestSummary};
use crate::status_probe::{ProbeResult, StatusProbe};

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What a successful refresh delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReport {
    /// Current-resources ingestion counts.
    Resources(IngestSummary),
    /// Number of classes in the rebuilt taxonomy.
    Classes(usize),
    /// Number of servers in the rebuilt list.
    Servers(usize),
    /// The file was replaced; nothing ingests it (schematics, levels).
    FileOnly,
}

/// Outcome of one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Local copy already matches the server.
    UpToDate,
    /// A fresh copy was downloaded, installed, and ingested.
    Updated(UpdateReport),
    /// Another download for this entry is mid-flight; this request was
    /// dropped, not queued — the completing refresh makes it moot.
    DroppedBusy,
    /// The server's freshness timestamp could not be obtained. Only the
    /// first failure in a run carries `first_failure` so the frontend can
    /// show one dialog, not one per tick.
    StatusUnavailable { first_failure: bool },
}

/// Coordinates cache refreshes for one server.
///
/// Owned by the composition root and shared as `Arc`; collaborators are
/// injected, not global.
pub struct SyncManager<S> {
    service: Arc<S>,
    registry: Arc<ResourceRegistry>,
    notifier: Arc<Notifier>,
    classes: RwLock<ClassRegistry>,
    servers: Mutex<Vec<(Galaxy, String)>>,
    probe: StatusProbe,
    cache_root: PathBuf,
    states: Mutex<HashMap<String, CacheState>>,
    in_flight: Mutex<HashSet<String>>,
    file_locks: PathLocks,
}

impl<S: ResourceService> SyncManager<S> {
    pub fn new(
        service: Arc<S>,
        registry: Arc<ResourceRegistry>,
        notifier: Arc<Notifier>,
        cache_root: PathBuf,
    ) -> Self {
        Self {
            service,
            registry,
            notifier,
            classes: RwLock::new(ClassRegistry::new()),
            servers: Mutex::new(Vec::new()),
            probe: StatusProbe::new(),
            cache_root,
            states: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            file_locks: PathLocks::default(),
        }
    }

    /// Build with the default cache directory under the user's cache dir.
    pub fn with_default_cache_dir(
        service: Arc<S>,
        registry: Arc<ResourceRegistry>,
        notifier: Arc<Notifier>,
    ) -> Result<Self, SyncError> {
        Ok(Self::new(service, registry, notifier, cache::cache_dir()?))
    }

    /// Current refresh state of a cache entry.
    pub fn state(&self, kind: ExportKind) -> CacheState {
        locked(&self.states)
            .get(&kind.file_name())
            .copied()
            .unwrap_or_default()
    }

    fn set_state(&self, kind: ExportKind, state: CacheState) {
        locked(&self.states).insert(kind.file_name(), state);
    }

    /// Snapshot of the current class taxonomy.
    pub fn classes(&self) -> ClassRegistry {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the class taxonomy (used at startup when bootstrapping from
    /// a cached categories file, and after a categories refresh).
    pub fn set_classes(&self, classes: ClassRegistry) {
        *self.classes.write().unwrap_or_else(PoisonError::into_inner) = classes;
    }

    /// Snapshot of the known server list.
    pub fn servers(&self) -> Vec<(Galaxy, String)> {
        locked(&self.servers).clone()
    }

    /// Local path of a cache entry's live file.
    pub fn local_path(&self, kind: ExportKind) -> PathBuf {
        self.cache_root.join(kind.file_name())
    }

    /// Ingest an already-cached file without touching the network, for
    /// startup: the app is usable from the previous session's data while
    /// the first refresh runs. Returns `None` when no cached file exists.
    pub fn load_cached(&self, kind: ExportKind) -> Result<Option<UpdateReport>, SyncError> {
        let path = self.local_path(kind);
        if !path.exists() {
            return Ok(None);
        }
        self.ingest(kind, &path).map(Some)
    }

    /// Run the full refresh protocol for one cache entry. Blocks on
    /// network I/O; see [`spawn_refresh`](Self::spawn_refresh).
    pub fn refresh(&self, kind: ExportKind) -> Result<RefreshOutcome, SyncError> {
        let file_name = kind.file_name();
        {
            let mut in_flight = locked(&self.in_flight);
            if !in_flight.insert(file_name.clone()) {
                // Someone is already downloading this entry; a completed
                // refresh makes this request moot. Drop, don't queue.
                log::debug!("{file_name}: refresh already in flight, dropping");
                return Ok(RefreshOutcome::DroppedBusy);
            }
        }

        let result = self.refresh_locked(kind);
        locked(&self.in_flight).remove(&file_name);
        if result.is_err() {
            self.set_state(kind, CacheState::Failed);
        }
        result
    }

    fn refresh_locked(&self, kind: ExportKind) -> Result<RefreshOutcome, SyncError> {
        self.set_state(kind, CacheState::Checking);

        let remote = match self.probe.probe(self.service.as_ref()) {
            ProbeResult::Fresh(when) | ProbeResult::Cached(when) => when,
            ProbeResult::Unavailable { first_failure } => {
                self.set_state(kind, CacheState::Failed);
                return Ok(RefreshOutcome::StatusUnavailable { first_failure });
            }
        };

        let path = self.local_path(kind);
        if !cache::update_exists(&path, remote) {
            self.set_state(kind, CacheState::UpToDate);
            return Ok(RefreshOutcome::UpToDate);
        }

        self.set_state(kind, CacheState::Updating);
        let tmp = self.cache_root.join(format!("{}.tmp", kind.file_name()));
        let bytes = match self.service.download(&kind.remote_path(), &tmp) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Abandon the attempt; prior cached state stays intact.
                let _ = fs::remove_file(&tmp);
                return Err(err.into());
            }
        };
        cache::replace_with(&self.file_locks, &path, &tmp)?;
        self.record_meta(kind, bytes, remote);
        self.set_state(kind, CacheState::UpToDate);

        let report = self.ingest(kind, &path)?;
        self.notifier
            .notify(&UpdateEvent::with_note(kind.category(), describe(&report)));
        Ok(RefreshOutcome::Updated(report))
    }

    fn record_meta(&self, kind: ExportKind, bytes: u64, remote: chrono::DateTime<chrono::Utc>) {
        let result = cache::load_meta(&self.cache_root).and_then(|mut meta| {
            meta.exports.insert(
                kind.file_name(),
                CachedExport {
                    source: kind.remote_path(),
                    downloaded: format_timestamp(remote),
                    file_size: bytes,
                },
            );
            cache::save_meta(&self.cache_root, &meta)
        });
        if let Err(err) = result {
            log::warn!("could not update cache metadata: {err}");
        }
    }

    fn ingest(&self, kind: ExportKind, path: &std::path::Path) -> Result<UpdateReport, SyncError> {
        match kind {
            ExportKind::CurrentResources(galaxy) => {
                let xml = fs::read_to_string(path)?;
                let parsed = export::parse_current_resources(&xml, galaxy)?;
                let classes = self.classes();
                let summary =
                    export::ingest_current_resources(&self.registry, &classes, galaxy, parsed);
                log::info!(
                    "{galaxy}: ingested export ({} new, {} updated, {} depleted, {} skipped)",
                    summary.created,
                    summary.updated,
                    summary.depleted,
                    summary.skipped
                );
                Ok(UpdateReport::Resources(summary))
            }
            ExportKind::Categories => {
                let xml = fs::read_to_string(path)?;
                let classes = export::parse_categories(&xml)?;
                let count = classes.len();
                self.set_classes(classes);
                Ok(UpdateReport::Classes(count))
            }
            ExportKind::Servers => {
                let xml = fs::read_to_string(path)?;
                let servers = export::parse_servers(&xml)?;
                let count = servers.len();
                *locked(&self.servers) = servers;
                Ok(UpdateReport::Servers(count))
            }
            ExportKind::Schematics | ExportKind::ProfessionLevels => Ok(UpdateReport::FileOnly),
        }
    }
}

impl<S: ResourceService + 'static> SyncManager<S> {
    /// Run a refresh on its own disposable worker.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        kind: ExportKind,
    ) -> tokio::task::JoinHandle<Result<RefreshOutcome, SyncError>> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || manager.refresh(kind))
    }

    /// Periodically refresh the main galaxy: a startup grace delay, then
    /// one refresh per tick. Failures are logged and abandoned — the next
    /// tick is the retry path.
    pub async fn run_periodic(self: Arc<Self>, galaxy: Galaxy, period: Duration, grace: Duration) {
        tokio::time::sleep(grace).await;
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match self.spawn_refresh(ExportKind::CurrentResources(galaxy)).await {
                Ok(Ok(outcome)) => log_outcome(galaxy, &outcome),
                Ok(Err(err)) => log::warn!("{galaxy}: refresh failed: {err}"),
                Err(join_err) => log::warn!("{galaxy}: refresh worker died: {join_err}"),
            }
        }
    }
}

fn log_outcome(galaxy: Galaxy, outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::UpToDate => log::debug!("{galaxy}: cache up to date"),
        RefreshOutcome::Updated(report) => log::info!("{galaxy}: {}", describe(report)),
        RefreshOutcome::DroppedBusy => log::debug!("{galaxy}: refresh dropped, already busy"),
        RefreshOutcome::StatusUnavailable { first_failure } => {
            if *first_failure {
                log::warn!("{galaxy}: server status unavailable");
            } else {
                log::debug!("{galaxy}: server status still unavailable");
            }
        }
    }
}

fn describe(report: &UpdateReport) -> String {
    match report {
        UpdateReport::Resources(summary) => format!(
            "downloaded {} resource(s), {} updated, {} depleted",
            summary.created, summary.updated, summary.depleted
        ),
        UpdateReport::Classes(count) => format!("taxonomy rebuilt with {count} classes"),
        UpdateReport::Servers(count) => format!("server list rebuilt with {count} entries"),
        UpdateReport::FileOnly => "export file replaced".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
