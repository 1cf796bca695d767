//! Cache entries: one periodically refreshed local copy per remote bulk
//! export, with hour-granularity freshness comparison, rotating backups,
//! and atomic replacement.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use spawn_ledger_core::Galaxy;
use spawn_ledger_net::envelope::parse_timestamp;
use spawn_ledger_registry::UpdateCategory;

use crate::error::SyncError;

/// Cache format version. Bump to invalidate stale metadata automatically.
const CACHE_VERSION: u32 = 1;

/// How many rotated backups of a cache file are kept.
pub const BACKUP_COUNT: usize = 3;

/// How many leading lines of a cached export are scanned for an embedded
/// `last_updated="…"` marker.
pub const FRESHNESS_SCAN_LINES: usize = 10;

/// One remote bulk export the cache tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportKind {
    /// Currently spawned resources for one galaxy.
    CurrentResources(Galaxy),
    /// The resource-class taxonomy.
    Categories,
    /// Crafting schematics.
    Schematics,
    /// Profession level tables.
    ProfessionLevels,
    /// The galaxy/server list.
    Servers,
}

impl ExportKind {
    /// Path fragment on the server, relative to the base URL.
    pub fn remote_path(&self) -> String {
        match self {
            Self::CurrentResources(galaxy) => format!("exports/current/{}.xml", galaxy.id()),
            Self::Categories => "exports/categories.xml".to_string(),
            Self::Schematics => "exports/schematics.xml".to_string(),
            Self::ProfessionLevels => "exports/profession_levels.xml".to_string(),
            Self::Servers => "exports/servers.xml".to_string(),
        }
    }

    /// Local file name under the cache directory.
    pub fn file_name(&self) -> String {
        match self {
            Self::CurrentResources(galaxy) => format!("current_{}.xml", galaxy.id()),
            Self::Categories => "categories.xml".to_string(),
            Self::Schematics => "schematics.xml".to_string(),
            Self::ProfessionLevels => "profession_levels.xml".to_string(),
            Self::Servers => "servers.xml".to_string(),
        }
    }

    /// The notification category fanned out after a successful refresh.
    pub fn category(&self) -> UpdateCategory {
        match self {
            Self::CurrentResources(galaxy) => UpdateCategory::GalaxyData(*galaxy),
            Self::Categories => UpdateCategory::Categories,
            Self::Schematics => UpdateCategory::Schematics,
            Self::ProfessionLevels => UpdateCategory::ProfessionLevels,
            Self::Servers => UpdateCategory::Servers,
        }
    }

    pub fn galaxy(&self) -> Option<Galaxy> {
        match self {
            Self::CurrentResources(galaxy) => Some(*galaxy),
            _ => None,
        }
    }
}

/// Per-entry refresh state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheState {
    #[default]
    Unchecked,
    Checking,
    UpToDate,
    Updating,
    Failed,
}

/// The cache directory, `~/.cache/spawn-ledger/exports`.
pub fn cache_dir() -> Result<PathBuf, SyncError> {
    let base =
        dirs::cache_dir().ok_or_else(|| SyncError::cache("could not determine cache directory"))?;
    Ok(base.join("spawn-ledger").join("exports"))
}

// ── Freshness ───────────────────────────────────────────────────────────────

/// Truncate an instant to the hour. Both sides of every freshness
/// comparison go through this, so sub-hour skew never triggers downloads.
pub fn truncate_to_hour(when: DateTime<Utc>) -> DateTime<Utc> {
    when.duration_trunc(TimeDelta::hours(1)).unwrap_or(when)
}

/// Scan the first few lines of a cached export for `last_updated="…"`.
pub fn embedded_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    let file = fs::File::open(path).ok()?;
    let reader = BufReader::new(file);
    for line in reader.lines().take(FRESHNESS_SCAN_LINES) {
        let line = line.ok()?;
        if let Some(start) = line.find("last_updated=\"") {
            let rest = &line[start + "last_updated=\"".len()..];
            let end = rest.find('"')?;
            return parse_timestamp(&rest[..end]).ok();
        }
    }
    None
}

/// The local freshness instant for a cached file: the embedded marker when
/// present, else the file's mtime, truncated to the hour either way.
pub fn local_timestamp(path: &Path) -> Option<DateTime<Utc>> {
    if let Some(embedded) = embedded_timestamp(path) {
        return Some(truncate_to_hour(embedded));
    }
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(truncate_to_hour(DateTime::<Utc>::from(modified)))
}

/// Whether a refresh is needed: no local file, or *any* hour-truncated
/// mismatch between the remote and local instants. Not "newer" — clock
/// skew in either direction still means the local copy is not the one the
/// server has.
pub fn update_exists(path: &Path, remote: DateTime<Utc>) -> bool {
    match local_timestamp(path) {
        None => true,
        Some(local) => truncate_to_hour(remote) != local,
    }
}

// ── Backup and replace ──────────────────────────────────────────────────────

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".bak{index}"));
    PathBuf::from(name)
}

/// Rotate existing backups: `.bak2` becomes `.bak3`, `.bak1` becomes
/// `.bak2`, the live file becomes `.bak1`. The oldest backup falls off.
pub fn rotate_backups(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    for index in (1..BACKUP_COUNT).rev() {
        let from = backup_path(path, index);
        if from.exists() {
            fs::rename(&from, backup_path(path, index + 1))?;
        }
    }
    fs::rename(path, backup_path(path, 1))?;
    Ok(())
}

/// Per-path locks guarding the backup-and-replace step, so a reader never
/// observes a half-rotated file set.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub(crate) fn acquire(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

/// Back up the live file and atomically move `tmp` into its place, under
/// the file's lock. On error the previous backups and (already-rotated)
/// state are left as they are; the live file is never half-written because
/// the final step is a rename.
pub(crate) fn replace_with(locks: &PathLocks, path: &Path, tmp: &Path) -> std::io::Result<()> {
    let lock = locks.acquire(path);
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    rotate_backups(path)?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ── Metadata sidecar ────────────────────────────────────────────────────────

/// Metadata about one cached export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedExport {
    pub source: String,
    pub downloaded: String,
    pub file_size: u64,
}

/// Metadata file tracking all cached exports, for display purposes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMeta {
    #[serde(default)]
    pub version: u32,
    /// Keyed by local file name.
    pub exports: HashMap<String, CachedExport>,
}

fn meta_path(dir: &Path) -> PathBuf {
    dir.join("meta.json")
}

/// Load cache metadata, resetting it on a version mismatch.
pub fn load_meta(dir: &Path) -> Result<CacheMeta, SyncError> {
    let path = meta_path(dir);
    if !path.exists() {
        return Ok(CacheMeta {
            version: CACHE_VERSION,
            ..Default::default()
        });
    }
    let contents = fs::read_to_string(&path)?;
    let meta: CacheMeta =
        serde_json::from_str(&contents).map_err(|e| SyncError::cache(e.to_string()))?;
    if meta.version != CACHE_VERSION {
        return Ok(CacheMeta {
            version: CACHE_VERSION,
            ..Default::default()
        });
    }
    Ok(meta)
}

/// Save cache metadata.
pub fn save_meta(dir: &Path, meta: &CacheMeta) -> Result<(), SyncError> {
    let path = meta_path(dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents =
        serde_json::to_string_pretty(meta).map_err(|e| SyncError::cache(e.to_string()))?;
    fs::write(&path, contents)?;
    Ok(())
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
