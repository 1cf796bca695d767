//! Shared application settings.
//!
//! Every frontend reads the same `~/.config/spawn-ledger/settings.toml`,
//! so the selected server, main galaxy, and refresh cadence are consistent
//! across them. Saving is surgical: unknown fields written by other
//! frontends are preserved.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use spawn_ledger_core::Galaxy;

/// Default community database base URL.
pub const DEFAULT_SERVER_URL: &str = "https://db.spawn-ledger.org/api";

/// Default minutes between periodic refreshes of the main galaxy. The
/// server regenerates exports hourly, so refreshing much faster only buys
/// rate-limited status probes.
pub const DEFAULT_REFRESH_MINUTES: u64 = 60;

/// Grace delay before the first periodic refresh after startup.
pub const STARTUP_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    /// The galaxy the periodic refresher follows. `None` until the user
    /// picks one.
    pub main_galaxy: Option<Galaxy>,
    pub refresh_minutes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            main_galaxy: None,
            refresh_minutes: DEFAULT_REFRESH_MINUTES,
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes.max(1) * 60)
    }
}

/// Canonical path of the shared settings file.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("spawn-ledger").join("settings.toml")
}

/// Load settings from the canonical path, falling back to defaults for
/// anything missing or unreadable.
pub fn load() -> Settings {
    load_from(&settings_path())
}

/// Load settings from an explicit path.
pub fn load_from(path: &Path) -> Settings {
    let mut settings = Settings::default();
    let Ok(contents) = std::fs::read_to_string(path) else {
        return settings;
    };
    let Ok(doc) = contents.parse::<toml::Value>() else {
        return settings;
    };
    let Some(sync) = doc.get("sync") else {
        return settings;
    };

    if let Some(url) = sync.get("server_url").and_then(|v| v.as_str()) {
        if !url.is_empty() {
            settings.server_url = url.to_string();
        }
    }
    if let Some(id) = sync.get("main_galaxy").and_then(|v| v.as_integer()) {
        if id > 0 {
            settings.main_galaxy = Some(Galaxy(id as u32));
        }
    }
    if let Some(minutes) = sync.get("refresh_minutes").and_then(|v| v.as_integer()) {
        if minutes > 0 {
            settings.refresh_minutes = minutes as u64;
        }
    }
    settings
}

/// Save settings to the canonical path.
pub fn save(settings: &Settings) -> io::Result<()> {
    save_to(&settings_path(), settings)
}

/// Save settings, updating only the `[sync]` table so fields owned by
/// other frontends survive.
pub fn save_to(path: &Path, settings: &Settings) -> io::Result<()> {
    let mut doc: toml::Value = if let Ok(contents) = std::fs::read_to_string(path) {
        contents
            .parse()
            .unwrap_or_else(|_| toml::Value::Table(Default::default()))
    } else {
        toml::Value::Table(Default::default())
    };

    let table = doc
        .as_table_mut()
        .ok_or_else(|| io::Error::other("settings.toml root is not a table"))?;
    let sync = table
        .entry("sync")
        .or_insert_with(|| toml::Value::Table(Default::default()));
    let sync_table = sync
        .as_table_mut()
        .ok_or_else(|| io::Error::other("[sync] is not a table"))?;

    sync_table.insert(
        "server_url".to_string(),
        toml::Value::String(settings.server_url.clone()),
    );
    match settings.main_galaxy {
        Some(galaxy) => {
            sync_table.insert(
                "main_galaxy".to_string(),
                toml::Value::Integer(galaxy.id() as i64),
            );
        }
        None => {
            sync_table.remove("main_galaxy");
        }
    }
    sync_table.insert(
        "refresh_minutes".to_string(),
        toml::Value::Integer(settings.refresh_minutes as i64),
    );

    // Write atomically.
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let serialized = toml::to_string_pretty(&doc).map_err(io::Error::other)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized)?;
    std::fs::rename(&tmp, path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_from(&dir.path().join("settings.toml"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let settings = Settings {
            server_url: "https://mirror.example.net/api".into(),
            main_galaxy: Some(Galaxy(7)),
            refresh_minutes: 30,
        };
        save_to(&path, &settings).unwrap();
        assert_eq!(load_from(&path), settings);
    }

    #[test]
    fn foreign_fields_survive_a_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[gui]\ntheme = \"dark\"\n").unwrap();

        save_to(&path, &Settings::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("theme = \"dark\""));
        assert!(contents.contains("server_url"));
    }

    #[test]
    fn clearing_the_main_galaxy_removes_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        let mut settings = Settings {
            main_galaxy: Some(Galaxy(7)),
            ..Default::default()
        };
        save_to(&path, &settings).unwrap();

        settings.main_galaxy = None;
        save_to(&path, &settings).unwrap();
        assert_eq!(load_from(&path).main_galaxy, None);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("main_galaxy"));
    }
}
