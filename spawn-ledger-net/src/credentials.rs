//! Remote database account credentials.
//!
//! Lookups are anonymous; submissions require an account. Credentials are
//! resolved from environment variables first, then the config file at
//! `~/.config/spawn-ledger/credentials.toml`.

use std::path::PathBuf;

use crate::error::NetError;

const ENV_USER: &str = "SPAWN_LEDGER_USER";
const ENV_PASSWORD: &str = "SPAWN_LEDGER_PASSWORD";

/// Credentials for authenticating submissions with the remote database.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
}

/// TOML config file format.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct ConfigFile {
    account: Option<AccountConfig>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct AccountConfig {
    user_name: Option<String>,
    password: Option<String>,
}

impl Credentials {
    /// Load credentials, env vars taking priority over the config file.
    pub fn load() -> Result<Self, NetError> {
        let config = load_config_file();

        let user_name = std::env::var(ENV_USER)
            .ok()
            .or_else(|| config.as_ref().and_then(|c| c.user_name.clone()))
            .ok_or_else(|| {
                NetError::credentials(format!(
                    "missing user name; set {ENV_USER} or add it to the credentials file"
                ))
            })?;

        let password = std::env::var(ENV_PASSWORD)
            .ok()
            .or_else(|| config.as_ref().and_then(|c| c.password.clone()))
            .ok_or_else(|| {
                NetError::credentials(format!(
                    "missing password; set {ENV_PASSWORD} or add it to the credentials file"
                ))
            })?;

        Ok(Self {
            user_name,
            password,
        })
    }

    /// Whether credentials are available without loading them.
    pub fn available() -> bool {
        Self::load().is_ok()
    }
}

/// Path of the credentials config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("spawn-ledger").join("credentials.toml"))
}

/// Save credentials, creating parent directories as needed. Returns the
/// path written.
pub fn save_to_file(creds: &Credentials) -> Result<PathBuf, NetError> {
    let path = config_path()
        .ok_or_else(|| NetError::credentials("could not determine config directory"))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let config = ConfigFile {
        account: Some(AccountConfig {
            user_name: Some(creds.user_name.clone()),
            password: Some(creds.password.clone()),
        }),
    };
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| NetError::credentials(format!("failed to serialize credentials: {e}")))?;

    // Write atomically so a crash never leaves a half-written file.
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, toml_str)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

fn load_config_file() -> Option<AccountConfig> {
    let path = config_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    let config: ConfigFile = toml::from_str(&content).ok()?;
    config.account
}
