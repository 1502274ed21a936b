//! Application-level configuration: a JSON file overlaid with environment variables.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WHOSE_SONG_CONFIG_PATH";

/// Passphrase accepted by the admin login when none is configured.
pub const DEFAULT_ADMIN_CODE: &str = "13091996";
/// Length of a voting round when none is configured.
pub const DEFAULT_ROUND_DURATION_MS: i64 = 20_000;
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_COUCH_DB: &str = "whose_song";

/// Where participants, songs, votes and rounds are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    /// MongoDB at `uri`.
    Mongo {
        /// Connection string.
        uri: String,
        /// Database name; the backend default when absent.
        database: Option<String>,
    },
    /// CouchDB server at `base_url`.
    Couch {
        /// Server root URL.
        base_url: String,
        /// Database name.
        database: String,
        /// Basic-auth user name and password.
        credentials: Option<(String, String)>,
    },
    /// Volatile in-process store.
    Memory,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Passphrase accepted by the admin login.
    pub admin_code: String,
    /// Length of a voting round.
    pub round_duration_ms: i64,
    /// Directory served for paths no route handles.
    pub static_dir: PathBuf,
    /// Reject guesses for any song other than the one of the live round.
    pub voting_requires_live_round: bool,
    /// Persistence backend to connect at startup.
    pub storage: StorageSettings,
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides.
    pub fn load() -> Self {
        let config = Self::from_sources(read_config_file(), |key| env::var(key).ok());
        if config.admin_code == DEFAULT_ADMIN_CODE {
            warn!("ADMIN_CODE not configured; using the built-in admin passphrase");
        }
        config
    }

    /// Merge file values and an environment lookup on top of the defaults.
    pub fn from_sources<F>(file: Option<RawConfig>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let admin_code = var("ADMIN_CODE")
            .or(file.admin_code)
            .unwrap_or_else(|| DEFAULT_ADMIN_CODE.to_owned());

        let round_duration_ms = match var("ROUND_DURATION_MS").map(|raw| raw.parse::<i64>()) {
            Some(Ok(value)) if value > 0 => value,
            Some(_) => {
                warn!("ignoring invalid ROUND_DURATION_MS");
                file.round_duration_ms
                    .filter(|value| *value > 0)
                    .unwrap_or(DEFAULT_ROUND_DURATION_MS)
            }
            None => file
                .round_duration_ms
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_ROUND_DURATION_MS),
        };

        let static_dir = var("STATIC_DIR")
            .or(file.static_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let voting_requires_live_round = var("VOTING_REQUIRES_LIVE_ROUND")
            .map(|raw| parse_flag(&raw))
            .or(file.voting_requires_live_round)
            .unwrap_or(false);

        Self {
            admin_code,
            round_duration_ms,
            static_dir,
            voting_requires_live_round,
            storage: storage_from(&var),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            admin_code: DEFAULT_ADMIN_CODE.to_owned(),
            round_duration_ms: DEFAULT_ROUND_DURATION_MS,
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            voting_requires_live_round: false,
            storage: StorageSettings::Memory,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
pub struct RawConfig {
    admin_code: Option<String>,
    round_duration_ms: Option<i64>,
    static_dir: Option<String>,
    voting_requires_live_round: Option<bool>,
}

fn storage_from<F>(var: &F) -> StorageSettings
where
    F: Fn(&str) -> Option<String>,
{
    let mongo = || {
        var("MONGO_URI").map(|uri| StorageSettings::Mongo {
            uri,
            database: var("MONGO_DB"),
        })
    };
    let couch = || {
        var("COUCH_BASE_URL").map(|base_url| StorageSettings::Couch {
            base_url,
            database: var("COUCH_DB").unwrap_or_else(|| DEFAULT_COUCH_DB.to_owned()),
            credentials: var("COUCH_USERNAME").zip(var("COUCH_PASSWORD")),
        })
    };

    match var("STORAGE_BACKEND").map(|raw| raw.trim().to_ascii_lowercase()) {
        Some(kind) if kind == "memory" => StorageSettings::Memory,
        Some(kind) if kind == "mongo" || kind == "mongodb" => {
            mongo().unwrap_or_else(|| StorageSettings::Mongo {
                uri: "mongodb://localhost:27017".to_owned(),
                database: var("MONGO_DB"),
            })
        }
        Some(kind) if kind == "couch" || kind == "couchdb" => {
            couch().unwrap_or_else(|| StorageSettings::Couch {
                base_url: "http://localhost:5984".to_owned(),
                database: var("COUCH_DB").unwrap_or_else(|| DEFAULT_COUCH_DB.to_owned()),
                credentials: var("COUCH_USERNAME").zip(var("COUCH_PASSWORD")),
            })
        }
        Some(other) => {
            warn!(backend = %other, "unknown STORAGE_BACKEND; using the memory store");
            StorageSettings::Memory
        }
        None => mongo().or_else(couch).unwrap_or(StorageSettings::Memory),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn read_config_file() -> Option<RawConfig> {
    let path = resolve_config_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                Some(raw)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                None
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "config file not found; using built-in defaults"
            );
            None
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read config; falling back to defaults"
            );
            None
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_any_source() {
        let config = AppConfig::from_sources(None, lookup(&[]));
        assert_eq!(config.admin_code, DEFAULT_ADMIN_CODE);
        assert_eq!(config.round_duration_ms, 20_000);
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert!(!config.voting_requires_live_round);
        assert_eq!(config.storage, StorageSettings::Memory);
    }

    #[test]
    fn environment_overrides_file() {
        let file: RawConfig =
            serde_json::from_str(r#"{"adminCode":"from-file","roundDurationMs":15000}"#).unwrap();
        let config = AppConfig::from_sources(
            Some(file),
            lookup(&[("ADMIN_CODE", "from-env"), ("VOTING_REQUIRES_LIVE_ROUND", "true")]),
        );
        assert_eq!(config.admin_code, "from-env");
        assert_eq!(config.round_duration_ms, 15_000);
        assert!(config.voting_requires_live_round);
    }

    #[test]
    fn invalid_duration_falls_back() {
        let config = AppConfig::from_sources(None, lookup(&[("ROUND_DURATION_MS", "-5")]));
        assert_eq!(config.round_duration_ms, DEFAULT_ROUND_DURATION_MS);
    }

    #[test]
    fn backend_inferred_from_connection_settings() {
        let config = AppConfig::from_sources(
            None,
            lookup(&[("COUCH_BASE_URL", "http://couch:5984"), ("COUCH_USERNAME", "admin")]),
        );
        assert_eq!(
            config.storage,
            StorageSettings::Couch {
                base_url: "http://couch:5984".into(),
                database: "whose_song".into(),
                credentials: None,
            }
        );

        let config = AppConfig::from_sources(
            None,
            lookup(&[
                ("MONGO_URI", "mongodb://db:27017"),
                ("COUCH_BASE_URL", "http://couch:5984"),
            ]),
        );
        assert!(matches!(config.storage, StorageSettings::Mongo { .. }));
    }

    #[test]
    fn explicit_memory_backend_wins() {
        let config = AppConfig::from_sources(
            None,
            lookup(&[("STORAGE_BACKEND", "memory"), ("MONGO_URI", "mongodb://db")]),
        );
        assert_eq!(config.storage, StorageSettings::Memory);
    }
}
