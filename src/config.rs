//! Application-level configuration loading: vote presets, stream tuning and store selection.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::session::{VotePresets, VoteType};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PLANNING_POKER_CONFIG_PATH";
/// Environment variable selecting the session store backend.
const STORE_BACKEND_ENV: &str = "STORE_BACKEND";
/// Interval between SSE keep-alive comments when the config does not set one.
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    presets: VotePresets,
    keep_alive: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in presets.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Token lists offered for each vote type.
    pub fn presets(&self) -> &VotePresets {
        &self.presets
    }

    /// Interval between SSE keep-alive comments.
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: VotePresets::default(),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    presets: RawPresets,
    #[serde(default)]
    keep_alive_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
/// Optional per-scale token overrides; keys match the stored vote type keys.
struct RawPresets {
    fibonacci: Option<Vec<String>>,
    onetoten: Option<Vec<String>>,
    double: Option<Vec<String>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let RawPresets {
            fibonacci,
            onetoten,
            double,
        } = value.presets;

        let mut presets = VotePresets::default();
        for (vote_type, tokens) in [
            (VoteType::Fibonacci, fibonacci),
            (VoteType::OneToTen, onetoten),
            (VoteType::Double, double),
        ] {
            let Some(tokens) = tokens else {
                continue;
            };
            if tokens.is_empty() {
                warn!(
                    vote_type = vote_type.key(),
                    "ignoring empty preset override"
                );
                continue;
            }
            presets = presets.with_tokens(vote_type, tokens);
        }

        let keep_alive = match value.keep_alive_secs {
            Some(0) => {
                warn!("keep-alive interval must be positive; using default");
                DEFAULT_KEEP_ALIVE
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_KEEP_ALIVE,
        };

        Self {
            presets,
            keep_alive,
        }
    }
}

/// Session store backend selected through [`STORE_BACKEND_ENV`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process tree; state is lost on restart.
    Memory,
    /// Hosted CouchDB database configured through the `COUCH_*` variables.
    Couch,
}

impl StoreBackend {
    /// Read the backend from the environment, defaulting to [`StoreBackend::Memory`].
    pub fn from_env() -> Self {
        let raw = env::var(STORE_BACKEND_ENV).unwrap_or_default();
        Self::parse(&raw).unwrap_or_else(|| {
            if !raw.is_empty() {
                warn!(backend = %raw, "unknown store backend; using in-memory store");
            }
            StoreBackend::Memory
        })
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "couch" | "couchdb" => Some(StoreBackend::Couch),
            _ => None,
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
