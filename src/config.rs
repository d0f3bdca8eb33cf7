//! Application-level configuration loading: default page sizes for list endpoints.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "JAM_HUB_CONFIG_PATH";

/// Largest page a user listing may request.
pub const MAX_USERS_PAGE_SIZE: usize = 100;
/// Largest page a game jam listing may request.
pub const MAX_GAME_JAMS_PAGE_SIZE: usize = 1000;
const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    users_page_size: usize,
    game_jams_page_size: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        users_page_size = app_config.users_page_size,
                        game_jams_page_size = app_config.game_jams_page_size,
                        "loaded page sizes from config"
                    );
                    app_config
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

    /// Page size used by `GET /users` when no limit is given.
    pub fn users_page_size(&self) -> usize {
        self.users_page_size
    }

    /// Page size used by `GET /gamejams` when no limit is given.
    pub fn game_jams_page_size(&self) -> usize {
        self.game_jams_page_size
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            users_page_size: DEFAULT_PAGE_SIZE,
            game_jams_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    pagination: RawPagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPagination {
    users_page_size: Option<usize>,
    game_jams_page_size: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let pagination = value.pagination;
        Self {
            users_page_size: clamp_page_size(pagination.users_page_size, MAX_USERS_PAGE_SIZE),
            game_jams_page_size: clamp_page_size(
                pagination.game_jams_page_size,
                MAX_GAME_JAMS_PAGE_SIZE,
            ),
        }
    }
}

fn clamp_page_size(value: Option<usize>, max: usize) -> usize {
    value.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, max)
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

    #[test]
    fn missing_sections_use_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(AppConfig::from(raw), AppConfig::default());
    }

    #[test]
    fn page_sizes_are_clamped_to_endpoint_bounds() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"pagination": {"users_page_size": 500, "game_jams_page_size": 0}}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.users_page_size(), MAX_USERS_PAGE_SIZE);
        assert_eq!(config.game_jams_page_size(), 1);
    }

    #[test]
    fn shipped_config_parses() {
        let raw: RawConfig = serde_json::from_str(include_str!("../config/app.json")).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.users_page_size(), 50);
        assert_eq!(config.game_jams_page_size(), 50);
    }
}
