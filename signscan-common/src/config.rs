//! Configuration loading and server URL resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Compiled default server URL (local development backend)
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the server URL
pub const SERVER_URL_ENV: &str = "SIGNSCAN_SERVER";

/// Default per-request timeout. Video processing is slow, so this is
/// deliberately generous; the backend either answers or fails, there is
/// no client-side retry.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the detection service (no trailing slash)
    pub server_url: String,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// TOML config file schema (`~/.config/signscan/config.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the detection service
    pub server_url: Option<String>,
    /// Per-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

/// Resolve the server URL following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. `SIGNSCAN_SERVER` environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_server_url(cli_arg: Option<&str>) -> String {
    // Priority 1: Command-line argument
    if let Some(url) = cli_arg {
        return normalize_url(url);
    }

    // Priority 2: Environment variable
    if let Ok(url) = std::env::var(SERVER_URL_ENV) {
        if !url.is_empty() {
            return normalize_url(&url);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_config_file() {
        if let Some(url) = config.server_url {
            return normalize_url(&url);
        }
    }

    // Priority 4: Compiled default
    DEFAULT_SERVER_URL.to_string()
}

/// Build a full client configuration from an optional CLI override
pub fn resolve_client_config(cli_arg: Option<&str>) -> ClientConfig {
    let server_url = resolve_server_url(cli_arg);

    let request_timeout = load_config_file()
        .ok()
        .and_then(|c| c.request_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

    ClientConfig {
        server_url,
        request_timeout,
    }
}

/// Strip a trailing slash so endpoint paths can be appended directly
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Load and parse the config file, if one exists
pub fn load_config_file() -> Result<TomlConfig> {
    let path = config_file_path()?;
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Platform config file location (`<config dir>/signscan/config.toml`)
fn config_file_path() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .map(|d| d.join("signscan").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}
