//! # Configuration
//!
//! Override hierarchy: defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.unitnav/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::client::DEFAULT_BASE_URL;
use crate::core::window::WindowConfig;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UnitnavConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub navigator: NavigatorSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WindowSection {
    pub visible_before: Option<usize>,
    pub visible_after: Option<usize>,
    pub prefetch_margin: Option<usize>,
    pub context_radius: Option<usize>,
    pub prefetch_at_tail: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct NavigatorSection {
    pub hover_delay_ms: Option<u64>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOVER_DELAY_MS: u64 = 200;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub session_id: Option<String>,
    pub window: WindowConfig,
    pub hover_delay: Duration,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.unitnav/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".unitnav").join("config.toml"))
}

/// Load config from `~/.unitnav/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `UnitnavConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<UnitnavConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(UnitnavConfig::default());
        }
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<UnitnavConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(UnitnavConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: UnitnavConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

fn generate_default_config(path: &Path) {
    let default_content = r#"# unitnav configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [server]
# base_url = "http://localhost:8000"   # Or set UNITNAV_BASE_URL
# session_id = "..."                   # Or set UNITNAV_SESSION_ID

# [window]
# visible_before = 8
# visible_after = 29
# prefetch_margin = 5
# context_radius = 5
# prefetch_at_tail = false

# [navigator]
# hover_delay_ms = 200
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Collapses defaults → config file → env vars → CLI into concrete values.
pub fn resolve(config: &UnitnavConfig, cli_base_url: Option<&str>) -> ResolvedConfig {
    // Base URL: CLI → env → config → default
    let base_url = cli_base_url
        .map(|s| s.to_string())
        .or_else(|| std::env::var("UNITNAV_BASE_URL").ok())
        .or_else(|| config.server.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // Session: env → config
    let session_id = std::env::var("UNITNAV_SESSION_ID")
        .ok()
        .or_else(|| config.server.session_id.clone());

    ResolvedConfig {
        base_url,
        session_id,
        window: resolve_window(&config.window),
        hover_delay: Duration::from_millis(
            config
                .navigator
                .hover_delay_ms
                .unwrap_or(DEFAULT_HOVER_DELAY_MS),
        ),
    }
}

fn resolve_window(section: &WindowSection) -> WindowConfig {
    let defaults = WindowConfig::default();
    WindowConfig {
        visible_before: section.visible_before.unwrap_or(defaults.visible_before),
        visible_after: section.visible_after.unwrap_or(defaults.visible_after),
        prefetch_margin: section.prefetch_margin.unwrap_or(defaults.prefetch_margin),
        context_radius: section.context_radius.unwrap_or(defaults.context_radius),
        prefetch_at_tail: section.prefetch_at_tail.unwrap_or(defaults.prefetch_at_tail),
    }
}
