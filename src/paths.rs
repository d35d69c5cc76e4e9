//! Centralized path resolution for twig
//!
//! # Environment Variables
//!
//! - `TWIG_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/twig`)
//! - `TWIG_STATE_DIR` - Override state directory (unfinished run records)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `TWIG_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/twig` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\twig`
//!    - macOS/Linux: `~/.config/twig`
//!
//! For state_dir():
//! 1. `TWIG_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/twig` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\twig`
//!    - macOS/Linux: `~/.local/state/twig`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "TWIG_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "TWIG_STATE_DIR";

/// Get the twig config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("twig");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join("twig"));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("twig");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the twig state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("twig");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join("twig"));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("twig");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
