use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the tourguide data root directory.
///
/// - macOS: ~/Library/Application Support/tourguide
/// - Windows: %APPDATA%\tourguide
/// - Linux: $XDG_DATA_HOME/tourguide or ~/.local/share/tourguide
///
/// The directory is not created here.
pub fn app_data_dir() -> Result<PathBuf> {
    let base_dir = platform_data_dir().context("Failed to get platform-specific data directory")?;

    Ok(base_dir.join("tourguide"))
}

/// Local state cache directory.
pub fn state_dir() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("state"))
}

/// Root of the file-backed document store.
pub fn remote_dir() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("remote"))
}

fn platform_data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        if let Some(xdg_data_home) = std::env::var_os("XDG_DATA_HOME") {
            return Ok(PathBuf::from(xdg_data_home));
        }
    }

    dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Unable to get platform data directory"))
}
