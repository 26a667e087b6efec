use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use std::path::PathBuf;

/// Name of the persisted configuration document.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Directory created under the pictures folder for daily photos.
pub const PHOTOS_FOLDER_NAME: &str = "DailyPortraits";

#[cfg(any(target_os = "windows", target_os = "macos"))]
const APP_DIR_NAME: &str = "DailyPortrait";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const APP_DIR_NAME: &str = "daily_portrait";

/// Per-user locations resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: Utf8PathBuf,
    pub config_file: Utf8PathBuf,
    pub log_dir: Utf8PathBuf,
    pub default_photos_dir: Utf8PathBuf,
}

impl AppPaths {
    /// Resolve the OS-conventional locations for the current user.
    ///
    /// - config: `~/.config/daily_portrait` (Linux), `~/Library/Application Support/DailyPortrait`
    ///   (macOS), `%LOCALAPPDATA%\DailyPortrait` (Windows)
    /// - photos: `<pictures>/DailyPortraits`, falling back to `~/Pictures/DailyPortraits`
    pub fn discover() -> Result<Self> {
        let config_root = dirs::config_local_dir()
            .ok_or_else(|| anyhow!("Could not determine the per-user config directory"))?;
        let config_dir = to_utf8(config_root.join(APP_DIR_NAME))?;

        let pictures_root = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("."));
        let default_photos_dir = to_utf8(pictures_root.join(PHOTOS_FOLDER_NAME))?;

        Ok(Self::with_dirs(config_dir, default_photos_dir))
    }

    /// Build paths rooted at explicit directories.
    pub fn with_dirs(config_dir: Utf8PathBuf, default_photos_dir: Utf8PathBuf) -> Self {
        Self {
            config_file: config_dir.join(CONFIG_FILE_NAME),
            log_dir: config_dir.join("logs"),
            config_dir,
            default_photos_dir,
        }
    }
}

fn to_utf8(path: PathBuf) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path).context("Path is not valid UTF-8")
}
