use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Keys of the persisted configuration document.
pub mod keys {
    pub const PHOTOS_DIRECTORY: &str = "photos_directory";
    pub const GUIDE_ENABLED: &str = "guide_enabled";
    pub const GUIDE_X: &str = "guide_x";
    pub const GUIDE_Y: &str = "guide_y";
    pub const GUIDE_HALF_WIDTH: &str = "guide_half_width";
    pub const GUIDE_HALF_HEIGHT: &str = "guide_half_height";
    pub const SECONDS_PER_PHOTO: &str = "seconds_per_photo";
}

pub const DEFAULT_SECONDS_PER_PHOTO: f64 = 0.2;
pub const MIN_SECONDS_PER_PHOTO: f64 = 0.05;
pub const MAX_SECONDS_PER_PHOTO: f64 = 0.5;

/// A scalar configuration value.
///
/// Serialized untagged so the document on disk stays a flat JSON object of
/// strings, numbers and booleans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Name of the variant, for log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Flag(_) => "bool",
            ConfigValue::Number(_) => "float",
            ConfigValue::Text(_) => "string",
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Flag(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Number(value)
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<&Utf8Path> for ConfigValue {
    fn from(value: &Utf8Path) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<Utf8PathBuf> for ConfigValue {
    fn from(value: Utf8PathBuf) -> Self {
        ConfigValue::Text(value.into_string())
    }
}

/// The complete default entry set.
///
/// Every key the application reads is present here, so a store built from
/// these defaults never has a missing key.
pub fn default_entries(photos_directory: &Utf8Path) -> IndexMap<String, ConfigValue> {
    let guide = crate::models::GuideRegion::default();

    let mut entries = IndexMap::new();
    entries.insert(keys::PHOTOS_DIRECTORY.to_string(), photos_directory.into());
    entries.insert(keys::GUIDE_ENABLED.to_string(), guide.enabled.into());
    entries.insert(keys::GUIDE_X.to_string(), guide.center_x.into());
    entries.insert(keys::GUIDE_Y.to_string(), guide.center_y.into());
    entries.insert(keys::GUIDE_HALF_WIDTH.to_string(), guide.half_width.into());
    entries.insert(keys::GUIDE_HALF_HEIGHT.to_string(), guide.half_height.into());
    entries.insert(
        keys::SECONDS_PER_PHOTO.to_string(),
        DEFAULT_SECONDS_PER_PHOTO.into(),
    );
    entries
}

/// Clamp loaded values that have a valid range.
///
/// Returns `None` when the value is already in range.
pub fn sanitize(key: &str, value: &ConfigValue) -> Option<ConfigValue> {
    let number = value.as_f64()?;
    let clamped = match key {
        keys::GUIDE_HALF_WIDTH | keys::GUIDE_HALF_HEIGHT => number.clamp(0.01, 1.0),
        keys::SECONDS_PER_PHOTO => number.clamp(MIN_SECONDS_PER_PHOTO, MAX_SECONDS_PER_PHOTO),
        _ => return None,
    };
    if clamped.is_nan() {
        return None;
    }
    (clamped != number).then_some(ConfigValue::Number(clamped))
}
