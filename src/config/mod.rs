pub mod debounce;
pub mod paths;

pub use debounce::Debouncer;
pub use paths::AppPaths;

use crate::models::config::{ConfigValue, default_entries, keys, sanitize};
use crate::models::GuideRegion;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;

/// Quiet period after the last `set` before the document is written.
pub const CONFIG_SAVE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config from {path}: {source}")]
    Load {
        path: Utf8PathBuf,
        #[source]
        source: ::config::ConfigError,
    },

    #[error("Failed to save config to {path}: {source}")]
    Save {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination of the serialized configuration document.
///
/// Called from the blocking pool, so implementations may do file I/O.
pub trait ConfigWriter: Send + Sync {
    fn write(&self, document: &str) -> Result<(), ConfigError>;
}

/// Overwrites a single JSON file with the whole document.
#[derive(Debug, Clone)]
pub struct FileConfigWriter {
    path: Utf8PathBuf,
}

impl FileConfigWriter {
    pub fn new<P: AsRef<Utf8Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigWriter for FileConfigWriter {
    fn write(&self, document: &str) -> Result<(), ConfigError> {
        let to_save_error = |source| ConfigError::Save {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(to_save_error)?;
        }

        fs::write(&self.path, document).map_err(to_save_error)
    }
}

/// Serializes writes and refuses snapshots older than the last one written.
///
/// A debounced write that already reached the blocking pool cannot be
/// aborted, so it may race a later write or a flush. Each snapshot carries
/// the generation it was taken at and only a newer generation may overwrite.
struct SnapshotWriter {
    writer: Arc<dyn ConfigWriter>,
    written: Mutex<u64>,
}

impl SnapshotWriter {
    fn new(writer: Arc<dyn ConfigWriter>) -> Self {
        Self {
            writer,
            written: Mutex::new(0),
        }
    }

    /// Returns false when a newer snapshot was already written.
    fn write(&self, generation: u64, document: &str) -> Result<bool, ConfigError> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= generation {
            tracing::debug!(generation, written = *written, "Skipping stale settings snapshot");
            return Ok(false);
        }
        self.writer.write(document)?;
        *written = generation;
        Ok(true)
    }
}

/// In-memory key/value settings with debounced whole-document persistence.
///
/// The map is owned by the presentation context and mutated only through
/// `&mut self`, so it needs no lock. Each [`set`](Self::set) serializes the
/// current map and hands that snapshot to the [`Debouncer`]; the deferred
/// write never reads the live map.
pub struct ConfigStore {
    values: IndexMap<String, ConfigValue>,
    writer: Arc<SnapshotWriter>,
    generation: u64,
    debouncer: Debouncer,
    delay: Duration,
    load_error: Option<ConfigError>,
}

impl ConfigStore {
    /// Build a store from the defaults, overlaid with `path` if it exists.
    ///
    /// A corrupt file is not fatal: the defaults stay in place and the error
    /// is kept for [`load_error`](Self::load_error).
    pub fn load(path: &Utf8Path, default_photos_dir: &Utf8Path, runtime: Handle) -> Self {
        let mut store = Self::with_writer(
            default_entries(default_photos_dir),
            Arc::new(FileConfigWriter::new(path)),
            runtime,
            CONFIG_SAVE_DELAY,
        );

        match store.overlay_file(path) {
            Ok(0) => tracing::info!("No saved settings at {}, using defaults", path),
            Ok(count) => tracing::info!("Loaded {} setting(s) from {}", count, path),
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                store.load_error = Some(e);
            }
        }

        store
    }

    /// Build a store over explicit defaults and writer, without touching disk.
    pub fn with_writer(
        defaults: IndexMap<String, ConfigValue>,
        writer: Arc<dyn ConfigWriter>,
        runtime: Handle,
        delay: Duration,
    ) -> Self {
        Self {
            values: defaults,
            writer: Arc::new(SnapshotWriter::new(writer)),
            generation: 0,
            debouncer: Debouncer::new(runtime),
            delay,
            load_error: None,
        }
    }

    /// Overlay known keys from a JSON document on disk.
    ///
    /// A value is taken only if it converts to the type of the current
    /// entry. Returns how many values were overlaid.
    pub fn overlay_file(&mut self, path: &Utf8Path) -> Result<usize, ConfigError> {
        let mut builder = ::config::Config::builder();
        for (key, value) in &self.values {
            builder = match value {
                ConfigValue::Flag(flag) => builder.set_default(key.as_str(), *flag),
                ConfigValue::Number(number) => builder.set_default(key.as_str(), *number),
                ConfigValue::Text(text) => builder.set_default(key.as_str(), text.as_str()),
            }
            .map_err(|source| ConfigError::Load {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let layered = builder
            .add_source(
                ::config::File::from(path.as_std_path())
                    .format(::config::FileFormat::Json)
                    .required(false),
            )
            .build()
            .map_err(|source| ConfigError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        let mut overlaid = 0;
        let keys: Vec<String> = self.values.keys().cloned().collect();
        for key in keys {
            let current = &self.values[&key];
            let loaded = match current {
                ConfigValue::Flag(_) => layered.get_bool(&key).map(ConfigValue::Flag),
                ConfigValue::Number(_) => layered.get_float(&key).map(ConfigValue::Number),
                ConfigValue::Text(_) => layered.get_string(&key).map(ConfigValue::Text),
            };

            match loaded {
                Ok(value) => {
                    let value = match sanitize(&key, &value) {
                        Some(clamped) => {
                            tracing::warn!("Setting {} out of range, clamped to {:?}", key, clamped);
                            clamped
                        }
                        None => value,
                    };
                    if value != *current {
                        overlaid += 1;
                        self.values.insert(key, value);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Ignoring saved {} (expected {}): {}",
                        key,
                        current.kind(),
                        e
                    );
                }
            }
        }

        Ok(overlaid)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ConfigValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    /// Update a value in memory and (re)schedule the debounced write.
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        let value = value.into();
        tracing::debug!("Config set {} = {:?}", key, value);
        self.values.insert(key.to_string(), value);
        self.schedule_save();
    }

    fn schedule_save(&mut self) {
        let document = match self.serialize() {
            Ok(document) => document,
            Err(e) => {
                tracing::error!("{}", e);
                return;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let writer = Arc::clone(&self.writer);
        self.debouncer.reset_timer(self.delay, move || {
            match writer.write(generation, &document) {
                Ok(true) => tracing::debug!("Settings saved"),
                Ok(false) => {}
                Err(e) => tracing::error!("{}", e),
            }
        });
    }

    /// Write any pending change now and cancel the timer.
    ///
    /// Waits for a debounced write already in progress. Returns whether this
    /// call wrote the document.
    pub fn flush(&mut self) -> Result<bool, ConfigError> {
        if !self.debouncer.cancel() {
            return Ok(false);
        }

        let document = self.serialize()?;
        let written = self.writer.write(self.generation, &document)?;
        if written {
            tracing::info!("Settings flushed");
        }
        Ok(written)
    }

    pub fn has_pending_save(&self) -> bool {
        self.debouncer.is_pending()
    }

    fn serialize(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.values)?)
    }

    /// Error recorded while loading, if the saved document was unreadable.
    pub fn load_error(&self) -> Option<&ConfigError> {
        self.load_error.as_ref()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn photos_directory(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(self.get_str(keys::PHOTOS_DIRECTORY).unwrap_or_default())
    }

    pub fn seconds_per_photo(&self) -> f64 {
        self.get_f64(keys::SECONDS_PER_PHOTO)
            .unwrap_or(crate::models::config::DEFAULT_SECONDS_PER_PHOTO)
    }

    /// Current guide region, filling any mistyped entry from the defaults.
    pub fn guide_region(&self) -> GuideRegion {
        let fallback = GuideRegion::default();
        GuideRegion {
            center_x: self.get_f64(keys::GUIDE_X).unwrap_or(fallback.center_x),
            center_y: self.get_f64(keys::GUIDE_Y).unwrap_or(fallback.center_y),
            half_width: self
                .get_f64(keys::GUIDE_HALF_WIDTH)
                .unwrap_or(fallback.half_width),
            half_height: self
                .get_f64(keys::GUIDE_HALF_HEIGHT)
                .unwrap_or(fallback.half_height),
            enabled: self.get_bool(keys::GUIDE_ENABLED).unwrap_or(fallback.enabled),
        }
    }
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("values", &self.values)
            .field("delay", &self.delay)
            .field("pending", &self.debouncer.is_pending())
            .finish()
    }
}
