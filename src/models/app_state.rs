use camino::Utf8PathBuf;

/// Target cadence of the presentation tick.
pub const PRESENTATION_TICK_MS: u64 = 50;

/// What the preview area shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Continuously replaced by the capture pipeline
    #[default]
    Live,
    /// Frozen on a captured still until it is saved or discarded
    Review,
}

/// Lifecycle of the camera from the presentation context's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CameraStatus {
    #[default]
    Starting,
    Live,
    Unavailable(String),
}

/// A modal message waiting to be acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Presentation-owned application state.
///
/// Mutated only from the presentation context through
/// [`StateManager::update`](crate::state::StateManager::update), which reports
/// what changed as [`StateChange`](crate::state::StateChange) events.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    pub mode: DisplayMode,
    pub camera: CameraStatus,

    pub photos_directory: Utf8PathBuf,
    /// `None` while unknown or when the directory does not exist
    pub photo_count: Option<usize>,
    pub photo_count_known: bool,

    pub guide_enabled: bool,
    pub seconds_per_photo: f64,

    pub is_saving: bool,
    pub is_encoding: bool,
    pub encode_progress: f32,
    pub encoder_available: Option<bool>,

    pub status_message: String,
    pub notice: Option<Notice>,
}

impl AppState {
    pub fn is_reviewing(&self) -> bool {
        self.mode == DisplayMode::Review
    }

    /// Whether a new timelapse can be started right now.
    pub fn can_create_timelapse(&self) -> bool {
        !self.is_encoding && self.photo_count.is_some_and(|count| count > 0)
    }

    /// Label for the photo counter.
    pub fn photo_count_text(&self) -> String {
        if !self.photo_count_known {
            return "Counting photos...".to_string();
        }
        match self.photo_count {
            Some(count) => format!("Found {} photo(s) in directory", count),
            None => "No photos directory found".to_string(),
        }
    }
}
