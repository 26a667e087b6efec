use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;

/// Prefix of generated timelapse files.
pub const TIMELAPSE_PREFIX: &str = "timelapse_";

/// Container extension of generated timelapse files.
pub const TIMELAPSE_CONTAINER: &str = "mp4";

/// Characters of encoder diagnostics shown to the user.
pub const DISPLAY_MESSAGE_CHARS: usize = 100;

/// One timelapse request, immutable once handed to the encode worker.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeJob {
    pub source_directory: Utf8PathBuf,
    /// Photo file names in lexicographic (= chronological) order.
    pub photos: Vec<String>,
    pub seconds_per_photo: f64,
    pub output_path: Utf8PathBuf,
}

impl EncodeJob {
    /// Total playback length of the timelapse in seconds.
    pub fn total_seconds(&self) -> f64 {
        self.photos.len() as f64 * self.seconds_per_photo
    }
}

/// `timelapse_YYYYMMDD_HHMMSS.mp4` inside `directory`.
pub fn timelapse_output_path(directory: &Utf8Path, now: NaiveDateTime) -> Utf8PathBuf {
    directory.join(format!(
        "{}{}.{}",
        TIMELAPSE_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        TIMELAPSE_CONTAINER
    ))
}

/// Terminal result of an encode worker.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOutcome {
    Completed {
        output: Utf8PathBuf,
    },
    Failed {
        /// Short text for display
        message: String,
        /// Full standard error of the encoder, for verbose logs
        diagnostics: String,
    },
}

impl EncodeOutcome {
    /// Build a failure whose display message is the truncated diagnostic text.
    pub fn failed(diagnostics: impl Into<String>) -> Self {
        let diagnostics = diagnostics.into();
        EncodeOutcome::Failed {
            message: truncate_for_display(&diagnostics, DISPLAY_MESSAGE_CHARS),
            diagnostics,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, EncodeOutcome::Completed { .. })
    }
}

/// Orchestrator state: `Idle -> Running -> {Completed | Failed}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EncodeState {
    #[default]
    Idle,
    Running {
        output: Utf8PathBuf,
    },
    Completed(Utf8PathBuf),
    Failed(String),
}

impl EncodeState {
    pub fn is_running(&self) -> bool {
        matches!(self, EncodeState::Running { .. })
    }
}

/// First `max_chars` characters of the trimmed text.
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}
