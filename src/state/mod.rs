// State management module
//
// StateManager owns the presentation state and reports every mutation as a
// list of StateChange events the controller applies to widgets. It lives on the
// presentation context only, so it holds the state without a lock.

use crate::models::{AppState, CameraStatus, DisplayMode, Notice};
use camino::Utf8PathBuf;

/// Change events produced by [`StateManager::update`].
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    ModeChanged {
        mode: DisplayMode,
    },

    CameraStatusChanged {
        status: CameraStatus,
    },

    /// Photo counter label changed
    PhotoCountChanged {
        text: String,
    },

    /// Whether the create-timelapse action is allowed changed
    CanCreateChanged {
        can_create: bool,
    },

    DirectoryChanged {
        directory: Utf8PathBuf,
    },

    GuideToggled {
        enabled: bool,
    },

    SecondsPerPhotoChanged {
        seconds: f64,
    },

    SavingChanged {
        is_saving: bool,
    },

    EncodingChanged {
        is_encoding: bool,
    },

    EncodeProgress {
        fraction: f32,
    },

    EncoderAvailabilityChanged {
        available: bool,
    },

    StatusChanged {
        message: String,
    },

    /// A notice was raised (`Some`) or dismissed (`None`)
    NoticeChanged {
        notice: Option<Notice>,
    },
}

/// Presentation state with change detection.
///
/// - [`read()`](Self::read) for reading a field or two
/// - [`update()`](Self::update) for mutations, returning what changed
/// - [`snapshot()`](Self::snapshot) for a full copy
#[derive(Debug, Default)]
pub struct StateManager {
    state: AppState,
}

impl StateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn snapshot(&self) -> AppState {
        self.state.clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let reviewing = state_manager.read(|state| state.is_reviewing());
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        f(&self.state)
    }

    /// Apply `update_fn` and report what changed.
    pub fn update<F>(&mut self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let old_state = self.state.clone();
        update_fn(&mut self.state);
        Self::detect_changes(&old_state, &self.state)
    }

    /// Every change between two states, in a stable order.
    pub fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.mode != new.mode {
            changes.push(StateChange::ModeChanged { mode: new.mode });
        }

        if old.camera != new.camera {
            changes.push(StateChange::CameraStatusChanged {
                status: new.camera.clone(),
            });
        }

        if old.photos_directory != new.photos_directory {
            changes.push(StateChange::DirectoryChanged {
                directory: new.photos_directory.clone(),
            });
        }

        let old_count_text = old.photo_count_text();
        let new_count_text = new.photo_count_text();
        if old_count_text != new_count_text {
            changes.push(StateChange::PhotoCountChanged {
                text: new_count_text,
            });
        }

        if old.guide_enabled != new.guide_enabled {
            changes.push(StateChange::GuideToggled {
                enabled: new.guide_enabled,
            });
        }

        if old.seconds_per_photo != new.seconds_per_photo {
            changes.push(StateChange::SecondsPerPhotoChanged {
                seconds: new.seconds_per_photo,
            });
        }

        if old.is_saving != new.is_saving {
            changes.push(StateChange::SavingChanged {
                is_saving: new.is_saving,
            });
        }

        if old.is_encoding != new.is_encoding {
            changes.push(StateChange::EncodingChanged {
                is_encoding: new.is_encoding,
            });
        }

        if old.encode_progress != new.encode_progress {
            changes.push(StateChange::EncodeProgress {
                fraction: new.encode_progress,
            });
        }

        if old.can_create_timelapse() != new.can_create_timelapse() {
            changes.push(StateChange::CanCreateChanged {
                can_create: new.can_create_timelapse(),
            });
        }

        if old.encoder_available != new.encoder_available
            && let Some(available) = new.encoder_available
        {
            changes.push(StateChange::EncoderAvailabilityChanged { available });
        }

        if old.status_message != new.status_message {
            changes.push(StateChange::StatusChanged {
                message: new.status_message.clone(),
            });
        }

        if old.notice != new.notice {
            changes.push(StateChange::NoticeChanged {
                notice: new.notice.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    pub fn set_mode(&mut self, mode: DisplayMode) -> Vec<StateChange> {
        self.update(|state| state.mode = mode)
    }

    pub fn set_status(&mut self, message: impl Into<String>) -> Vec<StateChange> {
        let message = message.into();
        self.update(|state| state.status_message = message)
    }

    pub fn show_notice(&mut self, notice: Notice) -> Vec<StateChange> {
        self.update(|state| state.notice = Some(notice))
    }

    pub fn dismiss_notice(&mut self) -> Vec<StateChange> {
        self.update(|state| state.notice = None)
    }

    pub fn set_photo_count(&mut self, count: Option<usize>) -> Vec<StateChange> {
        self.update(|state| {
            state.photo_count = count;
            state.photo_count_known = true;
        })
    }

    /// Mark the encode as running and reset its progress.
    pub fn start_encoding(&mut self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_encoding = true;
            state.encode_progress = 0.0;
            state.status_message = "Creating timelapse...".to_string();
        })
    }

    pub fn set_encode_progress(&mut self, fraction: f32) -> Vec<StateChange> {
        self.update(|state| {
            if state.is_encoding {
                state.encode_progress = fraction.clamp(0.0, 1.0);
            }
        })
    }
}
