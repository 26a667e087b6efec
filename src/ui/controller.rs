// GUI Controller - Bridges the Slint window with the Presenter
//
// The controller owns the MainWindow and a shared Presenter. It:
// - Forwards Slint callbacks to presenter methods
// - Drives the presentation tick with a slint::Timer
// - Applies StateChange events to window properties
// - Hands composed preview surfaces to the Image widget
// - Shows the native folder picker via `rfd`

use crate::models::{AppState, CameraStatus, DisplayMode, PRESENTATION_TICK_MS};
use crate::state::StateChange;
use crate::ui::presenter::Presenter;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use slint::{Image, Rgb8Pixel, SharedPixelBuffer, Timer, TimerMode};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

// Include the generated Slint code
slint::include_modules!();

/// GUI Controller that wires the Slint window to the presenter.
///
/// Everything here runs on the Slint event loop thread, which is the
/// presentation context: the presenter is shared through `Rc<RefCell<_>>`
/// between the tick timer and the callbacks, never across threads.
///
/// # Example
/// ```ignore
/// let mut presenter = Presenter::new(config, orchestrator, runtime.handle().clone());
/// presenter.startup();
///
/// let controller = GuiController::new(presenter)?;
/// controller.run()?; // Blocks until the window is closed
/// ```
pub struct GuiController {
    ui: MainWindow,
    presenter: Rc<RefCell<Presenter>>,
    _tick: Timer,
}

impl GuiController {
    pub fn new(presenter: Presenter) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;
        let presenter = Rc::new(RefCell::new(presenter));

        Self::sync_ui_with_state(&ui, &presenter.borrow().state());
        Self::setup_callbacks(&ui, &presenter);
        let tick = Self::start_tick(&ui, &presenter);

        tracing::info!("GUI controller initialized");

        Ok(Self {
            ui,
            presenter,
            _tick: tick,
        })
    }

    /// Run the Slint event loop, then release the camera and flush the config.
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        let result = self.ui.run();
        self.presenter.borrow_mut().shutdown();
        result
    }

    /// Set every property from a full state snapshot.
    fn sync_ui_with_state(ui: &MainWindow, state: &AppState) {
        ui.set_review_mode(state.is_reviewing());
        Self::apply_camera_status(ui, &state.camera);
        ui.set_photos_directory(state.photos_directory.as_str().into());
        ui.set_photo_count_text(state.photo_count_text().into());
        ui.set_can_create_timelapse(state.can_create_timelapse());
        ui.set_guide_enabled(state.guide_enabled);
        ui.set_seconds_per_photo(state.seconds_per_photo as f32);
        ui.set_is_saving(state.is_saving);
        ui.set_is_encoding(state.is_encoding);
        ui.set_encode_progress(state.encode_progress);
        ui.set_encoder_available(state.encoder_available.unwrap_or(true));
        ui.set_status_text(state.status_message.as_str().into());
        ui.set_show_message_dialog(false);
    }

    /// Apply presenter output to window properties.
    fn apply_changes(ui: &MainWindow, changes: Vec<StateChange>) {
        for change in changes {
            tracing::trace!("Applying state change: {:?}", change);

            match change {
                StateChange::ModeChanged { mode } => {
                    ui.set_review_mode(mode == DisplayMode::Review);
                }
                StateChange::CameraStatusChanged { status } => {
                    Self::apply_camera_status(ui, &status);
                }
                StateChange::PhotoCountChanged { text } => {
                    ui.set_photo_count_text(text.into());
                }
                StateChange::CanCreateChanged { can_create } => {
                    ui.set_can_create_timelapse(can_create);
                }
                StateChange::DirectoryChanged { directory } => {
                    ui.set_photos_directory(directory.as_str().into());
                }
                StateChange::GuideToggled { enabled } => {
                    ui.set_guide_enabled(enabled);
                }
                StateChange::SecondsPerPhotoChanged { seconds } => {
                    ui.set_seconds_per_photo(seconds as f32);
                }
                StateChange::SavingChanged { is_saving } => {
                    ui.set_is_saving(is_saving);
                }
                StateChange::EncodingChanged { is_encoding } => {
                    ui.set_is_encoding(is_encoding);
                }
                StateChange::EncodeProgress { fraction } => {
                    ui.set_encode_progress(fraction);
                }
                StateChange::EncoderAvailabilityChanged { available } => {
                    ui.set_encoder_available(available);
                }
                StateChange::StatusChanged { message } => {
                    ui.set_status_text(message.into());
                }
                StateChange::NoticeChanged { notice: Some(notice) } => {
                    ui.set_message_title(notice.title.into());
                    ui.set_message_text(notice.message.into());
                    ui.set_show_message_dialog(true);
                }
                StateChange::NoticeChanged { notice: None } => {
                    ui.set_show_message_dialog(false);
                }
            }
        }
    }

    fn apply_camera_status(ui: &MainWindow, status: &CameraStatus) {
        let (available, message) = match status {
            CameraStatus::Starting => (false, "Starting camera...".to_string()),
            CameraStatus::Live => (true, String::new()),
            CameraStatus::Unavailable(reason) => (false, format!("Camera unavailable: {}", reason)),
        };
        ui.set_camera_available(available);
        ui.set_camera_message(message.into());
    }

    /// Start the repeating presentation tick.
    fn start_tick(ui: &MainWindow, presenter: &Rc<RefCell<Presenter>>) -> Timer {
        let ui_weak = ui.as_weak();
        let presenter = Rc::clone(presenter);
        let timer = Timer::default();

        timer.start(
            TimerMode::Repeated,
            Duration::from_millis(PRESENTATION_TICK_MS),
            move || {
                let Some(ui) = ui_weak.upgrade() else {
                    return;
                };
                let mut presenter = presenter.borrow_mut();

                Self::apply_changes(&ui, presenter.tick());

                let (width, height) = Self::preview_size(&ui);
                if let Some(surface) = presenter.render(width, height) {
                    let buffer = SharedPixelBuffer::<Rgb8Pixel>::clone_from_slice(
                        surface.as_raw(),
                        surface.width(),
                        surface.height(),
                    );
                    ui.set_preview(Image::from_rgb8(buffer));
                }
            },
        );

        tracing::debug!("Presentation tick started at {}ms", PRESENTATION_TICK_MS);
        timer
    }

    /// Size of the preview area in whole logical pixels.
    fn preview_size(ui: &MainWindow) -> (u32, u32) {
        (
            ui.get_preview_width().max(0.0) as u32,
            ui.get_preview_height().max(0.0) as u32,
        )
    }

    /// Set up all UI callbacks
    fn setup_callbacks(ui: &MainWindow, presenter: &Rc<RefCell<Presenter>>) {
        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_capture_photo(move || {
            tracing::debug!("Capture clicked");
            if let Some(ui) = ui_weak.upgrade() {
                Self::apply_changes(&ui, shared.borrow_mut().capture());
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_save_photo(move || {
            tracing::debug!("Save clicked");
            if let Some(ui) = ui_weak.upgrade() {
                Self::apply_changes(&ui, shared.borrow_mut().save());
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_discard_photo(move || {
            tracing::debug!("Discard clicked");
            if let Some(ui) = ui_weak.upgrade() {
                Self::apply_changes(&ui, shared.borrow_mut().discard());
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_guide_toggled(move |enabled| {
            tracing::debug!("Guide toggled: {}", enabled);
            if let Some(ui) = ui_weak.upgrade() {
                let changes = shared.borrow_mut().toggle_guide(enabled);
                // Review mode rejects the toggle; put the checkbox back
                if changes.is_empty() {
                    ui.set_guide_enabled(shared.borrow().state().guide_enabled);
                }
                Self::apply_changes(&ui, changes);
            }
        });

        // Pointer events arrive in preview-area coordinates, which are the
        // coordinates of the rendered surface.
        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_guide_pointer_down(move |x, y| {
            if let Some(ui) = ui_weak.upgrade() {
                let (width, height) = Self::preview_size(&ui);
                let grabbed = shared.borrow_mut().pointer_down(
                    f64::from(x),
                    f64::from(y),
                    f64::from(width),
                    f64::from(height),
                );
                tracing::trace!("Guide pointer down at ({}, {}): grabbed={}", x, y, grabbed);
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_guide_pointer_move(move |x, y| {
            if let Some(ui) = ui_weak.upgrade() {
                let (width, height) = Self::preview_size(&ui);
                shared.borrow_mut().pointer_move(
                    f64::from(x),
                    f64::from(y),
                    f64::from(width),
                    f64::from(height),
                );
            }
        });

        let shared = Rc::clone(presenter);

        ui.on_guide_pointer_up(move || {
            shared.borrow_mut().pointer_up();
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_seconds_per_photo_changed(move |seconds| {
            if let Some(ui) = ui_weak.upgrade() {
                let changes = shared.borrow_mut().set_seconds_per_photo(f64::from(seconds));
                Self::apply_changes(&ui, changes);
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_create_timelapse(move |seconds| {
            tracing::debug!("Create timelapse clicked ({}s per photo)", seconds);
            if let Some(ui) = ui_weak.upgrade() {
                let changes = shared.borrow_mut().create_timelapse(f64::from(seconds));
                Self::apply_changes(&ui, changes);
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_choose_directory(move || {
            tracing::debug!("Choose directory clicked");

            // The dialog is modal; do not hold the presenter across it
            let current = shared.borrow().state().photos_directory;
            let Some(directory) = Self::show_folder_picker("Select Photos Directory", &current)
            else {
                return;
            };

            tracing::info!("Photos directory selected: {}", directory);
            if let Some(ui) = ui_weak.upgrade() {
                let changes = shared.borrow_mut().set_photos_directory(directory);
                Self::apply_changes(&ui, changes);
            }
        });

        let ui_weak = ui.as_weak();
        let shared = Rc::clone(presenter);

        ui.on_message_dialog_dismissed(move || {
            tracing::debug!("Message dialog dismissed");
            if let Some(ui) = ui_weak.upgrade() {
                Self::apply_changes(&ui, shared.borrow_mut().dismiss_notice());
            }
        });

        let shared = Rc::clone(presenter);

        ui.window().on_close_requested(move || {
            if shared.borrow().state().is_encoding {
                tracing::warn!("Close requested while a timelapse is encoding");
            } else {
                tracing::info!("Close requested - allowing window to close");
            }
            slint::CloseRequestResponse::HideWindow
        });

        tracing::debug!("UI callbacks configured");
    }

    /// Show a native folder picker starting at `current`.
    ///
    /// Returns `None` when cancelled or when the chosen path is not UTF-8.
    fn show_folder_picker(title: &str, current: &Utf8Path) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        let mut dialog = FileDialog::new().set_title(title);
        if current.is_dir() {
            dialog = dialog.set_directory(current.as_std_path());
        }

        dialog.pick_folder().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }
}
