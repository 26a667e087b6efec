// Presenter - toolkit-independent presentation logic
//
// Owns everything the presentation context mutates: the config store, the
// state manager, the guide overlay, the displayed and captured frames, the
// render cache and the timelapse orchestrator. Driven by `tick()` at the
// presentation cadence and by input methods; every method returns the
// StateChange events the toolkit layer has to apply.

use crate::capture::{CameraDevice, CaptureError, CapturePipeline, CaptureStats};
use crate::config::ConfigStore;
use crate::guide::GuideOverlay;
use crate::models::config::{MAX_SECONDS_PER_PHOTO, MIN_SECONDS_PER_PHOTO};
use crate::models::{
    AppState, CameraStatus, DisplayMode, EncodeJob, EncodeOutcome, Frame, Notice, keys,
};
use crate::render::{ScaledSurfaceCache, compose_surface};
use crate::services::encoder_probe::{EncoderProbe, PROBE_TIMEOUT, probe_encoder};
use crate::services::photos::{self, count_photos, find_photo_for_day, save_photo};
use crate::services::timelapse::{self, TimelapseError, TimelapseOrchestrator};
use crate::state::{StateChange, StateManager};
use crate::ui::bridge::{EventLoopBridge, EventLoopBridgeHandle};
use camino::Utf8PathBuf;
use chrono::Local;
use image::RgbImage;
use tokio::runtime::Handle;

/// Results of background work, applied on the presentation context.
#[derive(Debug)]
pub enum AppEvent {
    CameraStarted(Result<CapturePipeline, CaptureError>),
    PhotoSaved(Result<Utf8PathBuf, String>),
    PhotosCounted {
        directory: Utf8PathBuf,
        count: Option<usize>,
    },
    TodayPhoto(Option<String>),
    EncoderProbed(EncoderProbe),
    JobPrepared(Result<EncodeJob, TimelapseError>),
    EncodeProgress(f32),
    EncodeFinished(EncodeOutcome),
}

pub struct Presenter {
    config: ConfigStore,
    state: StateManager,
    guide: GuideOverlay,
    pipeline: Option<CapturePipeline>,
    current_frame: Option<Frame>,
    captured_frame: Option<Frame>,
    cache: ScaledSurfaceCache,
    orchestrator: TimelapseOrchestrator,
    /// A job is being listed on a worker and has not started yet
    preparing_job: bool,
    bridge: EventLoopBridge<AppEvent>,
}

impl Presenter {
    pub fn new(config: ConfigStore, orchestrator: TimelapseOrchestrator, runtime: Handle) -> Self {
        let state = AppState {
            photos_directory: config.photos_directory(),
            guide_enabled: config.guide_region().enabled,
            seconds_per_photo: config.seconds_per_photo(),
            ..AppState::default()
        };

        Self {
            config,
            state: StateManager::with_state(state),
            guide: GuideOverlay::new(),
            pipeline: None,
            current_frame: None,
            captured_frame: None,
            cache: ScaledSurfaceCache::new(),
            orchestrator,
            preparing_job: false,
            bridge: EventLoopBridge::new(runtime),
        }
    }

    fn handle(&self) -> EventLoopBridgeHandle<AppEvent> {
        self.bridge.clone_handle()
    }

    // ---- Startup work, all off the presentation context ----

    /// Kick off every startup task with the platform's default camera.
    pub fn startup(&mut self) {
        self.start_camera(crate::capture::open_default_camera);
        self.refresh_photo_count();
        self.check_today_photo();
        self.probe_encoder();
    }

    /// Open the camera on a background task; the pipeline arrives as
    /// [`AppEvent::CameraStarted`].
    pub fn start_camera<F>(&mut self, open: F)
    where
        F: FnOnce() -> Result<Box<dyn CameraDevice>, CaptureError> + Send + 'static,
    {
        tracing::info!("Starting camera");
        self.handle()
            .spawn_blocking(move || CapturePipeline::start(open), AppEvent::CameraStarted);
    }

    pub fn refresh_photo_count(&self) {
        let directory = self.state.read(|state| state.photos_directory.clone());
        self.handle().spawn_blocking(
            move || {
                let count = count_photos(&directory);
                (directory, count)
            },
            |(directory, count)| AppEvent::PhotosCounted { directory, count },
        );
    }

    pub fn check_today_photo(&self) {
        let directory = self.state.read(|state| state.photos_directory.clone());
        let today = Local::now().date_naive();
        self.handle().spawn_blocking(
            move || find_photo_for_day(&directory, today),
            AppEvent::TodayPhoto,
        );
    }

    pub fn probe_encoder(&self) {
        let program = self.orchestrator.settings().program.clone();
        self.handle().spawn_async(async move {
            AppEvent::EncoderProbed(probe_encoder(&program, PROBE_TIMEOUT).await)
        });
    }

    // ---- Presentation tick ----

    /// Apply finished background work and pull the freshest camera frame.
    pub fn tick(&mut self) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for event in self.bridge.drain() {
            changes.extend(self.apply(event));
        }

        if !self.state.read(AppState::is_reviewing)
            && let Some(pipeline) = self.pipeline.as_mut()
            && let Some(frame) = pipeline.get_latest_frame()
        {
            self.current_frame = Some(frame);
        }

        changes
    }

    /// Compose the preview surface for a `width` x `height` area.
    ///
    /// Returns `None` while there is nothing to show.
    pub fn render(&mut self, width: u32, height: u32) -> Option<RgbImage> {
        let reviewing = self.state.read(AppState::is_reviewing);
        let frame = if reviewing {
            self.captured_frame.as_ref()
        } else {
            self.current_frame.as_ref()
        }?;

        let region = self.config.guide_region();
        let guide = (!reviewing && region.enabled).then_some(&region);
        compose_surface(&mut self.cache, frame, width, height, guide)
    }

    /// Apply one background result.
    pub fn apply(&mut self, event: AppEvent) -> Vec<StateChange> {
        match event {
            AppEvent::CameraStarted(Ok(pipeline)) => {
                self.pipeline = Some(pipeline);
                self.state.update(|state| state.camera = CameraStatus::Live)
            }
            AppEvent::CameraStarted(Err(e)) => {
                tracing::warn!("Continuing without live preview: {}", e);
                self.state
                    .update(|state| state.camera = CameraStatus::Unavailable(e.to_string()))
            }
            AppEvent::PhotoSaved(Ok(path)) => {
                let mut changes = self.state.update(|state| {
                    state.is_saving = false;
                    state.notice =
                        Some(Notice::new("Photo Saved!", format!("Saved to: {}", path)));
                });
                self.refresh_photo_count();
                changes.extend(self.state.set_status(""));
                changes
            }
            AppEvent::PhotoSaved(Err(message)) => {
                tracing::error!("Failed to save photo: {}", message);
                self.state.update(|state| {
                    state.is_saving = false;
                    state.notice = Some(Notice::new("Photo Not Saved", message));
                })
            }
            AppEvent::PhotosCounted { directory, count } => {
                let current = self.state.read(|state| state.photos_directory.clone());
                if directory != current {
                    tracing::debug!("Discarding stale photo count for {}", directory);
                    return Vec::new();
                }
                self.state.set_photo_count(count)
            }
            AppEvent::TodayPhoto(Some(name)) => self.state.show_notice(Notice::new(
                "Photo Already Taken Today",
                format!("You've already taken a photo today: {}", name),
            )),
            AppEvent::TodayPhoto(None) => Vec::new(),
            AppEvent::EncoderProbed(probe) => self
                .state
                .update(|state| state.encoder_available = Some(probe.is_available())),
            AppEvent::JobPrepared(job) => {
                self.preparing_job = false;
                self.start_job(job)
            }
            AppEvent::EncodeProgress(fraction) => self.state.set_encode_progress(fraction),
            AppEvent::EncodeFinished(outcome) => self.finish_encode(outcome),
        }
    }

    // ---- Capture / review ----

    /// Freeze the current frame for review.
    pub fn capture(&mut self) -> Vec<StateChange> {
        if self.state.read(AppState::is_reviewing) {
            return Vec::new();
        }
        let Some(frame) = self.current_frame.clone() else {
            return self.state.set_status("No camera frame to capture");
        };

        tracing::info!("Captured frame {}", frame.sequence());
        self.captured_frame = Some(frame);
        self.guide.pointer_up();
        self.state.set_mode(DisplayMode::Review)
    }

    /// Hand the captured frame to the photo-save worker and go back to live.
    pub fn save(&mut self) -> Vec<StateChange> {
        let Some(frame) = self.captured_frame.take() else {
            return Vec::new();
        };

        let directory = self.config.photos_directory();
        let taken_at = Local::now().naive_local();
        self.handle().spawn_blocking(
            move || save_photo(&directory, &frame, taken_at).map_err(|e| e.to_string()),
            AppEvent::PhotoSaved,
        );

        self.state.update(|state| {
            state.mode = DisplayMode::Live;
            state.is_saving = true;
            state.status_message = "Saving photo...".to_string();
        })
    }

    pub fn discard(&mut self) -> Vec<StateChange> {
        if self.captured_frame.take().is_some() {
            tracing::debug!("Captured frame discarded");
        }
        self.state.set_mode(DisplayMode::Live)
    }

    // ---- Guide ----

    pub fn pointer_down(&mut self, px: f64, py: f64, width: f64, height: f64) -> bool {
        if self.state.read(AppState::is_reviewing) {
            return false;
        }
        self.guide.pointer_down(&self.config, px, py, width, height)
    }

    pub fn pointer_move(&mut self, px: f64, py: f64, width: f64, height: f64) -> bool {
        if self.state.read(AppState::is_reviewing) {
            return false;
        }
        self.guide.pointer_move(&mut self.config, px, py, width, height)
    }

    pub fn pointer_up(&mut self) {
        self.guide.pointer_up();
    }

    pub fn toggle_guide(&mut self, enabled: bool) -> Vec<StateChange> {
        if self.state.read(AppState::is_reviewing) {
            return Vec::new();
        }
        self.guide.set_enabled(&mut self.config, enabled);
        self.state.update(|state| state.guide_enabled = enabled)
    }

    // ---- Settings ----

    /// Persist a new duration, clamped to the slider range in 0.05 s steps.
    pub fn set_seconds_per_photo(&mut self, seconds: f64) -> Vec<StateChange> {
        let steps = (seconds.clamp(MIN_SECONDS_PER_PHOTO, MAX_SECONDS_PER_PHOTO) * 20.0).round();
        let seconds = (steps * 5.0) / 100.0;

        if self.config.get_f64(keys::SECONDS_PER_PHOTO) != Some(seconds) {
            self.config.set(keys::SECONDS_PER_PHOTO, seconds);
        }
        self.state.update(|state| state.seconds_per_photo = seconds)
    }

    /// Switch to another photos directory, creating it, and recount.
    pub fn set_photos_directory(&mut self, directory: Utf8PathBuf) -> Vec<StateChange> {
        tracing::info!("Photos directory set to {}", directory);
        self.config.set(keys::PHOTOS_DIRECTORY, directory.as_path());

        let target = directory.clone();
        self.handle().spawn_blocking(
            move || {
                if let Err(e) = photos::ensure_directory(&target) {
                    tracing::error!("{}", e);
                }
                let count = count_photos(&target);
                (target, count)
            },
            |(directory, count)| AppEvent::PhotosCounted { directory, count },
        );

        self.state.update(|state| {
            state.photos_directory = directory;
            state.photo_count = None;
            state.photo_count_known = false;
        })
    }

    // ---- Timelapse ----

    /// Start encoding the photos directory at `seconds` per photo.
    ///
    /// The directory is listed on a worker; the encode starts when the
    /// listing arrives as [`AppEvent::JobPrepared`].
    pub fn create_timelapse(&mut self, seconds: f64) -> Vec<StateChange> {
        if self.preparing_job || self.orchestrator.is_running() {
            tracing::debug!("Timelapse already running, ignoring request");
            return Vec::new();
        }

        let changes = self.set_seconds_per_photo(seconds);
        let seconds = self.state.read(|state| state.seconds_per_photo);
        let directory = self.state.read(|state| state.photos_directory.clone());
        let now = Local::now().naive_local();

        self.preparing_job = true;
        self.handle().spawn_blocking(
            move || timelapse::prepare_job(&directory, seconds, now),
            AppEvent::JobPrepared,
        );
        changes
    }

    fn start_job(&mut self, job: Result<EncodeJob, TimelapseError>) -> Vec<StateChange> {
        let job = match job {
            Ok(job) => job,
            Err(TimelapseError::NoPhotos(directory)) => {
                tracing::info!("No photos to encode in {}", directory);
                return self.state.set_status("No photos found!");
            }
            Err(e) => {
                tracing::error!("{}", e);
                return self.state.set_status(format!("Error: {}", e));
            }
        };

        let progress = self.handle();
        let finished = self.handle();
        let runtime = self.bridge.runtime().clone();
        let started = self.orchestrator.start(
            job,
            &runtime,
            move |fraction| progress.post(AppEvent::EncodeProgress(fraction)),
            move |outcome| finished.post(AppEvent::EncodeFinished(outcome)),
        );

        match started {
            Ok(()) => self.state.start_encoding(),
            Err(e) => self.state.set_status(format!("Error: {}", e)),
        }
    }

    fn finish_encode(&mut self, outcome: EncodeOutcome) -> Vec<StateChange> {
        self.orchestrator.finish(&outcome);

        let changes = match &outcome {
            EncodeOutcome::Completed { output } => {
                let name = output.file_name().unwrap_or(output.as_str()).to_string();
                self.state.update(|state| {
                    state.is_encoding = false;
                    state.encode_progress = 1.0;
                    state.status_message = format!("Timelapse created: {}", name);
                })
            }
            EncodeOutcome::Failed {
                message,
                diagnostics,
            } => {
                tracing::error!("Timelapse failed: {}", message);
                tracing::debug!("Encoder diagnostics:\n{}", diagnostics);
                self.state.update(|state| {
                    state.is_encoding = false;
                    state.encode_progress = 0.0;
                    state.status_message = format!("Error: {}", message);
                })
            }
        };

        self.refresh_photo_count();
        changes
    }

    // ---- Notices and shutdown ----

    pub fn dismiss_notice(&mut self) -> Vec<StateChange> {
        self.state.dismiss_notice()
    }

    /// Stop capture (flag, join, release) and write pending settings.
    pub fn shutdown(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.stop();
        }
        match self.config.flush() {
            Ok(true) => tracing::info!("Pending settings written on shutdown"),
            Ok(false) => {}
            Err(e) => tracing::error!("{}", e),
        }
    }

    // ---- Accessors ----

    pub fn state(&self) -> AppState {
        self.state.snapshot()
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn mode(&self) -> DisplayMode {
        self.state.read(|state| state.mode)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.current_frame.as_ref()
    }

    pub fn captured_frame(&self) -> Option<&Frame> {
        self.captured_frame.as_ref()
    }

    pub fn capture_stats(&self) -> Option<&CaptureStats> {
        self.pipeline.as_ref().map(CapturePipeline::stats)
    }

    pub fn render_cache(&self) -> &ScaledSurfaceCache {
        &self.cache
    }

    pub fn orchestrator(&self) -> &TimelapseOrchestrator {
        &self.orchestrator
    }
}
