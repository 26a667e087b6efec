//! Integration tests for the Presenter
//!
//! These tests drive the presenter the way the GUI does: input methods plus
//! a presentation tick, checking the StateChange events and the resulting
//! state. Background work runs on a real tokio runtime.

use camino::Utf8PathBuf;
use daily_portrait::capture::{CameraDevice, CaptureError};
use daily_portrait::config::{ConfigStore, FileConfigWriter};
use daily_portrait::models::{
    CameraStatus, DeviceLayout, DisplayMode, Notice, PhotoRecord, RawFrame,
    default_entries, keys,
};
use daily_portrait::services::{EncoderSettings, TimelapseOrchestrator, TimelapseService};
use daily_portrait::state::StateChange;
use daily_portrait::ui::Presenter;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct SolidCamera {
    shade: u8,
}

impl CameraDevice for SolidCamera {
    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        thread::sleep(Duration::from_millis(5));
        Ok(RawFrame {
            data: vec![self.shade; 32 * 24 * 3],
            width: 32,
            height: 24,
            layout: DeviceLayout::Rgb24,
        })
    }
}

/// Delivers a single frame, then every read fails.
struct OneFrameCamera {
    delivered: bool,
}

impl CameraDevice for OneFrameCamera {
    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        thread::sleep(Duration::from_millis(5));
        if self.delivered {
            return Err(CaptureError::DeviceReadTransient("timed out".to_string()));
        }
        self.delivered = true;
        Ok(RawFrame {
            data: vec![150; 32 * 24 * 3],
            width: 32,
            height: 24,
            layout: DeviceLayout::Rgb24,
        })
    }
}

// Dropped in field order: presenter first, runtime last
struct Fixture {
    presenter: Presenter,
    photos: Utf8PathBuf,
    _dir: TempDir,
    _runtime: tokio::runtime::Runtime,
}

fn fixture() -> Fixture {
    fixture_with(TimelapseService::default())
}

fn fixture_with(service: TimelapseService) -> Fixture {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
    let photos = root.join("photos");
    std::fs::create_dir_all(&photos).unwrap();

    let config = ConfigStore::with_writer(
        default_entries(&photos),
        Arc::new(FileConfigWriter::new(root.join("config.json"))),
        runtime.handle().clone(),
        Duration::from_secs(60),
    );
    let presenter = Presenter::new(
        config,
        TimelapseOrchestrator::new(service),
        runtime.handle().clone(),
    );

    Fixture {
        presenter,
        photos,
        _dir: dir,
        _runtime: runtime,
    }
}

/// Tick until `condition` holds, collecting every change on the way.
fn tick_until<F>(presenter: &mut Presenter, condition: F) -> Vec<StateChange>
where
    F: Fn(&Presenter) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut changes = Vec::new();
    while !condition(presenter) {
        assert!(Instant::now() < deadline, "condition not reached");
        changes.extend(presenter.tick());
        thread::sleep(Duration::from_millis(10));
    }
    changes
}

fn start_live(presenter: &mut Presenter, shade: u8) {
    presenter.start_camera(move || Ok(Box::new(SolidCamera { shade }) as Box<dyn CameraDevice>));
    tick_until(presenter, |p| p.current_frame().is_some());
}

#[test]
fn test_camera_failure_keeps_ui_usable() {
    let mut fx = fixture();

    fx.presenter
        .start_camera(|| Err(CaptureError::DeviceUnavailable("no camera".to_string())));
    let changes = tick_until(&mut fx.presenter, |p| {
        matches!(p.state().camera, CameraStatus::Unavailable(_))
    });

    assert!(
        changes
            .iter()
            .any(|c| matches!(c, StateChange::CameraStatusChanged { .. }))
    );
    assert!(fx.presenter.render(320, 240).is_none());

    let changes = fx.presenter.capture();
    assert_eq!(
        changes,
        vec![StateChange::StatusChanged {
            message: "No camera frame to capture".to_string()
        }]
    );
    assert_eq!(fx.presenter.mode(), DisplayMode::Live);
}

#[test]
fn test_capture_freezes_preview_until_discard() {
    let mut fx = fixture();
    start_live(&mut fx.presenter, 90);
    assert_eq!(fx.presenter.state().camera, CameraStatus::Live);

    let changes = fx.presenter.capture();
    assert_eq!(
        changes,
        vec![StateChange::ModeChanged {
            mode: DisplayMode::Review
        }]
    );
    let frozen = fx.presenter.captured_frame().unwrap().sequence();

    // Live frames keep arriving but are not pulled while reviewing
    let shown = fx.presenter.current_frame().unwrap().sequence();
    thread::sleep(Duration::from_millis(50));
    fx.presenter.tick();
    assert_eq!(fx.presenter.current_frame().unwrap().sequence(), shown);

    let surface = fx.presenter.render(64, 48).unwrap();
    assert_eq!(surface.get_pixel(32, 24).0, [90, 90, 90]);
    assert_eq!(fx.presenter.captured_frame().unwrap().sequence(), frozen);

    fx.presenter.discard();
    assert_eq!(fx.presenter.mode(), DisplayMode::Live);
    assert!(fx.presenter.captured_frame().is_none());
}

#[test]
fn test_guide_is_locked_in_review() {
    let mut fx = fixture();
    start_live(&mut fx.presenter, 90);
    fx.presenter.capture();

    assert!(fx.presenter.toggle_guide(false).is_empty());
    assert!(!fx.presenter.pointer_down(320.0, 240.0, 640.0, 480.0));
    assert_eq!(fx.presenter.config().get_bool(keys::GUIDE_ENABLED), Some(true));

    fx.presenter.discard();
    assert_eq!(
        fx.presenter.toggle_guide(false),
        vec![StateChange::GuideToggled { enabled: false }]
    );
    assert_eq!(fx.presenter.config().get_bool(keys::GUIDE_ENABLED), Some(false));
}

#[test]
fn test_drag_moves_guide_through_config() {
    let mut fx = fixture();

    assert!(fx.presenter.pointer_down(320.0, 240.0, 640.0, 480.0));
    assert!(fx.presenter.pointer_move(160.0, 120.0, 640.0, 480.0));
    fx.presenter.pointer_up();
    assert!(!fx.presenter.pointer_move(0.0, 0.0, 640.0, 480.0));

    let config = fx.presenter.config();
    assert_eq!(config.get_f64(keys::GUIDE_X), Some(0.25));
    assert_eq!(config.get_f64(keys::GUIDE_Y), Some(0.25));
    assert!(config.has_pending_save());
}

#[test]
fn test_save_writes_photo_and_refreshes_count() {
    let mut fx = fixture();
    start_live(&mut fx.presenter, 180);
    fx.presenter.capture();

    let changes = fx.presenter.save();
    assert!(changes.contains(&StateChange::ModeChanged {
        mode: DisplayMode::Live
    }));
    assert!(changes.contains(&StateChange::SavingChanged { is_saving: true }));

    tick_until(&mut fx.presenter, |p| {
        let state = p.state();
        !state.is_saving && state.photo_count == Some(1)
    });

    let state = fx.presenter.state();
    let notice = state.notice.clone().unwrap();
    assert_eq!(notice.title, "Photo Saved!");
    assert!(notice.message.starts_with("Saved to: "));
    assert!(state.can_create_timelapse());

    let saved = std::fs::read_dir(&fx.photos).unwrap().count();
    assert_eq!(saved, 1);

    assert_eq!(
        fx.presenter.dismiss_notice(),
        vec![StateChange::NoticeChanged { notice: None }]
    );
}

#[test]
fn test_today_photo_raises_notice() {
    let mut fx = fixture();
    let record = PhotoRecord::new(chrono::Local::now().naive_local());
    std::fs::write(fx.photos.join(&record.file_name), b"jpeg").unwrap();

    fx.presenter.check_today_photo();
    tick_until(&mut fx.presenter, |p| p.state().notice.is_some());

    assert_eq!(
        fx.presenter.state().notice,
        Some(Notice::new(
            "Photo Already Taken Today",
            format!("You've already taken a photo today: {}", record.file_name)
        ))
    );
}

#[test]
fn test_photo_count_reflects_directory() {
    let mut fx = fixture();
    for name in ["2024-01-01_09-00-00.jpg", "2024-01-02_09-00-00.jpg"] {
        std::fs::write(fx.photos.join(name), b"jpeg").unwrap();
    }

    fx.presenter.refresh_photo_count();
    let changes = tick_until(&mut fx.presenter, |p| p.state().photo_count_known);

    assert!(changes.contains(&StateChange::PhotoCountChanged {
        text: "Found 2 photo(s) in directory".to_string()
    }));
    assert!(changes.contains(&StateChange::CanCreateChanged { can_create: true }));
}

#[test]
fn test_directory_change_creates_and_recounts() {
    let mut fx = fixture();
    let elsewhere = fx.photos.parent().unwrap().join("elsewhere").join("nested");

    let changes = fx.presenter.set_photos_directory(elsewhere.clone());
    assert!(changes.contains(&StateChange::DirectoryChanged {
        directory: elsewhere.clone()
    }));
    assert_eq!(fx.presenter.config().photos_directory(), elsewhere);

    tick_until(&mut fx.presenter, |p| p.state().photo_count_known);

    assert!(elsewhere.is_dir());
    assert_eq!(fx.presenter.state().photo_count, Some(0));
    assert!(!fx.presenter.state().can_create_timelapse());
}

#[test]
fn test_create_without_photos_reports_and_stays_idle() {
    let mut fx = fixture();

    fx.presenter.create_timelapse(0.2);
    // A second click while the directory is being listed is ignored
    assert!(fx.presenter.create_timelapse(0.3).is_empty());

    let changes = tick_until(&mut fx.presenter, |p| !p.state().status_message.is_empty());

    assert!(changes.contains(&StateChange::StatusChanged {
        message: "No photos found!".to_string()
    }));
    assert!(!fx.presenter.state().is_encoding);
    assert_eq!(fx.presenter.state().seconds_per_photo, 0.2);
    assert!(!fx.presenter.orchestrator().is_running());
}

#[test]
fn test_failed_encoder_start_reports_error_and_returns_to_idle() {
    let mut fx = fixture_with(TimelapseService::new(EncoderSettings::with_program(
        "daily-portrait-no-such-encoder",
    )));
    std::fs::write(fx.photos.join("2024-01-01_09-00-00.jpg"), b"jpeg").unwrap();

    fx.presenter.create_timelapse(0.1);
    let changes = tick_until(&mut fx.presenter, |p| {
        p.state().status_message.starts_with("Error:")
    });

    assert!(changes.contains(&StateChange::EncodingChanged { is_encoding: true }));
    assert!(!fx.presenter.state().is_encoding);
    assert!(!fx.presenter.orchestrator().is_running());
    assert!(!fx.photos.join("filelist.txt").exists());
}

#[test]
fn test_seconds_per_photo_snaps_to_slider_steps() {
    let mut fx = fixture();

    fx.presenter.set_seconds_per_photo(0.23);
    assert_eq!(fx.presenter.state().seconds_per_photo, 0.25);
    assert_eq!(
        fx.presenter.config().get_f64(keys::SECONDS_PER_PHOTO),
        Some(0.25)
    );

    fx.presenter.set_seconds_per_photo(2.0);
    assert_eq!(fx.presenter.state().seconds_per_photo, 0.5);

    fx.presenter.set_seconds_per_photo(0.0);
    assert_eq!(fx.presenter.state().seconds_per_photo, 0.05);
}

#[test]
fn test_live_tick_without_new_frame_keeps_previous_surface() {
    let mut fx = fixture();
    let camera = OneFrameCamera { delivered: false };
    fx.presenter.start_camera(move || Ok(Box::new(camera) as Box<dyn CameraDevice>));
    tick_until(&mut fx.presenter, |p| p.current_frame().is_some());
    let first = fx.presenter.render(64, 48).unwrap();
    let regenerations = fx.presenter.render_cache().regenerations();

    // The channel stays empty from here on
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(20));
        fx.presenter.tick();
    }

    assert_eq!(fx.presenter.mode(), DisplayMode::Live);
    assert_eq!(fx.presenter.current_frame().unwrap().sequence(), 1);
    let again = fx.presenter.render(64, 48).unwrap();
    assert_eq!(again, first);
    assert_eq!(again.get_pixel(32, 24).0, [150, 150, 150]);
    assert_eq!(fx.presenter.render_cache().regenerations(), regenerations);
    assert!(fx.presenter.capture_stats().unwrap().read_failures() > 0);
}

#[test]
fn test_render_cache_reused_between_ticks() {
    let mut fx = fixture();
    start_live(&mut fx.presenter, 60);
    fx.presenter.capture();

    fx.presenter.render(100, 100).unwrap();
    let after_first = fx.presenter.render_cache().regenerations();
    fx.presenter.tick();
    fx.presenter.render(100, 100).unwrap();

    assert_eq!(fx.presenter.render_cache().regenerations(), after_first);

    fx.presenter.render(200, 100).unwrap();
    assert_eq!(fx.presenter.render_cache().regenerations(), after_first + 1);
}

#[test]
fn test_shutdown_flushes_settings_and_stops_camera() {
    let mut fx = fixture();
    start_live(&mut fx.presenter, 90);
    fx.presenter.toggle_guide(false);
    assert!(fx.presenter.config().has_pending_save());

    fx.presenter.shutdown();

    assert!(!fx.presenter.config().has_pending_save());
    assert!(fx.presenter.capture_stats().is_none());
    let config_file = fx.photos.parent().unwrap().join("config.json");
    let document = std::fs::read_to_string(config_file).unwrap();
    assert!(document.contains("\"guide_enabled\": false"));
    assert_eq!(fx.presenter.state().camera, CameraStatus::Live);
}
