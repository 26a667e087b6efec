//! Data models for the Daily Portrait application.
//!
//! - [`Frame`] / [`RawFrame`]: camera samples before and after color conversion
//! - [`GuideRegion`]: the normalized face-guide ellipse
//! - [`ConfigValue`] and [`default_entries`]: the persisted key/value set
//! - [`PhotoRecord`]: naming rules for daily photos
//! - [`EncodeJob`], [`EncodeOutcome`], [`EncodeState`]: the timelapse job lifecycle
//! - [`AppState`]: presentation-owned state

pub mod app_state;
pub mod config;
pub mod encode;
pub mod frame;
pub mod guide;
pub mod photo;

pub use app_state::{AppState, CameraStatus, DisplayMode, Notice, PRESENTATION_TICK_MS};
pub use config::{ConfigValue, default_entries, keys};
pub use encode::{EncodeJob, EncodeOutcome, EncodeState, timelapse_output_path};
pub use frame::{ColorLayout, DeviceLayout, Frame, RawFrame};
pub use guide::{EllipseGeometry, GuideRegion};
pub use photo::PhotoRecord;
