// Daily Portrait - one portrait a day, assembled into a timelapse
//
// This is the library crate containing the capture pipeline, rendering,
// settings store and timelapse orchestration. The binary crate (main.rs)
// provides the GUI entry point.

pub mod capture;
pub mod cli;
pub mod config;
pub mod guide;
pub mod logging;
pub mod models;
pub mod render;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use capture::{CameraDevice, CaptureError, CapturePipeline};
pub use config::{AppPaths, ConfigError, ConfigStore};
pub use models::{AppState, EncodeJob, EncodeOutcome, Frame, GuideRegion};
pub use services::{TimelapseOrchestrator, TimelapseService};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
