//! Services module - file system and external process work.
//!
//! Nothing here touches the GUI. Blocking functions are meant for the tokio
//! blocking pool and async ones for worker tasks; results go back to the
//! presentation context through the [`EventLoopBridge`](crate::ui::EventLoopBridge).
//!
//! - [`photos`]: saving, listing and counting daily photos
//! - [`timelapse`]: render script construction and the encoder orchestrator
//! - [`encoder_probe`]: the startup check for the encoder binary

pub mod encoder_probe;
pub mod photos;
pub mod timelapse;

pub use encoder_probe::{ENCODER_PROGRAM, EncoderProbe, PROBE_TIMEOUT, probe_encoder};
pub use photos::{PhotoError, count_photos, find_photo_for_day, list_photos, save_photo};
pub use timelapse::{
    EncoderSettings, RenderScript, ScriptEntry, TimelapseError, TimelapseOrchestrator,
    TimelapseService, build_render_script,
};
