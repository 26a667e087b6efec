use crate::config::ConfigStore;
use crate::models::keys;

/// Drag state of the guide overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

/// Pointer interaction with the face guide.
///
/// Positions are surface pixels; the guide itself is stored normalized in the
/// [`ConfigStore`], which is the only place the region lives. Every change is
/// written through immediately and the store debounces the disk write.
#[derive(Debug, Default)]
pub struct GuideOverlay {
    state: DragState,
}

impl GuideOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    /// Start dragging if the pointer is inside an enabled guide.
    ///
    /// Returns true when a drag began.
    pub fn pointer_down(
        &mut self,
        config: &ConfigStore,
        px: f64,
        py: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> bool {
        let region = config.guide_region();
        if !region.enabled || surface_width <= 0.0 || surface_height <= 0.0 {
            return false;
        }

        if region.contains(px, py, surface_width, surface_height) {
            tracing::debug!("Guide drag started at ({:.0}, {:.0})", px, py);
            self.state = DragState::Dragging;
            true
        } else {
            false
        }
    }

    /// Move the guide centre to the pointer while dragging.
    ///
    /// The centre is not clamped; the guide may sit partly off-surface.
    pub fn pointer_move(
        &mut self,
        config: &mut ConfigStore,
        px: f64,
        py: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> bool {
        if self.state != DragState::Dragging || surface_width <= 0.0 || surface_height <= 0.0 {
            return false;
        }

        config.set(keys::GUIDE_X, px / surface_width);
        config.set(keys::GUIDE_Y, py / surface_height);
        true
    }

    pub fn pointer_up(&mut self) {
        if self.state == DragState::Dragging {
            tracing::debug!("Guide drag ended");
        }
        self.state = DragState::Idle;
    }

    /// Show or hide the guide; independent of the drag state.
    pub fn set_enabled(&mut self, config: &mut ConfigStore, enabled: bool) {
        config.set(keys::GUIDE_ENABLED, enabled);
        if !enabled {
            self.state = DragState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ConfigWriter};
    use crate::models::default_entries;
    use camino::Utf8Path;
    use std::sync::Arc;
    use std::time::Duration;

    struct NullWriter;

    impl ConfigWriter for NullWriter {
        fn write(&self, _document: &str) -> Result<(), ConfigError> {
            Ok(())
        }
    }

    fn store(rt: &tokio::runtime::Runtime) -> ConfigStore {
        ConfigStore::with_writer(
            default_entries(Utf8Path::new("/p")),
            Arc::new(NullWriter),
            rt.handle().clone(),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_drag_moves_center() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut config = store(&rt);
        let mut overlay = GuideOverlay::new();

        assert!(overlay.pointer_down(&config, 320.0, 240.0, 640.0, 480.0));
        assert!(overlay.pointer_move(&mut config, 160.0, 120.0, 640.0, 480.0));
        overlay.pointer_up();

        let region = config.guide_region();
        assert_eq!(overlay.state(), DragState::Idle);
        assert!((region.center_x - 0.25).abs() < 1e-9);
        assert!((region.center_y - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_press_outside_does_not_drag() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut config = store(&rt);
        let mut overlay = GuideOverlay::new();

        assert!(!overlay.pointer_down(&config, 5.0, 5.0, 640.0, 480.0));
        assert!(!overlay.pointer_move(&mut config, 100.0, 100.0, 640.0, 480.0));
        assert_eq!(config.guide_region().center_x, 0.5);
    }

    #[test]
    fn test_disabled_guide_ignores_press() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut config = store(&rt);
        let mut overlay = GuideOverlay::new();

        overlay.set_enabled(&mut config, false);

        assert!(!config.guide_region().enabled);
        assert!(!overlay.pointer_down(&config, 320.0, 240.0, 640.0, 480.0));
    }

    #[test]
    fn test_move_off_surface_not_clamped() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut config = store(&rt);
        let mut overlay = GuideOverlay::new();

        overlay.pointer_down(&config, 320.0, 240.0, 640.0, 480.0);
        overlay.pointer_move(&mut config, 700.0, -48.0, 640.0, 480.0);

        let region = config.guide_region();
        assert!(region.center_x > 1.0);
        assert!(region.center_y < 0.0);
    }

    #[test]
    fn test_zero_surface_never_moves() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut config = store(&rt);
        let mut overlay = GuideOverlay::new();

        assert!(!overlay.pointer_down(&config, 0.0, 0.0, 0.0, 0.0));
        assert!(!overlay.pointer_move(&mut config, 10.0, 10.0, 0.0, 0.0));
    }
}
