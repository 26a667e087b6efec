/// Face guide ellipse, normalized to the render surface.
///
/// `center_*` are fractions of the surface size and the radii are fractions of
/// the surface width/height, so the guide keeps its place when the window is
/// resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideRegion {
    pub center_x: f64,
    pub center_y: f64,
    pub half_width: f64,
    pub half_height: f64,
    pub enabled: bool,
}

/// A guide ellipse expressed in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipseGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl Default for GuideRegion {
    fn default() -> Self {
        Self {
            center_x: 0.5,
            center_y: 0.5,
            half_width: 0.15,
            half_height: 0.2,
            enabled: true,
        }
    }
}

impl GuideRegion {
    /// Map the normalized ellipse onto a `surface_width` x `surface_height` surface.
    pub fn to_surface(&self, surface_width: f64, surface_height: f64) -> EllipseGeometry {
        EllipseGeometry {
            center_x: self.center_x * surface_width,
            center_y: self.center_y * surface_height,
            radius_x: self.half_width * surface_width,
            radius_y: self.half_height * surface_height,
        }
    }

    /// Whether the pointer at (`px`, `py`) surface pixels lies inside the ellipse.
    pub fn contains(&self, px: f64, py: f64, surface_width: f64, surface_height: f64) -> bool {
        self.to_surface(surface_width, surface_height).contains(px, py)
    }
}

impl EllipseGeometry {
    /// Inside iff `((px-cx)/rx)^2 + ((py-cy)/ry)^2 <= 1`; degenerate radii never hit.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        if self.radius_x <= 0.0 || self.radius_y <= 0.0 {
            return false;
        }
        let dx = (px - self.center_x) / self.radius_x;
        let dy = (py - self.center_y) / self.radius_y;
        dx * dx + dy * dy <= 1.0
    }
}
