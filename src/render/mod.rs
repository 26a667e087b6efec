// Render path - scale frames onto the preview surface and stroke the guide
//
// Everything here is synchronous and toolkit-independent. The presenter calls
// `compose_surface` once per tick with the frame it wants on screen.

use crate::models::{EllipseGeometry, Frame, GuideRegion};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Stroke width of the guide outline in pixels.
pub const GUIDE_STROKE_WIDTH: f64 = 2.0;

/// Opacity of the guide outline over the preview.
pub const GUIDE_OPACITY: f32 = 0.5;

const GUIDE_COLOR: [u8; 3] = [255, 255, 255];

/// Largest size with the source aspect ratio that fits the target.
///
/// `scale = min(tw/sw, th/sh)`, truncated to whole pixels. Returns `None`
/// when either side is empty.
pub fn fit_within(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> Option<(u32, u32)> {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return None;
    }

    let scale = f64::min(
        target_width as f64 / source_width as f64,
        target_height as f64 / source_height as f64,
    );
    let width = ((source_width as f64 * scale) as u32).clamp(1, target_width);
    let height = ((source_height as f64 * scale) as u32).clamp(1, target_height);
    Some((width, height))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    source: (u32, u32),
    target: (u32, u32),
    sequence: u64,
}

/// Holds the last scaled frame and reuses it while nothing changed.
///
/// The key is the source and target dimensions plus the frame sequence, so a
/// new frame of the same size still regenerates while repeated ticks on the
/// same frame do not.
#[derive(Debug, Default)]
pub struct ScaledSurfaceCache {
    key: Option<CacheKey>,
    scaled: Option<RgbImage>,
    regenerations: u64,
}

impl ScaledSurfaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The frame scaled to fit `target_width` x `target_height`.
    pub fn scaled(
        &mut self,
        frame: &Frame,
        target_width: u32,
        target_height: u32,
    ) -> Option<&RgbImage> {
        let (width, height) =
            fit_within(frame.width(), frame.height(), target_width, target_height)?;

        let key = CacheKey {
            source: (frame.width(), frame.height()),
            target: (target_width, target_height),
            sequence: frame.sequence(),
        };

        if self.key != Some(key) || self.scaled.is_none() {
            let source = frame.to_rgb_image()?;
            let scaled = if (width, height) == source.dimensions() {
                source
            } else {
                imageops::resize(&source, width, height, FilterType::Triangle)
            };
            self.scaled = Some(scaled);
            self.key = Some(key);
            self.regenerations += 1;
        }

        self.scaled.as_ref()
    }

    /// Number of times the scaled surface was rebuilt.
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }
}

/// Build the full preview surface: black background, the frame centred and
/// scaled to fit, and the guide outline when `guide` is given and enabled.
pub fn compose_surface(
    cache: &mut ScaledSurfaceCache,
    frame: &Frame,
    surface_width: u32,
    surface_height: u32,
    guide: Option<&GuideRegion>,
) -> Option<RgbImage> {
    let scaled = cache.scaled(frame, surface_width, surface_height)?;

    let mut surface = RgbImage::new(surface_width, surface_height);
    let offset_x = (surface_width - scaled.width()) / 2;
    let offset_y = (surface_height - scaled.height()) / 2;
    imageops::replace(&mut surface, scaled, offset_x as i64, offset_y as i64);

    if let Some(region) = guide.filter(|region| region.enabled) {
        let ellipse = region.to_surface(surface_width as f64, surface_height as f64);
        stroke_ellipse(&mut surface, &ellipse, GUIDE_STROKE_WIDTH, GUIDE_COLOR, GUIDE_OPACITY);
    }

    Some(surface)
}

/// Blend an ellipse outline of roughly `width` pixels onto `surface`.
///
/// Distance to the outline is approximated as `|f| / |grad f|` for the
/// implicit ellipse `f = (dx/rx)^2 + (dy/ry)^2 - 1`.
pub fn stroke_ellipse(
    surface: &mut RgbImage,
    ellipse: &EllipseGeometry,
    width: f64,
    color: [u8; 3],
    opacity: f32,
) {
    let (rx, ry) = (ellipse.radius_x, ellipse.radius_y);
    if rx <= 0.0 || ry <= 0.0 || surface.width() == 0 || surface.height() == 0 {
        return;
    }

    let half = width / 2.0;
    let max_x = surface.width() as f64 - 1.0;
    let max_y = surface.height() as f64 - 1.0;
    let x0 = (ellipse.center_x - rx - width).floor().clamp(0.0, max_x) as u32;
    let x1 = (ellipse.center_x + rx + width).ceil().clamp(0.0, max_x) as u32;
    let y0 = (ellipse.center_y - ry - width).floor().clamp(0.0, max_y) as u32;
    let y1 = (ellipse.center_y + ry + width).ceil().clamp(0.0, max_y) as u32;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - ellipse.center_x;
            let dy = y as f64 + 0.5 - ellipse.center_y;
            let f = (dx / rx).powi(2) + (dy / ry).powi(2) - 1.0;
            let gx = 2.0 * dx / (rx * rx);
            let gy = 2.0 * dy / (ry * ry);
            let gradient = (gx * gx + gy * gy).sqrt();
            if gradient == 0.0 || f.abs() / gradient > half {
                continue;
            }

            let pixel = surface.get_pixel_mut(x, y);
            *pixel = blend(*pixel, color, opacity);
        }
    }
}

fn blend(under: Rgb<u8>, over: [u8; 3], opacity: f32) -> Rgb<u8> {
    let mix = |a: u8, b: u8| (a as f32 * (1.0 - opacity) + b as f32 * opacity).round() as u8;
    Rgb([
        mix(under[0], over[0]),
        mix(under[1], over[1]),
        mix(under[2], over[2]),
    ])
}
