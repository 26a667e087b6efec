use super::CaptureError;
use crate::models::{DeviceLayout, Frame, RawFrame};

/// Convert a device frame to the canonical RGB layout.
pub fn to_canonical(raw: &RawFrame, sequence: u64) -> Result<Frame, CaptureError> {
    let rgb = match raw.layout {
        DeviceLayout::Rgb24 => {
            expect_len(raw, 3)?;
            raw.data[..pixel_count(raw) * 3].to_vec()
        }
        DeviceLayout::Bgr24 => {
            expect_len(raw, 3)?;
            bgr_to_rgb(&raw.data[..pixel_count(raw) * 3])
        }
        DeviceLayout::Yuyv => {
            expect_len(raw, 2)?;
            yuyv_to_rgb(&raw.data, raw.width, raw.height)
        }
        DeviceLayout::Mjpeg => return decode_jpeg(raw, sequence),
    };

    Frame::from_rgb(rgb, raw.width, raw.height, sequence).ok_or_else(|| {
        CaptureError::Conversion(format!("empty {}x{} frame", raw.width, raw.height))
    })
}

fn pixel_count(raw: &RawFrame) -> usize {
    raw.width as usize * raw.height as usize
}

fn expect_len(raw: &RawFrame, bytes_per_pixel: usize) -> Result<(), CaptureError> {
    let expected = pixel_count(raw) * bytes_per_pixel;
    if raw.data.len() < expected {
        return Err(CaptureError::Conversion(format!(
            "{:?} buffer too short: {} < {}",
            raw.layout,
            raw.data.len(),
            expected
        )));
    }
    Ok(())
}

fn bgr_to_rgb(data: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(data.len());
    for px in data.chunks_exact(3) {
        rgb.extend_from_slice(&[px[2], px[1], px[0]]);
    }
    rgb
}

/// Packed YUYV (Y0 U Y1 V, two pixels share chroma) to RGB.
fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixels = width as usize * height as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);

    for quad in data[..pixels * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
        let (r, g, b) = yuv_to_rgb(y0, u, v);
        rgb.extend_from_slice(&[r, g, b]);
        let (r, g, b) = yuv_to_rgb(y1, u, v);
        rgb.extend_from_slice(&[r, g, b]);
    }
    rgb
}

/// BT.601 full-range YUV to RGB.
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
}

fn decode_jpeg(raw: &RawFrame, sequence: u64) -> Result<Frame, CaptureError> {
    let decoded = image::load_from_memory_with_format(&raw.data, image::ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Conversion(format!("MJPEG decode failed: {}", e)))?
        .to_rgb8();

    let (width, height) = decoded.dimensions();
    Frame::from_rgb(decoded.into_raw(), width, height, sequence)
        .ok_or_else(|| CaptureError::Conversion("empty MJPEG frame".to_string()))
}
