use std::sync::Arc;

/// Pixel layout of a [`Frame`].
///
/// Every frame handed to the presentation context is in the canonical layout;
/// device-specific layouts only exist on [`RawFrame`] inside the capture worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayout {
    /// 8-bit R, G, B triplets
    Rgb,
}

impl ColorLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorLayout::Rgb => 3,
        }
    }
}

/// One decoded image sample from the camera.
///
/// The pixel buffer is shared and immutable: cloning a `Frame` (for example when
/// freezing it for review) never copies pixels and nothing can mutate them after
/// the capture worker created the frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pixels: Arc<[u8]>,
    width: u32,
    height: u32,
    stride: usize,
    color_layout: ColorLayout,
    sequence: u64,
}

impl Frame {
    /// Build an RGB frame from tightly packed pixels.
    ///
    /// Returns `None` if the buffer is shorter than `width * height * 3`.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Option<Self> {
        let stride = width as usize * ColorLayout::Rgb.bytes_per_pixel();
        Self::with_stride(pixels, width, height, stride, sequence)
    }

    /// Build an RGB frame whose rows are `stride` bytes apart.
    pub fn with_stride(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        sequence: u64,
    ) -> Option<Self> {
        let row_bytes = width as usize * ColorLayout::Rgb.bytes_per_pixel();
        if width == 0 || height == 0 || stride < row_bytes {
            return None;
        }
        if pixels.len() < stride * (height as usize - 1) + row_bytes {
            return None;
        }

        Some(Self {
            pixels: Arc::from(pixels),
            width,
            height,
            stride,
            color_layout: ColorLayout::Rgb,
            sequence,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn color_layout(&self) -> ColorLayout {
        self.color_layout
    }

    /// Capture-worker sequence number; gaps mean frames were dropped.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Pixels with any row padding removed.
    pub fn packed_pixels(&self) -> Vec<u8> {
        let row_bytes = self.width as usize * self.color_layout.bytes_per_pixel();
        if self.stride == row_bytes {
            return self.pixels[..row_bytes * self.height as usize].to_vec();
        }

        let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
        for row in self.pixels.chunks(self.stride).take(self.height as usize) {
            packed.extend_from_slice(&row[..row_bytes]);
        }
        packed
    }

    /// Convert to an owned `image` buffer for scaling or encoding.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.packed_pixels())
    }
}

/// Device pixel layouts the capture worker knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLayout {
    Rgb24,
    Bgr24,
    /// Packed YUV 4:2:2 (Y0 U Y1 V)
    Yuyv,
    /// One JPEG image per buffer
    Mjpeg,
}

/// A frame exactly as the device delivered it.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: DeviceLayout,
}
