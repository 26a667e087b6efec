use super::{CameraDevice, CaptureError, READ_TIMEOUT};
use crate::models::{DeviceLayout, RawFrame};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

pub const DEFAULT_DEVICE_PATH: &str = "/dev/video0";
const PREFERRED_WIDTH: u32 = 640;
const PREFERRED_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;

/// A V4L2 capture device streaming through memory-mapped buffers.
pub struct V4lCamera {
    // Declared before `device` so the stream is torn down first
    stream: MmapStream<'static>,
    _device: Device,
    width: u32,
    height: u32,
    layout: DeviceLayout,
}

impl V4lCamera {
    /// Open `path`, asking for 640x480 MJPEG and accepting whatever the
    /// device settles on if it is a layout we can convert.
    pub fn open(path: &str) -> Result<Self, CaptureError> {
        let unavailable =
            |reason: String| CaptureError::DeviceUnavailable(format!("{}: {}", path, reason));

        let device = Device::with_path(path).map_err(|e| unavailable(e.to_string()))?;

        let requested = Format::new(PREFERRED_WIDTH, PREFERRED_HEIGHT, FourCC::new(b"MJPG"));
        let format = match device.set_format(&requested) {
            Ok(format) => format,
            Err(e) => {
                tracing::warn!(error = %e, "Could not set MJPEG format, using device default");
                device.format().map_err(|e| unavailable(e.to_string()))?
            }
        };

        let layout = layout_for(format.fourcc).ok_or_else(|| {
            unavailable(format!("unsupported pixel format {}", format.fourcc))
        })?;

        let mut stream = MmapStream::with_buffers(&device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| unavailable(format!("failed to create buffer stream: {}", e)))?;
        // Without a timeout a stalled camera blocks the worker forever
        stream.set_timeout(READ_TIMEOUT);

        tracing::info!(
            path,
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "Camera opened"
        );

        Ok(Self {
            stream,
            _device: device,
            width: format.width,
            height: format.height,
            layout,
        })
    }
}

fn layout_for(fourcc: FourCC) -> Option<DeviceLayout> {
    match &fourcc.repr {
        b"MJPG" => Some(DeviceLayout::Mjpeg),
        b"YUYV" => Some(DeviceLayout::Yuyv),
        b"RGB3" => Some(DeviceLayout::Rgb24),
        b"BGR3" => Some(DeviceLayout::Bgr24),
        _ => None,
    }
}

impl CameraDevice for V4lCamera {
    fn read_frame(&mut self) -> Result<RawFrame, CaptureError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CaptureError::DeviceReadTransient(e.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used > 0 { &buf[..used] } else { buf };

        Ok(RawFrame {
            data: data.to_vec(),
            width: self.width,
            height: self.height,
            layout: self.layout,
        })
    }
}
