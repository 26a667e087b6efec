// Capture pipeline - camera frames from a dedicated worker thread
//
// The worker owns the camera device for its whole lifetime. Frames cross to the
// presentation context only through the bounded latest-frame channel.

pub mod channel;
pub mod convert;
#[cfg(target_os = "linux")]
pub mod v4l;

pub use channel::{FRAME_CHANNEL_CAPACITY, FrameReceiver, FrameSender, Offer, latest_frame_channel};

use crate::models::{Frame, RawFrame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Pause after a failed read before trying again.
pub const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Longest a single device read may wait for a frame.
///
/// A read that times out is a transient failure, so `stop()` is never held
/// up for longer than this plus [`READ_RETRY_DELAY`].
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Camera read failed: {0}")]
    DeviceReadTransient(String),

    #[error("Frame conversion failed: {0}")]
    Conversion(String),
}

/// A source of raw camera frames.
///
/// `read_frame` may block for up to [`READ_TIMEOUT`]. Implementations are
/// moved onto the capture worker and only ever touched from there.
#[cfg_attr(test, mockall::automock)]
pub trait CameraDevice: Send {
    fn read_frame(&mut self) -> Result<RawFrame, CaptureError>;
}

/// Open the platform's default camera.
#[cfg(target_os = "linux")]
pub fn open_default_camera() -> Result<Box<dyn CameraDevice>, CaptureError> {
    let camera = v4l::V4lCamera::open(v4l::DEFAULT_DEVICE_PATH)?;
    Ok(Box::new(camera))
}

/// Open the platform's default camera.
#[cfg(not(target_os = "linux"))]
pub fn open_default_camera() -> Result<Box<dyn CameraDevice>, CaptureError> {
    Err(CaptureError::DeviceUnavailable(
        "no camera backend for this platform".to_string(),
    ))
}

/// Lock-free counters updated by the capture worker.
#[derive(Debug, Default)]
pub struct CaptureStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
    read_failures: AtomicU64,
}

impl CaptureStats {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn read_failures(&self) -> u64 {
        self.read_failures.load(Ordering::Relaxed)
    }
}

type WorkerHandle = JoinHandle<Option<Box<dyn CameraDevice>>>;

/// Background camera capture with a freshest-frame consumer API.
pub struct CapturePipeline {
    receiver: FrameReceiver,
    running: Arc<AtomicBool>,
    worker: Option<WorkerHandle>,
    stats: Arc<CaptureStats>,
}

impl CapturePipeline {
    /// Spawn the capture worker and open the camera on it.
    ///
    /// Blocks until `open` has returned. If it fails the worker has already
    /// exited and `DeviceUnavailable` is returned; no frames are produced.
    pub fn start<F>(open: F) -> Result<Self, CaptureError>
    where
        F: FnOnce() -> Result<Box<dyn CameraDevice>, CaptureError> + Send + 'static,
    {
        let (sender, receiver) = latest_frame_channel();
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(CaptureStats::default());
        let (opened_tx, opened_rx) = mpsc::sync_channel(1);

        let worker = {
            let running = Arc::clone(&running);
            let stats = Arc::clone(&stats);
            thread::Builder::new()
                .name("capture".to_string())
                .spawn(move || {
                    let device = match open() {
                        Ok(device) => {
                            let _ = opened_tx.send(Ok(()));
                            device
                        }
                        Err(e) => {
                            let _ = opened_tx.send(Err(e));
                            return None;
                        }
                    };
                    Some(capture_loop(device, &sender, &running, &stats))
                })
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        };

        let opened = opened_rx.recv().unwrap_or_else(|_| {
            Err(CaptureError::DeviceUnavailable(
                "capture worker exited during open".to_string(),
            ))
        });

        if let Err(e) = opened {
            let _ = worker.join();
            tracing::warn!("{}", e);
            return Err(match e {
                CaptureError::DeviceUnavailable(_) => e,
                other => CaptureError::DeviceUnavailable(other.to_string()),
            });
        }

        tracing::info!("Capture pipeline started");
        Ok(Self {
            receiver,
            running,
            worker: Some(worker),
            stats,
        })
    }

    /// Newest frame produced since the last call, discarding any backlog.
    ///
    /// Never blocks.
    pub fn get_latest_frame(&mut self) -> Option<Frame> {
        self.receiver.drain_latest()
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the worker, wait for it, then release the device.
    ///
    /// Latency is bounded by one device read. Calling it again is a no-op.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.running.store(false, Ordering::Release);

        match worker.join() {
            Ok(device) => {
                drop(device);
                tracing::info!(
                    accepted = self.stats.accepted(),
                    dropped = self.stats.dropped(),
                    read_failures = self.stats.read_failures(),
                    "Capture pipeline stopped, camera released"
                );
            }
            Err(_) => tracing::error!("Capture worker panicked"),
        }
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("running", &self.is_running())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Read, convert and offer frames until `running` is cleared.
///
/// Hands the device back so the caller controls when it is released.
fn capture_loop(
    mut device: Box<dyn CameraDevice>,
    sender: &FrameSender,
    running: &AtomicBool,
    stats: &CaptureStats,
) -> Box<dyn CameraDevice> {
    let mut sequence = 0u64;

    while running.load(Ordering::Acquire) {
        let frame = device
            .read_frame()
            .and_then(|raw| convert::to_canonical(&raw, sequence + 1));

        match frame {
            Ok(frame) => {
                sequence += 1;
                match sender.offer(frame) {
                    Offer::Accepted => {
                        stats.accepted.fetch_add(1, Ordering::Relaxed);
                    }
                    Offer::Dropped => {
                        let dropped = stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        if dropped % 100 == 0 {
                            tracing::debug!(dropped, "Frames dropped (consumer behind)");
                        }
                    }
                    Offer::Closed => {
                        tracing::debug!("Frame consumer gone, stopping capture");
                        break;
                    }
                }
            }
            Err(e) => {
                let failures = stats.read_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if failures % 100 == 1 {
                    tracing::warn!(failures, "{}", e);
                }
                thread::sleep(READ_RETRY_DELAY);
            }
        }
    }

    device
}
