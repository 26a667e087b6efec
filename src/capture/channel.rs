use crate::models::Frame;
use tokio::sync::mpsc;

/// Capacity of the hand-off between the capture worker and the presenter.
pub const FRAME_CHANNEL_CAPACITY: usize = 2;

/// Create the bounded latest-frame channel.
pub fn latest_frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    (FrameSender { tx }, FrameReceiver { rx })
}

/// Producer half, owned by the capture worker.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<Frame>,
}

/// Result of offering a frame to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// Channel full; the offered frame was discarded
    Dropped,
    /// Consumer is gone
    Closed,
}

impl FrameSender {
    /// Push without blocking. A full channel drops the new frame.
    pub fn offer(&self, frame: Frame) -> Offer {
        match self.tx.try_send(frame) {
            Ok(()) => Offer::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => Offer::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }
}

/// Consumer half, owned by the presentation context.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<Frame>,
}

impl FrameReceiver {
    /// Drain everything queued and keep only the newest frame.
    pub fn drain_latest(&mut self) -> Option<Frame> {
        let mut latest = None;
        while let Ok(frame) = self.rx.try_recv() {
            latest = Some(frame);
        }
        latest
    }
}
