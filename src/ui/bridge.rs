// EventLoopBridge - Carries worker results from tokio onto the presentation context
//
// Workers never touch presentation state. They post a message through a
// EventLoopBridgeHandle; the presentation context drains the queue once per
// tick and applies each message itself.

use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Receiving end, owned by the presentation context.
///
/// # Example
/// ```ignore
/// let mut bridge = EventLoopBridge::<AppEvent>::new(runtime.handle().clone());
/// let handle = bridge.clone_handle();
///
/// handle.spawn_blocking(move || count_photos(&dir), |count| AppEvent::PhotosCounted(count));
///
/// // Once per tick
/// for event in bridge.drain() {
///     presenter.apply(event);
/// }
/// ```
pub struct EventLoopBridge<M> {
    tokio_handle: Handle,
    tx: mpsc::UnboundedSender<M>,
    rx: mpsc::UnboundedReceiver<M>,
}

impl<M: Send + 'static> EventLoopBridge<M> {
    pub fn new(tokio_handle: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tokio_handle,
            tx,
            rx,
        }
    }

    /// Every message posted since the last drain, in posting order.
    ///
    /// Never blocks.
    pub fn drain(&mut self) -> Vec<M> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Cloneable sender half for workers and callbacks.
    pub fn clone_handle(&self) -> EventLoopBridgeHandle<M> {
        EventLoopBridgeHandle {
            tokio_handle: self.tokio_handle.clone(),
            tx: self.tx.clone(),
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.tokio_handle
    }
}

/// Lightweight handle that can be cloned into workers and callbacks.
pub struct EventLoopBridgeHandle<M> {
    tokio_handle: Handle,
    tx: mpsc::UnboundedSender<M>,
}

// Manual Clone implementation to avoid requiring M: Clone
impl<M> Clone for EventLoopBridgeHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tokio_handle: self.tokio_handle.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<M: Send + 'static> EventLoopBridgeHandle<M> {
    /// Queue a message for the presentation context.
    pub fn post(&self, message: M) {
        if self.tx.send(message).is_err() {
            tracing::warn!("Failed to post message - presentation context has stopped");
        }
    }

    /// Run a future on tokio and post its result.
    pub fn spawn_async<Fut>(&self, future: Fut)
    where
        Fut: Future<Output = M> + Send + 'static,
    {
        let handle = self.clone();
        self.tokio_handle.spawn(async move {
            let message = future.await;
            handle.post(message);
        });
    }

    /// Run blocking work on the tokio blocking pool and post `into_message(result)`.
    pub fn spawn_blocking<T, W, C>(&self, work: W, into_message: C)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) -> M + Send + 'static,
    {
        let handle = self.clone();
        self.tokio_handle.spawn(async move {
            match tokio::task::spawn_blocking(work).await {
                Ok(result) => handle.post(into_message(result)),
                Err(e) => tracing::error!("Background task failed: {}", e),
            }
        });
    }

    pub fn runtime(&self) -> &Handle {
        &self.tokio_handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_until<M: Send + 'static>(bridge: &mut EventLoopBridge<M>, count: usize) -> Vec<M> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut received = Vec::new();
        while received.len() < count && Instant::now() < deadline {
            received.extend(bridge.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        received
    }

    #[test]
    fn test_post_and_drain_in_order() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut bridge = EventLoopBridge::new(rt.handle().clone());
        let handle = bridge.clone_handle();

        handle.post(1);
        handle.post(2);
        handle.clone().post(3);

        assert_eq!(bridge.drain(), vec![1, 2, 3]);
        assert!(bridge.drain().is_empty());
    }

    #[test]
    fn test_spawn_blocking_posts_result() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut bridge = EventLoopBridge::new(rt.handle().clone());

        bridge
            .clone_handle()
            .spawn_blocking(|| 6 * 7, |value| format!("answer {}", value));

        assert_eq!(drain_until(&mut bridge, 1), vec!["answer 42".to_string()]);
    }

    #[test]
    fn test_spawn_async_posts_result() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut bridge = EventLoopBridge::new(rt.handle().clone());

        bridge.clone_handle().spawn_async(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "done"
        });

        assert_eq!(drain_until(&mut bridge, 1), vec!["done"]);
        rt.shutdown_timeout(Duration::from_secs(1));
    }
}
