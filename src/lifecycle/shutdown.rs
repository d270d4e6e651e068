//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;

/// Latched stop signal shared by every long-running task. Once triggered it
/// stays triggered, so a task that subscribes late still stops.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

/// Receiving half handed to each task.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        let receivers = self.tx.receiver_count();
        self.tx.send_replace(true);
        tracing::info!(receivers, "Shutdown triggered");
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `trigger` has been called, including before this call.
    /// Usable as an axum graceful shutdown future.
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut signal = self.subscribe();
        async move { signal.recv().await }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolves once shutdown has been triggered or every `Shutdown` handle
    /// is gone. Cancel safe.
    pub async fn recv(&mut self) {
        loop {
            let stopped = *self.rx.borrow_and_update();
            if stopped {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}
