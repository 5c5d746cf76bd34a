//! Shutdown coordination between the signal handler and the accept loops.

use tokio::sync::broadcast;

/// Shutdown signal held by one accept loop.
///
/// Each signal subscribes when created, so a shutdown triggered before
/// [`ShutdownSignal::recv`] is first polled is not missed.
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    /// Wait for the shutdown signal.
    pub async fn recv(&mut self) {
        // Closed (coordinator dropped) also means shut down.
        let _ = self.receiver.recv().await;
    }
}

/// Shutdown coordinator that can send shutdown signals.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Get a signal receiver.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Trigger shutdown.
    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
