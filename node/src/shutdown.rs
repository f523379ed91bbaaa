//! Graceful shutdown for the Agora node.
//!
//! A `tokio::sync::watch` channel carries a single "stopping" flag. Late
//! subscribers still observe a shutdown that already happened.

use tokio::signal;
use tokio::sync::watch;

/// Coordinates graceful shutdown across the node's tasks.
///
/// Tasks hold a [`ShutdownSignal`] and `select!` on [`ShutdownSignal::wait`]
/// alongside their main loop.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// Receiving half handed to each task.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolves once shutdown has been requested, or the controller is gone.
    pub async fn wait(&mut self) {
        // An error means the controller was dropped; treat it as shutdown.
        let _ = self.rx.wait_for(|stopping| *stopping).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}
