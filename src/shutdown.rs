// Stop signal shared by the control loops
//
// A watch channel carrying "stop requested". Loops select on `wait()` every
// tick / read so Ctrl-C or an operator quit ends them gracefully.

use tokio::sync::watch;
use tracing::{info, warn};

/// Sending half: flips the flag once
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, checked by the loops
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Resolves once a stop was requested. Never resolves if every
    /// StopHandle is gone without stopping.
    pub async fn wait(&mut self) {
        if self.rx.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn channel() -> (StopHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, Shutdown { rx })
}

/// Stop signal that fires on Ctrl-C
pub fn on_ctrl_c() -> (StopHandle, Shutdown) {
    let (handle, shutdown) = channel();
    let trigger = handle.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping");
                trigger.stop();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    (handle, shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_resolves_after_stop() {
        let (handle, mut shutdown) = channel();
        handle.stop();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .expect("wait should resolve");
    }

    #[tokio::test]
    async fn test_dropped_handle_never_stops() {
        let (handle, mut shutdown) = channel();
        drop(handle);
        let waited = tokio::time::timeout(Duration::from_millis(30), shutdown.wait()).await;
        assert!(waited.is_err());
    }
}
