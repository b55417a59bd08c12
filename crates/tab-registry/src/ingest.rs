//! Message-consuming loop that owns registry mutation.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use serpwatch_core_types::SerpMessage;

use crate::TabRegistry;

/// Handle to the spawned ingest loop. The loop applies register/deregister
/// messages from the bus to the registry and exits on `Shutdown` or when the
/// sending side goes away.
pub struct IngestHandle {
    task: JoinHandle<()>,
}

impl IngestHandle {
    pub fn spawn(mut rx: broadcast::Receiver<SerpMessage>, registry: Arc<TabRegistry>) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(SerpMessage::Shutdown) => {
                        debug!("registry ingest received shutdown");
                        break;
                    }
                    Ok(msg @ SerpMessage::RegisterSerp { .. }) => {
                        debug!(name = msg.name(), "registry ingest message");
                        if let Err(err) = registry.handle_register(msg) {
                            warn!("registry ingest error: {err}");
                        }
                    }
                    Ok(msg @ SerpMessage::DeregisterSerp { .. }) => {
                        debug!(name = msg.name(), "registry ingest message");
                        if let Err(err) = registry.handle_deregister(msg) {
                            warn!("registry ingest error: {err}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "registry ingest lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self { task }
    }

    /// Stops the loop without waiting for further messages.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
