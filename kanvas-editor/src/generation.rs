//! Dispatch of streaming generations.
//!
//! Each placeholder image owns at most one running task. Tasks forward
//! their events, tagged with the placeholder id, into a single channel the
//! editor drains. The editor resolves every event by id, so events for
//! images deleted in the meantime fall through harmlessly.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use kanvas_core::ImageId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::collaborator::GenerationEvent;

/// Configuration for generation requests.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Upper bound on a whole generation, and on single collaborator calls.
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
        }
    }
}

/// Owns the running generation tasks and their event channel.
#[derive(Debug)]
pub struct GenerationDispatcher {
    config: GenerationConfig,
    in_flight: HashMap<ImageId, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<(ImageId, GenerationEvent)>,
    rx: mpsc::UnboundedReceiver<(ImageId, GenerationEvent)>,
}

impl GenerationDispatcher {
    /// Create an idle dispatcher.
    #[must_use]
    pub fn new(config: GenerationConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            in_flight: HashMap::new(),
            tx,
            rx,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Start forwarding `stream` for placeholder `id`.
    ///
    /// A stream that ends without a terminal event, or runs past the
    /// timeout, is reported as [`GenerationEvent::Error`]. Must be called
    /// from within a tokio runtime.
    pub fn spawn(&mut self, id: ImageId, mut stream: BoxStream<'static, GenerationEvent>) {
        let tx = self.tx.clone();
        let timeout = self.config.timeout;
        let handle = tokio::spawn(async move {
            let forward = async {
                while let Some(event) = stream.next().await {
                    let terminal = event.is_terminal();
                    if tx.send((id, event)).is_err() || terminal {
                        return;
                    }
                }
                let _ = tx.send((
                    id,
                    GenerationEvent::Error("Generation ended without a result".to_string()),
                ));
            };
            if tokio::time::timeout(timeout, forward).await.is_err() {
                let _ = tx.send((id, GenerationEvent::Error("Generation timed out".to_string())));
            }
        });
        if let Some(previous) = self.in_flight.insert(id, handle) {
            previous.abort();
        }
        tracing::debug!(%id, "generation started");
    }

    /// Whether a generation for `id` is still running.
    #[must_use]
    pub fn is_in_flight(&self, id: ImageId) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// Number of running generations.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Ids of running generations.
    #[must_use]
    pub fn in_flight_ids(&self) -> Vec<ImageId> {
        self.in_flight.keys().copied().collect()
    }

    /// Stop the task for `id`. Events it already sent are still delivered.
    pub fn cancel(&mut self, id: ImageId) -> bool {
        match self.in_flight.remove(&id) {
            Some(handle) => {
                handle.abort();
                tracing::debug!(%id, "generation cancelled");
                true
            }
            None => false,
        }
    }

    /// Drop the bookkeeping for a generation that delivered its terminal event.
    pub fn finish(&mut self, id: ImageId) {
        self.in_flight.remove(&id);
    }

    /// Wait for the next event.
    pub async fn recv(&mut self) -> Option<(ImageId, GenerationEvent)> {
        self.rx.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<(ImageId, GenerationEvent)> {
        self.rx.try_recv().ok()
    }
}

impl Default for GenerationDispatcher {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl Drop for GenerationDispatcher {
    fn drop(&mut self) {
        for handle in self.in_flight.values() {
            handle.abort();
        }
    }
}
