use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::brain::feedback::{snapshot_of, FeedbackBuffer};
use crate::error::AppError;
use crate::store::KeyValueStore;

/// Messages accepted by the persistence writer.
#[derive(Debug)]
pub enum PersistMessage {
    /// The buffer changed; write it out at some point.
    Persist,
    /// Write the current buffer now and report the outcome.
    Flush {
        responder: oneshot::Sender<Result<(), AppError>>,
    },
}

/// A handle to the feedback persistence writer.
///
/// The writer is the only task that touches the store after start-up, so
/// writes never interleave. Signals are cheap and never block the caller.
#[derive(Clone, Debug)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistMessage>,
}

impl PersistenceHandle {
    /// Spawns the writer on the current tokio runtime.
    ///
    /// Returns `None` when called outside a runtime. Nothing is written
    /// until `hydrated` is set.
    pub fn spawn(
        store: Arc<dyn KeyValueStore>,
        key: String,
        buffer: FeedbackBuffer,
        hydrated: Arc<AtomicBool>,
    ) -> Option<Self> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let (sender, receiver) = mpsc::channel(32);
        let writer = PersistenceWriter {
            receiver,
            store,
            key,
            buffer,
            hydrated,
        };
        runtime.spawn(async move { writer.run().await });
        Some(Self { sender })
    }

    /// Fire-and-forget write request.
    pub fn notify(&self) {
        match self.sender.try_send(PersistMessage::Persist) {
            Ok(()) => {}
            // a queued write will pick up the latest buffer anyway
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Feedback persistence writer has stopped; change kept in memory only");
            }
        }
    }

    /// Writes the current buffer and waits for the outcome.
    #[instrument(skip(self))]
    pub async fn flush(&self) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        self.sender
            .send(PersistMessage::Flush { responder: send })
            .await
            .map_err(|e| AppError::Persistence(format!("Writer unavailable: {}", e)))?;
        recv.await
            .map_err(|e| AppError::Persistence(format!("Writer dropped flush: {}", e)))?
    }
}

struct PersistenceWriter {
    receiver: mpsc::Receiver<PersistMessage>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    buffer: FeedbackBuffer,
    hydrated: Arc<AtomicBool>,
}

impl PersistenceWriter {
    async fn run(mut self) {
        info!("Feedback persistence writer started for key {}", self.key);
        while let Some(msg) = self.receiver.recv().await {
            let mut waiting = Vec::new();
            if let PersistMessage::Flush { responder } = msg {
                waiting.push(responder);
            }

            // Coalesce everything already queued into one write
            let mut coalesced = 0usize;
            while let Ok(next) = self.receiver.try_recv() {
                match next {
                    PersistMessage::Persist => coalesced += 1,
                    PersistMessage::Flush { responder } => waiting.push(responder),
                }
            }
            if coalesced > 0 {
                debug!("Coalesced {} persistence signals", coalesced);
            }

            if !self.hydrated.load(Ordering::Acquire) {
                debug!("Holding feedback write until stored history is loaded");
                let held = Err(AppError::Persistence(
                    "Stored feedback not loaded yet, write held back".to_string(),
                ));
                for responder in waiting {
                    let _ = responder.send(held.clone());
                }
                continue;
            }

            let outcome = self.write().await;
            if let Err(e) = &outcome {
                warn!("Failed to persist feedback: {}", e);
            }
            for responder in waiting {
                let _ = responder.send(outcome.clone());
            }
        }
        debug!("Feedback persistence writer stopped");
    }

    async fn write(&self) -> Result<(), AppError> {
        let entries = snapshot_of(&self.buffer);
        let bytes = serde_json::to_vec(&entries)
            .map_err(|e| AppError::Persistence(format!("Failed to encode feedback: {}", e)))?;
        self.store.set(&self.key, bytes).await?;
        debug!("Persisted {} feedback entries", entries.len());
        Ok(())
    }
}
