use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::EventSource;
use super::SourceFilter;
use crate::EventHandler;
use crate::Result;
use crate::ScaledObject;
use crate::SourceError;
use crate::WatchEvent;

/// In-process source fed through an [`EventSender`].
pub struct ChannelEventSource {
    receiver: Mutex<Option<mpsc::Receiver<WatchEvent>>>,
    filter: SourceFilter,
}

/// Producer side of a [`ChannelEventSource`]
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<WatchEvent>,
}

impl ChannelEventSource {
    pub fn new(
        capacity: usize,
        filter: SourceFilter,
    ) -> (Self, EventSender) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                receiver: Mutex::new(Some(rx)),
                filter,
            },
            EventSender { tx },
        )
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn run(
        &self,
        handler: Arc<dyn EventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let mut rx = self.receiver.lock().await.take().ok_or(SourceError::AlreadyRunning)?;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Channel event source stopping on shutdown");
                    return Ok(());
                }
                event = rx.recv() => match event {
                    Some(event) => {
                        self.filter.deliver(event, handler.as_ref());
                    }
                    None => {
                        debug!("All event senders dropped");
                        return Ok(());
                    }
                }
            }
        }
    }
}

impl EventSender {
    /// Sends a raw event. Returns `false` once the source is gone.
    pub async fn send(
        &self,
        event: WatchEvent,
    ) -> bool {
        self.tx.send(event).await.is_ok()
    }

    pub async fn add(
        &self,
        object: ScaledObject,
    ) -> bool {
        self.send(WatchEvent::Added(object)).await
    }

    pub async fn update(
        &self,
        old: ScaledObject,
        new: ScaledObject,
    ) -> bool {
        self.send(WatchEvent::Modified { old, new }).await
    }

    pub async fn delete(
        &self,
        object: ScaledObject,
    ) -> bool {
        self.send(WatchEvent::Deleted(object)).await
    }
}
