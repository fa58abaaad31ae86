use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::EventSource;
use super::SourceFilter;
use crate::metrics::DROPPED_NOTIFICATIONS;
use crate::metrics::DROP_DECODE;
use crate::EventHandler;
use crate::ResourceKey;
use crate::Result;
use crate::ScaledObject;
use crate::SourceError;
use crate::WatchEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WireEventType {
    Added,
    Modified,
    Deleted,
}

/// One line of the stream: `{"type": "ADDED", "object": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type")]
    pub event_type: WireEventType,
    pub object: ScaledObject,
}

/// Reads newline-delimited watch events, e.g. from stdin.
///
/// Like an informer, the source remembers the last snapshot it saw per key,
/// so an `ADDED` or `MODIFIED` for a known key is delivered as an update
/// carrying the previous snapshot. Lines that fail to decode are logged and
/// skipped.
pub struct JsonLinesEventSource<R> {
    reader: Mutex<Option<R>>,
    filter: SourceFilter,
}

impl<R> JsonLinesEventSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(
        reader: R,
        filter: SourceFilter,
    ) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            filter,
        }
    }
}

/// Turns a wire event into a raw watch event, updating the last-seen cache.
pub(crate) fn resolve_wire_event(
    cache: &mut HashMap<ResourceKey, ScaledObject>,
    wire: WireEvent,
) -> WatchEvent {
    let key = ResourceKey::from_object(&wire.object).ok();
    match wire.event_type {
        WireEventType::Added | WireEventType::Modified => {
            let previous = key.and_then(|key| cache.insert(key, wire.object.clone()));
            match previous {
                Some(old) => WatchEvent::Modified {
                    old,
                    new: wire.object,
                },
                None => WatchEvent::Added(wire.object),
            }
        }
        WireEventType::Deleted => {
            if let Some(key) = key {
                cache.remove(&key);
            }
            WatchEvent::Deleted(wire.object)
        }
    }
}

#[async_trait]
impl<R> EventSource for JsonLinesEventSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn run(
        &self,
        handler: Arc<dyn EventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let mut reader = self.reader.lock().await.take().ok_or(SourceError::AlreadyRunning)?;
        let mut buf = Vec::new();
        let mut cache = HashMap::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            let read = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("JSON lines event source stopping on shutdown");
                    return Ok(());
                }
                read = reader.read_until(b'\n', &mut buf) => read.map_err(SourceError::Read)?,
            };

            if read == 0 {
                info!(lines = line_no, "Event stream exhausted");
                return Ok(());
            }
            line_no += 1;

            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            // invalid UTF-8 is a decode error of this line, not a transport failure
            let wire: WireEvent = match serde_json::from_slice(&buf) {
                Ok(wire) => wire,
                Err(source) => {
                    let e = SourceError::Decode { line: line_no, source };
                    warn!("Dropping malformed event: {}", e);
                    DROPPED_NOTIFICATIONS.with_label_values(&[DROP_DECODE]).inc();
                    continue;
                }
            };

            let event = resolve_wire_event(&mut cache, wire);
            self.filter.deliver(event, handler.as_ref());
        }
    }
}
