//! Event sources feed decoded notifications to an [`EventHandler`].
//!
//! A source owns the transport: it decodes raw payloads into
//! [`WatchEvent`]s, drops updates whose resource version did not change,
//! applies the namespace restriction and delivers the survivors in arrival
//! order. It stops when the shutdown token fires.

mod channel;
mod json_lines;

pub use channel::*;
pub use json_lines::*;


use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::metrics::DROPPED_NOTIFICATIONS;
use crate::metrics::DROP_NAMESPACE;
use crate::EventHandler;
use crate::Result;
use crate::SourceConfig;
use crate::WatchEvent;

#[async_trait]
pub trait EventSource: Send + Sync + 'static {
    /// Delivers notifications to `handler` until `shutdown` is cancelled or
    /// the underlying transport is exhausted.
    async fn run(
        &self,
        handler: Arc<dyn EventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// Boundary filter shared by all sources
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    namespace: Option<String>,
}

impl SourceFilter {
    pub fn all_namespaces() -> Self {
        Self::default()
    }

    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    fn admits(
        &self,
        event: &WatchEvent,
    ) -> bool {
        let Some(wanted) = self.namespace.as_deref() else {
            return true;
        };
        let object = match event {
            WatchEvent::Added(object) | WatchEvent::Deleted(object) => object,
            WatchEvent::Modified { new, .. } => new,
        };
        object.namespace() == Some(wanted)
    }

    /// Converts and delivers one raw event. Returns whether the handler was
    /// invoked.
    pub fn deliver(
        &self,
        event: WatchEvent,
        handler: &dyn EventHandler,
    ) -> bool {
        if !self.admits(&event) {
            trace!(?event, "Dropping event outside the watched namespace");
            DROPPED_NOTIFICATIONS.with_label_values(&[DROP_NAMESPACE]).inc();
            return false;
        }

        match event.into_notification() {
            Some(notification) => {
                notification.dispatch_to(handler);
                true
            }
            None => false,
        }
    }
}

impl From<&SourceConfig> for SourceFilter {
    fn from(config: &SourceConfig) -> Self {
        match &config.namespace {
            Some(ns) => Self::namespace(ns.clone()),
            None => Self::all_namespaces(),
        }
    }
}
