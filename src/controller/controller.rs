//! Root supervisor of the reconciliation core.
//!
//! ## Key Responsibilities
//! - Derives the root cancellation scope every watch scope descends from
//! - Runs the event source against a [`Reconciler`] bound to that scope
//! - Blocks until shutdown, then cancels the root and drains the registry
//!
//! ## Example Usage
//! ```rust,no_run
//! # use kore_controller::*;
//! # use std::time::Duration;
//! # use tokio_util::sync::CancellationToken;
//! # async fn example() {
//! let (source, sender) = ChannelEventSource::new(64, SourceFilter::all_namespaces());
//! let controller = Controller::new(source, PollingWatchTask::new(Duration::from_secs(30)));
//! let shutdown = controller.shutdown_handle();
//!
//! tokio::spawn(async move {
//!     sender.add(ScaledObject::new("default", "worker", "1")).await;
//!     shutdown.shutdown();
//! });
//! controller.run(&CancellationToken::new()).await;
//! # }
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::Reconciler;
use super::WatchRegistry;
use crate::EventHandler;
use crate::EventSource;
use crate::WatchTask;

pub struct Controller<S, W>
where
    S: EventSource,
    W: WatchTask,
{
    source: Arc<S>,
    task: Arc<W>,
    registry: Arc<WatchRegistry>,
    shutdown: CancellationToken,
    started: AtomicBool,
}

/// Requests shutdown of a running [`Controller`] from anywhere.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

impl<S, W> Controller<S, W>
where
    S: EventSource,
    W: WatchTask,
{
    pub fn new(
        source: S,
        task: W,
    ) -> Self {
        Self::with_registry(source, task, Arc::new(WatchRegistry::new()))
    }

    /// Builds a controller around an externally owned registry.
    pub fn with_registry(
        source: S,
        task: W,
        registry: Arc<WatchRegistry>,
    ) -> Self {
        Self {
            source: Arc::new(source),
            task: Arc::new(task),
            registry,
            shutdown: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<WatchRegistry> {
        &self.registry
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.shutdown.clone(),
        }
    }

    /// Stops a running controller. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs until `parent` is cancelled or [`shutdown`](Self::shutdown) is
    /// called.
    ///
    /// On return the root scope is cancelled, the event source has stopped
    /// and the registry is empty; every watch scope created during the run
    /// has been cancelled.
    ///
    /// A controller runs once. The event source is consumed by the first
    /// call, so later calls log an error and return immediately.
    pub async fn run(
        &self,
        parent: &CancellationToken,
    ) {
        if self.started.swap(true, Ordering::AcqRel) {
            error!("Controller already ran; ignoring repeated run");
            return;
        }

        let root = parent.child_token();
        let reconciler = Arc::new(Reconciler::new(self.registry.clone(), root.clone(), self.task.clone()));

        let source_handle = {
            let source = self.source.clone();
            let handler: Arc<dyn EventHandler> = reconciler.clone();
            let root = root.clone();
            tokio::spawn(async move {
                match source.run(handler, root.clone()).await {
                    Ok(()) if !root.is_cancelled() => {
                        warn!("Event source finished; existing watches keep running until shutdown");
                    }
                    Ok(()) => {}
                    Err(e) => {
                        error!("Event source stopped: {:?}", e);
                    }
                }
            })
        };

        info!("Controller is started");

        tokio::select! {
            _ = root.cancelled() => {}
            _ = self.shutdown.cancelled() => {}
        }
        info!("Controller is shutting down");

        root.cancel();
        if let Err(e) = source_handle.await {
            error!("Event source task failed: {:?}", e);
        }

        let stopped = reconciler.stop_all();
        debug!(stopped, "Registry drained");
    }
}
