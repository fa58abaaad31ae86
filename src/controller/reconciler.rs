//! Translates upsert/delete notifications into watch task lifecycle
//! transitions.
//!
//! Per key the reconciler runs a two-state machine:
//!
//! ```text
//! Absent     --upsert--> Active(t1)      install t1
//! Active(t0) --upsert--> Active(t1)      install t1, then cancel t0
//! Active(t)  --delete--> Absent          remove, then cancel t
//! Absent     --delete--> Absent          no-op
//! ```
//!
//! Every upsert restarts the watch, even if the snapshot is unchanged;
//! de-duplication is the event source's job.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info_span;
use tracing::Instrument;

use super::Cancel;
use super::CancelHandle;
use super::GenerationClock;
use super::ScopeHandle;
use super::WatchRegistry;
use super::WatchScope;
use crate::metrics::ACTIVE_WATCHES;
use crate::metrics::DROPPED_NOTIFICATIONS;
use crate::metrics::DROP_INVALID_KEY;
use crate::metrics::REASON_DELETED;
use crate::metrics::REASON_SHUTDOWN;
use crate::metrics::REASON_SUPERSEDED;
use crate::metrics::WATCH_CANCELLATIONS;
use crate::metrics::WATCH_DISPATCHES;
use crate::EventHandler;
use crate::ResourceKey;
use crate::ScaledObject;
use crate::WatchTask;

type WrapHandle<H> = Arc<dyn Fn(CancelHandle) -> H + Send + Sync>;

pub struct Reconciler<W, H = CancelHandle>
where
    W: WatchTask,
    H: ScopeHandle,
{
    registry: Arc<WatchRegistry<H>>,
    root: CancellationToken,
    clock: GenerationClock,
    task: Arc<W>,
    wrap: WrapHandle<H>,
}

impl<W> Reconciler<W>
where
    W: WatchTask,
{
    /// Creates a reconciler whose per-key scopes are children of `root`.
    pub fn new(
        registry: Arc<WatchRegistry>,
        root: CancellationToken,
        task: Arc<W>,
    ) -> Self {
        Self::with_handles(registry, root, task, |handle| handle)
    }
}

impl<W, H> Reconciler<W, H>
where
    W: WatchTask,
    H: ScopeHandle,
{
    /// Like [`new`](Reconciler::new), but stores `wrap(handle)` in the
    /// registry instead of the bare [`CancelHandle`].
    pub fn with_handles(
        registry: Arc<WatchRegistry<H>>,
        root: CancellationToken,
        task: Arc<W>,
        wrap: impl Fn(CancelHandle) -> H + Send + Sync + 'static,
    ) -> Self {
        Self {
            registry,
            root,
            clock: GenerationClock::new(),
            task,
            wrap: Arc::new(wrap),
        }
    }

    pub fn registry(&self) -> &Arc<WatchRegistry<H>> {
        &self.registry
    }

    /// Starts a watch for `object`, replacing any watch already running for
    /// its key.
    ///
    /// The new handle is installed before the displaced one is cancelled, so
    /// the key is never observed without a live entry between the two.
    pub fn on_upsert(
        &self,
        object: ScaledObject,
    ) {
        let key = match ResourceKey::from_object(&object) {
            Ok(key) => key,
            Err(e) => {
                error!(
                    "Error getting key for scaledObject ({}/{}): {}",
                    object.namespace().unwrap_or_default(),
                    object.name(),
                    e
                );
                DROPPED_NOTIFICATIONS.with_label_values(&[DROP_INVALID_KEY]).inc();
                return;
            }
        };

        let generation = self.clock.next();
        let (scope, handle) = WatchScope::child_of(&self.root, generation);

        match self.registry.store(key.clone(), (self.wrap)(handle)) {
            Some(previous) => {
                debug!(
                    %key,
                    generation,
                    previous_generation = previous.generation(),
                    "Replacing watch for scaled object"
                );
                previous.cancel();
                WATCH_CANCELLATIONS.with_label_values(&[REASON_SUPERSEDED]).inc();
            }
            None => {
                debug!(%key, generation, "Starting watch for scaled object");
                ACTIVE_WATCHES.inc();
            }
        }

        self.dispatch(key, scope, object);
    }

    /// Stops the watch for `object`'s key, if one is running.
    pub fn on_delete(
        &self,
        object: ScaledObject,
    ) {
        debug!("Notified about deletion of ScaledObject: {}", object.name());

        let key = match ResourceKey::from_object(&object) {
            Ok(key) => key,
            Err(e) => {
                error!(
                    "Error getting key for scaledObject ({}/{}): {}",
                    object.namespace().unwrap_or_default(),
                    object.name(),
                    e
                );
                DROPPED_NOTIFICATIONS.with_label_values(&[DROP_INVALID_KEY]).inc();
                return;
            }
        };

        match self.registry.remove(&key) {
            Some(handle) => {
                debug!(%key, generation = handle.generation(), "Stopping watch for deleted scaled object");
                handle.cancel();
                ACTIVE_WATCHES.dec();
                WATCH_CANCELLATIONS.with_label_values(&[REASON_DELETED]).inc();
            }
            None => {
                debug!("ScaledObject {} not found in controller cache", key);
            }
        }
    }

    /// Removes and cancels every remaining entry. Returns how many were
    /// stopped.
    pub fn stop_all(&self) -> usize {
        let drained = self.registry.drain();
        let stopped = drained.len();
        for (key, handle) in drained {
            debug!(%key, generation = handle.generation(), "Stopping watch on shutdown");
            handle.cancel();
            ACTIVE_WATCHES.dec();
            WATCH_CANCELLATIONS.with_label_values(&[REASON_SHUTDOWN]).inc();
        }
        stopped
    }

    fn dispatch(
        &self,
        key: ResourceKey,
        scope: WatchScope,
        object: ScaledObject,
    ) {
        let span = info_span!("watch", key = %key, generation = scope.generation());
        let task = self.task.clone();

        WATCH_DISPATCHES.inc();
        tokio::spawn(async move { task.watch(scope, object).await }.instrument(span));
    }
}

impl<W, H> EventHandler for Reconciler<W, H>
where
    W: WatchTask,
    H: ScopeHandle,
{
    fn on_upsert(
        &self,
        object: ScaledObject,
    ) {
        Reconciler::on_upsert(self, object)
    }

    fn on_delete(
        &self,
        object: ScaledObject,
    ) {
        Reconciler::on_delete(self, object)
    }
}
