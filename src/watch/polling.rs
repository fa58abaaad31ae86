use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::trace;

use super::WatchTask;
use crate::ScaledObject;
use crate::WatchScope;

/// Default watch body: wakes up every polling interval until cancelled.
///
/// The interval comes from the object's `spec.pollingInterval`, falling back
/// to the configured default when absent or zero.
#[derive(Debug, Clone)]
pub struct PollingWatchTask {
    default_interval: Duration,
    polls: Arc<AtomicU64>,
}

impl PollingWatchTask {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            polls: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn polling_interval(
        &self,
        object: &ScaledObject,
    ) -> Duration {
        match object.spec.polling_interval {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => self.default_interval,
        }
    }

    /// Total polls performed across all watches started by this task.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl WatchTask for PollingWatchTask {
    async fn watch(
        &self,
        scope: WatchScope,
        object: ScaledObject,
    ) {
        let period = self.polling_interval(&object);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            name = object.name(),
            namespace = object.namespace().unwrap_or_default(),
            target = %object.spec.scale_target_ref.deployment_name,
            generation = scope.generation(),
            ?period,
            "Watching scaled object"
        );

        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {
                    debug!(name = object.name(), generation = scope.generation(), "Watch cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    self.polls.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        name = object.name(),
                        triggers = object.spec.triggers.len(),
                        "Polling triggers"
                    );
                }
            }
        }
    }
}
