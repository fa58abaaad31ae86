//! Watch task seam.
//!
//! The reconciler dispatches one [`WatchTask::watch`] call per accepted
//! upsert and never awaits it. Implementations must return promptly once the
//! scope they were given is cancelled.

mod polling;

pub use polling::*;


use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::ScaledObject;
use crate::WatchScope;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WatchTask: Send + Sync + 'static {
    /// Runs until `scope` is cancelled or the work completes on its own.
    async fn watch(
        &self,
        scope: WatchScope,
        object: ScaledObject,
    );
}
