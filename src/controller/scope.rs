//! Cancellation scopes for watch tasks.
//!
//! Every dispatched watch task receives a [`WatchScope`], a child of the
//! controller's root token. The matching [`CancelHandle`] is the only thing
//! stored in the registry; invoking it stops exactly that task, while
//! cancelling the root stops all of them.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// A single-shot, idempotent stop capability.
pub trait Cancel: Send + Sync + 'static {
    /// Signals the associated scope and returns without waiting for the task.
    fn cancel(&self);
}

/// Stop capability tagged with the generation of the dispatch it stops.
pub trait ScopeHandle: Cancel {
    fn generation(&self) -> u64;
}

/// Monotonic generation counter; each dispatch gets a fresh generation.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
    next: Arc<AtomicU64>,
}

impl GenerationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next generation, starting at 1.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }
}

/// Execution scope handed to a watch task.
///
/// Read-only from the task's point of view: it can observe cancellation but
/// not trigger it.
#[derive(Debug, Clone)]
pub struct WatchScope {
    generation: u64,
    token: CancellationToken,
}

impl WatchScope {
    /// Derives a new scope under `parent` and the handle that stops it.
    pub fn child_of(
        parent: &CancellationToken,
        generation: u64,
    ) -> (WatchScope, CancelHandle) {
        let token = parent.child_token();
        (
            WatchScope {
                generation,
                token: token.clone(),
            },
            CancelHandle { generation, token },
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this scope, or any of its ancestors, is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Registry-held stop capability for one watch scope.
#[derive(Debug)]
pub struct CancelHandle {
    generation: u64,
    token: CancellationToken,
}

impl CancelHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Cancel for CancelHandle {
    fn cancel(&self) {
        self.token.cancel();
    }
}

impl ScopeHandle for CancelHandle {
    fn generation(&self) -> u64 {
        self.generation
    }
}
