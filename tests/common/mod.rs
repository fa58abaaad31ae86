use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kore_controller::ResourceKey;
use kore_controller::ScaledObject;
use kore_controller::WatchScope;
use kore_controller::WatchTask;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

/// A watch that was dispatched, as observed by [`RecordingWatchTask`]
#[derive(Debug, Clone)]
pub struct Started {
    pub key: ResourceKey,
    pub resource_version: String,
    pub scope: WatchScope,
}

/// Watch body that reports every dispatch and then parks until its scope is
/// cancelled, like a well-behaved scaler loop.
#[derive(Clone)]
pub struct RecordingWatchTask {
    started: mpsc::UnboundedSender<Started>,
    running: Arc<AtomicUsize>,
}

pub struct StartedRx {
    rx: mpsc::UnboundedReceiver<Started>,
}

impl RecordingWatchTask {
    pub fn new() -> (Self, StartedRx) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                started: tx,
                running: Arc::new(AtomicUsize::new(0)),
            },
            StartedRx { rx },
        )
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Waits until exactly `n` dispatched watches are still running.
    pub async fn wait_running(
        &self,
        n: usize,
    ) {
        timeout(WAIT, async {
            while self.running() != n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {} running watches, found {}", n, self.running()));
    }

    /// Waits until every dispatched watch has returned.
    pub async fn wait_all_stopped(&self) {
        self.wait_running(0).await;
    }
}

#[async_trait]
impl WatchTask for RecordingWatchTask {
    async fn watch(
        &self,
        scope: WatchScope,
        object: ScaledObject,
    ) {
        self.running.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.send(Started {
            key: ResourceKey::from_object(&object).expect("dispatched objects have keys"),
            resource_version: object.resource_version().to_string(),
            scope: scope.clone(),
        });
        scope.cancelled().await;
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StartedRx {
    pub async fn next(&mut self) -> Started {
        timeout(WAIT, self.rx.recv())
            .await
            .expect("a watch should be dispatched")
            .expect("watch task alive")
    }

    /// Asserts nothing else gets dispatched within a short grace period.
    pub async fn assert_idle(&mut self) {
        let extra = timeout(Duration::from_millis(50), self.rx.recv()).await;
        assert!(extra.is_err(), "unexpected dispatch: {:?}", extra);
    }
}

pub fn key(
    ns: &str,
    name: &str,
) -> ResourceKey {
    ResourceKey::from_object(&ScaledObject::new(ns, name, "0")).unwrap()
}
