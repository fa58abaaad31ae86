use std::sync::Arc;

use kore_controller::ChannelEventSource;
use kore_controller::Controller;
use kore_controller::EventSender;
use kore_controller::Reconciler;
use kore_controller::ScaledObject;
use kore_controller::SourceFilter;
use kore_controller::WatchRegistry;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::common::key;
use crate::common::RecordingWatchTask;
use crate::common::StartedRx;
use crate::common::WAIT;
use crate::enable_logger;

struct Harness {
    controller: Arc<Controller<ChannelEventSource, RecordingWatchTask>>,
    sender: EventSender,
    started: StartedRx,
    task: RecordingWatchTask,
    parent: CancellationToken,
    running: JoinHandle<()>,
}

fn start() -> Harness {
    enable_logger();
    let (task, started) = RecordingWatchTask::new();
    let (source, sender) = ChannelEventSource::new(32, SourceFilter::all_namespaces());
    let controller = Arc::new(Controller::new(source, task.clone()));
    let parent = CancellationToken::new();

    let running = {
        let controller = controller.clone();
        let parent = parent.clone();
        tokio::spawn(async move { controller.run(&parent).await })
    };

    Harness {
        controller,
        sender,
        started,
        task,
        parent,
        running,
    }
}

#[tokio::test]
async fn upsert_replace_delete_lifecycle() {
    let mut h = start();

    // first upsert installs one entry and dispatches one watch
    h.sender.add(ScaledObject::new("ns", "a", "1")).await;
    let v1 = h.started.next().await;
    assert_eq!(v1.key, key("ns", "a"));
    assert_eq!(v1.resource_version, "1");
    assert!(!v1.scope.is_cancelled());
    assert_eq!(h.controller.registry().len(), 1);

    // second upsert replaces it and cancels the superseded watch
    h.sender
        .update(ScaledObject::new("ns", "a", "1"), ScaledObject::new("ns", "a", "2"))
        .await;
    let v2 = h.started.next().await;
    assert_eq!(v2.resource_version, "2");
    assert!(v1.scope.is_cancelled());
    assert!(!v2.scope.is_cancelled());
    assert_eq!(h.controller.registry().generation_of(&key("ns", "a")), Some(v2.scope.generation()));

    // delete cancels the live watch and forgets the key
    h.sender.delete(ScaledObject::new("ns", "a", "2")).await;
    // a marker upsert on another key proves the delete was processed
    h.sender.add(ScaledObject::new("ns", "marker", "1")).await;
    let marker = h.started.next().await;
    assert_eq!(marker.key, key("ns", "marker"));

    assert!(v2.scope.is_cancelled());
    assert!(!h.controller.registry().contains(&key("ns", "a")));

    h.parent.cancel();
    timeout(WAIT, h.running).await.unwrap().unwrap();
    h.task.wait_all_stopped().await;
}

#[tokio::test]
async fn delete_of_never_upserted_key_changes_nothing() {
    let mut h = start();

    h.sender.add(ScaledObject::new("ns", "a", "1")).await;
    let a = h.started.next().await;

    h.sender.delete(ScaledObject::new("ns", "b", "1")).await;
    h.started.assert_idle().await;

    assert!(!a.scope.is_cancelled());
    assert_eq!(h.controller.registry().keys(), vec![key("ns", "a")]);

    h.controller.shutdown();
    timeout(WAIT, h.running).await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_cascades_to_every_live_watch_before_run_returns() {
    let mut h = start();

    h.sender.add(ScaledObject::new("ns", "a", "1")).await;
    h.sender.add(ScaledObject::new("ns", "c", "1")).await;
    let first = h.started.next().await;
    let second = h.started.next().await;
    h.task.wait_running(2).await;

    h.parent.cancel();
    timeout(WAIT, h.running)
        .await
        .expect("run returns once the root scope is cancelled")
        .unwrap();

    assert!(first.scope.is_cancelled());
    assert!(second.scope.is_cancelled());
    assert!(h.controller.registry().is_empty());
    h.task.wait_all_stopped().await;
}

#[tokio::test]
async fn malformed_object_is_skipped_and_later_notification_heals() {
    let mut h = start();

    h.sender.add(ScaledObject::new("ns", "", "1")).await;
    h.sender.add(ScaledObject::new("ns", "a", "1")).await;

    let a = h.started.next().await;
    assert_eq!(a.key, key("ns", "a"));
    h.started.assert_idle().await;
    assert_eq!(h.controller.registry().len(), 1);

    h.controller.shutdown();
    timeout(WAIT, h.running).await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_for_one_key_leave_one_live_watch() {
    enable_logger();

    for _ in 0..100 {
        let (task, mut started) = RecordingWatchTask::new();
        let root = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(WatchRegistry::new()),
            root.clone(),
            Arc::new(task.clone()),
        ));

        let upserts: Vec<_> = ["1", "2"]
            .into_iter()
            .map(|version| {
                let reconciler = reconciler.clone();
                tokio::spawn(async move { reconciler.on_upsert(ScaledObject::new("ns", "c", version)) })
            })
            .collect();
        for upsert in upserts {
            upsert.await.unwrap();
        }

        let x = started.next().await;
        let y = started.next().await;
        let live: Vec<_> = [&x, &y].into_iter().filter(|s| !s.scope.is_cancelled()).collect();
        assert_eq!(live.len(), 1, "exactly one of the two watches stays live");
        assert_eq!(
            reconciler.registry().generation_of(&key("ns", "c")),
            Some(live[0].scope.generation())
        );

        root.cancel();
        task.wait_all_stopped().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn upsert_racing_delete_leaves_no_orphan_watch() {
    enable_logger();

    for _ in 0..100 {
        let (task, mut started) = RecordingWatchTask::new();
        let root = CancellationToken::new();
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(WatchRegistry::new()),
            root.clone(),
            Arc::new(task.clone()),
        ));
        reconciler.on_upsert(ScaledObject::new("ns", "r", "1"));
        let first = started.next().await;

        let upsert = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.on_upsert(ScaledObject::new("ns", "r", "2")) })
        };
        let delete = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.on_delete(ScaledObject::new("ns", "r", "2")) })
        };
        upsert.await.unwrap();
        delete.await.unwrap();
        let second = started.next().await;

        assert!(first.scope.is_cancelled());
        match reconciler.registry().generation_of(&key("ns", "r")) {
            Some(live) => {
                assert_eq!(live, second.scope.generation());
                assert!(!second.scope.is_cancelled());
                task.wait_running(1).await;
            }
            None => {
                assert!(second.scope.is_cancelled());
                task.wait_all_stopped().await;
            }
        }

        root.cancel();
        task.wait_all_stopped().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn operations_on_other_keys_proceed_during_churn() {
    enable_logger();
    let (task, mut started) = RecordingWatchTask::new();
    let root = CancellationToken::new();
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(WatchRegistry::new()),
        root.clone(),
        Arc::new(task.clone()),
    ));

    let churn = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            for version in 0..500 {
                reconciler.on_upsert(ScaledObject::new("ns", "hot", &version.to_string()));
                if version % 50 == 49 {
                    tokio::task::yield_now().await;
                }
            }
        })
    };

    reconciler.on_upsert(ScaledObject::new("ns", "quiet", "1"));
    churn.await.unwrap();

    let mut quiet = None;
    for _ in 0..501 {
        let s = started.next().await;
        if s.key == key("ns", "quiet") {
            quiet = Some(s);
        }
    }
    let quiet = quiet.expect("quiet key was dispatched");

    assert!(!quiet.scope.is_cancelled());
    assert_eq!(reconciler.registry().len(), 2);
    task.wait_running(2).await;

    root.cancel();
    task.wait_all_stopped().await;
}
