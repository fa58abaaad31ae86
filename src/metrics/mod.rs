use std::net::SocketAddr;
use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

pub const REASON_SUPERSEDED: &str = "superseded";
pub const REASON_DELETED: &str = "deleted";
pub const REASON_SHUTDOWN: &str = "shutdown";

pub const DROP_INVALID_KEY: &str = "invalid_key";
pub const DROP_DECODE: &str = "decode";
pub const DROP_NAMESPACE: &str = "namespace";

lazy_static! {
    pub static ref ACTIVE_WATCHES: IntGauge =
        IntGauge::new("kore_active_watches", "Number of scaled objects with a live watch task")
            .expect("metric can not be created");

    pub static ref WATCH_DISPATCHES: IntCounter =
        IntCounter::new("kore_watch_dispatches_total", "Watch tasks dispatched")
            .expect("metric can not be created");

    pub static ref WATCH_CANCELLATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("kore_watch_cancellations_total", "Watch scopes cancelled, by reason"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref DROPPED_NOTIFICATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("kore_dropped_notifications_total", "Notifications dropped before reconciliation"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

fn register_custom_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(ACTIVE_WATCHES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(WATCH_DISPATCHES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(WATCH_CANCELLATIONS.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(DROPPED_NOTIFICATIONS.clone()))
            .expect("collector can be registered");
    });
}

/// Serves `/metrics` on `addr` until `shutdown` is cancelled.
pub async fn start_server(
    addr: SocketAddr,
    shutdown: CancellationToken,
) {
    register_custom_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    let (addr, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(addr, async move {
            shutdown.cancelled().await;
        });
    info!("Metrics server listening on {}", addr);
    server.await;
}

/// Renders all registered collectors in the text exposition format.
pub fn render() -> String {
    use prometheus::Encoder;

    register_custom_metrics();

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(render())
}
