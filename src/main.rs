use kore_controller::metrics;
use kore_controller::runtime;
use kore_controller::Controller;
use kore_controller::ControllerConfig;
use kore_controller::JsonLinesEventSource;
use kore_controller::LogConfig;
use kore_controller::PollingWatchTask;
use kore_controller::Result;
use kore_controller::SourceFilter;
use tokio::io::BufReader;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

fn main() -> Result<()> {
    let config = ControllerConfig::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&config.log);

    let rt = runtime::build_runtime(2)?;
    runtime::run_to_completion(rt, serve(config), runtime::SHUTDOWN_GRACE);

    info!("Exiting program.");
    Ok(())
}

async fn serve(config: ControllerConfig) {
    // Initializing Shutdown Signal
    let parent = CancellationToken::new();

    if config.monitoring.prometheus_enabled {
        tokio::spawn(metrics::start_server(
            config.monitoring.socket_addr(),
            parent.child_token(),
        ));
    }

    let source = JsonLinesEventSource::new(
        BufReader::new(tokio::io::stdin()),
        SourceFilter::from(&config.source),
    );
    let task = PollingWatchTask::new(config.watch.default_polling_interval());
    let controller = Controller::new(source, task);

    info!("Controller configured. Reading events from stdin; waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    {
        let parent = parent.clone();
        tokio::spawn(async move {
            if let Err(e) = graceful_shutdown(parent).await {
                error!("Failed to shutdown: {:?}", e);
            }
        });
    }

    controller.run(&parent).await;
}

async fn graceful_shutdown(parent: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    parent.cancel();
    Ok(())
}

fn init_observability(log: &LogConfig) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    let (non_blocking, guard) = match &log.log_dir {
        Some(dir) => tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "kore-controller.log")),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(filter);
    tracing_subscriber::registry().with(base_subscriber).init();

    guard
}
