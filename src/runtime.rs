//! Process runtime for the controller binary.
//!
//! Stdin is read through a blocking thread that no cancellation can reach, so
//! the runtime must not be dropped with an unbounded wait once the
//! controller has returned.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Builder;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::Result;

/// How long blocking work may linger after the controller returned
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub fn build_runtime(worker_threads: usize) -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .thread_name("kore-worker")
        .enable_all()
        .build()?;
    Ok(runtime)
}

/// Drives `future` to completion, then shuts the runtime down, abandoning
/// any blocking task still running after `grace`.
pub fn run_to_completion<F>(
    runtime: Runtime,
    future: F,
    grace: Duration,
) -> F::Output
where
    F: Future,
{
    let output = runtime.block_on(future);
    debug!(?grace, "Shutting down runtime");
    runtime.shutdown_timeout(grace);
    output
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod runtime_test;
