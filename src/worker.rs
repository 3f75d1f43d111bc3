//! Worker loop: lease a task, reap it, submit the results, repeat
//!
//! Workers are independent. Each owns its own tracker client and runs one task at a
//! time; parallelism comes from running several workers. A worker only checks for
//! shutdown between tasks, never in the middle of one.

use crate::config::Config;
use crate::reaper::Reaper;
use crate::tracker::TrackerClient;
use crate::{Result, ShortreapError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Delay between starting consecutive workers
const STAGGER: Duration = Duration::from_secs(1);

/// What one pass of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A task was run and submitted (or refused by the tracker)
    Completed,
    /// The tracker had no work
    Idle,
}

/// Leases and runs at most one task
///
/// Tracker failures are returned to the caller. A task whose reaper cannot be built
/// (unknown service, malformed generator) is logged and counted as completed, since
/// there is nothing useful to submit for it.
pub async fn run_once(config: &Config, tracker: &TrackerClient) -> Result<Step> {
    let task = match tracker.fetch().await? {
        Some(task) => task,
        None => return Ok(Step::Idle),
    };

    let reaper = match Reaper::from_task(task.clone(), config) {
        Ok(reaper) => reaper,
        Err(e) => {
            tracing::error!("Cannot run task {}: {}", task.id, e);
            return Ok(Step::Completed);
        }
    };

    let output = reaper.run().await?;
    tracker
        .put(&task, output.file, config.tracker.username.as_deref())
        .await?;
    Ok(Step::Completed)
}

/// Runs one worker until `shutdown` flips to true
pub async fn run_worker(id: u32, config: Config, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let tracker = TrackerClient::new(&config.tracker, &config.http)?;
    tracing::info!("Worker {} started", id);

    loop {
        let stopping = *shutdown.borrow();
        if stopping {
            break;
        }

        let pause = match run_once(&config, &tracker).await {
            Ok(Step::Completed) => None,
            Ok(Step::Idle) => {
                tracing::debug!(
                    "Worker {}: sleeping for {} seconds",
                    id,
                    config.worker.idle_sleep
                );
                Some(config.worker.idle_sleep())
            }
            Err(ShortreapError::Tracker(e)) => {
                tracing::error!(
                    "Worker {}: error contacting tracker ({}), sleeping for {} seconds",
                    id,
                    e,
                    config.worker.error_sleep
                );
                Some(config.worker.error_sleep())
            }
            Err(e) => {
                tracing::error!(
                    "Worker {}: {}, sleeping for {} seconds",
                    id,
                    e,
                    config.worker.error_sleep
                );
                Some(config.worker.error_sleep())
            }
        };

        if let Some(pause) = pause {
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                Ok(()) = shutdown.changed() => {}
            }
        }
    }

    tracing::info!("Worker {} stopped", id);
    Ok(())
}

/// Starts `config.worker.threads` workers and waits for all of them
///
/// Ctrl-C asks every worker to stop after its current task.
pub async fn run_workers(config: Config) -> Result<()> {
    let (stop, shutdown) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping after the current tasks");
            let _ = stop.send(true);
        }
    });

    let mut workers = JoinSet::new();
    for id in 0..config.worker.threads {
        if id > 0 {
            tokio::time::sleep(STAGGER).await;
        }
        workers.spawn(run_worker(id, config.clone(), shutdown.clone()));
    }

    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("Worker failed: {}", e);
                first_error.get_or_insert(e);
            }
            Err(e) => tracing::error!("Worker panicked: {}", e),
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
