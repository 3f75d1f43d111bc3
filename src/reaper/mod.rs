//! The reaper: runs one task from start to finish
//!
//! For every code the generator yields, the reaper:
//! 1. Waits for the rate limiter
//! 2. Asks the service adapter for the code's outcome
//! 3. Retries transient errors a fixed number of times
//! 4. Backs off exponentially while the service blocks it, without spending the
//!    code's retry budget
//! 5. Writes resolved URLs to the compressed result stream
//!
//! Codes that exhaust their retries are dropped silently. That loss is accepted; the
//! run itself only fails on local I/O errors.

mod output;
mod rate_limit;
mod stats;

pub use output::{is_storable, ResultWriter};
pub use rate_limit::RateLimiter;
pub use stats::RunStats;

use crate::config::Config;
use crate::generator::Generator;
use crate::service::{create_service, FetchOutcome, RateLimit, Service};
use crate::task::Task;
use crate::ShortreapError;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Attempts per code, not counting attempts answered with a service block
pub const MAX_TRIES: u32 = 3;

/// Upper bound for a single backoff sleep
pub const MAX_BACKOFF: Duration = Duration::from_secs(3600);

/// How often (in codes) progress is logged
const PROGRESS_INTERVAL: u64 = 1000;

/// Backoff after the `blocked`-th consecutive block: `min(5^blocked, 3600)` seconds
pub fn backoff_delay(blocked: u32) -> Duration {
    5u64.checked_pow(blocked)
        .map(Duration::from_secs)
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// A finished run: the rewound gzip result stream and its counters
#[derive(Debug)]
pub struct ReapOutput {
    pub file: File,
    pub stats: RunStats,
}

/// Execution engine for a single task
pub struct Reaper {
    task: Task,
    generator: Generator,
    service: Box<dyn Service>,
    limiter: RateLimiter,
    temp_dir: Option<PathBuf>,
    stats: RunStats,
}

impl Reaper {
    /// Creates a reaper for `task` using the given service adapter
    ///
    /// # Errors
    ///
    /// Fails with `ShortreapError::Generator` when the task's generator type is unknown
    /// or its options are malformed. Nothing has touched the network at that point.
    pub fn new(task: Task, service: Box<dyn Service>) -> Result<Self, ShortreapError> {
        let generator = Generator::new(&task.generator()?)?;

        let policy = service.rate_limit().unwrap_or_else(|| {
            tracing::info!(
                "Service specifies no rate limit, using default of {}",
                RateLimit::DEFAULT
            );
            RateLimit::DEFAULT
        });

        Ok(Self {
            task,
            generator,
            service,
            limiter: RateLimiter::new(policy),
            temp_dir: None,
            stats: RunStats::default(),
        })
    }

    /// Creates a reaper for `task`, looking its service up in the registry
    ///
    /// The generator is validated before the service is built.
    pub fn from_task(task: Task, config: &Config) -> Result<Self, ShortreapError> {
        Generator::new(&task.generator()?)?;
        let service = create_service(
            &task.service,
            &config.http,
            config.service_override(&task.service),
        )?;
        Ok(Self::new(task, service)?.with_temp_dir(config.worker.temp_dir.clone()))
    }

    /// Places the result stream's temporary file in `dir`
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Runs the task to completion
    ///
    /// # Returns
    ///
    /// * `Ok(ReapOutput)` - The finished result stream, rewound, plus counters
    /// * `Err(ShortreapError::Io)` - The temporary result file could not be written
    pub async fn run(mut self) -> Result<ReapOutput, ShortreapError> {
        tracing::info!(
            "Starting reaper for task {} ({} generator on {}, {})",
            self.task.id,
            self.task.generator_type,
            self.service.name(),
            self.limiter.policy()
        );

        let mut writer = ResultWriter::create(self.temp_dir.as_deref())?;
        while let Some(code) = self.generator.next() {
            self.examine(&code, &mut writer).await?;

            if self.stats.codes_examined % PROGRESS_INTERVAL == 0 {
                tracing::info!("Task {}: {}", self.task.id, self.stats);
            }
        }

        tracing::debug!("Compressing {} records", writer.records());
        let file = tokio::task::spawn_blocking(move || writer.finish())
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        tracing::info!("Finished task {}: {}", self.task.id, self.stats);

        Ok(ReapOutput {
            file,
            stats: self.stats,
        })
    }

    /// Drives one code through the retry loop
    async fn examine(&mut self, code: &str, writer: &mut ResultWriter) -> io::Result<()> {
        self.stats.codes_examined += 1;

        let mut tries = 0;
        let mut blocked = 0;
        while tries < MAX_TRIES + blocked {
            self.limiter.acquire().await;
            tracing::debug!("Fetching code {}, try {}", code, tries);
            let outcome = self.service.fetch(code).await;
            tries += 1;

            match outcome {
                FetchOutcome::Absent => {
                    tracing::debug!("Code {} does not exist", code);
                    return Ok(());
                }
                FetchOutcome::CodeBlocked => {
                    tracing::debug!("Code {} is blocked", code);
                    return Ok(());
                }
                FetchOutcome::ServiceBlocked => {
                    blocked += 1;
                    self.limiter.force_resync();
                    let delay = backoff_delay(blocked);
                    tracing::info!(
                        "Service is blocking us, sleeping for {} seconds",
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                FetchOutcome::Resolved(url) => {
                    if is_storable(&url) {
                        tracing::debug!(
                            "Code {} leads to URL '{}'",
                            code,
                            String::from_utf8_lossy(&url)
                        );
                        writer.write_record(code, &url)?;
                        self.stats.urls_found += 1;
                    } else {
                        tracing::warn!("URL for code {} contains newline", code);
                    }
                    return Ok(());
                }
                FetchOutcome::TransientError(message) => {
                    tracing::warn!("Service error ({}) on code {}", message, code);
                }
            }
        }

        tracing::debug!("Giving up on code {} after {} tries", code, tries);
        Ok(())
    }
}
