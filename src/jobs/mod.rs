// src/jobs/mod.rs
//!
//! Job host boundary
//!
//! Runs one named long-running archive job at a time on top of the
//! driver: per-member progress events, a terminal outcome, cancellation
//! observable within one member-processing step, and toast-style
//! notifications mapped one-to-one from taxonomy kind. The mapping is
//! pure presentation; nothing here adds driver semantics.

use crate::driver::{CompressProgress, Driver};
use crate::entry::Entry;
use crate::error::DriverError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;


/// Event names for job lifecycle consumers.
pub const EVENT_JOB_PROGRESS: &str = "jobs:progress";
pub const EVENT_JOB_COMPLETE: &str = "jobs:complete";
pub const EVENT_JOB_FAILED: &str = "jobs:failed";

// ============================================================================
// Types
// ============================================================================

/// One progress emission per completed archive member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: String,
    pub job_name: String,
    /// Members completed so far, this one included.
    pub completed: u64,
    /// Total members the job was asked to process.
    pub total: u64,
    pub entry: Entry,
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum JobOutcome {
    Completed { processed: u64 },
    Failed { message: String },
    Cancelled { processed: u64 },
}

/// Toast-style notification sink. The UI shell supplies its own
/// implementation; [`LogNotifier`] routes to the log stream.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Default notifier: structured log lines instead of a toast surface.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) {
        info!(title = %title, body = %body, "notification");
    }
}

/// One-to-one mapping from taxonomy kind to user-facing toast text.
pub fn toast_message(error: &DriverError) -> String {
    match error {
        DriverError::NotFound { path } => format!("{path} no longer exists"),
        DriverError::AlreadyExists { path } => format!("{path} already exists"),
        DriverError::DirectoryExpected { path } => format!("{path} is not a folder"),
        DriverError::UnsupportedArchiveFormat { path } => {
            format!("{path} is not a supported archive")
        }
        DriverError::EncryptedArchive { path } => {
            format!("{path} is password-protected and cannot be extracted")
        }
        DriverError::SplitArchive { path } => {
            format!("{path} is part of a split archive and cannot be extracted")
        }
        DriverError::InvalidArchive { path } => format!("{path} is damaged"),
        DriverError::OutOfMemory { path } => format!("{path} is too large to open"),
        DriverError::Io { path, .. } => format!("A device error occurred at {path}"),
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Consumer side of a running job.
pub struct JobHandle {
    pub id: String,
    pub name: String,
    cancel: CancellationToken,
    progress: mpsc::Receiver<JobProgress>,
    outcome: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    /// Request cancellation; the job observes it within one
    /// member-processing step. Already-completed members stay in place.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn next_progress(&mut self) -> Option<JobProgress> {
        self.progress.recv().await
    }

    /// Wait for the terminal outcome, discarding unread progress.
    pub async fn outcome(self) -> JobOutcome {
        self.outcome.await.unwrap_or(JobOutcome::Failed {
            message: "job task was dropped".to_string(),
        })
    }
}

// ============================================================================
// Host
// ============================================================================

/// Schedules a single named archive job at a time against a driver.
pub struct JobHost {
    driver: Arc<Driver>,
    notifier: Arc<dyn Notifier>,
}

impl JobHost {
    pub fn new(driver: Arc<Driver>, notifier: Arc<dyn Notifier>) -> Self {
        JobHost { driver, notifier }
    }

    /// Compress job. By convention all entries but the last are sources
    /// and the last is the destination directory.
    pub fn spawn_compress(
        &self,
        job_name: &str,
        mut entries: Vec<Entry>,
        archive_name: &str,
    ) -> JobHandle {
        let (handle, progress_tx, outcome_tx, cancel) = self.prepare(job_name);
        let driver = self.driver.clone();
        let notifier = self.notifier.clone();
        let job_id = handle.id.clone();
        let job_name = handle.name.clone();
        let archive_name = archive_name.to_string();

        tokio::spawn(async move {
            let Some(dest_dir) = entries.pop() else {
                let outcome = JobOutcome::Failed {
                    message: "compress job needs at least a destination".to_string(),
                };
                let _ = outcome_tx.send(outcome);
                return;
            };
            let total = entries.len() as u64;

            let progress = match driver.compress(entries, &dest_dir, &archive_name).await {
                Ok(progress) => progress,
                Err(e) => {
                    finish_failed(&notifier, &job_name, e, outcome_tx).await;
                    return;
                }
            };

            let outcome = drive_members(
                progress,
                &job_id,
                &job_name,
                total,
                &progress_tx,
                &cancel,
            )
            .await;
            finish(&notifier, &job_name, outcome, outcome_tx).await;
        });

        handle
    }

    /// Extraction job. By convention the first entry is the archive
    /// source and the last the destination directory.
    pub fn spawn_decompress(&self, job_name: &str, entries: Vec<Entry>) -> JobHandle {
        let (handle, progress_tx, outcome_tx, cancel) = self.prepare(job_name);
        let driver = self.driver.clone();
        let notifier = self.notifier.clone();
        let job_id = handle.id.clone();
        let job_name = handle.name.clone();

        tokio::spawn(async move {
            let (Some(source), Some(dest_dir)) = (entries.first(), entries.last()) else {
                let outcome = JobOutcome::Failed {
                    message: "extract job needs a source and a destination".to_string(),
                };
                let _ = outcome_tx.send(outcome);
                return;
            };

            let result = tokio::select! {
                result = driver.decompress(source, dest_dir) => result,
                _ = cancel.cancelled() => {
                    let _ = outcome_tx.send(JobOutcome::Cancelled { processed: 0 });
                    return;
                }
            };

            match result {
                Ok(entry) => {
                    let _ = progress_tx
                        .send(JobProgress {
                            job_id,
                            job_name: job_name.clone(),
                            completed: 1,
                            total: 1,
                            entry,
                        })
                        .await;
                    finish(
                        &notifier,
                        &job_name,
                        JobOutcome::Completed { processed: 1 },
                        outcome_tx,
                    )
                    .await;
                }
                Err(e) => finish_failed(&notifier, &job_name, e, outcome_tx).await,
            }
        });

        handle
    }

    fn prepare(
        &self,
        job_name: &str,
    ) -> (
        JobHandle,
        mpsc::Sender<JobProgress>,
        oneshot::Sender<JobOutcome>,
        CancellationToken,
    ) {
        let (progress_tx, progress_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let handle = JobHandle {
            id: Uuid::new_v4().to_string(),
            name: job_name.to_string(),
            cancel: cancel.clone(),
            progress: progress_rx,
            outcome: outcome_rx,
        };
        (handle, progress_tx, outcome_tx, cancel)
    }
}

/// Pump the driver's compress sequence, relaying progress until it is
/// exhausted, fails, or the cancellation token fires. Dropping the
/// sequence is what stops the producer at the next member boundary.
async fn drive_members(
    mut progress: CompressProgress,
    job_id: &str,
    job_name: &str,
    total: u64,
    progress_tx: &mpsc::Sender<JobProgress>,
    cancel: &CancellationToken,
) -> JobOutcome {
    let mut processed = 0u64;
    loop {
        let item = tokio::select! {
            item = progress.next() => item,
            _ = cancel.cancelled() => {
                return JobOutcome::Cancelled { processed };
            }
        };
        match item {
            Some(Ok(entry)) => {
                processed += 1;
                let update = JobProgress {
                    job_id: job_id.to_string(),
                    job_name: job_name.to_string(),
                    completed: processed,
                    total,
                    entry,
                };
                // A consumer that stopped reading must not pin the job
                // past a cancellation request.
                tokio::select! {
                    _ = progress_tx.send(update) => {}
                    _ = cancel.cancelled() => {
                        return JobOutcome::Cancelled { processed };
                    }
                }
            }
            Some(Err(e)) => {
                return JobOutcome::Failed {
                    message: toast_message(&e),
                };
            }
            None => return JobOutcome::Completed { processed },
        }
    }
}

async fn finish(
    notifier: &Arc<dyn Notifier>,
    job_name: &str,
    outcome: JobOutcome,
    outcome_tx: oneshot::Sender<JobOutcome>,
) {
    match &outcome {
        JobOutcome::Completed { .. } => {
            notifier.notify(job_name, "Finished").await;
        }
        JobOutcome::Failed { message } => {
            warn!(job = %job_name, message = %message, "job failed");
            notifier.notify(job_name, message).await;
        }
        JobOutcome::Cancelled { .. } => {
            notifier.notify(job_name, "Cancelled").await;
        }
    }
    let _ = outcome_tx.send(outcome);
}

async fn finish_failed(
    notifier: &Arc<dyn Notifier>,
    job_name: &str,
    error: DriverError,
    outcome_tx: oneshot::Sender<JobOutcome>,
) {
    finish(
        notifier,
        job_name,
        JobOutcome::Failed {
            message: toast_message(&error),
        },
        outcome_tx,
    )
    .await;
}
