//! Interval loops for the two scheduled jobs.

use std::time::Duration;

use jobroute_pipeline::{
    AssignmentPipeline, PipelineError, Ports, RecurrenceScanner, ScanSummary, SyncSummary,
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Runs the recurring-task scan and the assignment sync, once or forever.
pub struct Scheduler {
    pipeline: AssignmentPipeline,
    scanner: RecurrenceScanner,
    config: WorkerConfig,
}

impl Scheduler {
    pub fn new(ports: Ports, config: WorkerConfig) -> Self {
        Self {
            pipeline: AssignmentPipeline::new(ports.clone(), config.routing.clone()),
            scanner: RecurrenceScanner::new(ports),
            config,
        }
    }

    /// One recurring-task scan.
    pub async fn run_recurring_tasks(&self) -> Result<ScanSummary, PipelineError> {
        let summary = self.scanner.run().await?;
        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            already_running = summary.already_running,
            "Recurring-task scan finished"
        );
        Ok(summary)
    }

    /// One assignment sync over entities created within the lookback window.
    pub async fn sync_assignments(&self) -> Result<SyncSummary, PipelineError> {
        let since = self.pipeline.ports().clock.now() - self.config.sync_lookback;
        tracing::debug!(%since, "Starting assignment sync");
        self.pipeline.sync(since).await
    }

    /// Run both loops until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        tokio::join!(
            self.recurrence_loop(cancel.clone()),
            self.sync_loop(cancel),
        );
    }

    /// Scan for due recurring tasks every `recurrence_interval`.
    ///
    /// The first scan happens immediately.
    pub async fn recurrence_loop(&self, cancel: CancellationToken) {
        let mut interval = ticker(self.config.recurrence_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Recurring-task loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_recurring_tasks().await {
                        tracing::error!(error = %e, "Recurring-task scan failed");
                    }
                }
            }
        }
    }

    /// Sync assignments every `sync_interval`.
    ///
    /// The first sync happens immediately.
    pub async fn sync_loop(&self, cancel: CancellationToken) {
        let mut interval = ticker(self.config.sync_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Assignment sync loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sync_assignments().await {
                        tracing::error!(error = %e, "Assignment sync failed");
                    }
                }
            }
        }
    }
}

// A scan that overruns its slot is not followed by a burst of catch-up scans.
fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
