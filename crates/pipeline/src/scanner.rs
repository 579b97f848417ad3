//! Hourly scan over due recurring tasks.

use std::fmt;

use jobroute_core::recurrence::{evaluate, DueSelector, Transition};
use jobroute_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::error::PipelineError;
use crate::ports::{Ports, RunKind};

/// Tally of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Tasks that were advanced, blocked or ended.
    pub processed: usize,
    /// Tasks that could not be evaluated or persisted.
    pub skipped: usize,
    /// Another scan held the run lock; nothing was done.
    pub already_running: bool,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.already_running {
            return f.write_str("Skipped: a recurring-task scan is already running");
        }
        write!(f, "Done! Processed: {}, Skipped: {}", self.processed, self.skipped)
    }
}

enum TaskResult {
    Processed,
    Skipped,
}

pub struct RecurrenceScanner {
    ports: Ports,
}

impl RecurrenceScanner {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Evaluate every due task once.
    ///
    /// Per-task problems are logged and counted as skipped; only a failure
    /// to take the lock or list due tasks aborts the scan.
    pub async fn run(&self) -> Result<ScanSummary, PipelineError> {
        let Some(lease) = self.ports.run_lock.try_acquire(RunKind::RecurringTasks).await? else {
            tracing::warn!("Recurring-task scan already running, skipping");
            return Ok(ScanSummary {
                already_running: true,
                ..ScanSummary::default()
            });
        };

        let result = self.scan().await;
        if let Err(e) = lease.release().await {
            tracing::error!(error = %e, "Failed to release recurring-task lock");
        }
        result
    }

    async fn scan(&self) -> Result<ScanSummary, PipelineError> {
        let now = self.ports.clock.now();
        let selector = DueSelector::at(now);
        let due = self.ports.tasks.due_task_ids(selector.cutoff()).await?;

        let mut summary = ScanSummary::default();
        if due.is_empty() {
            tracing::debug!(cutoff = %selector.cutoff(), "No recurring tasks due");
            return Ok(summary);
        }

        for task_id in due {
            match self.process(task_id, now).await {
                TaskResult::Processed => summary.processed += 1,
                TaskResult::Skipped => summary.skipped += 1,
            }
        }

        tracing::info!(
            processed = summary.processed,
            skipped = summary.skipped,
            "Recurring-task scan finished"
        );
        Ok(summary)
    }

    async fn process(&self, task_id: DbId, now: Timestamp) -> TaskResult {
        let task = match self.ports.tasks.load(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::warn!(task_id, "Due task disappeared before evaluation");
                return TaskResult::Skipped;
            }
            Err(e) => {
                tracing::error!(task_id, error = %e, "Failed to load due task");
                return TaskResult::Skipped;
            }
        };
        let Some(expected) = task.recurring_at else {
            tracing::warn!(task_id, "Due task no longer has a next occurrence");
            return TaskResult::Skipped;
        };

        let transition = match evaluate(&task, now) {
            Ok(t) => t,
            Err(e) => {
                let err = e.for_task(task_id);
                tracing::error!(task_id, error = %err, "Cannot advance recurring task");
                return TaskResult::Skipped;
            }
        };

        let mut updated = task.clone();
        transition.apply_to(&mut updated);

        match self
            .ports
            .tasks
            .apply_transition(&updated, expected, transition.history())
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(task_id, "Recurring task changed concurrently, leaving it");
                return TaskResult::Skipped;
            }
            Err(e) => {
                tracing::error!(task_id, error = %e, "Failed to persist recurrence");
                return TaskResult::Skipped;
            }
        }

        tracing::debug!(task_id, transition = transition.name(), "Recurring task evaluated");
        if let Transition::Advanced { pattern, .. } = &transition {
            self.ports
                .notifier
                .task_recurred(&updated, pattern.current_iteration);
        }
        TaskResult::Processed
    }
}
