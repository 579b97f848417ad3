//! Recurring task state machine.
//!
//! A recurring task carries a [`RecurrencePattern`] in its meta and a
//! `recurring_at` timestamp for its next occurrence. Once that timestamp
//! falls inside (or before) the current hour bucket the task is due and
//! [`evaluate`] decides what happens to it:
//!
//! ```text
//! NotDue ──(recurring_at < cutoff)──► Due ──► Blocked   (completion required, not completed)
//!                                        ├──► Advanced  (reset, iteration + 1, next slot)
//!                                        └──► Ended     (end date / repetition cap reached)
//! ```
//!
//! A blocked task is re-checked at the start of every following hour, and
//! its `recurring_at` moves with each check. Once it is completed the next
//! slot is stepped from that later hour, so a task finished late keeps the
//! hour it was unblocked in rather than its original slot. A blocked task
//! whose pattern has no slot after the open one ends instead of waiting.
//!
//! Everything here is pure; the scanner in the pipeline crate loads tasks,
//! calls [`evaluate`], and persists the [`Transition`].

use chrono::{DurationRound, Months, NaiveDate, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::CoreError;
use crate::labels::{is_workflow_label, LABEL_NOT_STARTED};
use crate::task::{CompletionRecord, Task};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// How often a task re-activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    /// Same day next month, clamped to the last day of shorter months.
    Monthly,
    /// Every `days` days.
    Interval { days: u32 },
}

/// The rule stored under `meta.recurring` on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// 1-based number of the occurrence currently open.
    #[serde(default = "first_iteration")]
    pub current_iteration: u32,
    /// Last calendar date (inclusive) on which an occurrence may start.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Total number of occurrences, including the first.
    #[serde(default)]
    pub max_repetitions: Option<u32>,
    /// When set, an occurrence is not rolled over until someone completes it.
    #[serde(default)]
    pub task_completion_required: bool,
}

fn first_iteration() -> u32 {
    1
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            current_iteration: first_iteration(),
            end_date: None,
            max_repetitions: None,
            task_completion_required: false,
        }
    }

    fn validate(&self) -> Result<(), RecurrenceError> {
        if let Frequency::Interval { days: 0 } = self.frequency {
            return Err(RecurrenceError::ZeroInterval);
        }
        if self.current_iteration == 0 {
            return Err(RecurrenceError::InvalidIteration(self.current_iteration));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a task's stored pattern cannot be advanced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecurrenceError {
    #[error("task has no recurrence pattern")]
    MissingPattern,

    #[error("task has no next occurrence timestamp")]
    MissingSchedule,

    #[error("pattern cannot be read: {0}")]
    Unreadable(String),

    #[error("interval must be at least one day")]
    ZeroInterval,

    #[error("iteration counter must start at 1, found {0}")]
    InvalidIteration(u32),

    #[error("next occurrence is out of the representable date range")]
    Overflow,

    #[error("iteration counter cannot be incremented past {}", u32::MAX)]
    IterationOverflow,
}

impl RecurrenceError {
    /// Attach the task id, producing the domain-level error.
    pub fn for_task(self, task_id: DbId) -> CoreError {
        CoreError::MalformedRecurrencePattern {
            task_id,
            reason: self.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Due selection
// ---------------------------------------------------------------------------

/// Truncate a timestamp to the start of its hour.
pub fn hour_bucket(ts: Timestamp) -> Timestamp {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Decides which `recurring_at` values are due at a given instant.
///
/// A task is due when its `recurring_at` lies before the end of the current
/// hour bucket. Tasks from buckets an interrupted run never reached are due
/// too; an advanced task has moved past the cutoff and is not selected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueSelector {
    cutoff: Timestamp,
}

impl DueSelector {
    pub fn at(now: Timestamp) -> Self {
        Self {
            cutoff: hour_bucket(now) + TimeDelta::hours(1),
        }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::at(clock.now())
    }

    /// Exclusive upper bound for due `recurring_at` values.
    pub fn cutoff(&self) -> Timestamp {
        self.cutoff
    }

    pub fn is_due(&self, recurring_at: Timestamp) -> bool {
        recurring_at < self.cutoff
    }

    /// Ids of the due tasks among `tasks`, in input order.
    pub fn select<'a, I>(&self, tasks: I) -> Vec<DbId>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        tasks
            .into_iter()
            .filter(|t| t.recurring_at.is_some_and(|at| self.is_due(at)))
            .map(|t| t.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Occurrence arithmetic
// ---------------------------------------------------------------------------

fn step(frequency: Frequency, from: Timestamp) -> Result<Timestamp, RecurrenceError> {
    let next = match frequency {
        Frequency::Daily => from.checked_add_signed(TimeDelta::days(1)),
        Frequency::Weekly => from.checked_add_signed(TimeDelta::weeks(1)),
        Frequency::Monthly => from.checked_add_months(Months::new(1)),
        Frequency::Interval { days } => from.checked_add_signed(TimeDelta::days(i64::from(days))),
    };
    next.ok_or(RecurrenceError::Overflow)
}

/// The occurrence following `from`, or `None` when the pattern is exhausted.
pub fn next_occurrence(
    pattern: &RecurrencePattern,
    from: Timestamp,
) -> Result<Option<Timestamp>, RecurrenceError> {
    pattern.validate()?;

    if let Some(max) = pattern.max_repetitions {
        if pattern.current_iteration >= max {
            return Ok(None);
        }
    }

    let candidate = step(pattern.frequency, from)?;
    if let Some(end) = pattern.end_date {
        if candidate.date_naive() > end {
            return Ok(None);
        }
    }
    Ok(Some(candidate))
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// What the scanner must do with a due task.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Waiting for the current occurrence to be completed. Only the next
    /// check time moves; the iteration counter and task state stay put.
    Blocked { next_check_at: Timestamp },
    /// Roll over into the next occurrence.
    Advanced {
        pattern: RecurrencePattern,
        next_at: Timestamp,
        history: Option<CompletionRecord>,
    },
    /// The pattern is exhausted; the task becomes a one-shot.
    Ended { history: Option<CompletionRecord> },
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Blocked { .. } => "blocked",
            Transition::Advanced { .. } => "advanced",
            Transition::Ended { .. } => "ended",
        }
    }

    pub fn history(&self) -> Option<&CompletionRecord> {
        match self {
            Transition::Blocked { .. } => None,
            Transition::Advanced { history, .. } | Transition::Ended { history } => {
                history.as_ref()
            }
        }
    }

    /// Apply this transition to `task` in memory.
    pub fn apply_to(&self, task: &mut Task) {
        match self {
            Transition::Blocked { next_check_at } => {
                task.recurring_at = Some(*next_check_at);
            }
            Transition::Advanced {
                pattern, next_at, ..
            } => {
                reset_for_next_occurrence(task);
                task.set_recurrence_pattern(Some(pattern));
                task.recurring_at = Some(*next_at);
            }
            Transition::Ended { .. } => {
                task.set_recurrence_pattern(None);
                task.recurring_at = None;
            }
        }
    }
}

/// Decide the transition for a due task at `now`.
pub fn evaluate(task: &Task, now: Timestamp) -> Result<Transition, RecurrenceError> {
    let pattern = task
        .recurrence_pattern()?
        .ok_or(RecurrenceError::MissingPattern)?;
    pattern.validate()?;
    let recurring_at = task.recurring_at.ok_or(RecurrenceError::MissingSchedule)?;
    let selector = DueSelector::at(now);

    if pattern.task_completion_required && task.completed_at.is_none() {
        // Nothing left to wait for once the pattern has no further slot.
        if next_occurrence(&pattern, recurring_at)?.is_none() {
            return Ok(Transition::Ended { history: None });
        }
        return Ok(Transition::Blocked {
            next_check_at: selector.cutoff(),
        });
    }

    let history = task.completed_at.map(|completed_at| CompletionRecord {
        task_id: task.id,
        iteration: pattern.current_iteration,
        completed_at,
        elapsed_seconds: task.total_seconds,
        labels: task.labels.clone(),
    });

    // Step past any slots missed while no scan ran, so the task lands in the
    // future exactly once.
    let mut candidate = next_occurrence(&pattern, recurring_at)?;
    while let Some(at) = candidate {
        if !selector.is_due(at) {
            break;
        }
        candidate = next_occurrence(&pattern, at)?;
    }

    Ok(match candidate {
        Some(next_at) => Transition::Advanced {
            pattern: RecurrencePattern {
                current_iteration: pattern
                    .current_iteration
                    .checked_add(1)
                    .ok_or(RecurrenceError::IterationOverflow)?,
                ..pattern
            },
            next_at,
            history,
        },
        None => Transition::Ended { history },
    })
}

/// Put a task back into its "not started" state for a new occurrence.
///
/// Workflow labels collapse into [`LABEL_NOT_STARTED`]; every other label is
/// kept in its original order.
pub fn reset_for_next_occurrence(task: &mut Task) {
    task.completed_at = None;
    task.total_seconds = 0;
    for item in &mut task.checklist_items {
        item.done = false;
    }

    let mut labels = vec![LABEL_NOT_STARTED.to_string()];
    labels.extend(
        task.labels
            .iter()
            .filter(|l| !is_workflow_label(l))
            .cloned(),
    );
    task.labels = labels;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
