//! Well-known task label names.
//!
//! Workflow labels describe where a task is in its lifecycle; a task carries
//! at most one of them. Every other label is a plain tag and survives a
//! recurrence reset untouched.

pub const LABEL_NOT_STARTED: &str = "not_started";
pub const LABEL_IN_PROGRESS: &str = "in_progress";
pub const LABEL_IN_REVIEW: &str = "in_review";
pub const LABEL_DONE: &str = "done";

/// All workflow (status) labels.
pub const WORKFLOW_LABELS: [&str; 4] = [
    LABEL_NOT_STARTED,
    LABEL_IN_PROGRESS,
    LABEL_IN_REVIEW,
    LABEL_DONE,
];

/// Tag on tasks created for a job-seeker assignment.
pub const LABEL_JOB_SEEKER: &str = "job_seeker";

/// Tag on tasks created for an employer assignment.
pub const LABEL_EMPLOYER: &str = "employer";

/// Tag on social-share tasks created for a job post.
pub const LABEL_JOB_SHARE: &str = "job_share";

pub fn is_workflow_label(label: &str) -> bool {
    WORKFLOW_LABELS.contains(&label)
}
