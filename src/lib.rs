use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

pub mod announce;
pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod render;
pub mod status;
pub mod store;
pub mod target;
pub mod verdict;

/// Provider-internal workflow that never takes part in a check run verdict.
pub const METRICS_WORKFLOW: &str = "workflow_metrics";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryId {
    pub owner: String,
    pub name: String,
}

impl Display for RepositoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    /// Waiting, pending or requested: not started, not queued yet.
    Waiting,
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "QUEUED" => JobStatus::Queued,
            "IN_PROGRESS" => JobStatus::InProgress,
            "COMPLETED" => JobStatus::Completed,
            _ => JobStatus::Waiting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    /// Any conclusion the status reduction does not know how to interpret
    /// (cancelled, skipped, timed out, ...). Keeps the raw provider value.
    Other(String),
}

impl From<&str> for Conclusion {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "SUCCESS" => Conclusion::Success,
            "FAILURE" => Conclusion::Failure,
            "NEUTRAL" => Conclusion::Neutral,
            _ => Conclusion::Other(value.to_string()),
        }
    }
}

impl Display for Conclusion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Conclusion::Success => f.write_str("SUCCESS"),
            Conclusion::Failure => f.write_str("FAILURE"),
            Conclusion::Neutral => f.write_str("NEUTRAL"),
            Conclusion::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub status: JobStatus,
    pub conclusion: Option<Conclusion>,
}

impl JobRecord {
    pub fn new(name: impl Into<String>, status: JobStatus, conclusion: Option<Conclusion>) -> Self {
        Self {
            name: name.into(),
            status,
            conclusion,
        }
    }

    pub fn is_completed_with(&self, conclusion: &Conclusion) -> bool {
        self.status == JobStatus::Completed && self.conclusion.as_ref() == Some(conclusion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    pub name: String,
    pub jobs: Vec<JobRecord>,
}

impl WorkflowRecord {
    pub fn new(name: impl Into<String>, jobs: Vec<JobRecord>) -> Self {
        Self {
            name: name.into(),
            jobs,
        }
    }
}

/// Complete view of every workflow attached to a commit at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub workflows: Vec<WorkflowRecord>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(workflows: Vec<WorkflowRecord>) -> Self {
        Self {
            workflows,
            fetched_at: Utc::now(),
        }
    }
}

/// Workflow and job names excluded from aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSet(HashSet<String>);

impl SkipSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }
}

impl<S: Into<String>> FromIterator<S> for SkipSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    /// Nothing is running anymore, but a failure was ignored on request.
    Finished,
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Passed => f.write_str("passed"),
            Verdict::Failed => f.write_str("failed"),
            Verdict::Finished => f.write_str("finished"),
        }
    }
}
