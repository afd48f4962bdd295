use std::fmt::{Display, Formatter};

use crate::{Conclusion, JobRecord, JobStatus, SkipSet, WorkflowRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Success,
    Failure,
    InProgress,
}

impl Display for WorkflowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Success => f.write_str("SUCCESS"),
            WorkflowStatus::Failure => f.write_str("FAILURE"),
            WorkflowStatus::InProgress => f.write_str("IN_PROGRESS"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("All jobs of workflow `{workflow}` completed but status unknown: {}", describe_jobs(.jobs))]
    UnknownConclusion {
        workflow: String,
        jobs: Vec<JobRecord>,
    },
}

fn describe_jobs(jobs: &[JobRecord]) -> String {
    jobs.iter()
        .map(|job| match &job.conclusion {
            Some(conclusion) => format!("{}={conclusion}", job.name),
            None => format!("{}=<none>", job.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Jobs of the workflow that are not skipped.
pub fn visible_jobs<'a>(
    workflow: &'a WorkflowRecord,
    skip: &'a SkipSet,
) -> impl Iterator<Item = &'a JobRecord> + 'a {
    workflow.jobs.iter().filter(|job| !skip.contains(&job.name))
}

/// Reduces the (non-skipped) jobs of a workflow into one status.
///
/// A failed job marks the whole workflow failed even while its siblings are
/// still running. An empty job set (nothing left after skipping) is a success.
pub fn classify(workflow: &WorkflowRecord, skip: &SkipSet) -> Result<WorkflowStatus, ClassifyError> {
    let jobs: Vec<&JobRecord> = visible_jobs(workflow, skip).collect();

    if jobs.iter().any(|job| job.is_completed_with(&Conclusion::Failure)) {
        return Ok(WorkflowStatus::Failure);
    }
    if jobs.iter().all(|job| {
        job.is_completed_with(&Conclusion::Success) || job.is_completed_with(&Conclusion::Neutral)
    }) {
        return Ok(WorkflowStatus::Success);
    }
    if jobs.iter().all(|job| job.status == JobStatus::Completed) {
        return Err(ClassifyError::UnknownConclusion {
            workflow: workflow.name.clone(),
            jobs: jobs.into_iter().cloned().collect(),
        });
    }
    Ok(WorkflowStatus::InProgress)
}
