use std::fmt::{Display, Formatter};

use crate::config::ActionFlags;
use crate::target::ResolvedTarget;
use crate::{RepositoryId, Verdict};

impl Verdict {
    pub fn exit_code(self) -> u8 {
        match self {
            Verdict::Passed | Verdict::Finished => 0,
            Verdict::Failed => 1,
        }
    }
}

/// Exit code for errors that end the run without a verdict.
pub const FATAL_EXIT_CODE: u8 = 2;

#[async_trait::async_trait]
pub trait PullRequestActions: Send + Sync {
    async fn merge(&self, repo: &RepositoryId, number: u64) -> anyhow::Result<()>;

    async fn enqueue(&self, pull_request_id: &str, expected_head: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, message: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Merge,
    Enqueue,
    Announce,
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Merge => f.write_str("merge"),
            Action::Enqueue => f.write_str("enqueue"),
            Action::Announce => f.write_str("announce"),
        }
    }
}

#[derive(Debug)]
pub enum ActionOutcome {
    Done(Action),
    /// Requested, but the target is not a pull request.
    Skipped(Action),
    Failed(Action, anyhow::Error),
}

impl Display for ActionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOutcome::Done(Action::Merge) => f.write_str("Pull request merged."),
            ActionOutcome::Done(Action::Enqueue) => f.write_str("Pull request added to the merge queue."),
            ActionOutcome::Done(Action::Announce) => f.write_str("Result announced."),
            ActionOutcome::Skipped(action) => {
                write!(f, "Cannot {action}: target is not a pull request.")
            }
            ActionOutcome::Failed(action, error) => write!(f, "Cannot {action}: {error:#}"),
        }
    }
}

#[derive(Debug)]
pub struct VerdictReport {
    pub verdict: Verdict,
    pub exit_code: u8,
    pub outcomes: Vec<ActionOutcome>,
}

pub struct VerdictDriver<'a> {
    pub target: &'a ResolvedTarget,
    pub flags: ActionFlags,
    pub actions: &'a dyn PullRequestActions,
    pub announcer: &'a dyn Announcer,
}

impl VerdictDriver<'_> {
    /// Fires the requested side effects once. Their failures are reported in the
    /// outcomes but never change the exit code.
    pub async fn conclude(&self, verdict: Verdict) -> VerdictReport {
        let mut outcomes = vec![];

        if verdict == Verdict::Passed {
            outcomes.extend(self.pull_request_actions().await);
        }
        if self.flags.announce {
            let message = format!("Checks {verdict} for {}", self.target.repo);
            outcomes.push(match self.announcer.announce(&message).await {
                Ok(()) => ActionOutcome::Done(Action::Announce),
                Err(error) => ActionOutcome::Failed(Action::Announce, error),
            });
        }
        for outcome in &outcomes {
            if let ActionOutcome::Failed(action, error) = outcome {
                log::error!("Post-verdict {action} failed: {error:?}");
            }
        }

        VerdictReport {
            verdict,
            exit_code: verdict.exit_code(),
            outcomes,
        }
    }

    async fn pull_request_actions(&self) -> Vec<ActionOutcome> {
        let mut outcomes = vec![];
        let Some(pr) = &self.target.pull_request else {
            if self.flags.merge {
                outcomes.push(ActionOutcome::Skipped(Action::Merge));
            }
            if self.flags.enqueue {
                outcomes.push(ActionOutcome::Skipped(Action::Enqueue));
            }
            return outcomes;
        };

        let merge = async {
            if !self.flags.merge {
                return None;
            }
            Some(match self.actions.merge(&self.target.repo, pr.number).await {
                Ok(()) => ActionOutcome::Done(Action::Merge),
                Err(error) => ActionOutcome::Failed(Action::Merge, error),
            })
        };
        let enqueue = async {
            if !self.flags.enqueue {
                return None;
            }
            Some(match self.actions.enqueue(&pr.node_id, &self.target.head_sha).await {
                Ok(()) => ActionOutcome::Done(Action::Enqueue),
                Err(error) => ActionOutcome::Failed(Action::Enqueue, error),
            })
        };
        let (merged, enqueued) = futures_util::future::join(merge, enqueue).await;
        outcomes.extend(merged);
        outcomes.extend(enqueued);
        outcomes
    }
}
