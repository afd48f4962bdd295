use anyhow::Context;
use octocrab::models::pulls::Merge;
use octocrab::Octocrab;

use crate::error::FetchError;
use crate::poller::ChecksFeed;
use crate::target::{PullRequestRef, ResolvedTarget, Target, TargetKind};
use crate::verdict::PullRequestActions;
use crate::{Conclusion, JobRecord, JobStatus, RepositoryId, WorkflowRecord, METRICS_WORKFLOW};

const CHECK_SUITES_QUERY: &str = r#"
query($node: ID!) {
  node(id: $node) {
    ... on Commit {
      checkSuites(first: 100) {
        edges {
          node {
            workflowRun {
              workflow {
                name
              }
            }
            checkRuns(first: 100) {
              edges {
                node {
                  name
                  status
                  conclusion
                }
              }
            }
          }
        }
      }
    }
  }
}
"#;

const ENQUEUE_MUTATION: &str = r#"
mutation($pullRequestId: ID!, $expectedHeadOid: GitObjectID!) {
  enqueuePullRequest(input: {pullRequestId: $pullRequestId, expectedHeadOid: $expectedHeadOid}) {
    mergeQueueEntry {
      position
    }
  }
}
"#;

pub struct GitHubApi {
    pub client: Octocrab,
}

impl GitHubApi {
    pub fn new(token: String) -> anyhow::Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .context("Cannot create GitHub client")?;
        Ok(Self { client })
    }

    /// Finds the commit whose checks should be watched for `target`.
    pub async fn resolve(&self, target: &Target) -> anyhow::Result<ResolvedTarget> {
        let Target { repo, kind } = target;
        let (sha, pull_request) = match kind {
            TargetKind::DefaultBranch => {
                let repository: RepositoryResponse = self
                    .client
                    .get(format!("/repos/{}/{}", repo.owner, repo.name), None::<&()>)
                    .await
                    .map_err(|error| anyhow::anyhow!("Cannot load repository {repo}: {error:?}"))?;
                let branch: BranchResponse = self
                    .client
                    .get(
                        format!(
                            "/repos/{}/{}/branches/{}",
                            repo.owner, repo.name, repository.default_branch
                        ),
                        None::<&()>,
                    )
                    .await
                    .map_err(|error| {
                        anyhow::anyhow!(
                            "Cannot load branch {} of {repo}: {error:?}",
                            repository.default_branch
                        )
                    })?;
                (branch.commit.sha, None)
            }
            TargetKind::PullRequest(number) => {
                let pr: PullResponse = self
                    .client
                    .get(
                        format!("/repos/{}/{}/pulls/{number}", repo.owner, repo.name),
                        None::<&()>,
                    )
                    .await
                    .map_err(|error| {
                        anyhow::anyhow!("Cannot load pull request {repo}#{number}: {error:?}")
                    })?;
                let pull_request = PullRequestRef {
                    number: *number,
                    node_id: pr.node_id,
                };
                (pr.head.sha, Some(pull_request))
            }
            TargetKind::Commit(sha) => (sha.clone(), None),
        };

        let commit: CommitResponse = self
            .client
            .get(
                format!("/repos/{}/{}/commits/{sha}", repo.owner, repo.name),
                None::<&()>,
            )
            .await
            .map_err(|error| anyhow::anyhow!("Cannot load commit {sha} of {repo}: {error:?}"))?;

        Ok(ResolvedTarget {
            repo: repo.clone(),
            head_sha: commit.sha,
            commit_node: commit.node_id,
            pull_request,
        })
    }
}

#[async_trait::async_trait]
impl ChecksFeed for GitHubApi {
    async fn fetch_checks(&self, commit_node: &str) -> Result<Vec<WorkflowRecord>, FetchError> {
        let response: GraphQlResponse<CommitData> = self
            .client
            .graphql(&serde_json::json!({
                "query": CHECK_SUITES_QUERY,
                "variables": { "node": commit_node },
            }))
            .await?;
        parse_check_suites(response)
    }
}

#[async_trait::async_trait]
impl PullRequestActions for GitHubApi {
    async fn merge(&self, repo: &RepositoryId, number: u64) -> anyhow::Result<()> {
        let merge = self
            .client
            .pulls(repo.owner.as_str(), repo.name.as_str())
            .merge(number)
            .send()
            .await
            .map_err(|error| anyhow::anyhow!("Cannot merge {repo}#{number}: {error:?}"))?;
        ensure_merged(repo, number, &merge)
    }

    async fn enqueue(&self, pull_request_id: &str, expected_head: &str) -> anyhow::Result<()> {
        let response: GraphQlResponse<serde_json::Value> = self
            .client
            .graphql(&serde_json::json!({
                "query": ENQUEUE_MUTATION,
                "variables": {
                    "pullRequestId": pull_request_id,
                    "expectedHeadOid": expected_head,
                },
            }))
            .await
            .map_err(|error| anyhow::anyhow!("Cannot enqueue pull request: {error:?}"))?;
        if !response.errors.is_empty() {
            anyhow::bail!("Cannot enqueue pull request: {}", join_errors(&response.errors));
        }
        Ok(())
    }
}

/// Converts the check suite tree into workflow records. Check suites of apps
/// other than GitHub Actions have no workflow run and are dropped.
fn parse_check_suites(
    response: GraphQlResponse<CommitData>,
) -> Result<Vec<WorkflowRecord>, FetchError> {
    let Some(data) = response.data else {
        return Err(if response.errors.is_empty() {
            FetchError::Malformed("response has no data".to_string())
        } else {
            FetchError::Api(join_errors(&response.errors))
        });
    };
    let node = data
        .node
        .ok_or_else(|| FetchError::Malformed("commit node not found".to_string()))?;
    let suites = node
        .check_suites
        .ok_or_else(|| FetchError::Malformed("node is not a commit".to_string()))?;

    let workflows = suites
        .edges
        .into_iter()
        .filter_map(|edge| {
            let suite = edge.node;
            let name = suite.workflow_run?.workflow.name;
            if name == METRICS_WORKFLOW {
                return None;
            }
            let jobs = suite
                .check_runs
                .edges
                .into_iter()
                .map(|edge| {
                    let run = edge.node;
                    JobRecord::new(
                        run.name,
                        JobStatus::from(run.status.as_str()),
                        run.conclusion.as_deref().map(Conclusion::from),
                    )
                })
                .collect();
            Some(WorkflowRecord::new(name, jobs))
        })
        .collect();
    Ok(workflows)
}

fn ensure_merged(repo: &RepositoryId, number: u64, merge: &Merge) -> anyhow::Result<()> {
    if !merge.merged {
        anyhow::bail!(
            "{repo}#{number} was not merged: {}",
            merge.message.as_deref().unwrap_or("no reason given")
        );
    }
    Ok(())
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(serde::Deserialize, Debug)]
struct RepositoryResponse {
    default_branch: String,
}

#[derive(serde::Deserialize, Debug)]
struct BranchCommit {
    sha: String,
}

#[derive(serde::Deserialize, Debug)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(serde::Deserialize, Debug)]
struct PullHead {
    sha: String,
}

#[derive(serde::Deserialize, Debug)]
struct PullResponse {
    node_id: String,
    head: PullHead,
}

#[derive(serde::Deserialize, Debug)]
struct CommitResponse {
    sha: String,
    node_id: String,
}

#[derive(serde::Deserialize, Debug)]
struct GraphQlError {
    message: String,
}

#[derive(serde::Deserialize, Debug)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(serde::Deserialize, Debug)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(serde::Deserialize, Debug)]
struct Edge<T> {
    node: T,
}

#[derive(serde::Deserialize, Debug)]
struct CommitData {
    node: Option<CommitNode>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitNode {
    check_suites: Option<Connection<CheckSuiteNode>>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CheckSuiteNode {
    workflow_run: Option<WorkflowRunNode>,
    check_runs: Connection<CheckRunNode>,
}

#[derive(serde::Deserialize, Debug)]
struct WorkflowRunNode {
    workflow: WorkflowNode,
}

#[derive(serde::Deserialize, Debug)]
struct WorkflowNode {
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct CheckRunNode {
    name: String,
    status: String,
    conclusion: Option<String>,
}
