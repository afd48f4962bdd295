use thiserror::Error;

use crate::RepositoryId;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("`{0}` is not a GitHub URL")]
    NotGitHub(String),

    #[error("`{0}` does not name a repository, expected https://github.com/<owner>/<repo>")]
    MissingRepository(String),

    #[error("Invalid pull request number `{0}`")]
    InvalidPullRequest(String),

    #[error("Missing {0} after `{1}`")]
    MissingIdentifier(&'static str, String),

    #[error("Unsupported target kind `{0}`, expected `pull` or `commit`")]
    UnsupportedKind(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    DefaultBranch,
    PullRequest(u64),
    Commit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub repo: RepositoryId,
    pub kind: TargetKind,
}

impl Target {
    /// Parses `https://github.com/<owner>/<repo>[/pull/<n>|/commit/<sha>]`.
    pub fn parse(url: &str) -> Result<Self, TargetError> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let mut parts = rest.split('/').filter(|part| !part.is_empty());

        match parts.next() {
            Some("github.com" | "www.github.com") => {}
            _ => return Err(TargetError::NotGitHub(url.to_string())),
        }
        let (Some(owner), Some(name)) = (parts.next(), parts.next()) else {
            return Err(TargetError::MissingRepository(url.to_string()));
        };
        let repo = RepositoryId {
            owner: owner.to_string(),
            name: name.trim_end_matches(".git").to_string(),
        };

        let kind = match parts.next() {
            None => TargetKind::DefaultBranch,
            Some("pull") => {
                let number = parts
                    .next()
                    .ok_or_else(|| TargetError::MissingIdentifier("pull request number", url.to_string()))?;
                let number = number
                    .parse()
                    .map_err(|_| TargetError::InvalidPullRequest(number.to_string()))?;
                TargetKind::PullRequest(number)
            }
            Some("commit") => {
                let sha = parts
                    .next()
                    .ok_or_else(|| TargetError::MissingIdentifier("commit sha", url.to_string()))?;
                TargetKind::Commit(sha.to_string())
            }
            Some(kind) => return Err(TargetError::UnsupportedKind(kind.to_string())),
        };
        Ok(Self { repo, kind })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    /// GraphQL node id, used to enqueue the pull request.
    pub node_id: String,
}

/// A target resolved against GitHub down to the commit whose checks are watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub repo: RepositoryId,
    pub head_sha: String,
    /// GraphQL node id of the commit.
    pub commit_node: String,
    pub pull_request: Option<PullRequestRef>,
}
