use thiserror::Error;

use crate::status::ClassifyError;

/// A poll that produced no usable data. Never fatal: the poller retries on its next tick.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub request failed: {0}")]
    Transport(#[from] octocrab::Error),

    #[error("GitHub returned errors: {0}")]
    Api(String),

    #[error("Malformed check suite payload: {0}")]
    Malformed(String),
}

/// Errors that stop the dashboard before a verdict is reached.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("Cannot write to terminal: {0}")]
    Terminal(#[from] std::io::Error),
}
