use std::time::Duration;
use thiserror::Error;

use crate::types::stage::Stage;

/// Unified error type for the library.
///
/// Every variant carries enough information for the orchestrator to decide
/// whether a user-triggered retry makes sense (`can_retry`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Remote error: HTTP {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Request timed out: no terminal signal within {after:?}")]
    Timeout { after: Duration },

    #[error("Request failed after {retries} retries: {message}")]
    RetriesExhausted { retries: u32, message: String },

    #[error("Pipeline inconsistency: {0}")]
    Guard(#[from] GuardError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether offering the user a retry of the failed stage is sensible.
    ///
    /// Guard violations are not retryable: they indicate the pipeline reached
    /// an inconsistent shape and require a full restart.
    pub fn can_retry(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Remote { retryable, .. } => *retryable,
            Error::Timeout { .. } => true,
            Error::RetriesExhausted { .. } => true,
            Error::Guard(_) => false,
            Error::Serialization(_) => false,
        }
    }
}

/// Violations of the pipeline's structural invariants.
///
/// These are fatal to the current attempt and never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("stage {stage:?} requires the {missing:?} contribution, which is missing or blank")]
    MissingContext { stage: Stage, missing: Stage },

    #[error("another stage is still in flight; the pipeline is single-flight")]
    AlreadyProcessing,

    #[error("stage {stage:?} already has a recorded contribution")]
    AlreadyRecorded { stage: Stage },

    #[error("a discussion is already under way; restart it instead")]
    AlreadyStarted,

    #[error("the discussion topic is empty")]
    EmptyTopic,

    #[error("no discussion has been started")]
    NotStarted,

    #[error("there is no failed stage to retry")]
    NothingToRetry,
}
