use thiserror::Error;

/// Errors raised by the tournament engine.
///
/// `NotEnoughOptions` and `PollInactive` are configuration errors: the poll
/// content itself is unusable and retrying will not help. The remaining
/// variants mean the caller broke the engine's calling contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotingError {
    #[error("poll {poll_id} has {count} option(s), at least 2 are required")]
    NotEnoughOptions { poll_id: String, count: usize },
    #[error("poll {0} is no longer active")]
    PollInactive(String),
    #[error("no comparison is in progress")]
    NotStarted,
    #[error("the tournament is already complete")]
    AlreadyComplete,
    #[error("option {0} is not part of the current pair")]
    ChoiceNotInPair(String),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed stored data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid stored value: {0}")]
    InvalidData(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("poll {0} is no longer active")]
    PollInactive(String),
    #[error("voter {voter_id} already voted in poll {poll_id}")]
    AlreadyVoted { poll_id: String, voter_id: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Voting(#[from] VotingError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no poll has been loaded")]
    NoPollLoaded,
}
