use crate::error::BackendError;
use crate::models::{AggregateResult, Poll, VoteAck};
use async_trait::async_trait;

/// The store behind a voting session: poll content, vote submission and
/// aggregate statistics. `db::Database` is the SQLite implementation.
#[async_trait]
pub trait PollBackend: Send + Sync + 'static {
    async fn fetch_poll(&self, poll_id: &str) -> Result<Poll, BackendError>;

    /// Records the final choice of one voter. Only the winner is stored,
    /// never the bracket path that led to it.
    async fn submit_vote(
        &self,
        poll_id: &str,
        option_id: &str,
        voter_id: &str,
    ) -> Result<VoteAck, BackendError>;

    /// Per-option statistics, best first.
    async fn fetch_aggregate_results(
        &self,
        poll_id: &str,
    ) -> Result<Vec<AggregateResult>, BackendError>;

    /// The option a voter already chose in this poll, if any.
    async fn has_voted(
        &self,
        poll_id: &str,
        voter_id: &str,
    ) -> Result<Option<String>, BackendError>;
}
