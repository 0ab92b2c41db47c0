use crate::backend::PollBackend;
use crate::models::AggregateResult;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// The final choice of one voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub poll_id: String,
    pub option_id: String,
    pub voter_id: String,
}

/// Submits the vote in the background and forwards aggregate results to the
/// session as they arrive.
///
/// Results are fetched right after the submission call returns, whether or not
/// it succeeded. Nothing is retried: a failed submission is only logged, and a
/// failed fetch leaves the session on its fallback ranking.
pub fn spawn_vote_submission<B: PollBackend>(
    backend: Arc<B>,
    submission: Submission,
    repoll: Option<Duration>,
    results_tx: UnboundedSender<Vec<AggregateResult>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let acknowledged = match backend
            .submit_vote(
                &submission.poll_id,
                &submission.option_id,
                &submission.voter_id,
            )
            .await
        {
            Ok(ack) => {
                info!(
                    "Vote for option {} in poll {} recorded ({} total)",
                    ack.option_id, ack.poll_id, ack.total_votes
                );
                true
            }
            Err(e) => {
                error!(
                    "Failed to submit vote for poll {}: {}",
                    submission.poll_id, e
                );
                false
            }
        };

        if !fetch_and_forward(backend.as_ref(), &submission.poll_id, &results_tx).await {
            return;
        }

        if let (true, Some(delay)) = (acknowledged, repoll) {
            sleep(delay).await;
            debug!("Re-polling results for poll {}", submission.poll_id);
            fetch_and_forward(backend.as_ref(), &submission.poll_id, &results_tx).await;
        }
    })
}

/// Fetches aggregate results once, without voting.
pub fn spawn_results_fetch<B: PollBackend>(
    backend: Arc<B>,
    poll_id: String,
    results_tx: UnboundedSender<Vec<AggregateResult>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        fetch_and_forward(backend.as_ref(), &poll_id, &results_tx).await;
    })
}

/// Returns false once the receiving session is gone.
async fn fetch_and_forward<B: PollBackend>(
    backend: &B,
    poll_id: &str,
    results_tx: &UnboundedSender<Vec<AggregateResult>>,
) -> bool {
    match backend.fetch_aggregate_results(poll_id).await {
        Ok(results) => {
            if results_tx.send(results).is_err() {
                debug!("Session for poll {} is gone, dropping results", poll_id);
                return false;
            }
            true
        }
        Err(e) => {
            warn!("Could not fetch results for poll {}: {}", poll_id, e);
            true
        }
    }
}
