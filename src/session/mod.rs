use crate::backend::PollBackend;
use crate::config::SessionSettings;
use crate::error::SessionError;
use crate::models::{AggregateResult, Poll, PollOption};
use crate::tasks::vote_submitter::{spawn_results_fetch, spawn_vote_submission, Submission};
use crate::voting::results::RankingBoard;
use crate::voting::tournament::{ChoiceOutcome, Initialized, Progress, Tournament, TournamentState};
use crate::voting::Ranking;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Started,
    /// The same poll was loaded before; nothing changed.
    AlreadyStarted,
    /// The voter completed this poll earlier. No bracket is run.
    AlreadyVoted { option_id: String },
}

/// Everything one voter sees while working through a poll: the bracket, the
/// ranking on display and the background vote submission.
pub struct VotingSession<B: PollBackend> {
    backend: Arc<B>,
    voter_id: String,
    settings: SessionSettings,
    poll: Option<Poll>,
    tournament: Tournament,
    previous_choice: Option<String>,
    board: RankingBoard,
    results_tx: UnboundedSender<Vec<AggregateResult>>,
    results_rx: UnboundedReceiver<Vec<AggregateResult>>,
    background: Option<JoinHandle<()>>,
    vote_sent: bool,
}

impl<B: PollBackend> VotingSession<B> {
    pub fn new(backend: Arc<B>, voter_id: impl Into<String>, settings: SessionSettings) -> Self {
        let (results_tx, results_rx) = unbounded_channel();
        Self {
            backend,
            voter_id: voter_id.into(),
            settings,
            poll: None,
            tournament: Tournament::new(),
            previous_choice: None,
            board: RankingBoard::new(),
            results_tx,
            results_rx,
            background: None,
            vote_sent: false,
        }
    }

    pub async fn load(&mut self, poll_id: &str) -> Result<Loaded, SessionError> {
        if self.poll.as_ref().map(|p| p.id.as_str()) == Some(poll_id) {
            debug!("Poll {} already loaded", poll_id);
            return Ok(match &self.previous_choice {
                Some(option_id) => Loaded::AlreadyVoted {
                    option_id: option_id.clone(),
                },
                None => Loaded::AlreadyStarted,
            });
        }

        let poll = self.backend.fetch_poll(poll_id).await?;
        let previous = self.backend.has_voted(poll_id, &self.voter_id).await?;
        // A vote for the previous poll may still be in flight.
        self.flush().await;
        self.reset();

        if let Some(option_id) = previous {
            info!(
                "Voter {} already voted in poll {}, showing results",
                self.voter_id, poll.id
            );
            self.board.show_fallback(&poll, &option_id);
            self.background = Some(spawn_results_fetch(
                Arc::clone(&self.backend),
                poll.id.clone(),
                self.results_tx.clone(),
            ));
            self.previous_choice = Some(option_id.clone());
            self.poll = Some(poll);
            return Ok(Loaded::AlreadyVoted { option_id });
        }

        let initialized = self
            .tournament
            .initialize(&poll, self.settings.ordering)
            .map_err(|e| {
                error!("Cannot start poll {}: {}", poll.id, e);
                e
            })?;
        self.poll = Some(poll);
        Ok(match initialized {
            Initialized::Started => Loaded::Started,
            Initialized::AlreadyStarted => Loaded::AlreadyStarted,
        })
    }

    /// Records a pick in the current pair, after the configured feedback delay.
    pub async fn choose(&mut self, option_id: &str) -> Result<ChoiceOutcome, SessionError> {
        if self.poll.is_none() {
            return Err(SessionError::NoPollLoaded);
        }
        if !self.settings.choice_delay.is_zero() {
            sleep(self.settings.choice_delay).await;
        }

        let outcome = self.tournament.record_choice(option_id).map_err(|e| {
            error!("Rejected choice {}: {}", option_id, e);
            e
        })?;

        match &outcome {
            ChoiceOutcome::NextPair { .. } => debug!(
                "{} option(s) left in the queue",
                self.tournament.remaining().len()
            ),
            ChoiceOutcome::Complete { winner } => self.finish(winner.id.clone()),
        }
        Ok(outcome)
    }

    fn finish(&mut self, winner_id: String) {
        let Some(poll) = self.poll.as_ref() else {
            return;
        };
        self.board.show_fallback(poll, &winner_id);
        if self.vote_sent {
            warn!("Vote for poll {} already submitted", poll.id);
            return;
        }
        let submission = Submission {
            poll_id: poll.id.clone(),
            option_id: winner_id,
            voter_id: self.voter_id.clone(),
        };
        self.vote_sent = true;
        self.background = Some(spawn_vote_submission(
            Arc::clone(&self.backend),
            submission,
            self.settings.results_repoll,
            self.results_tx.clone(),
        ));
    }

    /// Applies results that already arrived. Returns true when the ranking changed.
    pub fn refresh_results(&mut self) -> bool {
        let mut changed = false;
        while let Ok(results) = self.results_rx.try_recv() {
            changed |= self.apply_results(results);
        }
        changed
    }

    /// Waits up to `limit` for results. On timeout the fallback ranking stays.
    pub async fn wait_for_results(&mut self, limit: Duration) -> bool {
        if self.refresh_results() {
            return true;
        }
        match timeout(limit, self.results_rx.recv()).await {
            Ok(Some(results)) => {
                let changed = self.apply_results(results);
                self.refresh_results() || changed
            }
            Ok(None) => false,
            Err(_) => {
                debug!("No results within {:?}, keeping fallback ranking", limit);
                false
            }
        }
    }

    /// Waits for the background submission to finish.
    pub async fn flush(&mut self) {
        if let Some(handle) = self.background.take() {
            if let Err(e) = handle.await {
                error!("Vote submission task failed: {}", e);
            }
        }
    }

    fn apply_results(&mut self, results: Vec<AggregateResult>) -> bool {
        let Some(winner_id) = self.winner_id().map(str::to_string) else {
            debug!("Ignoring results that arrived before a winner is known");
            return false;
        };
        let Some(poll) = self.poll.as_ref() else {
            return false;
        };
        self.board.apply_server(poll, &winner_id, &results);
        true
    }

    fn reset(&mut self) {
        let (results_tx, results_rx) = unbounded_channel();
        self.results_tx = results_tx;
        self.results_rx = results_rx;
        self.tournament = Tournament::new();
        self.board = RankingBoard::new();
        self.previous_choice = None;
        self.poll = None;
        self.background = None;
        self.vote_sent = false;
    }

    pub fn poll(&self) -> Option<&Poll> {
        self.poll.as_ref()
    }

    pub fn pair(&self) -> Option<&[PollOption; 2]> {
        if self.tournament.is_complete() {
            return None;
        }
        self.tournament.current_pair()
    }

    pub fn progress(&self) -> Progress {
        self.tournament.progress()
    }

    pub fn state(&self) -> TournamentState {
        self.tournament.state()
    }

    pub fn ranking(&self) -> Option<&Ranking> {
        self.board.current()
    }

    pub fn previous_choice(&self) -> Option<&str> {
        self.previous_choice.as_deref()
    }

    pub fn winner_id(&self) -> Option<&str> {
        self.tournament
            .winner()
            .map(|w| w.id.as_str())
            .or(self.previous_choice.as_deref())
    }
}
