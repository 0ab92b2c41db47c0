use crate::backend::PollBackend;
use crate::error::{SessionError, VotingError};
use crate::handlers::{parse_pick, render_header, render_pair, render_ranking, Pick};
use crate::session::{Loaded, VotingSession};
use crate::voting::tournament::TournamentState;
use log::info;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufRead, Lines};

const HELP: &str = "Type 1 (or l) for the first option, 2 (or r) for the second, q to stop.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Voted,
    AlreadyVoted,
    /// Input ended or the voter quit before a winner was picked. Nothing is submitted.
    Abandoned,
}

/// Runs one poll interactively: prompts for every comparison, then prints the ranking.
pub async fn play<B, R, W>(
    session: &mut VotingSession<B>,
    poll_id: &str,
    input: &mut Lines<R>,
    out: &mut W,
    results_wait: Duration,
) -> Result<PlayOutcome, Box<dyn std::error::Error + Send + Sync>>
where
    B: PollBackend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let loaded = session.load(poll_id).await?;
    let poll = session.poll().cloned().ok_or(SessionError::NoPollLoaded)?;
    write!(out, "{}", render_header(&poll))?;

    let outcome = if let Loaded::AlreadyVoted { option_id } = &loaded {
        info!("Poll {} already answered with option {}", poll.id, option_id);
        match session.previous_choice().and_then(|id| poll.option(id)) {
            Some(pick) => writeln!(
                out,
                "You already voted in this poll (your pick: {}).",
                pick.title
            )?,
            None => writeln!(out, "You already voted in this poll.")?,
        }
        PlayOutcome::AlreadyVoted
    } else {
        loop {
            let progress = match session.state() {
                TournamentState::InProgress(progress) => progress,
                TournamentState::Complete { winner } => {
                    writeln!(out, "Winner: {}", winner.title)?;
                    break;
                }
                TournamentState::Uninitialized => return Err(VotingError::NotStarted.into()),
            };
            let pair = session.pair().cloned().ok_or(VotingError::NotStarted)?;
            write!(out, "{}> ", render_pair(&pair, progress))?;
            out.flush()?;

            let Some(line) = input.next_line().await? else {
                info!("Input closed during poll {}", poll.id);
                return Ok(PlayOutcome::Abandoned);
            };
            match parse_pick(&line) {
                Some(Pick::Slot(slot)) => {
                    session.choose(&pair[slot.index()].id).await?;
                }
                Some(Pick::Help) => writeln!(out, "{}", HELP)?,
                Some(Pick::Quit) => return Ok(PlayOutcome::Abandoned),
                None => writeln!(out, "Unrecognised input. {}", HELP)?,
            }
        }
        PlayOutcome::Voted
    };

    session.wait_for_results(results_wait).await;
    if let Some(ranking) = session.ranking() {
        write!(out, "{}", render_ranking(&poll, ranking))?;
        if let Some(pick) = ranking.user_choice() {
            info!(
                "Poll {}: pick {} shown at {:.1}% ({:?})",
                poll.id, pick.option.id, pick.score, ranking.source
            );
        }
    }

    session.flush().await;
    if session.refresh_results() {
        if let Some(ranking) = session.ranking() {
            write!(out, "{}", render_ranking(&poll, ranking))?;
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::MockBackend;
    use crate::config::SessionSettings;
    use crate::models::{AggregateResult, Poll};
    use std::sync::Arc;
    use tokio::io::AsyncBufReadExt;

    fn poll() -> Poll {
        Poll::new(
            "Snack".to_string(),
            String::new(),
            vec!["Chips".into(), "Fruit".into(), "Nuts".into()],
        )
    }

    fn session(backend: MockBackend) -> (Arc<MockBackend>, VotingSession<MockBackend>) {
        let backend = Arc::new(backend);
        let settings = SessionSettings {
            choice_delay: Duration::ZERO,
            ..SessionSettings::default()
        };
        (backend.clone(), VotingSession::new(backend, "voter-7", settings))
    }

    async fn run(
        session: &mut VotingSession<MockBackend>,
        poll_id: &str,
        typed: &'static str,
    ) -> (PlayOutcome, String) {
        let mut lines = typed.as_bytes().lines();
        let mut out = Vec::new();
        let outcome = play(session, poll_id, &mut lines, &mut out, Duration::from_millis(300))
            .await
            .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn plays_through_and_prints_server_results() {
        let p = poll();
        let results: Vec<AggregateResult> = p
            .options
            .iter()
            .map(|o| AggregateResult {
                option_id: o.id.clone(),
                title: o.title.clone(),
                image: None,
                custom_fields: Vec::new(),
                votes: 1,
                win_rate: 33.3,
                percentage: None,
            })
            .collect();
        let (backend, mut session) = session(MockBackend::new(p.clone()).with_results(results));

        let (outcome, text) = run(&mut session, &p.id, "1\nwhat\n?\n2\n").await;

        assert_eq!(outcome, PlayOutcome::Voted);
        assert!(text.contains("Unrecognised input."));
        assert!(text.contains("Round 2 of 2"));
        assert!(text.contains("Winner: "));
        assert!(text.contains("Results for Snack"));
        assert!(text.contains("<- your pick"));
        assert_eq!(backend.submitted().len(), 1);
    }

    #[tokio::test]
    async fn closed_input_abandons_without_voting() {
        let p = poll();
        let (backend, mut session) = session(MockBackend::new(p.clone()));

        let (outcome, text) = run(&mut session, &p.id, "1\n").await;

        assert_eq!(outcome, PlayOutcome::Abandoned);
        assert!(!text.contains("Results"));
        assert!(backend.submitted().is_empty());
    }

    #[tokio::test]
    async fn returning_voter_sees_results_only() {
        let p = poll();
        let mut backend = MockBackend::new(p.clone());
        backend.previous_choice = Some(p.options[1].id.clone());
        let (backend, mut session) = session(backend);

        let (outcome, text) = run(&mut session, &p.id, "").await;

        assert_eq!(outcome, PlayOutcome::AlreadyVoted);
        assert!(text.contains("You already voted in this poll (your pick: Fruit)."));
        assert!(text.contains("Results (waiting for totals) for Snack"));
        assert!(!text.contains("Round"));
        assert!(backend.submitted().is_empty());
    }
}
