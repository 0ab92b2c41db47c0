use crate::models::{AggregateResult, Poll};
use crate::voting::{Ranking, RankingEntry, RankingSource};
use log::{debug, info, warn};

pub const FALLBACK_WINNER_SCORE: f64 = 100.0;
pub const FALLBACK_DECAY_PER_POSITION: f64 = 15.0;
pub const FALLBACK_SCORE_FLOOR: f64 = 10.0;

/// Builds the ranking shown once a winner is known.
///
/// With `server_results` the store's order is kept as-is and each score is the
/// result's percentage, or its win rate when no percentage was computed.
/// Without them a placeholder ranking is derived from the poll itself: the
/// winner first at 100, then every other option in list order, decaying by 15
/// points per list position down to a floor of 10.
pub fn reconcile(
    poll: &Poll,
    winner_id: &str,
    server_results: Option<&[AggregateResult]>,
) -> Ranking {
    match server_results {
        Some(results) => server_ranking(poll, winner_id, results),
        None => fallback_ranking(poll, winner_id),
    }
}

fn server_ranking(poll: &Poll, winner_id: &str, results: &[AggregateResult]) -> Ranking {
    let mut entries: Vec<RankingEntry> = results
        .iter()
        .map(|result| RankingEntry {
            option: result.to_option(),
            score: result.percentage.unwrap_or(result.win_rate),
            is_user_choice: result.option_id == winner_id,
        })
        .collect();

    // The pick stays visible even when the store left it out of the results.
    if !entries.iter().any(|entry| entry.is_user_choice) {
        if let Some(pick) = poll.option(winner_id) {
            debug!(
                "Option {} missing from results of poll {}, appending it",
                winner_id, poll.id
            );
            entries.push(RankingEntry {
                option: pick.clone(),
                score: pick.win_rate,
                is_user_choice: true,
            });
        }
    }

    Ranking {
        entries,
        source: RankingSource::Server,
    }
}

fn fallback_ranking(poll: &Poll, winner_id: &str) -> Ranking {
    let mut entries = Vec::with_capacity(poll.options.len());
    match poll.option(winner_id) {
        Some(winner) => entries.push(RankingEntry {
            option: winner.clone(),
            score: FALLBACK_WINNER_SCORE,
            is_user_choice: true,
        }),
        None => warn!(
            "Winner {} is not an option of poll {}, fallback ranking has no pick",
            winner_id, poll.id
        ),
    }
    for (index, option) in poll.options.iter().enumerate() {
        if option.id == winner_id {
            continue;
        }
        entries.push(RankingEntry {
            option: option.clone(),
            score: fallback_score(index),
            is_user_choice: false,
        });
    }
    Ranking {
        entries,
        source: RankingSource::Fallback,
    }
}

pub fn fallback_score(index: usize) -> f64 {
    (FALLBACK_WINNER_SCORE - FALLBACK_DECAY_PER_POSITION * index as f64).max(FALLBACK_SCORE_FLOOR)
}

/// The ranking currently on display for one poll/winner pair.
///
/// A fallback may be replaced by server results, never the other way round.
#[derive(Debug, Clone, Default)]
pub struct RankingBoard {
    key: Option<(String, String)>,
    ranking: Option<Ranking>,
}

impl RankingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_fallback(&mut self, poll: &Poll, winner_id: &str) -> &Ranking {
        self.reset_if_other(poll, winner_id);
        let ranking = match self.ranking.take() {
            Some(current) if current.source == RankingSource::Server => {
                debug!("Server ranking already shown for poll {}, keeping it", poll.id);
                current
            }
            _ => reconcile(poll, winner_id, None),
        };
        self.ranking.insert(ranking)
    }

    pub fn apply_server(
        &mut self,
        poll: &Poll,
        winner_id: &str,
        results: &[AggregateResult],
    ) -> &Ranking {
        self.reset_if_other(poll, winner_id);
        info!(
            "Replacing ranking for poll {} with {} server result(s)",
            poll.id,
            results.len()
        );
        self.ranking.insert(reconcile(poll, winner_id, Some(results)))
    }

    pub fn current(&self) -> Option<&Ranking> {
        self.ranking.as_ref()
    }

    fn reset_if_other(&mut self, poll: &Poll, winner_id: &str) {
        let same = matches!(&self.key, Some((p, w)) if *p == poll.id && w == winner_id);
        if !same {
            self.key = Some((poll.id.clone(), winner_id.to_string()));
            self.ranking = None;
        }
    }
}
