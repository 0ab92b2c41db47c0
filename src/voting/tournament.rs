use crate::error::VotingError;
use crate::models::{Poll, PollOption};
use crate::voting::ordering::BracketOrdering;
use log::{debug, info};
use std::collections::VecDeque;

/// Left or right position of an option in the pair on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Left,
    Right,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::Left => 0,
            Slot::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub round: usize,
    pub total_rounds: usize,
}

impl Progress {
    /// Share of comparisons already decided, 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        if self.total_rounds == 0 {
            return 0.0;
        }
        (self.round - 1) as f64 / self.total_rounds as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TournamentState {
    Uninitialized,
    InProgress(Progress),
    Complete { winner: PollOption },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initialized {
    Started,
    /// A run for this poll already exists; nothing changed.
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceOutcome {
    NextPair {
        pair: [PollOption; 2],
        progress: Progress,
    },
    Complete {
        winner: PollOption,
    },
}

/// Single-elimination bracket over the options of one poll.
///
/// The option picked in a comparison is carried forward into the next one and
/// stays in the same slot; the other slot is filled from the queue. A poll with
/// N options therefore takes exactly N - 1 choices, and the last pick is the
/// overall winner.
#[derive(Debug, Clone, Default)]
pub struct Tournament {
    poll_id: Option<String>,
    current_pair: Option<[PollOption; 2]>,
    remaining: VecDeque<PollOption>,
    round: usize,
    total_rounds: usize,
    winner: Option<PollOption>,
}

impl Tournament {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(
        &mut self,
        poll: &Poll,
        ordering: BracketOrdering,
    ) -> Result<Initialized, VotingError> {
        if self.poll_id.as_deref() == Some(poll.id.as_str()) {
            debug!("Tournament for poll {} already started, ignoring", poll.id);
            return Ok(Initialized::AlreadyStarted);
        }
        if poll.options.len() < 2 {
            return Err(VotingError::NotEnoughOptions {
                poll_id: poll.id.clone(),
                count: poll.options.len(),
            });
        }
        if !poll.is_active {
            return Err(VotingError::PollInactive(poll.id.clone()));
        }

        let mut ordered: VecDeque<PollOption> = ordering.arrange(poll).into();
        let (Some(left), Some(right)) = (ordered.pop_front(), ordered.pop_front()) else {
            return Err(VotingError::NotEnoughOptions {
                poll_id: poll.id.clone(),
                count: poll.options.len(),
            });
        };

        *self = Tournament {
            poll_id: Some(poll.id.clone()),
            current_pair: Some([left, right]),
            remaining: ordered,
            round: 1,
            total_rounds: poll.options.len() - 1,
            winner: None,
        };
        info!(
            "Started {} bracket for poll {} ({} rounds)",
            ordering, poll.id, self.total_rounds
        );
        Ok(Initialized::Started)
    }

    pub fn record_choice(&mut self, option_id: &str) -> Result<ChoiceOutcome, VotingError> {
        if self.winner.is_some() {
            return Err(VotingError::AlreadyComplete);
        }
        let pair = self.current_pair.as_ref().ok_or(VotingError::NotStarted)?;
        let slot = if pair[0].id == option_id {
            Slot::Left
        } else if pair[1].id == option_id {
            Slot::Right
        } else {
            return Err(VotingError::ChoiceNotInPair(option_id.to_string()));
        };
        let chosen = pair[slot.index()].clone();

        // Prefer a challenger that is not the same option as the one carried forward.
        let next_idx = self
            .remaining
            .iter()
            .position(|candidate| candidate.id != chosen.id)
            .unwrap_or(0);
        let Some(challenger) = self.remaining.remove(next_idx) else {
            // Queue exhausted: the last pick is the overall winner.
            info!(
                "Poll {} complete after {} rounds, winner {}",
                self.poll_id.as_deref().unwrap_or_default(),
                self.round,
                chosen.id
            );
            self.winner = Some(chosen.clone());
            return Ok(ChoiceOutcome::Complete { winner: chosen });
        };
        if next_idx > 0 {
            debug!(
                "Skipped {} duplicate(s) of option {} in the queue",
                next_idx, chosen.id
            );
        }

        let next_pair = match slot {
            Slot::Left => [chosen, challenger],
            Slot::Right => [challenger, chosen],
        };
        self.current_pair = Some(next_pair.clone());
        self.round += 1;

        Ok(ChoiceOutcome::NextPair {
            pair: next_pair,
            progress: self.progress(),
        })
    }

    pub fn state(&self) -> TournamentState {
        match (&self.winner, &self.current_pair) {
            (Some(winner), _) => TournamentState::Complete {
                winner: winner.clone(),
            },
            (None, Some(_)) => TournamentState::InProgress(self.progress()),
            (None, None) => TournamentState::Uninitialized,
        }
    }

    pub fn current_pair(&self) -> Option<&[PollOption; 2]> {
        self.current_pair.as_ref()
    }

    pub fn remaining(&self) -> &VecDeque<PollOption> {
        &self.remaining
    }

    pub fn progress(&self) -> Progress {
        Progress {
            round: self.round,
            total_rounds: self.total_rounds,
        }
    }

    pub fn winner(&self) -> Option<&PollOption> {
        self.winner.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.winner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(option_ids: &[&str]) -> Poll {
        let mut poll = Poll::new(
            "Best fruit".to_string(),
            String::new(),
            option_ids.iter().map(|s| s.to_uppercase()).collect(),
        );
        poll.id = "poll-1".to_string();
        for (option, id) in poll.options.iter_mut().zip(option_ids) {
            option.id = id.to_string();
        }
        poll
    }

    /// A tournament whose bracket follows the option list as given.
    fn seeded(option_ids: &[&str]) -> Tournament {
        let poll = poll(option_ids);
        let mut remaining: VecDeque<PollOption> = poll.options.clone().into();
        let left = remaining.pop_front().unwrap();
        let right = remaining.pop_front().unwrap();
        Tournament {
            poll_id: Some(poll.id.clone()),
            current_pair: Some([left, right]),
            remaining,
            round: 1,
            total_rounds: option_ids.len() - 1,
            winner: None,
        }
    }

    fn pair_ids(t: &Tournament) -> [String; 2] {
        let pair = t.current_pair().unwrap();
        [pair[0].id.clone(), pair[1].id.clone()]
    }

    #[test]
    fn initialize_sets_up_first_pair() {
        let mut t = Tournament::new();
        assert_eq!(t.state(), TournamentState::Uninitialized);

        let outcome = t
            .initialize(&poll(&["a", "b", "c", "d"]), BracketOrdering::Deterministic)
            .unwrap();
        assert_eq!(outcome, Initialized::Started);
        assert_eq!(t.progress(), Progress { round: 1, total_rounds: 3 });
        assert_eq!(t.remaining().len(), 2);
        assert!(matches!(t.state(), TournamentState::InProgress(_)));
    }

    #[test]
    fn initialize_rejects_single_option() {
        let mut t = Tournament::new();
        let err = t
            .initialize(&poll(&["a"]), BracketOrdering::Shuffle)
            .unwrap_err();
        assert_eq!(
            err,
            VotingError::NotEnoughOptions {
                poll_id: "poll-1".to_string(),
                count: 1
            }
        );
        assert_eq!(t.state(), TournamentState::Uninitialized);
    }

    #[test]
    fn initialize_rejects_inactive_poll() {
        let mut closed = poll(&["a", "b"]);
        closed.is_active = false;
        let mut t = Tournament::new();
        assert!(matches!(
            t.initialize(&closed, BracketOrdering::Deterministic),
            Err(VotingError::PollInactive(_))
        ));
    }

    #[test]
    fn initialize_twice_is_a_no_op() {
        let p = poll(&["a", "b", "c", "d", "e"]);
        let mut t = Tournament::new();
        t.initialize(&p, BracketOrdering::Shuffle).unwrap();
        let pair_before = pair_ids(&t);
        let progress_before = t.progress();

        let second = t.initialize(&p, BracketOrdering::Shuffle).unwrap();
        assert_eq!(second, Initialized::AlreadyStarted);
        assert_eq!(pair_ids(&t), pair_before);
        assert_eq!(t.progress(), progress_before);
    }

    #[test]
    fn initialize_after_completion_does_not_restart() {
        let p = poll(&["a", "b"]);
        let mut t = Tournament::new();
        t.initialize(&p, BracketOrdering::Deterministic).unwrap();
        let first = t.current_pair().unwrap()[0].id.clone();
        t.record_choice(&first).unwrap();

        assert_eq!(
            t.initialize(&p, BracketOrdering::Deterministic).unwrap(),
            Initialized::AlreadyStarted
        );
        assert!(t.is_complete());
    }

    #[test]
    fn walks_the_documented_example() {
        let mut t = seeded(&["a", "b", "c", "d"]);
        assert_eq!(pair_ids(&t), ["a", "b"]);

        let outcome = t.record_choice("a").unwrap();
        assert!(matches!(outcome, ChoiceOutcome::NextPair { .. }));
        assert_eq!(pair_ids(&t), ["a", "c"]);
        assert_eq!(t.progress().round, 2);
        assert_eq!(t.remaining().len(), 1);

        t.record_choice("c").unwrap();
        assert_eq!(pair_ids(&t), ["d", "c"]);
        assert_eq!(t.progress().round, 3);
        assert!(t.remaining().is_empty());

        match t.record_choice("d").unwrap() {
            ChoiceOutcome::Complete { winner } => assert_eq!(winner.id, "d"),
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(t.winner().unwrap().id, "d");
        assert_eq!(t.progress().round, 3);
    }

    #[test]
    fn takes_exactly_n_minus_one_choices() {
        for n in 2..=9 {
            let ids: Vec<String> = (0..n).map(|i| format!("o{}", i)).collect();
            let refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
            let mut t = Tournament::new();
            t.initialize(&poll(&refs), BracketOrdering::Shuffle).unwrap();
            assert_eq!(t.progress().total_rounds, n - 1);

            let mut choices = 0;
            loop {
                // Always pick the right-hand option.
                let pick = t.current_pair().unwrap()[1].id.clone();
                choices += 1;
                if let ChoiceOutcome::Complete { .. } = t.record_choice(&pick).unwrap() {
                    break;
                }
                let progress = t.progress();
                assert!(progress.round <= progress.total_rounds);
                assert_eq!(t.remaining().len(), progress.total_rounds - progress.round);
            }
            assert_eq!(choices, n - 1);
        }
    }

    #[test]
    fn last_choice_wins_even_against_the_favourite() {
        let mut t = seeded(&["a", "b", "c", "d"]);
        t.record_choice("a").unwrap();
        t.record_choice("a").unwrap();
        // "a" won two rounds but loses the final pick.
        t.record_choice("d").unwrap();
        assert_eq!(t.winner().unwrap().id, "d");
    }

    #[test]
    fn carried_option_keeps_its_slot() {
        let mut t = seeded(&["a", "b", "c", "d", "e", "f"]);
        let picks = [1usize, 1, 0, 1];
        for slot in picks {
            let before = pair_ids(&t);
            let chosen = before[slot].clone();
            t.record_choice(&chosen).unwrap();
            assert_eq!(pair_ids(&t)[slot], chosen);
            assert_ne!(pair_ids(&t)[1 - slot], chosen);
        }
    }

    #[test]
    fn skips_queued_duplicate_of_the_winner() {
        let mut t = seeded(&["a", "b", "a", "c"]);
        t.record_choice("a").unwrap();
        assert_eq!(pair_ids(&t), ["a", "c"]);
        // The duplicate stays queued so the round arithmetic still holds.
        assert_eq!(t.remaining().len(), 1);
        assert_eq!(t.remaining()[0].id, "a");
    }

    #[test]
    fn uses_duplicate_when_nothing_else_is_left() {
        let mut t = seeded(&["a", "b", "a"]);
        t.record_choice("a").unwrap();
        assert_eq!(pair_ids(&t), ["a", "a"]);
        assert!(t.remaining().is_empty());
    }

    #[test]
    fn rejects_choices_outside_the_contract() {
        let mut fresh = Tournament::new();
        assert_eq!(fresh.record_choice("a"), Err(VotingError::NotStarted));

        let mut t = seeded(&["a", "b"]);
        assert_eq!(
            t.record_choice("zzz"),
            Err(VotingError::ChoiceNotInPair("zzz".to_string()))
        );
        t.record_choice("b").unwrap();
        assert_eq!(t.record_choice("b"), Err(VotingError::AlreadyComplete));
    }

    #[test]
    fn progress_fraction_tracks_rounds() {
        let p = Progress { round: 1, total_rounds: 4 };
        assert_eq!(p.fraction(), 0.0);
        let p = Progress { round: 3, total_rounds: 4 };
        assert_eq!(p.fraction(), 0.5);
    }
}
