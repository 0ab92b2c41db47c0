use crate::models::{Poll, PollOption};
use rand::seq::SliceRandom;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the options of a poll are laid out before the first comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BracketOrdering {
    /// A fresh pseudo-random permutation for every run.
    Shuffle,
    /// Options sorted by a hash of the poll id and the option id. Every voter
    /// of the same poll walks the same bracket, which keeps the aggregate
    /// statistics comparable.
    #[default]
    Deterministic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown bracket ordering {0:?} (expected \"shuffle\" or \"deterministic\")")]
pub struct ParseOrderingError(String);

impl BracketOrdering {
    pub fn arrange(&self, poll: &Poll) -> Vec<PollOption> {
        self.arrange_with(poll, &mut rand::thread_rng())
    }

    pub fn arrange_with<R: Rng + ?Sized>(&self, poll: &Poll, rng: &mut R) -> Vec<PollOption> {
        let mut options = poll.options.clone();
        match self {
            BracketOrdering::Shuffle => options.shuffle(rng),
            BracketOrdering::Deterministic => {
                // The original position breaks ties between identical ids.
                let mut keyed: Vec<(Vec<u8>, usize, PollOption)> = options
                    .into_iter()
                    .enumerate()
                    .map(|(idx, option)| (bracket_key(&poll.id, &option.id), idx, option))
                    .collect();
                keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
                options = keyed.into_iter().map(|(_, _, option)| option).collect();
            }
        }
        options
    }
}

fn bracket_key(poll_id: &str, option_id: &str) -> Vec<u8> {
    Sha256::digest(format!("{}:{}", poll_id, option_id).as_bytes()).to_vec()
}

impl FromStr for BracketOrdering {
    type Err = ParseOrderingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shuffle" | "random" => Ok(BracketOrdering::Shuffle),
            "deterministic" | "hash" => Ok(BracketOrdering::Deterministic),
            other => Err(ParseOrderingError(other.to_string())),
        }
    }
}

impl fmt::Display for BracketOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketOrdering::Shuffle => write!(f, "shuffle"),
            BracketOrdering::Deterministic => write!(f, "deterministic"),
        }
    }
}
