pub mod ordering;
pub mod results;
pub mod tournament;

use crate::models::PollOption;

/// One row of the final ranking view.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub option: PollOption,
    /// Percentage, 0-100.
    pub score: f64,
    /// Set on the option this voter picked, wherever it ends up ranked.
    pub is_user_choice: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSource {
    /// Synthesized locally while the store's statistics are unavailable.
    Fallback,
    /// Built from the store's aggregate results.
    Server,
}

/// Ranking ready for display, in render order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub entries: Vec<RankingEntry>,
    pub source: RankingSource,
}

impl Ranking {
    /// Splits the entries into the top three and the remainder.
    pub fn podium(&self) -> (&[RankingEntry], &[RankingEntry]) {
        self.entries.split_at(self.entries.len().min(3))
    }

    pub fn user_choice(&self) -> Option<&RankingEntry> {
        self.entries.iter().find(|entry| entry.is_user_choice)
    }
}
