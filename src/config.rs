use crate::voting::ordering::{BracketOrdering, ParseOrderingError};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:pairwise_vote.db";
pub const DEFAULT_CHOICE_DELAY_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BRACKET_ORDERING: {0}")]
    Ordering(#[from] ParseOrderingError),
    #[error("{name} must be a whole number of milliseconds, got {value:?}")]
    Millis { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub session: SessionSettings,
}

/// Knobs for one voting session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub ordering: BracketOrdering,
    /// Pause between a pick and the next pair, for perceptible feedback.
    pub choice_delay: Duration,
    /// When set, results are fetched once more this long after the vote is acknowledged.
    pub results_repoll: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ordering: BracketOrdering::default(),
            choice_delay: Duration::from_millis(DEFAULT_CHOICE_DELAY_MS),
            results_repoll: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let ordering = match lookup("BRACKET_ORDERING") {
            Some(value) => value.parse::<BracketOrdering>()?,
            None => BracketOrdering::default(),
        };

        let choice_delay = match lookup("CHOICE_DELAY_MS") {
            Some(value) => parse_millis("CHOICE_DELAY_MS", &value)?,
            None => Duration::from_millis(DEFAULT_CHOICE_DELAY_MS),
        };

        let results_repoll = lookup("RESULTS_REPOLL_MS")
            .map(|value| parse_millis("RESULTS_REPOLL_MS", &value))
            .transpose()?;

        Ok(Self {
            database_url,
            session: SessionSettings {
                ordering,
                choice_delay,
                results_repoll,
            },
        })
    }
}

fn parse_millis(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::Millis {
            name,
            value: value.to_string(),
        })
}
