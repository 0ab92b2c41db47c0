use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub description: String,
    pub header_text: Option<String>,
    pub footer_text: Option<String>,
    pub options: Vec<PollOption>,
    pub total_votes: i64,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

/// One candidate of a poll. Only `votes` and `win_rate` ever change, and only
/// on the store side as a result of vote submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: String,
    pub title: String,
    pub image: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    pub votes: i64,
    /// Percentage of all votes, 0-100.
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub key: String,
    pub value: String,
}

/// Aggregate statistics for one option, as computed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub option_id: String,
    pub title: String,
    pub image: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    pub votes: i64,
    pub win_rate: f64,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteAck {
    pub poll_id: String,
    pub option_id: String,
    pub total_votes: i64,
    pub recorded_at: DateTime<Utc>,
}

impl Poll {
    pub fn new(title: String, description: String, options: Vec<String>) -> Self {
        let options = options
            .into_iter()
            .map(|title| PollOption {
                id: Uuid::new_v4().to_string(),
                title,
                image: None,
                custom_fields: Vec::new(),
                votes: 0,
                win_rate: 0.0,
            })
            .collect();

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            header_text: None,
            footer_text: None,
            options,
            total_votes: 0,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

impl AggregateResult {
    pub fn to_option(&self) -> PollOption {
        PollOption {
            id: self.option_id.clone(),
            title: self.title.clone(),
            image: self.image.clone(),
            custom_fields: self.custom_fields.clone(),
            votes: self.votes,
            win_rate: self.win_rate,
        }
    }
}
