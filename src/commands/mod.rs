pub mod poll;

use crate::config::Settings;
use crate::db::Database;
use crate::voting::ordering::BracketOrdering;
use clap::{Parser, Subcommand};
use std::sync::Arc;

/// Pairwise-elimination polls: compare two options at a time until one is left.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Create a poll and print its id
    Create {
        title: String,
        /// Comma-separated list of options
        #[arg(short, long, value_delimiter = ',', required = true)]
        options: Vec<String>,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long)]
        header: Option<String>,
        #[arg(long)]
        footer: Option<String>,
    },
    /// Vote in a poll, one comparison at a time
    Play {
        poll_id: String,
        /// Voter identity. Defaults to $USER.
        #[arg(long)]
        voter: Option<String>,
        /// Overrides BRACKET_ORDERING (shuffle or deterministic)
        #[arg(long)]
        ordering: Option<BracketOrdering>,
        /// How long to wait for the final totals before showing the placeholder ranking
        #[arg(long, default_value_t = 2000)]
        wait_ms: u64,
    },
    /// Show aggregate results of a poll
    Results { poll_id: String },
    /// List polls
    List {
        /// Include closed polls
        #[arg(long)]
        all: bool,
    },
    /// Close a poll to new votes
    End { poll_id: String },
}

pub async fn handle_command(
    database: Arc<Database>,
    settings: &Settings,
    command: Command,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match command {
        Command::Create {
            title,
            options,
            description,
            header,
            footer,
        } => poll::handle_create(&database, title, description, options, header, footer).await?,
        Command::Play {
            poll_id,
            voter,
            ordering,
            wait_ms,
        } => {
            let mut session = settings.session.clone();
            if let Some(ordering) = ordering {
                session.ordering = ordering;
            }
            poll::handle_play(database, session, &poll_id, voter, wait_ms).await?
        }
        Command::Results { poll_id } => poll::handle_results(&database, &poll_id).await?,
        Command::List { all } => poll::handle_list(&database, !all).await?,
        Command::End { poll_id } => poll::handle_end(&database, &poll_id).await?,
    }
    Ok(())
}
