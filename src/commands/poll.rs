use crate::backend::PollBackend;
use crate::config::SessionSettings;
use crate::db::Database;
use crate::handlers::render_ranking;
use crate::handlers::vote::{play, PlayOutcome};
use crate::models::Poll;
use crate::session::VotingSession;
use crate::voting::results::reconcile;
use log::{info, warn};
use std::env;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use uuid::Uuid;

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub async fn handle_create(
    database: &Database,
    title: String,
    description: String,
    options: Vec<String>,
    header: Option<String>,
    footer: Option<String>,
) -> CommandResult {
    let options: Vec<String> = options
        .into_iter()
        .map(|option| option.trim().to_string())
        .filter(|option| !option.is_empty())
        .collect();
    if options.len() < 2 {
        return Err("a poll needs at least two options".into());
    }

    let mut poll = Poll::new(title, description, options);
    poll.header_text = header;
    poll.footer_text = footer;
    database.create_poll(&poll).await?;

    println!("{}", poll.id);
    Ok(())
}

pub async fn handle_play(
    database: Arc<Database>,
    settings: SessionSettings,
    poll_id: &str,
    voter: Option<String>,
    wait_ms: u64,
) -> CommandResult {
    let voter_id = voter
        .or_else(|| env::var("USER").ok())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    info!("Voter {} playing poll {}", voter_id, poll_id);

    let mut session = VotingSession::new(database, voter_id, settings);
    let mut lines = BufReader::new(stdin()).lines();
    let mut out = io::stdout();

    let outcome = play(
        &mut session,
        poll_id,
        &mut lines,
        &mut out,
        Duration::from_millis(wait_ms),
    )
    .await?;
    if outcome == PlayOutcome::Abandoned {
        println!("Stopped before a winner was picked, no vote recorded.");
    }
    Ok(())
}

pub async fn handle_results(database: &Database, poll_id: &str) -> CommandResult {
    let poll = database.fetch_poll(poll_id).await?;
    let results = database.fetch_aggregate_results(poll_id).await?;
    if results.is_empty() {
        warn!("Poll {} has no options", poll_id);
        return Ok(());
    }

    // No voter here, so no entry is marked as the user's pick.
    let ranking = reconcile(&poll, "", Some(results.as_slice()));
    print!("{}", render_ranking(&poll, &ranking));
    println!("{} vote(s) in total", poll.total_votes);
    Ok(())
}

pub async fn handle_list(database: &Database, active_only: bool) -> CommandResult {
    let polls = database.list_polls(active_only).await?;
    if polls.is_empty() {
        println!("No polls found.");
    }
    for poll in polls {
        let status = if poll.is_active { "open" } else { "closed" };
        println!(
            "{}  {:<6}  {:>4} vote(s)  {}",
            poll.id, status, poll.total_votes, poll.title
        );
    }
    Ok(())
}

pub async fn handle_end(database: &Database, poll_id: &str) -> CommandResult {
    // end_poll alone is silent about unknown ids.
    database.fetch_poll(poll_id).await?;
    database.end_poll(poll_id).await?;
    println!("Poll {} closed.", poll_id);
    Ok(())
}
