pub mod vote;

use crate::models::{Poll, PollOption};
use crate::voting::tournament::{Progress, Slot};
use crate::voting::{Ranking, RankingSource};
use std::fmt::Write;

/// What the voter typed at the comparison prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Slot(Slot),
    Help,
    Quit,
}

pub fn parse_pick(input: &str) -> Option<Pick> {
    match input.trim().to_lowercase().as_str() {
        "1" | "l" | "left" | "a" => Some(Pick::Slot(Slot::Left)),
        "2" | "r" | "right" | "b" => Some(Pick::Slot(Slot::Right)),
        "?" | "h" | "help" => Some(Pick::Help),
        "q" | "quit" | "exit" => Some(Pick::Quit),
        _ => None,
    }
}

pub fn render_header(poll: &Poll) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", poll.title);
    if !poll.description.is_empty() {
        let _ = writeln!(out, "{}", poll.description);
    }
    if let Some(header) = &poll.header_text {
        let _ = writeln!(out, "{}", header);
    }
    out
}

pub fn render_pair(pair: &[PollOption; 2], progress: Progress) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Round {} of {} [{:.0}% done]",
        progress.round,
        progress.total_rounds,
        progress.fraction() * 100.0
    );
    for (n, option) in pair.iter().enumerate() {
        let _ = write!(out, "  {}) {}", n + 1, option.title);
        for field in &option.custom_fields {
            let _ = write!(out, " | {}: {}", field.key, field.value);
        }
        out.push('\n');
    }
    out
}

pub fn render_ranking(poll: &Poll, ranking: &Ranking) -> String {
    let mut out = String::new();
    let label = match ranking.source {
        RankingSource::Server => "Results",
        RankingSource::Fallback => "Results (waiting for totals)",
    };
    let _ = writeln!(out, "{} for {}", label, poll.title);

    let (podium, rest) = ranking.podium();
    for (place, entry) in podium.iter().chain(rest).enumerate() {
        let marker = if entry.is_user_choice { " <- your pick" } else { "" };
        let _ = writeln!(
            out,
            "{:>3}. {:<30} {:>5.1}%{}",
            place + 1,
            entry.option.title,
            entry.score,
            marker
        );
        if place + 1 == podium.len() && !rest.is_empty() {
            let _ = writeln!(out, "     ---");
        }
    }
    if let Some(footer) = &poll.footer_text {
        let _ = writeln!(out, "{}", footer);
    }
    out
}
