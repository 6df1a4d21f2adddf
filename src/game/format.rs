//! Chat texts posted by the game

use crate::types::*;
use std::time::Duration;

pub fn mention(user: &UserId) -> String {
    format!("<@{}>", user)
}

pub fn sign_up_prompt(window: Duration) -> String {
    format!(
        "A new round of \"Who would rather\" just started! React to this message during the next {} seconds with a unique emote to join.",
        window.as_secs()
    )
}

pub fn not_enough_players() -> String {
    "There aren't enough players for the game. Get more people here and start again!".to_string()
}

pub fn emoji_taken(user: &UserId) -> String {
    format!(
        "{} Your chosen emoji was already taken by someone else. Please react with a unique emoji to join.",
        mention(user)
    )
}

pub fn emoji_unavailable(user: &UserId) -> String {
    format!(
        "{} Your chosen emoji is not available to this bot. Please use a standard emoji or one of this server's.",
        mention(user)
    )
}

pub fn voting_prompt(question: &str, window: Duration) -> String {
    format!(
        "{}? Use the emojis to cast your vote during the next {} seconds!",
        question,
        window.as_secs()
    )
}

/// One `<emoji> - <name>` line per participant
pub fn participant_list(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(|p| format!("{} - {}", p.emoji, p.display_name()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn everyone_voted(grace: Duration) -> String {
    format!(
        "Everyone has voted! Voting closes in {} seconds, last chance to change your mind.",
        grace.as_secs()
    )
}

pub fn round_result(question: &str, result: &RoundResult, participants: &[Participant]) -> String {
    if result.nobody_voted() {
        return format!("So... {}? Nobody voted this time.", question);
    }

    let names: Vec<&str> = participants
        .iter()
        .filter(|p| result.winners.contains(&p.emoji))
        .map(|p| p.display_name())
        .collect();

    format!("So... {}? It's {}", question, join_names(&names))
}

pub fn next_round(round: u32, total: u32, pause: Duration) -> String {
    format!(
        "Round {} of {} starts in {} seconds...",
        round,
        total,
        pause.as_secs()
    )
}

pub fn question_unavailable() -> String {
    "I couldn't come up with a question right now. The game is over, sorry!".to_string()
}

pub fn already_running() -> String {
    "A game is already running in this channel!".to_string()
}

pub fn usage(trigger: &str, max_rounds: u32) -> String {
    format!(
        "Usage: `{} [rounds]` where rounds is a number from 1 to {}.",
        trigger, max_rounds
    )
}

/// "A", "A and B", "A, B and C"
pub fn join_names(names: &[&str]) -> String {
    match names {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
