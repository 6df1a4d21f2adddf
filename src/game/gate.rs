//! Acceptance rules for reactions collected during sign-up and voting.
//!
//! The gate itself holds no window state: every decision is made against the
//! [`ReactionBoard`] of the window the event belongs to. Side effects
//! (retracting reactions, posting warnings) are described by the returned
//! [`Verdict`] and carried out by the round controller.

use super::board::ReactionBoard;
use super::format;
use crate::types::*;
use std::collections::HashSet;

/// Decision for a single reaction-add event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Count the reaction, retracting the reactor's other emoji in this window
    Accept { retract: Vec<Emoji> },
    Reject(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// One of our own seed reactions
    OwnReaction,
    /// Any other bot
    NonHuman,
    /// Voter did not sign up for this session
    NotParticipant,
    /// Vote with an emoji nobody signed up with
    NotACandidate,
    /// Emoji already claimed by someone else
    EmojiTaken,
    /// Custom emoji from another community
    EmojiUnavailable,
}

impl Rejection {
    /// Seed reactions stay so people can tap them
    pub fn retracts(&self) -> bool {
        !matches!(self, Rejection::OwnReaction)
    }

    /// Transient notice for the reactor, if this rejection deserves one
    pub fn warning(&self, user: &UserId) -> Option<String> {
        match self {
            Rejection::EmojiTaken => Some(format::emoji_taken(user)),
            Rejection::EmojiUnavailable => Some(format::emoji_unavailable(user)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Phase {
    SignUp,
    Voting {
        voters: HashSet<UserId>,
        candidates: HashSet<Emoji>,
    },
}

#[derive(Debug, Clone)]
pub struct ReactionGate {
    bot_id: UserId,
    /// Identifiers of the custom emoji the bot can display again
    custom_emojis: HashSet<EmojiId>,
    phase: Phase,
}

impl ReactionGate {
    /// Rules for the sign-up prompt: one owner per emoji, emoji must be displayable
    pub fn sign_up(bot_id: UserId, guild_emojis: &[Emoji]) -> Self {
        Self {
            bot_id,
            custom_emojis: guild_emojis.iter().filter_map(|e| e.id.clone()).collect(),
            phase: Phase::SignUp,
        }
    }

    /// Rules for a vote: only participants may vote, only for participants' emoji
    pub fn voting(bot_id: UserId, participants: &[Participant]) -> Self {
        Self {
            bot_id,
            custom_emojis: participants
                .iter()
                .filter_map(|p| p.emoji.id.clone())
                .collect(),
            phase: Phase::Voting {
                voters: participants.iter().map(|p| p.user_id().clone()).collect(),
                candidates: participants.iter().map(|p| p.emoji.clone()).collect(),
            },
        }
    }

    pub fn evaluate(&self, event: &ReactionEvent, board: &ReactionBoard) -> Verdict {
        let user = &event.user_id;
        let emoji = &event.emoji;

        if *user == self.bot_id {
            return Verdict::Reject(Rejection::OwnReaction);
        }
        if event.user_is_bot {
            return Verdict::Reject(Rejection::NonHuman);
        }

        match &self.phase {
            Phase::Voting { voters, candidates } => {
                if !voters.contains(user) {
                    return Verdict::Reject(Rejection::NotParticipant);
                }
                if !candidates.contains(emoji) {
                    return Verdict::Reject(Rejection::NotACandidate);
                }
            }
            Phase::SignUp => {
                if board.reactors(emoji).iter().any(|other| other != user) {
                    return Verdict::Reject(Rejection::EmojiTaken);
                }
            }
        }

        if !self.is_available(emoji) {
            return Verdict::Reject(Rejection::EmojiUnavailable);
        }

        let retract = board
            .emojis_of(user)
            .filter(|held| *held != emoji)
            .cloned()
            .collect();
        Verdict::Accept { retract }
    }

    fn is_available(&self, emoji: &Emoji) -> bool {
        match &emoji.id {
            None => true,
            Some(id) => self.custom_emojis.contains(id),
        }
    }
}
