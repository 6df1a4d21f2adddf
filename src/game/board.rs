use super::gate::Verdict;
use crate::types::{Emoji, UserId};
use std::collections::HashSet;

/// Accepted reactions of one collection window, keyed by emoji in the order
/// they were first claimed.
///
/// A user appears at most once per emoji. During sign-up an emoji has at most
/// one reactor; during voting each emoji's reactors form its vote record.
#[derive(Debug, Clone, Default)]
pub struct ReactionBoard {
    entries: Vec<(Emoji, Vec<UserId>)>,
}

impl ReactionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users holding `emoji`, in the order they reacted
    pub fn reactors(&self, emoji: &Emoji) -> &[UserId] {
        self.entries
            .iter()
            .find(|(e, _)| e == emoji)
            .map(|(_, users)| users.as_slice())
            .unwrap_or(&[])
    }

    /// Emoji currently held by `user`
    pub fn emojis_of<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a Emoji> + 'a {
        self.entries
            .iter()
            .filter(move |(_, users)| users.contains(user))
            .map(|(emoji, _)| emoji)
    }

    pub fn holds(&self, emoji: &Emoji, user: &UserId) -> bool {
        self.reactors(emoji).contains(user)
    }

    /// Returns false if the user already held this emoji
    pub fn add(&mut self, emoji: &Emoji, user: &UserId) -> bool {
        match self.entries.iter_mut().find(|(e, _)| e == emoji) {
            Some((_, users)) if users.contains(user) => false,
            Some((_, users)) => {
                users.push(user.clone());
                true
            }
            None => {
                self.entries.push((emoji.clone(), vec![user.clone()]));
                true
            }
        }
    }

    /// Returns false if the user did not hold this emoji
    pub fn remove(&mut self, emoji: &Emoji, user: &UserId) -> bool {
        let Some(pos) = self.entries.iter().position(|(e, _)| e == emoji) else {
            return false;
        };

        let users = &mut self.entries[pos].1;
        let before = users.len();
        users.retain(|u| u != user);
        let removed = users.len() != before;

        if users.is_empty() {
            self.entries.remove(pos);
        }
        removed
    }

    /// Apply an accepted verdict: drop retracted emoji, then claim the new one
    pub fn apply(&mut self, emoji: &Emoji, user: &UserId, verdict: &Verdict) {
        if let Verdict::Accept { retract } = verdict {
            for old in retract {
                self.remove(old, user);
            }
            self.add(emoji, user);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Emoji, &[UserId])> {
        self.entries
            .iter()
            .map(|(emoji, users)| (emoji, users.as_slice()))
    }

    /// Number of distinct users holding any emoji
    pub fn reactor_count(&self) -> usize {
        self.entries
            .iter()
            .flat_map(|(_, users)| users.iter())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Sum of all per-emoji reactor counts
    pub fn reaction_count(&self) -> usize {
        self.entries.iter().map(|(_, users)| users.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
