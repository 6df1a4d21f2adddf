use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type UserId = String;
pub type ChannelId = String;
pub type MessageId = String;
pub type EmojiId = String;

/// A reaction emoji.
///
/// Standard (Unicode) emoji carry no identifier and are available everywhere.
/// Custom emoji belong to the hosting community and are identified by `id`.
/// Equality is structural on `(id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emoji {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EmojiId>,
    pub name: String,
}

impl Emoji {
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn custom(id: impl Into<EmojiId>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
        }
    }

    pub fn is_standard(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "<:{}:{}>", self.name, id),
            None => f.write_str(&self.name),
        }
    }
}

/// A member of the hosting community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub display_name: String,
    #[serde(default)]
    pub bot: bool,
}

/// A member bound to the emoji they signed up with
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub member: Member,
    pub emoji: Emoji,
}

impl Participant {
    pub fn user_id(&self) -> &UserId {
        &self.member.id
    }

    pub fn display_name(&self) -> &str {
        &self.member.display_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Added,
    Removed,
}

/// A raw reaction event observed on a message
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionEvent {
    pub kind: ReactionKind,
    pub message_id: MessageId,
    pub channel_id: ChannelId,
    pub user_id: UserId,
    /// True when the reactor is not a human (any bot, including ourselves)
    pub user_is_bot: bool,
    pub emoji: Emoji,
}

/// Outcome of one voting phase.
///
/// `winners` holds every emoji that reached `max_votes`; it is empty only when
/// nobody voted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoundResult {
    pub max_votes: usize,
    pub winners: Vec<Emoji>,
}

impl RoundResult {
    pub fn nobody_voted(&self) -> bool {
        self.winners.is_empty()
    }

    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_equality_is_structural() {
        assert_eq!(Emoji::standard("🍕"), Emoji::standard("🍕"));
        assert_ne!(Emoji::standard("🍕"), Emoji::standard("🍔"));
        assert_ne!(Emoji::custom("1", "parrot"), Emoji::custom("2", "parrot"));
        assert_ne!(Emoji::custom("1", "parrot"), Emoji::standard("parrot"));
    }

    #[test]
    fn test_emoji_display() {
        assert_eq!(Emoji::standard("🍕").to_string(), "🍕");
        assert_eq!(Emoji::custom("42", "parrot").to_string(), "<:parrot:42>");
    }

    #[test]
    fn test_round_result_flags() {
        let empty = RoundResult::default();
        assert!(empty.nobody_voted());
        assert!(!empty.is_tie());

        let tie = RoundResult {
            max_votes: 1,
            winners: vec![Emoji::standard("🍕"), Emoji::standard("🍔")],
        };
        assert!(!tie.nobody_voted());
        assert!(tie.is_tie());
    }
}
