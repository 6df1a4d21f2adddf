use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switch to another channel
    Join {
        channel_id: ChannelId,
    },
    Say {
        text: String,
    },
    React {
        message_id: MessageId,
        emoji: Emoji,
    },
    Unreact {
        message_id: MessageId,
        emoji: Emoji,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostedMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub content: String,
    /// ISO8601 timestamp
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        user: Member,
        channel_id: ChannelId,
        /// Custom emoji of this community
        emojis: Vec<Emoji>,
        server_now: String,
    },
    MessagePosted {
        message: PostedMessage,
    },
    MessageDeleted {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    ReactionAdded {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: Emoji,
    },
    ReactionRemoved {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: Emoji,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Channel a broadcast belongs to, `None` for connection-level messages
    pub fn channel_id(&self) -> Option<&ChannelId> {
        match self {
            ServerMessage::MessagePosted { message } => Some(&message.channel_id),
            ServerMessage::MessageDeleted { channel_id, .. }
            | ServerMessage::ReactionAdded { channel_id, .. }
            | ServerMessage::ReactionRemoved { channel_id, .. } => Some(channel_id),
            ServerMessage::Welcome { .. } | ServerMessage::Error { .. } => None,
        }
    }
}
