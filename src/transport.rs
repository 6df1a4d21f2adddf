use crate::types::*;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Result type for chat backend operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors reported by a chat backend
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Chat backend unavailable: {0}")]
    Unavailable(String),
}

/// Everything the game needs from a chat backend
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Identity the game posts and reacts as
    fn bot_id(&self) -> &UserId;

    /// Post a message. Long content may be split, so every posted handle is returned
    /// in order.
    async fn send(&self, channel: &ChannelId, content: &str) -> TransportResult<Vec<MessageId>>;

    /// Add a reaction as the bot
    async fn react(&self, message: &MessageId, emoji: &Emoji) -> TransportResult<()>;

    /// Take back `user`'s reaction with `emoji` on `message`
    async fn remove_reaction(
        &self,
        message: &MessageId,
        emoji: &Emoji,
        user: &UserId,
    ) -> TransportResult<()>;

    /// Delete a message once `after` has elapsed
    async fn delete_message(&self, message: &MessageId, after: Duration) -> TransportResult<()>;

    /// Stream of reaction events on `message`. Reactions the message already
    /// carries are delivered first as `Added` events.
    async fn subscribe_reactions(
        &self,
        message: &MessageId,
    ) -> TransportResult<mpsc::UnboundedReceiver<ReactionEvent>>;

    /// Resolve a user to a member of the hosting community, `None` if they left
    async fn member(&self, user: &UserId) -> TransportResult<Option<Member>>;

    /// Custom emoji registered to the hosting community
    async fn guild_emojis(&self) -> TransportResult<Vec<Emoji>>;
}
