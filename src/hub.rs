//! In-memory chat backend.
//!
//! A single community with any number of text channels. Connected WebSocket
//! clients and the game both talk to the same hub; every change is fanned out
//! on the broadcast channel.

use crate::protocol::{PostedMessage, ServerMessage};
use crate::transport::{ChatTransport, TransportError, TransportResult};
use crate::types::*;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};

/// Longest message the hub accepts before splitting
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Messages kept per channel before the oldest are dropped
pub const DEFAULT_CHANNEL_HISTORY: usize = 500;

#[derive(Debug, Clone)]
struct StoredMessage {
    message: PostedMessage,
    reactions: Vec<(Emoji, Vec<UserId>)>,
}

#[derive(Debug, Default)]
struct MessageStore {
    by_id: HashMap<MessageId, StoredMessage>,
    /// Posting order per channel, oldest first
    order: HashMap<ChannelId, VecDeque<MessageId>>,
}

impl MessageStore {
    /// Store a message, returning the ids that fell out of the channel history
    fn insert(&mut self, message: PostedMessage, limit: usize) -> Vec<MessageId> {
        let order = self.order.entry(message.channel_id.clone()).or_default();
        order.push_back(message.id.clone());

        let mut evicted = Vec::new();
        while order.len() > limit {
            if let Some(old) = order.pop_front() {
                self.by_id.remove(&old);
                evicted.push(old);
            }
        }

        self.by_id.insert(
            message.id.clone(),
            StoredMessage {
                message,
                reactions: Vec::new(),
            },
        );
        evicted
    }

    fn remove(&mut self, id: &MessageId) -> Option<StoredMessage> {
        let stored = self.by_id.remove(id)?;
        if let Some(order) = self.order.get_mut(&stored.message.channel_id) {
            order.retain(|m| m != id);
            if order.is_empty() {
                self.order.remove(&stored.message.channel_id);
            }
        }
        Some(stored)
    }

    fn get(&self, id: &MessageId) -> Option<&StoredMessage> {
        self.by_id.get(id)
    }

    fn get_mut(&mut self, id: &MessageId) -> TransportResult<&mut StoredMessage> {
        self.by_id
            .get_mut(id)
            .ok_or_else(|| TransportError::MessageNotFound(id.clone()))
    }

    fn channel(&self, channel: &str) -> impl Iterator<Item = &PostedMessage> + '_ {
        self.order
            .get(channel)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .map(|stored| &stored.message)
    }
}

type Watchers = HashMap<MessageId, Vec<mpsc::UnboundedSender<ReactionEvent>>>;

#[derive(Clone)]
pub struct ChatHub {
    bot: Member,
    members: Arc<RwLock<HashMap<UserId, Member>>>,
    messages: Arc<RwLock<MessageStore>>,
    history_limit: usize,
    custom_emojis: Arc<RwLock<Vec<Emoji>>>,
    watchers: Arc<RwLock<Watchers>>,
    broadcast: broadcast::Sender<ServerMessage>,
}

impl ChatHub {
    pub fn new(bot_name: &str) -> Self {
        Self::with_history_limit(bot_name, DEFAULT_CHANNEL_HISTORY)
    }

    pub fn with_history_limit(bot_name: &str, history_limit: usize) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        let bot = Member {
            id: ulid::Ulid::new().to_string(),
            display_name: bot_name.to_string(),
            bot: true,
        };

        let mut members = HashMap::new();
        members.insert(bot.id.clone(), bot.clone());

        Self {
            bot,
            members: Arc::new(RwLock::new(members)),
            messages: Arc::new(RwLock::new(MessageStore::default())),
            history_limit: history_limit.max(1),
            custom_emojis: Arc::new(RwLock::new(Vec::new())),
            watchers: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
        }
    }

    pub fn bot(&self) -> &Member {
        &self.bot
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.broadcast.subscribe()
    }

    /// Add a human member; guests without a name get a generated one
    pub async fn join(&self, display_name: Option<String>) -> Member {
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .or_else(|| petname::petname(2, " "))
            .unwrap_or_else(|| "Anonymous".to_string());

        self.add_member(Member {
            id: ulid::Ulid::new().to_string(),
            display_name,
            bot: false,
        })
        .await
    }

    /// Add an arbitrary member, bots included
    pub async fn add_member(&self, member: Member) -> Member {
        tracing::debug!("Member joined: {} ({})", member.display_name, member.id);
        self.members
            .write()
            .await
            .insert(member.id.clone(), member.clone());
        member
    }

    pub async fn leave(&self, user: &UserId) {
        if self.members.write().await.remove(user).is_some() {
            tracing::debug!("Member left: {}", user);
        }
    }

    pub async fn add_custom_emoji(&self, emoji: Emoji) {
        let mut emojis = self.custom_emojis.write().await;
        if !emojis.contains(&emoji) {
            emojis.push(emoji);
        }
    }

    /// Post as `author`, splitting content longer than [`MAX_MESSAGE_LEN`]
    pub async fn post(
        &self,
        author: &UserId,
        channel: &ChannelId,
        content: &str,
    ) -> TransportResult<Vec<MessageId>> {
        if !self.members.read().await.contains_key(author) {
            return Err(TransportError::UnknownUser(author.clone()));
        }

        let mut ids = Vec::new();
        for chunk in split_content(content) {
            let message = PostedMessage {
                id: ulid::Ulid::new().to_string(),
                channel_id: channel.clone(),
                author_id: author.clone(),
                content: chunk,
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            ids.push(message.id.clone());

            let evicted = self
                .messages
                .write()
                .await
                .insert(message.clone(), self.history_limit);
            if !evicted.is_empty() {
                tracing::debug!("Dropped {} old message(s) from {}", evicted.len(), channel);
                let mut watchers = self.watchers.write().await;
                for id in &evicted {
                    watchers.remove(id);
                }
            }

            // No receivers connected is fine
            let _ = self.broadcast.send(ServerMessage::MessagePosted { message });
        }
        Ok(ids)
    }

    pub async fn add_reaction(
        &self,
        user: &UserId,
        message: &MessageId,
        emoji: &Emoji,
    ) -> TransportResult<()> {
        let member = self
            .members
            .read()
            .await
            .get(user)
            .cloned()
            .ok_or_else(|| TransportError::UnknownUser(user.clone()))?;

        // Watchers are notified under the store lock so a new subscription sees
        // each reaction exactly once
        let mut messages = self.messages.write().await;
        let stored = messages.get_mut(message)?;

        match stored.reactions.iter_mut().find(|(e, _)| e == emoji) {
            Some((_, users)) if users.contains(user) => return Ok(()),
            Some((_, users)) => users.push(user.clone()),
            None => stored.reactions.push((emoji.clone(), vec![user.clone()])),
        }
        let channel_id = stored.message.channel_id.clone();

        let _ = self.broadcast.send(ServerMessage::ReactionAdded {
            channel_id: channel_id.clone(),
            message_id: message.clone(),
            user_id: user.clone(),
            emoji: emoji.clone(),
        });
        self.notify(ReactionEvent {
            kind: ReactionKind::Added,
            message_id: message.clone(),
            channel_id,
            user_id: user.clone(),
            user_is_bot: member.bot,
            emoji: emoji.clone(),
        })
        .await;
        Ok(())
    }

    pub async fn remove_user_reaction(
        &self,
        user: &UserId,
        message: &MessageId,
        emoji: &Emoji,
    ) -> TransportResult<()> {
        let user_is_bot = self
            .members
            .read()
            .await
            .get(user)
            .map(|m| m.bot)
            .unwrap_or(false);

        let mut messages = self.messages.write().await;
        let stored = messages.get_mut(message)?;

        let Some(pos) = stored.reactions.iter().position(|(e, _)| e == emoji) else {
            return Ok(());
        };
        let users = &mut stored.reactions[pos].1;
        let before = users.len();
        users.retain(|u| u != user);
        if users.len() == before {
            return Ok(());
        }
        if users.is_empty() {
            stored.reactions.remove(pos);
        }
        let channel_id = stored.message.channel_id.clone();

        let _ = self.broadcast.send(ServerMessage::ReactionRemoved {
            channel_id: channel_id.clone(),
            message_id: message.clone(),
            user_id: user.clone(),
            emoji: emoji.clone(),
        });
        self.notify(ReactionEvent {
            kind: ReactionKind::Removed,
            message_id: message.clone(),
            channel_id,
            user_id: user.clone(),
            user_is_bot,
            emoji: emoji.clone(),
        })
        .await;
        Ok(())
    }

    /// Delete right away; deleting a missing message is a no-op
    pub async fn delete_now(&self, message: &MessageId) {
        let removed = self.messages.write().await.remove(message);
        self.watchers.write().await.remove(message);

        if let Some(stored) = removed {
            let _ = self.broadcast.send(ServerMessage::MessageDeleted {
                channel_id: stored.message.channel_id,
                message_id: stored.message.id,
            });
        }
    }

    /// Messages currently visible in `channel`, oldest first
    pub async fn messages_in(&self, channel: &str) -> Vec<PostedMessage> {
        self.messages
            .read()
            .await
            .channel(channel)
            .cloned()
            .collect()
    }

    /// Reactions on a message, empty if the message is gone
    pub async fn reactions(&self, message: &MessageId) -> Vec<(Emoji, Vec<UserId>)> {
        self.messages
            .read()
            .await
            .get(message)
            .map(|m| m.reactions.clone())
            .unwrap_or_default()
    }

    pub async fn custom_emojis(&self) -> Vec<Emoji> {
        self.custom_emojis.read().await.clone()
    }

    /// Number of live reaction subscriptions across all messages
    pub async fn watcher_count(&self) -> usize {
        self.watchers.read().await.values().map(Vec::len).sum()
    }

    async fn notify(&self, event: ReactionEvent) {
        let mut watchers = self.watchers.write().await;
        if let Some(senders) = watchers.get_mut(&event.message_id) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            if senders.is_empty() {
                watchers.remove(&event.message_id);
            }
        }
    }
}

/// Split on line boundaries, hard-splitting single lines that are too long
fn split_content(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.split('\n') {
        let mut line = line;
        while line.chars().count() > MAX_MESSAGE_LEN {
            let cut = line
                .char_indices()
                .nth(MAX_MESSAGE_LEN)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }

        let extra = if current.is_empty() { 0 } else { 1 };
        if current.chars().count() + extra + line.chars().count() > MAX_MESSAGE_LEN {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl ChatTransport for ChatHub {
    fn bot_id(&self) -> &UserId {
        &self.bot.id
    }

    async fn send(&self, channel: &ChannelId, content: &str) -> TransportResult<Vec<MessageId>> {
        self.post(&self.bot.id, channel, content).await
    }

    async fn react(&self, message: &MessageId, emoji: &Emoji) -> TransportResult<()> {
        self.add_reaction(&self.bot.id, message, emoji).await
    }

    async fn remove_reaction(
        &self,
        message: &MessageId,
        emoji: &Emoji,
        user: &UserId,
    ) -> TransportResult<()> {
        self.remove_user_reaction(user, message, emoji).await
    }

    async fn delete_message(&self, message: &MessageId, after: Duration) -> TransportResult<()> {
        if after.is_zero() {
            self.delete_now(message).await;
            return Ok(());
        }

        let hub = self.clone();
        let message = message.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            hub.delete_now(&message).await;
        });
        Ok(())
    }

    async fn subscribe_reactions(
        &self,
        message: &MessageId,
    ) -> TransportResult<mpsc::UnboundedReceiver<ReactionEvent>> {
        let messages = self.messages.read().await;
        let stored = messages
            .get(message)
            .ok_or_else(|| TransportError::MessageNotFound(message.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let members = self.members.read().await;
            for (emoji, users) in &stored.reactions {
                for user in users {
                    let _ = tx.send(ReactionEvent {
                        kind: ReactionKind::Added,
                        message_id: message.clone(),
                        channel_id: stored.message.channel_id.clone(),
                        user_id: user.clone(),
                        user_is_bot: members.get(user).map(|m| m.bot).unwrap_or(false),
                        emoji: emoji.clone(),
                    });
                }
            }
        }

        let mut watchers = self.watchers.write().await;
        watchers.retain(|_, senders| {
            senders.retain(|tx| !tx.is_closed());
            !senders.is_empty()
        });
        watchers.entry(message.clone()).or_default().push(tx);
        Ok(rx)
    }

    async fn member(&self, user: &UserId) -> TransportResult<Option<Member>> {
        Ok(self.members.read().await.get(user).cloned())
    }

    async fn guild_emojis(&self) -> TransportResult<Vec<Emoji>> {
        Ok(self.custom_emojis().await)
    }
}
