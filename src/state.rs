use crate::command::parse_trigger;
use crate::config::GameConfig;
use crate::game::{format, ActiveChannels, GameError, GameSession, InMemoryActiveChannels, SessionReport};
use crate::hub::ChatHub;
use crate::questions::QuestionSource;
use crate::transport::TransportResult;
use crate::types::*;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: ChatHub,
    pub active_channels: Arc<InMemoryActiveChannels>,
    pub questions: Arc<dyn QuestionSource>,
    pub config: GameConfig,
}

impl AppState {
    pub fn new(hub: ChatHub, questions: Arc<dyn QuestionSource>, config: GameConfig) -> Self {
        Self {
            hub,
            active_channels: Arc::new(InMemoryActiveChannels::new()),
            questions,
            config,
        }
    }

    /// Post a chat line and start a game if it is the trigger phrase.
    ///
    /// Returns the handle of the spawned session, if one was started.
    pub async fn handle_chat_line(
        &self,
        author: &UserId,
        channel: &ChannelId,
        text: &str,
    ) -> TransportResult<Option<JoinHandle<Result<SessionReport, GameError>>>> {
        self.hub.post(author, channel, text).await?;

        let rounds = match parse_trigger(text, &self.config) {
            None => return Ok(None),
            Some(Ok(rounds)) => rounds,
            Some(Err(e)) => {
                tracing::debug!("Bad trigger in {}: {}", channel, e);
                self.say(channel, &format::usage(&self.config.trigger, self.config.max_rounds))
                    .await;
                return Ok(None);
            }
        };

        if self.active_channels.contains(channel) {
            self.say(channel, &format::already_running()).await;
            return Ok(None);
        }

        tracing::info!("{} started a game in {} ({} round(s))", author, channel, rounds);
        Ok(Some(self.spawn_session(channel.clone(), rounds)))
    }

    fn spawn_session(
        &self,
        channel: ChannelId,
        rounds: u32,
    ) -> JoinHandle<Result<SessionReport, GameError>> {
        let session = GameSession::new(
            Arc::new(self.hub.clone()),
            self.questions.clone(),
            self.active_channels.clone(),
            self.config.clone(),
        );

        tokio::spawn(async move {
            let result = session.start(channel.clone(), rounds).await;
            match &result {
                Ok(report) => tracing::info!(
                    "Game in {} ended: {:?} after {} round(s)",
                    channel,
                    report.outcome,
                    report.results.len()
                ),
                Err(e) => tracing::error!("Game in {} failed: {}", channel, e),
            }
            result
        })
    }

    async fn say(&self, channel: &ChannelId, content: &str) {
        let bot = self.hub.bot().id.clone();
        if let Err(e) = self.hub.post(&bot, channel, content).await {
            tracing::warn!("Failed to post to {}: {}", channel, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SessionOutcome;
    use crate::questions::StaticQuestions;

    fn state() -> AppState {
        AppState::new(
            ChatHub::new("Who'd Rather"),
            Arc::new(StaticQuestions::default()),
            GameConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_plain_chat_is_posted() {
        let state = state();
        let alice = state.hub.join(Some("Alice".to_string())).await;
        let channel = "general".to_string();

        let handle = state
            .handle_chat_line(&alice.id, &channel, "hello")
            .await
            .unwrap();
        assert!(handle.is_none());

        let messages = state.hub.messages_in(&channel).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author_id, alice.id);
    }

    #[tokio::test]
    async fn test_bad_trigger_posts_usage() {
        let state = state();
        let alice = state.hub.join(Some("Alice".to_string())).await;
        let channel = "general".to_string();

        let handle = state
            .handle_chat_line(&alice.id, &channel, "wwr lots")
            .await
            .unwrap();
        assert!(handle.is_none());

        let messages = state.hub.messages_in(&channel).await;
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.starts_with("Usage:"));
        assert!(!state.active_channels.contains(&channel));
    }

    #[tokio::test]
    async fn test_unknown_author_is_rejected() {
        let state = state();
        let result = state
            .handle_chat_line(&"ghost".to_string(), &"general".to_string(), "wwr")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_trigger_is_refused() {
        let state = state();
        let alice = state.hub.join(Some("Alice".to_string())).await;
        let channel = "general".to_string();

        let first = state
            .handle_chat_line(&alice.id, &channel, "wwr")
            .await
            .unwrap()
            .expect("session should start");

        // Let the session claim the channel and post its prompt
        tokio::task::yield_now().await;
        while !state.active_channels.contains(&channel) {
            tokio::task::yield_now().await;
        }

        let second = state
            .handle_chat_line(&alice.id, &channel, "wwr")
            .await
            .unwrap();
        assert!(second.is_none());

        let messages = state.hub.messages_in(&channel).await;
        assert!(messages
            .iter()
            .any(|m| m.content == format::already_running()));

        // Nobody signs up, so the first game aborts on its own
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.outcome, SessionOutcome::NotEnoughPlayers);
        assert!(!state.active_channels.contains(&channel));
    }
}
