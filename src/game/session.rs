use super::format;
use super::round::{RoundController, RoundState};
use super::GameError;
use crate::config::GameConfig;
use crate::questions::QuestionSource;
use crate::transport::ChatTransport;
use crate::types::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Registry of channels that currently host a session
pub trait ActiveChannels: Send + Sync {
    fn contains(&self, channel: &ChannelId) -> bool;

    /// Returns false if the channel was already active
    fn insert(&self, channel: &ChannelId) -> bool;

    fn remove(&self, channel: &ChannelId);
}

#[derive(Debug, Default)]
pub struct InMemoryActiveChannels {
    channels: Mutex<HashSet<ChannelId>>,
}

impl InMemoryActiveChannels {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<ChannelId>> {
        self.channels.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ActiveChannels for InMemoryActiveChannels {
    fn contains(&self, channel: &ChannelId) -> bool {
        self.lock().contains(channel)
    }

    fn insert(&self, channel: &ChannelId) -> bool {
        self.lock().insert(channel.clone())
    }

    fn remove(&self, channel: &ChannelId) {
        self.lock().remove(channel);
    }
}

/// Releases the channel when the session ends, however it ends
struct ChannelGuard {
    registry: Arc<dyn ActiveChannels>,
    channel: ChannelId,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.channel);
        tracing::debug!("Channel {} released", self.channel);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    NotEnoughPlayers,
    QuestionUnavailable,
    /// Refused because the channel already hosts a session
    AlreadyRunning,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub participants: Vec<Participant>,
    /// One result per completed round
    pub results: Vec<RoundResult>,
    /// Every state the round controller entered
    pub states: Vec<RoundState>,
}

impl SessionReport {
    fn refused() -> Self {
        Self {
            outcome: SessionOutcome::AlreadyRunning,
            participants: Vec::new(),
            results: Vec::new(),
            states: Vec::new(),
        }
    }
}

/// One activation of the game in a channel: sign-up once, then `rounds` votes
pub struct GameSession {
    transport: Arc<dyn ChatTransport>,
    questions: Arc<dyn QuestionSource>,
    active_channels: Arc<dyn ActiveChannels>,
    config: GameConfig,
}

impl GameSession {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        questions: Arc<dyn QuestionSource>,
        active_channels: Arc<dyn ActiveChannels>,
        config: GameConfig,
    ) -> Self {
        Self {
            transport,
            questions,
            active_channels,
            config,
        }
    }

    pub async fn start(&self, channel: ChannelId, rounds: u32) -> Result<SessionReport, GameError> {
        if !self.active_channels.insert(&channel) {
            tracing::info!("Channel {} already hosts a game, refusing", channel);
            if let Err(e) = self.transport.send(&channel, &format::already_running()).await {
                tracing::warn!("Failed to post to {}: {}", channel, e);
            }
            return Ok(SessionReport::refused());
        }
        let _guard = ChannelGuard {
            registry: self.active_channels.clone(),
            channel: channel.clone(),
        };

        let rounds = rounds.clamp(1, self.config.max_rounds.max(1));
        tracing::info!("Starting game in {} with {} round(s)", channel, rounds);

        let mut controller = RoundController::new(
            self.transport.clone(),
            self.questions.clone(),
            self.config.clone(),
            channel.clone(),
        );

        let participants = controller.sign_up().await?;
        if participants.is_empty() {
            return Ok(SessionReport {
                outcome: SessionOutcome::NotEnoughPlayers,
                participants,
                results: Vec::new(),
                states: controller.history().to_vec(),
            });
        }

        let mut results = Vec::new();
        for round in 1..=rounds {
            if round > 1 {
                controller.next_round(round, rounds).await?;
            }

            match controller.play_round(&participants, round, rounds).await {
                Ok(result) => results.push(result),
                Err(GameError::Question(e)) => {
                    tracing::warn!("Game in {} stopped after {} round(s): {}", channel, round - 1, e);
                    return Ok(SessionReport {
                        outcome: SessionOutcome::QuestionUnavailable,
                        participants,
                        results,
                        states: controller.history().to_vec(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        controller.finish()?;

        tracing::info!("Game in {} finished after {} round(s)", channel, rounds);
        Ok(SessionReport {
            outcome: SessionOutcome::Completed,
            participants,
            results,
            states: controller.history().to_vec(),
        })
    }
}
