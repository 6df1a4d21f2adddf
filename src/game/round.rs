use super::format;
use super::gate::Verdict;
use super::registry::ParticipantRegistry;
use super::tally::VoteTally;
use super::window::CollectionWindow;
use super::{GameError, ReactionGate};
use crate::config::GameConfig;
use crate::questions::QuestionSource;
use crate::transport::ChatTransport;
use crate::types::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    SigningUp,
    Tallying,
    Resolving,
    RoundDone,
    Aborted,
    Finished,
}

/// Drives the sign-up and voting phases of one channel's game.
///
/// Every posted message is best effort: a failed send is logged and the timers
/// keep running.
pub struct RoundController {
    transport: Arc<dyn ChatTransport>,
    questions: Arc<dyn QuestionSource>,
    config: GameConfig,
    channel: ChannelId,
    state: RoundState,
    history: Vec<RoundState>,
}

impl RoundController {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        questions: Arc<dyn QuestionSource>,
        config: GameConfig,
        channel: ChannelId,
    ) -> Self {
        Self {
            transport,
            questions,
            config,
            channel,
            state: RoundState::SigningUp,
            history: vec![RoundState::SigningUp],
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Every state entered so far, starting with `SigningUp`
    pub fn history(&self) -> &[RoundState] {
        &self.history
    }

    fn is_valid_transition(from: RoundState, to: RoundState) -> bool {
        use RoundState::*;

        matches!(
            (from, to),
            (SigningUp, Tallying)
                | (SigningUp, Aborted)
                | (Tallying, Resolving)
                | (Tallying, Aborted)
                | (Resolving, RoundDone)
                | (RoundDone, Tallying)
                | (RoundDone, Finished)
        )
    }

    fn transition(&mut self, to: RoundState) -> Result<(), GameError> {
        if !Self::is_valid_transition(self.state, to) {
            return Err(GameError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(
            "Channel {}: {:?} -> {:?}",
            self.channel,
            self.state,
            to
        );
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Run the sign-up phase.
    ///
    /// Ends in `Tallying` with the sorted participants, or in `Aborted` with an
    /// empty list when nobody joined.
    pub async fn sign_up(&mut self) -> Result<Vec<Participant>, GameError> {
        if self.state != RoundState::SigningUp {
            return Err(GameError::InvalidTransition {
                from: self.state,
                to: RoundState::SigningUp,
            });
        }

        let custom_emojis = match self.transport.guild_emojis().await {
            Ok(emojis) => emojis,
            Err(e) => {
                tracing::warn!("Failed to load custom emoji, allowing standard only: {}", e);
                Vec::new()
            }
        };
        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            self.transport.bot_id().clone(),
            &custom_emojis,
        ));

        let prompt = self
            .say(&format::sign_up_prompt(self.config.sign_up_window))
            .await
            .and_then(|ids| ids.last().cloned());

        let mut window = self
            .open_window(prompt.as_ref(), self.config.sign_up_window)
            .await;
        if let Some(message) = &prompt {
            self.seed(message, &self.config.quick_picks).await;
        }

        while let Some(event) = window.next_event().await {
            match event.kind {
                ReactionKind::Added => {
                    let verdict = registry.record(&event);
                    self.apply(&event, &verdict).await;
                }
                ReactionKind::Removed => registry.withdraw(&event),
            }
        }

        let participants = registry.register(self.transport.as_ref()).await;
        tracing::info!(
            "Channel {}: sign-up closed with {} participant(s)",
            self.channel,
            participants.len()
        );

        if participants.is_empty() {
            self.say(&format::not_enough_players()).await;
            self.transition(RoundState::Aborted)?;
        } else {
            self.transition(RoundState::Tallying)?;
        }
        Ok(participants)
    }

    /// Ask one question and collect the votes.
    ///
    /// Must be called in `Tallying`; ends in `RoundDone`. A question source
    /// failure ends in `Aborted` and is returned as an error.
    pub async fn play_round(
        &mut self,
        participants: &[Participant],
        round: u32,
        total: u32,
    ) -> Result<RoundResult, GameError> {
        if self.state != RoundState::Tallying {
            return Err(GameError::InvalidTransition {
                from: self.state,
                to: RoundState::Tallying,
            });
        }

        let question = match self.questions.fetch_question().await {
            Ok(question) => question,
            Err(e) => {
                tracing::error!("Channel {}: failed to fetch question: {}", self.channel, e);
                self.say(&format::question_unavailable()).await;
                self.transition(RoundState::Aborted)?;
                return Err(e.into());
            }
        };
        tracing::info!(
            "Channel {}: round {}/{} asks \"{}\"",
            self.channel,
            round,
            total,
            question
        );

        let voting_window = self.config.voting_window;
        self.say(&format::voting_prompt(&question, voting_window))
            .await;

        let list = self
            .say(&format::participant_list(participants))
            .await
            .unwrap_or_default();

        let mut tally = VoteTally::new(self.transport.bot_id().clone(), participants.to_vec());
        let vote_message = list.last();
        let mut window = self.open_window(vote_message, voting_window).await;
        if let Some(message) = vote_message {
            let emojis: Vec<Emoji> = participants.iter().map(|p| p.emoji.clone()).collect();
            self.seed(message, &emojis).await;
        }
        for message in &list {
            if let Err(e) = self.transport.delete_message(message, voting_window).await {
                tracing::warn!("Failed to schedule deletion of {}: {}", message, e);
            }
        }

        let mut early_close_armed = false;
        while let Some(event) = window.next_event().await {
            match event.kind {
                ReactionKind::Added => {
                    let verdict = tally.record(&event);
                    self.apply(&event, &verdict).await;
                }
                ReactionKind::Removed => tally.withdraw(&event),
            }

            if !early_close_armed && tally.is_complete() {
                early_close_armed = true;
                tracing::info!(
                    "Channel {}: everyone voted, closing in {:?}",
                    self.channel,
                    self.config.early_close_grace
                );
                self.say(&format::everyone_voted(self.config.early_close_grace))
                    .await;
                window
                    .stop_handle()
                    .stop_after(self.config.early_close_grace);
            }
        }

        self.transition(RoundState::Resolving)?;
        let result = tally.settle();
        tracing::info!(
            "Channel {}: round {} settled with {} vote(s) for {} winner(s)",
            self.channel,
            round,
            result.max_votes,
            result.winners.len()
        );
        self.say(&format::round_result(&question, &result, participants))
            .await;
        self.transition(RoundState::RoundDone)?;

        Ok(result)
    }

    /// Announce and wait out the pause before `round`, then re-enter `Tallying`
    pub async fn next_round(&mut self, round: u32, total: u32) -> Result<(), GameError> {
        if self.state != RoundState::RoundDone {
            return Err(GameError::InvalidTransition {
                from: self.state,
                to: RoundState::Tallying,
            });
        }
        self.say(&format::next_round(round, total, self.config.round_pause))
            .await;
        tokio::time::sleep(self.config.round_pause).await;
        self.transition(RoundState::Tallying)
    }

    /// Close a session whose last round is done
    pub fn finish(&mut self) -> Result<(), GameError> {
        self.transition(RoundState::Finished)
    }

    /// Post to the game channel, logging instead of failing
    async fn say(&self, content: &str) -> Option<Vec<MessageId>> {
        match self.transport.send(&self.channel, content).await {
            Ok(ids) => Some(ids),
            Err(e) => {
                tracing::warn!("Failed to post to {}: {}", self.channel, e);
                None
            }
        }
    }

    /// Post a notice that removes itself after the warning TTL
    async fn warn(&self, content: &str) {
        for message in self.say(content).await.unwrap_or_default() {
            if let Err(e) = self
                .transport
                .delete_message(&message, self.config.warning_ttl)
                .await
            {
                tracing::warn!("Failed to schedule deletion of warning {}: {}", message, e);
            }
        }
    }

    async fn seed(&self, message: &MessageId, emojis: &[Emoji]) {
        for emoji in emojis {
            if let Err(e) = self.transport.react(message, emoji).await {
                tracing::warn!("Failed to seed {} on {}: {}", emoji, message, e);
            }
        }
    }

    /// Carry out the side effects of a gate decision
    async fn apply(&self, event: &ReactionEvent, verdict: &Verdict) {
        match verdict {
            Verdict::Accept { retract } => {
                for old in retract {
                    self.retract(&event.message_id, old, &event.user_id).await;
                }
            }
            Verdict::Reject(rejection) => {
                tracing::debug!(
                    "Rejected {} from {}: {:?}",
                    event.emoji,
                    event.user_id,
                    rejection
                );
                if rejection.retracts() {
                    self.retract(&event.message_id, &event.emoji, &event.user_id)
                        .await;
                }
                if let Some(warning) = rejection.warning(&event.user_id) {
                    self.warn(&warning).await;
                }
            }
        }
    }

    async fn retract(&self, message: &MessageId, emoji: &Emoji, user: &UserId) {
        if let Err(e) = self.transport.remove_reaction(message, emoji, user).await {
            tracing::warn!("Failed to retract {} by {}: {}", emoji, user, e);
        }
    }

    /// Open a window on `message`. Reactions that arrived before the subscription
    /// are replayed by the transport. Without a message (or a subscription) the
    /// window still runs its full duration so the game keeps its pace.
    async fn open_window(&self, message: Option<&MessageId>, duration: Duration) -> CollectionWindow {
        let Some(message) = message else {
            return CollectionWindow::idle(duration);
        };

        match self.transport.subscribe_reactions(message).await {
            Ok(events) => CollectionWindow::open(events, duration),
            Err(e) => {
                tracing::warn!("Failed to watch reactions on {}: {}", message, e);
                CollectionWindow::idle(duration)
            }
        }
    }
}
