use super::board::ReactionBoard;
use super::gate::{ReactionGate, Verdict};
use crate::transport::ChatTransport;
use crate::types::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Collects sign-up reactions and turns them into participants
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    gate: ReactionGate,
    board: ReactionBoard,
}

impl ParticipantRegistry {
    pub fn new(gate: ReactionGate) -> Self {
        Self {
            gate,
            board: ReactionBoard::new(),
        }
    }

    /// Evaluate a reaction-add event and claim the emoji when accepted
    pub fn record(&mut self, event: &ReactionEvent) -> Verdict {
        let verdict = self.gate.evaluate(event, &self.board);
        self.board.apply(&event.emoji, &event.user_id, &verdict);
        verdict
    }

    /// A reaction was taken back
    pub fn withdraw(&mut self, event: &ReactionEvent) {
        self.board.remove(&event.emoji, &event.user_id);
    }

    pub fn board(&self) -> &ReactionBoard {
        &self.board
    }

    /// Resolve every claimed emoji to the member holding it, sorted by display name.
    ///
    /// Reactors that can no longer be resolved (left the community, lookup failed)
    /// are dropped. An empty result means not enough players.
    pub async fn register(&self, transport: &dyn ChatTransport) -> Vec<Participant> {
        let mut seen: HashSet<UserId> = HashSet::new();
        let mut participants = Vec::new();

        for (emoji, reactors) in self.board.iter() {
            let Some(user) = reactors.first() else {
                continue;
            };

            let member = match transport.member(user).await {
                Ok(Some(member)) if !member.bot => member,
                Ok(Some(_)) => continue,
                Ok(None) => {
                    tracing::debug!("Sign-up reactor {} left before registration", user);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve sign-up reactor {}: {}", user, e);
                    continue;
                }
            };

            if !seen.insert(member.id.clone()) {
                tracing::error!("Member {} holds more than one sign-up emoji", member.id);
                debug_assert!(false, "member registered twice");
                continue;
            }

            participants.push(Participant {
                member,
                emoji: emoji.clone(),
            });
        }

        participants.sort_by(|a, b| compare_names(a.display_name(), b.display_name()));
        participants
    }
}

/// Sort key following the root collation levels: base letters, then accents,
/// then case with lowercase first
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct NameKey {
    base: String,
    accents: String,
    uppercase: Vec<bool>,
}

impl NameKey {
    fn new(name: &str) -> Self {
        let decomposed: String = name.nfd().collect();
        let letters: Vec<char> = decomposed.chars().filter(|c| !is_combining_mark(*c)).collect();

        Self {
            base: letters.iter().flat_map(|c| c.to_lowercase()).collect(),
            accents: decomposed.to_lowercase(),
            uppercase: letters.iter().map(|c| c.is_uppercase()).collect(),
        }
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    NameKey::new(a)
        .cmp(&NameKey::new(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ChatHub;

    fn added(hub_msg: &str, user: &Member, emoji: Emoji) -> ReactionEvent {
        ReactionEvent {
            kind: ReactionKind::Added,
            message_id: hub_msg.to_string(),
            channel_id: "general".to_string(),
            user_id: user.id.clone(),
            user_is_bot: user.bot,
            emoji,
        }
    }

    #[test]
    fn test_compare_names_ignores_case() {
        let mut names = vec!["bob", "Alice", "carol", "Bob"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["Alice", "bob", "Bob", "carol"]);
    }

    #[test]
    fn test_compare_names_folds_accents() {
        let mut names = vec!["Zoe", "Élodie", "émile", "Elodie", "Ödön", "Otto"];
        names.sort_by(|a, b| compare_names(a, b));
        assert_eq!(names, vec!["Elodie", "Élodie", "émile", "Ödön", "Otto", "Zoe"]);
    }

    #[tokio::test]
    async fn test_register_sorts_accented_names() {
        let hub = ChatHub::new("Who'd Rather");
        let zoe = hub.join(Some("Zoe".to_string())).await;
        let emile = hub.join(Some("Émile".to_string())).await;

        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            hub.bot().id.clone(),
            &[],
        ));
        registry.record(&added("m", &zoe, Emoji::standard("🍕")));
        registry.record(&added("m", &emile, Emoji::standard("🍔")));

        let participants = registry.register(&hub).await;
        let names: Vec<_> = participants.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["Émile", "Zoe"]);
    }

    #[tokio::test]
    async fn test_register_sorts_by_display_name() {
        let hub = ChatHub::new("Who'd Rather");
        let bob = hub.join(Some("Bob".to_string())).await;
        let alice = hub.join(Some("alice".to_string())).await;

        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            hub.bot().id.clone(),
            &[],
        ));
        assert!(registry
            .record(&added("m", &bob, Emoji::standard("🍔")))
            .is_accepted());
        assert!(registry
            .record(&added("m", &alice, Emoji::standard("🍕")))
            .is_accepted());

        let participants = registry.register(&hub).await;
        let names: Vec<_> = participants.iter().map(|p| p.display_name()).collect();
        assert_eq!(names, vec!["alice", "Bob"]);
        assert_eq!(participants[0].emoji, Emoji::standard("🍕"));
        assert_eq!(participants[1].emoji, Emoji::standard("🍔"));
    }

    #[tokio::test]
    async fn test_register_drops_members_who_left() {
        let hub = ChatHub::new("Who'd Rather");
        let alice = hub.join(Some("Alice".to_string())).await;
        let bob = hub.join(Some("Bob".to_string())).await;

        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            hub.bot().id.clone(),
            &[],
        ));
        registry.record(&added("m", &alice, Emoji::standard("🍕")));
        registry.record(&added("m", &bob, Emoji::standard("🍔")));
        hub.leave(&bob.id).await;

        let participants = registry.register(&hub).await;
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].user_id(), &alice.id);
    }

    #[tokio::test]
    async fn test_register_never_shares_emoji_or_member() {
        let hub = ChatHub::new("Who'd Rather");
        let alice = hub.join(Some("Alice".to_string())).await;
        let bob = hub.join(Some("Bob".to_string())).await;

        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            hub.bot().id.clone(),
            &[],
        ));
        let pizza = Emoji::standard("🍕");
        let burger = Emoji::standard("🍔");
        let taco = Emoji::standard("🌮");

        registry.record(&added("m", &alice, pizza.clone()));
        // Bob tries to steal Alice's emoji
        assert!(!registry.record(&added("m", &bob, pizza.clone())).is_accepted());
        registry.record(&added("m", &bob, burger.clone()));
        // Alice switches twice
        registry.record(&added("m", &alice, taco.clone()));
        registry.record(&added("m", &alice, burger.clone()));
        registry.record(&added("m", &alice, pizza.clone()));

        let participants = registry.register(&hub).await;
        assert_eq!(participants.len(), 2);

        let emojis: HashSet<_> = participants.iter().map(|p| p.emoji.clone()).collect();
        let members: HashSet<_> = participants.iter().map(|p| p.user_id().clone()).collect();
        assert_eq!(emojis.len(), 2);
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn test_withdrawn_reaction_frees_emoji() {
        let hub = ChatHub::new("Who'd Rather");
        let alice = hub.join(Some("Alice".to_string())).await;
        let bob = hub.join(Some("Bob".to_string())).await;

        let mut registry = ParticipantRegistry::new(ReactionGate::sign_up(
            hub.bot().id.clone(),
            &[],
        ));
        let pizza = Emoji::standard("🍕");
        registry.record(&added("m", &alice, pizza.clone()));

        let mut removed = added("m", &alice, pizza.clone());
        removed.kind = ReactionKind::Removed;
        registry.withdraw(&removed);

        assert!(registry.record(&added("m", &bob, pizza)).is_accepted());
        let participants = registry.register(&hub).await;
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].user_id(), &bob.id);
    }
}
