use super::board::ReactionBoard;
use super::gate::{ReactionGate, Verdict};
use crate::types::*;

/// Votes of one round.
///
/// Each emoji's reactors on the board form its vote record; the gate keeps every
/// voter in exactly one record.
#[derive(Debug, Clone)]
pub struct VoteTally {
    gate: ReactionGate,
    participants: Vec<Participant>,
    board: ReactionBoard,
}

impl VoteTally {
    pub fn new(bot_id: UserId, participants: Vec<Participant>) -> Self {
        Self {
            gate: ReactionGate::voting(bot_id, &participants),
            participants,
            board: ReactionBoard::new(),
        }
    }

    /// Evaluate a vote and count it when accepted
    pub fn record(&mut self, event: &ReactionEvent) -> Verdict {
        let verdict = self.gate.evaluate(event, &self.board);
        self.board.apply(&event.emoji, &event.user_id, &verdict);

        if verdict.is_accepted() && self.board.emojis_of(&event.user_id).count() > 1 {
            tracing::error!("Voter {} is counted for more than one emoji", event.user_id);
            debug_assert!(false, "voter appears in two vote records");
        }
        verdict
    }

    /// A vote was taken back
    pub fn withdraw(&mut self, event: &ReactionEvent) {
        self.board.remove(&event.emoji, &event.user_id);
    }

    pub fn votes_for(&self, emoji: &Emoji) -> usize {
        self.board.reactors(emoji).len()
    }

    /// Distinct voters currently counted
    pub fn voter_count(&self) -> usize {
        self.board.reactor_count()
    }

    /// Every participant has a vote on record
    pub fn is_complete(&self) -> bool {
        !self.participants.is_empty() && self.voter_count() >= self.participants.len()
    }

    /// Highest vote count and every emoji that reached it, in participant order
    pub fn settle(&self) -> RoundResult {
        let max_votes = self
            .participants
            .iter()
            .map(|p| self.votes_for(&p.emoji))
            .max()
            .unwrap_or(0);

        if max_votes == 0 {
            return RoundResult::default();
        }

        let winners = self
            .participants
            .iter()
            .filter(|p| self.votes_for(&p.emoji) == max_votes)
            .map(|p| p.emoji.clone())
            .collect();

        RoundResult { max_votes, winners }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn board(&self) -> &ReactionBoard {
        &self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::gate::Rejection;

    fn participant(id: &str, name: &str, emoji: &str) -> Participant {
        Participant {
            member: Member {
                id: id.to_string(),
                display_name: name.to_string(),
                bot: false,
            },
            emoji: Emoji::standard(emoji),
        }
    }

    fn vote(user: &str, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            kind: ReactionKind::Added,
            message_id: "list".to_string(),
            channel_id: "general".to_string(),
            user_id: user.to_string(),
            user_is_bot: false,
            emoji: Emoji::standard(emoji),
        }
    }

    fn unvote(user: &str, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            kind: ReactionKind::Removed,
            ..vote(user, emoji)
        }
    }

    fn trio() -> VoteTally {
        VoteTally::new(
            "bot".to_string(),
            vec![
                participant("alice", "Alice", "🍕"),
                participant("bob", "Bob", "🍔"),
                participant("carol", "Carol", "🌮"),
            ],
        )
    }

    #[test]
    fn test_settle_single_winner() {
        let mut tally = trio();
        tally.record(&vote("alice", "🍕"));
        tally.record(&vote("bob", "🍕"));
        tally.record(&vote("carol", "🍔"));

        let result = tally.settle();
        assert_eq!(result.max_votes, 2);
        assert_eq!(result.winners, vec![Emoji::standard("🍕")]);
    }

    #[test]
    fn test_settle_keeps_ties() {
        let mut tally = trio();
        tally.record(&vote("alice", "🍔"));
        tally.record(&vote("bob", "🍕"));
        tally.record(&vote("carol", "🌮"));

        let result = tally.settle();
        assert_eq!(result.max_votes, 1);
        assert!(result.is_tie());
        // Participant order, not vote order
        assert_eq!(
            result.winners,
            vec![
                Emoji::standard("🍕"),
                Emoji::standard("🍔"),
                Emoji::standard("🌮")
            ]
        );
    }

    #[test]
    fn test_settle_without_votes() {
        let tally = trio();
        let result = tally.settle();
        assert!(result.nobody_voted());
        assert_eq!(result.max_votes, 0);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut tally = trio();
        tally.record(&vote("alice", "🍕"));
        tally.record(&vote("bob", "🍔"));

        assert_eq!(tally.settle(), tally.settle());
    }

    #[test]
    fn test_non_participant_is_excluded() {
        let mut tally = VoteTally::new(
            "bot".to_string(),
            vec![
                participant("alice", "Alice", "🍕"),
                participant("bob", "Bob", "🍔"),
            ],
        );
        assert!(tally.record(&vote("alice", "🍕")).is_accepted());
        assert_eq!(
            tally.record(&vote("carol", "🍕")),
            Verdict::Reject(Rejection::NotParticipant)
        );

        assert_eq!(tally.votes_for(&Emoji::standard("🍕")), 1);
        assert_eq!(tally.voter_count(), 1);
    }

    #[test]
    fn test_switching_vote_counts_only_latest() {
        let mut tally = trio();
        tally.record(&vote("alice", "🍕"));
        let verdict = tally.record(&vote("alice", "🍔"));
        assert_eq!(
            verdict,
            Verdict::Accept {
                retract: vec![Emoji::standard("🍕")]
            }
        );
        // The retraction echo arrives later and must be harmless
        tally.withdraw(&unvote("alice", "🍕"));

        assert_eq!(tally.votes_for(&Emoji::standard("🍕")), 0);
        assert_eq!(tally.votes_for(&Emoji::standard("🍔")), 1);
        assert!(!tally.board().holds(&Emoji::standard("🍕"), &"alice".to_string()));
    }

    #[test]
    fn test_no_double_counting() {
        let mut tally = trio();
        let events = [
            vote("alice", "🍕"),
            vote("alice", "🍕"),
            vote("bob", "🍕"),
            vote("bob", "🌮"),
            vote("carol", "🍔"),
            vote("dave", "🍔"),
            vote("alice", "🍔"),
        ];
        for event in &events {
            tally.record(event);
            assert_eq!(tally.board().reaction_count(), tally.voter_count());
        }
        tally.withdraw(&unvote("carol", "🍔"));
        assert_eq!(tally.board().reaction_count(), tally.voter_count());
        assert_eq!(tally.voter_count(), 2);
    }

    #[test]
    fn test_is_complete() {
        let mut tally = trio();
        tally.record(&vote("alice", "🍕"));
        tally.record(&vote("bob", "🍕"));
        assert!(!tally.is_complete());

        tally.record(&vote("carol", "🍔"));
        assert!(tally.is_complete());

        tally.withdraw(&unvote("carol", "🍔"));
        assert!(!tally.is_complete());
    }
}
