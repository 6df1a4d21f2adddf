mod board;
pub mod format;
mod gate;
mod registry;
mod round;
mod session;
mod tally;
mod window;

pub use board::ReactionBoard;
pub use gate::{ReactionGate, Rejection, Verdict};
pub use registry::ParticipantRegistry;
pub use round::{RoundController, RoundState};
pub use session::{
    ActiveChannels, GameSession, InMemoryActiveChannels, SessionOutcome, SessionReport,
};
pub use tally::VoteTally;
pub use window::{CloseReason, CollectionWindow, StopHandle};

use crate::questions::QuestionError;

/// Errors that end a game session
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("No question available: {0}")]
    Question(#[from] QuestionError),

    #[error("Invalid round state transition from {from:?} to {to:?}")]
    InvalidTransition { from: RoundState, to: RoundState },
}
