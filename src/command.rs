use crate::config::GameConfig;

/// Why a trigger line could not be turned into a round count
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Round count is not a number: {0}")]
    InvalidRounds(String),

    #[error("Unexpected argument: {0}")]
    TooManyArguments(String),
}

/// Parse a chat line as a game trigger.
///
/// Returns `None` when the line is not addressed to the game at all, otherwise
/// the requested round count clamped to `1..=max_rounds`.
pub fn parse_trigger(text: &str, config: &GameConfig) -> Option<Result<u32, CommandError>> {
    let mut words = text.split_whitespace();
    let first = words.next()?;
    if !first.eq_ignore_ascii_case(&config.trigger) {
        return None;
    }

    let Some(arg) = words.next() else {
        return Some(Ok(1));
    };
    if let Some(extra) = words.next() {
        return Some(Err(CommandError::TooManyArguments(extra.to_string())));
    }

    Some(
        arg.parse::<u64>()
            .map(|n| n.clamp(1, config.max_rounds as u64) as u32)
            .map_err(|_| CommandError::InvalidRounds(arg.to_string())),
    )
}
