use crate::types::Emoji;
use std::time::Duration;

/// Quick-pick emoji seeded onto every sign-up prompt
pub const DEFAULT_QUICK_PICKS: &[&str] = &["🍕", "🍔", "🌮", "🐶", "🐱", "🦊", "🐸", "🐼"];

/// Timings and limits for a game session
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// How long the sign-up prompt collects reactions
    pub sign_up_window: Duration,
    /// How long a question collects votes
    pub voting_window: Duration,
    /// Delay between "everyone has voted" and closing the vote
    pub early_close_grace: Duration,
    /// Pause between two rounds of the same session
    pub round_pause: Duration,
    /// Lifetime of transient warnings before they get deleted
    pub warning_ttl: Duration,
    /// Upper bound for the round count accepted by the trigger command
    pub max_rounds: u32,
    /// Trigger phrase that starts a session
    pub trigger: String,
    pub quick_picks: Vec<Emoji>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sign_up_window: Duration::from_secs(10),
            voting_window: Duration::from_secs(15),
            early_close_grace: Duration::from_secs(5),
            round_pause: Duration::from_secs(5),
            warning_ttl: Duration::from_secs(10),
            max_rounds: 10,
            trigger: "wwr".to_string(),
            quick_picks: DEFAULT_QUICK_PICKS
                .iter()
                .map(|name| Emoji::standard(*name))
                .collect(),
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let trigger = env_string("WWR_TRIGGER")
            .map(|t| t.to_lowercase())
            .unwrap_or(defaults.trigger);

        Self {
            sign_up_window: env_seconds("WWR_SIGNUP_SECONDS").unwrap_or(defaults.sign_up_window),
            voting_window: env_seconds("WWR_VOTING_SECONDS").unwrap_or(defaults.voting_window),
            early_close_grace: env_seconds("WWR_GRACE_SECONDS")
                .unwrap_or(defaults.early_close_grace),
            round_pause: env_seconds("WWR_PAUSE_SECONDS").unwrap_or(defaults.round_pause),
            warning_ttl: env_seconds("WWR_WARNING_SECONDS").unwrap_or(defaults.warning_ttl),
            max_rounds: std::env::var("WWR_MAX_ROUNDS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_rounds),
            trigger,
            quick_picks: defaults.quick_picks,
        }
    }
}

/// Settings for the chat server binary
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Optional URL of a remote question list; the built-in list is used when unset
    pub questions_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6573,
            questions_url: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("WWR_PORT")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(6573),
            questions_url: env_string("WWR_QUESTIONS_URL"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn env_seconds(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Duration::from_secs)
}
