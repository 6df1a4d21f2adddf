//! Question sources for the voting phase

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Built-in phrases, completed to "Who'd rather <phrase>"
pub const DEFAULT_PHRASES: &[&str] = &[
    "eat cheese",
    "write javascript",
    "sing karaoke in public",
    "write a non-working chat bot for the game Who'd rather",
    "survive a week without coffee",
    "adopt a goat",
];

/// Errors that can occur while fetching a question
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    #[error("Question request failed: {0}")]
    Request(String),

    #[error("Question list is empty")]
    Empty,

    #[error("Response parsing failed: {0}")]
    Parse(String),
}

#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// A complete question, e.g. "Who'd rather eat cheese"
    async fn fetch_question(&self) -> Result<String, QuestionError>;
}

/// Turn a bare phrase into a question
pub fn phrase_question(phrase: &str) -> String {
    format!("Who'd rather {}", phrase.trim().trim_end_matches('?'))
}

fn pick(phrases: &[String]) -> Result<String, QuestionError> {
    if phrases.is_empty() {
        return Err(QuestionError::Empty);
    }
    let mut rng = rand::rng();
    Ok(phrase_question(&phrases[rng.random_range(0..phrases.len())]))
}

/// Picks a random phrase from a fixed list
#[derive(Debug, Clone)]
pub struct StaticQuestions {
    phrases: Vec<String>,
}

impl StaticQuestions {
    pub fn new(phrases: Vec<String>) -> Self {
        Self { phrases }
    }
}

impl Default for StaticQuestions {
    fn default() -> Self {
        Self::new(DEFAULT_PHRASES.iter().map(|p| p.to_string()).collect())
    }
}

#[async_trait]
impl QuestionSource for StaticQuestions {
    async fn fetch_question(&self) -> Result<String, QuestionError> {
        pick(&self.phrases)
    }
}

/// Fetches the phrase list from a URL on every call.
///
/// The body is either a JSON array of strings or plain text with one phrase per
/// line (blank lines and `#` comments are skipped).
pub struct RemoteQuestions {
    url: String,
    client: reqwest::Client,
}

impl RemoteQuestions {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client ({}), using defaults", e);
                reqwest::Client::new()
            });

        Self { url, client }
    }
}

#[async_trait]
impl QuestionSource for RemoteQuestions {
    async fn fetch_question(&self) -> Result<String, QuestionError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| QuestionError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuestionError::Request(format!(
                "{} returned status {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| QuestionError::Parse(e.to_string()))?;

        let phrases = parse_phrases(&body)?;
        tracing::debug!("Fetched {} phrases from {}", phrases.len(), self.url);
        pick(&phrases)
    }
}

pub fn parse_phrases(body: &str) -> Result<Vec<String>, QuestionError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') {
        let phrases: Vec<String> =
            serde_json::from_str(trimmed).map_err(|e| QuestionError::Parse(e.to_string()))?;
        return Ok(phrases
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect());
    }

    Ok(body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
