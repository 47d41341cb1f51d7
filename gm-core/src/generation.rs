//! Generative-model collaborator.
//!
//! Narrator and Arbiter call text generation through [`Generator`] with an
//! absolute deadline. Implementations must give up by that deadline; the
//! executor still supervises them in case one does not.

use async_trait::async_trait;
use claude::{Claude, Message, Request};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation deadline passed")]
    DeadlineExceeded,

    #[error("model error: {0}")]
    Model(String),

    #[error("model returned no text")]
    Empty,
}

impl From<claude::Error> for GenerationError {
    fn from(err: claude::Error) -> Self {
        match err {
            claude::Error::TimedOut => GenerationError::DeadlineExceeded,
            other => GenerationError::Model(other.to_string()),
        }
    }
}

/// Prompt text plus optional system instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            system: None,
            text: text.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &Prompt,
        max_tokens: usize,
        deadline: Instant,
    ) -> Result<String, GenerationError>;
}

/// [`Generator`] backed by the hosted Claude API.
pub struct ClaudeGenerator {
    client: Claude,
    temperature: Option<f32>,
}

impl ClaudeGenerator {
    pub fn new(client: Claude) -> Self {
        Self {
            client,
            temperature: None,
        }
    }

    /// Build from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, GenerationError> {
        Ok(Self::new(Claude::from_env()?))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl Generator for ClaudeGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        max_tokens: usize,
        deadline: Instant,
    ) -> Result<String, GenerationError> {
        let budget = deadline.saturating_duration_since(Instant::now());
        if budget.is_zero() {
            return Err(GenerationError::DeadlineExceeded);
        }

        let mut request = Request::new(vec![Message::user(prompt.text.clone())])
            .with_max_tokens(max_tokens);
        if let Some(ref system) = prompt.system {
            request = request.with_system(system.clone());
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = timeout_at(deadline, self.client.complete_within(request, budget))
            .await
            .map_err(|_| GenerationError::DeadlineExceeded)??;

        let text = response.text.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(text.to_string())
    }
}
