//! Orchestrator configuration.

use crate::agents::AgentKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Placeholder narrative used when the Narrator produced nothing.
pub const DEFAULT_FALLBACK_NARRATIVE: &str = "The moment passes in silence...";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-agent deadlines, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentTimeouts {
    pub narrator_ms: u64,
    pub arbiter_ms: u64,
    pub archivist_ms: u64,
    pub content_keeper_ms: u64,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            narrator_ms: AgentKind::Narrator.profile().default_timeout_ms,
            arbiter_ms: AgentKind::Arbiter.profile().default_timeout_ms,
            archivist_ms: AgentKind::Archivist.profile().default_timeout_ms,
            content_keeper_ms: AgentKind::ContentKeeper.profile().default_timeout_ms,
        }
    }
}

/// Configuration for a [`GameMaster`](crate::GameMaster).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Hard ceiling on one whole turn.
    pub turn_ceiling_ms: u64,

    pub agent_timeouts: AgentTimeouts,

    /// Normalized gap between the top two intent scores below which the
    /// intent is ambiguous.
    pub ambiguity_threshold: f32,

    /// Raw intent score at which classifier confidence stops growing.
    pub confidence_saturation: f32,

    /// Passages requested from the content collaborator.
    pub content_top_k: usize,

    /// Passages below this relevance are dropped.
    pub min_relevance: f32,

    pub narrator_max_tokens: usize,

    pub arbiter_max_tokens: usize,

    pub fallback_narrative: String,

    /// DC for ability checks when nothing more specific applies.
    pub default_check_dc: i32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            turn_ceiling_ms: 12_000,
            agent_timeouts: AgentTimeouts::default(),
            ambiguity_threshold: 0.2,
            confidence_saturation: 2.0,
            content_top_k: 3,
            min_relevance: 0.3,
            narrator_max_tokens: 400,
            arbiter_max_tokens: 120,
            fallback_narrative: DEFAULT_FALLBACK_NARRATIVE.to_string(),
            default_check_dc: 12,
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }

    pub fn with_turn_ceiling(mut self, ceiling: Duration) -> Self {
        self.turn_ceiling_ms = ceiling.as_millis() as u64;
        self
    }

    pub fn with_agent_timeout(mut self, kind: AgentKind, timeout: Duration) -> Self {
        let ms = timeout.as_millis() as u64;
        match kind {
            AgentKind::Narrator => self.agent_timeouts.narrator_ms = ms,
            AgentKind::Arbiter => self.agent_timeouts.arbiter_ms = ms,
            AgentKind::Archivist => self.agent_timeouts.archivist_ms = ms,
            AgentKind::ContentKeeper => self.agent_timeouts.content_keeper_ms = ms,
        }
        self
    }

    pub fn with_ambiguity_threshold(mut self, threshold: f32) -> Self {
        self.ambiguity_threshold = threshold;
        self
    }

    pub fn with_content_top_k(mut self, top_k: usize) -> Self {
        self.content_top_k = top_k;
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub fn with_fallback_narrative(mut self, text: impl Into<String>) -> Self {
        self.fallback_narrative = text.into();
        self
    }

    pub fn with_default_check_dc(mut self, dc: i32) -> Self {
        self.default_check_dc = dc;
        self
    }

    pub fn turn_ceiling(&self) -> Duration {
        Duration::from_millis(self.turn_ceiling_ms)
    }

    pub fn timeout_for(&self, kind: AgentKind) -> Duration {
        Duration::from_millis(match kind {
            AgentKind::Narrator => self.agent_timeouts.narrator_ms,
            AgentKind::Arbiter => self.agent_timeouts.arbiter_ms,
            AgentKind::Archivist => self.agent_timeouts.archivist_ms,
            AgentKind::ContentKeeper => self.agent_timeouts.content_keeper_ms,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_ceiling_ms == 0 {
            return Err(ConfigError::Invalid("turn ceiling must be positive".into()));
        }
        for kind in AgentKind::ALL {
            if self.timeout_for(kind).is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "{} timeout must be positive",
                    kind.name()
                )));
            }
        }
        for (name, value) in [
            ("ambiguity_threshold", self.ambiguity_threshold),
            ("min_relevance", self.min_relevance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if !(self.confidence_saturation.is_finite() && self.confidence_saturation > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "confidence_saturation must be a positive number, got {}",
                self.confidence_saturation
            )));
        }
        if self.fallback_narrative.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback narrative is empty".into()));
        }
        Ok(())
    }
}
