//! The four turn agents and their shared contract.
//!
//! - [`Narrator`]: low-latency prose generation
//! - [`Arbiter`]: mechanical resolution (dice, rule citations, state changes)
//! - [`Archivist`]: deterministic lookups against the game state
//! - [`ContentKeeper`]: retrieval over indexed lore
//!
//! Every variant exposes one operation, [`Agent::execute`]. Variants differ
//! in their [`AgentProfile`] (latency and cost as data), not in interface.

mod arbiter;
mod archivist;
mod content_keeper;
mod narrator;

pub use arbiter::{
    ActionKind, Arbiter, DiceRoll, Outcome, Resolution, RuleCitation, Severity,
};
pub use archivist::{ArchiveRecord, Archivist};
pub use content_keeper::ContentKeeper;
pub use narrator::{Narration, Narrator};

use crate::consistency::{FactStore, KnowledgeTracker};
use crate::content::{Passage, RetrievalError};
use crate::generation::GenerationError;
use crate::intent::Intent;
use crate::session::SessionId;
use crate::state::GameSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

/// Which agent variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    Narrator,
    Arbiter,
    Archivist,
    ContentKeeper,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Narrator,
        AgentKind::Arbiter,
        AgentKind::Archivist,
        AgentKind::ContentKeeper,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Narrator => "Narrator",
            AgentKind::Arbiter => "Arbiter",
            AgentKind::Archivist => "Archivist",
            AgentKind::ContentKeeper => "ContentKeeper",
        }
    }

    /// Latency and cost characteristics.
    pub fn profile(&self) -> AgentProfile {
        match self {
            AgentKind::Narrator => AgentProfile {
                expected_latency_ms: 2_000,
                default_timeout_ms: 6_000,
                generative: true,
                has_cost: true,
                min_budget_ms: 250,
            },
            AgentKind::Arbiter => AgentProfile {
                expected_latency_ms: 5_000,
                default_timeout_ms: 10_000,
                generative: true,
                has_cost: true,
                min_budget_ms: 50,
            },
            AgentKind::Archivist => AgentProfile {
                expected_latency_ms: 5,
                default_timeout_ms: 500,
                generative: false,
                has_cost: false,
                min_budget_ms: 0,
            },
            AgentKind::ContentKeeper => AgentProfile {
                expected_latency_ms: 300,
                default_timeout_ms: 3_000,
                generative: false,
                has_cost: false,
                min_budget_ms: 20,
            },
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cost/latency profile of an agent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub expected_latency_ms: u64,
    pub default_timeout_ms: u64,
    /// Calls the generative model.
    pub generative: bool,
    /// Each call costs money.
    pub has_cost: bool,
    /// Below this remaining budget the agent declines with `Timeout`.
    pub min_budget_ms: u64,
}

impl AgentProfile {
    pub fn min_budget(&self) -> Duration {
        Duration::from_millis(self.min_budget_ms)
    }
}

/// Read-only inputs shared by every task of a turn.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: SessionId,
    pub turn: u32,
    pub player_text: String,
    pub intent: Intent,
    pub snapshot: GameSnapshot,
    pub facts: Arc<FactStore>,
    pub knowledge: Arc<KnowledgeTracker>,
}

impl TurnContext {
    /// Player text, lowercased and whitespace-normalized.
    pub fn lowered_text(&self) -> String {
        crate::text::normalize(&self.player_text)
    }

    /// Names to tag as fact subjects.
    pub fn known_entities(&self) -> Vec<String> {
        self.snapshot.known_entities()
    }
}

/// One unit of work for one agent.
#[derive(Debug, Clone)]
pub struct AgentTask {
    pub agent_kind: AgentKind,
    pub deadline: Instant,
    pub input: Arc<TurnContext>,
    /// Ties the task to the turn that issued it.
    pub correlation_id: Uuid,
}

impl AgentTask {
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Kind-specific result data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AgentPayload {
    Narration(Narration),
    Resolution(Resolution),
    Records(Vec<ArchiveRecord>),
    Passages(Vec<Passage>),
}

/// Outcome of one task. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentResult {
    Success(AgentPayload),
    Timeout,
    Failure(String),
}

impl AgentResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success(_))
    }

    pub fn payload(&self) -> Option<&AgentPayload> {
        match self {
            AgentResult::Success(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            AgentResult::Success(_) => "success",
            AgentResult::Timeout => "timeout",
            AgentResult::Failure(_) => "failure",
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed output: {0}")]
    Malformed(String),

    #[error("no player character in the game state")]
    NoActor,

    #[error("deadline passed")]
    DeadlineExceeded,
}

/// A turn agent. One variant per kind.
pub enum Agent {
    Narrator(Narrator),
    Arbiter(Arbiter),
    Archivist(Archivist),
    ContentKeeper(ContentKeeper),
}

impl Agent {
    pub fn kind(&self) -> AgentKind {
        match self {
            Agent::Narrator(_) => AgentKind::Narrator,
            Agent::Arbiter(_) => AgentKind::Arbiter,
            Agent::Archivist(_) => AgentKind::Archivist,
            Agent::ContentKeeper(_) => AgentKind::ContentKeeper,
        }
    }

    pub fn profile(&self) -> AgentProfile {
        self.kind().profile()
    }

    /// Run one task. Never panics on agent errors: they become `Failure`,
    /// and a deadline the agent cannot plausibly meet becomes `Timeout`.
    pub async fn execute(&self, task: &AgentTask) -> AgentResult {
        if task.remaining() < self.profile().min_budget() || task.remaining().is_zero() {
            return AgentResult::Timeout;
        }

        let outcome = match self {
            Agent::Narrator(agent) => agent.run(task).await.map(AgentPayload::Narration),
            Agent::Arbiter(agent) => agent.run(task).await.map(AgentPayload::Resolution),
            Agent::Archivist(agent) => agent.run(task).map(AgentPayload::Records),
            Agent::ContentKeeper(agent) => agent.run(task).await.map(AgentPayload::Passages),
        };

        match outcome {
            Ok(payload) => AgentResult::Success(payload),
            Err(AgentError::DeadlineExceeded)
            | Err(AgentError::Generation(GenerationError::DeadlineExceeded)) => {
                AgentResult::Timeout
            }
            Err(err) => AgentResult::Failure(err.to_string()),
        }
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Agent::{}", self.kind())
    }
}

impl From<Narrator> for Agent {
    fn from(agent: Narrator) -> Self {
        Agent::Narrator(agent)
    }
}

impl From<Arbiter> for Agent {
    fn from(agent: Arbiter) -> Self {
        Agent::Arbiter(agent)
    }
}

impl From<Archivist> for Agent {
    fn from(agent: Archivist) -> Self {
        Agent::Archivist(agent)
    }
}

impl From<ContentKeeper> for Agent {
    fn from(agent: ContentKeeper) -> Self {
        Agent::ContentKeeper(agent)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::intent::IntentClassifier;
    use crate::state::{
        Ability, AbilityScores, CharacterSheet, CreatureKind, GameSnapshot, InventoryItem, Skill,
    };
    use std::time::Duration;

    pub fn snapshot() -> GameSnapshot {
        let hero = CharacterSheet::new("Aldric", CreatureKind::PlayerCharacter, 12, 16)
            .with_abilities(AbilityScores::new(16, 12, 14, 8, 10, 13))
            .with_skills([Skill::Athletics, Skill::Perception])
            .with_saves([Ability::Strength, Ability::Constitution])
            .with_weapon("Longsword");
        let goblin = CharacterSheet::new("Goblin", CreatureKind::Monster, 7, 15);
        GameSnapshot::new("the old mill", hero)
            .with_character(goblin)
            .with_item("Aldric", InventoryItem::new("Healing Potion", 2))
    }

    pub fn task_for(kind: AgentKind, text: &str, snapshot: GameSnapshot, budget: Duration) -> AgentTask {
        let intent = IntentClassifier::default().classify(text);
        AgentTask {
            agent_kind: kind,
            deadline: Instant::now() + budget,
            input: Arc::new(TurnContext {
                session_id: SessionId::new(),
                turn: 1,
                player_text: text.to_string(),
                intent,
                snapshot,
                facts: Arc::new(FactStore::new()),
                knowledge: Arc::new(KnowledgeTracker::new()),
            }),
            correlation_id: Uuid::from_u128(7),
        }
    }
}
