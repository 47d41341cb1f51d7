//! Turn orchestration core for an AI game master.
//!
//! This crate provides:
//! - Intent classification and routing of each player input to agents
//! - Four agents (Narrator, Arbiter, Archivist, ContentKeeper) run in
//!   parallel under per-agent and per-turn deadlines
//! - Response aggregation with append/amend/override merging
//! - An append-only fact ledger, per-character knowledge and contradiction
//!   checks
//! - Session persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use gm_core::{GameMaster, OrchestratorConfig, StandardRules, KeywordIndex};
//! use gm_core::generation::ClaudeGenerator;
//! use gm_core::state::InMemoryGameState;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gm = GameMaster::standard(
//!         OrchestratorConfig::default(),
//!         Arc::new(ClaudeGenerator::from_env()?),
//!         None,
//!         Arc::new(KeywordIndex::new()),
//!         Arc::new(StandardRules),
//!     )?;
//!
//!     let session = gm.open_session(InMemoryGameState::new(snapshot)).await;
//!     let response = gm.process_turn(session, "I attack the goblin").await?;
//!     println!("{}", response.narrative);
//!
//!     gm.save_session(session, "session.json").await?;
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod aggregator;
pub mod config;
pub mod consistency;
pub mod content;
pub mod dice;
pub mod executor;
pub mod generation;
pub mod intent;
pub mod router;
pub mod rules;
pub mod session;
pub mod state;
pub mod testing;
pub mod text;

// Primary public API
pub use agents::{Agent, AgentKind, AgentResult, AgentTask, TurnContext};
pub use aggregator::{FinalResponse, MergeStrategy, ResponseAggregator};
pub use config::{ConfigError, OrchestratorConfig};
pub use consistency::{ContradictionDetector, FactStore, KnowledgeTracker};
pub use content::KeywordIndex;
pub use executor::{DispatchedResult, ParallelExecutor};
pub use intent::{Intent, IntentCategory, IntentClassifier};
pub use router::RoutingTable;
pub use rules::StandardRules;
pub use session::{GameMaster, SavedSession, SessionError, SessionId};
