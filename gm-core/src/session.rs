//! Sessions and the turn pipeline.
//!
//! [`GameMaster`] owns everything that does not change between turns
//! (config, classifier, routing table, agents, aggregator) and a table of
//! open sessions. Each session sits behind its own async mutex held for a
//! whole turn, so turns of one session are strictly serialized while
//! different sessions proceed concurrently.

use crate::aggregator::{FinalResponse, ResponseAggregator, SessionState};
use crate::agents::{AgentTask, Arbiter, Archivist, ContentKeeper, Narrator, TurnContext};
use crate::config::{ConfigError, OrchestratorConfig};
use crate::consistency::{FactStore, KnowledgeTracker};
use crate::content::ContentRetriever;
use crate::executor::ParallelExecutor;
use crate::generation::Generator;
use crate::intent::IntentClassifier;
use crate::router::RoutingTable;
use crate::rules::RulesLookup;
use crate::state::{GameSnapshot, GameStateView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

/// Version written into every [`SavedSession`].
pub const SAVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session {0}")]
    NotFound(SessionId),

    #[error("session {0} is already open")]
    AlreadyOpen(SessionId),

    #[error("session corrupted: {0}")]
    Corrupted(String),

    #[error("session I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Everything a session leaves behind at teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    pub version: u32,
    pub session_id: SessionId,
    /// Turns completed.
    pub turn: u32,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    pub facts: FactStore,
    pub knowledge: KnowledgeTracker,
    pub snapshot: GameSnapshot,
}

impl SavedSession {
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and verify. Anything unreadable is `Corrupted`.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let saved: SavedSession = serde_json::from_str(json)
            .map_err(|e| SessionError::Corrupted(format!("unreadable save: {e}")))?;
        saved.verify()?;
        Ok(saved)
    }

    /// Check the version, the fact ledger and the knowledge projection.
    pub fn verify(&self) -> Result<(), SessionError> {
        if self.version != SAVE_FORMAT_VERSION {
            return Err(SessionError::Corrupted(format!(
                "unsupported save version {}",
                self.version
            )));
        }
        self.facts
            .verify()
            .map_err(|e| SessionError::Corrupted(e.to_string()))?;
        self.knowledge
            .verify(&self.facts)
            .map_err(|e| SessionError::Corrupted(e.to_string()))?;
        Ok(())
    }
}

struct Session {
    id: SessionId,
    turn: u32,
    started_at: DateTime<Utc>,
    facts: Arc<FactStore>,
    knowledge: Arc<KnowledgeTracker>,
    game: Box<dyn GameStateView>,
    /// Set once; every later turn fails with this reason.
    corrupted: Option<String>,
}

impl Session {
    fn check(&self) -> Result<(), SessionError> {
        match self.corrupted {
            Some(ref reason) => Err(SessionError::Corrupted(reason.clone())),
            None => Ok(()),
        }
    }

    fn snapshot(&mut self) -> Result<GameSnapshot, SessionError> {
        self.check()?;
        self.game.snapshot().map_err(|err| {
            let reason = format!("game state unreadable: {err}");
            error!(session = %self.id, %reason, "session corrupted");
            self.corrupted = Some(reason.clone());
            SessionError::Corrupted(reason)
        })
    }

    fn save(&mut self) -> Result<SavedSession, SessionError> {
        let snapshot = self.snapshot()?;
        Ok(SavedSession {
            version: SAVE_FORMAT_VERSION,
            session_id: self.id,
            turn: self.turn,
            started_at: self.started_at,
            saved_at: Utc::now(),
            facts: FactStore::clone(&self.facts),
            knowledge: KnowledgeTracker::clone(&self.knowledge),
            snapshot,
        })
    }
}

/// The orchestrator.
pub struct GameMaster {
    config: OrchestratorConfig,
    classifier: IntentClassifier,
    routes: RoutingTable,
    executor: ParallelExecutor,
    aggregator: ResponseAggregator,
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl GameMaster {
    /// Build around an already populated executor.
    pub fn new(config: OrchestratorConfig, executor: ParallelExecutor) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            classifier: IntentClassifier::from_config(&config),
            routes: RoutingTable::default(),
            aggregator: ResponseAggregator::from_config(&config),
            executor,
            config,
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// All four agents, configured from `config`. `arbiter_notes` lets the
    /// Arbiter add a one-line ruling note.
    pub fn standard(
        config: OrchestratorConfig,
        narrator: Arc<dyn Generator>,
        arbiter_notes: Option<Arc<dyn Generator>>,
        retriever: Arc<dyn ContentRetriever>,
        rules: Arc<dyn RulesLookup>,
    ) -> Result<Self, ConfigError> {
        let mut arbiter = Arbiter::new(Arc::clone(&rules))
            .with_default_dc(config.default_check_dc)
            .with_max_tokens(config.arbiter_max_tokens);
        if let Some(generator) = arbiter_notes {
            arbiter = arbiter.with_generator(generator);
        }

        let executor = ParallelExecutor::new()
            .with_agent(Narrator::new(narrator).with_max_tokens(config.narrator_max_tokens))
            .with_agent(arbiter)
            .with_agent(Archivist::new(rules))
            .with_agent(
                ContentKeeper::new(retriever)
                    .with_top_k(config.content_top_k)
                    .with_min_relevance(config.min_relevance),
            );
        Self::new(config, executor)
    }

    pub fn with_routes(mut self, routes: RoutingTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_aggregator(mut self, aggregator: ResponseAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Start a session over `game`.
    pub async fn open_session(&self, game: impl GameStateView + 'static) -> SessionId {
        let id = SessionId::new();
        let session = Session {
            id,
            turn: 0,
            started_at: Utc::now(),
            facts: Arc::new(FactStore::new()),
            knowledge: Arc::new(KnowledgeTracker::new()),
            game: Box::new(game),
            corrupted: None,
        };
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session = %id, "session opened");
        id
    }

    /// Run one player input end to end.
    ///
    /// Agent failures and timeouts never surface here; they degrade the
    /// response. Only an unknown or corrupted session is an error.
    pub async fn process_turn(
        &self,
        session_id: SessionId,
        player_text: &str,
    ) -> Result<FinalResponse, SessionError> {
        let handle = self.session(session_id).await?;
        let mut guard = handle.lock().await;
        let session = &mut *guard;
        let snapshot = session.snapshot()?;

        let turn = session.turn + 1;
        let started = Instant::now();
        let turn_deadline = started + self.config.turn_ceiling();
        let correlation_id = Uuid::new_v4();

        let intent = self.classifier.classify(player_text);
        let route = self.routes.route(&intent);
        info!(
            session = %session_id,
            turn,
            %correlation_id,
            intent = %intent.category,
            confidence = intent.confidence,
            agents = ?route,
            "turn started"
        );

        let ctx = Arc::new(TurnContext {
            session_id,
            turn,
            player_text: player_text.to_string(),
            intent,
            snapshot,
            facts: Arc::clone(&session.facts),
            knowledge: Arc::clone(&session.knowledge),
        });
        let tasks = route
            .iter()
            .map(|&kind| AgentTask {
                agent_kind: kind,
                deadline: (started + self.config.timeout_for(kind)).min(turn_deadline),
                input: Arc::clone(&ctx),
                correlation_id,
            })
            .collect();
        let results = self.executor.run(tasks, turn_deadline).await;

        // Drop the agents' read handles so the commit can mutate in place.
        let mut ctx = Arc::try_unwrap(ctx).unwrap_or_else(|shared| TurnContext::clone(&shared));
        ctx.facts = Arc::default();
        ctx.knowledge = Arc::default();

        let response = self.aggregator.aggregate(
            &ctx,
            &results,
            SessionState {
                facts: Arc::make_mut(&mut session.facts),
                knowledge: Arc::make_mut(&mut session.knowledge),
                game: session.game.as_mut(),
            },
        );
        session.turn = turn;

        info!(
            session = %session_id,
            turn,
            degraded = response.degraded,
            facts = response.recorded_facts.len(),
            warnings = response.consistency_warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn complete"
        );
        Ok(response)
    }

    /// Tear a session down, returning what should be persisted.
    pub async fn close_session(&self, session_id: SessionId) -> Result<SavedSession, SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        let saved = handle.lock().await.save()?;
        info!(session = %session_id, turns = saved.turn, facts = saved.facts.len(), "session closed");
        Ok(saved)
    }

    /// Write the session to `path` as JSON. The session stays open.
    pub async fn save_session(&self, session_id: SessionId, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let handle = self.session(session_id).await?;
        let saved = handle.lock().await.save()?;
        tokio::fs::write(path.as_ref(), saved.to_json()?).await?;
        info!(session = %session_id, path = %path.as_ref().display(), "session saved");
        Ok(())
    }

    /// Reopen a saved session over `game`, keeping its id and turn count.
    pub async fn restore_session(
        &self,
        saved: SavedSession,
        game: impl GameStateView + 'static,
    ) -> Result<SessionId, SessionError> {
        saved.verify()?;
        let id = saved.session_id;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyOpen(id));
        }
        let session = Session {
            id,
            turn: saved.turn,
            started_at: saved.started_at,
            facts: Arc::new(saved.facts),
            knowledge: Arc::new(saved.knowledge),
            game: Box::new(game),
            corrupted: None,
        };
        sessions.insert(id, Arc::new(Mutex::new(session)));
        info!(session = %id, turn = saved.turn, "session restored");
        Ok(id)
    }

    /// Read a save file and restore it.
    pub async fn load_session(
        &self,
        path: impl AsRef<Path>,
        game: impl GameStateView + 'static,
    ) -> Result<SessionId, SessionError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SessionError::Corrupted(format!("cannot read {}: {e}", path.display())))?;
        let saved = SavedSession::from_json(&json)?;
        self.restore_session(saved, game).await
    }

    /// Copy of the session's fact ledger.
    pub async fn facts(&self, session_id: SessionId) -> Result<FactStore, SessionError> {
        let handle = self.session(session_id).await?;
        let session = handle.lock().await;
        session.check()?;
        Ok(FactStore::clone(&session.facts))
    }

    /// Copy of the session's knowledge projection.
    pub async fn knowledge(&self, session_id: SessionId) -> Result<KnowledgeTracker, SessionError> {
        let handle = self.session(session_id).await?;
        let session = handle.lock().await;
        session.check()?;
        Ok(KnowledgeTracker::clone(&session.knowledge))
    }

    /// Turns completed so far.
    pub async fn turn(&self, session_id: SessionId) -> Result<u32, SessionError> {
        let handle = self.session(session_id).await?;
        let turn = handle.lock().await.turn;
        Ok(turn)
    }

    async fn session(&self, session_id: SessionId) -> Result<Arc<Mutex<Session>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::NotFound(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{InMemoryGameState, StateChange, StateChangeError, StateReadError};
    use crate::testing::{sample_encounter, sample_party, ScriptedGenerator, TestHarness};
    use std::time::Duration;

    /// A game state whose storage has gone away.
    struct UnreadableState;

    impl GameStateView for UnreadableState {
        fn snapshot(&self) -> Result<GameSnapshot, StateReadError> {
            Err(StateReadError::Unavailable("disk gone".into()))
        }

        fn apply_state_change(&mut self, _change: &StateChange) -> Result<(), StateChangeError> {
            Err(StateChangeError::Rejected("read-only".into()))
        }
    }

    fn game_master(narration: &str) -> GameMaster {
        TestHarness::new()
            .with_narrator(Arc::new(ScriptedGenerator::new().reply(narration)))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_turns_advance_and_record_facts() {
        let gm = game_master("The cellar door is open.");
        let id = gm.open_session(InMemoryGameState::new(sample_party())).await;

        let response = gm.process_turn(id, "I look around the inn").await.unwrap();
        assert_eq!(response.narrative, "The cellar door is open.");
        assert_eq!(response.recorded_facts.len(), 1);
        assert_eq!(gm.turn(id).await.unwrap(), 1);

        let knowledge = gm.knowledge(id).await.unwrap();
        assert!(knowledge.knows("Mira", response.recorded_facts[0].id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_session() {
        let gm = game_master("Nothing happens.");
        let err = gm.process_turn(SessionId::new(), "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_state_corrupts_session() {
        let gm = game_master("Nothing happens.");
        let id = gm.open_session(UnreadableState).await;

        let first = gm.process_turn(id, "I wait").await.unwrap_err();
        assert!(matches!(first, SessionError::Corrupted(ref r) if r.contains("disk gone")));
        let again = gm.process_turn(id, "I wait").await.unwrap_err();
        assert!(matches!(again, SessionError::Corrupted(_)));
        assert!(matches!(gm.facts(id).await, Err(SessionError::Corrupted(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_ceiling_bounds_latency() {
        let config = OrchestratorConfig::default().with_turn_ceiling(Duration::from_secs(1));
        let gm = TestHarness::new()
            .with_config(config)
            .with_narrator(Arc::new(
                ScriptedGenerator::new()
                    .reply("Far too late.")
                    .with_delay(Duration::from_secs(60)),
            ))
            .build()
            .unwrap();
        let id = gm.open_session(InMemoryGameState::new(sample_encounter())).await;

        let start = Instant::now();
        let response = gm.process_turn(id, "I attack the goblin").await.unwrap();
        assert!(start.elapsed() <= Duration::from_secs(1));
        assert!(response.degraded);
        assert!(!response.narrative.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_turns_of_one_session_are_serialized() {
        let gm = Arc::new(
            TestHarness::new()
                .with_narrator(Arc::new(
                    ScriptedGenerator::new()
                        .reply("The lantern is lit.")
                        .reply("The lantern is dark.")
                        .with_delay(Duration::from_millis(300)),
                ))
                .build()
                .unwrap(),
        );
        let id = gm.open_session(InMemoryGameState::new(sample_party())).await;

        let (a, b) = tokio::join!(
            gm.process_turn(id, "I light the lantern"),
            gm.process_turn(id, "I blow out the lantern")
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(gm.turn(id).await.unwrap(), 2);
        // Whichever turn ran second saw the first one's fact.
        let warnings = a.consistency_warnings.len() + b.consistency_warnings.len();
        assert_eq!(warnings, 1);
        assert_eq!(gm.facts(id).await.unwrap().current_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let gm = game_master("The letter is sealed.");
        let id = gm.open_session(InMemoryGameState::new(sample_party())).await;
        gm.process_turn(id, "I read the letter").await.unwrap();
        gm.save_session(id, &path).await.unwrap();

        let saved = gm.close_session(id).await.unwrap();
        assert_eq!(saved.turn, 1);
        assert_eq!(gm.session_count().await, 0);

        let restored = gm
            .load_session(&path, InMemoryGameState::new(saved.snapshot.clone()))
            .await
            .unwrap();
        assert_eq!(restored, id);
        assert_eq!(gm.turn(id).await.unwrap(), 1);
        assert_eq!(gm.facts(id).await.unwrap().len(), 1);

        let again = gm
            .restore_session(saved, InMemoryGameState::new(sample_party()))
            .await
            .unwrap_err();
        assert!(matches!(again, SessionError::AlreadyOpen(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_damaged_save_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let gm = game_master("Nothing happens.");

        let garbage = dir.path().join("garbage.json");
        tokio::fs::write(&garbage, "{ not json").await.unwrap();
        let err = gm
            .load_session(&garbage, InMemoryGameState::new(sample_party()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Corrupted(_)));

        let missing = gm
            .load_session(dir.path().join("missing.json"), InMemoryGameState::new(sample_party()))
            .await
            .unwrap_err();
        assert!(matches!(missing, SessionError::Corrupted(_)));

        let mut saved = {
            let id = gm.open_session(InMemoryGameState::new(sample_party())).await;
            gm.close_session(id).await.unwrap()
        };
        saved.version = 99;
        assert!(matches!(saved.verify(), Err(SessionError::Corrupted(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = OrchestratorConfig::default().with_turn_ceiling(Duration::ZERO);
        assert!(TestHarness::new().with_config(config).build().is_err());
    }
}
