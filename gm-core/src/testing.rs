//! Test doubles and sample data.
//!
//! Used by this crate's own tests and available to hosts that want to
//! exercise the orchestrator without a model or a real lore index.

use crate::config::OrchestratorConfig;
use crate::content::{ContentRetriever, KeywordIndex, Passage, RetrievalError};
use crate::generation::{GenerationError, Generator, Prompt};
use crate::rules::StandardRules;
use crate::session::GameMaster;
use crate::state::{
    Ability, AbilityScores, CharacterSheet, Combatant, CombatTracker, CreatureKind, GameSnapshot,
    InMemoryGameState, InventoryItem, Skill,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Fail(String),
}

/// A [`Generator`] that plays back queued replies.
///
/// Steps are consumed in order; the last one repeats once the queue is
/// down to it. An optional delay is applied before every reply, and the
/// caller's deadline is honored: a delay running past it yields
/// `DeadlineExceeded`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    steps: Mutex<VecDeque<Step>>,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Step::Reply(text.into()))
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Step::Fail(message.into()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// How many times `generate` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(self, step: Step) -> Self {
        self.steps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
        self
    }

    fn next_step(&self) -> Option<Step> {
        let mut steps = self.steps.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        _max_tokens: usize,
        deadline: Instant,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.clone());

        let ready_at = Instant::now() + self.delay;
        if ready_at > deadline {
            sleep_until(deadline).await;
            return Err(GenerationError::DeadlineExceeded);
        }
        sleep_until(ready_at).await;

        match self.next_step() {
            Some(Step::Reply(text)) => Ok(text),
            Some(Step::Fail(message)) => Err(GenerationError::Model(message)),
            None => Err(GenerationError::Empty),
        }
    }
}

/// A [`ContentRetriever`] whose backend is always down.
#[derive(Debug, Clone)]
pub struct FailingRetriever {
    message: String,
}

impl FailingRetriever {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ContentRetriever for FailingRetriever {
    async fn query_content(&self, _text: &str, _top_k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Err(RetrievalError::Backend(self.message.clone()))
    }
}

/// Aldric the fighter and Mira the cleric, facing two goblins at the old
/// mill. Combat is under way; the goblins act first.
pub fn sample_encounter() -> GameSnapshot {
    let aldric = CharacterSheet::new("Aldric", CreatureKind::PlayerCharacter, 12, 16)
        .with_abilities(AbilityScores::new(16, 12, 14, 8, 10, 13))
        .with_skills([Skill::Athletics, Skill::Perception, Skill::Intimidation])
        .with_saves([Ability::Strength, Ability::Constitution])
        .with_weapon("Longsword");
    let mira = CharacterSheet::new("Mira", CreatureKind::Npc, 9, 14)
        .with_abilities(AbilityScores::new(10, 12, 12, 11, 16, 14))
        .with_skills([Skill::Medicine, Skill::Religion, Skill::Insight])
        .with_saves([Ability::Wisdom, Ability::Charisma])
        .with_weapon("Mace")
        .with_spellcasting(Ability::Wisdom);
    let goblin = CharacterSheet::new("Goblin", CreatureKind::Monster, 7, 15)
        .with_abilities(AbilityScores::new(8, 14, 10, 10, 8, 8))
        .with_weapon("Scimitar");
    let boss = CharacterSheet::new("Snikket", CreatureKind::Monster, 12, 15)
        .with_abilities(AbilityScores::new(10, 14, 10, 10, 8, 10))
        .with_weapon("Shortbow");

    GameSnapshot::new("the old mill", aldric)
        .with_character(mira)
        .with_character(goblin)
        .with_character(boss)
        .with_combat(CombatTracker::new(vec![
            Combatant::new("Goblin", 17, false),
            Combatant::new("Snikket", 15, false),
            Combatant::new("Aldric", 12, true),
            Combatant::new("Mira", 8, false),
        ]))
        .with_item("Aldric", InventoryItem::new("Healing Potion", 2))
        .with_item("Aldric", InventoryItem::new("Rope", 1))
}

/// Same party, no fight: a quiet evening at the crossroads inn.
pub fn sample_party() -> GameSnapshot {
    let mut snapshot = sample_encounter();
    snapshot.location = "the crossroads inn".to_string();
    snapshot.combat = None;
    snapshot.characters.retain(|_, sheet| sheet.kind != CreatureKind::Monster);
    snapshot
        .present
        .retain(|name| snapshot.characters.contains_key(&name.to_lowercase()));
    snapshot
}

/// A handful of lore passages about the sample setting.
pub fn sample_lore() -> KeywordIndex {
    KeywordIndex::new()
        .with_document(
            "lore/mill.md",
            "The old mill has stood empty since the miller vanished during the spring flood.",
        )
        .with_document(
            "lore/snikket.md",
            "Snikket leads the goblins of the Reedmarsh and answers to a hobgoblin warlord.",
        )
        .with_document(
            "lore/seal.md",
            "The Dúnedain seal marks letters carried by rangers of the north.",
        )
        .with_document(
            "lore/inn.md",
            "The crossroads inn is run by Hesper, who trades gossip for coin.",
        )
}

/// Builds a [`GameMaster`] wired to scripted generators, the standard
/// rules tables and the sample lore.
pub struct TestHarness {
    config: OrchestratorConfig,
    narrator: Arc<dyn Generator>,
    arbiter: Option<Arc<dyn Generator>>,
    retriever: Arc<dyn ContentRetriever>,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            config: OrchestratorConfig::default(),
            narrator: Arc::new(ScriptedGenerator::new().reply("The scene shifts around you.")),
            arbiter: None,
            retriever: Arc::new(sample_lore()),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_narrator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.narrator = generator;
        self
    }

    /// Give the Arbiter a generator for ruling notes.
    pub fn with_arbiter_notes(mut self, generator: Arc<dyn Generator>) -> Self {
        self.arbiter = Some(generator);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContentRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn build(self) -> Result<GameMaster, crate::config::ConfigError> {
        GameMaster::standard(
            self.config,
            self.narrator,
            self.arbiter,
            self.retriever,
            Arc::new(StandardRules),
        )
    }

    /// Convenience for a fresh in-memory state.
    pub fn state(snapshot: GameSnapshot) -> InMemoryGameState {
        InMemoryGameState::new(snapshot)
    }
}
