//! Narrator: fast in-fiction prose.

use super::{AgentError, AgentTask, TurnContext};
use crate::generation::{Generator, Prompt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const NARRATOR_SYSTEM_PROMPT: &str = "You are the narrator of a tabletop fantasy role-playing game. \
Describe what happens in response to the player's action in two to four vivid sentences, in second person. \
Do not roll dice or decide mechanical outcomes. \
After the prose you may add lines of the form `FACT: <subject> is <state>` for concrete facts your narration establishes.";

/// Most established facts included in the prompt.
const MAX_PROMPT_FACTS: usize = 12;

/// Narrator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub text: String,
    /// Statements the narrator flagged as established (`FACT:` lines).
    pub asserted_facts: Vec<String>,
}

impl Narration {
    /// Split raw model output into prose and `FACT:` lines.
    pub fn parse(raw: &str) -> Self {
        let mut prose = Vec::new();
        let mut asserted_facts = Vec::new();
        for line in raw.lines() {
            let trimmed = line.trim();
            let is_fact = trimmed
                .get(..5)
                .is_some_and(|head| head.eq_ignore_ascii_case("fact:"));
            if is_fact {
                let fact = trimmed[5..].trim();
                if !fact.is_empty() {
                    asserted_facts.push(fact.to_string());
                }
            } else if !trimmed.is_empty() {
                prose.push(trimmed);
            }
        }
        Self {
            text: prose.join(" "),
            asserted_facts,
        }
    }
}

pub struct Narrator {
    generator: Arc<dyn Generator>,
    max_tokens: usize,
}

impl Narrator {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            max_tokens: 400,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(super) async fn run(&self, task: &AgentTask) -> Result<Narration, AgentError> {
        let prompt = build_prompt(&task.input);
        let raw = self
            .generator
            .generate(&prompt, self.max_tokens, task.deadline)
            .await?;

        let narration = Narration::parse(&raw);
        if narration.text.is_empty() {
            return Err(AgentError::Malformed("narration has no prose".into()));
        }
        debug!(
            correlation_id = %task.correlation_id,
            asserted = narration.asserted_facts.len(),
            "narration ready"
        );
        Ok(narration)
    }
}

fn build_prompt(ctx: &TurnContext) -> Prompt {
    let snapshot = &ctx.snapshot;
    let mut text = format!(
        "Location: {}\nPresent: {}\n",
        snapshot.location,
        snapshot.present.join(", ")
    );

    let lowered = ctx.lowered_text();
    let mut subjects: Vec<String> = snapshot
        .mentioned_in(&lowered)
        .iter()
        .map(|sheet| sheet.name.to_lowercase())
        .collect();
    subjects.push(snapshot.player.to_lowercase());
    subjects.push(snapshot.location.to_lowercase());

    let facts = ctx.facts.current_touching(&subjects);
    if !facts.is_empty() {
        text.push_str("Established facts:\n");
        for fact in facts.iter().rev().take(MAX_PROMPT_FACTS).rev() {
            text.push_str(&format!("- {}\n", fact.statement));
        }
    }

    text.push_str(&format!(
        "\n{} ({}): {}",
        snapshot.player, ctx.intent.category, ctx.player_text
    ));
    Prompt::new(text).with_system(NARRATOR_SYSTEM_PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::fixtures;
    use crate::agents::{Agent, AgentKind, AgentPayload, AgentResult};
    use crate::consistency::{FactCandidate, FactOrigin, FactStore, Lexicon};
    use crate::testing::ScriptedGenerator;
    use std::time::Duration;

    #[test]
    fn test_parse_splits_fact_lines() {
        let narration = Narration::parse(
            "Your blade flashes.\nThe goblin staggers back.\nFACT: the goblin is wounded\nfact:  \n",
        );
        assert_eq!(narration.text, "Your blade flashes. The goblin staggers back.");
        assert_eq!(narration.asserted_facts, vec!["the goblin is wounded"]);
    }

    #[test]
    fn test_prompt_includes_relevant_facts() {
        let mut store = FactStore::new();
        let lexicon = Lexicon::standard();
        for s in ["the goblin is hostile", "the bridge is out"] {
            store.record(
                FactCandidate::new(s, lexicon.parse(s), Vec::new(), FactOrigin::Narration),
                1,
            );
        }
        let mut task = fixtures::task_for(
            AgentKind::Narrator,
            "I attack the goblin",
            fixtures::snapshot(),
            Duration::from_secs(1),
        );
        Arc::make_mut(&mut task.input).facts = Arc::new(store);

        let prompt = build_prompt(&task.input);
        assert!(prompt.text.contains("the goblin is hostile"));
        assert!(!prompt.text.contains("the bridge is out"));
        assert!(prompt.text.contains("Aldric (combat): I attack the goblin"));
        assert!(prompt.system.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_returns_narration() {
        let generator = ScriptedGenerator::new().reply("The goblin snarls.\nFACT: the goblin is awake");
        let agent = Agent::from(Narrator::new(Arc::new(generator)));
        let task = fixtures::task_for(
            AgentKind::Narrator,
            "I wave at the goblin",
            fixtures::snapshot(),
            Duration::from_secs(2),
        );

        match agent.execute(&task).await {
            AgentResult::Success(AgentPayload::Narration(n)) => {
                assert_eq!(n.text, "The goblin snarls.");
                assert_eq!(n.asserted_facts, vec!["the goblin is awake"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_prose_is_failure() {
        let generator = ScriptedGenerator::new().reply("FACT: the goblin is awake");
        let agent = Agent::from(Narrator::new(Arc::new(generator)));
        let task = fixtures::task_for(
            AgentKind::Narrator,
            "I wait",
            fixtures::snapshot(),
            Duration::from_secs(2),
        );
        assert!(matches!(agent.execute(&task).await, AgentResult::Failure(_)));
    }
}
