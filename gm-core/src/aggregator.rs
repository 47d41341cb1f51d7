//! Response aggregation.
//!
//! The single writer of session state. Takes the settled results of a turn,
//! builds the player-facing narrative, commits the Arbiter's state changes,
//! and records new facts (flagging contradictions without blocking on them).
//!
//! Merge of the Arbiter's hooks into the Narrator's baseline:
//!
//! - **Override**: a creature dropped to 0 hp, or there is no real baseline.
//!   The hooks replace the narrative.
//! - **Amend**: a baseline sentence implies the opposite outcome (a hit
//!   where the dice missed). Those sentences are replaced by the hooks.
//! - **Append**: otherwise, the hooks follow the baseline.

use crate::agents::{
    AgentKind, AgentPayload, AgentResult, ArchiveRecord, DiceRoll, Narration, Outcome,
    Resolution, RuleCitation, Severity, TurnContext,
};
use crate::config::OrchestratorConfig;
use crate::consistency::{
    Certainty, ContradictionDetector, FactId, FactOrigin, FactStore, KnowledgeTracker,
    Proposition,
};
use crate::content::Passage;
use crate::executor::DispatchedResult;
use crate::intent::IntentCategory;
use crate::state::{GameStateView, StateChange};
use crate::text::{as_sentence, contains_word, split_sentences};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const HIT_CUES: &[&str] = &[
    "hit", "hits", "strike", "strikes", "struck", "connects", "connect", "lands", "land",
    "slices", "cuts", "wounds", "pierces", "bites into", "finds its mark", "drives into",
    "sinks into",
];
const MISS_CUES: &[&str] = &[
    "miss", "misses", "missed", "glances off", "dodges", "dodge", "parries", "deflects",
    "goes wide", "whiffs", "sidesteps", "blocks", "clangs off",
];
const SUCCESS_CUES: &[&str] = &[
    "succeed", "succeeds", "successfully", "manage", "manages", "make it", "you find",
    "you spot", "with ease", "easily",
];
const FAILURE_CUES: &[&str] = &[
    "fail", "fails", "failed", "slip", "slips", "unable", "can't", "cannot", "falls short",
    "lose your grip", "no luck",
];

/// How the Arbiter's hooks were merged into the narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Append,
    Amend,
    Override,
}

/// A fact recorded this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFact {
    pub id: FactId,
    pub statement: String,
    /// Facts this one superseded.
    pub superseded: Vec<FactId>,
}

/// How one dispatched agent fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: AgentKind,
    pub status: String,
    pub elapsed_ms: u64,
    pub reason: Option<String>,
}

/// What `process_turn` hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub narrative: String,
    pub state_changes_applied: Vec<StateChange>,
    pub consistency_warnings: Vec<String>,
    /// One or more dispatched agents failed or timed out.
    pub degraded: bool,
    pub intent: IntentCategory,
    pub merge_strategy: Option<MergeStrategy>,
    /// Proposed changes the game state rejected.
    pub state_warnings: Vec<String>,
    pub recorded_facts: Vec<NewFact>,
    pub dice: Vec<DiceRoll>,
    pub rule_citations: Vec<RuleCitation>,
    pub ruling_note: Option<String>,
    pub lore: Vec<Passage>,
    pub records: Vec<ArchiveRecord>,
    pub agent_reports: Vec<AgentReport>,
}

/// Mutable session state the aggregator commits to.
pub struct SessionState<'a> {
    pub facts: &'a mut FactStore,
    pub knowledge: &'a mut KnowledgeTracker,
    pub game: &'a mut dyn GameStateView,
}

#[derive(Debug, Clone)]
pub struct ResponseAggregator {
    detector: ContradictionDetector,
    fallback_narrative: String,
}

impl Default for ResponseAggregator {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::default())
    }
}

impl ResponseAggregator {
    pub fn new(detector: ContradictionDetector, fallback_narrative: impl Into<String>) -> Self {
        Self {
            detector,
            fallback_narrative: fallback_narrative.into(),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(ContradictionDetector::default(), config.fallback_narrative.clone())
    }

    pub fn with_detector(mut self, detector: ContradictionDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn detector(&self) -> &ContradictionDetector {
        &self.detector
    }

    /// Reconcile a turn's results and commit them to `state`.
    pub fn aggregate(
        &self,
        ctx: &TurnContext,
        results: &[DispatchedResult],
        state: SessionState<'_>,
    ) -> FinalResponse {
        let mut narration: Option<&Narration> = None;
        let mut resolution: Option<&Resolution> = None;
        let mut records: Vec<ArchiveRecord> = Vec::new();
        let mut lore: Vec<Passage> = Vec::new();
        let mut agent_reports = Vec::with_capacity(results.len());
        let mut degraded = false;

        for dispatched in results {
            match &dispatched.result {
                AgentResult::Success(AgentPayload::Narration(n)) => narration = Some(n),
                AgentResult::Success(AgentPayload::Resolution(r)) => resolution = Some(r),
                AgentResult::Success(AgentPayload::Records(r)) => records.extend(r.iter().cloned()),
                AgentResult::Success(AgentPayload::Passages(p)) => lore.extend(p.iter().cloned()),
                AgentResult::Timeout | AgentResult::Failure(_) => degraded = true,
            }
            agent_reports.push(AgentReport {
                agent: dispatched.kind,
                status: dispatched.result.status().to_string(),
                elapsed_ms: dispatched.elapsed.as_millis() as u64,
                reason: match &dispatched.result {
                    AgentResult::Failure(reason) => Some(reason.clone()),
                    _ => None,
                },
            });
        }

        let narrator_dispatched = results.iter().any(|r| r.kind == AgentKind::Narrator);
        let (baseline, placeholder) = match narration {
            Some(n) => (n.text.clone(), false),
            None if !narrator_dispatched && !records.is_empty() => (rules_answer(&records), false),
            None => (self.fallback_narrative.clone(), true),
        };

        let mut response = FinalResponse {
            narrative: baseline,
            state_changes_applied: Vec::new(),
            consistency_warnings: Vec::new(),
            degraded,
            intent: ctx.intent.category,
            merge_strategy: None,
            state_warnings: Vec::new(),
            recorded_facts: Vec::new(),
            dice: Vec::new(),
            rule_citations: Vec::new(),
            ruling_note: None,
            lore,
            records,
            agent_reports,
        };

        if let Some(resolution) = resolution {
            self.apply_resolution(resolution, placeholder, state.game, &mut response);
        }

        self.record_facts(ctx, narration, resolution, state.facts, state.knowledge, &mut response);

        debug!(
            turn = ctx.turn,
            degraded = response.degraded,
            strategy = ?response.merge_strategy,
            facts = response.recorded_facts.len(),
            warnings = response.consistency_warnings.len(),
            "turn aggregated"
        );
        response
    }

    fn apply_resolution(
        &self,
        resolution: &Resolution,
        placeholder: bool,
        game: &mut dyn GameStateView,
        response: &mut FinalResponse,
    ) {
        let outcomes = game.apply_state_changes(&resolution.state_changes);
        for (change, outcome) in resolution.state_changes.iter().zip(outcomes) {
            match outcome {
                Ok(()) => response.state_changes_applied.push(change.clone()),
                Err(err) => {
                    warn!(change = %change, error = %err, "state change rejected");
                    response
                        .state_warnings
                        .push(format!("could not apply \"{change}\": {err}"));
                }
            }
        }

        response.dice = resolution.dice_rolls.clone();
        response.rule_citations = resolution.rule_citations.clone();
        response.ruling_note = resolution.ruling_note.clone();

        if resolution.narrative_hooks.is_empty() {
            return;
        }
        let hooks: Vec<String> = resolution
            .narrative_hooks
            .iter()
            .map(|h| as_sentence(h))
            .collect();

        if resolution.severity == Severity::Critical || placeholder {
            response.narrative = hooks.join(" ");
            response.merge_strategy = Some(MergeStrategy::Override);
        } else if let Some(amended) = amend(&response.narrative, resolution.outcome, &hooks) {
            response.narrative = amended;
            response.merge_strategy = Some(MergeStrategy::Amend);
        } else {
            response.narrative = format!("{} {}", response.narrative.trim_end(), hooks.join(" "));
            response.merge_strategy = Some(MergeStrategy::Append);
        }
    }

    /// Submit every proposition the turn implies. Contradictions become
    /// warnings; the fact is recorded regardless.
    ///
    /// Narration never outranks the dice: asserted facts are dropped when the
    /// prose was overridden, and a narration claim on a slot mechanics settled
    /// this turn is skipped.
    fn record_facts(
        &self,
        ctx: &TurnContext,
        narration: Option<&Narration>,
        resolution: Option<&Resolution>,
        facts: &mut FactStore,
        knowledge: &mut KnowledgeTracker,
        response: &mut FinalResponse,
    ) {
        let mut statements: Vec<(String, FactOrigin, bool)> = Vec::new();
        if let Some(resolution) = resolution {
            for fact in &resolution.established_facts {
                statements.push((fact.clone(), FactOrigin::Mechanics, false));
            }
        }
        if let Some(narration) = narration {
            if response.merge_strategy != Some(MergeStrategy::Override) {
                for fact in &narration.asserted_facts {
                    statements.push((fact.clone(), FactOrigin::Narration, false));
                }
            }
            for sentence in split_sentences(&response.narrative) {
                statements.push((sentence, FactOrigin::Narration, true));
            }
        }

        let entities = ctx.known_entities();
        let mut seen: Vec<String> = Vec::new();
        let mut settled: Vec<Proposition> = Vec::new();
        for (statement, origin, needs_proposition) in statements {
            let candidate = self.detector.candidate(&statement, &entities, origin);
            if candidate.statement.is_empty() || seen.contains(&candidate.statement) {
                continue;
            }
            if needs_proposition && candidate.proposition.is_none() {
                continue;
            }
            if let Some(proposition) = &candidate.proposition {
                if origin == FactOrigin::Mechanics {
                    settled.push(proposition.clone());
                } else if settled.iter().any(|s| s.same_slot(proposition)) {
                    debug!(
                        turn = ctx.turn,
                        statement = %candidate.statement,
                        "narration overruled by mechanics"
                    );
                    continue;
                }
            }
            seen.push(candidate.statement.clone());

            for contradiction in self.detector.check(&candidate, facts) {
                warn!(turn = ctx.turn, %contradiction, "contradiction detected");
                response.consistency_warnings.push(contradiction.to_string());
            }

            let statement = candidate.statement.clone();
            let recorded = facts.record(candidate, ctx.turn);
            for character in &ctx.snapshot.present {
                knowledge.learn(character, recorded.id, ctx.turn, Certainty::Witnessed);
            }
            response.recorded_facts.push(NewFact {
                id: recorded.id,
                statement,
                superseded: recorded.superseded,
            });
        }
    }
}

/// Narrative for an out-of-character lookup: the rules text if any rule
/// matched, otherwise every record summary.
fn rules_answer(records: &[ArchiveRecord]) -> String {
    let rules: Vec<&str> = records
        .iter()
        .filter(|r| r.is_rule())
        .map(|r| r.summary.as_str())
        .collect();
    if rules.is_empty() {
        records
            .iter()
            .map(|r| r.summary.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        rules.join(" ")
    }
}

/// Replace the sentences that assume the opposite outcome with the hooks.
/// `None` when no sentence conflicts.
fn amend(baseline: &str, outcome: Outcome, hooks: &[String]) -> Option<String> {
    let opposite = outcome.opposite()?;
    let sentences = split_sentences(baseline);
    let conflicts: Vec<bool> = sentences
        .iter()
        .map(|s| implied_outcome(&s.to_lowercase(), outcome) == Some(opposite))
        .collect();
    if !conflicts.contains(&true) {
        return None;
    }

    let mut merged: Vec<String> = Vec::new();
    let mut replaced = false;
    for (sentence, conflicting) in sentences.into_iter().zip(conflicts) {
        if !conflicting {
            merged.push(sentence);
        } else if !replaced {
            merged.extend(hooks.iter().cloned());
            replaced = true;
        }
    }
    Some(merged.join(" "))
}

/// Outcome a sentence assumes, within the same family as `actual`
/// (hit/miss or success/failure). Negative cues win.
fn implied_outcome(sentence: &str, actual: Outcome) -> Option<Outcome> {
    let any = |cues: &[&str]| cues.iter().any(|cue| contains_word(sentence, cue));
    match actual {
        Outcome::Hit | Outcome::Miss => {
            if any(MISS_CUES) {
                Some(Outcome::Miss)
            } else if any(HIT_CUES) {
                Some(Outcome::Hit)
            } else {
                None
            }
        }
        Outcome::Success | Outcome::Failure => {
            if any(FAILURE_CUES) {
                Some(Outcome::Failure)
            } else if any(SUCCESS_CUES) {
                Some(Outcome::Success)
            } else {
                None
            }
        }
        Outcome::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{fixtures, ActionKind};
    use crate::state::InMemoryGameState;
    use std::time::Duration;
    use uuid::Uuid;

    fn dispatched(kind: AgentKind, result: AgentResult) -> DispatchedResult {
        DispatchedResult {
            kind,
            correlation_id: Uuid::from_u128(7),
            result,
            elapsed: Duration::from_millis(10),
        }
    }

    fn narration(text: &str) -> DispatchedResult {
        dispatched(
            AgentKind::Narrator,
            AgentResult::Success(AgentPayload::Narration(Narration::parse(text))),
        )
    }

    fn resolution(outcome: Outcome, hooks: &[&str], changes: Vec<StateChange>) -> Resolution {
        Resolution {
            action: ActionKind::Attack,
            actor: "Aldric".into(),
            target: Some("Goblin".into()),
            dice_rolls: Vec::new(),
            state_changes: changes,
            rule_citations: vec![RuleCitation {
                rule: "Attack roll".into(),
                justification: "d20 +5 vs AC 15".into(),
            }],
            narrative_hooks: hooks.iter().map(|h| h.to_string()).collect(),
            outcome,
            severity: Severity::Routine,
            established_facts: Vec::new(),
            ruling_note: None,
        }
    }

    fn arbiter(resolution: Resolution) -> DispatchedResult {
        dispatched(
            AgentKind::Arbiter,
            AgentResult::Success(AgentPayload::Resolution(resolution)),
        )
    }

    struct Session {
        facts: FactStore,
        knowledge: KnowledgeTracker,
        game: InMemoryGameState,
    }

    impl Session {
        fn new() -> Self {
            Self {
                facts: FactStore::new(),
                knowledge: KnowledgeTracker::new(),
                game: InMemoryGameState::new(fixtures::snapshot()),
            }
        }

        fn aggregate(&mut self, text: &str, results: &[DispatchedResult]) -> FinalResponse {
            let ctx = fixtures::task_for(
                AgentKind::Narrator,
                text,
                self.game.state().clone(),
                Duration::from_secs(1),
            )
            .input;
            ResponseAggregator::default().aggregate(
                &ctx,
                results,
                SessionState {
                    facts: &mut self.facts,
                    knowledge: &mut self.knowledge,
                    game: &mut self.game,
                },
            )
        }
    }

    #[test]
    fn test_miss_amends_narrated_hit() {
        let mut session = Session::new();
        let response = session.aggregate(
            "I attack the goblin",
            &[
                narration("You lunge forward. Your blade strikes the goblin, drawing blood."),
                arbiter(resolution(Outcome::Miss, &["attack misses"], Vec::new())),
            ],
        );
        assert_eq!(response.merge_strategy, Some(MergeStrategy::Amend));
        assert_eq!(response.narrative, "You lunge forward. Attack misses.");
        assert!(!response.narrative.contains("strikes"));
        assert!(!response.degraded);
        assert_eq!(response.rule_citations.len(), 1);
    }

    #[test]
    fn test_consistent_hooks_are_appended() {
        let mut session = Session::new();
        let changes = vec![StateChange::Damage {
            target: "Goblin".into(),
            amount: 4,
            damage_type: "slashing".into(),
        }];
        let response = session.aggregate(
            "I attack the goblin",
            &[
                narration("Your blade bites into the goblin's shoulder."),
                arbiter(resolution(Outcome::Hit, &["attack hits for 4 slashing damage"], changes.clone())),
            ],
        );
        assert_eq!(response.merge_strategy, Some(MergeStrategy::Append));
        assert_eq!(
            response.narrative,
            "Your blade bites into the goblin's shoulder. Attack hits for 4 slashing damage."
        );
        assert_eq!(response.state_changes_applied, changes);
        assert_eq!(session.game.state().character("goblin").unwrap().hp, 3);
    }

    #[test]
    fn test_critical_outcome_overrides() {
        let mut session = Session::new();
        let mut r = resolution(
            Outcome::Hit,
            &["attack hits for 9 slashing damage", "the goblin falls"],
            Vec::new(),
        );
        r.severity = Severity::Critical;
        r.established_facts = vec!["the goblin is dead".into()];
        let response = session.aggregate(
            "I attack the goblin",
            &[narration("The goblin ducks and laughs at you."), arbiter(r)],
        );
        assert_eq!(response.merge_strategy, Some(MergeStrategy::Override));
        assert_eq!(
            response.narrative,
            "Attack hits for 9 slashing damage. The goblin falls."
        );
        assert_eq!(response.recorded_facts[0].statement, "the goblin is dead");
    }

    fn statements(response: &FinalResponse) -> Vec<&str> {
        response
            .recorded_facts
            .iter()
            .map(|f| f.statement.as_str())
            .collect()
    }

    #[test]
    fn test_overridden_narration_asserts_nothing() {
        let mut session = Session::new();
        let mut r = resolution(
            Outcome::Hit,
            &["attack hits for 8 slashing damage", "the goblin falls"],
            Vec::new(),
        );
        r.severity = Severity::Critical;
        r.established_facts = vec!["the goblin is dead".into()];
        let response = session.aggregate(
            "I attack the goblin with my sword",
            &[
                narration("The goblin ducks your swing and laughs.\nFACT: the goblin is alive"),
                arbiter(r),
            ],
        );

        assert_eq!(response.merge_strategy, Some(MergeStrategy::Override));
        assert_eq!(statements(&response), vec!["the goblin is dead"]);
        assert!(response.consistency_warnings.is_empty());
        let current: Vec<&str> = session
            .facts
            .facts_about("goblin")
            .iter()
            .map(|f| f.statement.as_str())
            .collect();
        assert_eq!(current, vec!["the goblin is dead"]);
    }

    #[test]
    fn test_amended_narration_keeps_only_unrelated_assertions() {
        let mut session = Session::new();
        let mut r = resolution(Outcome::Hit, &["attack hits for 4 slashing damage"], Vec::new());
        r.established_facts = vec!["the goblin is wounded".into()];
        let response = session.aggregate(
            "I attack the goblin",
            &[
                narration(
                    "The goblin dodges your blade.\nFACT: the goblin is unharmed\nFACT: the mill is abandoned",
                ),
                arbiter(r),
            ],
        );

        assert_eq!(response.merge_strategy, Some(MergeStrategy::Amend));
        assert_eq!(
            statements(&response),
            vec!["the goblin is wounded", "the mill is abandoned"]
        );
        assert!(response.consistency_warnings.is_empty());
    }

    #[test]
    fn test_narrated_sentence_cannot_supersede_mechanics() {
        let mut session = Session::new();
        let mut r = resolution(Outcome::Hit, &["attack hits for 4 slashing damage"], Vec::new());
        r.established_facts = vec!["the goblin is wounded".into()];
        let response = session.aggregate(
            "I attack the goblin",
            &[
                narration("Your blade bites into the goblin. The goblin is unharmed."),
                arbiter(r),
            ],
        );

        assert_eq!(response.merge_strategy, Some(MergeStrategy::Append));
        assert_eq!(statements(&response), vec!["the goblin is wounded"]);
        assert!(session
            .facts
            .facts_about("goblin")
            .iter()
            .all(|f| f.origin == FactOrigin::Mechanics));
    }

    #[test]
    fn test_rejected_change_becomes_warning() {
        let mut session = Session::new();
        let changes = vec![StateChange::Damage {
            target: "Dragon".into(),
            amount: 4,
            damage_type: "fire".into(),
        }];
        let response = session.aggregate(
            "I attack the dragon",
            &[
                narration("Flames wash over the scales."),
                arbiter(resolution(Outcome::Hit, &["attack hits for 4 fire damage"], changes)),
            ],
        );
        assert!(response.state_changes_applied.is_empty());
        assert_eq!(response.state_warnings.len(), 1);
        assert!(response.state_warnings[0].contains("Dragon"));
        assert!(!response.narrative.is_empty());
    }

    #[test]
    fn test_everything_failed_uses_placeholder() {
        let mut session = Session::new();
        let response = session.aggregate(
            "I attack the goblin",
            &[
                dispatched(AgentKind::Narrator, AgentResult::Timeout),
                dispatched(AgentKind::Arbiter, AgentResult::Failure("boom".into())),
                dispatched(AgentKind::Archivist, AgentResult::Timeout),
            ],
        );
        assert!(response.degraded);
        assert_eq!(response.narrative, "The moment passes in silence...");
        assert_eq!(response.merge_strategy, None);
        assert_eq!(response.agent_reports[1].reason.as_deref(), Some("boom"));
    }

    #[test]
    fn test_placeholder_baseline_is_overridden_by_hooks() {
        let mut session = Session::new();
        let response = session.aggregate(
            "I attack the goblin",
            &[
                dispatched(AgentKind::Narrator, AgentResult::Timeout),
                arbiter(resolution(Outcome::Miss, &["attack misses"], Vec::new())),
            ],
        );
        assert!(response.degraded);
        assert_eq!(response.merge_strategy, Some(MergeStrategy::Override));
        assert_eq!(response.narrative, "Attack misses.");
    }

    #[test]
    fn test_rules_only_turn_is_not_degraded() {
        let mut session = Session::new();
        let records = vec![
            ArchiveRecord {
                topic: "sheet:aldric".into(),
                summary: "Aldric: AC 16, 12/12 hp.".into(),
                data: serde_json::Value::Null,
            },
            ArchiveRecord {
                topic: "rule:grapple".into(),
                summary: "A grappled creature's speed becomes 0.".into(),
                data: serde_json::Value::Null,
            },
        ];
        let response = session.aggregate(
            "how does grapple work?",
            &[dispatched(
                AgentKind::Archivist,
                AgentResult::Success(AgentPayload::Records(records)),
            )],
        );
        assert!(!response.degraded);
        assert_eq!(response.narrative, "A grappled creature's speed becomes 0.");
        assert!(response.recorded_facts.is_empty());
    }

    #[test]
    fn test_contradiction_is_flagged_and_recorded() {
        let mut session = Session::new();
        session.aggregate("I look at the letter", &[narration("The letter is sealed.")]);
        let response = session.aggregate("I look again", &[narration("The letter is unsealed.")]);

        assert_eq!(response.consistency_warnings.len(), 1);
        assert!(response.consistency_warnings[0].contains("fact#0"));
        assert_eq!(response.recorded_facts[0].superseded, vec![FactId(0)]);
        assert_eq!(session.facts.len(), 2);
        assert!(!session.facts.get(FactId(0)).unwrap().is_current());
    }

    #[test]
    fn test_present_characters_witness_new_facts() {
        let mut session = Session::new();
        let response = session.aggregate(
            "I push the door",
            &[narration("The door is open.\nFACT: the mill is abandoned")],
        );
        let ids: Vec<FactId> = response.recorded_facts.iter().map(|f| f.id).collect();
        assert_eq!(ids.len(), 2);
        for id in ids {
            assert_eq!(session.knowledge.certainty("Aldric", id), Some(Certainty::Witnessed));
            assert!(session.knowledge.knows("goblin", id));
        }
    }

    #[test]
    fn test_replay_is_identical() {
        let results = vec![
            narration("The door is open. Your blade strikes true."),
            arbiter(resolution(Outcome::Miss, &["attack misses"], Vec::new())),
        ];
        let mut a = Session::new();
        let mut b = Session::new();
        assert_eq!(
            a.aggregate("I attack", &results),
            b.aggregate("I attack", &results)
        );
    }

    #[test]
    fn test_implied_outcome_prefers_negative_cues() {
        assert_eq!(
            implied_outcome("your swing misses the goblin's head", Outcome::Hit),
            Some(Outcome::Miss)
        );
        assert_eq!(
            implied_outcome("you fail to climb", Outcome::Success),
            Some(Outcome::Failure)
        );
        assert_eq!(implied_outcome("the wind howls", Outcome::Hit), None);
    }
}
