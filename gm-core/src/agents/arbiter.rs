//! Arbiter: mechanical resolution.
//!
//! Classifies the action (attack, spell, save, check), resolves it with
//! seeded dice and rule lookups, and reports the outcome as structured data
//! plus short hooks for the aggregator to weave into the narration. The dice
//! are seeded from the task's correlation id, so a task always resolves the
//! same way.

use super::{AgentError, AgentTask, TurnContext};
use crate::dice::{Advantage, DiceExpression, RollResult};
use crate::generation::{Generator, Prompt};
use crate::rules::{RulesLookup, SpellData, SpellResolution, WeaponData};
use crate::state::{Ability, CharacterSheet, Condition, CreatureKind, Skill, StateChange};
use crate::text::{contains_word, find_word};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

const ATTACK_WORDS: &[&str] = &[
    "attack", "attacks", "strike", "stab", "slash", "shoot", "swing", "hit", "punch", "kick",
    "smite", "fire at", "charge",
];

/// What kind of action was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Attack,
    Spell,
    Save,
    Check,
    /// Nothing to resolve mechanically.
    None,
}

/// Mechanical outcome, from the acting character's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Hit,
    Miss,
    Success,
    Failure,
    None,
}

impl Outcome {
    /// Outcome the narration would have to assume to be wrong about this one.
    pub fn opposite(&self) -> Option<Outcome> {
        match self {
            Outcome::Hit => Some(Outcome::Miss),
            Outcome::Miss => Some(Outcome::Hit),
            Outcome::Success => Some(Outcome::Failure),
            Outcome::Failure => Some(Outcome::Success),
            Outcome::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Routine,
    /// A creature dropped to 0 hit points.
    Critical,
}

/// One labelled roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub label: String,
    pub result: RollResult,
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.result)
    }
}

/// A rule the Arbiter applied, with a human-readable justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCitation {
    pub rule: String,
    pub justification: String,
}

impl RuleCitation {
    fn new(rule: &str, justification: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            justification: justification.into(),
        }
    }
}

/// Arbiter output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: ActionKind,
    pub actor: String,
    pub target: Option<String>,
    pub dice_rolls: Vec<DiceRoll>,
    pub state_changes: Vec<StateChange>,
    pub rule_citations: Vec<RuleCitation>,
    /// Short outcome summaries, e.g. "attack misses".
    pub narrative_hooks: Vec<String>,
    pub outcome: Outcome,
    pub severity: Severity,
    /// Statements that hold because of the mechanics ("the goblin is dead").
    pub established_facts: Vec<String>,
    pub ruling_note: Option<String>,
}

impl Resolution {
    fn new(actor: &str) -> Self {
        Self {
            action: ActionKind::None,
            actor: actor.to_string(),
            target: None,
            dice_rolls: Vec::new(),
            state_changes: Vec::new(),
            rule_citations: Vec::new(),
            narrative_hooks: Vec::new(),
            outcome: Outcome::None,
            severity: Severity::Routine,
            established_facts: Vec::new(),
            ruling_note: None,
        }
    }
}

/// Whoever the action is aimed at.
#[derive(Debug, Clone)]
struct Target {
    name: String,
    armor_class: i32,
    hp: Option<i32>,
    kind: CreatureKind,
    sheet: Option<CharacterSheet>,
}

impl Target {
    fn from_sheet(sheet: &CharacterSheet) -> Self {
        Self {
            name: sheet.name.clone(),
            armor_class: sheet.armor_class,
            hp: Some(sheet.hp),
            kind: sheet.kind,
            sheet: Some(sheet.clone()),
        }
    }

    /// "the goblin" for monsters, the name for everyone else.
    fn phrase(&self) -> String {
        match self.kind {
            CreatureKind::Monster => format!("the {}", self.name.to_lowercase()),
            _ => self.name.clone(),
        }
    }

    fn has(&self, condition: Condition) -> bool {
        self.sheet.as_ref().is_some_and(|s| s.has_condition(condition))
    }
}

pub struct Arbiter {
    rules: Arc<dyn RulesLookup>,
    generator: Option<Arc<dyn Generator>>,
    default_dc: i32,
    max_tokens: usize,
}

impl Arbiter {
    pub fn new(rules: Arc<dyn RulesLookup>) -> Self {
        Self {
            rules,
            generator: None,
            default_dc: 12,
            max_tokens: 120,
        }
    }

    /// Attach a generator for an optional one-line ruling note.
    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_default_dc(mut self, dc: i32) -> Self {
        self.default_dc = dc;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub(super) async fn run(&self, task: &AgentTask) -> Result<Resolution, AgentError> {
        let mut resolution = self.resolve(&task.input, task.correlation_id)?;

        if let Some(ref generator) = self.generator {
            if resolution.outcome != Outcome::None {
                // Leave half the remaining budget for the mechanics to be used at all.
                let note_deadline = Instant::now() + task.remaining() / 2;
                let prompt = Prompt::new(format!(
                    "Summarize this ruling for the table in one short sentence.\nRules: {}\nOutcome: {}",
                    resolution
                        .rule_citations
                        .iter()
                        .map(|c| format!("{} ({})", c.rule, c.justification))
                        .collect::<Vec<_>>()
                        .join("; "),
                    resolution.narrative_hooks.join("; ")
                ));
                match generator.generate(&prompt, self.max_tokens, note_deadline).await {
                    Ok(note) => resolution.ruling_note = Some(note),
                    Err(err) => debug!(error = %err, "no ruling note"),
                }
            }
        }

        Ok(resolution)
    }

    /// Resolve the turn's action. Deterministic for a given correlation id.
    pub fn resolve(&self, ctx: &TurnContext, correlation_id: Uuid) -> Result<Resolution, AgentError> {
        let seed = correlation_id.as_u128();
        let mut rng = StdRng::seed_from_u64((seed >> 64) as u64 ^ seed as u64);

        let text = ctx.lowered_text();
        let actor = ctx.snapshot.player_sheet().ok_or(AgentError::NoActor)?;
        let mut resolution = Resolution::new(&actor.name);

        if let Some(spell) = self.rules.spell_in(&text) {
            let target = self.find_target(ctx, &text, actor);
            self.resolve_spell(actor, target, &spell, &mut rng, &mut resolution)?;
        } else if ATTACK_WORDS.iter().any(|w| contains_word(&text, w)) {
            let target = self.find_target(ctx, &text, actor);
            self.resolve_attack(actor, target, &text, &mut rng, &mut resolution)?;
        } else if let Some(ability) = save_ability(&text) {
            self.resolve_save(actor, ability, &mut rng, &mut resolution);
        } else if let Some(skill) = self.rules.skill_for_action(&text) {
            self.resolve_check(actor, skill, &mut rng, &mut resolution);
        }

        Ok(resolution)
    }

    /// Named character, then a stat-block monster named in the text, then
    /// the next standing enemy in initiative order.
    fn find_target(&self, ctx: &TurnContext, text: &str, actor: &CharacterSheet) -> Option<Target> {
        let snapshot = &ctx.snapshot;
        let named = snapshot
            .mentioned_in(text)
            .into_iter()
            .filter(|s| !s.name.eq_ignore_ascii_case(&actor.name))
            .min_by_key(|s| (s.is_down(), find_word(text, &s.name.to_lowercase())));
        if let Some(sheet) = named {
            return Some(Target::from_sheet(sheet));
        }

        if let Some(monster) = named_in(text, |name| self.rules.monster(name)) {
            return Some(Target {
                name: monster.name,
                armor_class: monster.armor_class,
                hp: None,
                kind: CreatureKind::Monster,
                sheet: None,
            });
        }

        snapshot
            .combat
            .as_ref()?
            .order
            .iter()
            .filter(|c| !c.is_player)
            .filter_map(|c| snapshot.character(&c.name))
            .find(|s| !s.is_down())
            .map(Target::from_sheet)
    }

    fn resolve_attack(
        &self,
        actor: &CharacterSheet,
        target: Option<Target>,
        text: &str,
        rng: &mut StdRng,
        resolution: &mut Resolution,
    ) -> Result<(), AgentError> {
        resolution.action = ActionKind::Attack;
        let Some(target) = target else {
            resolution
                .narrative_hooks
                .push("there is no one in reach to attack".to_string());
            return Ok(());
        };
        resolution.target = Some(target.name.clone());

        let weapon = named_in(text, |name| self.rules.weapon(name))
            .or_else(|| actor.weapon.as_deref().and_then(|w| self.rules.weapon(w)))
            .unwrap_or_else(|| WeaponData::new("Unarmed Strike", "1", "bludgeoning"));

        let ability = weapon.attack_ability(
            actor.modifier(Ability::Strength),
            actor.modifier(Ability::Dexterity),
        );
        let ability_mod = actor.modifier(ability);
        let (advantage, reason) = attack_advantage(actor, &target, weapon.ranged);

        let roll = DiceExpression::d20(ability_mod + actor.proficiency_bonus)
            .roll_with_advantage_rng(advantage, rng);
        resolution.rule_citations.push(RuleCitation::new(
            "Attack roll",
            format!(
                "d20 {ability_mod:+} ({ability}) {:+} (proficiency) with {} vs AC {}",
                actor.proficiency_bonus, weapon.name, target.armor_class
            ),
        ));
        if let Some(reason) = reason {
            let rule = match advantage {
                Advantage::Disadvantage => "Disadvantage",
                _ => "Advantage",
            };
            resolution.rule_citations.push(RuleCitation::new(rule, reason));
        }

        let hit = roll.natural_20 || (!roll.natural_1 && roll.meets_dc(target.armor_class));
        let critical = roll.natural_20;
        if roll.natural_1 {
            resolution
                .rule_citations
                .push(RuleCitation::new("Natural 1", "an attack roll of 1 always misses"));
        }
        resolution.dice_rolls.push(DiceRoll {
            label: "attack roll".to_string(),
            result: roll,
        });

        if !hit {
            resolution.outcome = Outcome::Miss;
            resolution.narrative_hooks.push("attack misses".to_string());
            return Ok(());
        }

        let mut damage = parse_dice(&weapon.damage)?.plus(ability_mod);
        if critical {
            damage = damage.doubled_dice();
            resolution.rule_citations.push(RuleCitation::new(
                "Critical hit",
                "a natural 20 hits regardless of AC and doubles the damage dice",
            ));
        }
        let damage_roll = damage.roll_with_rng(rng);
        let amount = damage_roll.total.max(1);
        resolution.rule_citations.push(RuleCitation::new(
            "Damage",
            format!(
                "{} {ability_mod:+} {} damage from {}",
                weapon.damage, weapon.damage_type, weapon.name
            ),
        ));
        resolution.dice_rolls.push(DiceRoll {
            label: "damage".to_string(),
            result: damage_roll,
        });

        resolution.outcome = Outcome::Hit;
        if critical {
            resolution.narrative_hooks.push("critical hit".to_string());
        }
        resolution.narrative_hooks.push(format!(
            "attack hits for {amount} {} damage",
            weapon.damage_type
        ));
        apply_damage(&target, amount, &weapon.damage_type, resolution);
        Ok(())
    }

    fn resolve_spell(
        &self,
        actor: &CharacterSheet,
        target: Option<Target>,
        spell: &SpellData,
        rng: &mut StdRng,
        resolution: &mut Resolution,
    ) -> Result<(), AgentError> {
        resolution.action = ActionKind::Spell;
        let spell_name = spell.name.to_lowercase();

        let (Some(attack_bonus), Some(save_dc)) = (actor.spell_attack_bonus(), actor.spell_save_dc())
        else {
            resolution.rule_citations.push(RuleCitation::new(
                "Spellcasting",
                format!("{} has no spellcasting ability", actor.name),
            ));
            resolution
                .narrative_hooks
                .push(format!("{} cannot cast {spell_name}", actor.name));
            return Ok(());
        };

        let Some(target) = target else {
            resolution
                .narrative_hooks
                .push(format!("the {spell_name} has no target"));
            return Ok(());
        };
        resolution.target = Some(target.name.clone());
        let damage = parse_dice(&spell.damage)?;

        match spell.resolution {
            SpellResolution::Attack => {
                let roll = DiceExpression::d20(attack_bonus).roll_with_rng(rng);
                let hit = roll.natural_20 || (!roll.natural_1 && roll.meets_dc(target.armor_class));
                let critical = roll.natural_20;
                resolution.rule_citations.push(RuleCitation::new(
                    "Spell attack",
                    format!("d20 {attack_bonus:+} (spell attack) vs AC {}", target.armor_class),
                ));
                resolution.dice_rolls.push(DiceRoll {
                    label: "spell attack".to_string(),
                    result: roll,
                });
                if !hit {
                    resolution.outcome = Outcome::Miss;
                    resolution
                        .narrative_hooks
                        .push(format!("the {spell_name} misses"));
                    return Ok(());
                }
                let damage = if critical { damage.doubled_dice() } else { damage };
                let damage_roll = damage.roll_with_rng(rng);
                let amount = damage_roll.total.max(1);
                resolution.dice_rolls.push(DiceRoll {
                    label: "damage".to_string(),
                    result: damage_roll,
                });
                resolution.outcome = Outcome::Hit;
                resolution.narrative_hooks.push(format!(
                    "the {spell_name} hits for {amount} {} damage",
                    spell.damage_type
                ));
                apply_damage(&target, amount, &spell.damage_type, resolution);
            }
            SpellResolution::Save(ability) => {
                let save_bonus = target
                    .sheet
                    .as_ref()
                    .map_or(0, |sheet| sheet.save_bonus(ability));
                let save = DiceExpression::d20(save_bonus).roll_with_rng(rng);
                let saved = save.meets_dc(save_dc);
                resolution.rule_citations.push(RuleCitation::new(
                    "Saving throw",
                    format!(
                        "{} rolls a {} save {save_bonus:+} vs spell DC {save_dc}; half damage on a success",
                        target.phrase(),
                        ability.name()
                    ),
                ));
                resolution.dice_rolls.push(DiceRoll {
                    label: format!("{} save", target.name.to_lowercase()),
                    result: save,
                });
                let damage_roll = damage.roll_with_rng(rng);
                let full = damage_roll.total.max(1);
                resolution.dice_rolls.push(DiceRoll {
                    label: "damage".to_string(),
                    result: damage_roll,
                });
                let amount = if saved { full / 2 } else { full };
                if saved {
                    resolution.outcome = Outcome::Miss;
                    resolution.narrative_hooks.push(format!(
                        "{} resists the {spell_name}, taking {amount} {} damage",
                        target.phrase(),
                        spell.damage_type
                    ));
                } else {
                    resolution.outcome = Outcome::Hit;
                    resolution.narrative_hooks.push(format!(
                        "the {spell_name} hits for {amount} {} damage",
                        spell.damage_type
                    ));
                }
                if amount > 0 {
                    apply_damage(&target, amount, &spell.damage_type, resolution);
                }
            }
            SpellResolution::Automatic => {
                let damage_roll = damage.roll_with_rng(rng);
                let amount = damage_roll.total.max(1);
                resolution.rule_citations.push(RuleCitation::new(
                    "Automatic hit",
                    format!("{} always hits", spell.name),
                ));
                resolution.dice_rolls.push(DiceRoll {
                    label: "damage".to_string(),
                    result: damage_roll,
                });
                resolution.outcome = Outcome::Hit;
                resolution.narrative_hooks.push(format!(
                    "the {spell_name} hits for {amount} {} damage",
                    spell.damage_type
                ));
                apply_damage(&target, amount, &spell.damage_type, resolution);
            }
        }
        Ok(())
    }

    fn resolve_save(
        &self,
        actor: &CharacterSheet,
        ability: Ability,
        rng: &mut StdRng,
        resolution: &mut Resolution,
    ) {
        resolution.action = ActionKind::Save;
        let bonus = actor.save_bonus(ability);
        let roll = DiceExpression::d20(bonus).roll_with_rng(rng);
        let success = roll.meets_dc(self.default_dc);
        resolution.rule_citations.push(RuleCitation::new(
            "Saving throw",
            format!("d20 {bonus:+} ({} save) vs DC {}", ability.name(), self.default_dc),
        ));
        resolution.dice_rolls.push(DiceRoll {
            label: format!("{} save", ability.name().to_lowercase()),
            result: roll,
        });
        let verdict = if success { "succeeds" } else { "fails" };
        resolution.outcome = if success { Outcome::Success } else { Outcome::Failure };
        resolution.narrative_hooks.push(format!(
            "{} saving throw {verdict}",
            ability.name().to_lowercase()
        ));
    }

    fn resolve_check(
        &self,
        actor: &CharacterSheet,
        skill: Skill,
        rng: &mut StdRng,
        resolution: &mut Resolution,
    ) {
        resolution.action = ActionKind::Check;
        let bonus = actor.skill_bonus(skill);
        let advantage = if actor.has_condition(Condition::Poisoned) {
            Advantage::Disadvantage
        } else {
            Advantage::Normal
        };
        let roll = DiceExpression::d20(bonus).roll_with_advantage_rng(advantage, rng);
        let success = roll.meets_dc(self.default_dc);

        let proficiency = if actor.skills.contains(&skill) {
            format!(" {:+} (proficiency)", actor.proficiency_bonus)
        } else {
            String::new()
        };
        resolution.rule_citations.push(RuleCitation::new(
            "Ability check",
            format!(
                "d20 {:+} ({}){proficiency} for {skill} vs DC {}",
                actor.modifier(skill.ability()),
                skill.ability(),
                self.default_dc
            ),
        ));
        if advantage == Advantage::Disadvantage {
            resolution
                .rule_citations
                .push(RuleCitation::new("Disadvantage", "poisoned creatures roll checks at disadvantage"));
        }
        resolution.dice_rolls.push(DiceRoll {
            label: format!("{} check", skill.name().to_lowercase()),
            result: roll,
        });
        let verdict = if success { "succeeds" } else { "fails" };
        resolution.outcome = if success { Outcome::Success } else { Outcome::Failure };
        resolution.narrative_hooks.push(format!(
            "{} check {verdict}",
            skill.name().to_lowercase()
        ));
    }
}

/// Record damage, the resulting state change and any fact it establishes.
fn apply_damage(target: &Target, amount: i32, damage_type: &str, resolution: &mut Resolution) {
    resolution.state_changes.push(StateChange::Damage {
        target: target.name.clone(),
        amount,
        damage_type: damage_type.to_string(),
    });

    let Some(hp) = target.hp else {
        return;
    };
    let phrase = target.phrase();
    if hp - amount <= 0 {
        resolution.severity = Severity::Critical;
        match target.kind {
            CreatureKind::Monster => {
                resolution.narrative_hooks.push(format!("{phrase} falls"));
                resolution.established_facts.push(format!("{phrase} is dead"));
            }
            _ => {
                resolution
                    .narrative_hooks
                    .push(format!("{phrase} falls unconscious"));
                resolution
                    .established_facts
                    .push(format!("{phrase} is unconscious"));
            }
        }
    } else {
        resolution.established_facts.push(format!("{phrase} is wounded"));
    }
}

fn attack_advantage(actor: &CharacterSheet, target: &Target, ranged: bool) -> (Advantage, Option<String>) {
    let mut advantage = Advantage::Normal;
    let mut reasons = Vec::new();

    for condition in [Condition::Restrained, Condition::Stunned, Condition::Unconscious] {
        if target.has(condition) {
            advantage = advantage.combine(Advantage::Advantage);
            reasons.push(format!("target is {condition}"));
        }
    }
    if target.has(Condition::Prone) {
        if ranged {
            advantage = advantage.combine(Advantage::Disadvantage);
            reasons.push("ranged attack against a prone target".to_string());
        } else {
            advantage = advantage.combine(Advantage::Advantage);
            reasons.push("melee attack against a prone target".to_string());
        }
    }
    for condition in [
        Condition::Blinded,
        Condition::Frightened,
        Condition::Poisoned,
        Condition::Restrained,
    ] {
        if actor.has_condition(condition) {
            advantage = advantage.combine(Advantage::Disadvantage);
            reasons.push(format!("attacker is {condition}"));
        }
    }

    let reason = (!reasons.is_empty()).then(|| reasons.join(", "));
    (advantage, reason)
}

/// Ability named by "<ability> save" / "<ability> saving throw"; a bare
/// "saving throw" defaults to Constitution.
fn save_ability(text: &str) -> Option<Ability> {
    for ability in Ability::ALL {
        let name = ability.name().to_lowercase();
        if contains_word(text, &format!("{name} save"))
            || contains_word(text, &format!("{name} saving throw"))
        {
            return Some(ability);
        }
    }
    contains_word(text, "saving throw").then_some(Ability::Constitution)
}

/// First one- or two-word span of `text` that `lookup` recognizes.
fn named_in<T>(text: &str, lookup: impl Fn(&str) -> Option<T>) -> Option<T> {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    for i in 0..words.len() {
        if let Some(pair) = words.get(i..i + 2) {
            if let Some(found) = lookup(&pair.join(" ")) {
                return Some(found);
            }
        }
        if let Some(found) = lookup(words[i]) {
            return Some(found);
        }
    }
    None
}

fn parse_dice(notation: &str) -> Result<DiceExpression, AgentError> {
    DiceExpression::parse(notation).map_err(|e| AgentError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::fixtures;
    use crate::agents::{Agent, AgentKind, AgentPayload, AgentResult};
    use crate::rules::StandardRules;
    use crate::state::{CharacterSheet, GameSnapshot};
    use crate::testing::ScriptedGenerator;
    use std::time::Duration;

    fn arbiter() -> Arbiter {
        Arbiter::new(Arc::new(StandardRules))
    }

    fn context(text: &str, snapshot: GameSnapshot) -> Arc<TurnContext> {
        fixtures::task_for(AgentKind::Arbiter, text, snapshot, Duration::from_secs(5)).input
    }

    fn with_goblin(hp: i32, armor_class: i32) -> GameSnapshot {
        let mut goblin = CharacterSheet::new("Goblin", CreatureKind::Monster, 7, armor_class);
        goblin.hp = hp;
        fixtures::snapshot().with_character(goblin)
    }

    #[test]
    fn test_same_correlation_id_same_resolution() {
        let ctx = context("I attack the goblin with my longsword", fixtures::snapshot());
        let a = arbiter().resolve(&ctx, Uuid::from_u128(42)).unwrap();
        let b = arbiter().resolve(&ctx, Uuid::from_u128(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.action, ActionKind::Attack);
        assert_eq!(a.target.as_deref(), Some("Goblin"));
        assert!(a.rule_citations.iter().any(|c| c.rule == "Attack roll"));
    }

    #[test]
    fn test_unbeatable_armor_only_yields_to_natural_20() {
        let ctx = context("I attack the goblin", with_goblin(7, 99));
        for id in 0..40u128 {
            let r = arbiter().resolve(&ctx, Uuid::from_u128(id)).unwrap();
            let natural = r.dice_rolls[0].result.natural();
            if natural == Some(20) {
                assert_eq!(r.outcome, Outcome::Hit);
                assert!(r.narrative_hooks.contains(&"critical hit".to_string()));
            } else {
                assert_eq!(r.outcome, Outcome::Miss);
                assert_eq!(r.narrative_hooks, vec!["attack misses"]);
                assert!(r.state_changes.is_empty());
                assert!(r.established_facts.is_empty());
            }
        }
    }

    #[test]
    fn test_dropping_a_monster_is_critical() {
        let ctx = context("I attack the goblin", with_goblin(1, 0));
        let mut hits = 0;
        for id in 0..20u128 {
            let r = arbiter().resolve(&ctx, Uuid::from_u128(id)).unwrap();
            match r.outcome {
                Outcome::Hit => {
                    hits += 1;
                    assert_eq!(r.severity, Severity::Critical);
                    assert!(r.narrative_hooks.contains(&"the goblin falls".to_string()));
                    assert_eq!(r.established_facts, vec!["the goblin is dead"]);
                    assert!(matches!(
                        &r.state_changes[0],
                        StateChange::Damage { target, amount, .. } if target == "Goblin" && *amount >= 1
                    ));
                }
                Outcome::Miss => assert_eq!(r.dice_rolls[0].result.natural(), Some(1)),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn test_stat_block_target_not_in_scene() {
        let ctx = context("I attack the orc", fixtures::snapshot());
        let r = arbiter().resolve(&ctx, Uuid::from_u128(3)).unwrap();
        assert_eq!(r.target.as_deref(), Some("Orc"));
        assert!(r.rule_citations[0].justification.ends_with("vs AC 13"));
        // Unknown hit points: no kill can be established.
        assert!(r.established_facts.is_empty());
    }

    #[test]
    fn test_attack_without_target() {
        let hero_only = GameSnapshot::new(
            "an empty road",
            fixtures::snapshot().player_sheet().unwrap().clone(),
        );
        let ctx = context("I attack", hero_only);
        let r = arbiter().resolve(&ctx, Uuid::from_u128(1)).unwrap();
        assert_eq!(r.action, ActionKind::Attack);
        assert_eq!(r.outcome, Outcome::None);
        assert!(r.dice_rolls.is_empty());
        assert_eq!(r.narrative_hooks, vec!["there is no one in reach to attack"]);
    }

    #[test]
    fn test_non_caster_cannot_cast() {
        let ctx = context("I cast fire bolt at the goblin", fixtures::snapshot());
        let r = arbiter().resolve(&ctx, Uuid::from_u128(1)).unwrap();
        assert_eq!(r.action, ActionKind::Spell);
        assert_eq!(r.outcome, Outcome::None);
        assert_eq!(r.narrative_hooks, vec!["Aldric cannot cast fire bolt"]);
    }

    #[test]
    fn test_save_spell_always_damages_or_halves() {
        let mut snapshot = fixtures::snapshot();
        if let Some(hero) = snapshot.characters.get_mut("aldric") {
            hero.spellcasting = Some(Ability::Charisma);
        }
        let ctx = context("I cast fireball at the goblin", snapshot);
        for id in 0..10u128 {
            let r = arbiter().resolve(&ctx, Uuid::from_u128(id)).unwrap();
            assert!(matches!(r.outcome, Outcome::Hit | Outcome::Miss));
            assert!(r.rule_citations.iter().any(|c| c.rule == "Saving throw"));
            assert_eq!(r.dice_rolls.len(), 2);
            assert!(r.state_changes.len() <= 1);
        }
    }

    #[test]
    fn test_skill_check() {
        let ctx = context("I climb the crumbling wall", fixtures::snapshot());
        let r = arbiter().resolve(&ctx, Uuid::from_u128(9)).unwrap();
        assert_eq!(r.action, ActionKind::Check);
        let roll = &r.dice_rolls[0].result;
        // Athletics: STR +3, proficient +2.
        assert_eq!(roll.modifier, 5);
        let expected = if roll.total >= 12 { "athletics check succeeds" } else { "athletics check fails" };
        assert_eq!(r.narrative_hooks, vec![expected]);
    }

    #[test]
    fn test_saving_throw() {
        let ctx = context("I make a dexterity saving throw", fixtures::snapshot());
        let r = arbiter().resolve(&ctx, Uuid::from_u128(5)).unwrap();
        assert_eq!(r.action, ActionKind::Save);
        assert_eq!(r.dice_rolls[0].result.modifier, 1);
        assert!(matches!(r.outcome, Outcome::Success | Outcome::Failure));
    }

    #[test]
    fn test_nothing_to_resolve() {
        let ctx = context("I wave hello", fixtures::snapshot());
        let r = arbiter().resolve(&ctx, Uuid::from_u128(1)).unwrap();
        assert_eq!(r.action, ActionKind::None);
        assert_eq!(r.outcome, Outcome::None);
        assert!(r.narrative_hooks.is_empty());
    }

    #[test]
    fn test_advantage_against_prone_target() {
        let mut goblin = CharacterSheet::new("Goblin", CreatureKind::Monster, 7, 15);
        goblin.conditions.push(Condition::Prone);
        let ctx = context("I attack the goblin", fixtures::snapshot().with_character(goblin));
        let r = arbiter().resolve(&ctx, Uuid::from_u128(2)).unwrap();
        assert_eq!(r.dice_rolls[0].result.components[0].rolls.len(), 2);
        assert!(r.rule_citations.iter().any(|c| c.rule == "Advantage"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ruling_note_is_optional() {
        let task = fixtures::task_for(
            AgentKind::Arbiter,
            "I climb the wall",
            fixtures::snapshot(),
            Duration::from_secs(5),
        );

        let noted = Agent::from(
            arbiter().with_generator(Arc::new(ScriptedGenerator::new().reply("Aldric scales it."))),
        );
        match noted.execute(&task).await {
            AgentResult::Success(AgentPayload::Resolution(r)) => {
                assert_eq!(r.ruling_note.as_deref(), Some("Aldric scales it."));
            }
            other => panic!("unexpected {other:?}"),
        }

        let failing = Agent::from(arbiter().with_generator(Arc::new(ScriptedGenerator::new().fail("offline"))));
        match failing.execute(&task).await {
            AgentResult::Success(AgentPayload::Resolution(r)) => assert!(r.ruling_note.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_named_in_prefers_two_word_names() {
        let found = named_in("i shoot my light crossbow", |n| StandardRules.weapon(n));
        assert_eq!(found.unwrap().name, "Light Crossbow");
    }
}
