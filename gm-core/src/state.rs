//! Game state as seen by the orchestrator.
//!
//! Entity storage belongs to the surrounding system. The core reads a
//! [`GameSnapshot`] at the start of each turn and commits mechanical
//! outcomes back through [`GameStateView::apply_state_changes`].

use crate::text::contains_word;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Abilities and Skills
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(str: u8, dex: u8, con: u8, int: u8, wis: u8, cha: u8) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// Score 8-9 = -1, 10-11 = 0, 12-13 = +1.
    pub fn modifier(&self, ability: Ability) -> i32 {
        (self.get(ability) as i32 - 10).div_euclid(2)
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Athletics,
    Acrobatics,
    SleightOfHand,
    Stealth,
    Arcana,
    History,
    Investigation,
    Nature,
    Religion,
    AnimalHandling,
    Insight,
    Medicine,
    Perception,
    Survival,
    Deception,
    Intimidation,
    Performance,
    Persuasion,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Athletics => "Athletics",
            Skill::Acrobatics => "Acrobatics",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Arcana => "Arcana",
            Skill::History => "History",
            Skill::Investigation => "Investigation",
            Skill::Nature => "Nature",
            Skill::Religion => "Religion",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Insight => "Insight",
            Skill::Medicine => "Medicine",
            Skill::Perception => "Perception",
            Skill::Survival => "Survival",
            Skill::Deception => "Deception",
            Skill::Intimidation => "Intimidation",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Blinded,
    Charmed,
    Frightened,
    Grappled,
    Poisoned,
    Prone,
    Restrained,
    Stunned,
    Unconscious,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Blinded => "blinded",
            Condition::Charmed => "charmed",
            Condition::Frightened => "frightened",
            Condition::Grappled => "grappled",
            Condition::Poisoned => "poisoned",
            Condition::Prone => "prone",
            Condition::Restrained => "restrained",
            Condition::Stunned => "stunned",
            Condition::Unconscious => "unconscious",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Characters, Combat, Inventory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureKind {
    PlayerCharacter,
    Npc,
    Monster,
}

/// The fields of a character sheet the core reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub kind: CreatureKind,
    pub hp: i32,
    pub max_hp: i32,
    pub armor_class: i32,
    pub abilities: AbilityScores,
    pub proficiency_bonus: i32,
    pub skills: Vec<Skill>,
    pub saves: Vec<Ability>,
    pub weapon: Option<String>,
    pub conditions: Vec<Condition>,
    /// Spellcasting ability, if the character casts spells.
    pub spellcasting: Option<Ability>,
}

impl CharacterSheet {
    pub fn new(name: impl Into<String>, kind: CreatureKind, max_hp: i32, armor_class: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            hp: max_hp,
            max_hp,
            armor_class,
            abilities: AbilityScores::default(),
            proficiency_bonus: 2,
            skills: Vec::new(),
            saves: Vec::new(),
            weapon: None,
            conditions: Vec::new(),
            spellcasting: None,
        }
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_proficiency(mut self, bonus: i32) -> Self {
        self.proficiency_bonus = bonus;
        self
    }

    pub fn with_skills(mut self, skills: impl IntoIterator<Item = Skill>) -> Self {
        self.skills.extend(skills);
        self
    }

    pub fn with_saves(mut self, saves: impl IntoIterator<Item = Ability>) -> Self {
        self.saves.extend(saves);
        self
    }

    pub fn with_weapon(mut self, weapon: impl Into<String>) -> Self {
        self.weapon = Some(weapon.into());
        self
    }

    pub fn with_spellcasting(mut self, ability: Ability) -> Self {
        self.spellcasting = Some(ability);
        self
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        self.abilities.modifier(ability)
    }

    pub fn skill_bonus(&self, skill: Skill) -> i32 {
        let proficient = if self.skills.contains(&skill) {
            self.proficiency_bonus
        } else {
            0
        };
        self.modifier(skill.ability()) + proficient
    }

    pub fn save_bonus(&self, ability: Ability) -> i32 {
        let proficient = if self.saves.contains(&ability) {
            self.proficiency_bonus
        } else {
            0
        };
        self.modifier(ability) + proficient
    }

    pub fn spell_attack_bonus(&self) -> Option<i32> {
        self.spellcasting
            .map(|a| self.modifier(a) + self.proficiency_bonus)
    }

    pub fn spell_save_dc(&self) -> Option<i32> {
        self.spellcasting
            .map(|a| 8 + self.modifier(a) + self.proficiency_bonus)
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.contains(&condition)
    }

    pub fn is_down(&self) -> bool {
        self.hp <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub name: String,
    pub initiative: i32,
    pub is_player: bool,
}

impl Combatant {
    pub fn new(name: impl Into<String>, initiative: i32, is_player: bool) -> Self {
        Self {
            name: name.into(),
            initiative,
            is_player,
        }
    }
}

/// Initiative order and round counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTracker {
    pub round: u32,
    pub turn_index: usize,
    pub order: Vec<Combatant>,
}

impl CombatTracker {
    /// Start combat; combatants are sorted by initiative, highest first.
    pub fn new(mut order: Vec<Combatant>) -> Self {
        order.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        Self {
            round: 1,
            turn_index: 0,
            order,
        }
    }

    pub fn current(&self) -> Option<&Combatant> {
        self.order.get(self.turn_index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: u32,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Read-only view of the world at the start of a turn.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub location: String,
    /// Name of the character the player controls.
    pub player: String,
    /// Characters present in the scene (they witness what happens).
    pub present: Vec<String>,
    /// Sheets keyed by lowercased name.
    pub characters: BTreeMap<String, CharacterSheet>,
    pub combat: Option<CombatTracker>,
    /// Inventories keyed by lowercased owner name.
    pub inventories: BTreeMap<String, Vec<InventoryItem>>,
}

impl GameSnapshot {
    pub fn new(location: impl Into<String>, player: CharacterSheet) -> Self {
        let mut snapshot = Self {
            location: location.into(),
            player: player.name.clone(),
            present: vec![player.name.clone()],
            ..Default::default()
        };
        snapshot.characters.insert(player.name.to_lowercase(), player);
        snapshot
    }

    /// Add a character; NPCs and monsters are present, other player
    /// characters too.
    pub fn with_character(mut self, sheet: CharacterSheet) -> Self {
        if !self.present.iter().any(|p| p.eq_ignore_ascii_case(&sheet.name)) {
            self.present.push(sheet.name.clone());
        }
        self.characters.insert(sheet.name.to_lowercase(), sheet);
        self
    }

    pub fn with_combat(mut self, combat: CombatTracker) -> Self {
        self.combat = Some(combat);
        self
    }

    pub fn with_item(mut self, owner: &str, item: InventoryItem) -> Self {
        self.inventories
            .entry(owner.to_lowercase())
            .or_default()
            .push(item);
        self
    }

    pub fn character(&self, name: &str) -> Option<&CharacterSheet> {
        self.characters.get(&name.to_lowercase())
    }

    pub fn player_sheet(&self) -> Option<&CharacterSheet> {
        self.character(&self.player)
    }

    pub fn inventory(&self, owner: &str) -> &[InventoryItem] {
        self.inventories
            .get(&owner.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Characters named in `text`, in sheet order. `text` must be lowercase.
    pub fn mentioned_in(&self, text: &str) -> Vec<&CharacterSheet> {
        self.characters
            .iter()
            .filter(|(key, _)| contains_word(text, key))
            .map(|(_, sheet)| sheet)
            .collect()
    }

    /// Names worth tagging as fact subjects: characters and the location.
    pub fn known_entities(&self) -> Vec<String> {
        let mut entities: Vec<String> = self.characters.keys().cloned().collect();
        if !self.location.is_empty() {
            entities.push(self.location.to_lowercase());
        }
        entities
    }
}

// ============================================================================
// State Changes
// ============================================================================

/// A mechanical change proposed by the Arbiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateChange {
    Damage {
        target: String,
        amount: i32,
        damage_type: String,
    },
    Heal {
        target: String,
        amount: i32,
    },
    AddCondition {
        target: String,
        condition: Condition,
    },
    RemoveCondition {
        target: String,
        condition: Condition,
    },
    RemoveItem {
        owner: String,
        item: String,
        quantity: u32,
    },
}

impl StateChange {
    /// Who the change applies to.
    pub fn target(&self) -> &str {
        match self {
            StateChange::Damage { target, .. }
            | StateChange::Heal { target, .. }
            | StateChange::AddCondition { target, .. }
            | StateChange::RemoveCondition { target, .. } => target,
            StateChange::RemoveItem { owner, .. } => owner,
        }
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateChange::Damage {
                target,
                amount,
                damage_type,
            } => write!(f, "{target} takes {amount} {damage_type} damage"),
            StateChange::Heal { target, amount } => write!(f, "{target} regains {amount} hp"),
            StateChange::AddCondition { target, condition } => {
                write!(f, "{target} is {condition}")
            }
            StateChange::RemoveCondition { target, condition } => {
                write!(f, "{target} is no longer {condition}")
            }
            StateChange::RemoveItem {
                owner,
                item,
                quantity,
            } => write!(f, "{owner} uses {quantity} {item}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateChangeError {
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("amount must be positive, got {0}")]
    InvalidAmount(i32),

    #[error("{owner} has no {item}")]
    UnknownItem { owner: String, item: String },

    #[error("{owner} has only {available} {item}")]
    InsufficientQuantity {
        owner: String,
        item: String,
        available: u32,
    },

    #[error("change rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateReadError {
    #[error("game state unavailable: {0}")]
    Unavailable(String),

    #[error("game state corrupted: {0}")]
    Corrupted(String),
}

/// The external game-state collaborator.
pub trait GameStateView: Send {
    /// A consistent copy of the current state.
    fn snapshot(&self) -> Result<GameSnapshot, StateReadError>;

    /// Apply one change; rejected changes leave the state untouched.
    fn apply_state_change(&mut self, change: &StateChange) -> Result<(), StateChangeError>;

    /// Apply changes in order, one result per change.
    fn apply_state_changes(&mut self, changes: &[StateChange]) -> Vec<Result<(), StateChangeError>> {
        changes
            .iter()
            .map(|change| self.apply_state_change(change))
            .collect()
    }
}

/// A complete in-process [`GameStateView`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryGameState {
    snapshot: GameSnapshot,
}

impl InMemoryGameState {
    pub fn new(snapshot: GameSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn state(&self) -> &GameSnapshot {
        &self.snapshot
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut CharacterSheet, StateChangeError> {
        self.snapshot
            .characters
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| StateChangeError::UnknownTarget(name.to_string()))
    }
}

impl GameStateView for InMemoryGameState {
    fn snapshot(&self) -> Result<GameSnapshot, StateReadError> {
        Ok(self.snapshot.clone())
    }

    fn apply_state_change(&mut self, change: &StateChange) -> Result<(), StateChangeError> {
        match change {
            StateChange::Damage { target, amount, .. } => {
                if *amount <= 0 {
                    return Err(StateChangeError::InvalidAmount(*amount));
                }
                let sheet = self.sheet_mut(target)?;
                sheet.hp = (sheet.hp - amount).max(0);
                if sheet.hp == 0 && !sheet.has_condition(Condition::Unconscious) {
                    sheet.conditions.push(Condition::Unconscious);
                }
            }
            StateChange::Heal { target, amount } => {
                if *amount <= 0 {
                    return Err(StateChangeError::InvalidAmount(*amount));
                }
                let sheet = self.sheet_mut(target)?;
                let was_down = sheet.is_down();
                sheet.hp = (sheet.hp + amount).min(sheet.max_hp);
                if was_down {
                    sheet.conditions.retain(|c| *c != Condition::Unconscious);
                }
            }
            StateChange::AddCondition { target, condition } => {
                let sheet = self.sheet_mut(target)?;
                if !sheet.has_condition(*condition) {
                    sheet.conditions.push(*condition);
                }
            }
            StateChange::RemoveCondition { target, condition } => {
                let sheet = self.sheet_mut(target)?;
                sheet.conditions.retain(|c| c != condition);
            }
            StateChange::RemoveItem {
                owner,
                item,
                quantity,
            } => {
                let items = self
                    .snapshot
                    .inventories
                    .get_mut(&owner.to_lowercase())
                    .ok_or_else(|| StateChangeError::UnknownTarget(owner.clone()))?;
                let idx = items
                    .iter()
                    .position(|i| i.name.eq_ignore_ascii_case(item))
                    .ok_or_else(|| StateChangeError::UnknownItem {
                        owner: owner.clone(),
                        item: item.clone(),
                    })?;
                if items[idx].quantity < *quantity {
                    return Err(StateChangeError::InsufficientQuantity {
                        owner: owner.clone(),
                        item: item.clone(),
                        available: items[idx].quantity,
                    });
                }
                items[idx].quantity -= quantity;
                if items[idx].quantity == 0 {
                    items.remove(idx);
                }
            }
        }
        Ok(())
    }
}
