//! Rules and stat-block lookups.
//!
//! Synchronous, deterministic, always available. [`StandardRules`] serves a
//! small built-in table; a host can plug in a full rulebook behind
//! [`RulesLookup`].

use crate::state::{Ability, Skill};
use crate::text::find_word;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponData {
    pub name: String,
    pub damage: String,
    pub damage_type: String,
    pub finesse: bool,
    pub ranged: bool,
}

impl WeaponData {
    pub fn new(name: &str, damage: &str, damage_type: &str) -> Self {
        Self {
            name: name.to_string(),
            damage: damage.to_string(),
            damage_type: damage_type.to_string(),
            finesse: false,
            ranged: false,
        }
    }

    fn finesse(mut self) -> Self {
        self.finesse = true;
        self
    }

    fn ranged(mut self) -> Self {
        self.ranged = true;
        self
    }

    /// Ability used for attack and damage rolls.
    pub fn attack_ability(&self, str_mod: i32, dex_mod: i32) -> Ability {
        if self.ranged || (self.finesse && dex_mod > str_mod) {
            Ability::Dexterity
        } else {
            Ability::Strength
        }
    }
}

/// How a damaging spell lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpellResolution {
    /// Spell attack roll against AC.
    Attack,
    /// Target saves against the caster's DC; half damage on a success.
    Save(Ability),
    /// Always hits.
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellData {
    pub name: String,
    pub level: u8,
    pub damage: String,
    pub damage_type: String,
    pub resolution: SpellResolution,
}

impl SpellData {
    fn new(name: &str, level: u8, damage: &str, damage_type: &str, resolution: SpellResolution) -> Self {
        Self {
            name: name.to_string(),
            level,
            damage: damage.to_string(),
            damage_type: damage_type.to_string(),
            resolution,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterData {
    pub name: String,
    pub hit_points: i32,
    pub armor_class: i32,
    pub attack_bonus: i32,
    pub damage: String,
    pub challenge: String,
}

impl MonsterData {
    fn new(name: &str, hit_points: i32, armor_class: i32, attack_bonus: i32, damage: &str, challenge: &str) -> Self {
        Self {
            name: name.to_string(),
            hit_points,
            armor_class,
            attack_bonus,
            damage: damage.to_string(),
            challenge: challenge.to_string(),
        }
    }
}

/// A short rules reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub topic: String,
    pub keywords: Vec<String>,
    pub text: String,
}

impl RuleEntry {
    fn new(topic: &str, keywords: &[&str], text: &str) -> Self {
        Self {
            topic: topic.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            text: text.to_string(),
        }
    }

    /// Earliest position in `text` (lowercase) where this entry is named.
    fn position_in(&self, text: &str) -> Option<usize> {
        std::iter::once(&self.topic)
            .chain(self.keywords.iter())
            .filter_map(|k| find_word(text, k))
            .min()
    }
}

/// The rules/data lookup collaborator.
pub trait RulesLookup: Send + Sync {
    fn weapon(&self, name: &str) -> Option<WeaponData>;

    fn spell(&self, name: &str) -> Option<SpellData>;

    fn monster(&self, name: &str) -> Option<MonsterData>;

    fn rule(&self, topic: &str) -> Option<RuleEntry>;

    /// The first spell named in `text` (lowercase).
    fn spell_in(&self, text: &str) -> Option<SpellData>;

    /// Rule entries referenced in `text` (lowercase), in order of mention.
    fn rules_in(&self, text: &str) -> Vec<RuleEntry>;

    /// The skill an action description calls for, if any.
    fn skill_for_action(&self, text: &str) -> Option<Skill>;
}

lazy_static::lazy_static! {
    static ref WEAPONS: Vec<WeaponData> = vec![
        WeaponData::new("Dagger", "1d4", "piercing").finesse(),
        WeaponData::new("Club", "1d4", "bludgeoning"),
        WeaponData::new("Handaxe", "1d6", "slashing"),
        WeaponData::new("Mace", "1d6", "bludgeoning"),
        WeaponData::new("Quarterstaff", "1d6", "bludgeoning"),
        WeaponData::new("Spear", "1d6", "piercing"),
        WeaponData::new("Shortsword", "1d6", "piercing").finesse(),
        WeaponData::new("Scimitar", "1d6", "slashing").finesse(),
        WeaponData::new("Rapier", "1d8", "piercing").finesse(),
        WeaponData::new("Longsword", "1d8", "slashing"),
        WeaponData::new("Battleaxe", "1d8", "slashing"),
        WeaponData::new("Warhammer", "1d8", "bludgeoning"),
        WeaponData::new("Greatsword", "2d6", "slashing"),
        WeaponData::new("Greataxe", "1d12", "slashing"),
        WeaponData::new("Shortbow", "1d6", "piercing").ranged(),
        WeaponData::new("Longbow", "1d8", "piercing").ranged(),
        WeaponData::new("Light Crossbow", "1d8", "piercing").ranged(),
        WeaponData::new("Unarmed Strike", "1", "bludgeoning"),
    ];

    static ref SPELLS: Vec<SpellData> = vec![
        SpellData::new("Fire Bolt", 0, "1d10", "fire", SpellResolution::Attack),
        SpellData::new("Ray of Frost", 0, "1d8", "cold", SpellResolution::Attack),
        SpellData::new("Sacred Flame", 0, "1d8", "radiant", SpellResolution::Save(Ability::Dexterity)),
        SpellData::new("Magic Missile", 1, "3d4+3", "force", SpellResolution::Automatic),
        SpellData::new("Guiding Bolt", 1, "4d6", "radiant", SpellResolution::Attack),
        SpellData::new("Thunderwave", 1, "2d8", "thunder", SpellResolution::Save(Ability::Constitution)),
        SpellData::new("Burning Hands", 1, "3d6", "fire", SpellResolution::Save(Ability::Dexterity)),
        SpellData::new("Scorching Ray", 2, "2d6", "fire", SpellResolution::Attack),
        SpellData::new("Fireball", 3, "8d6", "fire", SpellResolution::Save(Ability::Dexterity)),
    ];

    static ref MONSTERS: Vec<MonsterData> = vec![
        MonsterData::new("Goblin", 7, 15, 4, "1d6+2", "1/4"),
        MonsterData::new("Kobold", 5, 12, 4, "1d4+2", "1/8"),
        MonsterData::new("Bandit", 11, 12, 3, "1d6+1", "1/8"),
        MonsterData::new("Wolf", 11, 13, 4, "2d4+2", "1/4"),
        MonsterData::new("Skeleton", 13, 13, 4, "1d6+2", "1/4"),
        MonsterData::new("Zombie", 22, 8, 3, "1d6+1", "1/4"),
        MonsterData::new("Orc", 15, 13, 5, "1d12+3", "1/2"),
        MonsterData::new("Hobgoblin", 11, 18, 3, "1d8+1", "1/2"),
        MonsterData::new("Bugbear", 27, 16, 4, "2d8+2", "1"),
        MonsterData::new("Ogre", 59, 11, 6, "2d8+4", "2"),
    ];

    static ref RULES: Vec<RuleEntry> = vec![
        RuleEntry::new(
            "grapple",
            &["grappling", "grab"],
            "Make an Athletics check contested by the target's Athletics or Acrobatics. On a success the target is grappled; its speed becomes 0.",
        ),
        RuleEntry::new(
            "opportunity attack",
            &["opportunity attacks", "attack of opportunity"],
            "When a hostile creature you can see leaves your reach, you can use your reaction to make one melee attack against it.",
        ),
        RuleEntry::new(
            "advantage",
            &["disadvantage"],
            "Roll two d20s and use the higher (advantage) or lower (disadvantage). Advantage and disadvantage cancel out.",
        ),
        RuleEntry::new(
            "cover",
            &["half cover", "three-quarters cover"],
            "Half cover grants +2 to AC and Dexterity saves; three-quarters cover grants +5; total cover prevents targeting.",
        ),
        RuleEntry::new(
            "death saves",
            &["death save", "death saving throw", "dying"],
            "At 0 hit points roll a d20 each turn: 10 or higher succeeds. Three successes stabilize you, three failures and you die. A natural 20 restores 1 hit point.",
        ),
        RuleEntry::new(
            "short rest",
            &["resting", "long rest", "rest"],
            "A short rest is at least 1 hour; spend hit dice to heal. A long rest is at least 8 hours and restores all hit points and half your hit dice.",
        ),
        RuleEntry::new(
            "concentration",
            &["concentrating"],
            "Taking damage while concentrating requires a Constitution save, DC 10 or half the damage taken, whichever is higher.",
        ),
        RuleEntry::new(
            "critical hit",
            &["critical", "crit"],
            "A natural 20 on an attack roll hits regardless of AC; roll all of the attack's damage dice twice.",
        ),
    ];

    static ref SKILL_SIGNALS: Vec<(&'static str, Skill)> = vec![
        ("sneak", Skill::Stealth),
        ("hide", Skill::Stealth),
        ("stealth", Skill::Stealth),
        ("climb", Skill::Athletics),
        ("jump", Skill::Athletics),
        ("swim", Skill::Athletics),
        ("force", Skill::Athletics),
        ("shove", Skill::Athletics),
        ("break down", Skill::Athletics),
        ("tumble", Skill::Acrobatics),
        ("balance", Skill::Acrobatics),
        ("pick the lock", Skill::SleightOfHand),
        ("pickpocket", Skill::SleightOfHand),
        ("steal", Skill::SleightOfHand),
        ("search", Skill::Investigation),
        ("investigate", Skill::Investigation),
        ("examine", Skill::Investigation),
        ("listen", Skill::Perception),
        ("spot", Skill::Perception),
        ("notice", Skill::Perception),
        ("look around", Skill::Perception),
        ("persuade", Skill::Persuasion),
        ("convince", Skill::Persuasion),
        ("lie", Skill::Deception),
        ("deceive", Skill::Deception),
        ("bluff", Skill::Deception),
        ("intimidate", Skill::Intimidation),
        ("threaten", Skill::Intimidation),
        ("read", Skill::Insight),
        ("sense motive", Skill::Insight),
        ("recall", Skill::History),
        ("decipher", Skill::Arcana),
        ("identify", Skill::Arcana),
        ("track", Skill::Survival),
        ("forage", Skill::Survival),
        ("stabilize", Skill::Medicine),
        ("calm", Skill::AnimalHandling),
        ("pray", Skill::Religion),
        ("perform", Skill::Performance),
    ];
}

/// Built-in tables covering common weapons, spells and monsters.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRules;

impl RulesLookup for StandardRules {
    fn weapon(&self, name: &str) -> Option<WeaponData> {
        WEAPONS
            .iter()
            .find(|w| w.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    fn spell(&self, name: &str) -> Option<SpellData> {
        SPELLS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    fn monster(&self, name: &str) -> Option<MonsterData> {
        MONSTERS
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
    }

    fn rule(&self, topic: &str) -> Option<RuleEntry> {
        let topic = topic.trim().to_lowercase();
        RULES
            .iter()
            .find(|r| r.topic == topic || r.keywords.contains(&topic))
            .cloned()
    }

    fn spell_in(&self, text: &str) -> Option<SpellData> {
        SPELLS
            .iter()
            .filter_map(|s| find_word(text, &s.name.to_lowercase()).map(|at| (at, s)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, s)| s.clone())
    }

    fn rules_in(&self, text: &str) -> Vec<RuleEntry> {
        let mut found: Vec<(usize, &RuleEntry)> = RULES
            .iter()
            .filter_map(|r| r.position_in(text).map(|at| (at, r)))
            .collect();
        found.sort_by_key(|(at, _)| *at);
        found.into_iter().map(|(_, r)| r.clone()).collect()
    }

    fn skill_for_action(&self, text: &str) -> Option<Skill> {
        SKILL_SIGNALS
            .iter()
            .filter_map(|(signal, skill)| find_word(text, signal).map(|at| (at, *skill)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, skill)| skill)
    }
}
