//! Archivist: deterministic lookups against the game state and rules tables.

use super::{AgentError, AgentTask, TurnContext};
use crate::rules::RulesLookup;
use crate::state::CharacterSheet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One looked-up piece of known data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// e.g. "sheet:aldric", "rule:grapple".
    pub topic: String,
    /// One readable sentence.
    pub summary: String,
    pub data: serde_json::Value,
}

impl ArchiveRecord {
    pub fn is_rule(&self) -> bool {
        self.topic.starts_with("rule:")
    }
}

pub struct Archivist {
    rules: Arc<dyn RulesLookup>,
}

impl Archivist {
    pub fn new(rules: Arc<dyn RulesLookup>) -> Self {
        Self { rules }
    }

    pub(super) fn run(&self, task: &AgentTask) -> Result<Vec<ArchiveRecord>, AgentError> {
        self.lookup(&task.input)
    }

    /// Everything known that bears on the player's text, actor first.
    pub fn lookup(&self, ctx: &TurnContext) -> Result<Vec<ArchiveRecord>, AgentError> {
        let snapshot = &ctx.snapshot;
        let text = ctx.lowered_text();
        let mut records = Vec::new();

        let actor = snapshot.player_sheet().ok_or(AgentError::NoActor)?;
        records.push(sheet_record(actor)?);

        if let Some(ref combat) = snapshot.combat {
            let order: Vec<String> = combat
                .order
                .iter()
                .map(|c| format!("{} ({})", c.name, c.initiative))
                .collect();
            let current = combat
                .current()
                .map(|c| format!(", {} to act", c.name))
                .unwrap_or_default();
            records.push(ArchiveRecord {
                topic: "combat".to_string(),
                summary: format!("Round {}{current}. Initiative: {}.", combat.round, order.join(", ")),
                data: serde_json::to_value(combat)?,
            });
        }

        let inventory = snapshot.inventory(&actor.name);
        if !inventory.is_empty() {
            let items: Vec<String> = inventory
                .iter()
                .map(|i| format!("{} x{}", i.name, i.quantity))
                .collect();
            records.push(ArchiveRecord {
                topic: format!("inventory:{}", actor.name.to_lowercase()),
                summary: format!("{} carries {}.", actor.name, items.join(", ")),
                data: serde_json::to_value(inventory)?,
            });
        }

        let mentioned: Vec<&CharacterSheet> = snapshot
            .mentioned_in(&text)
            .into_iter()
            .filter(|s| !s.name.eq_ignore_ascii_case(&actor.name))
            .collect();
        for sheet in &mentioned {
            records.push(sheet_record(sheet)?);
        }

        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let Some(monster) = self.rules.monster(word) else {
                continue;
            };
            let topic = format!("monster:{}", monster.name.to_lowercase());
            if records.iter().any(|r| r.topic == topic) {
                continue;
            }
            records.push(ArchiveRecord {
                topic,
                summary: format!(
                    "{}: AC {}, {} hp, {:+} to hit, {} damage, challenge {}.",
                    monster.name,
                    monster.armor_class,
                    monster.hit_points,
                    monster.attack_bonus,
                    monster.damage,
                    monster.challenge
                ),
                data: serde_json::to_value(&monster)?,
            });
        }

        for rule in self.rules.rules_in(&text) {
            records.push(ArchiveRecord {
                topic: format!("rule:{}", rule.topic),
                summary: rule.text.clone(),
                data: serde_json::to_value(&rule)?,
            });
        }

        let knowers = std::iter::once(actor).chain(mentioned.iter().copied());
        for sheet in knowers {
            let known = ctx.knowledge.facts_known_by(&sheet.name, &ctx.facts);
            if known.is_empty() {
                continue;
            }
            let statements: Vec<&str> = known.iter().map(|f| f.statement.as_str()).collect();
            records.push(ArchiveRecord {
                topic: format!("knowledge:{}", sheet.name.to_lowercase()),
                summary: format!("{} knows that {}.", sheet.name, statements.join("; ")),
                data: serde_json::to_value(&known)?,
            });
        }

        Ok(records)
    }
}

fn sheet_record(sheet: &CharacterSheet) -> Result<ArchiveRecord, AgentError> {
    let conditions = if sheet.conditions.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = sheet.conditions.iter().map(|c| c.name()).collect();
        format!(", {}", names.join(", "))
    };
    Ok(ArchiveRecord {
        topic: format!("sheet:{}", sheet.name.to_lowercase()),
        summary: format!(
            "{}: AC {}, {}/{} hp{conditions}.",
            sheet.name, sheet.armor_class, sheet.hp, sheet.max_hp
        ),
        data: serde_json::to_value(sheet)?,
    })
}
