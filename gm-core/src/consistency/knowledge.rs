//! Who knows what.
//!
//! A per-character projection over the fact ledger. Entries reference facts
//! by id and are never the source of truth for the facts themselves.

use super::fact::{Fact, FactId};
use super::store::FactStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// How a character came to know a fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Certainty {
    /// Heard about it second hand.
    Rumor,
    /// Was present when it happened.
    Witnessed,
}

/// One character knowing one fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub character_id: String,
    pub fact_id: FactId,
    pub learned_at_turn: u32,
    pub certainty: Certainty,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("{character} knows {fact}, which is not in the ledger")]
    UnknownFact { character: String, fact: FactId },
}

/// Many-to-many index between characters and facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<KnowledgeEntry>", into = "Vec<KnowledgeEntry>")]
pub struct KnowledgeTracker {
    entries: Vec<KnowledgeEntry>,
    by_character: HashMap<String, HashMap<FactId, usize>>,
}

fn character_key(character: &str) -> String {
    character.trim().to_lowercase()
}

impl KnowledgeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `character` knows `fact`.
    ///
    /// Learning a known fact again is a no-op unless it raises the
    /// certainty. Returns whether anything changed.
    pub fn learn(
        &mut self,
        character: &str,
        fact: FactId,
        turn: u32,
        certainty: Certainty,
    ) -> bool {
        let key = character_key(character);
        if key.is_empty() {
            return false;
        }
        let known = self.by_character.entry(key.clone()).or_default();
        match known.get(&fact) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                if certainty > entry.certainty {
                    entry.certainty = certainty;
                    entry.learned_at_turn = turn;
                    true
                } else {
                    false
                }
            }
            None => {
                known.insert(fact, self.entries.len());
                self.entries.push(KnowledgeEntry {
                    character_id: key,
                    fact_id: fact,
                    learned_at_turn: turn,
                    certainty,
                });
                true
            }
        }
    }

    /// Pass a fact from one character to another as a rumor.
    ///
    /// Does nothing if `from` does not know the fact.
    pub fn share(&mut self, from: &str, to: &str, fact: FactId, turn: u32) -> bool {
        if !self.knows(from, fact) {
            return false;
        }
        self.learn(to, fact, turn, Certainty::Rumor)
    }

    pub fn knows(&self, character: &str, fact: FactId) -> bool {
        self.certainty(character, fact).is_some()
    }

    pub fn certainty(&self, character: &str, fact: FactId) -> Option<Certainty> {
        self.by_character
            .get(&character_key(character))
            .and_then(|known| known.get(&fact))
            .map(|&i| self.entries[i].certainty)
    }

    /// Everything a character knows, in the order they learned it.
    pub fn known_by(&self, character: &str) -> Vec<&KnowledgeEntry> {
        let Some(known) = self.by_character.get(&character_key(character)) else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = known.values().copied().collect();
        positions.sort_unstable();
        positions.into_iter().map(|i| &self.entries[i]).collect()
    }

    /// Characters that know a fact, sorted.
    pub fn who_knows(&self, fact: FactId) -> Vec<&str> {
        let mut who: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.fact_id == fact)
            .map(|e| e.character_id.as_str())
            .collect();
        who.sort_unstable();
        who
    }

    /// Current (unsuperseded) facts a character knows, in ledger order.
    pub fn facts_known_by<'a>(&self, character: &str, store: &'a FactStore) -> Vec<&'a Fact> {
        let mut ids: Vec<FactId> = self.known_by(character).iter().map(|e| e.fact_id).collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| store.get(id))
            .filter(|f| f.is_current())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry must point at a fact that exists in `store`.
    pub fn verify(&self, store: &FactStore) -> Result<(), KnowledgeError> {
        match self.entries.iter().find(|e| store.get(e.fact_id).is_none()) {
            Some(entry) => Err(KnowledgeError::UnknownFact {
                character: entry.character_id.clone(),
                fact: entry.fact_id,
            }),
            None => Ok(()),
        }
    }
}

impl From<Vec<KnowledgeEntry>> for KnowledgeTracker {
    fn from(entries: Vec<KnowledgeEntry>) -> Self {
        let mut tracker = Self::new();
        for entry in entries {
            tracker.learn(
                &entry.character_id,
                entry.fact_id,
                entry.learned_at_turn,
                entry.certainty,
            );
        }
        tracker
    }
}

impl From<KnowledgeTracker> for Vec<KnowledgeEntry> {
    fn from(tracker: KnowledgeTracker) -> Self {
        tracker.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consistency::fact::{FactCandidate, FactOrigin};
    use crate::consistency::proposition::Lexicon;

    fn store_with(statements: &[&str]) -> FactStore {
        let lexicon = Lexicon::standard();
        let mut store = FactStore::new();
        for (turn, s) in statements.iter().enumerate() {
            let candidate =
                FactCandidate::new(*s, lexicon.parse(s), Vec::new(), FactOrigin::Narration);
            store.record(candidate, turn as u32 + 1);
        }
        store
    }

    #[test]
    fn test_learn_is_idempotent() {
        let mut tracker = KnowledgeTracker::new();
        assert!(tracker.learn("Aldric", FactId(0), 3, Certainty::Witnessed));
        assert!(!tracker.learn("aldric", FactId(0), 4, Certainty::Witnessed));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.knows("ALDRIC", FactId(0)));
        assert!(!tracker.knows("Mira", FactId(0)));
        assert!(!tracker.learn("  ", FactId(0), 1, Certainty::Rumor));
    }

    #[test]
    fn test_certainty_only_rises() {
        let mut tracker = KnowledgeTracker::new();
        tracker.learn("mira", FactId(2), 1, Certainty::Rumor);
        assert!(tracker.learn("mira", FactId(2), 5, Certainty::Witnessed));
        assert_eq!(tracker.certainty("mira", FactId(2)), Some(Certainty::Witnessed));
        assert!(!tracker.learn("mira", FactId(2), 6, Certainty::Rumor));
        assert_eq!(tracker.known_by("mira")[0].learned_at_turn, 5);
    }

    #[test]
    fn test_share_passes_rumor() {
        let mut tracker = KnowledgeTracker::new();
        tracker.learn("aldric", FactId(0), 3, Certainty::Witnessed);

        assert!(!tracker.share("mira", "brother tuck", FactId(0), 4));
        assert!(tracker.share("aldric", "mira", FactId(0), 4));
        assert_eq!(tracker.certainty("mira", FactId(0)), Some(Certainty::Rumor));
        assert_eq!(tracker.who_knows(FactId(0)), vec!["aldric", "mira"]);

        // Sharing back never downgrades a witness.
        assert!(!tracker.share("mira", "aldric", FactId(0), 5));
        assert_eq!(tracker.certainty("aldric", FactId(0)), Some(Certainty::Witnessed));
    }

    #[test]
    fn test_facts_known_by_skips_superseded() {
        let store = store_with(&["the letter is sealed", "the letter is unsealed"]);
        let mut tracker = KnowledgeTracker::new();
        tracker.learn("aldric", FactId(1), 9, Certainty::Witnessed);
        tracker.learn("aldric", FactId(0), 3, Certainty::Witnessed);

        let known = tracker.facts_known_by("aldric", &store);
        assert_eq!(known.len(), 1);
        assert_eq!(known[0].statement, "the letter is unsealed");
        assert_eq!(tracker.known_by("aldric").len(), 2);
    }

    #[test]
    fn test_verify_against_store() {
        let store = store_with(&["the gate is open"]);
        let mut tracker = KnowledgeTracker::new();
        tracker.learn("aldric", FactId(0), 1, Certainty::Witnessed);
        assert!(tracker.verify(&store).is_ok());

        tracker.learn("mira", FactId(4), 1, Certainty::Rumor);
        assert_eq!(
            tracker.verify(&store),
            Err(KnowledgeError::UnknownFact {
                character: "mira".to_string(),
                fact: FactId(4)
            })
        );
    }

    #[test]
    fn test_serde_roundtrip_rebuilds_index() {
        let mut tracker = KnowledgeTracker::new();
        tracker.learn("aldric", FactId(0), 1, Certainty::Witnessed);
        tracker.learn("mira", FactId(0), 2, Certainty::Rumor);

        let json = serde_json::to_string(&tracker).unwrap();
        let loaded: KnowledgeTracker = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.certainty("mira", FactId(0)), Some(Certainty::Rumor));
    }
}
