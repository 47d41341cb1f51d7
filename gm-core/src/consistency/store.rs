//! The fact ledger.
//!
//! Facts are only ever appended. Recording a fact whose proposition has the
//! same subject and predicate slot as a current fact marks the older one
//! `superseded_by` the newer; nothing is removed.

use super::fact::{Fact, FactCandidate, FactId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Integrity problems found when verifying or loading a ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("fact at position {position} carries id {found}")]
    NonDenseId { position: usize, found: FactId },

    #[error("{fact} is superseded by missing {target}")]
    DanglingSupersession { fact: FactId, target: FactId },

    #[error("{fact} is superseded by earlier {target}")]
    BackwardSupersession { fact: FactId, target: FactId },
}

/// Outcome of recording one fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFact {
    pub id: FactId,
    /// Facts this one superseded.
    pub superseded: Vec<FactId>,
}

/// Append-only store of established facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Fact>", into = "Vec<Fact>")]
pub struct FactStore {
    facts: Vec<Fact>,
    /// Subject → ledger positions, rebuilt on load.
    subject_index: HashMap<String, Vec<usize>>,
}

impl FactStore {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from its facts, verifying it first.
    pub fn from_facts(facts: Vec<Fact>) -> Result<Self, LedgerError> {
        let mut store = Self {
            facts,
            subject_index: HashMap::new(),
        };
        store.verify()?;
        for position in 0..store.facts.len() {
            store.index(position);
        }
        Ok(store)
    }

    /// Append a fact, superseding any current fact with the same subject
    /// and predicate slot.
    pub fn record(&mut self, candidate: FactCandidate, turn: u32) -> RecordedFact {
        let id = FactId(self.facts.len() as u64);
        let mut superseded = Vec::new();

        if let Some(ref prop) = candidate.proposition {
            let positions = self
                .subject_index
                .get(&prop.subject)
                .cloned()
                .unwrap_or_default();
            for position in positions {
                let older = &mut self.facts[position];
                let same_slot = older
                    .proposition
                    .as_ref()
                    .is_some_and(|p| p.same_slot(prop));
                if older.is_current() && same_slot {
                    older.superseded_by = Some(id);
                    superseded.push(older.id);
                }
            }
        }

        self.facts.push(Fact::from_candidate(id, candidate, turn));
        self.index(self.facts.len() - 1);

        RecordedFact { id, superseded }
    }

    fn index(&mut self, position: usize) {
        for subject in &self.facts[position].subjects {
            let entry = self.subject_index.entry(subject.clone()).or_default();
            if !entry.contains(&position) {
                entry.push(position);
            }
        }
    }

    /// Get a fact by id, superseded or not.
    pub fn get(&self, id: FactId) -> Option<&Fact> {
        usize::try_from(id.0).ok().and_then(|i| self.facts.get(i))
    }

    /// Total number of facts ever recorded.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Every fact in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }

    /// Facts that have not been superseded.
    pub fn current(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter().filter(|f| f.is_current())
    }

    /// Number of facts that have not been superseded.
    pub fn current_count(&self) -> usize {
        self.current().count()
    }

    /// Current facts sharing at least one subject with `subjects`.
    pub fn current_touching(&self, subjects: &[String]) -> Vec<&Fact> {
        let mut positions: Vec<usize> = subjects
            .iter()
            .filter_map(|s| self.subject_index.get(s))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
            .into_iter()
            .map(|i| &self.facts[i])
            .filter(|f| f.is_current())
            .collect()
    }

    /// Current facts about one subject.
    pub fn facts_about(&self, subject: &str) -> Vec<&Fact> {
        self.history(subject)
            .into_iter()
            .filter(|f| f.is_current())
            .collect()
    }

    /// Every fact ever recorded about a subject, superseded ones included.
    pub fn history(&self, subject: &str) -> Vec<&Fact> {
        self.subject_index
            .get(&subject.to_lowercase())
            .map(|positions| positions.iter().map(|&i| &self.facts[i]).collect())
            .unwrap_or_default()
    }

    /// Follow `superseded_by` links from `id` to the current fact.
    pub fn supersession_chain(&self, id: FactId) -> Vec<FactId> {
        let mut chain = Vec::new();
        let mut next = self.get(id);
        while let Some(fact) = next {
            chain.push(fact.id);
            next = fact.superseded_by.and_then(|s| self.get(s));
        }
        chain
    }

    /// Check ids are dense ledger positions and supersession points forward.
    pub fn verify(&self) -> Result<(), LedgerError> {
        for (position, fact) in self.facts.iter().enumerate() {
            if fact.id != FactId(position as u64) {
                return Err(LedgerError::NonDenseId {
                    position,
                    found: fact.id,
                });
            }
            if let Some(target) = fact.superseded_by {
                if target.0 >= self.facts.len() as u64 {
                    return Err(LedgerError::DanglingSupersession {
                        fact: fact.id,
                        target,
                    });
                }
                if target <= fact.id {
                    return Err(LedgerError::BackwardSupersession {
                        fact: fact.id,
                        target,
                    });
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<Fact>> for FactStore {
    type Error = LedgerError;

    fn try_from(facts: Vec<Fact>) -> Result<Self, Self::Error> {
        Self::from_facts(facts)
    }
}

impl From<FactStore> for Vec<Fact> {
    fn from(store: FactStore) -> Self {
        store.facts
    }
}
