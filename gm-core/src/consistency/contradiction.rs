//! Textual contradiction detection.
//!
//! Two facts are only compared when they share a subject. Among those, a
//! contradiction is a direct negation of the same predicate slot as read by
//! the [`Lexicon`]; elaborations and unrelated predicates never conflict.

use super::fact::{FactCandidate, FactId, FactOrigin};
use super::proposition::Lexicon;
use super::store::FactStore;
use crate::text::{contains_word, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A candidate fact negating a current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contradiction {
    pub existing: FactId,
    pub existing_turn: u32,
    pub subject: String,
    pub existing_statement: String,
    pub candidate_statement: String,
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" contradicts {} \"{}\" (turn {})",
            self.candidate_statement, self.existing, self.existing_statement, self.existing_turn
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContradictionDetector {
    lexicon: Lexicon,
}

impl ContradictionDetector {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Build a candidate from a sentence, tagging any known entities it
    /// mentions as extra subjects.
    pub fn candidate(
        &self,
        statement: &str,
        known_entities: &[String],
        origin: FactOrigin,
    ) -> FactCandidate {
        let statement = normalize(statement)
            .trim_end_matches(['.', '!'])
            .to_string();
        let proposition = self.lexicon.parse(&statement);
        let mentioned: Vec<String> = known_entities
            .iter()
            .map(|e| e.to_lowercase())
            .filter(|e| contains_word(&statement, e))
            .collect();
        FactCandidate::new(statement, proposition, mentioned, origin)
    }

    /// Current facts the candidate directly negates.
    pub fn check(&self, candidate: &FactCandidate, store: &FactStore) -> Vec<Contradiction> {
        let Some(ref proposition) = candidate.proposition else {
            return Vec::new();
        };

        store
            .current_touching(&candidate.subjects)
            .into_iter()
            .filter(|fact| {
                fact.proposition
                    .as_ref()
                    .is_some_and(|p| p.contradicts(proposition))
            })
            .map(|fact| Contradiction {
                existing: fact.id,
                existing_turn: fact.source_turn,
                subject: proposition.subject.clone(),
                existing_statement: fact.statement.clone(),
                candidate_statement: candidate.statement.clone(),
            })
            .collect()
    }
}
