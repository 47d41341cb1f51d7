//! Established narrative facts.

use super::proposition::Proposition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a fact: its position in the append-only ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactId(pub u64);

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fact#{}", self.0)
    }
}

/// Where a fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactOrigin {
    /// Asserted by narrator prose.
    Narration,
    /// Derived from a mechanical resolution (dice, state changes).
    Mechanics,
    /// Seeded from lore or world building before play.
    Lore,
}

impl FactOrigin {
    /// Default confidence for facts of this origin.
    pub fn default_confidence(&self) -> f32 {
        match self {
            FactOrigin::Mechanics => 1.0,
            FactOrigin::Lore => 0.9,
            FactOrigin::Narration => 0.7,
        }
    }
}

/// A fact that has not been recorded yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCandidate {
    pub statement: String,
    pub subjects: Vec<String>,
    pub proposition: Option<Proposition>,
    pub confidence: f32,
    pub origin: FactOrigin,
}

impl FactCandidate {
    /// Build a candidate; subjects are lowercased and deduplicated, and the
    /// proposition's own subject is always among them.
    pub fn new(
        statement: impl Into<String>,
        proposition: Option<Proposition>,
        subjects: impl IntoIterator<Item = String>,
        origin: FactOrigin,
    ) -> Self {
        let mut all: Vec<String> = Vec::new();
        let own = proposition.as_ref().map(|p| p.subject.clone());
        for subject in own.into_iter().chain(subjects) {
            let subject = subject.trim().to_lowercase();
            if !subject.is_empty() && !all.contains(&subject) {
                all.push(subject);
            }
        }
        Self {
            statement: statement.into(),
            subjects: all,
            proposition,
            confidence: origin.default_confidence(),
            origin,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Whether this candidate shares at least one subject with `subjects`.
    pub fn shares_subject(&self, subjects: &[String]) -> bool {
        self.subjects.iter().any(|s| subjects.contains(s))
    }
}

/// A single established truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    /// Normalized proposition text, e.g. "the letter is sealed".
    pub statement: String,
    /// Entities involved, lowercased.
    pub subjects: Vec<String>,
    pub proposition: Option<Proposition>,
    pub source_turn: u32,
    pub recorded_at: DateTime<Utc>,
    pub confidence: f32,
    pub origin: FactOrigin,
    pub superseded_by: Option<FactId>,
}

impl Fact {
    pub(crate) fn from_candidate(id: FactId, candidate: FactCandidate, turn: u32) -> Self {
        Self {
            id,
            statement: candidate.statement,
            subjects: candidate.subjects,
            proposition: candidate.proposition,
            source_turn: turn,
            recorded_at: Utc::now(),
            confidence: candidate.confidence,
            origin: candidate.origin,
            superseded_by: None,
        }
    }

    /// Still the latest word on its subject and predicate.
    pub fn is_current(&self) -> bool {
        self.superseded_by.is_none()
    }

    /// Check if this fact involves the given subject.
    pub fn involves(&self, subject: &str) -> bool {
        self.subjects.iter().any(|s| s == subject)
    }
}
