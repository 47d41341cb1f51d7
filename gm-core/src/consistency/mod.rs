//! Narrative consistency: the fact ledger, per-character knowledge and
//! contradiction checks.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      Session                              │
//! │                                                           │
//! │  ┌──────────────┐   ┌──────────────────┐                  │
//! │  │ FactStore    │◄──│ KnowledgeTracker │ (character→fact) │
//! │  │ (append-only)│   └──────────────────┘                  │
//! │  └──────▲───────┘                                         │
//! │         │ check before record                             │
//! │  ┌──────┴────────────────┐                                │
//! │  │ ContradictionDetector │ (Lexicon: antonyms, negation)  │
//! │  └───────────────────────┘                                │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the aggregator writes to these; agents get read-only handles.

mod contradiction;
mod fact;
mod knowledge;
mod proposition;
mod store;

pub use contradiction::{Contradiction, ContradictionDetector};
pub use fact::{Fact, FactCandidate, FactId, FactOrigin};
pub use knowledge::{Certainty, KnowledgeEntry, KnowledgeError, KnowledgeTracker};
pub use proposition::{Lexicon, Proposition, STANDARD_ANTONYMS};
pub use store::{FactStore, LedgerError, RecordedFact};
