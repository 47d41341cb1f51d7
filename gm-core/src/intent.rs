//! Intent classification.
//!
//! A pure, synchronous pass over the player's text: weighted keyword and
//! phrase signals score each category, the best score wins. This is the gate
//! that decides which (possibly slow, possibly costly) agents run, so its
//! behavior is pinned down by phrase fixtures in the tests below.

use crate::config::OrchestratorConfig;
use crate::text::{find_word, normalize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the player is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IntentCategory {
    Combat,
    Exploration,
    Social,
    Roleplay,
    Question,
    Rules,
    /// The top two categories scored too close to call.
    Ambiguous,
}

impl IntentCategory {
    /// Categories that signals can score, in tie-break order.
    pub const SCORED: [IntentCategory; 6] = [
        IntentCategory::Combat,
        IntentCategory::Exploration,
        IntentCategory::Social,
        IntentCategory::Roleplay,
        IntentCategory::Question,
        IntentCategory::Rules,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IntentCategory::Combat => "combat",
            IntentCategory::Exploration => "exploration",
            IntentCategory::Social => "social",
            IntentCategory::Roleplay => "roleplay",
            IntentCategory::Question => "question",
            IntentCategory::Rules => "rules",
            IntentCategory::Ambiguous => "ambiguous",
        }
    }

    fn index(&self) -> Option<usize> {
        Self::SCORED.iter().position(|c| c == self)
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One scored category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub category: IntentCategory,
    pub confidence: f32,
    pub score: f32,
}

/// Classification of one player input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub category: IntentCategory,
    pub confidence: f32,
    /// Matched phrases in the order they appear in the text.
    pub matched_signals: Vec<String>,
    /// Runner-up, set only when the intent is ambiguous.
    pub alternative: Option<Candidate>,
    /// Every category that scored, best first.
    pub ranked: Vec<Candidate>,
}

impl Intent {
    /// The best-scoring category, even when the intent is ambiguous.
    pub fn leading(&self) -> Option<&Candidate> {
        self.ranked.first()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.category == IntentCategory::Ambiguous
    }
}

#[derive(Debug, Clone)]
struct Signal {
    phrase: String,
    category: IntentCategory,
    weight: f32,
}

lazy_static::lazy_static! {
    static ref STANDARD_SIGNALS: Vec<(&'static str, IntentCategory, f32)> = {
        use IntentCategory::*;
        vec![
            // Combat
            ("attack", Combat, 1.0),
            ("attacks", Combat, 1.0),
            ("strike", Combat, 0.9),
            ("stab", Combat, 1.0),
            ("slash", Combat, 1.0),
            ("shoot", Combat, 1.0),
            ("swing at", Combat, 1.0),
            ("hit", Combat, 0.7),
            ("fight", Combat, 0.9),
            ("kill", Combat, 0.9),
            ("charge", Combat, 0.7),
            ("punch", Combat, 0.9),
            ("kick", Combat, 0.7),
            ("parry", Combat, 0.8),
            ("initiative", Combat, 1.0),
            ("combat", Combat, 0.8),
            ("cast", Combat, 0.5),
            ("draw my", Combat, 0.6),
            ("sword", Combat, 0.6),
            ("longsword", Combat, 0.6),
            ("shortsword", Combat, 0.6),
            ("axe", Combat, 0.6),
            ("greataxe", Combat, 0.6),
            ("dagger", Combat, 0.6),
            ("bow", Combat, 0.5),
            ("longbow", Combat, 0.5),
            ("crossbow", Combat, 0.5),
            ("goblin", Combat, 0.5),
            ("orc", Combat, 0.5),
            ("bandit", Combat, 0.4),
            ("skeleton", Combat, 0.5),
            ("wolf", Combat, 0.4),
            ("enemy", Combat, 0.5),
            // Exploration
            ("look around", Exploration, 1.0),
            ("explore", Exploration, 1.0),
            ("search", Exploration, 0.9),
            ("examine", Exploration, 0.9),
            ("inspect", Exploration, 0.9),
            ("investigate", Exploration, 0.9),
            ("open", Exploration, 0.6),
            ("enter", Exploration, 0.7),
            ("go to", Exploration, 0.8),
            ("walk", Exploration, 0.6),
            ("climb", Exploration, 0.7),
            ("sneak", Exploration, 0.7),
            ("follow", Exploration, 0.5),
            ("travel", Exploration, 0.8),
            ("listen", Exploration, 0.6),
            ("door", Exploration, 0.4),
            ("room", Exploration, 0.3),
            ("path", Exploration, 0.4),
            ("north", Exploration, 0.5),
            ("south", Exploration, 0.5),
            ("east", Exploration, 0.5),
            ("west", Exploration, 0.5),
            // Social
            ("talk to", Social, 1.0),
            ("speak with", Social, 1.0),
            ("speak to", Social, 1.0),
            ("ask", Social, 0.8),
            ("persuade", Social, 1.0),
            ("convince", Social, 1.0),
            ("intimidate", Social, 1.0),
            ("threaten", Social, 0.9),
            ("bribe", Social, 1.0),
            ("negotiate", Social, 1.0),
            ("barter", Social, 0.9),
            ("haggle", Social, 0.9),
            ("greet", Social, 0.8),
            ("deceive", Social, 0.9),
            ("lie to", Social, 0.9),
            ("i say", Social, 0.7),
            ("innkeeper", Social, 0.5),
            ("merchant", Social, 0.5),
            // Roleplay
            ("i smile", Roleplay, 0.8),
            ("smile", Roleplay, 0.6),
            ("laugh", Roleplay, 0.7),
            ("sigh", Roleplay, 0.7),
            ("nod", Roleplay, 0.6),
            ("pray", Roleplay, 0.7),
            ("sing", Roleplay, 0.7),
            ("dance", Roleplay, 0.7),
            ("i think about", Roleplay, 0.9),
            ("i remember", Roleplay, 0.8),
            ("i feel", Roleplay, 0.8),
            ("i sit", Roleplay, 0.6),
            ("i wait", Roleplay, 0.6),
            ("i whisper", Roleplay, 0.7),
            ("my character", Roleplay, 0.6),
            ("drink", Roleplay, 0.5),
            // Question
            ("what", Question, 0.4),
            ("where", Question, 0.5),
            ("who", Question, 0.4),
            ("why", Question, 0.5),
            ("what is", Question, 0.5),
            ("who is", Question, 0.7),
            ("tell me about", Question, 1.0),
            ("what do i know", Question, 1.2),
            ("do i know", Question, 0.9),
            ("do i remember", Question, 0.9),
            ("history of", Question, 0.8),
            ("lore", Question, 0.8),
            ("legend", Question, 0.6),
            // Rules
            ("rule", Rules, 1.0),
            ("rules", Rules, 1.0),
            ("how does", Rules, 0.7),
            ("how do", Rules, 0.5),
            ("can i", Rules, 0.4),
            ("modifier", Rules, 0.9),
            ("armor class", Rules, 0.8),
            ("my armor class", Rules, 1.5),
            ("hit points", Rules, 0.7),
            ("spell slots", Rules, 0.9),
            ("saving throw", Rules, 0.8),
            ("grapple", Rules, 0.6),
            ("grappling", Rules, 0.6),
            ("opportunity attack", Rules, 1.0),
            ("opportunity attacks", Rules, 1.0),
            ("advantage", Rules, 0.7),
            ("proficiency", Rules, 0.9),
            ("my stats", Rules, 1.0),
            ("character sheet", Rules, 1.0),
            ("inventory", Rules, 0.9),
            ("dc", Rules, 0.7),
            ("concentration", Rules, 0.7),
            ("death saves", Rules, 0.9),
            ("ooc", Rules, 1.5),
        ]
    };
}

/// Weight of a trailing question mark toward [`IntentCategory::Question`].
const QUESTION_MARK_WEIGHT: f32 = 0.4;

/// Weighted phrase classifier.
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    signals: Vec<Signal>,
    ambiguity_threshold: f32,
    saturation: f32,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        let config = OrchestratorConfig::default();
        Self::new(config.ambiguity_threshold, config.confidence_saturation)
    }
}

impl IntentClassifier {
    /// Standard signal table with the given thresholds.
    pub fn new(ambiguity_threshold: f32, saturation: f32) -> Self {
        Self {
            signals: STANDARD_SIGNALS
                .iter()
                .map(|(phrase, category, weight)| Signal {
                    phrase: phrase.to_string(),
                    category: *category,
                    weight: *weight,
                })
                .collect(),
            ambiguity_threshold,
            saturation,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.ambiguity_threshold, config.confidence_saturation)
    }

    /// Add (or reweight) a phrase signal.
    pub fn with_signal(mut self, phrase: &str, category: IntentCategory, weight: f32) -> Self {
        let phrase = normalize(phrase);
        self.signals.retain(|s| s.phrase != phrase);
        if category != IntentCategory::Ambiguous && !phrase.is_empty() {
            self.signals.push(Signal {
                phrase,
                category,
                weight,
            });
        }
        self
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Classify one player input. Never fails.
    pub fn classify(&self, text: &str) -> Intent {
        let lowered = normalize(text);

        // Longest phrases claim their span first; shorter overlapping
        // signals ("attack" inside "opportunity attack") are dropped.
        let mut hits: Vec<(usize, usize, &Signal)> = self
            .signals
            .iter()
            .filter_map(|s| find_word(&lowered, &s.phrase).map(|at| (at, at + s.phrase.len(), s)))
            .collect();
        hits.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));

        let mut accepted: Vec<(usize, usize, &Signal)> = Vec::new();
        for hit in hits {
            if accepted.iter().all(|a| hit.1 <= a.0 || hit.0 >= a.1) {
                accepted.push(hit);
            }
        }
        accepted.sort_by_key(|hit| hit.0);

        let mut scores = [0.0f32; IntentCategory::SCORED.len()];
        let mut matched_signals = Vec::with_capacity(accepted.len() + 1);
        for (_, _, signal) in &accepted {
            if let Some(i) = signal.category.index() {
                scores[i] += signal.weight;
            }
            matched_signals.push(signal.phrase.clone());
        }
        if lowered.ends_with('?') {
            if let Some(i) = IntentCategory::Question.index() {
                scores[i] += QUESTION_MARK_WEIGHT;
            }
            matched_signals.push("?".to_string());
        }

        let total: f32 = scores.iter().sum();
        if total <= 0.0 {
            return Intent {
                category: IntentCategory::Roleplay,
                confidence: 0.0,
                matched_signals,
                alternative: None,
                ranked: Vec::new(),
            };
        }

        let mut ranked: Vec<Candidate> = IntentCategory::SCORED
            .iter()
            .zip(scores)
            .filter(|(_, score)| *score > 0.0)
            .map(|(category, score)| Candidate {
                category: *category,
                confidence: (score / total) * (score / self.saturation).min(1.0),
                score,
            })
            .collect();
        // Stable: equal scores keep category order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let top = &ranked[0];
        let runner_up = ranked.get(1);
        let gap = runner_up.map_or(1.0, |second| (top.score - second.score) / total);

        if runner_up.is_some() && gap < self.ambiguity_threshold {
            Intent {
                category: IntentCategory::Ambiguous,
                confidence: top.confidence,
                matched_signals,
                alternative: runner_up.cloned(),
                ranked,
            }
        } else {
            Intent {
                category: top.category,
                confidence: top.confidence,
                matched_signals,
                alternative: None,
                ranked,
            }
        }
    }
}
