//! Propositions: the `subject is [not] predicate` shape facts are compared by.
//!
//! Parsing is deliberately shallow. A sentence only becomes a proposition
//! when it has a short noun subject, a copula and a short predicate; anything
//! else is left unparsed and never takes part in contradiction checks.

use crate::text::normalize;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    /// Mutually exclusive predicate pairs. The first word names the slot.
    pub static ref STANDARD_ANTONYMS: Vec<(&'static str, &'static str)> = vec![
        ("alive", "dead"),
        ("open", "closed"),
        ("locked", "unlocked"),
        ("sealed", "unsealed"),
        ("armed", "unarmed"),
        ("friendly", "hostile"),
        ("present", "absent"),
        ("awake", "asleep"),
        ("conscious", "unconscious"),
        ("visible", "hidden"),
        ("intact", "broken"),
        ("full", "empty"),
        ("lit", "dark"),
        ("free", "captured"),
        ("innocent", "guilty"),
        ("loyal", "disloyal"),
        ("unharmed", "wounded"),
        ("standing", "prone"),
    ];
}

const COPULAS: &[&str] = &[
    "is", "are", "was", "were", "remains", "remain", "stays", "stay", "lies", "lie",
];
const NEGATED_COPULAS: &[&str] = &["isn't", "aren't", "wasn't", "weren't"];
const ARTICLES: &[&str] = &["the", "a", "an"];
const PRONOUNS: &[&str] = &[
    "it", "he", "she", "they", "you", "i", "we", "there", "this", "that", "what", "who", "which",
    "everything", "nothing", "something", "someone", "everyone",
];
const FILLERS: &[&str] = &[
    "now", "still", "already", "clearly", "firmly", "completely", "very", "quite", "utterly",
    "securely", "fully", "truly", "certainly", "definitely", "indeed", "also", "been", "currently",
];
const CLAUSE_BREAKS: &[&str] = &[
    "and", "but", "while", "as", "when", "because", "so", "though", "until", "before", "after",
    "since", "where", "with",
];
const MAX_SUBJECT_WORDS: usize = 4;
const MAX_PREDICATE_WORDS: usize = 6;

/// A parsed `subject is [not] predicate` claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proposition {
    /// Lowercased subject without leading article ("letter").
    pub subject: String,
    /// Predicate slot; antonyms share one ("sealed" for sealed/unsealed).
    pub slot: String,
    /// Whether the slot holds (`false` for "unsealed" or "not sealed").
    pub holds: bool,
    /// Predicate as written, without negation ("unsealed").
    pub predicate: String,
}

impl Proposition {
    pub fn new(
        subject: impl Into<String>,
        slot: impl Into<String>,
        holds: bool,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            slot: slot.into(),
            holds,
            predicate: predicate.into(),
        }
    }

    /// Same subject and predicate slot: the newer one replaces the older.
    pub fn same_slot(&self, other: &Proposition) -> bool {
        self.subject == other.subject && self.slot == other.slot
    }

    /// Direct negation: same slot, opposite truth value.
    pub fn contradicts(&self, other: &Proposition) -> bool {
        self.same_slot(other) && self.holds != other.holds
    }
}

/// The explicit antonym/negation rule set used to read propositions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pairs: Vec<(String, String)>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::standard()
    }
}

impl Lexicon {
    /// The built-in antonym table.
    pub fn standard() -> Self {
        Self {
            pairs: STANDARD_ANTONYMS
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    /// A lexicon with no antonym pairs (negation and `un-` still apply).
    pub fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Add a mutually exclusive pair; `base` names the shared slot.
    pub fn with_pair(mut self, base: impl Into<String>, opposite: impl Into<String>) -> Self {
        self.pairs
            .push((base.into().to_lowercase(), opposite.into().to_lowercase()));
        self
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Map a predicate head word to `(slot, holds)`.
    fn slot_for(&self, head: &str) -> Option<(String, bool)> {
        for (base, opposite) in &self.pairs {
            if head == base {
                return Some((base.clone(), true));
            }
            if head == opposite {
                return Some((base.clone(), false));
            }
        }
        // "unguarded" negates "guarded".
        if let Some(rest) = head.strip_prefix("un") {
            if rest.len() > 3 && rest.ends_with("ed") {
                return Some((rest.to_string(), false));
            }
        }
        None
    }

    /// Parse a sentence into a proposition, if it has the right shape.
    pub fn parse(&self, statement: &str) -> Option<Proposition> {
        if statement.contains('?') || statement.contains('"') {
            return None;
        }
        let normalized = normalize(statement);
        let words: Vec<&str> = normalized.split(' ').collect();

        let (copula_at, predicate_start, mut negated) = find_copula(&words)?;

        let mut subject_words: Vec<&str> = words[..copula_at]
            .iter()
            .map(|w| trim_word(w))
            .filter(|w| !w.is_empty())
            .collect();
        while subject_words
            .first()
            .is_some_and(|w| ARTICLES.contains(w))
        {
            subject_words.remove(0);
        }
        if subject_words.is_empty()
            || subject_words.len() > MAX_SUBJECT_WORDS
            || (subject_words.len() == 1 && PRONOUNS.contains(&subject_words[0]))
        {
            return None;
        }

        let mut predicate_words = Vec::new();
        let mut rest = words[predicate_start..].iter().peekable();
        while let Some(raw) = rest.next() {
            let word = trim_word(raw);
            if word.is_empty() {
                continue;
            }
            if predicate_words.is_empty() {
                match word {
                    "not" | "never" => {
                        negated = !negated;
                        continue;
                    }
                    "no" if rest.peek().map(|w| trim_word(w)) == Some("longer") => {
                        rest.next();
                        negated = !negated;
                        continue;
                    }
                    w if FILLERS.contains(&w) => continue,
                    _ => {}
                }
            } else if CLAUSE_BREAKS.contains(&word) {
                break;
            }
            predicate_words.push(word);
            if raw.ends_with([',', ';', ':']) {
                break;
            }
        }

        if predicate_words.is_empty() || predicate_words.len() > MAX_PREDICATE_WORDS {
            return None;
        }

        let subject = subject_words.join(" ");
        let predicate = predicate_words.join(" ");
        let (slot, holds) = match self.slot_for(predicate_words[0]) {
            Some((slot, holds)) => (slot, holds),
            None => (predicate.clone(), true),
        };

        Some(Proposition {
            subject,
            slot,
            holds: holds != negated,
            predicate,
        })
    }
}

/// Locate the copula: `(index, first predicate word, negated)`.
fn find_copula(words: &[&str]) -> Option<(usize, usize, bool)> {
    for (i, raw) in words.iter().enumerate().skip(1) {
        let word = trim_word(raw);
        if COPULAS.contains(&word) {
            return Some((i, i + 1, false));
        }
        if NEGATED_COPULAS.contains(&word) {
            return Some((i, i + 1, true));
        }
        if matches!(word, "has" | "have" | "had")
            && words.get(i + 1).map(|w| trim_word(w)) == Some("been")
        {
            return Some((i, i + 2, false));
        }
    }
    None
}

fn trim_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Option<Proposition> {
        Lexicon::standard().parse(s)
    }

    #[test]
    fn test_parse_simple_statement() {
        let p = parse("The letter is sealed.").unwrap();
        assert_eq!(p.subject, "letter");
        assert_eq!(p.slot, "sealed");
        assert!(p.holds);
        assert_eq!(p.predicate, "sealed");
    }

    #[test]
    fn test_antonym_shares_slot() {
        let sealed = parse("the letter is sealed").unwrap();
        let unsealed = parse("The letter is unsealed").unwrap();
        assert_eq!(unsealed.slot, "sealed");
        assert!(!unsealed.holds);
        assert!(sealed.contradicts(&unsealed));

        let dead = parse("The goblin is dead.").unwrap();
        let alive = parse("the goblin is still alive").unwrap();
        assert!(dead.contradicts(&alive));
    }

    #[test]
    fn test_negation_forms() {
        let base = parse("The gate is locked").unwrap();
        for s in [
            "The gate is not locked",
            "The gate isn't locked.",
            "The gate is no longer locked",
            "The gate is unlocked",
        ] {
            let p = parse(s).unwrap();
            assert!(base.contradicts(&p), "{s} should contradict");
        }
        let double = parse("The gate is not unlocked").unwrap();
        assert!(!base.contradicts(&double));
    }

    #[test]
    fn test_un_prefix_rule() {
        let guarded = parse("The bridge is guarded").unwrap();
        let unguarded = parse("The bridge is unguarded").unwrap();
        assert!(guarded.contradicts(&unguarded));
        // "under" is not a negated participle.
        let p = parse("The cat is under the table").unwrap();
        assert_eq!(p.slot, "under the table");
    }

    #[test]
    fn test_elaboration_is_not_contradiction() {
        let tired = parse("The guard is tired").unwrap();
        let elaborated = parse("The guard is tired of waiting").unwrap();
        assert!(!tired.contradicts(&elaborated));
        assert!(!tired.same_slot(&elaborated));

        // Table words key on the head word, so detail does not split the slot.
        let loyal = parse("The guard is loyal").unwrap();
        let detailed = parse("The guard is loyal to the baron").unwrap();
        assert!(loyal.same_slot(&detailed));
        assert!(!loyal.contradicts(&detailed));
    }

    #[test]
    fn test_predicate_stops_at_clause_break() {
        let p = parse("The tavern is quiet, and the fire burns low.").unwrap();
        assert_eq!(p.subject, "tavern");
        assert_eq!(p.predicate, "quiet");

        let p = parse("Aldric was wounded while fleeing").unwrap();
        assert_eq!(p.subject, "aldric");
        assert_eq!(p.slot, "unharmed");
        assert!(!p.holds);
    }

    #[test]
    fn test_has_been() {
        let p = parse("The seal has been broken").unwrap();
        assert_eq!(p.subject, "seal");
        assert_eq!(p.slot, "intact");
        assert!(!p.holds);
    }

    #[test]
    fn test_rejects_unparseable_shapes() {
        assert!(parse("Your blade flashes in the torchlight.").is_none());
        assert!(parse("It is dark").is_none());
        assert!(parse("Is the door open?").is_none());
        assert!(parse("\"The door is open,\" she says.").is_none());
        assert!(parse("is open").is_none());
        assert!(
            parse("The old man with the long grey beard by the fire is asleep").is_none()
        );
    }

    #[test]
    fn test_custom_pair() {
        let lexicon = Lexicon::empty().with_pair("day", "night");
        let a = lexicon.parse("The sky is day").unwrap();
        let b = lexicon.parse("The sky is night").unwrap();
        assert!(a.contradicts(&b));
        assert_eq!(lexicon.pair_count(), 1);
        // Without the pair, "dead" and "alive" are unrelated predicates.
        let a = lexicon.parse("The rat is dead").unwrap();
        let b = lexicon.parse("The rat is alive").unwrap();
        assert!(!a.contradicts(&b));
    }
}
