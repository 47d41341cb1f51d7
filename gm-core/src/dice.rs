//! Dice notation and rolling.
//!
//! Supports `XdY+Z` expressions with several dice terms, keep highest /
//! keep lowest (`4d6kh3`), and advantage/disadvantage on a single d20.
//! Rolls always take an explicit RNG so mechanical resolution can be
//! replayed from a seed.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
    #[error("Cannot keep {keep} dice when only rolling {count} (in {notation})")]
    InvalidKeepCount {
        keep: u32,
        count: u32,
        notation: String,
    },
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (a, b) if a == b => a,
            _ => Advantage::Normal,
        }
    }
}

/// Standard die sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Which dice of a term count toward its subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keep {
    All,
    Highest(u32),
    Lowest(u32),
}

/// One `NdS` term of an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    pub count: u32,
    pub die: DieType,
    pub keep: Keep,
    /// Subtracted instead of added (`1d20-1d4`).
    pub negative: bool,
}

/// A parsed dice expression such as `2d6+1d4+3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub terms: Vec<DiceTerm>,
    pub modifier: i32,
    pub notation: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let compact: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if compact.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut terms = Vec::new();
        let mut modifier = 0i32;

        for (negative, chunk) in signed_chunks(&compact) {
            if chunk.is_empty() {
                return Err(DiceError::InvalidNotation(compact.clone()));
            }
            match chunk.split_once('d') {
                Some((count, rest)) => {
                    terms.push(parse_term(chunk, count, rest, negative)?);
                }
                None => {
                    let value: i32 = chunk
                        .parse()
                        .map_err(|_| DiceError::InvalidNotation(chunk.to_string()))?;
                    modifier += if negative { -value } else { value };
                }
            }
        }

        if terms.is_empty() && modifier == 0 {
            return Err(DiceError::NoDice);
        }

        Ok(Self {
            terms,
            modifier,
            notation: compact,
        })
    }

    /// Build a single-d20 expression with a flat modifier.
    pub fn d20(modifier: i32) -> Self {
        Self {
            terms: vec![DiceTerm {
                count: 1,
                die: DieType::D20,
                keep: Keep::All,
                negative: false,
            }],
            modifier,
            notation: format_d20(modifier),
        }
    }

    /// Copy of this expression with every die count doubled (critical hits).
    pub fn doubled_dice(&self) -> Self {
        let mut doubled = self.clone();
        for term in &mut doubled.terms {
            term.count *= 2;
        }
        doubled.notation = format!("{} (crit)", self.notation);
        doubled
    }

    /// Add a flat modifier to the expression.
    pub fn plus(mut self, bonus: i32) -> Self {
        if bonus != 0 {
            self.modifier += bonus;
            self.notation = if bonus > 0 {
                format!("{}+{bonus}", self.notation)
            } else {
                format!("{}{bonus}", self.notation)
            };
        }
        self
    }

    /// Roll with the given RNG.
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> RollResult {
        let mut components = Vec::with_capacity(self.terms.len());

        for term in &self.terms {
            let rolls: Vec<u32> = (0..term.count)
                .map(|_| rng.gen_range(1..=term.die.sides()))
                .collect();
            let mut kept = rolls.clone();
            match term.keep {
                Keep::All => {}
                Keep::Highest(n) => {
                    kept.sort_unstable_by(|a, b| b.cmp(a));
                    kept.truncate(n as usize);
                }
                Keep::Lowest(n) => {
                    kept.sort_unstable();
                    kept.truncate(n as usize);
                }
            }
            let subtotal = kept.iter().sum::<u32>() as i32;
            components.push(ComponentResult {
                die: term.die,
                rolls,
                kept,
                subtotal: if term.negative { -subtotal } else { subtotal },
            });
        }

        RollResult::from_components(self.clone(), components)
    }

    /// Roll with advantage/disadvantage (only applies to a single d20).
    pub fn roll_with_advantage_rng<R: Rng>(
        &self,
        advantage: Advantage,
        rng: &mut R,
    ) -> RollResult {
        if advantage == Advantage::Normal || !self.is_single_d20() {
            return self.roll_with_rng(rng);
        }

        let first = rng.gen_range(1..=20u32);
        let second = rng.gen_range(1..=20u32);
        let chosen = match advantage {
            Advantage::Advantage => first.max(second),
            _ => first.min(second),
        };

        RollResult::from_components(
            self.clone(),
            vec![ComponentResult {
                die: DieType::D20,
                rolls: vec![first, second],
                kept: vec![chosen],
                subtotal: chosen as i32,
            }],
        )
    }

    fn is_single_d20(&self) -> bool {
        matches!(
            self.terms.as_slice(),
            [DiceTerm {
                count: 1,
                die: DieType::D20,
                negative: false,
                ..
            }]
        )
    }
}

/// Split `2d6+1d4-1` into `(false, "2d6"), (false, "1d4"), (true, "1")`.
fn signed_chunks(compact: &str) -> Vec<(bool, &str)> {
    let mut chunks = Vec::new();
    let mut negative = false;
    let mut start = 0;

    for (i, ch) in compact.char_indices() {
        if ch == '+' || ch == '-' {
            // A leading sign has no chunk before it.
            if i > 0 {
                chunks.push((negative, &compact[start..i]));
            }
            negative = ch == '-';
            start = i + 1;
        }
    }
    chunks.push((negative, &compact[start..]));
    chunks
}

fn parse_term(chunk: &str, count: &str, rest: &str, negative: bool) -> Result<DiceTerm, DiceError> {
    let invalid = || DiceError::InvalidNotation(chunk.to_string());

    let count: u32 = if count.is_empty() {
        1
    } else {
        count.parse().map_err(|_| invalid())?
    };
    if count == 0 {
        return Err(invalid());
    }

    let (sides, keep) = if let Some((sides, n)) = rest.split_once("kh") {
        (sides, Keep::Highest(n.parse().map_err(|_| invalid())?))
    } else if let Some((sides, n)) = rest.split_once("kl") {
        (sides, Keep::Lowest(n.parse().map_err(|_| invalid())?))
    } else {
        (rest, Keep::All)
    };

    let sides: u32 = sides.parse().map_err(|_| invalid())?;
    let die = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

    if let Keep::Highest(keep) | Keep::Lowest(keep) = keep {
        if keep > count {
            return Err(DiceError::InvalidKeepCount {
                keep,
                count,
                notation: chunk.to_string(),
            });
        }
    }

    Ok(DiceTerm {
        count,
        die,
        keep,
        negative,
    })
}

fn format_d20(modifier: i32) -> String {
    match modifier {
        0 => "1d20".to_string(),
        m if m > 0 => format!("1d20+{m}"),
        m => format!("1d20{m}"),
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.notation)
    }
}

/// Result of rolling a single dice term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub die: DieType,
    pub rolls: Vec<u32>,
    pub kept: Vec<u32>,
    pub subtotal: i32,
}

/// Complete result of a dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: DiceExpression,
    pub components: Vec<ComponentResult>,
    pub modifier: i32,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl RollResult {
    fn from_components(expression: DiceExpression, components: Vec<ComponentResult>) -> Self {
        let dice_total: i32 = components.iter().map(|c| c.subtotal).sum();
        // Natural 1/20 only means something on a lone d20.
        let natural = match components.as_slice() {
            [c] if c.die == DieType::D20 && c.kept.len() == 1 => c.kept.first().copied(),
            _ => None,
        };
        Self {
            modifier: expression.modifier,
            total: dice_total + expression.modifier,
            natural_20: natural == Some(20),
            natural_1: natural == Some(1),
            expression,
            components,
        }
    }

    /// The kept face of a lone d20, if this was one.
    pub fn natural(&self) -> Option<u32> {
        match self.components.as_slice() {
            [c] if c.die == DieType::D20 => c.kept.first().copied(),
            _ => None,
        }
    }

    /// Format the individual dice for display, e.g. `[14, (3)] + 5`.
    pub fn dice_display(&self) -> String {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| {
                let mut unkept = c.kept.clone();
                let shown: Vec<String> = c
                    .rolls
                    .iter()
                    .map(|roll| match unkept.iter().position(|k| k == roll) {
                        Some(pos) => {
                            unkept.swap_remove(pos);
                            roll.to_string()
                        }
                        None => format!("({roll})"),
                    })
                    .collect();
                format!("[{}]", shown.join(", "))
            })
            .collect();

        let dice = parts.join(" + ");
        match self.modifier {
            0 => dice,
            m if m > 0 => format!("{dice} + {m}"),
            m => format!("{dice} - {}", m.abs()),
        }
    }

    /// Check if the roll meets or exceeds a DC.
    pub fn meets_dc(&self, dc: i32) -> bool {
        self.total >= dc
    }

    pub fn is_critical(&self) -> bool {
        self.natural_20
    }

    pub fn is_fumble(&self) -> bool {
        self.natural_1
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].count, 1);
        assert_eq!(expr.terms[0].die, DieType::D20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        assert_eq!(DiceExpression::parse("1d20+5").unwrap().modifier, 5);
        assert_eq!(DiceExpression::parse("2d6 - 2").unwrap().modifier, -2);
        assert_eq!(DiceExpression::parse("d8").unwrap().terms[0].count, 1);
    }

    #[test]
    fn test_parse_multiple_terms() {
        let expr = DiceExpression::parse("2d6+1d4+3").unwrap();
        assert_eq!(expr.terms.len(), 2);
        assert_eq!(expr.modifier, 3);

        let expr = DiceExpression::parse("1d20-1d4").unwrap();
        assert!(expr.terms[1].negative);
    }

    #[test]
    fn test_parse_keep() {
        let expr = DiceExpression::parse("4d6kh3").unwrap();
        assert_eq!(expr.terms[0].keep, Keep::Highest(3));

        assert!(matches!(
            DiceExpression::parse("4d6kh5"),
            Err(DiceError::InvalidKeepCount { keep: 5, count: 4, .. })
        ));
        assert!(DiceExpression::parse("2d20kl3").is_err());
        assert!(DiceExpression::parse("4d6kh4").is_ok());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(DiceExpression::parse(""), Err(DiceError::NoDice));
        assert_eq!(DiceExpression::parse("1d7"), Err(DiceError::InvalidDieSize(7)));
        assert!(DiceExpression::parse("1d20++2").is_err());
        assert!(DiceExpression::parse("0d6").is_err());
        assert!(DiceExpression::parse("xd6").is_err());
    }

    #[test]
    fn test_roll_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let expr = DiceExpression::parse("1d20+5").unwrap();
        for _ in 0..200 {
            let result = expr.roll_with_rng(&mut rng);
            assert!((6..=25).contains(&result.total));
        }
    }

    #[test]
    fn test_seeded_rolls_repeat() {
        let expr = DiceExpression::parse("3d6+2").unwrap();
        let a = expr.roll_with_rng(&mut StdRng::seed_from_u64(42));
        let b = expr.roll_with_rng(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_keep_highest_sums_kept_dice() {
        let expr = DiceExpression::parse("4d6kh3").unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let result = expr.roll_with_rng(&mut rng);
            let component = &result.components[0];
            assert_eq!(component.rolls.len(), 4);
            assert_eq!(component.kept.len(), 3);
            let lowest = *component.rolls.iter().min().unwrap() as i32;
            let all: i32 = component.rolls.iter().map(|r| *r as i32).sum();
            assert_eq!(result.total, all - lowest);
        }
    }

    #[test]
    fn test_advantage_keeps_better_die() {
        let expr = DiceExpression::d20(2);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let result = expr.roll_with_advantage_rng(Advantage::Advantage, &mut rng);
            let c = &result.components[0];
            assert_eq!(c.rolls.len(), 2);
            assert_eq!(c.kept[0], *c.rolls.iter().max().unwrap());
            assert_eq!(result.total, c.kept[0] as i32 + 2);

            let result = expr.roll_with_advantage_rng(Advantage::Disadvantage, &mut rng);
            let c = &result.components[0];
            assert_eq!(c.kept[0], *c.rolls.iter().min().unwrap());
        }
    }

    #[test]
    fn test_advantage_combine() {
        assert_eq!(
            Advantage::Normal.combine(Advantage::Advantage),
            Advantage::Advantage
        );
        assert_eq!(
            Advantage::Advantage.combine(Advantage::Disadvantage),
            Advantage::Normal
        );
        assert_eq!(
            Advantage::Disadvantage.combine(Advantage::Disadvantage),
            Advantage::Disadvantage
        );
    }

    #[test]
    fn test_doubled_dice_and_plus() {
        let expr = DiceExpression::parse("1d8").unwrap().plus(3);
        assert_eq!(expr.modifier, 3);
        assert_eq!(expr.to_string(), "1d8+3");
        let crit = expr.doubled_dice();
        assert_eq!(crit.terms[0].count, 2);
        assert_eq!(crit.modifier, 3);
    }

    #[test]
    fn test_display() {
        let result = RollResult::from_components(
            DiceExpression::d20(5),
            vec![ComponentResult {
                die: DieType::D20,
                rolls: vec![14, 3],
                kept: vec![14],
                subtotal: 14,
            }],
        );
        assert_eq!(result.dice_display(), "[14, (3)] + 5");
        assert_eq!(result.to_string(), "[14, (3)] + 5 = 19");
        assert_eq!(result.natural(), Some(14));
        assert!(result.meets_dc(19));
        assert!(!result.meets_dc(20));
    }
}
