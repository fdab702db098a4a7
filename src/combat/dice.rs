//! Dice notation
//!
//! Parses notation like "2d6+3", "1d20", "4d6-2" or a bare flat "5".
//! `FromStr` is strict and reports what is wrong; `DiceFormula::lenient`
//! never fails and is what the roll engine uses.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Upper bound on dice rolled for one formula
pub const MAX_DICE: u32 = 10_000;

/// Errors from strict dice parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("empty dice notation")]
    Empty,

    #[error("invalid dice count: {0}")]
    InvalidCount(String),

    #[error("invalid die sides: {0}")]
    InvalidSides(String),

    #[error("invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("too many dice ({0} > {MAX_DICE})")]
    TooManyDice(u32),
}

/// A parsed dice formula: `count` dice of `sides` sides plus `bonus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiceFormula {
    /// Number of dice to roll (0 for a flat amount)
    pub count: u32,
    /// Number of sides per die
    pub sides: u32,
    /// Flat amount added to the sum
    pub bonus: i32,
}

impl DiceFormula {
    /// Create a new formula
    pub fn new(count: u32, sides: u32, bonus: i32) -> Self {
        Self { count, sides, bonus }
    }

    /// A flat amount with no dice
    pub fn flat(bonus: i32) -> Self {
        Self::new(0, 2, bonus)
    }

    /// Parse without failing
    ///
    /// A token without `d` is a flat amount. The count is floored to a
    /// non-negative integer (an empty count means one die) and the sides
    /// to at least 2. Unreadable pieces fall back to zero dice, two sides
    /// and no bonus respectively.
    pub fn lenient(notation: &str) -> Self {
        let notation: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        let Some(d_pos) = notation.find('d') else {
            return Self::flat(lenient_int(&notation).unwrap_or(0.0) as i32);
        };

        let count_str = &notation[..d_pos];
        let count = if count_str.is_empty() {
            1.0
        } else {
            lenient_int(count_str).unwrap_or(0.0)
        };

        let (sides_str, bonus_str) = split_modifier(&notation[d_pos + 1..]);
        let sides = lenient_int(sides_str).unwrap_or(2.0);
        let bonus = bonus_str.and_then(lenient_int).unwrap_or(0.0);

        Self {
            count: count.clamp(0.0, MAX_DICE as f64) as u32,
            sides: sides.clamp(2.0, u32::MAX as f64) as u32,
            bonus: bonus.clamp(i32::MIN as f64, i32::MAX as f64) as i32,
        }
    }

    /// Same formula with the dice count doubled (critical hits)
    pub fn doubled(&self) -> Self {
        Self {
            count: self.count.saturating_mul(2).min(MAX_DICE),
            ..*self
        }
    }

    /// Get the minimum possible result
    pub fn min(&self) -> i64 {
        self.count as i64 + self.bonus as i64
    }

    /// Get the maximum possible result
    pub fn max(&self) -> i64 {
        self.count as i64 * self.sides as i64 + self.bonus as i64
    }

    /// Get the expected average (rounded down)
    pub fn average(&self) -> i64 {
        let avg_per_die = (1.0 + self.sides as f64) / 2.0;
        (self.count as f64 * avg_per_die + self.bonus as f64).floor() as i64
    }
}

impl FromStr for DiceFormula {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation = s.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::Empty);
        }

        let Some(d_pos) = notation.find('d') else {
            let bonus = notation
                .parse()
                .map_err(|_| DiceError::InvalidModifier(notation.clone()))?;
            return Ok(Self::flat(bonus));
        };

        // "d6" means "1d6"
        let count_str = &notation[..d_pos];
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidCount(count_str.to_string()))?
        };
        if count > MAX_DICE {
            return Err(DiceError::TooManyDice(count));
        }

        let (sides_str, modifier_str) = split_modifier(&notation[d_pos + 1..]);
        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidSides(sides_str.to_string()))?;
        if sides < 2 {
            return Err(DiceError::InvalidSides(sides_str.to_string()));
        }

        let bonus: i32 = match modifier_str {
            Some(m) => m
                .parse()
                .map_err(|_| DiceError::InvalidModifier(m.to_string()))?,
            None => 0,
        };

        Ok(Self { count, sides, bonus })
    }
}

impl std::fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.bonus);
        }
        if self.bonus > 0 {
            write!(f, "{}d{}+{}", self.count, self.sides, self.bonus)
        } else if self.bonus < 0 {
            write!(f, "{}d{}{}", self.count, self.sides, self.bonus)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

/// Split "6+3" / "8-2" / "20" into sides and an optional signed modifier
fn split_modifier(rest: &str) -> (&str, Option<&str>) {
    if let Some(plus_pos) = rest.find('+') {
        (&rest[..plus_pos], Some(&rest[plus_pos + 1..]))
    } else if let Some(minus_pos) = rest.rfind('-').filter(|&p| p > 0) {
        // Keep the minus sign with the modifier
        (&rest[..minus_pos], Some(&rest[minus_pos..]))
    } else {
        (rest, None)
    }
}

/// Parse a number and floor it, rejecting NaN
fn lenient_int(s: &str) -> Option<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .map(f64::floor)
}

/// Check if a d20 roll is a natural 20 (critical hit)
pub fn is_critical(roll: u32) -> bool {
    roll == 20
}

/// Check if a d20 roll is a natural 1 (critical fail)
pub fn is_fumble(roll: u32) -> bool {
    roll == 1
}
