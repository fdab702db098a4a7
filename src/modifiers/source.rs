//! Modifier sources
//!
//! A source is one named contributor (buff, curse, equipment, condition)
//! to a single `(entity, key)` bucket. The operation carries its own
//! payload so the stacking switch is checked exhaustively.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// What a source does to the key it is filed under
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    /// Flat additive contribution
    Add(f64),
    /// Multiplier applied after all additions
    Multiply(f64),
    /// Floor applied after aggregation
    ClampMin(f64),
    /// Ceiling applied after aggregation (after any floor)
    ClampMax(f64),
    /// One vote for rolling with advantage
    Advantage,
    /// One vote for rolling with disadvantage
    Disadvantage,
    /// Grants resistance to the damage type named by the key
    GrantResistance,
    /// Grants immunity to the damage type named by the key
    GrantImmunity,
    /// Grants vulnerability to the damage type named by the key
    GrantVulnerability,
}

impl Operation {
    /// Short lowercase name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Add(_) => "add",
            Operation::Multiply(_) => "multiply",
            Operation::ClampMin(_) => "clamp_min",
            Operation::ClampMax(_) => "clamp_max",
            Operation::Advantage => "advantage",
            Operation::Disadvantage => "disadvantage",
            Operation::GrantResistance => "grant_resistance",
            Operation::GrantImmunity => "grant_immunity",
            Operation::GrantVulnerability => "grant_vulnerability",
        }
    }

    /// Numeric payload, if this operation has one
    pub fn value(&self) -> Option<f64> {
        match self {
            Operation::Add(v)
            | Operation::Multiply(v)
            | Operation::ClampMin(v)
            | Operation::ClampMax(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this operation feeds numeric aggregation (`total_of`)
    pub fn is_numeric(&self) -> bool {
        self.value().is_some()
    }

    /// A NaN payload cannot take part in aggregation
    pub fn is_well_formed(&self) -> bool {
        self.value().is_none_or(|v| !v.is_nan())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Some(v) => write!(f, "{}({})", self.name(), v),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// How long a source lives
///
/// Once stored, the `Seconds` and `Rounds` payloads hold the remaining
/// countdown and are decremented in place by `ModifierStore::tick`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierDuration {
    /// Lives until removed or the entity is cleared
    #[default]
    Persistent,
    /// Counts down by elapsed seconds on every tick
    Seconds(f64),
    /// Counts down by one on ticks that advance a combat round
    Rounds(i32),
    /// Lives until the scene ends
    SceneScoped,
}

impl ModifierDuration {
    /// Normalize into the countdown representation kept in the store
    ///
    /// Infinite second counts never expire and become `Persistent`.
    /// Negative or NaN counts become zero and expire on the next tick.
    pub fn normalized(self) -> Self {
        match self {
            ModifierDuration::Seconds(s) if s.is_nan() => ModifierDuration::Seconds(0.0),
            ModifierDuration::Seconds(s) if s == f64::INFINITY => ModifierDuration::Persistent,
            ModifierDuration::Seconds(s) => ModifierDuration::Seconds(s.max(0.0)),
            ModifierDuration::Rounds(r) => ModifierDuration::Rounds(r.max(0)),
            other => other,
        }
    }

    /// Whether ticking can ever expire this duration
    pub fn is_timed(&self) -> bool {
        matches!(self, ModifierDuration::Seconds(_) | ModifierDuration::Rounds(_))
    }

    /// Remaining seconds for a seconds-scoped countdown
    pub fn remaining_seconds(&self) -> Option<f64> {
        match self {
            ModifierDuration::Seconds(s) => Some(*s),
            _ => None,
        }
    }

    /// Remaining rounds for a round-scoped countdown
    pub fn remaining_rounds(&self) -> Option<i32> {
        match self {
            ModifierDuration::Rounds(r) => Some(*r),
            _ => None,
        }
    }

    /// Advance the countdown, returning true when it has run out
    ///
    /// The remaining value is pinned at zero on expiry so it is never
    /// observed negative.
    pub(crate) fn advance(&mut self, delta_seconds: f64, advance_round: bool) -> bool {
        match self {
            ModifierDuration::Seconds(remaining) => {
                *remaining -= delta_seconds;
                if *remaining <= 0.0 {
                    *remaining = 0.0;
                    true
                } else {
                    false
                }
            }
            ModifierDuration::Rounds(remaining) => {
                if !advance_round {
                    return false;
                }
                *remaining -= 1;
                if *remaining <= 0 {
                    *remaining = 0;
                    true
                } else {
                    false
                }
            }
            ModifierDuration::Persistent | ModifierDuration::SceneScoped => false,
        }
    }
}

/// Read-only view handed to `AppliesIf` predicates
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    /// Entity being queried
    pub entity: &'a str,
    /// Key being aggregated
    pub key: &'a str,
    /// Active tags/conditions supplied by the caller
    pub tags: &'a [String],
}

impl<'a> QueryContext<'a> {
    pub fn new(entity: &'a str, key: &'a str, tags: &'a [String]) -> Self {
        Self { entity, key, tags }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Conditional-application predicate for a source
#[derive(Clone)]
pub struct AppliesIf(Arc<dyn Fn(&QueryContext<'_>) -> bool + Send + Sync>);

impl AppliesIf {
    pub fn new(predicate: impl Fn(&QueryContext<'_>) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Applies only while the query carries `tag`
    pub fn when_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::new(move |ctx| ctx.has_tag(&tag))
    }

    pub fn holds(&self, ctx: &QueryContext<'_>) -> bool {
        (self.0)(ctx)
    }
}

impl fmt::Debug for AppliesIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppliesIf(..)")
    }
}

/// One contributor to one `(entity, key)` bucket
#[derive(Debug, Clone)]
pub struct ModifierSource {
    /// Unique within its bucket; re-adding an id replaces the entry
    pub id: String,
    /// Operation and payload
    pub operation: Operation,
    /// Provenance/category metadata
    pub tags: BTreeSet<String>,
    /// Lifetime (countdown once stored)
    pub duration: ModifierDuration,
    /// Clamp tie-break priority, higher wins
    pub priority: i32,
    /// Optional predicate; `None` always applies
    pub applies_if: Option<AppliesIf>,
}

impl ModifierSource {
    /// Create a persistent, untagged source with priority 0
    pub fn new(id: impl Into<String>, operation: Operation) -> Self {
        Self {
            id: id.into(),
            operation,
            tags: BTreeSet::new(),
            duration: ModifierDuration::Persistent,
            priority: 0,
            applies_if: None,
        }
    }

    pub fn add(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, Operation::Add(value))
    }

    pub fn multiply(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, Operation::Multiply(value))
    }

    pub fn clamp_min(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, Operation::ClampMin(value))
    }

    pub fn clamp_max(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, Operation::ClampMax(value))
    }

    pub fn advantage(id: impl Into<String>) -> Self {
        Self::new(id, Operation::Advantage)
    }

    pub fn disadvantage(id: impl Into<String>) -> Self {
        Self::new(id, Operation::Disadvantage)
    }

    pub fn resistance(id: impl Into<String>) -> Self {
        Self::new(id, Operation::GrantResistance)
    }

    pub fn immunity(id: impl Into<String>) -> Self {
        Self::new(id, Operation::GrantImmunity)
    }

    pub fn vulnerability(id: impl Into<String>) -> Self {
        Self::new(id, Operation::GrantVulnerability)
    }

    /// Set the lifetime
    pub fn with_duration(mut self, duration: ModifierDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the clamp tie-break priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a provenance tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Attach a conditional-application predicate
    pub fn applies_if(mut self, predicate: AppliesIf) -> Self {
        self.applies_if = Some(predicate);
        self
    }

    /// Whether this source contributes to the given query
    pub fn applies(&self, ctx: &QueryContext<'_>) -> bool {
        self.applies_if.as_ref().is_none_or(|p| p.holds(ctx))
    }

    /// Non-empty id and a usable operation payload
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty() && self.operation.is_well_formed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_normalization() {
        assert_eq!(
            ModifierDuration::Seconds(-3.0).normalized(),
            ModifierDuration::Seconds(0.0)
        );
        assert_eq!(
            ModifierDuration::Seconds(f64::NAN).normalized(),
            ModifierDuration::Seconds(0.0)
        );
        assert_eq!(
            ModifierDuration::Seconds(f64::INFINITY).normalized(),
            ModifierDuration::Persistent
        );
        assert_eq!(ModifierDuration::Rounds(-2).normalized(), ModifierDuration::Rounds(0));
        assert_eq!(
            ModifierDuration::SceneScoped.normalized(),
            ModifierDuration::SceneScoped
        );
    }

    #[test]
    fn test_seconds_countdown() {
        let mut duration = ModifierDuration::Seconds(5.0);
        assert!(!duration.advance(3.0, false));
        assert_eq!(duration.remaining_seconds(), Some(2.0));

        // Overshoot pins at zero
        assert!(duration.advance(3.0, false));
        assert_eq!(duration.remaining_seconds(), Some(0.0));
    }

    #[test]
    fn test_rounds_only_advance_on_round() {
        let mut duration = ModifierDuration::Rounds(2);
        assert!(!duration.advance(10.0, false));
        assert_eq!(duration.remaining_rounds(), Some(2));

        assert!(!duration.advance(0.0, true));
        assert_eq!(duration.remaining_rounds(), Some(1));

        assert!(duration.advance(0.0, true));
        assert_eq!(duration.remaining_rounds(), Some(0));
    }

    #[test]
    fn test_untimed_never_expire() {
        let mut persistent = ModifierDuration::Persistent;
        let mut scene = ModifierDuration::SceneScoped;
        for _ in 0..10 {
            assert!(!persistent.advance(100.0, true));
            assert!(!scene.advance(100.0, true));
        }
        assert!(!persistent.is_timed());
        assert!(ModifierDuration::Rounds(1).is_timed());
    }

    #[test]
    fn test_source_validity() {
        assert!(ModifierSource::add("ring", 1.0).is_valid());
        assert!(!ModifierSource::add("", 1.0).is_valid());
        assert!(!ModifierSource::add("   ", 1.0).is_valid());
        assert!(!ModifierSource::multiply("curse", f64::NAN).is_valid());
        assert!(ModifierSource::immunity("amulet").is_valid());
    }

    #[test]
    fn test_applies_if_predicate() {
        let always = ModifierSource::add("a", 1.0);
        let melee_only = ModifierSource::add("b", 1.0).applies_if(AppliesIf::when_tag("melee"));

        let melee = vec!["melee".to_string()];
        let ranged = vec!["ranged".to_string()];

        let ctx = QueryContext::new("hero", "attack_bonus", &melee);
        assert!(always.applies(&ctx));
        assert!(melee_only.applies(&ctx));

        let ctx = QueryContext::new("hero", "attack_bonus", &ranged);
        assert!(always.applies(&ctx));
        assert!(!melee_only.applies(&ctx));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Add(2.0).to_string(), "add(2)");
        assert_eq!(Operation::GrantImmunity.to_string(), "grant_immunity");
        assert!(Operation::ClampMax(4.0).is_numeric());
        assert!(!Operation::Advantage.is_numeric());
    }
}
