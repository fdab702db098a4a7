//! rulecore - modifier stacking and deterministic dice for tabletop-style rules
//!
//! Two halves share one vocabulary of keys:
//! - [`ModifierStore`] keeps per-entity, per-key modifier sources and answers
//!   stacked totals, advantage and damage-type queries
//! - [`RollEngine`] resolves d20 rolls, attacks, checks, saves and damage
//!   from one seeded generator, reading bonuses from the store
//!
//! [`Rules`] pairs the two for hosts that want a single handle.

pub mod combat;
pub mod config;
pub mod events;
pub mod modifiers;
pub mod rules;

pub use combat::{
    AttackResult, CheckResult, D20Result, DamageRelation, DamageResult, DamageType, DiceFormula,
    RollContext, RollEngine, SaveResult, SeedStatus, SeedStore, UnknownDamageType,
};
pub use config::{ConfigError, RulesConfig};
pub use events::{Observers, RollEvent, RulesObserver};
pub use modifiers::{
    AdvantageState, ModifierDuration, ModifierSource, ModifierStore, Operation, RawModifier,
};
pub use rules::{Rules, SharedRules};
