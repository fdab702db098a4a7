//! Dice and damage resolution
//!
//! - Dice notation (e.g., "2d6+3")
//! - Damage types and immunity/resistance/vulnerability relations
//! - A seeded roll engine for d20 rolls, attacks, checks, saves and damage
//! - Seed persistence so a session can resume the same dice

mod damage;
mod dice;
mod rng;
mod roll;
mod seed;

pub use damage::{DamageRelation, DamageType, MitigatedDamage, UnknownDamageType};
pub use dice::{is_critical, is_fumble, DiceError, DiceFormula, MAX_DICE};
pub use rng::DiceRng;
pub use roll::{
    AttackResult, CheckResult, D20Result, DamageResult, DefenseResolver, RollContext, RollEngine,
    SaveResult, DEFAULT_DEFENSE,
};
pub use seed::{FileSeedStore, MemorySeedStore, SeedStatus, SeedStore, SeedStoreError};
