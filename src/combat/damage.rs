//! Damage types and damage relations
//!
//! `DamageType` names the common damage types. Store keys spell them by
//! their canonical name, so an alias such as "ice" lands in the same
//! bucket as "cold"; names outside this set pass through unchanged. A
//! `DamageRelation` is the resolved immunity/resistance/vulnerability tier
//! for one type.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A damage type name that matches no known type or alias
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown damage type: {0}")]
pub struct UnknownDamageType(pub String);

/// Common damage types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Slashing,
    Piercing,
    Bludgeoning,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Necrotic,
    Radiant,
    Psychic,
    Force,
    Thunder,
}

impl DamageType {
    /// Get all damage types
    pub fn all() -> &'static [DamageType] {
        &[
            DamageType::Slashing,
            DamageType::Piercing,
            DamageType::Bludgeoning,
            DamageType::Fire,
            DamageType::Cold,
            DamageType::Lightning,
            DamageType::Acid,
            DamageType::Poison,
            DamageType::Necrotic,
            DamageType::Radiant,
            DamageType::Psychic,
            DamageType::Force,
            DamageType::Thunder,
        ]
    }

    /// Key suffix used in `resistance:`/`immunity:`/`vulnerability:` buckets
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageType::Slashing => "slashing",
            DamageType::Piercing => "piercing",
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Acid => "acid",
            DamageType::Poison => "poison",
            DamageType::Necrotic => "necrotic",
            DamageType::Radiant => "radiant",
            DamageType::Psychic => "psychic",
            DamageType::Force => "force",
            DamageType::Thunder => "thunder",
        }
    }
}

impl FromStr for DamageType {
    type Err = UnknownDamageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slashing" => Ok(DamageType::Slashing),
            "piercing" => Ok(DamageType::Piercing),
            "bludgeoning" => Ok(DamageType::Bludgeoning),
            "fire" => Ok(DamageType::Fire),
            "cold" | "ice" => Ok(DamageType::Cold),
            "lightning" | "electric" => Ok(DamageType::Lightning),
            "acid" => Ok(DamageType::Acid),
            "poison" => Ok(DamageType::Poison),
            "necrotic" => Ok(DamageType::Necrotic),
            "radiant" => Ok(DamageType::Radiant),
            "psychic" => Ok(DamageType::Psychic),
            "force" => Ok(DamageType::Force),
            "thunder" | "sonic" => Ok(DamageType::Thunder),
            _ => Err(UnknownDamageType(s.to_string())),
        }
    }
}

impl std::fmt::Display for DamageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for DamageType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Resolved relation between an entity and one damage type
///
/// Ordered by dominance: immunity beats resistance beats vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageRelation {
    /// Takes no damage
    Immune,
    /// Takes half damage (rounded down)
    Resistant,
    /// Takes full damage
    Normal,
    /// Takes double damage
    Vulnerable,
}

impl DamageRelation {
    /// Apply this relation to a damage amount
    pub fn apply(&self, damage: i32) -> i32 {
        match self {
            DamageRelation::Immune => 0,
            DamageRelation::Resistant => damage / 2,
            DamageRelation::Normal => damage,
            DamageRelation::Vulnerable => damage.saturating_mul(2),
        }
    }
}

/// Damage after the target's relation has been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MitigatedDamage {
    /// Damage before the relation
    pub base_damage: i32,
    /// Damage after the relation
    pub final_damage: i32,
    /// Damage type as keyed in the store
    pub damage_type: String,
    /// Relation applied
    pub relation: DamageRelation,
}
