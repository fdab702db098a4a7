//! Rules facade
//!
//! Pairs one modifier store with one roll engine so callers do not have to
//! thread the store into every roll. Neither half is internally
//! synchronized; hosts that share a `Rules` across threads wrap it with
//! [`Rules::shared`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::combat::{
    AttackResult, CheckResult, D20Result, DamageRelation, DamageResult, MitigatedDamage,
    RollContext, RollEngine, SaveResult,
};
use crate::config::RulesConfig;
use crate::events::RulesObserver;
use crate::modifiers::{AdvantageState, ChangedKeys, ModifierSource, ModifierStore};

/// Mutex-guarded rules shared between threads
pub type SharedRules = Arc<Mutex<Rules>>;

/// A modifier store and the roll engine that reads it
#[derive(Debug)]
pub struct Rules {
    pub modifiers: ModifierStore,
    pub rolls: RollEngine,
}

impl Rules {
    pub fn new(rolls: RollEngine) -> Self {
        Self {
            modifiers: ModifierStore::new(),
            rolls,
        }
    }

    /// Build from configuration
    pub fn from_config(config: &RulesConfig) -> Self {
        Self::new(config.roll_engine())
    }

    /// Wrap for shared use; every operation then takes the lock
    pub fn shared(self) -> SharedRules {
        Arc::new(Mutex::new(self))
    }

    /// Register one observer for both modifier changes and rolls
    pub fn subscribe(&mut self, observer: Arc<dyn RulesObserver>) {
        self.modifiers.subscribe(observer.clone());
        self.rolls.subscribe(observer);
    }

    pub fn add(&mut self, entity: &str, key: &str, source: ModifierSource) -> bool {
        self.modifiers.add(entity, key, source)
    }

    pub fn remove(&mut self, entity: &str, key: &str, source_id: &str) -> bool {
        self.modifiers.remove(entity, key, source_id)
    }

    pub fn total_of(&self, entity: &str, key: &str, default: f64) -> f64 {
        self.modifiers.total_of(entity, key, default)
    }

    pub fn advantage_of(&self, entity: &str, base_key: &str) -> AdvantageState {
        self.modifiers.advantage_of(entity, base_key)
    }

    pub fn has_immunity(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.modifiers.has_immunity(entity, damage_type)
    }

    pub fn has_resistance(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.modifiers.has_resistance(entity, damage_type)
    }

    pub fn has_vulnerability(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.modifiers.has_vulnerability(entity, damage_type)
    }

    pub fn resolve_damage_relation(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
    ) -> DamageRelation {
        self.modifiers.resolve_damage_relation(entity, damage_type)
    }

    pub fn mitigate_damage(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        amount: i32,
    ) -> MitigatedDamage {
        self.modifiers.mitigate_damage(entity, damage_type, amount)
    }

    pub fn clear(&mut self, entity: &str) {
        self.modifiers.clear(entity)
    }

    pub fn tick(&mut self, delta_seconds: f64, advance_round: bool) -> ChangedKeys {
        self.modifiers.tick(delta_seconds, advance_round)
    }

    pub fn end_scene(&mut self) -> ChangedKeys {
        self.modifiers.end_scene()
    }

    pub fn roll_d20(&mut self, ctx: &RollContext, advantage_override: AdvantageState) -> D20Result {
        self.rolls.roll_d20(&self.modifiers, ctx, advantage_override)
    }

    pub fn attack_roll(&mut self, ctx: &RollContext) -> AttackResult {
        self.rolls.attack_roll(&self.modifiers, ctx)
    }

    pub fn ability_check(&mut self, skill: &str, dc: Option<i32>, ctx: &RollContext) -> CheckResult {
        self.rolls.ability_check(&self.modifiers, skill, dc, ctx)
    }

    pub fn saving_throw(&mut self, ability: &str, dc: i32, ctx: &RollContext) -> SaveResult {
        self.rolls.saving_throw(&self.modifiers, ability, dc, ctx)
    }

    pub fn roll_damage(&mut self, formula: &str, ctx: &RollContext) -> DamageResult {
        self.rolls.roll_damage(formula, ctx)
    }
}
