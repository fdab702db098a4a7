//! Modifier store
//!
//! Owns every `(entity, key)` bucket, computes stacked totals, advantage
//! state and damage relations, and counts down timed sources.
//!
//! Malformed input never fails: it is skipped. Queries against unknown
//! entities or keys return the caller's neutral default so a tick can run
//! before every entity has registered its data.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::keys;
use super::raw::RawModifier;
use super::source::{ModifierDuration, ModifierSource, Operation, QueryContext};
use crate::combat::{DamageRelation, MitigatedDamage};
use crate::events::{Observers, RulesObserver};

/// `(entity, key)` pairs touched by a sweep, in sorted order
pub type ChangedKeys = BTreeSet<(String, String)>;

/// Net advantage on a roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvantageState {
    Disadvantage,
    #[default]
    Normal,
    Advantage,
}

impl AdvantageState {
    /// -1, 0 or +1
    pub fn as_i8(&self) -> i8 {
        match self {
            AdvantageState::Disadvantage => -1,
            AdvantageState::Normal => 0,
            AdvantageState::Advantage => 1,
        }
    }

    /// Sign of `value`
    pub fn from_sign(value: i64) -> Self {
        match value.signum() {
            1 => AdvantageState::Advantage,
            -1 => AdvantageState::Disadvantage,
            _ => AdvantageState::Normal,
        }
    }

    pub fn is_normal(&self) -> bool {
        *self == AdvantageState::Normal
    }

    pub fn magnitude(&self) -> u8 {
        self.as_i8().unsigned_abs()
    }
}

/// Per-entity, per-key modifier sources
#[derive(Debug, Default)]
pub struct ModifierStore {
    buckets: HashMap<String, HashMap<String, Vec<ModifierSource>>>,
    observers: Observers,
}

impl ModifierStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store reporting to `observers`
    pub fn with_observers(observers: Observers) -> Self {
        Self {
            buckets: HashMap::new(),
            observers,
        }
    }

    /// Register a change observer
    pub fn subscribe(&mut self, observer: Arc<dyn RulesObserver>) {
        self.observers.subscribe(observer);
    }

    /// Add or replace a source
    ///
    /// Skipped (returns false, no notification) when the entity, key or id
    /// is empty, the payload is NaN, or the operation does not belong to the
    /// key's namespace. Damage-type flag keys are filed under their
    /// canonical spelling (`resistance:ice` under `resistance:cold`).
    pub fn add(&mut self, entity: &str, key: &str, mut source: ModifierSource) -> bool {
        let key = keys::canonical(key);
        let key = key.as_ref();
        if entity.is_empty() || key.is_empty() || !source.is_valid() {
            debug!(entity, key, id = %source.id, "skipping malformed modifier");
            return false;
        }
        if source.operation.is_numeric() == keys::is_flag_key(key) {
            debug!(
                entity,
                key,
                id = %source.id,
                operation = source.operation.name(),
                "skipping modifier outside its key namespace"
            );
            return false;
        }

        source.duration = source.duration.normalized();
        debug!(entity, key, id = %source.id, operation = %source.operation, "adding modifier");

        let bucket = self
            .buckets
            .entry(entity.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
        match bucket.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source,
            None => bucket.push(source),
        }

        self.observers.modifier_changed(entity, key);
        true
    }

    /// Add a loosely typed modifier, coercing its value
    pub fn add_raw(&mut self, entity: &str, raw: &RawModifier) -> bool {
        match raw.to_source() {
            Some(source) => self.add(entity, &raw.key, source),
            None => {
                debug!(entity, key = %raw.key, operation = %raw.operation, "unknown operation");
                false
            }
        }
    }

    /// Remove a source by id, dropping the bucket once empty
    pub fn remove(&mut self, entity: &str, key: &str, source_id: &str) -> bool {
        let key = keys::canonical(key);
        let key = key.as_ref();
        let Some(entity_buckets) = self.buckets.get_mut(entity) else {
            return false;
        };
        let Some(bucket) = entity_buckets.get_mut(key) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|s| s.id == source_id) else {
            return false;
        };

        bucket.remove(pos);
        if bucket.is_empty() {
            entity_buckets.remove(key);
            if entity_buckets.is_empty() {
                self.buckets.remove(entity);
            }
        }

        debug!(entity, key, id = source_id, "removed modifier");
        self.observers.modifier_changed(entity, key);
        true
    }

    /// Stacked total of a numeric key
    pub fn total_of(&self, entity: &str, key: &str, default: f64) -> f64 {
        self.total_of_with(entity, key, default, &[])
    }

    /// Stacked total of a numeric key, with active tags for predicates
    ///
    /// `(default + Σ add) × Π multiply`, then the winning floor, then the
    /// winning ceiling. Clamp winners: highest priority, then the more
    /// restrictive bound.
    pub fn total_of_with(&self, entity: &str, key: &str, default: f64, tags: &[String]) -> f64 {
        let Some(bucket) = self.bucket(entity, key) else {
            return default;
        };
        let ctx = QueryContext::new(entity, key, tags);

        let mut add_sum = 0.0;
        let mut mul_prod = 1.0;
        let mut floor: Option<(i32, f64)> = None;
        let mut ceiling: Option<(i32, f64)> = None;

        for source in bucket.iter().filter(|s| s.applies(&ctx)) {
            match source.operation {
                Operation::Add(v) => add_sum += v,
                Operation::Multiply(v) => mul_prod *= v,
                Operation::ClampMin(v) => {
                    floor = Some(pick_clamp(floor, (source.priority, v), |new, old| new > old))
                }
                Operation::ClampMax(v) => {
                    ceiling = Some(pick_clamp(ceiling, (source.priority, v), |new, old| new < old))
                }
                Operation::Advantage
                | Operation::Disadvantage
                | Operation::GrantResistance
                | Operation::GrantImmunity
                | Operation::GrantVulnerability => {}
            }
        }

        let mut total = (default + add_sum) * mul_prod;
        if let Some((_, min)) = floor {
            total = total.max(min);
        }
        if let Some((_, max)) = ceiling {
            total = total.min(max);
        }
        total
    }

    /// Net advantage for `base_key`, read from `advantage:<base_key>`
    pub fn advantage_of(&self, entity: &str, base_key: &str) -> AdvantageState {
        self.advantage_of_with(entity, base_key, &[])
    }

    /// Net advantage with active tags for predicates
    ///
    /// Advantage and disadvantage votes cancel; only a strict majority
    /// counts.
    pub fn advantage_of_with(&self, entity: &str, base_key: &str, tags: &[String]) -> AdvantageState {
        let key = keys::advantage(base_key);
        let Some(bucket) = self.bucket(entity, &key) else {
            return AdvantageState::Normal;
        };
        let ctx = QueryContext::new(entity, &key, tags);

        let net: i64 = bucket
            .iter()
            .filter(|s| s.applies(&ctx))
            .map(|s| match s.operation {
                Operation::Advantage => 1,
                Operation::Disadvantage => -1,
                _ => 0,
            })
            .sum();
        AdvantageState::from_sign(net)
    }

    /// Any applicable immunity grant
    pub fn has_immunity(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.has_immunity_with(entity, damage_type, &[])
    }

    /// Resistant, unless immune
    pub fn has_resistance(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.has_resistance_with(entity, damage_type, &[])
    }

    /// Vulnerable, unless immune or resistant
    pub fn has_vulnerability(&self, entity: &str, damage_type: impl AsRef<str>) -> bool {
        self.has_vulnerability_with(entity, damage_type, &[])
    }

    pub fn has_immunity_with(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        tags: &[String],
    ) -> bool {
        self.resolve_damage_relation_with(entity, damage_type, tags) == DamageRelation::Immune
    }

    pub fn has_resistance_with(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        tags: &[String],
    ) -> bool {
        self.resolve_damage_relation_with(entity, damage_type, tags) == DamageRelation::Resistant
    }

    pub fn has_vulnerability_with(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        tags: &[String],
    ) -> bool {
        self.resolve_damage_relation_with(entity, damage_type, tags) == DamageRelation::Vulnerable
    }

    /// Highest-ranked relation to a damage type
    pub fn resolve_damage_relation(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
    ) -> DamageRelation {
        self.resolve_damage_relation_with(entity, damage_type, &[])
    }

    /// Highest-ranked relation with active tags for predicates
    ///
    /// Immunity beats resistance beats vulnerability.
    pub fn resolve_damage_relation_with(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        tags: &[String],
    ) -> DamageRelation {
        let damage_type = damage_type.as_ref();
        let tiers = [
            (keys::immunity(damage_type), Operation::GrantImmunity, DamageRelation::Immune),
            (keys::resistance(damage_type), Operation::GrantResistance, DamageRelation::Resistant),
            (
                keys::vulnerability(damage_type),
                Operation::GrantVulnerability,
                DamageRelation::Vulnerable,
            ),
        ];
        tiers
            .into_iter()
            .find(|(key, grant, _)| self.has_grant(entity, key, *grant, tags))
            .map_or(DamageRelation::Normal, |(_, _, relation)| relation)
    }

    /// Apply the entity's relation to an incoming damage amount
    pub fn mitigate_damage(
        &self,
        entity: &str,
        damage_type: impl AsRef<str>,
        amount: i32,
    ) -> MitigatedDamage {
        let damage_type = keys::canonical_damage_type(damage_type.as_ref());
        let relation = self.resolve_damage_relation(entity, damage_type);
        MitigatedDamage {
            base_damage: amount,
            final_damage: relation.apply(amount),
            damage_type: damage_type.to_string(),
            relation,
        }
    }

    /// Drop every bucket of `entity`
    pub fn clear(&mut self, entity: &str) {
        if self.buckets.remove(entity).is_some() {
            debug!(entity, "cleared modifiers");
            self.observers.modifiers_cleared(entity);
        }
    }

    /// Count down timed sources
    ///
    /// Seconds-scoped sources lose `max(delta_seconds, 0)`; round-scoped
    /// sources lose one round only when `advance_round` is set. The whole
    /// sweep is applied before any notification, and each touched key is
    /// reported once.
    pub fn tick(&mut self, delta_seconds: f64, advance_round: bool) -> ChangedKeys {
        let delta = if delta_seconds.is_nan() {
            0.0
        } else {
            delta_seconds.max(0.0)
        };
        let changed = self.sweep(|duration| duration.advance(delta, advance_round));
        self.report(&changed, "expired");
        changed
    }

    /// Scene transition: drop every scene-scoped source
    pub fn end_scene(&mut self) -> ChangedKeys {
        let changed = self.sweep(|duration| *duration == ModifierDuration::SceneScoped);
        self.report(&changed, "scene ended");
        changed
    }

    /// Sources filed under `(entity, key)`, in insertion order
    pub fn sources(&self, entity: &str, key: &str) -> &[ModifierSource] {
        self.bucket(entity, key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether a source with `source_id` exists under `(entity, key)`
    pub fn contains(&self, entity: &str, key: &str, source_id: &str) -> bool {
        self.sources(entity, key).iter().any(|s| s.id == source_id)
    }

    /// Keys with at least one source for `entity`, sorted
    pub fn keys_of(&self, entity: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .buckets
            .get(entity)
            .map(|b| b.keys().map(String::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    /// Entities with at least one bucket
    pub fn entity_count(&self) -> usize {
        self.buckets.len()
    }

    /// Install a representative set of sources for acceptance testing
    pub fn seed_debug_sources(&mut self, entity: &str) {
        debug!(entity, "seeding debug modifiers");
        self.add(
            entity,
            keys::AC_BONUS,
            ModifierSource::add("debug_shield", 2.0).with_tag("equipment"),
        );
        self.add(
            entity,
            &keys::advantage(keys::ATTACK),
            ModifierSource::advantage("debug_bless")
                .with_duration(ModifierDuration::Rounds(2))
                .with_tag("spell"),
        );
        self.add(
            entity,
            keys::ATTACK_BONUS,
            ModifierSource::add("debug_inspiration", 1.0)
                .with_duration(ModifierDuration::Seconds(6.0))
                .with_tag("spell"),
        );
        self.add(
            entity,
            keys::SPEED,
            ModifierSource::clamp_max("debug_encumbered", 20.0)
                .with_priority(5)
                .with_tag("condition"),
        );
        self.add(
            entity,
            &keys::resistance("fire"),
            ModifierSource::resistance("debug_fire_ring").with_tag("equipment"),
        );
    }

    fn bucket(&self, entity: &str, key: &str) -> Option<&Vec<ModifierSource>> {
        self.buckets.get(entity)?.get(key)
    }

    fn has_grant(&self, entity: &str, key: &str, grant: Operation, tags: &[String]) -> bool {
        let ctx = QueryContext::new(entity, key, tags);
        self.sources(entity, key)
            .iter()
            .any(|s| s.operation == grant && s.applies(&ctx))
    }

    /// Remove every source for which `expired` returns true, pruning empty
    /// buckets, and collect the touched keys
    fn sweep(&mut self, mut expired: impl FnMut(&mut ModifierDuration) -> bool) -> ChangedKeys {
        let mut changed = ChangedKeys::new();

        for (entity, entity_buckets) in self.buckets.iter_mut() {
            for (key, bucket) in entity_buckets.iter_mut() {
                let before = bucket.len();
                bucket.retain_mut(|source| !expired(&mut source.duration));
                if bucket.len() != before {
                    changed.insert((entity.clone(), key.clone()));
                }
            }
            entity_buckets.retain(|_, bucket| !bucket.is_empty());
        }
        self.buckets.retain(|_, entity_buckets| !entity_buckets.is_empty());

        changed
    }

    fn report(&self, changed: &ChangedKeys, reason: &str) {
        for (entity, key) in changed {
            debug!(entity = %entity, key = %key, reason, "modifiers changed");
            self.observers.modifier_changed(entity, key);
        }
    }
}

/// Clamp winner: higher priority, then `stricter(new, old)` on equal priority
fn pick_clamp(
    current: Option<(i32, f64)>,
    candidate: (i32, f64),
    stricter: impl Fn(f64, f64) -> bool,
) -> (i32, f64) {
    match current {
        None => candidate,
        Some(best) if candidate.0 > best.0 => candidate,
        Some(best) if candidate.0 == best.0 && stricter(candidate.1, best.1) => candidate,
        Some(best) => best,
    }
}
