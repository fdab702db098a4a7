//! Roll engine
//!
//! Resolves d20 rolls, attacks, ability checks, saving throws and damage
//! against one seeded generator. Bonuses and advantage come from the
//! modifier store, which the engine reads but never mutates.
//!
//! Every public roll follows the same contract: compute from the current
//! generator state and store queries, advance the generator, notify
//! observers, then persist the new seed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, trace, warn};

use super::dice::{is_critical, is_fumble, DiceFormula};
use super::rng::DiceRng;
use super::seed::{SeedStatus, SeedStore};
use crate::events::{Observers, RollEvent, RulesObserver};
use crate::modifiers::{keys, AdvantageState, ModifierStore};

/// Defense used when neither the context nor a resolver supplies one
pub const DEFAULT_DEFENSE: i32 = 10;

/// Supplies a defense value (armor class or similar) for a target
pub trait DefenseResolver: Send + Sync {
    fn defense_value(&self, entity: &str, tags: &[String]) -> Option<i32>;
}

impl<F> DefenseResolver for F
where
    F: Fn(&str, &[String]) -> Option<i32> + Send + Sync,
{
    fn defense_value(&self, entity: &str, tags: &[String]) -> Option<i32> {
        self(entity, tags)
    }
}

/// Who is rolling, against whom, and with which tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollContext {
    /// Entity making the roll
    pub actor: String,
    /// Entity being attacked, if any
    pub target: Option<String>,
    /// Base action key for plain d20 rolls (defaults to `attack`)
    pub action: Option<String>,
    /// Qualifying tags, in priority order
    pub tags: Vec<String>,
    /// Explicit defense/threshold to beat
    pub defense: Option<i32>,
    /// Roll damage as a critical hit
    pub critical: bool,
}

impl RollContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            ..Default::default()
        }
    }

    pub fn against(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_defense(mut self, defense: i32) -> Self {
        self.defense = Some(defense);
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    fn action_key(&self) -> &str {
        self.action.as_deref().unwrap_or(keys::ATTACK)
    }
}

/// Result of a d20 roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct D20Result {
    /// The kept die
    pub die: u32,
    /// Advantage state the roll was made with
    pub advantage: AdvantageState,
    /// Natural 20
    pub is_crit: bool,
    /// Natural 1
    pub is_fumble: bool,
    /// Every die rolled, in order
    pub raw_rolls: Vec<u32>,
}

/// Result of an attack roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackResult {
    pub actor: String,
    pub target: Option<String>,
    pub d20: D20Result,
    /// Sum of applicable attack bonuses
    pub bonus: i32,
    /// Die plus bonus
    pub total: i32,
    /// Defense the total was compared against
    pub defense: i32,
    pub hit: bool,
}

impl AttackResult {
    /// Natural 20 always hits, natural 1 always misses
    pub fn new(
        actor: String,
        target: Option<String>,
        d20: D20Result,
        bonus: i32,
        defense: i32,
    ) -> Self {
        let total = (d20.die as i32).saturating_add(bonus);
        let hit = d20.is_crit || (!d20.is_fumble && total >= defense);
        Self {
            actor,
            target,
            d20,
            bonus,
            total,
            defense,
            hit,
        }
    }

    pub fn critical(&self) -> bool {
        self.d20.is_crit
    }
}

/// Result of an ability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub actor: String,
    pub skill: String,
    pub d20: D20Result,
    pub bonus: i32,
    pub total: i32,
    /// Difficulty class, when one was supplied
    pub dc: Option<i32>,
    /// `total >= dc`, when a DC was supplied
    pub success: Option<bool>,
}

/// Result of a saving throw
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveResult {
    pub actor: String,
    pub ability: String,
    pub d20: D20Result,
    pub bonus: i32,
    pub total: i32,
    pub dc: i32,
    pub success: bool,
}

/// Result of a damage roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageResult {
    /// Formula as rolled (dice doubled on a critical)
    pub formula: DiceFormula,
    /// Individual dice
    pub dice: Vec<u32>,
    /// Flat bonus from the formula
    pub bonus: i32,
    /// Sum of dice plus bonus
    pub total: i32,
    pub critical: bool,
}

/// Seeded roll resolver
pub struct RollEngine {
    rng: DiceRng,
    seed_store: Option<Box<dyn SeedStore>>,
    seed_status: SeedStatus,
    defense: Option<Box<dyn DefenseResolver>>,
    default_defense: i32,
    observers: Observers,
}

impl RollEngine {
    /// Create an engine at `seed` with no collaborators
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DiceRng::new(seed),
            seed_store: None,
            seed_status: SeedStatus::Ephemeral,
            defense: None,
            default_defense: DEFAULT_DEFENSE,
            observers: Observers::new(),
        }
    }

    /// Attach a seed store and restore from it
    ///
    /// An empty store receives the current seed. A failing store is
    /// reported through `seed_status` and the engine keeps its current seed.
    pub fn with_seed_store(mut self, store: Box<dyn SeedStore>) -> Self {
        self.seed_status = match store.load_seed() {
            Ok(Some(seed)) => {
                info!(seed, "restored dice seed");
                self.rng.reseed(seed);
                SeedStatus::Restored
            }
            Ok(None) => match store.save_seed(self.rng.seed()) {
                Ok(()) => {
                    info!(seed = self.rng.seed(), "initialized dice seed");
                    SeedStatus::Initialized
                }
                Err(e) => {
                    error!(error = %e, "seed store unavailable; rolls will not resume across sessions");
                    SeedStatus::Unavailable {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                error!(error = %e, "seed store unavailable; rolls will not resume across sessions");
                SeedStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        };
        self.seed_store = Some(store);
        self
    }

    /// Attach a defense resolver for attacks without an explicit defense
    pub fn with_defense_resolver(mut self, resolver: Box<dyn DefenseResolver>) -> Self {
        self.defense = Some(resolver);
        self
    }

    /// Defense used when nothing else supplies one
    pub fn with_default_defense(mut self, defense: i32) -> Self {
        self.default_defense = defense;
        self
    }

    /// Report rolls to `observers`
    pub fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    /// Register a roll observer
    pub fn subscribe(&mut self, observer: Arc<dyn RulesObserver>) {
        self.observers.subscribe(observer);
    }

    /// Current seed
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Reseed and persist; the only way to replay a sequence
    pub fn set_seed(&mut self, seed: u64) {
        self.rng.reseed(seed);
        self.persist_seed();
    }

    /// How the seed was obtained at construction
    pub fn seed_status(&self) -> &SeedStatus {
        &self.seed_status
    }

    /// False when the seed store failed at startup
    pub fn is_reproducible(&self) -> bool {
        self.seed_status.is_reproducible()
    }

    /// Roll a d20 for `ctx.action` (default `attack`)
    ///
    /// A non-normal `advantage_override` wins; otherwise advantage comes
    /// from the store for the action key and each tag-qualified key.
    pub fn roll_d20(
        &mut self,
        store: &ModifierStore,
        ctx: &RollContext,
        advantage_override: AdvantageState,
    ) -> D20Result {
        let advantage = if advantage_override.is_normal() {
            resolve_advantage(store, &ctx.actor, ctx.action_key(), &ctx.tags)
        } else {
            advantage_override
        };
        let result = self.d20_with(advantage);
        self.finish(RollEvent::D20(result.clone()));
        result
    }

    /// Attack roll against `ctx.defense`, a resolved target defense, or
    /// the default defense
    pub fn attack_roll(&mut self, store: &ModifierStore, ctx: &RollContext) -> AttackResult {
        let advantage = resolve_advantage(store, &ctx.actor, keys::ATTACK, &ctx.tags);
        let d20 = self.d20_with(advantage);
        let bonus = sum_bonuses(store, &ctx.actor, keys::ATTACK_BONUS, &ctx.tags);
        let defense = self.defense_for(ctx);

        let result = AttackResult::new(ctx.actor.clone(), ctx.target.clone(), d20, bonus, defense);
        self.finish(RollEvent::Attack(result.clone()));
        result
    }

    /// Ability check keyed by `check:<skill>`, optionally against a DC
    pub fn ability_check(
        &mut self,
        store: &ModifierStore,
        skill: &str,
        dc: Option<i32>,
        ctx: &RollContext,
    ) -> CheckResult {
        let key = keys::check(skill);
        let (d20, bonus) = self.keyed_d20(store, &key, ctx);
        let total = (d20.die as i32).saturating_add(bonus);

        let result = CheckResult {
            actor: ctx.actor.clone(),
            skill: skill.to_string(),
            d20,
            bonus,
            total,
            dc,
            success: dc.map(|dc| total >= dc),
        };
        self.finish(RollEvent::Check(result.clone()));
        result
    }

    /// Saving throw keyed by `save:<ability>` against `dc`
    pub fn saving_throw(
        &mut self,
        store: &ModifierStore,
        ability: &str,
        dc: i32,
        ctx: &RollContext,
    ) -> SaveResult {
        let key = keys::save(ability);
        let (d20, bonus) = self.keyed_d20(store, &key, ctx);
        let total = (d20.die as i32).saturating_add(bonus);

        let result = SaveResult {
            actor: ctx.actor.clone(),
            ability: ability.to_string(),
            d20,
            bonus,
            total,
            dc,
            success: total >= dc,
        };
        self.finish(RollEvent::Save(result.clone()));
        result
    }

    /// Roll a damage formula such as "2d6+3"
    ///
    /// Never fails: the formula is read leniently. A critical context
    /// doubles the dice.
    pub fn roll_damage(&mut self, formula: &str, ctx: &RollContext) -> DamageResult {
        let mut parsed = DiceFormula::lenient(formula);
        if ctx.critical {
            parsed = parsed.doubled();
        }

        let dice = self.rng.roll_dice(parsed.count, parsed.sides);
        let sum: i64 = dice.iter().map(|&d| d as i64).sum();
        let total = (sum + parsed.bonus as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;

        let result = DamageResult {
            formula: parsed,
            dice,
            bonus: parsed.bonus,
            total,
            critical: ctx.critical,
        };
        self.finish(RollEvent::Damage(result.clone()));
        result
    }

    fn d20_with(&mut self, advantage: AdvantageState) -> D20Result {
        let raw_rolls = if advantage.is_normal() {
            vec![self.rng.d20()]
        } else {
            vec![self.rng.d20(), self.rng.d20()]
        };
        let die = match advantage {
            AdvantageState::Advantage => raw_rolls.iter().copied().max(),
            AdvantageState::Disadvantage => raw_rolls.iter().copied().min(),
            AdvantageState::Normal => raw_rolls.first().copied(),
        }
        .unwrap_or(1);

        D20Result {
            die,
            advantage,
            is_crit: is_critical(die),
            is_fumble: is_fumble(die),
            raw_rolls,
        }
    }

    /// d20 plus bonus where advantage and bonuses share one key family
    fn keyed_d20(&mut self, store: &ModifierStore, key: &str, ctx: &RollContext) -> (D20Result, i32) {
        let advantage = resolve_advantage(store, &ctx.actor, key, &ctx.tags);
        let d20 = self.d20_with(advantage);
        let bonus = sum_bonuses(store, &ctx.actor, key, &ctx.tags);
        (d20, bonus)
    }

    fn defense_for(&self, ctx: &RollContext) -> i32 {
        if let Some(defense) = ctx.defense {
            return defense;
        }
        ctx.target
            .as_deref()
            .zip(self.defense.as_ref())
            .and_then(|(target, resolver)| resolver.defense_value(target, &ctx.tags))
            .unwrap_or(self.default_defense)
    }

    fn finish(&mut self, event: RollEvent) {
        self.rng.advance();
        trace!(kind = event.kind(), dice = ?event.dice(), seed = self.rng.seed(), "rolled");
        self.observers.rolled(&event);
        self.persist_seed();
    }

    fn persist_seed(&self) {
        if let Some(store) = &self.seed_store {
            if let Err(e) = store.save_seed(self.rng.seed()) {
                warn!(error = %e, "failed to persist dice seed");
            }
        }
    }
}

impl std::fmt::Debug for RollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollEngine")
            .field("seed", &self.rng.seed())
            .field("seed_status", &self.seed_status)
            .field("default_defense", &self.default_defense)
            .field("observers", &self.observers)
            .finish()
    }
}

/// Strongest advantage across the base key and its tag-qualified keys
///
/// Ties keep the earliest key, so the base key wins over tags and earlier
/// tags win over later ones.
fn resolve_advantage(
    store: &ModifierStore,
    entity: &str,
    base_key: &str,
    tags: &[String],
) -> AdvantageState {
    keys::with_tags(base_key, tags)
        .iter()
        .map(|key| store.advantage_of_with(entity, key, tags))
        .fold(AdvantageState::Normal, |best, state| {
            if state.magnitude() > best.magnitude() {
                state
            } else {
                best
            }
        })
}

/// Sum of stacked totals over the base key and its tag-qualified keys,
/// rounded down
fn sum_bonuses(store: &ModifierStore, entity: &str, base_key: &str, tags: &[String]) -> i32 {
    let total: f64 = keys::with_tags(base_key, tags)
        .iter()
        .map(|key| store.total_of_with(entity, key, 0.0, tags))
        .sum();
    if total.is_nan() {
        return 0;
    }
    total.floor().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::seed::MemorySeedStore;
    use crate::modifiers::ModifierSource;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Rolls(Mutex<Vec<RollEvent>>);

    impl RulesObserver for Rolls {
        fn rolled(&self, event: &RollEvent) {
            self.0.lock().push(event.clone());
        }
    }

    #[test]
    fn test_attack_result() {
        let d20 = |die: u32| D20Result {
            die,
            advantage: AdvantageState::Normal,
            is_crit: is_critical(die),
            is_fumble: is_fumble(die),
            raw_rolls: vec![die],
        };
        let attack = |die, bonus, defense| AttackResult::new("a".into(), None, d20(die), bonus, defense);

        // Critical always hits
        let result = attack(20, -10, 30);
        assert!(result.hit);
        assert!(result.critical());

        // Fumble always misses
        let result = attack(1, 50, 5);
        assert!(!result.hit);

        // Normal hit: 15 + 5 = 20 >= 18
        assert!(attack(15, 5, 18).hit);
        // Exactly meeting defense hits
        assert!(attack(13, 5, 18).hit);
        // Normal miss: 10 + 3 = 13 < 18
        assert!(!attack(10, 3, 18).hit);
    }

    #[test]
    fn test_d20_single_die_without_advantage() {
        let store = ModifierStore::new();
        let mut engine = RollEngine::new(1);
        for _ in 0..50 {
            let result = engine.roll_d20(&store, &RollContext::default(), AdvantageState::Normal);
            assert_eq!(result.raw_rolls.len(), 1);
            assert_eq!(result.die, result.raw_rolls[0]);
            assert_eq!(result.is_crit, result.die == 20);
            assert_eq!(result.is_fumble, result.die == 1);
        }
    }

    #[test]
    fn test_d20_advantage_keeps_max() {
        let store = ModifierStore::new();
        let mut engine = RollEngine::new(2);
        for _ in 0..50 {
            let result = engine.roll_d20(&store, &RollContext::default(), AdvantageState::Advantage);
            assert_eq!(result.raw_rolls.len(), 2);
            assert_eq!(result.die, *result.raw_rolls.iter().max().unwrap());

            let result =
                engine.roll_d20(&store, &RollContext::default(), AdvantageState::Disadvantage);
            assert_eq!(result.die, *result.raw_rolls.iter().min().unwrap());
        }
    }

    #[test]
    fn test_d20_reads_store_advantage() {
        let mut store = ModifierStore::new();
        store.add("hero", "advantage:attack", ModifierSource::advantage("bless"));

        let mut engine = RollEngine::new(3);
        let ctx = RollContext::new("hero");
        let result = engine.roll_d20(&store, &ctx, AdvantageState::Normal);
        assert_eq!(result.advantage, AdvantageState::Advantage);
        assert_eq!(result.raw_rolls.len(), 2);

        // Override wins over the store
        let result = engine.roll_d20(&store, &ctx, AdvantageState::Disadvantage);
        assert_eq!(result.advantage, AdvantageState::Disadvantage);
    }

    #[test]
    fn test_tag_advantage_first_wins_on_tie() {
        let mut store = ModifierStore::new();
        store.add("hero", "advantage:attack:melee", ModifierSource::disadvantage("cramped"));
        store.add("hero", "advantage:attack:sword", ModifierSource::advantage("favored"));

        let mut engine = RollEngine::new(4);
        let ctx = RollContext::new("hero").with_tag("melee").with_tag("sword");
        let result = engine.roll_d20(&store, &ctx, AdvantageState::Normal);
        assert_eq!(result.advantage, AdvantageState::Disadvantage);

        let ctx = RollContext::new("hero").with_tag("sword").with_tag("melee");
        let result = engine.roll_d20(&store, &ctx, AdvantageState::Normal);
        assert_eq!(result.advantage, AdvantageState::Advantage);
    }

    #[test]
    fn test_attack_bonus_and_defense() {
        let mut store = ModifierStore::new();
        store.add("hero", "attack_bonus", ModifierSource::add("prof", 3.0));
        store.add("hero", "attack_bonus:sword", ModifierSource::add("magic", 1.0));

        let mut engine = RollEngine::new(5);
        let ctx = RollContext::new("hero").with_tag("sword").with_defense(15);
        let result = engine.attack_roll(&store, &ctx);
        assert_eq!(result.bonus, 4);
        assert_eq!(result.total, result.d20.die as i32 + 4);
        assert_eq!(result.defense, 15);

        // No defense anywhere: default 10
        let result = engine.attack_roll(&store, &RollContext::new("hero").against("goblin"));
        assert_eq!(result.defense, 10);
    }

    #[test]
    fn test_defense_resolver_consulted() {
        let store = ModifierStore::new();
        let resolver = |entity: &str, _tags: &[String]| (entity == "ogre").then_some(17);
        let mut engine = RollEngine::new(6).with_defense_resolver(Box::new(resolver));

        let result = engine.attack_roll(&store, &RollContext::new("hero").against("ogre"));
        assert_eq!(result.defense, 17);

        // Unknown target falls through to the default
        let result = engine.attack_roll(&store, &RollContext::new("hero").against("ghost"));
        assert_eq!(result.defense, DEFAULT_DEFENSE);

        // Explicit defense beats the resolver
        let ctx = RollContext::new("hero").against("ogre").with_defense(8);
        assert_eq!(engine.attack_roll(&store, &ctx).defense, 8);
    }

    #[test]
    fn test_check_and_save() {
        let mut store = ModifierStore::new();
        store.add("hero", "check:Stealth", ModifierSource::add("cloak", 5.0));
        store.add("hero", "save:DEX", ModifierSource::add("evasion", 2.5));

        let mut engine = RollEngine::new(7);
        let ctx = RollContext::new("hero");

        let check = engine.ability_check(&store, "Stealth", None, &ctx);
        assert_eq!(check.bonus, 5);
        assert_eq!(check.success, None);

        let check = engine.ability_check(&store, "Stealth", Some(6), &ctx);
        // Minimum roll of 1 + 5 = 6 always meets DC 6
        assert_eq!(check.success, Some(true));

        let save = engine.saving_throw(&store, "DEX", 30, &ctx);
        assert_eq!(save.bonus, 2);
        assert!(!save.success);
        assert_eq!(save.total, save.d20.die as i32 + 2);
    }

    #[test]
    fn test_check_advantage_key() {
        let mut store = ModifierStore::new();
        store.add("hero", "advantage:check:Stealth", ModifierSource::disadvantage("armor"));

        let mut engine = RollEngine::new(8);
        let check = engine.ability_check(&store, "Stealth", None, &RollContext::new("hero"));
        assert_eq!(check.d20.advantage, AdvantageState::Disadvantage);
        assert_eq!(check.d20.raw_rolls.len(), 2);
    }

    #[test]
    fn test_huge_bonuses_saturate() {
        let mut store = ModifierStore::new();
        store.add("hero", "attack_bonus", ModifierSource::add("inf", f64::INFINITY));
        store.add("hero", "check:Athletics", ModifierSource::add("inf", f64::INFINITY));
        store.add("hero", "save:DEX", ModifierSource::add("inf", f64::INFINITY));
        store.add("hero", "save:CON", ModifierSource::add("big", 1e12));
        store.add("hero", "save:WIS", ModifierSource::add("curse", f64::NEG_INFINITY));

        let mut engine = RollEngine::new(11);
        let ctx = RollContext::new("hero").with_defense(30);

        let attack = engine.attack_roll(&store, &ctx);
        assert_eq!(attack.bonus, i32::MAX);
        assert_eq!(attack.total, i32::MAX);
        assert_eq!(attack.hit, !attack.d20.is_fumble);

        let check = engine.ability_check(&store, "Athletics", Some(25), &ctx);
        assert_eq!(check.total, i32::MAX);
        assert_eq!(check.success, Some(true));

        let save = engine.saving_throw(&store, "DEX", 10, &ctx);
        assert_eq!(save.total, i32::MAX);
        assert!(save.success);

        let save = engine.saving_throw(&store, "CON", 10, &ctx);
        assert_eq!(save.total, i32::MAX);

        let save = engine.saving_throw(&store, "WIS", 10, &ctx);
        assert_eq!(save.bonus, i32::MIN);
        assert_eq!(save.total, i32::MIN + save.d20.die as i32);
        assert!(!save.success);
    }

    #[test]
    fn test_roll_damage() {
        let mut engine = RollEngine::new(9);
        let result = engine.roll_damage("3d6+2", &RollContext::default());
        assert_eq!(result.dice.len(), 3);
        assert!(result.dice.iter().all(|d| (1..=6).contains(d)));
        assert_eq!(result.total, result.dice.iter().sum::<u32>() as i32 + 2);

        let flat = engine.roll_damage("4", &RollContext::default());
        assert!(flat.dice.is_empty());
        assert_eq!(flat.total, 4);

        let crit = engine.roll_damage("2d8", &RollContext::default().critical());
        assert_eq!(crit.dice.len(), 4);
        assert!(crit.critical);
    }

    #[test]
    fn test_every_roll_notifies_and_advances() {
        let store = ModifierStore::new();
        let rolls = Arc::new(Rolls::default());
        let mut engine = RollEngine::new(10);
        engine.subscribe(rolls.clone());

        let ctx = RollContext::new("hero");
        let mut seeds = vec![engine.seed()];
        engine.roll_d20(&store, &ctx, AdvantageState::Normal);
        seeds.push(engine.seed());
        engine.attack_roll(&store, &ctx);
        seeds.push(engine.seed());
        engine.ability_check(&store, "Athletics", None, &ctx);
        seeds.push(engine.seed());
        engine.saving_throw(&store, "CON", 10, &ctx);
        seeds.push(engine.seed());
        engine.roll_damage("1d4", &ctx);
        seeds.push(engine.seed());

        let kinds: Vec<_> = rolls.0.lock().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["d20", "attack", "check", "save", "damage"]);

        for pair in seeds.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_seed_store_restore_and_persist() {
        let store = ModifierStore::new();
        let mut first = RollEngine::new(1).with_seed_store(Box::new(MemorySeedStore::with_seed(777)));
        assert_eq!(first.seed_status(), &SeedStatus::Restored);
        assert_eq!(first.seed(), 777);

        let a = first.roll_d20(&store, &RollContext::default(), AdvantageState::Normal);
        let resume_at = first.seed();
        let b = first.roll_d20(&store, &RollContext::default(), AdvantageState::Normal);

        // A new engine restored from the persisted seed continues the sequence
        let mut second =
            RollEngine::new(2).with_seed_store(Box::new(MemorySeedStore::with_seed(resume_at)));
        let b2 = second.roll_d20(&store, &RollContext::default(), AdvantageState::Normal);
        assert_eq!(b, b2);

        let mut replay = RollEngine::new(777);
        assert_eq!(
            replay.roll_d20(&store, &RollContext::default(), AdvantageState::Normal),
            a
        );
    }

    #[test]
    fn test_seed_store_initialized_when_empty() {
        let engine = RollEngine::new(55).with_seed_store(Box::new(MemorySeedStore::new()));
        assert_eq!(engine.seed_status(), &SeedStatus::Initialized);
        assert!(engine.is_reproducible());
    }

    #[test]
    fn test_seed_store_unavailable_is_reported() {
        struct Broken;
        impl SeedStore for Broken {
            fn load_seed(&self) -> Result<Option<u64>, crate::combat::SeedStoreError> {
                Err(crate::combat::SeedStoreError::Unavailable("offline".into()))
            }
            fn save_seed(&self, _seed: u64) -> Result<(), crate::combat::SeedStoreError> {
                Err(crate::combat::SeedStoreError::Unavailable("offline".into()))
            }
        }

        let store = ModifierStore::new();
        let mut engine = RollEngine::new(3).with_seed_store(Box::new(Broken));
        assert!(!engine.is_reproducible());
        assert!(matches!(engine.seed_status(), SeedStatus::Unavailable { reason } if reason.contains("offline")));

        // Rolling still works
        let result = engine.roll_d20(&store, &RollContext::default(), AdvantageState::Normal);
        assert!((1..=20).contains(&result.die));
    }
}
