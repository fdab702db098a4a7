//! Change and roll notifications
//!
//! Observers register once and receive typed callbacks. The store never
//! recomputes anything downstream itself; observers decide what to do.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::combat::{AttackResult, CheckResult, D20Result, DamageResult, SaveResult};

/// A completed roll, one payload type per roll kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollEvent {
    D20(D20Result),
    Attack(AttackResult),
    Check(CheckResult),
    Save(SaveResult),
    Damage(DamageResult),
}

impl RollEvent {
    /// Short name of the roll kind
    pub fn kind(&self) -> &'static str {
        match self {
            RollEvent::D20(_) => "d20",
            RollEvent::Attack(_) => "attack",
            RollEvent::Check(_) => "check",
            RollEvent::Save(_) => "save",
            RollEvent::Damage(_) => "damage",
        }
    }

    /// Every die rolled, in roll order
    pub fn dice(&self) -> &[u32] {
        match self {
            RollEvent::D20(r) => &r.raw_rolls,
            RollEvent::Attack(r) => &r.d20.raw_rolls,
            RollEvent::Check(r) => &r.d20.raw_rolls,
            RollEvent::Save(r) => &r.d20.raw_rolls,
            RollEvent::Damage(r) => &r.dice,
        }
    }
}

/// Receives notifications from the modifier store and roll engine
pub trait RulesObserver: Send + Sync {
    /// A source under `(entity, key)` was added, replaced, removed or expired
    fn modifier_changed(&self, _entity: &str, _key: &str) {}

    /// Every bucket of `entity` was dropped
    fn modifiers_cleared(&self, _entity: &str) {}

    /// A roll completed
    fn rolled(&self, _event: &RollEvent) {}
}

/// Registered observers
#[derive(Clone, Default)]
pub struct Observers {
    list: Vec<Arc<dyn RulesObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: Arc<dyn RulesObserver>) {
        self.list.push(observer);
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub(crate) fn modifier_changed(&self, entity: &str, key: &str) {
        for observer in &self.list {
            observer.modifier_changed(entity, key);
        }
    }

    pub(crate) fn modifiers_cleared(&self, entity: &str) {
        for observer in &self.list {
            observer.modifiers_cleared(entity);
        }
    }

    pub(crate) fn rolled(&self, event: &RollEvent) {
        for observer in &self.list {
            observer.rolled(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.list.len())
            .finish()
    }
}
