//! Pre-wired rules for integration tests

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use rulecore::combat::MemorySeedStore;
use rulecore::{ModifierSource, RollEngine, Rules};

use super::recorder::Recorder;

/// Seed every `TestRules` starts from
pub const TEST_SEED: u64 = 12345;

/// `Rules` with a recorder attached
pub struct TestRules {
    pub rules: Rules,
    pub recorder: Arc<Recorder>,
}

impl TestRules {
    pub fn new() -> Self {
        Self::with_seed(TEST_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        let engine = RollEngine::new(seed).with_seed_store(Box::new(MemorySeedStore::new()));
        let mut rules = Rules::new(engine);
        let recorder = Arc::new(Recorder::new());
        rules.subscribe(recorder.clone());
        Self { rules, recorder }
    }

    /// Persistent flat bonus
    pub fn add_bonus(&mut self, entity: &str, key: &str, id: &str, value: f64) -> bool {
        self.rules.add(entity, key, ModifierSource::add(id, value))
    }
}

impl Deref for TestRules {
    type Target = Rules;

    fn deref(&self) -> &Rules {
        &self.rules
    }
}

impl DerefMut for TestRules {
    fn deref_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }
}
