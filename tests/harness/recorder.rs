//! Recording observer

use parking_lot::Mutex;
use rulecore::{RollEvent, RulesObserver};

/// One captured callback
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Changed { entity: String, key: String },
    Cleared { entity: String },
    Rolled(RollEvent),
}

/// Captures notifications for later assertions
#[derive(Debug, Default)]
pub struct Recorder {
    seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything seen so far, in order
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    /// `(entity, key)` of every change notification
    pub fn changes(&self) -> Vec<(String, String)> {
        self.seen
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Changed { entity, key } => Some((entity.clone(), key.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every roll event
    pub fn rolls(&self) -> Vec<RollEvent> {
        self.seen
            .lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Rolled(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.seen.lock().clear();
    }
}

impl RulesObserver for Recorder {
    fn modifier_changed(&self, entity: &str, key: &str) {
        self.seen.lock().push(Notification::Changed {
            entity: entity.to_string(),
            key: key.to_string(),
        });
    }

    fn modifiers_cleared(&self, entity: &str) {
        self.seen.lock().push(Notification::Cleared {
            entity: entity.to_string(),
        });
    }

    fn rolled(&self, event: &RollEvent) {
        self.seen.lock().push(Notification::Rolled(event.clone()));
    }
}
