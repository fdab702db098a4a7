//! Integration test harness
//!
//! - `Recorder` - observer that captures every notification in order
//! - `TestRules` - a `Rules` with a fixed seed, in-memory seed store and a
//!   recorder already subscribed
//!
//! # Example
//!
//! ```rust,ignore
//! use harness::TestRules;
//!
//! #[test]
//! fn test_bonus_applies() {
//!     let mut t = TestRules::new();
//!     t.add_bonus("hero", "attack_bonus", "prof", 2.0);
//!     assert_eq!(t.recorder.changes(), vec![("hero".into(), "attack_bonus".into())]);
//! }
//! ```

#![allow(dead_code)]

mod fixtures;
mod recorder;

pub use fixtures::{TestRules, TEST_SEED};
pub use recorder::{Notification, Recorder};
