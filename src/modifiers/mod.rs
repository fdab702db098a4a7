//! Modifier stacking
//!
//! Entities carry named modifier sources per key. Numeric keys stack
//! additively and multiplicatively with clamps; flag keys carry
//! advantage votes and damage-type grants.

pub mod keys;
mod raw;
mod source;
mod store;

pub use raw::{coerce_number, parse_operation, RawModifier};
pub use source::{AppliesIf, ModifierDuration, ModifierSource, Operation, QueryContext};
pub use store::{AdvantageState, ChangedKeys, ModifierStore};
