//! Key namespace
//!
//! Keys are opaque strings. Numeric keys (`attack_bonus`, `save:DEX`,
//! `check:Stealth`) and flag keys (`advantage:*`, `resistance:*`,
//! `immunity:*`, `vulnerability:*`) never share a bucket.

use std::borrow::Cow;

use crate::combat::DamageType;

/// Flat bonus added to attack rolls
pub const ATTACK_BONUS: &str = "attack_bonus";
/// Bonus to armor class
pub const AC_BONUS: &str = "ac_bonus";
/// Movement speed
pub const SPEED: &str = "speed";
/// Base action key for attack advantage
pub const ATTACK: &str = "attack";

pub const ADVANTAGE_PREFIX: &str = "advantage:";
pub const RESISTANCE_PREFIX: &str = "resistance:";
pub const IMMUNITY_PREFIX: &str = "immunity:";
pub const VULNERABILITY_PREFIX: &str = "vulnerability:";

const FLAG_PREFIXES: [&str; 4] = [
    ADVANTAGE_PREFIX,
    RESISTANCE_PREFIX,
    IMMUNITY_PREFIX,
    VULNERABILITY_PREFIX,
];

/// `advantage:<base>`
pub fn advantage(base: &str) -> String {
    format!("{ADVANTAGE_PREFIX}{base}")
}

/// `resistance:<damage type>`
pub fn resistance(damage_type: &str) -> String {
    format!("{RESISTANCE_PREFIX}{}", canonical_damage_type(damage_type))
}

/// `immunity:<damage type>`
pub fn immunity(damage_type: &str) -> String {
    format!("{IMMUNITY_PREFIX}{}", canonical_damage_type(damage_type))
}

/// `vulnerability:<damage type>`
pub fn vulnerability(damage_type: &str) -> String {
    format!("{VULNERABILITY_PREFIX}{}", canonical_damage_type(damage_type))
}

/// Canonical spelling of a damage type
///
/// Known types and their aliases map to the `DamageType` name; anything
/// else is kept verbatim.
pub fn canonical_damage_type(name: &str) -> &str {
    match name.parse::<DamageType>() {
        Ok(damage_type) => damage_type.as_str(),
        Err(_) => name,
    }
}

/// Rewrite a damage-type flag key to its canonical spelling
///
/// `resistance:ice` becomes `resistance:cold`; every other key is returned
/// unchanged.
pub fn canonical(key: &str) -> Cow<'_, str> {
    for prefix in [RESISTANCE_PREFIX, IMMUNITY_PREFIX, VULNERABILITY_PREFIX] {
        if let Some(name) = key.strip_prefix(prefix) {
            let canonical = canonical_damage_type(name);
            if canonical != name {
                return Cow::Owned(format!("{prefix}{canonical}"));
            }
        }
    }
    Cow::Borrowed(key)
}

/// `check:<skill>`
pub fn check(skill: &str) -> String {
    format!("check:{skill}")
}

/// `save:<ability>`
pub fn save(ability: &str) -> String {
    format!("save:{ability}")
}

/// `<base>:<qualifier>`
pub fn qualified(base: &str, qualifier: &str) -> String {
    format!("{base}:{qualifier}")
}

/// The base key followed by one tag-qualified key per tag, in tag order
pub fn with_tags(base: &str, tags: &[String]) -> Vec<String> {
    let mut keys = Vec::with_capacity(tags.len() + 1);
    keys.push(base.to_string());
    keys.extend(
        tags.iter()
            .filter(|t| !t.is_empty())
            .map(|t| qualified(base, t)),
    );
    keys
}

/// Whether `key` lives in the flag/advantage namespace
pub fn is_flag_key(key: &str) -> bool {
    FLAG_PREFIXES.iter().any(|p| key.starts_with(p))
}
