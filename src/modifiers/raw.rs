//! Loosely typed modifier input
//!
//! Content files and scripting layers hand over modifiers with the
//! operation as a string and the value as arbitrary JSON. This module
//! turns them into typed sources, coercing values the way the store
//! expects and rejecting unknown operations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::source::{ModifierDuration, ModifierSource, Operation};

/// A modifier as it arrives from content or a script
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawModifier {
    pub key: String,
    pub id: String,
    pub operation: String,
    pub value: Value,
    pub tags: Vec<String>,
    pub duration: ModifierDuration,
    pub priority: i32,
}

impl RawModifier {
    /// Convert into a typed source
    ///
    /// Returns `None` when the operation name is empty or unknown.
    pub fn to_source(&self) -> Option<ModifierSource> {
        let operation = parse_operation(&self.operation, &self.value)?;
        Some(ModifierSource {
            id: self.id.clone(),
            operation,
            tags: self.tags.iter().cloned().collect::<BTreeSet<_>>(),
            duration: self.duration,
            priority: self.priority,
            applies_if: None,
        })
    }
}

/// Parse an operation name, coercing the payload to a number
///
/// Names are case-insensitive and ignore `_`, `-` and spaces.
pub fn parse_operation(name: &str, value: &Value) -> Option<Operation> {
    let normalized: String = name
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect();

    let op = match normalized.as_str() {
        "add" => Operation::Add(coerce_number(value, 0.0)),
        "multiply" | "mul" => Operation::Multiply(coerce_number(value, 1.0)),
        "clampmin" | "min" => Operation::ClampMin(coerce_number(value, f64::NEG_INFINITY)),
        "clampmax" | "max" => Operation::ClampMax(coerce_number(value, f64::INFINITY)),
        "advantage" => Operation::Advantage,
        "disadvantage" => Operation::Disadvantage,
        "grantresistance" | "resistance" => Operation::GrantResistance,
        "grantimmunity" | "immunity" => Operation::GrantImmunity,
        "grantvulnerability" | "vulnerability" => Operation::GrantVulnerability,
        _ => return None,
    };
    Some(op)
}

/// Coerce a JSON value to a number
///
/// Booleans map to 1/0 and numeric strings are parsed. Anything else
/// (null, arrays, objects, junk strings) yields `fallback`, which callers
/// pick as the identity of the operation.
pub fn coerce_number(value: &Value, fallback: f64) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(fallback),
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_nan()).unwrap_or(fallback),
        _ => fallback,
    }
}
