//! Precedence chain turning overrides plus a baseline into one stack size.
//!
//! Rules are tried top to bottom and the first match wins:
//!
//! 1. ignore-listed item: baseline unchanged
//! 2. individual hard limit (shortname, then id)
//! 3. custom value from the item index, scaled by the global multiplier
//! 4. individual multiplier (shortname, then id)
//! 5. category hard limit, when > 0
//! 6. category multiplier, when > 1.0
//! 7. global multiplier
//!
//! Products are rounded half away from zero. Clamping to a valid stack size
//! happens when the value is written, see [`Resolution::stack_size`].

use serde::Serialize;

use super::config::OverrideConfig;
use super::error::{CoreError, CoreErrorCode};
use super::types::ItemIdentity;

/// Largest value the host accepts for a stack size.
pub const MAX_STACK_SIZE: u32 = i32::MAX as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rule {
    Ignored,
    IndividualHardLimit,
    CustomValue,
    IndividualMultiplier,
    CategoryHardLimit,
    CategoryMultiplier,
    GlobalMultiplier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { rule: Rule, value: u32 },
    /// A configured value could not be used; the baseline stands in.
    Degraded { baseline: u32, fault: CoreError },
}

impl Resolution {
    /// Unclamped result.
    pub fn value(&self) -> u32 {
        match self {
            Resolution::Resolved { value, .. } => *value,
            Resolution::Degraded { baseline, .. } => *baseline,
        }
    }

    /// Result as written to the live catalog.
    pub fn stack_size(&self) -> u32 {
        clamp_stack_size(self.value())
    }

    pub fn rule(&self) -> Option<Rule> {
        match self {
            Resolution::Resolved { rule, .. } => Some(*rule),
            Resolution::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Degraded { .. })
    }
}

pub fn clamp_stack_size(value: u32) -> u32 {
    value.clamp(1, MAX_STACK_SIZE)
}

pub fn resolve(
    identity: &ItemIdentity,
    baseline: u32,
    custom_stack_size: u32,
    config: &OverrideConfig,
) -> Resolution {
    match resolve_rule(identity, baseline, custom_stack_size, config) {
        Ok((rule, value)) => Resolution::Resolved { rule, value },
        Err(fault) => Resolution::Degraded { baseline, fault },
    }
}

fn resolve_rule(
    identity: &ItemIdentity,
    baseline: u32,
    custom_stack_size: u32,
    config: &OverrideConfig,
) -> Result<(Rule, u32), CoreError> {
    if config.is_ignored(identity) {
        return Ok((Rule::Ignored, baseline));
    }
    if let Some(limit) = config.individual_hard_limit(identity) {
        return Ok((Rule::IndividualHardLimit, limit));
    }
    if custom_stack_size > 0 {
        let value = scale(custom_stack_size, config.global_multiplier, "global")?;
        return Ok((Rule::CustomValue, value));
    }
    if let Some(multiplier) = config.individual_multiplier(identity) {
        let value = scale(baseline, multiplier, &identity.shortname)?;
        return Ok((Rule::IndividualMultiplier, value));
    }
    if let Some(limit) = config.category_hard_limit(identity.category) {
        return Ok((Rule::CategoryHardLimit, limit));
    }
    if let Some(multiplier) = config.category_multiplier(identity.category) {
        let value = scale(baseline, multiplier, identity.category.as_str())?;
        return Ok((Rule::CategoryMultiplier, value));
    }
    let value = scale(baseline, config.global_multiplier, "global")?;
    Ok((Rule::GlobalMultiplier, value))
}

fn scale(value: u32, multiplier: f64, source: &str) -> Result<u32, CoreError> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(CoreError::new(
            CoreErrorCode::ResolutionFault,
            format!("{source} multiplier {multiplier} is not a non-negative number"),
        ));
    }
    let scaled = (f64::from(value) * multiplier).round();
    Ok(scaled.min(f64::from(MAX_STACK_SIZE)) as u32)
}
