use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::category::ItemCategory;

use super::error::CoreError;
use super::types::{ItemIdentity, ItemKey, SchemaVersion};

/// What the forward and revert passes do with ignore-listed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnorePolicy {
    #[default]
    ResetToBaseline,
    LeaveUntouched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverrideConfig {
    pub revert_on_unload: bool,
    pub allow_stacking_with_durability: bool,
    pub hide_message_prefix: bool,
    pub leave_weapon_state: bool,
    pub ignore_policy: IgnorePolicy,
    pub global_multiplier: f64,
    pub category_multipliers: BTreeMap<ItemCategory, f64>,
    pub category_hard_limits: BTreeMap<ItemCategory, u32>,
    pub individual_multipliers: BTreeMap<ItemKey, f64>,
    pub individual_hard_limits: BTreeMap<ItemKey, u32>,
    pub ignored_items: BTreeSet<String>,
    pub version: SchemaVersion,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            revert_on_unload: true,
            allow_stacking_with_durability: true,
            hide_message_prefix: false,
            leave_weapon_state: false,
            ignore_policy: IgnorePolicy::default(),
            global_multiplier: 1.0,
            category_multipliers: ItemCategory::INDEXED.iter().map(|&c| (c, 1.0)).collect(),
            category_hard_limits: ItemCategory::INDEXED.iter().map(|&c| (c, 0)).collect(),
            individual_multipliers: BTreeMap::new(),
            individual_hard_limits: BTreeMap::new(),
            ignored_items: BTreeSet::new(),
            version: SchemaVersion::CURRENT,
        }
    }
}

/// Keys that were absent (or null) in the stored document and were filled
/// from defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigIntegrity {
    pub backfilled: Vec<String>,
}

impl ConfigIntegrity {
    pub fn is_clean(&self) -> bool {
        self.backfilled.is_empty()
    }
}

impl OverrideConfig {
    /// Parses a stored document, backfilling anything missing from defaults.
    pub fn from_json_with_backfill(json: &str) -> Result<(Self, ConfigIntegrity), CoreError> {
        let raw: JsonValue = serde_json::from_str(json)
            .map_err(|e| CoreError::parse(format!("failed to parse configuration: {e}")))?;
        let mut object = match raw {
            JsonValue::Object(object) => object,
            JsonValue::Null => JsonMap::new(),
            other => {
                return Err(CoreError::parse(format!(
                    "configuration must be a JSON object, found {other}"
                )));
            }
        };

        let mut integrity = ConfigIntegrity::default();
        let defaults = serde_json::to_value(Self::default())
            .map_err(|e| CoreError::parse(format!("failed to render default configuration: {e}")))?;
        if let JsonValue::Object(default_object) = defaults {
            for key in default_object.keys() {
                if object.get(key).is_none_or(JsonValue::is_null) {
                    object.remove(key);
                    integrity.backfilled.push(key.clone());
                }
            }
        }

        let mut config: Self = serde_json::from_value(JsonValue::Object(object))
            .map_err(|e| CoreError::parse(format!("invalid configuration: {e}")))?;
        integrity
            .backfilled
            .extend(config.backfill_categories());
        Ok((config, integrity))
    }

    /// Ensures one entry per indexed category in both category maps.
    pub fn backfill_categories(&mut self) -> Vec<String> {
        let mut filled = Vec::new();
        self.category_multipliers.remove(&ItemCategory::All);
        self.category_hard_limits.remove(&ItemCategory::All);
        for category in ItemCategory::INDEXED {
            if !self.category_multipliers.contains_key(&category) {
                self.category_multipliers.insert(category, 1.0);
                filled.push(format!("category_multipliers.{category}"));
            }
            if !self.category_hard_limits.contains_key(&category) {
                self.category_hard_limits.insert(category, 0);
                filled.push(format!("category_hard_limits.{category}"));
            }
        }
        filled
    }

    pub fn is_ignored(&self, identity: &ItemIdentity) -> bool {
        self.ignored_items.contains(&identity.shortname)
    }

    pub fn individual_hard_limit(&self, identity: &ItemIdentity) -> Option<u32> {
        ItemKey::for_identity(identity)
            .iter()
            .find_map(|key| self.individual_hard_limits.get(key).copied())
    }

    pub fn individual_multiplier(&self, identity: &ItemIdentity) -> Option<f64> {
        ItemKey::for_identity(identity)
            .iter()
            .find_map(|key| self.individual_multipliers.get(key).copied())
    }

    pub fn category_hard_limit(&self, category: ItemCategory) -> Option<u32> {
        self.category_hard_limits
            .get(&category)
            .copied()
            .filter(|&limit| limit > 0)
    }

    pub fn category_multiplier(&self, category: ItemCategory) -> Option<f64> {
        self.category_multipliers
            .get(&category)
            .copied()
            .filter(|&multiplier| multiplier > 1.0)
    }

    /// Drops every individual override keyed by either name of the item.
    pub fn clear_individual(&mut self, identity: &ItemIdentity) -> bool {
        let mut removed = false;
        for key in ItemKey::for_identity(identity) {
            removed |= self.individual_multipliers.remove(&key).is_some();
            removed |= self.individual_hard_limits.remove(&key).is_some();
        }
        removed
    }
}
