use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::ItemCategory;
use crate::inventory::{Condition, HeldEntity, ItemFactory, ItemStack};

use super::error::{CoreError, CoreErrorCode};
use super::types::{ItemIdentity, ItemKey};

const DEFAULT_MAX_CONDITION: f32 = 100.0;

/// The host's live item registry. `stack_size` is the value the simulation
/// currently enforces; the application pass rewrites it.
pub trait ItemCatalog {
    fn identities(&self) -> Vec<ItemIdentity>;
    fn find_by_id(&self, item_id: i32) -> Option<ItemIdentity>;
    fn find_by_shortname(&self, shortname: &str) -> Option<ItemIdentity>;
    fn stack_size(&self, item_id: i32) -> Option<u32>;
    fn set_stack_size(&mut self, item_id: i32, stack_size: u32) -> bool;

    /// Shortname first, then numeric id.
    fn find(&self, shortname_or_id: &str) -> Option<ItemIdentity> {
        let trimmed = shortname_or_id.trim();
        self.find_by_shortname(trimmed)
            .or_else(|| match ItemKey::parse(trimmed) {
                ItemKey::ById(id) => self.find_by_id(id),
                ItemKey::ByShortname(_) => None,
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeldTemplate {
    Magazine { ammo_item_id: i32, capacity: u32 },
    FuelTank { fuel_item_id: i32, capacity: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentTemplate {
    pub item_id: i32,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub item_id: i32,
    pub shortname: String,
    #[serde(default)]
    pub display_name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub has_durability: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_condition: Option<f32>,
    pub stackable: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub liquid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held: Option<HeldTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentTemplate>,
}

impl ItemDefinition {
    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity {
            item_id: self.item_id,
            shortname: self.shortname.clone(),
            display_name: self.display_name.clone(),
            category: self.category,
            has_durability: self.has_durability,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct CatalogFile {
    items: Vec<ItemDefinition>,
}

/// JSON-backed catalog used by the CLI host and by tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCatalog {
    definitions: Vec<ItemDefinition>,
    by_id: BTreeMap<i32, usize>,
    by_shortname: BTreeMap<String, usize>,
}

impl MemoryCatalog {
    pub fn from_definitions(definitions: Vec<ItemDefinition>) -> Result<Self, CoreError> {
        let mut by_id = BTreeMap::new();
        let mut by_shortname = BTreeMap::new();
        for (position, definition) in definitions.iter().enumerate() {
            if by_id.insert(definition.item_id, position).is_some() {
                return Err(CoreError::parse(format!(
                    "duplicate item id {} in catalog",
                    definition.item_id
                )));
            }
            if by_shortname
                .insert(definition.shortname.clone(), position)
                .is_some()
            {
                return Err(CoreError::parse(format!(
                    "duplicate shortname '{}' in catalog",
                    definition.shortname
                )));
            }
        }

        Ok(Self {
            definitions,
            by_id,
            by_shortname,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| CoreError::parse(format!("failed to parse item catalog: {e}")))?;
        if file.items.is_empty() {
            return Err(CoreError::parse("item catalog contains no items"));
        }
        Self::from_definitions(file.items)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, CoreError> {
        let file = CatalogFile {
            items: self.definitions.clone(),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| CoreError::parse(format!("failed to serialize item catalog: {e}")))
    }

    pub fn definition(&self, item_id: i32) -> Option<&ItemDefinition> {
        self.by_id
            .get(&item_id)
            .map(|&position| &self.definitions[position])
    }

    pub fn definitions(&self) -> &[ItemDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl ItemCatalog for MemoryCatalog {
    fn identities(&self) -> Vec<ItemIdentity> {
        self.definitions.iter().map(ItemDefinition::identity).collect()
    }

    fn find_by_id(&self, item_id: i32) -> Option<ItemIdentity> {
        self.definition(item_id).map(ItemDefinition::identity)
    }

    fn find_by_shortname(&self, shortname: &str) -> Option<ItemIdentity> {
        self.by_shortname
            .get(shortname)
            .map(|&position| self.definitions[position].identity())
    }

    fn stack_size(&self, item_id: i32) -> Option<u32> {
        self.definition(item_id).map(|definition| definition.stackable)
    }

    fn set_stack_size(&mut self, item_id: i32, stack_size: u32) -> bool {
        let Some(&position) = self.by_id.get(&item_id) else {
            return false;
        };
        self.definitions[position].stackable = stack_size;
        true
    }
}

impl ItemFactory for MemoryCatalog {
    fn create(&self, item_id: i32, amount: u32, skin: u64) -> Option<ItemStack> {
        let definition = self.definition(item_id)?;
        let mut stack = ItemStack::new(item_id, amount);
        stack.skin = skin;
        stack.liquid = definition.liquid;
        if definition.has_durability {
            stack.condition = Some(Condition::full(
                definition.max_condition.unwrap_or(DEFAULT_MAX_CONDITION),
            ));
        }
        stack.held = definition.held.map(|template| match template {
            HeldTemplate::Magazine {
                ammo_item_id,
                capacity,
            } => HeldEntity::Magazine {
                ammo_item_id,
                contents: capacity,
                capacity,
            },
            HeldTemplate::FuelTank {
                fuel_item_id,
                capacity,
            } => HeldEntity::FuelTank {
                fuel_item_id,
                fuel: capacity,
                capacity,
            },
        });
        stack.contents = definition
            .contents
            .iter()
            .filter_map(|child| self.create(child.item_id, child.amount, 0))
            .collect();
        Some(stack)
    }
}
