//! Minimal host inventory model: stacks, their nested state, and containers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub current: f32,
    pub max: f32,
}

impl Condition {
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

/// Component attached to the world entity an item spawns when held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeldEntity {
    Magazine {
        ammo_item_id: i32,
        contents: u32,
        capacity: u32,
    },
    FuelTank {
        fuel_item_id: i32,
        fuel: u32,
        capacity: u32,
    },
}

impl HeldEntity {
    /// Item id and quantity currently loaded, if any.
    pub fn loaded(&self) -> Option<(i32, u32)> {
        let (item_id, amount) = match *self {
            HeldEntity::Magazine {
                ammo_item_id,
                contents,
                ..
            } => (ammo_item_id, contents),
            HeldEntity::FuelTank {
                fuel_item_id, fuel, ..
            } => (fuel_item_id, fuel),
        };
        (amount > 0).then_some((item_id, amount))
    }

    pub fn clear(&mut self) {
        match self {
            HeldEntity::Magazine { contents, .. } => *contents = 0,
            HeldEntity::FuelTank { fuel, .. } => *fuel = 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: i32,
    pub amount: u32,
    #[serde(default)]
    pub skin: u64,
    #[serde(default)]
    pub blueprint_target: Option<i32>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub contents: Vec<ItemStack>,
    #[serde(default)]
    pub held: Option<HeldEntity>,
    #[serde(default)]
    pub liquid: bool,
    #[serde(default)]
    pub dirty: bool,
}

impl ItemStack {
    pub fn new(item_id: i32, amount: u32) -> Self {
        Self {
            item_id,
            amount,
            skin: 0,
            blueprint_target: None,
            condition: None,
            contents: Vec::new(),
            held: None,
            liquid: false,
            dirty: false,
        }
    }

    pub fn is_blueprint(&self) -> bool {
        self.blueprint_target.is_some()
    }

    /// True when the stack carries ammo, fuel or nested items.
    pub fn has_nested_state(&self) -> bool {
        !self.contents.is_empty() || self.held.and_then(|held| held.loaded()).is_some()
    }

    /// Units of `item_id` held by this stack, its nested contents and its
    /// held entity, counted recursively.
    pub fn units_of(&self, item_id: i32) -> u64 {
        let own = if self.item_id == item_id {
            u64::from(self.amount)
        } else {
            0
        };
        let loaded = match self.held.and_then(|held| held.loaded()) {
            Some((loaded_id, amount)) if loaded_id == item_id => u64::from(amount),
            _ => 0,
        };
        let nested: u64 = self
            .contents
            .iter()
            .map(|child| child.units_of(item_id))
            .sum();
        own + loaded + nested
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    PlayerInventory,
    Processing,
    Storage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,
    pub capacity: usize,
    #[serde(default)]
    pub items: Vec<ItemStack>,
}

impl Container {
    pub fn new(kind: ContainerKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            items: Vec::new(),
        }
    }

    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn units_of(&self, item_id: i32) -> u64 {
        self.items.iter().map(|item| item.units_of(item_id)).sum()
    }
}

/// Host-side item construction. A freshly created item carries whatever
/// default nested state its definition prescribes.
pub trait ItemFactory {
    fn create(&self, item_id: i32, amount: u32, skin: u64) -> Option<ItemStack>;
}
