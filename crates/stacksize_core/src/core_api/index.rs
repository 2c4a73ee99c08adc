use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::ItemCategory;

use super::baseline::BaselineTable;
use super::item_catalog::ItemCatalog;
use super::types::{ItemIdentity, SchemaVersion};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIndexEntry {
    pub item_id: i32,
    pub shortname: String,
    #[serde(default)]
    pub has_durability: bool,
    pub vanilla_stack_size: u32,
    /// Zero means unset.
    #[serde(default)]
    pub custom_stack_size: u32,
}

impl ItemIndexEntry {
    pub fn new(identity: &ItemIdentity, vanilla_stack_size: u32) -> Self {
        Self {
            item_id: identity.item_id,
            shortname: identity.shortname.clone(),
            has_durability: identity.has_durability,
            vanilla_stack_size,
            custom_stack_size: 0,
        }
    }
}

/// Per-category bookkeeping of every known item. Entries are appended,
/// never pruned; stale entries for items the catalog no longer has stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIndex {
    pub item_categories: BTreeMap<ItemCategory, Vec<ItemIndexEntry>>,
    /// Unversioned documents predate every migration.
    #[serde(default)]
    pub version: SchemaVersion,
}

impl ItemIndex {
    pub fn empty(version: SchemaVersion) -> Self {
        Self {
            item_categories: ItemCategory::INDEXED
                .iter()
                .map(|&category| (category, Vec::new()))
                .collect(),
            version,
        }
    }

    /// Fresh index from the catalog. Cached baselines come from `baseline`
    /// when it knows the item, otherwise from the catalog's current value.
    pub fn build<C: ItemCatalog + ?Sized>(catalog: &C, baseline: &BaselineTable) -> Self {
        let mut index = Self::empty(SchemaVersion::CURRENT);
        index.top_up(catalog, baseline);
        index
    }

    pub fn is_empty(&self) -> bool {
        self.item_categories.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.item_categories.values().map(Vec::len).sum()
    }

    /// Restores the exact indexed category set: missing buckets are added,
    /// the `All` pseudo-category is folded away.
    pub fn normalize(&mut self) {
        if let Some(stray) = self.item_categories.remove(&ItemCategory::All) {
            self.item_categories
                .entry(ItemCategory::Misc)
                .or_default()
                .extend(stray);
        }
        for category in ItemCategory::INDEXED {
            self.item_categories.entry(category).or_default();
        }
    }

    pub fn entry(&self, category: ItemCategory, item_id: i32) -> Option<&ItemIndexEntry> {
        self.item_categories
            .get(&bucket_for(category))?
            .iter()
            .find(|entry| entry.item_id == item_id)
    }

    pub fn entry_mut(&mut self, category: ItemCategory, item_id: i32) -> Option<&mut ItemIndexEntry> {
        self.item_categories
            .get_mut(&bucket_for(category))?
            .iter_mut()
            .find(|entry| entry.item_id == item_id)
    }

    /// Searches every bucket; used when the catalog no longer knows the item.
    pub fn find_by_id(&self, item_id: i32) -> Option<(ItemCategory, &ItemIndexEntry)> {
        self.item_categories.iter().find_map(|(category, entries)| {
            entries
                .iter()
                .find(|entry| entry.item_id == item_id)
                .map(|entry| (*category, entry))
        })
    }

    /// Inserts an entry for `identity` unless one exists. Returns whether an
    /// entry was created.
    pub fn insert_if_absent(&mut self, identity: &ItemIdentity, vanilla_stack_size: u32) -> bool {
        let bucket = self
            .item_categories
            .entry(bucket_for(identity.category))
            .or_default();
        if bucket.iter().any(|entry| entry.item_id == identity.item_id) {
            return false;
        }
        bucket.push(ItemIndexEntry::new(identity, vanilla_stack_size));
        true
    }

    /// Appends entries for catalog items the index does not know yet.
    pub fn top_up<C: ItemCatalog + ?Sized>(&mut self, catalog: &C, baseline: &BaselineTable) -> usize {
        let mut added = 0;
        for identity in catalog.identities() {
            let vanilla = baseline
                .get(&identity.shortname)
                .or_else(|| catalog.stack_size(identity.item_id))
                .unwrap_or(0);
            if self.insert_if_absent(&identity, vanilla) {
                added += 1;
            }
        }
        added
    }

    /// Rewrites every cached baseline the table knows about. Custom values
    /// are left alone.
    pub fn refresh_baselines<C: ItemCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        baseline: &BaselineTable,
    ) -> usize {
        self.top_up(catalog, baseline);
        let mut refreshed = 0;
        for identity in catalog.identities() {
            let Some(vanilla) = baseline.get(&identity.shortname) else {
                continue;
            };
            if let Some(entry) = self.entry_mut(identity.category, identity.item_id) {
                entry.vanilla_stack_size = vanilla;
                entry.has_durability = identity.has_durability;
                refreshed += 1;
            }
        }
        refreshed
    }

    pub fn custom_value_count(&self) -> usize {
        self.item_categories
            .values()
            .flatten()
            .filter(|entry| entry.custom_stack_size > 0)
            .count()
    }

    pub fn category_len(&self, category: ItemCategory) -> usize {
        self.item_categories.get(&category).map_or(0, Vec::len)
    }
}

/// Items the host files under `All` are kept with `Misc`.
fn bucket_for(category: ItemCategory) -> ItemCategory {
    if category.is_indexed() {
        category
    } else {
        ItemCategory::Misc
    }
}
