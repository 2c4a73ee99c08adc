use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::category::ItemCategory;

/// Immutable description of an item type, as supplied by the host catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemIdentity {
    pub item_id: i32,
    pub shortname: String,
    #[serde(default)]
    pub display_name: String,
    pub category: ItemCategory,
    #[serde(default)]
    pub has_durability: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SchemaVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl SchemaVersion {
    pub const CURRENT: SchemaVersion = SchemaVersion::new(3, 2, 0);

    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts = value
            .trim()
            .split('.')
            .map(|part| part.parse::<u16>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid version '{value}': {e}"))?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            _ => Err(format!("invalid version '{value}', expected MAJOR.MINOR.PATCH")),
        }
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = SchemaVersion;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string such as \"3.1.2\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SchemaVersion, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

/// Key of an individual override. Operators may name an item either way;
/// lookups try the shortname first, then the numeric id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKey {
    ByShortname(String),
    ById(i32),
}

impl ItemKey {
    pub fn for_identity(identity: &ItemIdentity) -> [ItemKey; 2] {
        [
            ItemKey::ByShortname(identity.shortname.clone()),
            ItemKey::ById(identity.item_id),
        ]
    }

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<i32>() {
                return ItemKey::ById(id);
            }
        }
        ItemKey::ByShortname(trimmed.to_string())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKey::ByShortname(name) => f.write_str(name),
            ItemKey::ById(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for ItemKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = ItemKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an item shortname or numeric id")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ItemKey, E> {
                Ok(ItemKey::parse(value))
            }
        }

        deserializer.deserialize_str(KeyVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemReportRow {
    pub item_id: i32,
    pub shortname: String,
    pub category: ItemCategory,
    pub baseline: u32,
    pub custom: u32,
    pub effective: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryReportRow {
    pub category: ItemCategory,
    pub item_count: usize,
}

/// Counters produced by one application or revert pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PassReport {
    pub updated: usize,
    pub forced_baseline: usize,
    pub skipped: usize,
    pub degraded: usize,
}
