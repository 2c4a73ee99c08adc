use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse item grouping used by the bulk override rules.
///
/// `All` is a pseudo-category the host uses for filtering; it never owns
/// items and is left out of [`ItemCategory::INDEXED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemCategory {
    Weapon,
    Construction,
    Items,
    Resources,
    Attire,
    Tool,
    Medical,
    Food,
    Ammunition,
    Traps,
    Misc,
    All,
    Common,
    Component,
    Search,
    Favourite,
    Electrical,
    Fun,
}

impl ItemCategory {
    pub const INDEXED: [ItemCategory; 17] = [
        Self::Weapon,
        Self::Construction,
        Self::Items,
        Self::Resources,
        Self::Attire,
        Self::Tool,
        Self::Medical,
        Self::Food,
        Self::Ammunition,
        Self::Traps,
        Self::Misc,
        Self::Common,
        Self::Component,
        Self::Search,
        Self::Favourite,
        Self::Electrical,
        Self::Fun,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Weapon => "Weapon",
            Self::Construction => "Construction",
            Self::Items => "Items",
            Self::Resources => "Resources",
            Self::Attire => "Attire",
            Self::Tool => "Tool",
            Self::Medical => "Medical",
            Self::Food => "Food",
            Self::Ammunition => "Ammunition",
            Self::Traps => "Traps",
            Self::Misc => "Misc",
            Self::All => "All",
            Self::Common => "Common",
            Self::Component => "Component",
            Self::Search => "Search",
            Self::Favourite => "Favourite",
            Self::Electrical => "Electrical",
            Self::Fun => "Fun",
        }
    }

    pub fn is_indexed(&self) -> bool {
        *self != Self::All
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = String;

    /// Case-insensitive, matching how operators type category names.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Self::INDEXED
            .iter()
            .copied()
            .find(|category| category.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown item category '{value}'"))
    }
}

impl Serialize for ItemCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryVisitor;

        impl Visitor<'_> for CategoryVisitor {
            type Value = ItemCategory;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an item category name")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<ItemCategory, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(CategoryVisitor)
    }
}
