//! Pack and membership data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Item, ItemLabel, PackLabel};

/// A hydrated pack: memberships with their item and label assignments, plus
/// the labels defined on the pack.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: String,
    pub user_id: i64,
    pub short_id: Option<String>,
    pub name: String,
    pub note: String,
    pub is_public: bool,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<PackItem>,
    pub labels: Vec<PackLabel>,
}

impl Pack {
    pub fn find_item(&self, item_id: i64) -> Option<&PackItem> {
        self.items.iter().find(|pi| pi.item.id == item_id)
    }

    pub fn find_label(&self, name: &str) -> Option<&PackLabel> {
        self.labels.iter().find(|label| label.name == name)
    }
}

/// Membership of an item in a pack.
///
/// `count >= 1` and `0 <= worn_count <= count` hold for every stored row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackItem {
    pub id: i64,
    pub pack_id: String,
    pub item: Item,
    pub count: i64,
    pub worn_count: i64,
    pub is_worn: bool,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<ItemLabel>,
}

impl PackItem {
    /// Units packed rather than worn
    pub fn carried_count(&self) -> i64 {
        self.count - self.worn_count
    }
}

/// Pack row without its memberships, for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackSummary {
    pub id: String,
    pub short_id: Option<String>,
    pub name: String,
    pub note: String,
    pub is_public: bool,
    pub is_locked: bool,
    /// Sum of membership counts
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts of a single membership row, returned by the quantity operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i64,
    pub pack_id: String,
    pub item_id: i64,
    pub count: i64,
    pub worn_count: i64,
    pub is_worn: bool,
}
