//! Label-related data models.
//!
//! A `PackLabel` is a named, colored tag scoped to one pack. An `ItemLabel` is
//! its assignment to a pack item, with a count of how many of the item's units
//! carry it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a label defined on a single pack
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackLabel {
    pub id: i64,
    pub pack_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A label assignment as seen from the pack item that carries it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemLabel {
    pub id: i64,
    pub pack_item_id: i64,
    pub pack_label_id: i64,
    pub name: String,
    pub color: String,
    pub count: i64,
}
