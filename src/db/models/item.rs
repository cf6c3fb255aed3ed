//! Gear item definitions.
//!
//! Items are owned by a user and shared across that user's packs. Pack
//! operations only ever touch the membership rows, never the item itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    /// Joined from `categories`; used as the aggregation key
    pub category_name: String,
    pub name: String,
    /// Grams per unit
    pub weight: i64,
    pub price: f64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input data for creating or updating an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub category_id: i64,
    pub name: String,
    pub weight: i64,
    pub price: f64,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub capacity: Option<String>,
    pub link: Option<String>,
}

impl NewItem {
    pub fn new(category_id: i64, name: impl Into<String>, weight: i64) -> Self {
        Self {
            category_id,
            name: name.into(),
            weight,
            ..Self::default()
        }
    }
}
