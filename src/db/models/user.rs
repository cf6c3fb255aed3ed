use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of gear and packs. Authentication lives outside the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}
