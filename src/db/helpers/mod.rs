use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, CoreResult};

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    format_datetime(Utc::now())
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Resolve a pack's owner, failing with `NotFound` for a missing pack and
/// `Unauthorized` when someone else owns it.
pub fn ensure_pack_owner(conn: &Connection, user_id: i64, pack_id: &str) -> CoreResult<()> {
    let owner: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM packs WHERE id = ?1",
            params![pack_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        None => Err(CoreError::not_found(format!("pack {pack_id}"))),
        Some(owner) if owner != user_id => Err(CoreError::Unauthorized),
        Some(_) => Ok(()),
    }
}

/// Same as [`ensure_pack_owner`], starting from a pack item. Returns the pack id.
pub fn ensure_pack_item_owner(
    conn: &Connection,
    user_id: i64,
    pack_item_id: i64,
) -> CoreResult<String> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT p.id, p.user_id
             FROM pack_items pi
             JOIN packs p ON p.id = pi.pack_id
             WHERE pi.id = ?1",
            params![pack_item_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        None => Err(CoreError::not_found(format!("pack item {pack_item_id}"))),
        Some((_, owner)) if owner != user_id => Err(CoreError::Unauthorized),
        Some((pack_id, _)) => Ok(pack_id),
    }
}

/// Bump `updated_at` so the pack sorts first in recency lists.
pub fn touch_pack(conn: &Connection, pack_id: &str) -> CoreResult<()> {
    conn.execute(
        "UPDATE packs SET updated_at = ?1 WHERE id = ?2",
        params![now_timestamp(), pack_id],
    )?;
    Ok(())
}
