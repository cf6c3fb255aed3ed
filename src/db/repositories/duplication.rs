//! Deep copy of a pack: labels, memberships and label assignments are
//! replayed into a new pack with fresh identifiers.

use std::collections::HashMap;

use log::{info, warn};
use rusqlite::{params, Connection};

use crate::{
    db::{
        connection::Database,
        helpers::{ensure_pack_owner, now_timestamp},
        models::Pack,
        repositories::packs::PackRepository,
    },
    error::CoreResult,
};

const COPY_SUFFIX: &str = " Copy";

/// Copy `pack_id` into a new pack owned by `user_id` and return the new id.
///
/// Issues many statements and must run inside a transaction; see
/// [`Database::duplicate_pack`].
pub fn duplicate_pack_in(conn: &Connection, user_id: i64, pack_id: &str) -> CoreResult<String> {
    ensure_pack_owner(conn, user_id, pack_id)?;

    let packs = PackRepository::new(conn);
    let source = packs.load(pack_id)?;
    let new_pack_id = packs.insert_row(user_id, &format!("{}{COPY_SUFFIX}", source.name), &source.note)?;
    let now = now_timestamp();

    let mut label_ids: HashMap<i64, i64> = HashMap::with_capacity(source.labels.len());
    for label in &source.labels {
        conn.execute(
            "INSERT INTO pack_labels (pack_id, name, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![new_pack_id, label.name, label.color, now],
        )?;
        label_ids.insert(label.id, conn.last_insert_rowid());
    }

    let mut pack_item_ids: HashMap<i64, i64> = HashMap::with_capacity(source.items.len());
    for pack_item in &source.items {
        conn.execute(
            "INSERT INTO pack_items (pack_id, item_id, is_worn, count, worn_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new_pack_id,
                pack_item.item.id,
                pack_item.is_worn,
                pack_item.count,
                pack_item.worn_count,
                now,
            ],
        )?;
        pack_item_ids.insert(pack_item.id, conn.last_insert_rowid());
    }

    let mut skipped = 0usize;
    for assignment in source.items.iter().flat_map(|pi| pi.labels.iter()) {
        let mapped = (
            pack_item_ids.get(&assignment.pack_item_id),
            label_ids.get(&assignment.pack_label_id),
        );
        let (Some(&new_pack_item_id), Some(&new_label_id)) = mapped else {
            warn!(
                "Skipping label assignment {} while copying pack {pack_id}: unmapped reference",
                assignment.id
            );
            skipped += 1;
            continue;
        };

        conn.execute(
            "INSERT INTO item_labels (pack_item_id, pack_label_id, count, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_pack_item_id, new_label_id, assignment.count, now],
        )?;
    }

    info!(
        "Duplicated pack {pack_id} into {new_pack_id} ({} labels, {} items, {skipped} skipped assignments)",
        label_ids.len(),
        pack_item_ids.len()
    );
    Ok(new_pack_id)
}

impl Database {
    /// Duplicate a pack atomically. The transaction rolls back on drop, so any
    /// failure before `commit` leaves no trace of the copy.
    pub async fn duplicate_pack(&self, user_id: i64, pack_id: &str) -> CoreResult<Pack> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let new_pack_id = duplicate_pack_in(&tx, user_id, &pack_id)?;
            tx.commit()?;

            PackRepository::new(conn).load(&new_pack_id)
        })
        .await
    }
}
