//! Quantity and worn-count bookkeeping for items inside a pack.
//!
//! Every stored membership satisfies `count >= 1` and
//! `0 <= worn_count <= count`; `is_worn` mirrors `worn_count > 0`. A membership
//! whose count would drop to zero is deleted instead.

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    db::{
        connection::Database,
        helpers::{ensure_pack_owner, now_timestamp, touch_pack},
        models::Membership,
    },
    error::{CoreError, CoreResult},
};

pub struct PackItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PackItemRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn find(&self, pack_id: &str, item_id: i64) -> CoreResult<Option<Membership>> {
        let membership = self
            .conn
            .query_row(
                "SELECT id, pack_id, item_id, count, worn_count, is_worn
                 FROM pack_items
                 WHERE pack_id = ?1 AND item_id = ?2",
                params![pack_id, item_id],
                |row| {
                    Ok(Membership {
                        id: row.get(0)?,
                        pack_id: row.get(1)?,
                        item_id: row.get(2)?,
                        count: row.get(3)?,
                        worn_count: row.get(4)?,
                        is_worn: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(membership)
    }

    fn require(&self, pack_id: &str, item_id: i64) -> CoreResult<Membership> {
        self.find(pack_id, item_id)?.ok_or_else(|| {
            CoreError::not_found(format!("item {item_id} in pack {pack_id}"))
        })
    }

    /// Add one unit of an item. The first add creates the membership.
    pub fn add_item(&self, user_id: i64, pack_id: &str, item_id: i64) -> CoreResult<Membership> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;

        let owns_item: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM items WHERE id = ?1 AND user_id = ?2",
                params![item_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owns_item.is_none() {
            return Err(CoreError::not_found(format!("item {item_id}")));
        }

        self.conn.execute(
            "INSERT INTO pack_items (pack_id, item_id, is_worn, count, worn_count, created_at)
             VALUES (?1, ?2, 0, 1, 0, ?3)
             ON CONFLICT(pack_id, item_id) DO UPDATE SET
                 count = pack_items.count + 1",
            params![pack_id, item_id, now_timestamp()],
        )?;
        touch_pack(self.conn, pack_id)?;

        self.require(pack_id, item_id)
    }

    /// Remove one unit. Returns the remaining membership, or `None` once the
    /// last unit is gone and the row has been deleted.
    pub fn remove_item(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
    ) -> CoreResult<Option<Membership>> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        let membership = self.require(pack_id, item_id)?;

        let remaining = if membership.count <= 1 {
            self.conn
                .execute("DELETE FROM pack_items WHERE id = ?1", params![membership.id])?;
            None
        } else {
            let count = membership.count - 1;
            let worn_count = membership.worn_count.min(count);
            self.conn.execute(
                "UPDATE pack_items SET count = ?1, worn_count = ?2, is_worn = ?3 WHERE id = ?4",
                params![count, worn_count, worn_count > 0, membership.id],
            )?;
            Some(Membership {
                count,
                worn_count,
                is_worn: worn_count > 0,
                ..membership
            })
        };

        touch_pack(self.conn, pack_id)?;
        Ok(remaining)
    }

    fn write_worn_count(&self, membership: Membership, worn_count: i64) -> CoreResult<Membership> {
        self.conn.execute(
            "UPDATE pack_items SET worn_count = ?1, is_worn = ?2 WHERE id = ?3",
            params![worn_count, worn_count > 0, membership.id],
        )?;
        touch_pack(self.conn, &membership.pack_id)?;

        Ok(Membership {
            worn_count,
            is_worn: worn_count > 0,
            ..membership
        })
    }

    /// Set how many units are worn. Out-of-range requests are clamped into
    /// `[0, count]` rather than rejected.
    pub fn set_worn_count(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
        requested: i64,
    ) -> CoreResult<Membership> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        let membership = self.require(pack_id, item_id)?;
        let worn_count = requested.clamp(0, membership.count);
        self.write_worn_count(membership, worn_count)
    }

    /// Checkbox-style toggle: all units worn, or none.
    pub fn toggle_worn(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
        is_worn: bool,
    ) -> CoreResult<Membership> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        let membership = self.require(pack_id, item_id)?;
        let worn_count = if is_worn { membership.count } else { 0 };
        self.write_worn_count(membership, worn_count)
    }
}

impl Database {
    pub async fn add_item(&self, user_id: i64, pack_id: &str, item_id: i64) -> CoreResult<Membership> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| PackItemRepository::new(conn).add_item(user_id, &pack_id, item_id))
            .await
    }

    pub async fn remove_item(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
    ) -> CoreResult<Option<Membership>> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| {
            PackItemRepository::new(conn).remove_item(user_id, &pack_id, item_id)
        })
        .await
    }

    pub async fn set_worn_count(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
        requested: i64,
    ) -> CoreResult<Membership> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| {
            PackItemRepository::new(conn).set_worn_count(user_id, &pack_id, item_id, requested)
        })
        .await
    }

    pub async fn toggle_worn(
        &self,
        user_id: i64,
        pack_id: &str,
        item_id: i64,
        is_worn: bool,
    ) -> CoreResult<Membership> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| {
            PackItemRepository::new(conn).toggle_worn(user_id, &pack_id, item_id, is_worn)
        })
        .await
    }
}
