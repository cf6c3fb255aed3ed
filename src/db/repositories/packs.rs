use std::collections::HashMap;

use anyhow::Result;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{ensure_pack_owner, now_timestamp, parse_datetime},
        models::{validation::validate_name, ItemLabel, Pack, PackItem, PackSummary},
        repositories::{items::row_to_item, labels::LabelRepository},
    },
    error::{CoreError, CoreResult},
    ids::{new_pack_id, new_short_id_with, ShortIdConfig},
};

fn row_to_pack(row: &Row) -> Result<Pack> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Pack {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        short_id: row.get("short_id")?,
        name: row.get("name")?,
        note: row.get("note")?,
        is_public: row.get("is_public")?,
        is_locked: row.get("is_locked")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        items: Vec::new(),
        labels: Vec::new(),
    })
}

fn row_to_summary(row: &Row) -> Result<PackSummary> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(PackSummary {
        id: row.get("id")?,
        short_id: row.get("short_id")?,
        name: row.get("name")?,
        note: row.get("note")?,
        is_public: row.get("is_public")?,
        is_locked: row.get("is_locked")?,
        item_count: row.get("item_count")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn row_to_pack_item(row: &Row) -> Result<PackItem> {
    let created_at: String = row.get("pack_item_created_at")?;

    Ok(PackItem {
        id: row.get("pack_item_id")?,
        pack_id: row.get("pack_id")?,
        item: row_to_item(row)?,
        count: row.get("count")?,
        worn_count: row.get("worn_count")?,
        is_worn: row.get("is_worn")?,
        created_at: parse_datetime(&created_at, "pack_items.created_at")?,
        labels: Vec::new(),
    })
}

fn row_to_item_label(row: &Row) -> Result<ItemLabel> {
    Ok(ItemLabel {
        id: row.get("id")?,
        pack_item_id: row.get("pack_item_id")?,
        pack_label_id: row.get("pack_label_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        count: row.get("count")?,
    })
}

pub struct PackRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PackRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a bare pack row with a fresh UUID and return its id.
    pub(crate) fn insert_row(&self, user_id: i64, name: &str, note: &str) -> CoreResult<String> {
        let id = new_pack_id();
        let now = now_timestamp();
        self.conn.execute(
            "INSERT INTO packs (id, user_id, name, note, is_public, is_locked, short_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, 0, NULL, ?5, ?5)",
            params![id, user_id, name, note, now],
        )?;
        Ok(id)
    }

    pub fn create(&self, user_id: i64, name: &str, note: &str) -> CoreResult<Pack> {
        let name = validate_name(name, "pack")?;
        let id = self.insert_row(user_id, &name, note)?;
        self.load(&id)
    }

    /// Load a pack with every membership, its item, and label assignments.
    ///
    /// No ownership check; use [`PackRepository::get`] for caller-scoped reads.
    pub fn load(&self, pack_id: &str) -> CoreResult<Pack> {
        let mut pack = self
            .conn
            .query_row(
                "SELECT id, user_id, short_id, name, note, is_public, is_locked, created_at, updated_at
                 FROM packs WHERE id = ?1",
                params![pack_id],
                |row| Ok(row_to_pack(row)),
            )
            .optional()?
            .transpose()?
            .ok_or_else(|| CoreError::not_found(format!("pack {pack_id}")))?;

        let mut stmt = self.conn.prepare(
            "SELECT pi.id AS pack_item_id, pi.pack_id, pi.count, pi.worn_count, pi.is_worn,
                    pi.created_at AS pack_item_created_at,
                    i.id, i.user_id, i.category_id, c.name AS category_name, i.name,
                    i.weight, i.price, i.brand, i.model, i.capacity, i.link,
                    i.created_at, i.updated_at
             FROM pack_items pi
             JOIN items i ON i.id = pi.item_id
             JOIN categories c ON c.id = i.category_id
             WHERE pi.pack_id = ?1
             ORDER BY c.name ASC, i.name ASC, pi.id ASC",
        )?;
        let mut rows = stmt.query(params![pack_id])?;
        while let Some(row) = rows.next()? {
            pack.items.push(row_to_pack_item(row)?);
        }

        let mut assignments: HashMap<i64, Vec<ItemLabel>> = HashMap::new();
        let mut stmt = self.conn.prepare(
            "SELECT il.id, il.pack_item_id, il.pack_label_id, pl.name, pl.color, il.count
             FROM item_labels il
             JOIN pack_labels pl ON pl.id = il.pack_label_id
             JOIN pack_items pi ON pi.id = il.pack_item_id
             WHERE pi.pack_id = ?1
             ORDER BY pl.name ASC, il.id ASC",
        )?;
        let mut rows = stmt.query(params![pack_id])?;
        while let Some(row) = rows.next()? {
            let label = row_to_item_label(row)?;
            assignments.entry(label.pack_item_id).or_default().push(label);
        }
        for pack_item in &mut pack.items {
            if let Some(labels) = assignments.remove(&pack_item.id) {
                pack_item.labels = labels;
            }
        }

        pack.labels = LabelRepository::new(self.conn).list(pack_id)?;
        Ok(pack)
    }

    pub fn get(&self, user_id: i64, pack_id: &str) -> CoreResult<Pack> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        self.load(pack_id)
    }

    /// Resolve a share link. Private packs are reported as missing even if the
    /// short id still exists.
    pub fn get_public(&self, short_id: &str) -> CoreResult<Pack> {
        let pack_id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM packs WHERE short_id = ?1 AND is_public = 1",
                params![short_id],
                |row| row.get(0),
            )
            .optional()?;

        match pack_id {
            Some(id) => self.load(&id),
            None => Err(CoreError::not_found(format!("public pack {short_id}"))),
        }
    }

    /// The caller's packs, most recently modified first
    pub fn list(&self, user_id: i64) -> CoreResult<Vec<PackSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.short_id, p.name, p.note, p.is_public, p.is_locked,
                    p.created_at, p.updated_at,
                    COALESCE(SUM(pi.count), 0) AS item_count
             FROM packs p
             LEFT JOIN pack_items pi ON pi.pack_id = p.id
             WHERE p.user_id = ?1
             GROUP BY p.id
             ORDER BY p.updated_at DESC, p.created_at DESC",
        )?;

        let mut rows = stmt.query(params![user_id])?;
        let mut packs = Vec::new();
        while let Some(row) = rows.next()? {
            packs.push(row_to_summary(row)?);
        }
        Ok(packs)
    }

    pub fn update(&self, user_id: i64, pack_id: &str, name: &str, note: &str) -> CoreResult<Pack> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        let name = validate_name(name, "pack")?;
        self.conn.execute(
            "UPDATE packs SET name = ?1, note = ?2, updated_at = ?3 WHERE id = ?4",
            params![name, note, now_timestamp(), pack_id],
        )?;
        self.load(pack_id)
    }

    pub fn set_locked(&self, user_id: i64, pack_id: &str, locked: bool) -> CoreResult<()> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        self.conn.execute(
            "UPDATE packs SET is_locked = ?1, updated_at = ?2 WHERE id = ?3",
            params![locked, now_timestamp(), pack_id],
        )?;
        Ok(())
    }

    pub fn short_id_taken(&self, candidate: &str) -> CoreResult<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM packs WHERE short_id = ?1)",
            params![candidate],
            |row| row.get(0),
        )?)
    }

    /// Change visibility. Going public assigns a short id if the pack has none;
    /// an existing short id is kept in both directions.
    pub fn set_public(
        &self,
        user_id: i64,
        pack_id: &str,
        public: bool,
        short_id_config: &ShortIdConfig,
    ) -> CoreResult<Pack> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;

        let current: Option<String> = self.conn.query_row(
            "SELECT short_id FROM packs WHERE id = ?1",
            params![pack_id],
            |row| row.get(0),
        )?;

        let short_id = match current {
            None if public => {
                let generated =
                    new_short_id_with(short_id_config, |candidate| self.short_id_taken(candidate))?;
                info!("Assigned short id {generated} to pack {pack_id}");
                Some(generated)
            }
            other => other,
        };

        self.conn.execute(
            "UPDATE packs SET is_public = ?1, short_id = ?2, updated_at = ?3 WHERE id = ?4",
            params![public, short_id, now_timestamp(), pack_id],
        )?;
        self.load(pack_id)
    }

    /// Delete a pack. Memberships, labels and assignments cascade; items stay.
    pub fn delete(&self, user_id: i64, pack_id: &str) -> CoreResult<()> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        self.conn
            .execute("DELETE FROM packs WHERE id = ?1", params![pack_id])?;
        Ok(())
    }
}

impl Database {
    pub async fn create_pack(&self, user_id: i64, name: &str, note: &str) -> CoreResult<Pack> {
        let name = name.to_string();
        let note = note.to_string();
        self.execute(move |conn| PackRepository::new(conn).create(user_id, &name, &note))
            .await
    }

    /// Hydrated pack by id, for handler code that has already authorized the read
    pub async fn load_pack_with_items(&self, pack_id: &str) -> CoreResult<Pack> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| PackRepository::new(conn).load(&pack_id))
            .await
    }

    pub async fn get_pack(&self, user_id: i64, pack_id: &str) -> CoreResult<Pack> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| PackRepository::new(conn).get(user_id, &pack_id))
            .await
    }

    pub async fn get_public_pack(&self, short_id: &str) -> CoreResult<Pack> {
        let short_id = short_id.to_string();
        self.execute(move |conn| PackRepository::new(conn).get_public(&short_id))
            .await
    }

    pub async fn list_packs(&self, user_id: i64) -> CoreResult<Vec<PackSummary>> {
        self.execute(move |conn| PackRepository::new(conn).list(user_id))
            .await
    }

    pub async fn update_pack(
        &self,
        user_id: i64,
        pack_id: &str,
        name: &str,
        note: &str,
    ) -> CoreResult<Pack> {
        let pack_id = pack_id.to_string();
        let name = name.to_string();
        let note = note.to_string();
        self.execute(move |conn| PackRepository::new(conn).update(user_id, &pack_id, &name, &note))
            .await
    }

    pub async fn set_pack_locked(&self, user_id: i64, pack_id: &str, locked: bool) -> CoreResult<()> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| PackRepository::new(conn).set_locked(user_id, &pack_id, locked))
            .await
    }

    pub async fn set_pack_public(&self, user_id: i64, pack_id: &str, public: bool) -> CoreResult<Pack> {
        let pack_id = pack_id.to_string();
        let config = self.short_id_config();
        self.execute(move |conn| {
            PackRepository::new(conn).set_public(user_id, &pack_id, public, &config)
        })
        .await
    }

    pub async fn delete_pack(&self, user_id: i64, pack_id: &str) -> CoreResult<()> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| PackRepository::new(conn).delete(user_id, &pack_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            models::NewItem,
            repositories::{
                categories::CategoryRepository, items::ItemRepository,
                pack_items::PackItemRepository,
            },
            test_support::{insert_user, memory_connection},
        },
        error::ErrorKind,
        weights::aggregate_weights,
    };

    const STALE: &str = "2000-01-01T00:00:00.000000Z";

    /// Backdate the pack, run `op`, and check the pack's `updated_at` moved.
    fn assert_touches(
        conn: &Connection,
        pack_id: &str,
        what: &str,
        op: impl FnOnce() -> CoreResult<()>,
    ) {
        conn.execute(
            "UPDATE packs SET updated_at = ?1 WHERE id = ?2",
            params![STALE, pack_id],
        )
        .unwrap();
        op().unwrap();
        let updated_at: String = conn
            .query_row(
                "SELECT updated_at FROM packs WHERE id = ?1",
                params![pack_id],
                |row| row.get(0),
            )
            .unwrap();
        assert!(updated_at.as_str() > STALE, "{what} left updated_at untouched");
    }

    #[test]
    fn new_pack_is_empty_and_private() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let pack = PackRepository::new(&conn).create(user, "PCT", "desert section").unwrap();

        assert!(uuid::Uuid::parse_str(&pack.id).is_ok());
        assert!(pack.items.is_empty());
        assert!(pack.labels.is_empty());
        assert!(!pack.is_public);
        assert!(pack.short_id.is_none());
        assert_eq!(pack.note, "desert section");
    }

    #[test]
    fn get_checks_ownership() {
        let conn = memory_connection();
        let alice = insert_user(&conn, "alice");
        let bob = insert_user(&conn, "bob");
        let repo = PackRepository::new(&conn);
        let pack = repo.create(alice, "Overnight", "").unwrap();

        assert_eq!(repo.get(bob, &pack.id).unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(repo.get(alice, "missing").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.get(alice, &pack.id).unwrap().name, "Overnight");
    }

    #[test]
    fn short_id_is_assigned_once_and_kept() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let repo = PackRepository::new(&conn);
        let config = ShortIdConfig::default();
        let pack = repo.create(user, "Shared", "").unwrap();

        let public = repo.set_public(user, &pack.id, true, &config).unwrap();
        let short_id = public.short_id.clone().unwrap();
        assert_eq!(short_id.len(), 8);
        assert_eq!(repo.get_public(&short_id).unwrap().id, pack.id);

        let private = repo.set_public(user, &pack.id, false, &config).unwrap();
        assert_eq!(private.short_id.as_deref(), Some(short_id.as_str()));
        assert_eq!(repo.get_public(&short_id).unwrap_err().kind(), ErrorKind::NotFound);

        let again = repo.set_public(user, &pack.id, true, &config).unwrap();
        assert_eq!(again.short_id, Some(short_id));
    }

    #[test]
    fn list_orders_by_recent_modification() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let item = ItemRepository::new(&conn)
            .create(user, &NewItem::new(category.id, "Knife", 20))
            .unwrap();
        let repo = PackRepository::new(&conn);
        let older = repo.create(user, "Older", "").unwrap();
        let _newer = repo.create(user, "Newer", "").unwrap();

        let memberships = PackItemRepository::new(&conn);
        memberships.add_item(user, &older.id, item.id).unwrap();
        memberships.add_item(user, &older.id, item.id).unwrap();

        let listed = repo.list(user).unwrap();
        assert_eq!(listed[0].id, older.id);
        assert_eq!(listed[0].item_count, 2);
        assert_eq!(listed[1].item_count, 0);
    }

    #[test]
    fn delete_cascades_memberships_but_keeps_items() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let items = ItemRepository::new(&conn);
        let item = items.create(user, &NewItem::new(category.id, "Lighter", 18)).unwrap();
        let repo = PackRepository::new(&conn);
        let pack = repo.create(user, "Weekend", "").unwrap();
        PackItemRepository::new(&conn).add_item(user, &pack.id, item.id).unwrap();

        repo.delete(user, &pack.id).unwrap();

        let memberships: i64 = conn
            .query_row("SELECT COUNT(*) FROM pack_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(memberships, 0);
        assert!(items.get(user, item.id).is_ok());
    }

    #[test]
    fn every_mutation_touches_the_pack() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let item = ItemRepository::new(&conn)
            .create(user, &NewItem::new(category.id, "Cord", 30))
            .unwrap();
        let repo = PackRepository::new(&conn);
        let pack = repo.create(user, "Weekend", "").unwrap();
        let memberships = PackItemRepository::new(&conn);
        let labels = LabelRepository::new(&conn);
        let id = pack.id.as_str();

        assert_touches(&conn, id, "add_item", || {
            memberships.add_item(user, id, item.id).map(|_| ())
        });
        memberships.add_item(user, id, item.id).unwrap();
        assert_touches(&conn, id, "set_worn_count", || {
            memberships.set_worn_count(user, id, item.id, 1).map(|_| ())
        });
        assert_touches(&conn, id, "toggle_worn", || {
            memberships.toggle_worn(user, id, item.id, true).map(|_| ())
        });
        assert_touches(&conn, id, "remove_item", || {
            memberships.remove_item(user, id, item.id).map(|_| ())
        });

        let pack_item_id = memberships.find(id, item.id).unwrap().unwrap().id;
        let mut label_id = 0;
        assert_touches(&conn, id, "label create", || {
            label_id = labels.create(user, id, "Spare", "#ff0000")?.id;
            Ok(())
        });
        assert_touches(&conn, id, "label update", || {
            labels.update(user, label_id, Some("Backup"), None).map(|_| ())
        });
        assert_touches(&conn, id, "assign", || {
            labels.assign(user, pack_item_id, label_id).map(|_| ())
        });
        assert_touches(&conn, id, "unassign", || {
            labels.unassign(user, pack_item_id, label_id).map(|_| ())
        });
        assert_touches(&conn, id, "label delete", || labels.delete(user, label_id));

        assert_touches(&conn, id, "update", || {
            repo.update(user, id, "Long weekend", "").map(|_| ())
        });
        assert_touches(&conn, id, "set_locked", || repo.set_locked(user, id, true));
        assert_touches(&conn, id, "set_public", || {
            repo.set_public(user, id, true, &ShortIdConfig::default())
                .map(|_| ())
        });
    }

    #[test]
    fn oversized_stored_weights_aggregate_without_overflow() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let item = ItemRepository::new(&conn)
            .create(user, &NewItem::new(category.id, "Anvil", 1))
            .unwrap();
        // rows written before weights were bounded
        conn.execute(
            "UPDATE items SET weight = ?1 WHERE id = ?2",
            params![i64::MAX / 2, item.id],
        )
        .unwrap();

        let repo = PackRepository::new(&conn);
        let pack = repo.create(user, "Heavy", "").unwrap();
        let memberships = PackItemRepository::new(&conn);
        for _ in 0..3 {
            memberships.add_item(user, &pack.id, item.id).unwrap();
        }

        let summary = aggregate_weights(&repo.load(&pack.id).unwrap());
        assert_eq!(summary.total, i64::MAX);
        assert_eq!(summary.total_item_count, 3);
    }
}
