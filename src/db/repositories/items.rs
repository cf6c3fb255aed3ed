use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{now_timestamp, parse_datetime},
        models::{
            validation::{validate_name, validate_weight},
            Item, NewItem,
        },
    },
    error::{CoreError, CoreResult},
};

const ITEM_COLUMNS: &str = "i.id, i.user_id, i.category_id, c.name AS category_name, i.name,
     i.weight, i.price, i.brand, i.model, i.capacity, i.link, i.created_at, i.updated_at";

pub(crate) fn row_to_item(row: &Row) -> Result<Item> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Item {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        category_id: row.get("category_id")?,
        category_name: row.get("category_name")?,
        name: row.get("name")?,
        weight: row.get("weight")?,
        price: row.get("price")?,
        brand: row.get("brand")?,
        model: row.get("model")?,
        capacity: row.get("capacity")?,
        link: row.get("link")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

pub struct ItemRepository<'a> {
    conn: &'a Connection,
}

impl<'a> ItemRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn ensure_category(&self, user_id: i64, category_id: i64) -> CoreResult<()> {
        let owned: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE id = ?1 AND user_id = ?2",
                params![category_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(CoreError::not_found(format!("category {category_id}")));
        }
        Ok(())
    }

    pub fn create(&self, user_id: i64, input: &NewItem) -> CoreResult<Item> {
        let name = validate_name(&input.name, "item")?;
        validate_weight(input.weight)?;
        self.ensure_category(user_id, input.category_id)?;

        let now = now_timestamp();
        self.conn.execute(
            "INSERT INTO items (user_id, category_id, name, weight, price, brand, model, capacity, link, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                user_id,
                input.category_id,
                name,
                input.weight,
                input.price,
                input.brand,
                input.model,
                input.capacity,
                input.link,
                now,
            ],
        )?;

        self.get(user_id, self.conn.last_insert_rowid())
    }

    pub fn update(&self, user_id: i64, item_id: i64, input: &NewItem) -> CoreResult<Item> {
        let name = validate_name(&input.name, "item")?;
        validate_weight(input.weight)?;
        self.ensure_category(user_id, input.category_id)?;

        let rows_affected = self.conn.execute(
            "UPDATE items
             SET category_id = ?1, name = ?2, weight = ?3, price = ?4,
                 brand = ?5, model = ?6, capacity = ?7, link = ?8, updated_at = ?9
             WHERE id = ?10 AND user_id = ?11",
            params![
                input.category_id,
                name,
                input.weight,
                input.price,
                input.brand,
                input.model,
                input.capacity,
                input.link,
                now_timestamp(),
                item_id,
                user_id,
            ],
        )?;

        if rows_affected == 0 {
            return Err(CoreError::not_found(format!("item {item_id}")));
        }

        self.get(user_id, item_id)
    }

    /// Fetch an item owned by `user_id`. Someone else's item is `NotFound`.
    pub fn get(&self, user_id: i64, item_id: i64) -> CoreResult<Item> {
        let query = format!(
            "SELECT {ITEM_COLUMNS}
             FROM items i
             JOIN categories c ON c.id = i.category_id
             WHERE i.id = ?1 AND i.user_id = ?2"
        );
        self.conn
            .query_row(&query, params![item_id, user_id], |row| Ok(row_to_item(row)))
            .optional()?
            .transpose()?
            .ok_or_else(|| CoreError::not_found(format!("item {item_id}")))
    }

    pub fn list(&self, user_id: i64) -> CoreResult<Vec<Item>> {
        let query = format!(
            "SELECT {ITEM_COLUMNS}
             FROM items i
             JOIN categories c ON c.id = i.category_id
             WHERE i.user_id = ?1
             ORDER BY c.name ASC, i.name ASC"
        );
        let mut stmt = self.conn.prepare(&query)?;
        let mut rows = stmt.query(params![user_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(row_to_item(row)?);
        }
        Ok(items)
    }

    /// Number of pack memberships referencing the item
    pub fn usage_count(&self, item_id: i64) -> CoreResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM pack_items WHERE item_id = ?1",
            params![item_id],
            |row| row.get(0),
        )?)
    }

    /// Delete an item. While packs reference it the delete is refused unless
    /// `force` is set, in which case those memberships go first.
    ///
    /// The forced path issues several statements; run it inside a transaction.
    pub fn delete(&self, user_id: i64, item_id: i64, force: bool) -> CoreResult<()> {
        self.get(user_id, item_id)?;

        let usage = self.usage_count(item_id)?;
        if usage > 0 {
            if !force {
                return Err(CoreError::conflict(format!(
                    "item {item_id} is used in {usage} pack(s)"
                )));
            }

            // item_labels follow via ON DELETE CASCADE
            self.conn.execute(
                "UPDATE packs SET updated_at = ?1
                 WHERE id IN (SELECT pack_id FROM pack_items WHERE item_id = ?2)",
                params![now_timestamp(), item_id],
            )?;
            self.conn.execute(
                "DELETE FROM pack_items WHERE item_id = ?1",
                params![item_id],
            )?;
        }

        self.conn.execute(
            "DELETE FROM items WHERE id = ?1 AND user_id = ?2",
            params![item_id, user_id],
        )?;
        Ok(())
    }
}

impl Database {
    pub async fn create_item(&self, user_id: i64, input: NewItem) -> CoreResult<Item> {
        self.execute(move |conn| ItemRepository::new(conn).create(user_id, &input))
            .await
    }

    pub async fn update_item(&self, user_id: i64, item_id: i64, input: NewItem) -> CoreResult<Item> {
        self.execute(move |conn| ItemRepository::new(conn).update(user_id, item_id, &input))
            .await
    }

    pub async fn get_item(&self, user_id: i64, item_id: i64) -> CoreResult<Item> {
        self.execute(move |conn| ItemRepository::new(conn).get(user_id, item_id))
            .await
    }

    pub async fn list_items(&self, user_id: i64) -> CoreResult<Vec<Item>> {
        self.execute(move |conn| ItemRepository::new(conn).list(user_id))
            .await
    }

    pub async fn delete_item(&self, user_id: i64, item_id: i64, force: bool) -> CoreResult<()> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            ItemRepository::new(&tx).delete(user_id, item_id, force)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{
            repositories::categories::CategoryRepository,
            test_support::{insert_user, memory_connection},
        },
        error::ErrorKind,
    };

    #[test]
    fn create_joins_category_name() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Shelter").unwrap();

        let mut input = NewItem::new(category.id, "Tarp", 310);
        input.brand = Some("Borah".into());
        let item = ItemRepository::new(&conn).create(user, &input).unwrap();

        assert_eq!(item.category_name, "Shelter");
        assert_eq!(item.weight, 310);
        assert_eq!(item.brand.as_deref(), Some("Borah"));
    }

    #[test]
    fn items_are_private_to_their_owner() {
        let conn = memory_connection();
        let alice = insert_user(&conn, "alice");
        let bob = insert_user(&conn, "bob");
        let category = CategoryRepository::new(&conn).create(alice, "Sleep").unwrap();
        let repo = ItemRepository::new(&conn);
        let quilt = repo
            .create(alice, &NewItem::new(category.id, "Quilt", 550))
            .unwrap();

        assert_eq!(repo.get(bob, quilt.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(repo.list(bob).unwrap().is_empty());
        // bob cannot file an item under alice's category either
        assert_eq!(
            repo.create(bob, &NewItem::new(category.id, "Pad", 400))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn update_changes_fields() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Water").unwrap();
        let repo = ItemRepository::new(&conn);
        let bottle = repo
            .create(user, &NewItem::new(category.id, "Bottle", 40))
            .unwrap();

        let mut edit = NewItem::new(category.id, "Bottle 1L", 45);
        edit.price = 2.5;
        let updated = repo.update(user, bottle.id, &edit).unwrap();
        assert_eq!(updated.name, "Bottle 1L");
        assert_eq!(updated.weight, 45);
        assert_eq!(updated.price, 2.5);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();

        let err = ItemRepository::new(&conn)
            .create(user, &NewItem::new(category.id, "Ghost", -1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn oversized_weight_is_rejected() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let repo = ItemRepository::new(&conn);

        let err = repo
            .create(user, &NewItem::new(category.id, "Boulder", i64::MAX / 2))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let rock = repo.create(user, &NewItem::new(category.id, "Rock", 800)).unwrap();
        let err = repo
            .update(user, rock.id, &NewItem::new(category.id, "Rock", i64::MAX))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn unreferenced_item_deletes_without_force() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let category = CategoryRepository::new(&conn).create(user, "Misc").unwrap();
        let repo = ItemRepository::new(&conn);
        let item = repo.create(user, &NewItem::new(category.id, "Spork", 12)).unwrap();

        repo.delete(user, item.id, false).unwrap();
        assert_eq!(repo.get(user, item.id).unwrap_err().kind(), ErrorKind::NotFound);
    }
}
