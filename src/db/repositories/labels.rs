use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{
            ensure_pack_item_owner, ensure_pack_owner, now_timestamp, parse_datetime, touch_pack,
        },
        models::{
            validation::{validate_color, validate_name},
            ItemLabel, PackLabel,
        },
    },
    error::{is_unique_violation, CoreError, CoreResult},
};

pub(crate) fn row_to_pack_label(row: &Row) -> Result<PackLabel> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(PackLabel {
        id: row.get("id")?,
        pack_id: row.get("pack_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn duplicate_name(name: &str) -> CoreError {
    CoreError::conflict(format!("label '{name}' already exists in this pack"))
}

pub struct LabelRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LabelRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn find(&self, label_id: i64) -> CoreResult<PackLabel> {
        self.conn
            .query_row(
                "SELECT id, pack_id, name, color, created_at, updated_at
                 FROM pack_labels WHERE id = ?1",
                params![label_id],
                |row| Ok(row_to_pack_label(row)),
            )
            .optional()?
            .transpose()?
            .ok_or_else(|| CoreError::not_found(format!("label {label_id}")))
    }

    /// Labels defined on a pack, by name
    pub fn list(&self, pack_id: &str) -> CoreResult<Vec<PackLabel>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, pack_id, name, color, created_at, updated_at
             FROM pack_labels
             WHERE pack_id = ?1
             ORDER BY name ASC",
        )?;

        let mut rows = stmt.query(params![pack_id])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(row_to_pack_label(row)?);
        }
        Ok(labels)
    }

    /// Create a label; names are unique within a pack.
    pub fn create(
        &self,
        user_id: i64,
        pack_id: &str,
        name: &str,
        color: &str,
    ) -> CoreResult<PackLabel> {
        ensure_pack_owner(self.conn, user_id, pack_id)?;
        let name = validate_name(name, "label")?;
        validate_color(color)?;

        let now = now_timestamp();
        let inserted = self.conn.execute(
            "INSERT INTO pack_labels (pack_id, name, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![pack_id, name, color, now],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(duplicate_name(&name)),
            Err(err) => return Err(err.into()),
        }

        let label_id = self.conn.last_insert_rowid();
        touch_pack(self.conn, pack_id)?;
        self.find(label_id)
    }

    /// Update a label's name and/or color
    pub fn update(
        &self,
        user_id: i64,
        label_id: i64,
        name: Option<&str>,
        color: Option<&str>,
    ) -> CoreResult<PackLabel> {
        let label = self.find(label_id)?;
        ensure_pack_owner(self.conn, user_id, &label.pack_id)?;

        // Build update query dynamically based on what's being updated
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let name = name.map(|n| validate_name(n, "label")).transpose()?;
        if let Some(n) = name.clone() {
            updates.push("name = ?");
            params_vec.push(Box::new(n));
        }
        if let Some(c) = color {
            validate_color(c)?;
            updates.push("color = ?");
            params_vec.push(Box::new(c.to_string()));
        }

        if updates.is_empty() {
            return Err(CoreError::invalid("no fields to update"));
        }

        updates.push("updated_at = ?");
        params_vec.push(Box::new(now_timestamp()));

        let query = format!("UPDATE pack_labels SET {} WHERE id = ?", updates.join(", "));
        params_vec.push(Box::new(label_id));

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|b| b.as_ref()).collect();

        match self.conn.execute(&query, params_refs.as_slice()) {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(duplicate_name(name.as_deref().unwrap_or(label.name.as_str())))
            }
            Err(err) => return Err(err.into()),
        }

        touch_pack(self.conn, &label.pack_id)?;
        self.find(label_id)
    }

    /// Delete a label; its assignments cascade.
    pub fn delete(&self, user_id: i64, label_id: i64) -> CoreResult<()> {
        let label = self.find(label_id)?;
        ensure_pack_owner(self.conn, user_id, &label.pack_id)?;

        self.conn
            .execute("DELETE FROM pack_labels WHERE id = ?1", params![label_id])?;
        touch_pack(self.conn, &label.pack_id)?;
        Ok(())
    }

    fn assignment(&self, pack_item_id: i64, label_id: i64) -> CoreResult<Option<ItemLabel>> {
        let assignment = self
            .conn
            .query_row(
                "SELECT il.id, il.pack_item_id, il.pack_label_id, pl.name, pl.color, il.count
                 FROM item_labels il
                 JOIN pack_labels pl ON pl.id = il.pack_label_id
                 WHERE il.pack_item_id = ?1 AND il.pack_label_id = ?2",
                params![pack_item_id, label_id],
                |row| {
                    Ok(ItemLabel {
                        id: row.get(0)?,
                        pack_item_id: row.get(1)?,
                        pack_label_id: row.get(2)?,
                        name: row.get(3)?,
                        color: row.get(4)?,
                        count: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(assignment)
    }

    /// Tag one more unit of a pack item with a label.
    ///
    /// The label must live on the same pack as the pack item.
    pub fn assign(&self, user_id: i64, pack_item_id: i64, label_id: i64) -> CoreResult<ItemLabel> {
        let pack_id = ensure_pack_item_owner(self.conn, user_id, pack_item_id)?;
        let label = self.find(label_id)?;
        if label.pack_id != pack_id {
            return Err(CoreError::CrossPackLabel {
                pack_item_id,
                label_id,
            });
        }

        self.conn.execute(
            "INSERT INTO item_labels (pack_item_id, pack_label_id, count, created_at)
             VALUES (?1, ?2, 1, ?3)
             ON CONFLICT(pack_item_id, pack_label_id) DO UPDATE SET
                 count = item_labels.count + 1",
            params![pack_item_id, label_id, now_timestamp()],
        )?;
        touch_pack(self.conn, &pack_id)?;

        self.assignment(pack_item_id, label_id)?
            .ok_or_else(|| CoreError::not_found("label assignment after insert"))
    }

    /// Remove one unit from an assignment. Returns the remaining assignment,
    /// or `None` once it has been deleted.
    pub fn unassign(
        &self,
        user_id: i64,
        pack_item_id: i64,
        label_id: i64,
    ) -> CoreResult<Option<ItemLabel>> {
        let pack_id = ensure_pack_item_owner(self.conn, user_id, pack_item_id)?;
        let existing = self.assignment(pack_item_id, label_id)?.ok_or_else(|| {
            CoreError::not_found(format!(
                "label {label_id} assignment on pack item {pack_item_id}"
            ))
        })?;

        let remaining = if existing.count <= 1 {
            self.conn
                .execute("DELETE FROM item_labels WHERE id = ?1", params![existing.id])?;
            None
        } else {
            self.conn.execute(
                "UPDATE item_labels SET count = count - 1 WHERE id = ?1",
                params![existing.id],
            )?;
            Some(ItemLabel {
                count: existing.count - 1,
                ..existing
            })
        };

        touch_pack(self.conn, &pack_id)?;
        Ok(remaining)
    }
}

impl Database {
    pub async fn list_labels(&self, user_id: i64, pack_id: &str) -> CoreResult<Vec<PackLabel>> {
        let pack_id = pack_id.to_string();
        self.execute(move |conn| {
            ensure_pack_owner(conn, user_id, &pack_id)?;
            LabelRepository::new(conn).list(&pack_id)
        })
        .await
    }

    pub async fn create_label(
        &self,
        user_id: i64,
        pack_id: &str,
        name: &str,
        color: &str,
    ) -> CoreResult<PackLabel> {
        let pack_id = pack_id.to_string();
        let name = name.to_string();
        let color = color.to_string();
        self.execute(move |conn| {
            LabelRepository::new(conn).create(user_id, &pack_id, &name, &color)
        })
        .await
    }

    pub async fn update_label(
        &self,
        user_id: i64,
        label_id: i64,
        name: Option<String>,
        color: Option<String>,
    ) -> CoreResult<PackLabel> {
        self.execute(move |conn| {
            LabelRepository::new(conn).update(user_id, label_id, name.as_deref(), color.as_deref())
        })
        .await
    }

    pub async fn delete_label(&self, user_id: i64, label_id: i64) -> CoreResult<()> {
        self.execute(move |conn| LabelRepository::new(conn).delete(user_id, label_id))
            .await
    }

    pub async fn assign_label(
        &self,
        user_id: i64,
        pack_item_id: i64,
        label_id: i64,
    ) -> CoreResult<ItemLabel> {
        self.execute(move |conn| LabelRepository::new(conn).assign(user_id, pack_item_id, label_id))
            .await
    }

    pub async fn unassign_label(
        &self,
        user_id: i64,
        pack_item_id: i64,
        label_id: i64,
    ) -> CoreResult<Option<ItemLabel>> {
        self.execute(move |conn| {
            LabelRepository::new(conn).unassign(user_id, pack_item_id, label_id)
        })
        .await
    }
}
