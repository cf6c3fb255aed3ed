use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{now_timestamp, parse_datetime},
        models::{validation::validate_name, Category},
    },
    error::{is_unique_violation, CoreError, CoreResult},
};

fn row_to_category(row: &Row) -> Result<Category> {
    let created_at: String = row.get("created_at")?;
    Ok(Category {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        name: row.get("name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub struct CategoryRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a category; a duplicate name for the same user is a conflict.
    pub fn create(&self, user_id: i64, name: &str) -> CoreResult<Category> {
        let name = validate_name(name, "category")?;
        let inserted = self.conn.execute(
            "INSERT INTO categories (user_id, name, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, name, now_timestamp()],
        );

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(CoreError::conflict(format!(
                    "category '{name}' already exists"
                )))
            }
            Err(err) => return Err(err.into()),
        }

        self.get(user_id, self.conn.last_insert_rowid())?
            .ok_or_else(|| CoreError::not_found("category after insert"))
    }

    /// Get-or-create by name. This is the entry point importers use to verify
    /// a category before attaching items to it.
    pub fn ensure(&self, user_id: i64, name: &str) -> CoreResult<Category> {
        let name = validate_name(name, "category")?;
        if let Some(existing) = self.find_by_name(user_id, &name)? {
            return Ok(existing);
        }
        self.create(user_id, &name)
    }

    pub fn get(&self, user_id: i64, category_id: i64) -> CoreResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM categories
                 WHERE id = ?1 AND user_id = ?2",
                params![category_id, user_id],
                |row| Ok(row_to_category(row)),
            )
            .optional()?
            .transpose()?;
        Ok(category)
    }

    pub fn find_by_name(&self, user_id: i64, name: &str) -> CoreResult<Option<Category>> {
        let category = self
            .conn
            .query_row(
                "SELECT id, user_id, name, created_at FROM categories
                 WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
                |row| Ok(row_to_category(row)),
            )
            .optional()?
            .transpose()?;
        Ok(category)
    }

    pub fn list(&self, user_id: i64) -> CoreResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, created_at FROM categories
             WHERE user_id = ?1
             ORDER BY name ASC",
        )?;

        let mut rows = stmt.query(params![user_id])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(row_to_category(row)?);
        }
        Ok(categories)
    }
}

impl Database {
    pub async fn create_category(&self, user_id: i64, name: &str) -> CoreResult<Category> {
        let name = name.to_string();
        self.execute(move |conn| CategoryRepository::new(conn).create(user_id, &name))
            .await
    }

    pub async fn ensure_category(&self, user_id: i64, name: &str) -> CoreResult<Category> {
        let name = name.to_string();
        self.execute(move |conn| CategoryRepository::new(conn).ensure(user_id, &name))
            .await
    }

    pub async fn list_categories(&self, user_id: i64) -> CoreResult<Vec<Category>> {
        self.execute(move |conn| CategoryRepository::new(conn).list(user_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_support::{insert_user, memory_connection},
        error::ErrorKind,
    };

    #[test]
    fn ensure_returns_existing_category() {
        let conn = memory_connection();
        let user = insert_user(&conn, "hiker");
        let repo = CategoryRepository::new(&conn);

        let created = repo.ensure(user, "Shelter").unwrap();
        let again = repo.ensure(user, " Shelter ").unwrap();
        assert_eq!(created.id, again.id);
        assert_eq!(repo.list(user).unwrap().len(), 1);
    }

    #[test]
    fn create_rejects_duplicates_per_user_only() {
        let conn = memory_connection();
        let alice = insert_user(&conn, "alice");
        let bob = insert_user(&conn, "bob");
        let repo = CategoryRepository::new(&conn);

        repo.create(alice, "Kitchen").unwrap();
        assert_eq!(
            repo.create(alice, "Kitchen").unwrap_err().kind(),
            ErrorKind::Conflict
        );
        assert!(repo.create(bob, "Kitchen").is_ok());
    }

    #[test]
    fn list_is_sorted_and_scoped() {
        let conn = memory_connection();
        let alice = insert_user(&conn, "alice");
        let bob = insert_user(&conn, "bob");
        let repo = CategoryRepository::new(&conn);

        repo.create(alice, "Sleep").unwrap();
        repo.create(alice, "Clothing").unwrap();
        repo.create(bob, "Water").unwrap();

        let names: Vec<String> = repo.list(alice).unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Clothing", "Sleep"]);
    }
}
