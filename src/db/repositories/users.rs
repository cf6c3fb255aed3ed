use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{now_timestamp, parse_datetime},
        models::{validation::validate_name, User},
    },
    error::{is_unique_violation, CoreError, CoreResult},
};

fn row_to_user(row: &Row) -> Result<User> {
    let created_at: String = row.get("created_at")?;
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

pub struct UserRepository<'a> {
    conn: &'a Connection,
}

impl<'a> UserRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, username: &str) -> CoreResult<User> {
        let username = validate_name(username, "user")?;
        let inserted = self.conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, now_timestamp()],
        );

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(CoreError::conflict(format!(
                    "username '{username}' is already taken"
                )))
            }
            Err(err) => return Err(err.into()),
        }

        self.get(self.conn.last_insert_rowid())?
            .ok_or_else(|| CoreError::not_found("user after insert"))
    }

    pub fn get(&self, user_id: i64) -> CoreResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, username, created_at FROM users WHERE id = ?1")?;
        let user = stmt
            .query_row(params![user_id], |row| Ok(row_to_user(row)))
            .optional()?
            .transpose()?;
        Ok(user)
    }
}

impl Database {
    pub async fn create_user(&self, username: &str) -> CoreResult<User> {
        let username = username.to_string();
        self.execute(move |conn| UserRepository::new(conn).create(&username))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_support::memory_connection, error::ErrorKind};

    #[test]
    fn creates_and_fetches_user() {
        let conn = memory_connection();
        let repo = UserRepository::new(&conn);

        let user = repo.create(" hiker ").unwrap();
        assert_eq!(user.username, "hiker");
        assert_eq!(repo.get(user.id).unwrap().unwrap().username, "hiker");
        assert!(repo.get(user.id + 1).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_conflicts() {
        let conn = memory_connection();
        let repo = UserRepository::new(&conn);
        repo.create("hiker").unwrap();

        let err = repo.create("hiker").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
}
