use rusqlite::{Connection, Row, params};
use rusqlite::types::Type;

use crate::Database;
use crate::error::{OptionalExt, StoreError};
use crate::models::{NewUser, UserRow};
use crate::store::UserStore;

impl UserStore for Database {
    fn create_user(&self, user: &NewUser) -> Result<UserRow, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (name, email, password, role) VALUES (?1, ?2, ?3, ?4)",
                params![user.name, user.email, user.password_hash, user.role.as_str()],
            )?;
            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    fn update_user_name(&self, id: i64, name: &str) -> Result<UserRow, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE users SET name = ?1 WHERE id = ?2", params![name, id])?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound)
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    let role: String = row.get(4)?;
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: role
            .parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        created_at: row.get(5)?,
    })
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, password, role, created_at FROM users WHERE id = ?1")?;
    stmt.query_row([id], map_user).optional()
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT id, name, email, password, role, created_at FROM users WHERE email = ?1")?;
    stmt.query_row([email], map_user).optional()
}
