use crate::models::{Link, LinkFilter, NewLink, User};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub type DbConnection = Arc<Mutex<Connection>>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("username already registered")]
    UsernameTaken,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

const LINK_COLUMNS: &str =
    "id, url, descripcion, titulo, contenido, categoria, user_id, created_at";

/// Opens the database at `path` (`:memory:` works too) and creates the
/// tables if they are missing.
pub fn establish_connection(path: impl AsRef<Path>) -> Result<DbConnection> {
    let conn = Connection::open(path)?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            titulo TEXT NOT NULL,
            contenido TEXT NOT NULL,
            categoria TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS links_user_id ON links (user_id)",
        [],
    )?;

    Ok(Arc::new(Mutex::new(conn)))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
            && e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        url: row.get(1)?,
        descripcion: row.get(2)?,
        titulo: row.get(3)?,
        contenido: row.get(4)?,
        categoria: row.get(5)?,
        user_id: row.get(6)?,
        created_at: parse_timestamp(7, row.get(7)?)?,
    })
}

pub async fn insert_user(conn: &DbConnection, username: &str, password_hash: &str) -> Result<i64> {
    let conn = conn.lock().await;

    match conn.execute(
        "INSERT INTO users (username, password) VALUES (?, ?)",
        params![username, password_hash],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(DbError::UsernameTaken),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_username(conn: &DbConnection, username: &str) -> Result<Option<User>> {
    let user = conn
        .lock()
        .await
        .query_row(
            "SELECT id, username, password FROM users WHERE username = ?",
            [username],
            user_from_row,
        )
        .optional()?;

    Ok(user)
}

pub async fn list_users(conn: &DbConnection) -> Result<Vec<User>> {
    let conn = conn.lock().await;
    let mut stmt = conn.prepare("SELECT id, username, password FROM users ORDER BY id")?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(users)
}

pub async fn insert_link(conn: &DbConnection, link: &NewLink<'_>) -> Result<Link> {
    let conn = conn.lock().await;
    let now = Utc::now();

    conn.execute(
        "INSERT INTO links (url, descripcion, titulo, contenido, categoria, user_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            link.url,
            link.descripcion,
            link.titulo,
            link.contenido,
            link.categoria,
            link.user_id,
            now.to_rfc3339()
        ],
    )?;

    let id = conn.last_insert_rowid();
    let stored = conn.query_row(
        &format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?"),
        [id],
        link_from_row,
    )?;

    Ok(stored)
}

/// Lists the links owned by `user_id` in creation order. The category filter
/// runs in SQL; the text search runs in Rust so it stays literal and
/// Unicode case-insensitive.
pub async fn list_links(conn: &DbConnection, user_id: i64, filter: &LinkFilter) -> Result<Vec<Link>> {
    let conn = conn.lock().await;

    let links = match filter.categoria() {
        Some(categoria) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ? AND categoria = ? ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![user_id, categoria], link_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ? ORDER BY id"
            ))?;
            let rows = stmt.query_map([user_id], link_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    Ok(links.into_iter().filter(|link| filter.matches(link)).collect())
}

/// Deletes the link only if `user_id` owns it. Returns whether a row went away.
pub async fn delete_link(conn: &DbConnection, user_id: i64, link_id: i64) -> Result<bool> {
    let deleted = conn.lock().await.execute(
        "DELETE FROM links WHERE id = ? AND user_id = ?",
        params![link_id, user_id],
    )?;

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_link<'a>(user_id: i64, descripcion: &'a str, titulo: &'a str, categoria: &'a str) -> NewLink<'a> {
        NewLink {
            url: "http://example.com",
            descripcion,
            titulo,
            contenido: "some words",
            categoria,
            user_id,
        }
    }

    #[tokio::test]
    async fn duplicate_username_is_reported() {
        let conn = establish_connection(":memory:").unwrap();
        insert_user(&conn, "alice", "hash").await.unwrap();

        let err = insert_user(&conn, "alice", "other").await.unwrap_err();
        assert!(matches!(err, DbError::UsernameTaken));
    }

    #[test]
    fn only_unique_constraints_count_as_taken() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (name TEXT NOT NULL UNIQUE, n INTEGER CHECK (n > 0));
             INSERT INTO t (name, n) VALUES ('a', 1);",
        )
        .unwrap();

        let dup = conn.execute("INSERT INTO t (name, n) VALUES ('a', 2)", []).unwrap_err();
        assert!(is_unique_violation(&dup));

        let null = conn.execute("INSERT INTO t (name, n) VALUES (NULL, 2)", []).unwrap_err();
        assert!(!is_unique_violation(&null));

        let check = conn.execute("INSERT INTO t (name, n) VALUES ('b', 0)", []).unwrap_err();
        assert!(!is_unique_violation(&check));
    }

    #[tokio::test]
    async fn find_user_returns_none_for_unknown() {
        let conn = establish_connection(":memory:").unwrap();
        insert_user(&conn, "alice", "hash").await.unwrap();

        let alice = find_user_by_username(&conn, "alice").await.unwrap().unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.password, "hash");
        assert!(find_user_by_username(&conn, "bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inserted_link_round_trips_with_timestamp() {
        let conn = establish_connection(":memory:").unwrap();
        let user_id = insert_user(&conn, "alice", "hash").await.unwrap();

        let before = Utc::now();
        let link = insert_link(&conn, &new_link(user_id, "desc", "Title", "tech")).await.unwrap();

        assert_eq!(link.user_id, user_id);
        assert_eq!(link.titulo, "Title");
        assert!(link.created_at >= before - chrono::Duration::seconds(1));

        let listed = list_links(&conn, user_id, &LinkFilter::default()).await.unwrap();
        assert_eq!(listed, vec![link]);
    }

    #[tokio::test]
    async fn link_requires_existing_user() {
        let conn = establish_connection(":memory:").unwrap();
        let err = insert_link(&conn, &new_link(42, "d", "t", "c")).await.unwrap_err();
        assert!(matches!(err, DbError::Sqlite(_)));
    }

    #[tokio::test]
    async fn listing_is_scoped_and_filtered() {
        let conn = establish_connection(":memory:").unwrap();
        let alice = insert_user(&conn, "alice", "hash").await.unwrap();
        let bob = insert_user(&conn, "bob", "hash").await.unwrap();

        insert_link(&conn, &new_link(alice, "rust notes", "Ownership", "tech")).await.unwrap();
        insert_link(&conn, &new_link(alice, "match report", "Final", "sports")).await.unwrap();
        insert_link(&conn, &new_link(bob, "rust too", "Borrowing", "tech")).await.unwrap();

        let all = list_links(&conn, alice, &LinkFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let tech = LinkFilter {
            search: None,
            categoria: Some("tech".to_string()),
        };
        let only_tech = list_links(&conn, alice, &tech).await.unwrap();
        assert_eq!(only_tech.len(), 1);
        assert_eq!(only_tech[0].titulo, "Ownership");

        let search = LinkFilter {
            search: Some("FINAL".to_string()),
            categoria: None,
        };
        let found = list_links(&conn, alice, &search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].categoria, "sports");
    }

    #[tokio::test]
    async fn delete_only_removes_owned_links() {
        let conn = establish_connection(":memory:").unwrap();
        let alice = insert_user(&conn, "alice", "hash").await.unwrap();
        let bob = insert_user(&conn, "bob", "hash").await.unwrap();
        let link = insert_link(&conn, &new_link(alice, "d", "t", "c")).await.unwrap();

        assert!(!delete_link(&conn, bob, link.id).await.unwrap());
        assert!(delete_link(&conn, alice, link.id).await.unwrap());
        assert!(!delete_link(&conn, alice, link.id).await.unwrap());
    }
}
