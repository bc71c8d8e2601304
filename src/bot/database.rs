//! Persistent SQLite store for active and banned users.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

/// A user observed sending tracked messages.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveUser {
    pub user_id: i64,
    pub first_seen: String,
    pub last_seen: String,
}

/// Persistent SQLite database for the bot.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Create a new in-memory database.
    pub fn in_memory() -> rusqlite::Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open the database described by a storage connection string.
    ///
    /// Accepts `sqlite://path`, `sqlite:path`, a bare path, or `:memory:`.
    pub fn open(url: &str) -> rusqlite::Result<Self> {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if path.is_empty() || path == ":memory:" {
            return Self::in_memory();
        }

        let db = Self::from_connection(Connection::open(Path::new(path))?)?;
        info!(
            "Loaded database from {} ({} active, {} banned)",
            path,
            db.count_active_users()?,
            db.count_banned_users()?
        );
        Ok(db)
    }

    fn from_connection(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS active_users (
                user_id INTEGER PRIMARY KEY,
                first_seen TEXT NOT NULL,
                last_seen TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS banned_users (
                user_id INTEGER PRIMARY KEY,
                banned_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave SQLite half-written.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==================== ACTIVE USERS ====================

    /// Insert the user, or bump `last_seen` if already present.
    pub fn record_activity(&self, user_id: i64) -> rusqlite::Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO active_users (user_id, first_seen, last_seen) VALUES (?1, ?2, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_seen = ?2",
            params![user_id, now],
        )?;
        Ok(())
    }

    pub fn count_active_users(&self) -> rusqlite::Result<usize> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM active_users", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
    }

    pub fn list_active_user_ids(&self) -> rusqlite::Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT user_id FROM active_users ORDER BY user_id")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect();
        ids
    }

    pub fn get_active_user(&self, user_id: i64) -> rusqlite::Result<Option<ActiveUser>> {
        self.conn()
            .query_row(
                "SELECT user_id, first_seen, last_seen FROM active_users WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(ActiveUser {
                        user_id: row.get(0)?,
                        first_seen: row.get(1)?,
                        last_seen: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    // ==================== BANNED USERS ====================

    /// Returns `true` if the user was not banned before.
    pub fn ban(&self, user_id: i64) -> rusqlite::Result<bool> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO banned_users (user_id, banned_at) VALUES (?1, ?2)",
            params![user_id, Utc::now().to_rfc3339()],
        )?;
        if inserted > 0 {
            info!("🚫 Banned user {}", user_id);
        }
        Ok(inserted > 0)
    }

    /// Returns `true` if the user was banned before.
    pub fn unban(&self, user_id: i64) -> rusqlite::Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM banned_users WHERE user_id = ?1", params![user_id])?;
        if removed > 0 {
            info!("✅ Unbanned user {}", user_id);
        }
        Ok(removed > 0)
    }

    pub fn is_banned(&self, user_id: i64) -> rusqlite::Result<bool> {
        self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM banned_users WHERE user_id = ?1)",
            params![user_id],
            |row| row.get(0),
        )
    }

    pub fn list_banned_user_ids(&self) -> rusqlite::Result<Vec<i64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT user_id FROM banned_users ORDER BY banned_at, user_id")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect();
        ids
    }

    pub fn count_banned_users(&self) -> rusqlite::Result<usize> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM banned_users", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
    }
}
