//! Login sessions keyed by an opaque cookie token.

use super::{Database, Result, now_ms};
use crate::types::UserId;
use rusqlite::{OptionalExtension, params};

impl Database {
    /// Store a session token for `user_id`, valid for `ttl_ms` milliseconds.
    pub fn insert_session(&self, token: &str, user_id: &UserId, ttl_ms: i64) -> Result<()> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id, now, now.saturating_add(ttl_ms)],
            )?;
            Ok(())
        })
    }

    /// Resolve a token to its user if the session has not expired.
    pub fn session_user(&self, token: &str) -> Result<Option<UserId>> {
        let now = now_ms();
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
                    params![token, now],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Remove a session. Returns true if it existed.
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(removed > 0)
        })
    }

    /// Drop every expired session. Returns the number removed.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let now = now_ms();
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
            Ok(removed)
        })
    }
}
