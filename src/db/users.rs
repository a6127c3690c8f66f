//! User accounts.

use super::{Database, Result, ms_to_datetime};
use crate::types::User;
use rusqlite::{OptionalExtension, params};

/// Salted password digest as stored alongside a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPassword {
    pub salt: String,
    pub hash: String,
}

impl Database {
    /// Insert a new user. Fails with a constraint violation if the email is taken.
    pub fn insert_user(&self, user: &User, password: &StoredPassword) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password_salt, password_hash, created_on)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    &user.id,
                    &user.email,
                    &password.salt,
                    &password.hash,
                    user.created_on.timestamp_millis(),
                ],
            )?;
            Ok(())
        })
    }

    /// Look up a user and their password digest by email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<(User, StoredPassword)>> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT id, email, created_on, password_salt, password_hash
                     FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        let created_on: i64 = row.get(2)?;
                        let user = User {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            created_on: ms_to_datetime(created_on),
                        };
                        let password = StoredPassword {
                            salt: row.get(3)?,
                            hash: row.get(4)?,
                        };
                        Ok((user, password))
                    },
                )
                .optional()?;
            Ok(found)
        })
    }
}
