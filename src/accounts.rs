//! User registration, login and sessions.

use crate::db::users::StoredPassword;
use crate::db::{Database, ms_to_datetime, now_ms};
use crate::error::{ApiError, ApiResult};
use crate::types::{Credentials, User, UserId};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Random hex string of `n` bytes of entropy.
fn random_hex<const N: usize>() -> String {
    let bytes: [u8; N] = rand::random();
    to_hex(&bytes)
}

/// SHA-256 over `salt:password`, hex encoded.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    to_hex(&hasher.finalize())
}

/// Hash `password` under a fresh random salt.
pub fn new_password(password: &str) -> StoredPassword {
    let salt = random_hex::<16>();
    let hash = hash_password(&salt, password);
    StoredPassword { salt, hash }
}

/// Compare a candidate password against a stored digest in constant time.
pub fn verify_password(stored: &StoredPassword, candidate: &str) -> bool {
    let computed = hash_password(&stored.salt, candidate);
    computed.as_bytes().ct_eq(stored.hash.as_bytes()).into()
}

/// A freshly issued login session.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub ttl_secs: i64,
}

#[derive(Clone)]
pub struct AccountService {
    db: Arc<Database>,
    session_ttl_secs: i64,
}

impl AccountService {
    pub fn new(db: Arc<Database>, session_ttl_secs: i64) -> Self {
        Self {
            db,
            session_ttl_secs,
        }
    }

    /// Register a user. Fails with 409 if the email is taken.
    pub fn register(&self, creds: Credentials) -> ApiResult<User> {
        let email = creds.email.trim().to_string();
        if email.is_empty() {
            return Err(ApiError::missing_field("email"));
        }
        if creds.password.is_empty() {
            return Err(ApiError::missing_field("password"));
        }

        if self.db.find_user_by_email(&email)?.is_some() {
            return Err(ApiError::already_exists());
        }

        let user = User {
            id: UserId::generate(),
            email,
            created_on: ms_to_datetime(now_ms()),
        };
        match self.db.insert_user(&user, &new_password(&creds.password)) {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email
            Err(e) if e.is_constraint_violation() => return Err(ApiError::already_exists()),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Verify credentials and open a session.
    pub fn login(&self, creds: &Credentials) -> ApiResult<Session> {
        let Some((user, stored)) = self.db.find_user_by_email(creds.email.trim())? else {
            debug!("login for unknown email");
            return Err(ApiError::invalid_login());
        };
        if !verify_password(&stored, &creds.password) {
            debug!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::invalid_login());
        }

        let token = random_hex::<32>();
        self.db
            .insert_session(&token, &user.id, self.session_ttl_secs.saturating_mul(1000))?;

        info!(user_id = %user.id, "user logged in");
        Ok(Session {
            token,
            user_id: user.id,
            ttl_secs: self.session_ttl_secs,
        })
    }

    /// Close a session. Unknown tokens are not an error.
    pub fn logout(&self, token: &str) -> ApiResult<()> {
        if self.db.delete_session(token)? {
            info!("user logged out");
        }
        Ok(())
    }

    /// Resolve a session token to a user.
    pub fn resolve(&self, token: &str) -> ApiResult<Option<UserId>> {
        Ok(self.db.session_user(token)?)
    }
}
