//! Staff and admin accounts.

use chrono::{DateTime, Utc};

use shopkeep_core::{Email, Role, UserId};

/// A registered account (domain type).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Always `Admin` or `Staff`.
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Data for creating an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
}
