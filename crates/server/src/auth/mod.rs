//! Credential handling: signed bearer tokens and password hashes.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenError, TokenService};
pub use password::{PasswordError, hash_password, verify_password};
