//! Account management commands.
//!
//! Self-registration over HTTP only ever creates staff accounts, so the
//! first admin has to be created here.
//!
//! # Usage
//!
//! ```bash
//! shopkeep user create -u owner -e owner@example.com -p 'long passphrase' -r admin
//! ```

use std::time::Duration;

use shopkeep_core::{Role, UserId};
use shopkeep_server::db::Stores;
use shopkeep_server::services::{AccountService, Registration};

use super::CommandError;

const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create an account with the given role and return its id.
pub async fn create(
    username: String,
    email: String,
    password: String,
    role: Role,
) -> Result<UserId, CommandError> {
    let stores = Stores::postgres(super::connect().await?);
    let accounts = AccountService::new(stores.users.as_ref(), STORE_TIMEOUT);

    if role == Role::Admin && accounts.admin_exists().await? {
        tracing::warn!("An admin account already exists; creating another");
    }

    tracing::info!("Creating {} account: {}", role, email);
    let user = accounts
        .register(
            Registration {
                username,
                email,
                password,
            },
            role,
        )
        .await?;

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(user.id)
}
