//! Account registration and password login.
//!
//! Self-registration always creates `Staff` accounts; the first `Admin` is
//! created from the CLI.

mod error;

pub use error::AccountError;

use std::time::Duration;

use shopkeep_core::{Email, Role};

use super::deadline::with_deadline;
use crate::auth::{TokenService, hash_password, verify_password};
use crate::db::UserStore;
use crate::models::{NewUser, User};

/// Registration input, as received.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Account service over a user store.
pub struct AccountService<'a> {
    users: &'a dyn UserStore,
    timeout: Duration,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, timeout: Duration) -> Self {
        Self { users, timeout }
    }

    /// Create an account with the given role.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::MissingField` for empty fields,
    /// `AccountError::InvalidEmail` for a malformed email and
    /// `AccountError::AlreadyExists` when the username or email is taken.
    #[tracing::instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, AccountError> {
        let username = registration.username.trim().to_string();
        if username.is_empty() {
            return Err(AccountError::MissingField("username"));
        }
        if registration.email.trim().is_empty() {
            return Err(AccountError::MissingField("email"));
        }
        if registration.password.is_empty() {
            return Err(AccountError::MissingField("password"));
        }
        let email = Email::parse(&registration.email)?;

        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = with_deadline(
            self.timeout,
            "insert user",
            self.users.insert(&NewUser {
                username,
                email,
                password_hash,
                role,
            }),
        )
        .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "account created");
        Ok(user)
    }

    /// Check credentials and issue a token.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` for an unknown email, a
    /// malformed email or a wrong password.
    #[tracing::instrument(skip_all)]
    pub async fn login(
        &self,
        tokens: &TokenService,
        email: &str,
        password: &str,
    ) -> Result<String, AccountError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AccountError::InvalidCredentials);
        };
        let user = with_deadline(self.timeout, "find user", self.users.find_by_email(&email))
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        let password = password.to_string();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?;
        if !valid {
            tracing::info!(user_id = %user.id, "login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(tokens.issue(user.id, user.role)?)
    }

    /// Whether an `Admin` account exists yet.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the store fails.
    pub async fn admin_exists(&self) -> Result<bool, AccountError> {
        Ok(with_deadline(self.timeout, "check admin", self.users.admin_exists()).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use shopkeep_core::Principal;

    use super::*;
    use crate::db::MemoryStore;

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    fn tokens() -> TokenService {
        TokenService::new(
            &SecretString::from("t8#Lq2!Vz9$Wm4^Rk7&Hp1*Nx6@Bc3%Y"),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store, Duration::from_secs(5));

        let user = service
            .register(registration("somchai", "Somchai@Shop.test"), Role::Staff)
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "somchai@shop.test");
        assert_ne!(user.password_hash, "hunter22");

        let tokens = tokens();
        let token = service
            .login(&tokens, "somchai@shop.test", "hunter22")
            .await
            .unwrap();
        assert_eq!(tokens.validate(&token).unwrap(), Principal::Staff(user.id));
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store, Duration::from_secs(5));
        service
            .register(registration("a", "a@shop.test"), Role::Staff)
            .await
            .unwrap();

        let same_email = service
            .register(registration("b", "A@shop.test"), Role::Staff)
            .await;
        assert!(matches!(same_email, Err(AccountError::AlreadyExists)));

        let same_username = service
            .register(registration("a", "c@shop.test"), Role::Staff)
            .await;
        assert!(matches!(same_username, Err(AccountError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_empty_fields_rejected() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store, Duration::from_secs(5));
        let result = service
            .register(registration("  ", "x@shop.test"), Role::Staff)
            .await;
        assert!(matches!(result, Err(AccountError::MissingField("username"))));
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let store = MemoryStore::new();
        let service = AccountService::new(&store, Duration::from_secs(5));
        service
            .register(registration("a", "a@shop.test"), Role::Staff)
            .await
            .unwrap();
        let tokens = tokens();

        for (email, password) in [
            ("a@shop.test", "wrong"),
            ("nobody@shop.test", "hunter22"),
            ("not-an-email", "hunter22"),
        ] {
            let result = service.login(&tokens, email, password).await;
            assert!(matches!(result, Err(AccountError::InvalidCredentials)));
        }
    }
}
