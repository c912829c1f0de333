//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! shopkeep migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server crate at build time.

use super::CommandError;

/// Apply every pending migration.
pub async fn run() -> Result<(), CommandError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    shopkeep_server::db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
