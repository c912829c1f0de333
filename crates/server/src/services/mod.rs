//! Business logic services.
//!
//! # Services
//!
//! - `accounts` - Registration and password login
//! - `catalog` - Product create, update and delete with owner scoping
//! - `customers` - Find-or-create of customers by email
//! - `inventory` - Stock validation, conditional debits and credits
//! - `orders` - Order assembly and role-scoped order management
//! - `placement` - The order placement saga
//! - `tracking` - Tracking code generation
//!
//! Every storage call goes through [`deadline::with_deadline`].

pub mod accounts;
pub mod catalog;
pub mod customers;
pub mod deadline;
pub mod inventory;
pub mod orders;
pub mod placement;
pub mod tracking;

pub use accounts::{AccountError, AccountService, Registration};
pub use catalog::{CatalogError, CatalogService};
pub use customers::CustomerResolver;
pub use inventory::{InventoryLedger, LedgerError, LineRequest};
pub use orders::{OrderError, OrderService};
pub use placement::OrderPlacement;
pub use tracking::{RandomTrackingCodes, TrackingCodeGenerator};
