//! Domain models for the order and catalog API.
//!
//! These are validated domain objects. Row types for `PostgreSQL` live next to
//! the repositories in [`crate::db`]; request and response shapes live with
//! the routes.

pub mod customer;
pub mod order;
pub mod product;
pub mod user;

pub use customer::{Customer, CustomerProfile};
pub use order::{NewOrder, Order, OrderItem, OrderUpdate};
pub use product::{NewProduct, Product, ProductDraft, ProductUpdate};
pub use user::{NewUser, User};

/// Largest stock level or line quantity the store accepts (`INTEGER` column).
pub const MAX_COUNT: u32 = i32::MAX.unsigned_abs();
