//! Core types for Shopkeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod principal;
pub mod status;
pub mod tracking;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use principal::{Principal, Role, RoleParseError};
pub use status::{OrderStatus, StatusParseError};
pub use tracking::{TrackingNumber, TrackingNumberError};
