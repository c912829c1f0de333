//! Shopkeep Core - Shared domain types.
//!
//! This crate provides the types shared by every Shopkeep component:
//! - `server` - The order and catalog HTTP API
//! - `cli` - Migrations and account bootstrap
//! - `integration-tests` - Store tests against `PostgreSQL`
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money, order statuses, roles and principals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
