//! Customers placing orders.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shopkeep_core::{CustomerId, Email};

/// A customer record shared by all staff.
#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Contact details supplied with an order.
///
/// Only used when the email is new; an existing customer keeps the details
/// it was created with.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
}
