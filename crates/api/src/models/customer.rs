//! Customer domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marquee_core::{CustomerId, Email, RoleSet};

/// A customer account (domain type).
///
/// Implements `Debug` manually so the password hash never reaches logs.
#[derive(Clone, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    /// Unique, compared case-sensitively.
    pub email: Email,
    pub phone: String,
    pub password_hash: String,
    pub roles: RoleSet,
    /// Disabled customers cannot log in or buy tickets.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// "First Last", trimmed.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

impl std::fmt::Debug for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Customer")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("active", &self.active)
            .field("password_hash", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Fields needed to insert a customer.
#[derive(Clone)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

/// Public view of a customer (no credentials).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: CustomerId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    pub roles: RoleSet,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Customer> for CustomerProfile {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            roles: customer.roles.clone(),
            active: customer.active,
            created_at: customer.created_at,
        }
    }
}

impl From<Customer> for CustomerProfile {
    fn from(customer: Customer) -> Self {
        Self::from(&customer)
    }
}
