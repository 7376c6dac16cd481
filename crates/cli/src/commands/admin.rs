//! Administrator management.
//!
//! # Usage
//!
//! ```bash
//! # Create a new administrator (roles USER and ADMIN)
//! mq-cli admin create -e admin@example.com -f Ana -l Lopez -p 5551234 --password '...'
//!
//! # Promote or demote an existing customer
//! mq-cli admin grant -e ana@example.com
//! mq-cli admin revoke -e ana@example.com
//! ```

use thiserror::Error;

use marquee_api::db::{CustomerRepository, CustomerStore, RepositoryError};
use marquee_api::models::NewCustomer;
use marquee_api::services::AuthError;
use marquee_api::services::auth::{hash_password, validate_password};
use marquee_core::{CustomerId, Email, Role, RoleSet};

use super::CommandError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(#[from] AuthError),

    #[error("A customer already exists with email: {0}")]
    UserExists(String),

    #[error("No customer with email: {0}")]
    UnknownCustomer(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Fields for a new administrator.
#[derive(Debug)]
pub struct NewAdmin<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub password: &'a str,
}

/// Create a customer holding both `USER` and `ADMIN`.
///
/// # Errors
///
/// Returns an error if the input is invalid, the email is taken or the
/// database fails.
pub async fn create_admin(admin: &NewAdmin<'_>) -> Result<CustomerId, AdminError> {
    let email = parse_email(admin.email)?;
    validate_password(admin.password)?;
    let password_hash = hash_password(admin.password)?;

    let pool = super::connect().await?;
    let customers = CustomerRepository::new(&pool);

    if customers.exists_by_email(&email).await? {
        return Err(AdminError::UserExists(email.to_string()));
    }

    tracing::info!(email = %email, "Creating administrator");
    let customer = customers
        .insert(NewCustomer {
            first_name: admin.first_name.trim().to_owned(),
            last_name: admin.last_name.trim().to_owned(),
            email: email.clone(),
            phone: admin.phone.trim().to_owned(),
            password_hash,
            roles: RoleSet::admin(),
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(customer_id = %customer.id, "Administrator created");
    Ok(customer.id)
}

/// Add `ADMIN` to an existing customer's roles.
///
/// # Errors
///
/// Returns an error if no customer has this email or the database fails.
pub async fn grant(email: &str) -> Result<RoleSet, AdminError> {
    edit_roles(email, |roles| {
        roles.insert(Role::Admin);
    })
    .await
}

/// Remove `ADMIN` from an existing customer's roles. `USER` is kept.
///
/// # Errors
///
/// Returns an error if no customer has this email or the database fails.
pub async fn revoke(email: &str) -> Result<RoleSet, AdminError> {
    edit_roles(email, |roles| {
        roles.remove(Role::Admin);
        roles.insert(Role::User);
    })
    .await
}

async fn edit_roles(email: &str, edit: impl FnOnce(&mut RoleSet)) -> Result<RoleSet, AdminError> {
    let email = parse_email(email)?;

    let pool = super::connect().await?;
    let customers = CustomerRepository::new(&pool);

    let customer = customers
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownCustomer(email.to_string()))?;

    let mut roles = customer.roles.clone();
    edit(&mut roles);

    let updated = customers
        .set_roles(customer.id, &roles)
        .await?
        .ok_or_else(|| AdminError::UnknownCustomer(email.to_string()))?;

    tracing::info!(
        customer_id = %updated.id,
        roles = %updated.roles.to_db_string(),
        "Roles updated"
    );
    Ok(updated.roles)
}

fn parse_email(raw: &str) -> Result<Email, AdminError> {
    Email::parse(raw.trim()).map_err(|e| AdminError::InvalidEmail(format!("{raw}: {e}")))
}
