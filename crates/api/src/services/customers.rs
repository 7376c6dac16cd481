//! Customer administration.

use thiserror::Error;
use tracing::info;

use marquee_core::{CustomerId, Page, PageRequest};

use crate::db::{CustomerStore, RepositoryError};
use crate::models::CustomerProfile;

/// Errors from customer administration.
#[derive(Debug, Error)]
pub enum CustomerError {
    #[error("customer not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Admin operations over customer accounts.
pub struct CustomerAdminService<'a, C> {
    customers: &'a C,
}

impl<'a, C: CustomerStore> CustomerAdminService<'a, C> {
    #[must_use]
    pub const fn new(customers: &'a C) -> Self {
        Self { customers }
    }

    /// Active customers whose name or email contains `query`.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::Repository` on database failure.
    pub async fn list_active(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<CustomerProfile>, CustomerError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let page = self.customers.list_active(query, page).await?;
        Ok(page.map(CustomerProfile::from))
    }

    /// Any customer by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::NotFound` for an unknown id.
    pub async fn get(&self, id: CustomerId) -> Result<CustomerProfile, CustomerError> {
        self.customers
            .find_by_id(id)
            .await?
            .map(CustomerProfile::from)
            .ok_or(CustomerError::NotFound)
    }

    /// Disable a customer. Their tokens stop working on the next request.
    ///
    /// # Errors
    ///
    /// Returns `CustomerError::NotFound` for an unknown id.
    pub async fn disable(&self, id: CustomerId) -> Result<CustomerProfile, CustomerError> {
        let customer = self
            .customers
            .set_active(id, false)
            .await?
            .ok_or(CustomerError::NotFound)?;
        info!(customer_id = %customer.id, "Customer disabled");
        Ok(CustomerProfile::from(customer))
    }
}
