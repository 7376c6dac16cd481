//! Purchase workflow.
//!
//! A purchase is created in one transaction: the buyer and the movie are read
//! through the transaction, the total is computed from the price observed
//! there, and the row is inserted before commit. The confirmation is
//! published only after the commit succeeds.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use marquee_core::{Money, Page, PageRequest, PurchaseId, PurchaseStatus};

use crate::db::{PurchaseStore, PurchaseTransaction, RepositoryError};
use crate::models::{Purchase, PurchaseFilter, PurchaseRequest};
use crate::services::auth::AuthenticatedCustomer;
use crate::services::notifications::{Notification, Notifier, PurchaseReceipt};

/// Errors from the purchase workflow.
#[derive(Debug, Error)]
pub enum PurchaseError {
    /// The identity no longer resolves to a customer.
    #[error("authentication required")]
    Unauthenticated,

    /// The customer has been disabled.
    #[error("account is disabled")]
    AccountDisabled,

    /// The movie does not exist or is disabled.
    #[error("movie not found")]
    MovieNotFound,

    /// Quantity below one, or a total beyond the largest storable amount.
    #[error("quantity must be at least 1 and the total at most {max}", max = Money::MAX)]
    InvalidQuantity,

    /// No purchase with the requested id.
    #[error("purchase not found")]
    ResourceNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Purchase service.
pub struct PurchaseService<'a, P> {
    purchases: &'a P,
    notifier: &'a Notifier,
}

impl<'a, P: PurchaseStore> PurchaseService<'a, P> {
    /// Create a new purchase service.
    #[must_use]
    pub const fn new(purchases: &'a P, notifier: &'a Notifier) -> Self {
        Self {
            purchases,
            notifier,
        }
    }

    /// Buy tickets for the calling customer.
    ///
    /// Payment is simulated and always succeeds, so the purchase is stored
    /// as PAID directly. The payment method is recorded as submitted.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated`, `AccountDisabled`, `MovieNotFound` or
    /// `InvalidQuantity` in that order of precedence.
    #[instrument(skip(self, caller, request), fields(customer_id = %caller.id, movie_id = %request.movie_id))]
    pub async fn create_purchase(
        &self,
        caller: &AuthenticatedCustomer,
        request: PurchaseRequest,
    ) -> Result<Purchase, PurchaseError> {
        let mut tx = self.purchases.begin().await?;

        let customer = tx
            .find_customer(caller.id)
            .await?
            .ok_or(PurchaseError::Unauthenticated)?;
        if !customer.active {
            return Err(PurchaseError::AccountDisabled);
        }

        let movie = tx
            .find_active_movie(request.movie_id)
            .await?
            .ok_or(PurchaseError::MovieNotFound)?;

        let quantity = u32::try_from(request.quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(PurchaseError::InvalidQuantity)?;
        let total_amount = movie
            .price
            .times(quantity)
            .map_err(|_| PurchaseError::InvalidQuantity)?;

        let purchase = Purchase {
            id: PurchaseId::generate(),
            customer_id: customer.id,
            movie_id: movie.id,
            quantity: request.quantity,
            total_amount,
            status: PurchaseStatus::Paid,
            payment_method: request.payment.method.clone(),
            last4: request.payment.display_last4(),
            payment_note: request.payment.note(),
            created_at: Utc::now(),
        };

        tx.insert_purchase(&purchase).await?;
        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            quantity = purchase.quantity,
            total = %purchase.total_amount,
            "Purchase completed"
        );

        self.notifier
            .publish(Notification::PurchaseCompleted(Box::new(PurchaseReceipt {
                purchase: purchase.clone(),
                customer_name: customer.full_name(),
                customer_email: customer.email,
                movie_title: movie.title,
                movie_genre: movie.genre,
                movie_duration_min: movie.duration_min,
            })));

        Ok(purchase)
    }

    /// The caller's own purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::Repository` on database failure.
    pub async fn my_purchases(
        &self,
        caller: &AuthenticatedCustomer,
    ) -> Result<Vec<Purchase>, PurchaseError> {
        Ok(self.purchases.list_for_customer(caller.id).await?)
    }

    /// Admin search across all purchases.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::Repository` on database failure.
    pub async fn search(
        &self,
        filter: &PurchaseFilter,
        page: PageRequest,
    ) -> Result<Page<Purchase>, PurchaseError> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date)
            && start > end
        {
            warn!(%start, %end, "Purchase search with an empty date range");
        }
        Ok(self.purchases.search(filter, page).await?)
    }

    /// Look up any purchase by id.
    ///
    /// # Errors
    ///
    /// Returns `PurchaseError::ResourceNotFound` if no purchase has this id.
    pub async fn get_purchase(&self, id: PurchaseId) -> Result<Purchase, PurchaseError> {
        self.purchases
            .find_by_id(id)
            .await?
            .ok_or(PurchaseError::ResourceNotFound)
    }
}
