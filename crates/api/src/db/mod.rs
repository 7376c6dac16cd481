//! Database operations for the ticketing backend.
//!
//! # Tables
//!
//! - `customers` - Accounts, password hashes, role sets, active flag
//! - `movies` - Catalog entries (soft-deleted via `active`)
//! - `purchases` - Append-only ticket purchases
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! mq-cli migrate
//! ```
//!
//! # Store traits
//!
//! Services are written against the traits in this module rather than the
//! Postgres repositories directly, so the purchase workflow can be exercised
//! against an in-memory store in tests.

pub mod customers;
#[cfg(test)]
pub mod memory;
pub mod movies;
pub mod purchases;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use marquee_core::{CustomerId, Email, Money, MovieId, Page, PageRequest, PurchaseId, RoleSet};

use crate::models::{
    Customer, Movie, MovieFilter, NewCustomer, Purchase, PurchaseFilter, ValidMovieDraft,
};

pub use customers::CustomerRepository;
pub use movies::MovieRepository;
pub use purchases::{PgPurchaseTransaction, PurchaseRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict`, everything else to `Database`.
    pub(crate) fn from_insert(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Customer persistence.
pub trait CustomerStore: Send + Sync {
    /// Look up a customer by id.
    fn find_by_id(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Look up a customer by exact (case-sensitive) email.
    fn find_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Whether any customer, active or not, uses this email.
    fn exists_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Insert a new customer.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    fn insert(
        &self,
        customer: NewCustomer,
    ) -> impl Future<Output = Result<Customer, RepositoryError>> + Send;

    /// Enable or disable a customer. `None` if the id is unknown.
    fn set_active(
        &self,
        id: CustomerId,
        active: bool,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Replace a customer's role set. `None` if the id is unknown.
    fn set_roles(
        &self,
        id: CustomerId,
        roles: &RoleSet,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Active customers whose name or email contains `query`, newest first.
    fn list_active(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Customer>, RepositoryError>> + Send;
}

/// Movie catalog persistence.
pub trait MovieStore: Send + Sync {
    /// Look up any movie, active or not.
    fn find_by_id(
        &self,
        id: MovieId,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;

    /// Look up a movie only if it is active.
    fn find_active_by_id(
        &self,
        id: MovieId,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;

    /// Active movies matching `filter`, newest first.
    fn list_active(
        &self,
        filter: &MovieFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Movie>, RepositoryError>> + Send;

    /// Every movie including disabled ones, newest first.
    fn list_all(
        &self,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Movie>, RepositoryError>> + Send;

    /// Distinct genres of active movies, sorted.
    fn genres(&self) -> impl Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Insert a new active movie.
    fn insert(
        &self,
        draft: ValidMovieDraft,
    ) -> impl Future<Output = Result<Movie, RepositoryError>> + Send;

    /// Replace a movie's editable fields. `None` if the id is unknown.
    fn update(
        &self,
        id: MovieId,
        draft: ValidMovieDraft,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;

    /// Enable or disable a movie. `None` if the id is unknown.
    fn set_active(
        &self,
        id: MovieId,
        active: bool,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;

    /// Set or clear the poster URL. `None` if the id is unknown.
    fn set_poster_url(
        &self,
        id: MovieId,
        url: Option<&str>,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;
}

/// Purchase persistence and aggregates.
pub trait PurchaseStore: Send + Sync {
    /// Transaction type used by the purchase workflow.
    type Transaction: PurchaseTransaction;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, RepositoryError>> + Send;

    /// Look up a purchase by id.
    fn find_by_id(
        &self,
        id: PurchaseId,
    ) -> impl Future<Output = Result<Option<Purchase>, RepositoryError>> + Send;

    /// All purchases of one customer, newest first.
    fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> impl Future<Output = Result<Vec<Purchase>, RepositoryError>> + Send;

    /// Purchases matching every present filter, newest first.
    fn search(
        &self,
        filter: &PurchaseFilter,
        page: PageRequest,
    ) -> impl Future<Output = Result<Page<Purchase>, RepositoryError>> + Send;

    /// Sum of `total_amount` over PAID purchases (zero when none).
    fn total_revenue(&self) -> impl Future<Output = Result<Money, RepositoryError>> + Send;

    /// Sum of `quantity` over PAID purchases.
    fn total_tickets_sold(&self) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Number of purchases regardless of status.
    fn count_all(&self) -> impl Future<Output = Result<i64, RepositoryError>> + Send;
}

/// One atomic unit of the purchase workflow.
///
/// Reads made through the transaction hold their rows until `commit`.
/// Dropping the transaction without committing rolls it back.
pub trait PurchaseTransaction: Send {
    /// Read the purchasing customer.
    fn find_customer(
        &mut self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Read a movie only if it is active.
    fn find_active_movie(
        &mut self,
        id: MovieId,
    ) -> impl Future<Output = Result<Option<Movie>, RepositoryError>> + Send;

    /// Stage a new purchase.
    fn insert_purchase(
        &mut self,
        purchase: &Purchase,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Make every staged write durable.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Convert a `COUNT(*)` result into a page total.
pub(crate) fn total_from_count(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
}
