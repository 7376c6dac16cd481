//! Purchase repository for database operations.
//!
//! The checkout path runs inside [`PgPurchaseTransaction`]: the customer and
//! movie rows are read `FOR SHARE`, so a concurrent disable or price change
//! waits until the purchase has committed.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};

use marquee_core::{CustomerId, Money, MovieId, Page, PageRequest, PurchaseId};

use super::{PurchaseStore, PurchaseTransaction, RepositoryError, total_from_count};
use crate::models::{Customer, Movie, Purchase, PurchaseFilter};

const PURCHASE_COLUMNS: &str = "id, customer_id, movie_id, quantity, total_amount, status, \
                                payment_method, last4, payment_note, created_at";

const FILTER_CLAUSE: &str = r"
    WHERE ($1::uuid IS NULL OR customer_id = $1)
      AND ($2::uuid IS NULL OR movie_id = $2)
      AND ($3::purchase_status IS NULL OR status = $3)
      AND ($4::timestamptz IS NULL OR created_at >= $4)
      AND ($5::timestamptz IS NULL OR created_at <= $5)
";

/// Repository for purchase database operations.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    /// Create a new purchase repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl PurchaseStore for PurchaseRepository<'_> {
    type Transaction = PgPurchaseTransaction;

    async fn begin(&self) -> Result<PgPurchaseTransaction, RepositoryError> {
        Ok(PgPurchaseTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(purchase)
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            r"
            SELECT {PURCHASE_COLUMNS} FROM purchases
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(purchases)
    }

    async fn search(
        &self,
        filter: &PurchaseFilter,
        page: PageRequest,
    ) -> Result<Page<Purchase>, RepositoryError> {
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM purchases {FILTER_CLAUSE}"))
                .bind(filter.customer_id)
                .bind(filter.movie_id)
                .bind(filter.status)
                .bind(filter.start_date)
                .bind(filter.end_date)
                .fetch_one(self.pool)
                .await?;

        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases {FILTER_CLAUSE} \
             ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.customer_id)
        .bind(filter.movie_id)
        .bind(filter.status)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(purchases, page, total_from_count(total)?))
    }

    async fn total_revenue(&self) -> Result<Money, RepositoryError> {
        let sum: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount), 0) FROM purchases WHERE status = 'PAID'",
        )
        .fetch_one(self.pool)
        .await?;

        Money::unbounded(sum)
            .map_err(|e| RepositoryError::DataCorruption(format!("revenue: {e}")))
    }

    async fn total_tickets_sold(&self) -> Result<i64, RepositoryError> {
        let sold: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::bigint FROM purchases WHERE status = 'PAID'",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(sold)
    }

    async fn count_all(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM purchases")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

/// A Postgres transaction scoped to one checkout.
pub struct PgPurchaseTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl PurchaseTransaction for PgPurchaseTransaction {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r"
            SELECT id, first_name, last_name, email, phone, password_hash,
                   roles, active, created_at, updated_at
            FROM customers WHERE id = $1
            FOR SHARE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(customer)
    }

    async fn find_active_movie(&mut self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(
            r"
            SELECT id, title, description, genre, duration_min, price, poster_url,
                   active, created_at, updated_at
            FROM movies WHERE id = $1 AND active
            FOR SHARE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(movie)
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO purchases (
                id, customer_id, movie_id, quantity, total_amount, status,
                payment_method, last4, payment_note, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(purchase.id)
        .bind(purchase.customer_id)
        .bind(purchase.movie_id)
        .bind(purchase.quantity)
        .bind(purchase.total_amount)
        .bind(purchase.status)
        .bind(&purchase.payment_method)
        .bind(purchase.last4.as_deref())
        .bind(&purchase.payment_note)
        .bind(purchase.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
