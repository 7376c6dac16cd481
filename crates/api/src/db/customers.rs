//! Customer repository for database operations.

use sqlx::PgPool;

use marquee_core::{CustomerId, Email, Page, PageRequest, RoleSet};

use super::{CustomerStore, RepositoryError, total_from_count};
use crate::models::{Customer, NewCustomer};

const CUSTOMER_COLUMNS: &str = "id, first_name, last_name, email, phone, password_hash, \
                                roles, active, created_at, updated_at";

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl CustomerStore for CustomerRepository<'_> {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    async fn exists_by_email(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE email = $1)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            INSERT INTO customers (id, first_name, last_name, email, phone, password_hash, roles)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(CustomerId::generate())
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.password_hash)
        .bind(&customer.roles)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "email already exists"))
    }

    async fn set_active(
        &self,
        id: CustomerId,
        active: bool,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r"
            UPDATE customers SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    async fn set_roles(
        &self,
        id: CustomerId,
        roles: &RoleSet,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r"
            UPDATE customers SET roles = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(roles)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    async fn list_active(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Customer>, RepositoryError> {
        let pattern = query.map(like_pattern);

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM customers
            WHERE active
              AND ($1::text IS NULL
                   OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)
            ",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let customers = sqlx::query_as::<_, Customer>(&format!(
            r"
            SELECT {CUSTOMER_COLUMNS} FROM customers
            WHERE active
              AND ($1::text IS NULL
                   OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(pattern.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(customers, page, total_from_count(total)?))
    }
}

/// Build an `ILIKE` substring pattern, escaping wildcards in user input.
pub(crate) fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
