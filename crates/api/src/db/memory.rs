//! In-memory store for testing.
//!
//! Implements every store trait over plain vectors behind one async mutex.
//! A [`MemoryTransaction`] holds the lock for its whole lifetime and applies
//! staged purchases only on commit, so dropping it behaves like a rollback.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use marquee_core::{
    CustomerId, Email, Money, MovieId, Page, PageRequest, PurchaseId, PurchaseStatus, RoleSet,
};

use super::{
    CustomerStore, MovieStore, PurchaseStore, PurchaseTransaction, RepositoryError,
};
use crate::models::{
    Customer, Movie, MovieFilter, NewCustomer, Purchase, PurchaseFilter, ValidMovieDraft,
};

#[derive(Default)]
struct State {
    customers: Vec<Customer>,
    movies: Vec<Movie>,
    purchases: Vec<Purchase>,
}

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a customer directly, bypassing registration.
    pub async fn seed_customer(&self, first_name: &str, email: &str, active: bool) -> Customer {
        let now = Utc::now();
        let customer = Customer {
            id: CustomerId::generate(),
            first_name: first_name.to_owned(),
            last_name: "Tester".to_owned(),
            email: Email::parse(email).unwrap_or_else(|e| panic!("bad seed email: {e}")),
            phone: "555-0100".to_owned(),
            password_hash: String::new(),
            roles: RoleSet::user(),
            active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.customers.push(customer.clone());
        customer
    }

    /// Add a movie directly at the given price.
    pub async fn seed_movie(&self, title: &str, price: &str, active: bool) -> Movie {
        let now = Utc::now();
        let price = price
            .parse()
            .ok()
            .and_then(|d| Money::positive(d).ok())
            .unwrap_or_else(|| panic!("bad seed price: {price}"));
        let movie = Movie {
            id: MovieId::generate(),
            title: title.to_owned(),
            description: None,
            genre: "Drama".to_owned(),
            duration_min: 120,
            price,
            poster_url: None,
            active,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.movies.push(movie.clone());
        movie
    }

    /// Record a purchase with an arbitrary status, bypassing checkout.
    pub async fn seed_purchase(
        &self,
        customer_id: CustomerId,
        movie_id: MovieId,
        quantity: i32,
        total: &str,
        status: PurchaseStatus,
    ) -> Purchase {
        let total = total
            .parse()
            .ok()
            .and_then(|d| Money::new(d).ok())
            .unwrap_or_else(|| panic!("bad seed total: {total}"));
        let purchase = Purchase {
            id: PurchaseId::generate(),
            customer_id,
            movie_id,
            quantity,
            total_amount: total,
            status,
            payment_method: "CARD".to_owned(),
            last4: None,
            payment_note: "Payment by customer".to_owned(),
            created_at: Utc::now(),
        };
        self.state.lock().await.purchases.push(purchase.clone());
        purchase
    }

    /// Number of stored customers.
    pub async fn customer_count(&self) -> usize {
        self.state.lock().await.customers.len()
    }

    /// Number of stored purchases.
    pub async fn purchase_count(&self) -> usize {
        self.state.lock().await.purchases.len()
    }
}

/// Newest first; ties keep reverse insertion order.
fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().cloned().collect();
    out.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    out
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let slice = items.into_iter().skip(offset).take(limit).collect();
    Page::new(slice, page, total)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl CustomerStore for MemoryStore {
    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Customer>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.customers.iter().find(|c| &c.email == email).cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> Result<bool, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.customers.iter().any(|c| &c.email == email))
    }

    async fn insert(&self, customer: NewCustomer) -> Result<Customer, RepositoryError> {
        let mut state = self.state.lock().await;
        if state.customers.iter().any(|c| c.email == customer.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let customer = Customer {
            id: CustomerId::generate(),
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone: customer.phone,
            password_hash: customer.password_hash,
            roles: customer.roles,
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn set_active(
        &self,
        id: CustomerId,
        active: bool,
    ) -> Result<Option<Customer>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.active = active;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn set_roles(
        &self,
        id: CustomerId,
        roles: &RoleSet,
    ) -> Result<Option<Customer>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.roles = roles.clone();
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn list_active(
        &self,
        query: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Customer>, RepositoryError> {
        let state = self.state.lock().await;
        let matching: Vec<Customer> = newest_first(&state.customers, |c| c.created_at)
            .into_iter()
            .filter(|c| c.active)
            .filter(|c| {
                query.is_none_or(|q| {
                    contains_ci(&c.first_name, q)
                        || contains_ci(&c.last_name, q)
                        || contains_ci(c.email.as_str(), q)
                })
            })
            .collect();
        Ok(paginate(matching, page))
    }
}

impl MovieStore for MemoryStore {
    async fn find_by_id(&self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn find_active_by_id(&self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.movies.iter().find(|m| m.id == id && m.active).cloned())
    }

    async fn list_active(
        &self,
        filter: &MovieFilter,
        page: PageRequest,
    ) -> Result<Page<Movie>, RepositoryError> {
        let state = self.state.lock().await;
        let matching: Vec<Movie> = newest_first(&state.movies, |m| m.created_at)
            .into_iter()
            .filter(|m| m.active)
            .filter(|m| {
                filter.query.as_deref().is_none_or(|q| {
                    contains_ci(&m.title, q)
                        || m.description.as_deref().is_some_and(|d| contains_ci(d, q))
                })
            })
            .filter(|m| {
                filter
                    .genre
                    .as_deref()
                    .is_none_or(|g| m.genre.to_lowercase() == g.to_lowercase())
            })
            .collect();
        Ok(paginate(matching, page))
    }

    async fn list_all(&self, page: PageRequest) -> Result<Page<Movie>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(paginate(newest_first(&state.movies, |m| m.created_at), page))
    }

    async fn genres(&self) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.lock().await;
        let mut genres: Vec<String> = state
            .movies
            .iter()
            .filter(|m| m.active)
            .map(|m| m.genre.clone())
            .collect();
        genres.sort();
        genres.dedup();
        Ok(genres)
    }

    async fn insert(&self, draft: ValidMovieDraft) -> Result<Movie, RepositoryError> {
        let now = Utc::now();
        let movie = Movie {
            id: MovieId::generate(),
            title: draft.title,
            description: draft.description,
            genre: draft.genre,
            duration_min: draft.duration_min,
            price: draft.price,
            poster_url: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().await.movies.push(movie.clone());
        Ok(movie)
    }

    async fn update(
        &self,
        id: MovieId,
        draft: ValidMovieDraft,
    ) -> Result<Option<Movie>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.movies.iter_mut().find(|m| m.id == id).map(|m| {
            m.title = draft.title;
            m.description = draft.description;
            m.genre = draft.genre;
            m.duration_min = draft.duration_min;
            m.price = draft.price;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn set_active(&self, id: MovieId, active: bool) -> Result<Option<Movie>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.movies.iter_mut().find(|m| m.id == id).map(|m| {
            m.active = active;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn set_poster_url(
        &self,
        id: MovieId,
        url: Option<&str>,
    ) -> Result<Option<Movie>, RepositoryError> {
        let mut state = self.state.lock().await;
        Ok(state.movies.iter_mut().find(|m| m.id == id).map(|m| {
            m.poster_url = url.map(str::to_owned);
            m.updated_at = Utc::now();
            m.clone()
        }))
    }
}

impl PurchaseStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, RepositoryError> {
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state).lock_owned().await,
            staged: Vec::new(),
        })
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.purchases.iter().find(|p| p.id == id).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(newest_first(&state.purchases, |p| p.created_at)
            .into_iter()
            .filter(|p| p.customer_id == customer_id)
            .collect())
    }

    async fn search(
        &self,
        filter: &PurchaseFilter,
        page: PageRequest,
    ) -> Result<Page<Purchase>, RepositoryError> {
        let state = self.state.lock().await;
        let matching: Vec<Purchase> = newest_first(&state.purchases, |p| p.created_at)
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        Ok(paginate(matching, page))
    }

    async fn total_revenue(&self) -> Result<Money, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Paid)
            .map(|p| p.total_amount)
            .sum())
    }

    async fn total_tickets_sold(&self) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Paid)
            .map(|p| i64::from(p.quantity))
            .sum())
    }

    async fn count_all(&self) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        Ok(i64::try_from(state.purchases.len()).unwrap_or(i64::MAX))
    }
}

/// Exclusive view of the store for one checkout.
pub struct MemoryTransaction {
    state: OwnedMutexGuard<State>,
    staged: Vec<Purchase>,
}

impl PurchaseTransaction for MemoryTransaction {
    async fn find_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.state.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn find_active_movie(&mut self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        Ok(self
            .state
            .movies
            .iter()
            .find(|m| m.id == id && m.active)
            .cloned())
    }

    async fn insert_purchase(&mut self, purchase: &Purchase) -> Result<(), RepositoryError> {
        self.staged.push(purchase.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        let staged = std::mem::take(&mut self.staged);
        self.state.purchases.extend(staged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_transaction_discards_inserts() {
        let store = MemoryStore::new();
        let customer = store.seed_customer("Ana", "ana@example.com", true).await;
        let movie = store.seed_movie("Heat", "10.00", true).await;

        {
            let mut tx = store.begin().await.unwrap_or_else(|e| panic!("{e}"));
            let purchase = Purchase {
                id: PurchaseId::generate(),
                customer_id: customer.id,
                movie_id: movie.id,
                quantity: 1,
                total_amount: movie.price,
                status: PurchaseStatus::Paid,
                payment_method: "CARD".to_owned(),
                last4: None,
                payment_note: "Payment by customer".to_owned(),
                created_at: Utc::now(),
            };
            tx.insert_purchase(&purchase)
                .await
                .unwrap_or_else(|e| panic!("{e}"));
        }

        assert_eq!(store.purchase_count().await, 0);
    }

    #[tokio::test]
    async fn test_newest_first_breaks_ties_by_insertion() {
        let store = MemoryStore::new();
        let customer = store.seed_customer("Ana", "ana@example.com", true).await;
        let movie = store.seed_movie("Heat", "10.00", true).await;
        let first = store
            .seed_purchase(customer.id, movie.id, 1, "10.00", PurchaseStatus::Paid)
            .await;
        let second = store
            .seed_purchase(customer.id, movie.id, 1, "10.00", PurchaseStatus::Paid)
            .await;
        {
            // Force identical timestamps
            let mut state = store.state.lock().await;
            let at = state.purchases[0].created_at;
            state.purchases[1].created_at = at;
        }

        let listed = store
            .list_for_customer(customer.id)
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn test_search_date_range_is_inclusive() {
        let store = MemoryStore::new();
        let customer = store.seed_customer("Ana", "ana@example.com", true).await;
        let movie = store.seed_movie("Heat", "10.00", true).await;
        let purchase = store
            .seed_purchase(customer.id, movie.id, 1, "10.00", PurchaseStatus::Paid)
            .await;

        let filter = PurchaseFilter {
            start_date: Some(purchase.created_at),
            end_date: Some(purchase.created_at),
            ..PurchaseFilter::default()
        };
        let page = store
            .search(&filter, PageRequest::default())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(page.total_items, 1);

        let filter = PurchaseFilter {
            start_date: Some(purchase.created_at + Duration::seconds(1)),
            ..PurchaseFilter::default()
        };
        let page = store
            .search(&filter, PageRequest::default())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(page.total_items, 0);
    }
}
