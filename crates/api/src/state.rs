//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{Notifier, StorageBackend, StorageError, TokenService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Repositories are built per request from
/// [`AppState::pool`]; everything else is created once at startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenService,
    storage: StorageBackend,
    notifier: Notifier,
}

impl AppState {
    /// Create the application state.
    ///
    /// The storage backend is selected here and never changes afterwards.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the selected storage backend is misconfigured.
    pub fn new(config: ApiConfig, pool: PgPool, notifier: Notifier) -> Result<Self, StorageError> {
        let tokens = TokenService::new(config.token.secret.clone(), config.token.ttl);
        let storage = StorageBackend::from_config(&config.storage)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                storage,
                notifier,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// The storage backend chosen at startup.
    #[must_use]
    pub fn storage(&self) -> &StorageBackend {
        &self.inner.storage
    }

    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }
}
