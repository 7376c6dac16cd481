//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health                            - Liveness
//! GET   /health/ready                      - Readiness (database reachable)
//!
//! # Auth
//! POST  /api/auth/register                 - Register (201)
//! POST  /api/auth/login                    - Login, returns a bearer token
//!
//! # Catalog (public)
//! GET   /api/movies?q&genre&page&size      - Active movies
//! GET   /api/movies/genres                 - Distinct active genres
//! GET   /api/movies/{id}                   - One active movie
//!
//! # Purchases (customer)
//! POST  /api/purchases                     - Buy tickets (201)
//! GET   /api/purchases/my-purchases        - Own purchases, newest first
//!
//! # Admin
//! GET   /api/admin/movies?page&size        - All movies incl. disabled
//! POST  /api/admin/movies                  - Create movie (201)
//! PUT   /api/admin/movies/{id}             - Update movie
//! PATCH /api/admin/movies/{id}/disable     - Soft delete
//! POST  /api/admin/movies/{id}/poster      - Upload poster (multipart `file`)
//! GET   /api/admin/customers?q&page&size   - Active customers
//! GET   /api/admin/customers/{id}          - One customer
//! PATCH /api/admin/customers/{id}/disable  - Disable customer
//! GET   /api/admin/purchases?...           - Filtered purchase search
//! GET   /api/admin/purchases/{id}          - One purchase
//! GET   /api/admin/stats                   - Revenue and ticket totals
//!
//! # Static
//! GET   /uploads/*                         - Local backend artifacts
//! ```

pub mod admin;
pub mod auth;
pub mod movies;
pub mod purchases;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::services::ServeDir;

use marquee_core::PageRequest;

use crate::services::StorageBackend;
use crate::services::storage::PUBLIC_PREFIX;
use crate::state::AppState;

/// `?page&size` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.size)
    }
}

/// The full application router, without outer layers.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/movies", movies::routes())
        .nest("/purchases", purchases::routes())
        .nest("/admin", admin::routes());

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api", api);

    if let StorageBackend::Local(local) = state.storage() {
        let prefix = PUBLIC_PREFIX.trim_end_matches('/');
        router = router.nest_service(prefix, ServeDir::new(local.root()));
    }

    router.with_state(state)
}

/// Liveness check. Does not touch dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: the database answers.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(state.pool())
        .await
    {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;
    use crate::services::Notifier;

    /// Router over a lazy pool; requests that never reach the database work.
    fn app(upload_dir: &std::path::Path) -> Router {
        let vars: HashMap<&str, String> = HashMap::from([
            ("MARQUEE_DATABASE_URL", "postgres://localhost/marquee".to_owned()),
            ("MARQUEE_BASE_URL", "http://localhost:8080".to_owned()),
            (
                "MARQUEE_TOKEN_SECRET",
                "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%dF8".to_owned(),
            ),
            ("STORAGE_UPLOAD_DIR", upload_dir.display().to_string()),
        ]);
        let config = ApiConfig::from_source(&move |key: &str| vars.get(key).cloned()).unwrap();
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/marquee")
            .unwrap();
        let (notifier, _rx) = Notifier::channel();
        router(AppState::new(config, pool, notifier).unwrap())
    }

    async fn error_message(response: axum::response::Response) -> String {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        value["error"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_purchases_require_token() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::get("/api/purchases/my-purchases")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_before_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::get("/api/admin/stats")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_message(response).await, "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_local_uploads_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posters")).unwrap();
        std::fs::write(dir.path().join("posters/a.png"), b"png").unwrap();

        let app = app(dir.path());
        let response = app
            .clone()
            .oneshot(
                Request::get("/uploads/posters/a.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"png");

        let missing = app
            .oneshot(
                Request::get("/uploads/posters/missing.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
