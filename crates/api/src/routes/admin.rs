//! Administrator endpoints. Every handler requires the `ADMIN` role.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use marquee_core::{CustomerId, MovieId, Page, PageRequest, PurchaseId, PurchaseStatus};

use super::PageQuery;
use crate::db::{CustomerRepository, MovieRepository, PurchaseRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{
    CustomerProfile, Movie, MovieDraft, Purchase, PurchaseFilter, PurchaseStats,
};
use crate::services::catalog::MAX_POSTER_BYTES;
use crate::services::{CustomerAdminService, MovieService, PurchaseService, StatsService, Upload};
use crate::state::AppState;

/// Room for multipart framing around the poster itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{id}", put(update_movie))
        .route("/movies/{id}/disable", patch(disable_movie))
        .route(
            "/movies/{id}/poster",
            post(upload_poster)
                .layer(DefaultBodyLimit::max(MAX_POSTER_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}/disable", patch(disable_customer))
        .route("/purchases", get(search_purchases))
        .route("/purchases/{id}", get(get_purchase))
        .route("/stats", get(stats))
}

// =============================================================================
// Movies
// =============================================================================

async fn list_movies(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Movie>>> {
    let movies = MovieRepository::new(state.pool());
    Ok(Json(
        MovieService::new(&movies, state.storage())
            .list_all(query.request())
            .await?,
    ))
}

async fn create_movie(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(draft): Json<MovieDraft>,
) -> Result<(StatusCode, Json<Movie>)> {
    let movies = MovieRepository::new(state.pool());
    let movie = MovieService::new(&movies, state.storage())
        .create(draft)
        .await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

async fn update_movie(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<MovieId>,
    Json(draft): Json<MovieDraft>,
) -> Result<Json<Movie>> {
    let movies = MovieRepository::new(state.pool());
    Ok(Json(
        MovieService::new(&movies, state.storage())
            .update(id, draft)
            .await?,
    ))
}

async fn disable_movie(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<MovieId>,
) -> Result<Json<Movie>> {
    let movies = MovieRepository::new(state.pool());
    Ok(Json(
        MovieService::new(&movies, state.storage())
            .disable(id)
            .await?,
    ))
}

async fn upload_poster(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<MovieId>,
    multipart: Multipart,
) -> Result<Json<Movie>> {
    let upload = read_file_field(multipart).await?;
    info!(admin_id = %admin.id, movie_id = %id, "Poster upload received");

    let movies = MovieRepository::new(state.pool());
    Ok(Json(
        MovieService::new(&movies, state.storage())
            .upload_poster(id, upload)
            .await?,
    ))
}

/// The multipart field named `file`.
async fn read_file_field(mut multipart: Multipart) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let original_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        return Ok(Upload {
            bytes: bytes.to_vec(),
            original_name,
            content_type,
        });
    }
    Err(AppError::BadRequest("Missing multipart field 'file'".to_owned()))
}

// =============================================================================
// Customers
// =============================================================================

/// `?q&page&size`
#[derive(Debug, Default, Deserialize)]
struct CustomerQuery {
    q: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
}

async fn list_customers(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Page<CustomerProfile>>> {
    let customers = CustomerRepository::new(state.pool());
    let page = PageRequest::new(query.page, query.size);
    Ok(Json(
        CustomerAdminService::new(&customers)
            .list_active(query.q.as_deref(), page)
            .await?,
    ))
}

async fn get_customer(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerProfile>> {
    let customers = CustomerRepository::new(state.pool());
    Ok(Json(CustomerAdminService::new(&customers).get(id).await?))
}

async fn disable_customer(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<CustomerId>,
) -> Result<Json<CustomerProfile>> {
    let customers = CustomerRepository::new(state.pool());
    let profile = CustomerAdminService::new(&customers).disable(id).await?;
    info!(admin_id = %admin.id, customer_id = %id, "Customer disabled by admin");
    Ok(Json(profile))
}

// =============================================================================
// Purchases
// =============================================================================

/// `?customerId&movieId&status&startDate&endDate&page&size`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseQuery {
    customer_id: Option<CustomerId>,
    movie_id: Option<MovieId>,
    status: Option<PurchaseStatus>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    page: Option<u32>,
    size: Option<u32>,
}

impl PurchaseQuery {
    fn split(self) -> (PurchaseFilter, PageRequest) {
        (
            PurchaseFilter {
                customer_id: self.customer_id,
                movie_id: self.movie_id,
                status: self.status,
                start_date: self.start_date,
                end_date: self.end_date,
            },
            PageRequest::new(self.page, self.size),
        )
    }
}

async fn search_purchases(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<PurchaseQuery>,
) -> Result<Json<Page<Purchase>>> {
    let (filter, page) = query.split();
    let purchases = PurchaseRepository::new(state.pool());
    Ok(Json(
        PurchaseService::new(&purchases, state.notifier())
            .search(&filter, page)
            .await?,
    ))
}

async fn get_purchase(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<PurchaseId>,
) -> Result<Json<Purchase>> {
    let purchases = PurchaseRepository::new(state.pool());
    Ok(Json(
        PurchaseService::new(&purchases, state.notifier())
            .get_purchase(id)
            .await?,
    ))
}

async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<PurchaseStats>> {
    let purchases = PurchaseRepository::new(state.pool());
    Ok(Json(StatsService::new(&purchases).get_stats().await?))
}
