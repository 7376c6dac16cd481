//! Customer purchases.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::db::PurchaseRepository;
use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::{Purchase, PurchaseRequest};
use crate::services::PurchaseService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/my-purchases", get(my_purchases))
}

async fn create(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<Purchase>)> {
    let purchases = PurchaseRepository::new(state.pool());
    let purchase = PurchaseService::new(&purchases, state.notifier())
        .create_purchase(&customer, request)
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

async fn my_purchases(
    State(state): State<AppState>,
    RequireCustomer(customer): RequireCustomer,
) -> Result<Json<Vec<Purchase>>> {
    let purchases = PurchaseRepository::new(state.pool());
    let list = PurchaseService::new(&purchases, state.notifier())
        .my_purchases(&customer)
        .await?;
    Ok(Json(list))
}
