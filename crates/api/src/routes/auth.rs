//! Registration and login.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Deserialize;

use crate::db::CustomerRepository;
use crate::error::Result;
use crate::models::CustomerProfile;
use crate::services::auth::{AuthService, LoginResponse, Registration};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<CustomerProfile>)> {
    let customers = CustomerRepository::new(state.pool());
    let profile = AuthService::new(&customers, state.tokens(), state.notifier())
        .register(registration)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let customers = CustomerRepository::new(state.pool());
    let response = AuthService::new(&customers, state.tokens(), state.notifier())
        .login(&request.email, &request.password)
        .await?;
    Ok(Json(response))
}
