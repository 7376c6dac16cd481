//! Public catalog.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use marquee_core::{MovieId, Page, PageRequest};

use crate::db::MovieRepository;
use crate::error::Result;
use crate::models::{Movie, MovieFilter};
use crate::services::MovieService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/genres", get(genres))
        .route("/{id}", get(detail))
}

/// `?q&genre&page&size`
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Page<Movie>>> {
    let movies = MovieRepository::new(state.pool());
    let page = PageRequest::new(query.page, query.size);
    let filter = MovieFilter {
        query: query.q,
        genre: query.genre,
    };
    let result = MovieService::new(&movies, state.storage())
        .list_active(filter, page)
        .await?;
    Ok(Json(result))
}

async fn genres(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let movies = MovieRepository::new(state.pool());
    Ok(Json(MovieService::new(&movies, state.storage()).genres().await?))
}

async fn detail(State(state): State<AppState>, Path(id): Path<MovieId>) -> Result<Json<Movie>> {
    let movies = MovieRepository::new(state.pool());
    Ok(Json(
        MovieService::new(&movies, state.storage()).get_active(id).await?,
    ))
}
