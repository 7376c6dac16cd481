//! Movie catalog service.
//!
//! Public browsing sees only active movies. Administrators see everything
//! and manage posters through the configured [`StorageBackend`].

use thiserror::Error;
use tracing::{info, instrument, warn};

use marquee_core::{MovieId, Page, PageRequest};

use crate::db::{MovieStore, RepositoryError};
use crate::models::{DraftError, Movie, MovieDraft, MovieFilter};
use crate::services::storage::{StorageBackend, StorageError, Upload};

/// Largest accepted poster.
pub const MAX_POSTER_BYTES: usize = 10 * 1024 * 1024;

/// Storage folder for posters.
const POSTER_FOLDER: &str = "posters";

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No movie with this id (or not active, for public lookups).
    #[error("movie not found")]
    NotFound,

    /// Draft failed validation.
    #[error(transparent)]
    Invalid(#[from] DraftError),

    /// Poster upload rejected before storing.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Storing the artifact failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Movie catalog service.
pub struct MovieService<'a, M> {
    movies: &'a M,
    storage: &'a StorageBackend,
}

impl<'a, M: MovieStore> MovieService<'a, M> {
    #[must_use]
    pub const fn new(movies: &'a M, storage: &'a StorageBackend) -> Self {
        Self { movies, storage }
    }

    /// Active movies matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on database failure.
    pub async fn list_active(
        &self,
        filter: MovieFilter,
        page: PageRequest,
    ) -> Result<Page<Movie>, CatalogError> {
        Ok(self.movies.list_active(&filter.normalized(), page).await?)
    }

    /// One active movie.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown or disabled movies.
    pub async fn get_active(&self, id: MovieId) -> Result<Movie, CatalogError> {
        self.movies
            .find_active_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Distinct genres of active movies.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on database failure.
    pub async fn genres(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.movies.genres().await?)
    }

    /// Every movie, including disabled ones.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on database failure.
    pub async fn list_all(&self, page: PageRequest) -> Result<Page<Movie>, CatalogError> {
        Ok(self.movies.list_all(page).await?)
    }

    /// Add a movie.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` if the draft fails validation.
    pub async fn create(&self, draft: MovieDraft) -> Result<Movie, CatalogError> {
        let movie = self.movies.insert(draft.validate()?).await?;
        info!(movie_id = %movie.id, title = %movie.title, "Movie created");
        Ok(movie)
    }

    /// Replace a movie's editable fields.
    ///
    /// Existing purchases keep their recorded totals.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a bad draft and
    /// `CatalogError::NotFound` for an unknown id.
    pub async fn update(&self, id: MovieId, draft: MovieDraft) -> Result<Movie, CatalogError> {
        let movie = self
            .movies
            .update(id, draft.validate()?)
            .await?
            .ok_or(CatalogError::NotFound)?;
        info!(movie_id = %movie.id, price = %movie.price, "Movie updated");
        Ok(movie)
    }

    /// Soft-delete a movie.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown id.
    pub async fn disable(&self, id: MovieId) -> Result<Movie, CatalogError> {
        let movie = self
            .movies
            .set_active(id, false)
            .await?
            .ok_or(CatalogError::NotFound)?;
        info!(movie_id = %movie.id, "Movie disabled");
        Ok(movie)
    }

    /// Replace a movie's poster.
    ///
    /// The new poster is stored and saved first; the previous one is then
    /// deleted best-effort.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidUpload` for empty, oversized or
    /// non-image files, `CatalogError::NotFound` for an unknown id, and
    /// `CatalogError::Storage` if the backend fails to store the file.
    #[instrument(skip(self, upload), fields(size = upload.bytes.len()))]
    pub async fn upload_poster(&self, id: MovieId, upload: Upload) -> Result<Movie, CatalogError> {
        validate_poster(&upload)?;

        let existing = self
            .movies
            .find_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let url = self.storage.store(&upload, POSTER_FOLDER).await?;

        let Some(movie) = self.movies.set_poster_url(id, Some(&url)).await? else {
            warn!(movie_id = %id, "Movie vanished during poster upload");
            self.storage.delete(&url).await;
            return Err(CatalogError::NotFound);
        };

        if let Some(previous) = existing.poster_url.filter(|old| *old != url) {
            self.storage.delete(&previous).await;
        }

        info!(movie_id = %movie.id, url = %url, "Poster updated");
        Ok(movie)
    }
}

fn validate_poster(upload: &Upload) -> Result<(), CatalogError> {
    if upload.bytes.is_empty() {
        return Err(CatalogError::InvalidUpload("file is empty".to_owned()));
    }
    if upload.bytes.len() > MAX_POSTER_BYTES {
        return Err(CatalogError::InvalidUpload(
            "file exceeds the 10 MiB limit".to_owned(),
        ));
    }
    let is_image = upload
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"));
    if !is_image {
        return Err(CatalogError::InvalidUpload(
            "file must be an image".to_owned(),
        ));
    }
    Ok(())
}
