//! Movie repository for database operations.

use sqlx::PgPool;

use marquee_core::{MovieId, Page, PageRequest};

use super::customers::like_pattern;
use super::{MovieStore, RepositoryError, total_from_count};
use crate::models::{Movie, MovieFilter, ValidMovieDraft};

const MOVIE_COLUMNS: &str = "id, title, description, genre, duration_min, price, poster_url, \
                             active, created_at, updated_at";

/// Repository for movie database operations.
pub struct MovieRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MovieRepository<'a> {
    /// Create a new movie repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl MovieStore for MovieRepository<'_> {
    async fn find_by_id(&self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        let movie =
            sqlx::query_as::<_, Movie>(&format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(movie)
    }

    async fn find_active_by_id(&self, id: MovieId) -> Result<Option<Movie>, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 AND active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(movie)
    }

    async fn list_active(
        &self,
        filter: &MovieFilter,
        page: PageRequest,
    ) -> Result<Page<Movie>, RepositoryError> {
        const WHERE: &str = r"
            WHERE active
              AND ($1::text IS NULL OR title ILIKE $1 OR description ILIKE $1)
              AND ($2::text IS NULL OR LOWER(genre) = LOWER($2))
        ";
        let pattern = filter.query.as_deref().map(like_pattern);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM movies {WHERE}"))
            .bind(pattern.as_deref())
            .bind(filter.genre.as_deref())
            .fetch_one(self.pool)
            .await?;

        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies {WHERE} \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(pattern.as_deref())
        .bind(filter.genre.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(movies, page, total_from_count(total)?))
    }

    async fn list_all(&self, page: PageRequest) -> Result<Page<Movie>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(self.pool)
            .await?;

        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(Page::new(movies, page, total_from_count(total)?))
    }

    async fn genres(&self) -> Result<Vec<String>, RepositoryError> {
        let genres =
            sqlx::query_scalar("SELECT DISTINCT genre FROM movies WHERE active ORDER BY genre")
                .fetch_all(self.pool)
                .await?;

        Ok(genres)
    }

    async fn insert(&self, draft: ValidMovieDraft) -> Result<Movie, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            r"
            INSERT INTO movies (id, title, description, genre, duration_min, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MOVIE_COLUMNS}
            "
        ))
        .bind(MovieId::generate())
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(&draft.genre)
        .bind(draft.duration_min)
        .bind(draft.price)
        .fetch_one(self.pool)
        .await?;

        Ok(movie)
    }

    async fn update(
        &self,
        id: MovieId,
        draft: ValidMovieDraft,
    ) -> Result<Option<Movie>, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            r"
            UPDATE movies
            SET title = $2, description = $3, genre = $4, duration_min = $5, price = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {MOVIE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(&draft.genre)
        .bind(draft.duration_min)
        .bind(draft.price)
        .fetch_optional(self.pool)
        .await?;

        Ok(movie)
    }

    async fn set_active(&self, id: MovieId, active: bool) -> Result<Option<Movie>, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            r"
            UPDATE movies SET active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MOVIE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(active)
        .fetch_optional(self.pool)
        .await?;

        Ok(movie)
    }

    async fn set_poster_url(
        &self,
        id: MovieId,
        url: Option<&str>,
    ) -> Result<Option<Movie>, RepositoryError> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            r"
            UPDATE movies SET poster_url = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {MOVIE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        Ok(movie)
    }
}
