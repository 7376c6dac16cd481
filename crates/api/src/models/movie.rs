//! Movie catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marquee_core::{Money, MoneyError, MovieId};

/// A catalog movie.
///
/// `active = false` is a soft delete: the movie disappears from the public
/// catalog but purchases keep referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub description: Option<String>,
    pub genre: String,
    pub duration_min: i32,
    pub price: Money,
    pub poster_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a [`MovieDraft`] was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("title is required")]
    MissingTitle,
    #[error("genre is required")]
    MissingGenre,
    #[error("duration must be at least 1 minute")]
    InvalidDuration,
    #[error("invalid price: {0}")]
    InvalidPrice(#[from] MoneyError),
}

/// Admin input for creating or replacing a movie.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub genre: String,
    pub duration_min: i32,
    pub price: Decimal,
}

/// A draft that passed validation.
#[derive(Debug, Clone)]
pub struct ValidMovieDraft {
    pub title: String,
    pub description: Option<String>,
    pub genre: String,
    pub duration_min: i32,
    pub price: Money,
}

impl MovieDraft {
    /// Check required fields, duration and price.
    ///
    /// # Errors
    ///
    /// Returns the first rule the draft breaks.
    pub fn validate(self) -> Result<ValidMovieDraft, DraftError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(DraftError::MissingTitle);
        }
        let genre = self.genre.trim().to_owned();
        if genre.is_empty() {
            return Err(DraftError::MissingGenre);
        }
        if self.duration_min < 1 {
            return Err(DraftError::InvalidDuration);
        }
        let price = Money::positive(self.price)?;
        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(ValidMovieDraft {
            title,
            description,
            genre,
            duration_min: self.duration_min,
            price,
        })
    }
}

/// Public catalog search parameters.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    /// Case-insensitive substring of title or description.
    pub query: Option<String>,
    /// Case-insensitive genre match.
    pub genre: Option<String>,
}

impl MovieFilter {
    /// Drop blank values so they impose no constraint.
    #[must_use]
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
        };
        Self {
            query: clean(self.query),
            genre: clean(self.genre),
        }
    }
}
