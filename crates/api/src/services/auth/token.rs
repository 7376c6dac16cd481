//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying `sub`, `email`, `roles`, `iat` and `exp`.
//! Everything needed to authorize a request is embedded in the token and
//! verified against the server-held key; there is no session table.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marquee_core::{CustomerId, Email, Role, RoleSet};

/// Why a token was rejected or could not be issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a decodable JWT, or the claims do not have the expected shape.
    #[error("malformed token")]
    Malformed,
    /// Header names an algorithm other than HS256.
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    /// Signature does not match the payload.
    #[error("token signature mismatch")]
    BadSignature,
    /// The embedded expiry has passed.
    #[error("token expired")]
    Expired,
    /// Claims could not be encoded.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnsupportedAlgorithm
            }
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: CustomerId,
    email: String,
    roles: Vec<String>,
    iat: i64,
    exp: i64,
}

/// Identity and role claims recovered from a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub customer_id: CustomerId,
    pub email: String,
    /// Unrecognised role strings are dropped and grant nothing.
    pub roles: RoleSet,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds, as reported to clients.
    pub expires_in_secs: u64,
}

/// Issues and validates session tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl TokenService {
    /// Create a token service with a fixed token lifetime.
    #[must_use]
    pub fn new(key: SecretString, ttl: std::time::Duration) -> Self {
        let secret = key.expose_secret().as_bytes();

        // Expiry is compared against the caller's clock in `validate_at`
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: ttl.as_secs(),
        }
    }

    /// Issue a token that expires one lifetime from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue(
        &self,
        customer_id: CustomerId,
        email: &Email,
        roles: &RoleSet,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(customer_id, email, roles, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if the claims cannot be serialized.
    pub fn issue_at(
        &self,
        customer_id: CustomerId,
        email: &Email,
        roles: &RoleSet,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let exp = iat.saturating_add(i64::try_from(self.ttl_secs).unwrap_or(i64::MAX));
        let expires_at = DateTime::from_timestamp(exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC);

        let claims = Claims {
            sub: customer_id,
            email: email.as_str().to_owned(),
            roles: roles.iter().map(|r| r.as_str().to_owned()).collect(),
            iat,
            exp,
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in_secs: self.ttl_secs,
        })
    }

    /// Validate a token against the current time.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` if the token is malformed, tampered with, or expired.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` if the token is malformed, tampered with, or
    /// `now` is at or past its expiry.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(SessionClaims {
            customer_id: claims.sub,
            email: claims.email,
            roles: claims
                .roles
                .iter()
                .filter_map(|r| r.parse::<Role>().ok())
                .collect(),
            issued_at: DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Malformed)?,
            expires_at: DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Malformed)?,
        })
    }
}
