//! Bearer-token extractors.
//!
//! Every protected handler names the identity it needs in its signature:
//!
//! ```rust,ignore
//! async fn my_purchases(RequireCustomer(customer): RequireCustomer) -> ... {}
//! async fn stats(RequireAdmin(_admin): RequireAdmin) -> ... {}
//! ```
//!
//! Both extractors validate the token, reload the customer and reject
//! disabled accounts, so a still-valid token stops working as soon as the
//! account is disabled.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use tracing::Span;

use marquee_core::Role;

use crate::db::CustomerRepository;
use crate::error::{AppError, set_sentry_user};
use crate::services::auth::{AuthError, AuthService, AuthenticatedCustomer, policy};
use crate::state::AppState;

/// Extractor for any signed-in customer with the `USER` role.
pub struct RequireCustomer(pub AuthenticatedCustomer);

/// Extractor for a signed-in customer with the `ADMIN` role.
pub struct RequireAdmin(pub AuthenticatedCustomer);

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let customer = authenticate(parts, state).await?;
        policy::require(&customer.roles, Role::User)?;
        Ok(Self(customer))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let customer = authenticate(parts, state).await?;
        if let Err(e) = policy::require(&customer.roles, Role::Admin) {
            tracing::warn!(
                customer_id = %customer.id,
                path = %parts.uri.path(),
                "Admin route denied"
            );
            return Err(e.into());
        }
        Ok(Self(customer))
    }
}

async fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthenticatedCustomer, AppError> {
    let token = bearer_token(&parts.headers).ok_or(AuthError::Unauthenticated)?;

    let customers = CustomerRepository::new(state.pool());
    let customer = AuthService::new(&customers, state.tokens(), state.notifier())
        .authenticate(token)
        .await?;

    Span::current().record("customer_id", tracing::field::display(customer.id));
    set_sentry_user(&customer.id);
    Ok(customer)
}

/// The credentials of an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(value).unwrap_or_else(|e| panic!("{e}"));
        headers.insert(AUTHORIZATION, value);
        headers
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
