//! Authentication service.
//!
//! Provides registration, password login, and session token validation.
//! Role checks live in [`policy`]; token signing lives in [`token`].

mod error;
pub mod password;
pub mod policy;
pub mod token;

pub use error::AuthError;
pub use password::{hash_password, validate_password, verify_password};
pub use token::{IssuedToken, SessionClaims, TokenError, TokenService};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use marquee_core::{CustomerId, Email, Role, RoleSet};

use crate::db::{CustomerStore, RepositoryError};
use crate::models::{CustomerProfile, NewCustomer};
use crate::services::notifications::{Notification, Notifier};

const MAX_NAME_LENGTH: usize = 100;
const MAX_PHONE_LENGTH: usize = 20;

/// A customer whose session token has been validated and whose account was
/// found active.
///
/// Every customer-scoped operation takes this explicitly; nothing reads the
/// caller from ambient state.
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer {
    pub id: CustomerId,
    pub email: Email,
    /// Role claims carried by the token.
    pub roles: RoleSet,
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub customer: CustomerProfile,
    pub roles: Vec<Role>,
}

/// Authentication service.
///
/// Handles customer registration, login and token authentication.
pub struct AuthService<'a, C> {
    customers: &'a C,
    tokens: &'a TokenService,
    notifier: &'a Notifier,
}

impl<'a, C: CustomerStore> AuthService<'a, C> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(customers: &'a C, tokens: &'a TokenService, notifier: &'a Notifier) -> Self {
        Self {
            customers,
            tokens,
            notifier,
        }
    }

    /// Register a new customer with the `USER` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation`, `AuthError::InvalidEmail` or
    /// `AuthError::WeakPassword` for bad input, and `AuthError::DuplicateEmail`
    /// if the email is already registered (no row is created).
    pub async fn register(&self, registration: Registration) -> Result<CustomerProfile, AuthError> {
        let first_name = required_field("first name", &registration.first_name, MAX_NAME_LENGTH)?;
        let last_name = required_field("last name", &registration.last_name, MAX_NAME_LENGTH)?;
        let phone = required_field("phone", &registration.phone, MAX_PHONE_LENGTH)?;
        let email = Email::parse(registration.email.trim())?;
        validate_password(&registration.password)?;

        if self.customers.exists_by_email(&email).await? {
            warn!(email = %email, "Registration rejected: email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(&registration.password)?;

        let customer = self
            .customers
            .insert(NewCustomer {
                first_name,
                last_name,
                email,
                phone,
                password_hash,
                roles: RoleSet::user(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::DuplicateEmail,
                other => AuthError::Repository(other),
            })?;

        info!(customer_id = %customer.id, "Customer registered");

        self.notifier.publish(Notification::CustomerRegistered {
            email: customer.email.clone(),
            first_name: customer.first_name.clone(),
        });

        Ok(CustomerProfile::from(customer))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong, and `AuthError::AccountDisabled` if the password is
    /// right but the account is disabled.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let email = Email::parse(email.trim()).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(customer) = self.customers.find_by_email(&email).await? else {
            warn!("Login rejected: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(e) = verify_password(password, &customer.password_hash) {
            warn!(customer_id = %customer.id, "Login rejected: wrong password");
            return Err(e);
        }

        if !customer.active {
            warn!(customer_id = %customer.id, "Login rejected: account disabled");
            return Err(AuthError::AccountDisabled);
        }

        let issued = self
            .tokens
            .issue(customer.id, &customer.email, &customer.roles)?;

        info!(customer_id = %customer.id, "Customer logged in");

        Ok(LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_in: issued.expires_in_secs,
            roles: customer.roles.iter().collect(),
            customer: CustomerProfile::from(customer),
        })
    }

    /// Resolve a bearer token to an active customer.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token fails validation,
    /// `AuthError::Unauthenticated` if its customer no longer exists, and
    /// `AuthError::AccountDisabled` if the customer has been disabled.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedCustomer, AuthError> {
        let claims = self.tokens.validate(token)?;

        let customer = self
            .customers
            .find_by_id(claims.customer_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !customer.active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(AuthenticatedCustomer {
            id: customer.id,
            email: customer.email,
            roles: claims.roles,
        })
    }
}

/// Trim a required text field and check its length.
fn required_field(name: &str, value: &str, max: usize) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{name} is required")));
    }
    if value.chars().count() > max {
        return Err(AuthError::Validation(format!(
            "{name} must be at most {max} characters"
        )));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::memory::MemoryStore;

    fn tokens() -> TokenService {
        TokenService::new(
            SecretString::from("k7Qm2Zp9Lx4Vb8Nc1Rt6Yh3Jw5Gd0Fs2"),
            Duration::from_secs(3600),
        )
    }

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Ana".to_owned(),
            last_name: "Diaz".to_owned(),
            email: email.to_owned(),
            phone: "555-0101".to_owned(),
            password: "s3cure-pass".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, mut rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        let profile = auth.register(registration("ana@example.com")).await.unwrap();
        assert_eq!(profile.roles, RoleSet::user());
        assert!(profile.active);
        assert!(matches!(
            rx.try_recv(),
            Ok(Notification::CustomerRegistered { .. })
        ));

        let login = auth.login("ana@example.com", "s3cure-pass").await.unwrap();
        assert_eq!(login.token_type, "Bearer");
        assert_eq!(login.expires_in, 3600);
        assert_eq!(login.roles, vec![Role::User]);

        let identity = auth.authenticate(&login.token).await.unwrap();
        assert_eq!(identity.id, profile.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_creates_no_row() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        auth.register(registration("ana@example.com")).await.unwrap();
        let err = auth
            .register(registration("ana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
        assert_eq!(store.customer_count().await, 1);
    }

    #[tokio::test]
    async fn test_email_uniqueness_is_case_sensitive() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        auth.register(registration("ana@example.com")).await.unwrap();
        auth.register(registration("Ana@example.com")).await.unwrap();
        assert_eq!(store.customer_count().await, 2);
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        let mut bad = registration("ana@example.com");
        bad.first_name = "  ".to_owned();
        assert!(matches!(auth.register(bad).await, Err(AuthError::Validation(_))));

        let mut bad = registration("ana@example.com");
        bad.phone = "1".repeat(21);
        assert!(matches!(auth.register(bad).await, Err(AuthError::Validation(_))));

        let mut bad = registration("not-an-email");
        bad.password = "s3cure-pass".to_owned();
        assert!(matches!(auth.register(bad).await, Err(AuthError::InvalidEmail(_))));

        let mut bad = registration("ana@example.com");
        bad.password = "short".to_owned();
        assert!(matches!(auth.register(bad).await, Err(AuthError::WeakPassword(_))));

        assert_eq!(store.customer_count().await, 0);
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_unknown_email() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);
        auth.register(registration("ana@example.com")).await.unwrap();

        assert!(matches!(
            auth.login("nobody@example.com", "s3cure-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ana@example.com", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_disabled_customer_cannot_login_or_authenticate() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        let profile = auth.register(registration("ana@example.com")).await.unwrap();
        let login = auth.login("ana@example.com", "s3cure-pass").await.unwrap();

        CustomerStore::set_active(&store, profile.id, false)
            .await
            .unwrap();

        assert!(matches!(
            auth.login("ana@example.com", "s3cure-pass").await,
            Err(AuthError::AccountDisabled)
        ));
        // Token is still unexpired, the account check must still apply
        assert!(matches!(
            auth.authenticate(&login.token).await,
            Err(AuthError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_token_for_missing_customer_is_unauthenticated() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let (notifier, _rx) = Notifier::channel();
        let auth = AuthService::new(&store, &tokens, &notifier);

        let orphan = tokens
            .issue(
                CustomerId::generate(),
                &Email::parse("ghost@example.com").unwrap(),
                &RoleSet::user(),
            )
            .unwrap();
        assert!(matches!(
            auth.authenticate(&orphan.token).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            auth.authenticate("garbage").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
