//! Business services.
//!
//! Services borrow their stores for the duration of a request and never
//! see HTTP types. Handlers in `routes` build them from [`crate::state::AppState`].

pub mod auth;
pub mod catalog;
pub mod customers;
pub mod email;
pub mod notifications;
pub mod purchases;
pub mod stats;
pub mod storage;

pub use auth::{AuthError, AuthService, AuthenticatedCustomer, TokenService};
pub use catalog::{CatalogError, MovieService};
pub use customers::{CustomerAdminService, CustomerError};
pub use email::{EmailError, EmailService};
pub use notifications::{Mailer, Notification, Notifier, PurchaseReceipt};
pub use purchases::{PurchaseError, PurchaseService};
pub use stats::StatsService;
pub use storage::{StorageBackend, StorageError, Upload};
