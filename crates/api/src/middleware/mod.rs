//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded into the span, echoed in the response)
//!
//! Authentication is not a layer: handlers opt in with [`RequireCustomer`]
//! or [`RequireAdmin`].

pub mod auth;
pub mod request_id;

pub use auth::{RequireAdmin, RequireCustomer, bearer_token};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
