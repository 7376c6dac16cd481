//! Domain models for the API.
//!
//! These types are shared between the persistence layer and the services.
//! Request and response shapes that only matter to HTTP live in `routes`.

pub mod customer;
pub mod movie;
pub mod purchase;

pub use customer::{Customer, CustomerProfile, NewCustomer};
pub use movie::{DraftError, Movie, MovieDraft, MovieFilter, ValidMovieDraft};
pub use purchase::{PaymentInfo, Purchase, PurchaseFilter, PurchaseRequest, PurchaseStats};
