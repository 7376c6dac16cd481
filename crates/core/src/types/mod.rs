//! Core types for Marquee.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod page;
pub mod role;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Money, MoneyError};
pub use page::{Page, PageRequest};
pub use role::{Role, RoleParseError, RoleSet};
pub use status::PurchaseStatus;
