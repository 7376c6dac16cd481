//! Marquee Core - Shared domain types.
//!
//! This crate provides the types used across all Marquee components:
//! - `api` - Ticketing backend (catalog, auth, purchases, administration)
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database access,
//! no HTTP clients. Database encoding lives behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, money, statuses and pagination

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
