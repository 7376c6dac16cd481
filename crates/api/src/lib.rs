//! Marquee API - movie catalog, customer accounts and ticket purchases.
//!
//! The binary in `main.rs` wires these modules into an Axum server. They are
//! exposed as a library so the CLI can reuse password hashing and the
//! repositories.
//!
//! # Layout
//!
//! - [`config`] - environment configuration
//! - [`db`] - store traits and their `PostgreSQL` implementations
//! - [`services`] - auth, purchases, stats, catalog, storage, notifications
//! - [`routes`] - HTTP handlers
//! - [`middleware`] - request ids and bearer-token extractors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
