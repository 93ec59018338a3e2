//! # Stayforge Web
//!
//! Axum HTTP surface over the booking engine: booking lifecycle
//! commands, availability and calendar queries, walk-in operations,
//! read-only ledger access, and advisory reconciliation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
