//! Application state shared across HTTP handlers.

use std::sync::Arc;
use stayforge_engine::BookingEngine;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// The booking engine behind every command and query
    pub engine: Arc<BookingEngine>,
}

impl AppState {
    /// Creates state over an engine
    #[must_use]
    pub const fn new(engine: Arc<BookingEngine>) -> Self {
        Self { engine }
    }
}
