//! Router configuration.

use crate::handlers::{availability, bookings, health, ledger, units, walkin};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Builds the complete Axum router
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Unit catalog
        .route("/units", post(units::upsert_unit).get(units::list_units))
        .route("/units/:id", get(units::get_unit))
        .route("/units/:id/bookings", get(bookings::bookings_for_unit))
        // Booking lifecycle
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/confirm", post(bookings::confirm))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route("/bookings/:id/checkin", post(bookings::check_in))
        .route("/bookings/:id/checkout", post(bookings::check_out))
        .route("/bookings/:id/no-show", post(bookings::mark_no_show))
        // Availability
        .route("/availability/check", post(availability::check))
        .route("/availability/:unit_id", get(availability::occupancy))
        // Walk-in sessions
        .route("/walkin/checkin", post(walkin::quick_check_in))
        .route("/walkin/:id/extend", post(walkin::extend))
        .route("/walkin/active", get(walkin::list_active))
        // Ledger (read-only) and reconciliation
        .route("/ledger", get(ledger::list_entries))
        .route("/ledger/balance/:reference_id", get(ledger::balance_for))
        .route("/ledger/reconcile", post(ledger::reconcile));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
