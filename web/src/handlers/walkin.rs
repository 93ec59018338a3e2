//! Walk-in session endpoints.
//!
//! - `POST /api/walkin/checkin` creates a session directly in
//!   `CHECKED_IN`
//! - `POST /api/walkin/:id/extend` moves the planning estimate
//! - `GET /api/walkin/active` is the live dashboard projection; running
//!   prices are recomputed per request

use crate::error::ApiError;
use crate::handlers::bookings::GuestRequest;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use stayforge_core::{Booking, BookingId, UnitId};
use stayforge_engine::ActiveBookingView;
use uuid::Uuid;

/// Request for a walk-in quick check-in
#[derive(Debug, Deserialize)]
pub struct QuickCheckInRequest {
    /// Unit the guest walked into
    pub unit_id: Uuid,
    /// Guest contact
    pub guest: GuestRequest,
    /// Number of guests
    #[serde(default = "default_guests")]
    pub guests: u32,
    /// Planning estimate in hours; billing uses actual elapsed time
    pub estimated_duration_hours: u32,
    /// Operational notes
    pub notes: Option<String>,
}

const fn default_guests() -> u32 {
    1
}

/// Request to extend a session estimate
#[derive(Debug, Deserialize)]
pub struct ExtendRequest {
    /// Hours to add
    pub additional_hours: u32,
}

/// Walk-in quick check-in
pub async fn quick_check_in(
    State(state): State<AppState>,
    Json(request): Json<QuickCheckInRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state
        .engine
        .quick_check_in(
            UnitId::from_uuid(request.unit_id),
            request.guest.into(),
            request.guests,
            request.estimated_duration_hours,
            request.notes,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Extends a walk-in session's estimate
pub async fn extend(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<ExtendRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .extend(BookingId::from_uuid(booking_id), request.additional_hours)
        .await?;
    Ok(Json(booking))
}

/// Live view over all checked-in sessions
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveBookingView>>, ApiError> {
    let views = state.engine.list_active().await?;
    Ok(Json(views))
}
