//! Booking lifecycle endpoints.
//!
//! - `POST /api/bookings` creates a booking request
//! - `POST /api/bookings/:id/confirm|cancel|checkin|checkout|no-show`
//!   drives the state machine
//! - `GET /api/bookings/:id` and `GET /api/units/:id/bookings` are read
//!   paths off the archive

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use stayforge_core::{Booking, BookingId, GuestContact, GuestId, Interval, UnitId};
use uuid::Uuid;

/// Guest details on a booking request
#[derive(Debug, Deserialize)]
pub struct GuestRequest {
    /// Existing guest id, if known
    pub guest_id: Option<Uuid>,
    /// Full name
    pub name: String,
    /// Email address
    pub email: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

impl From<GuestRequest> for GuestContact {
    fn from(request: GuestRequest) -> Self {
        Self {
            guest_id: request.guest_id.map_or_else(GuestId::new, GuestId::from_uuid),
            name: request.name,
            email: request.email,
            phone: request.phone,
        }
    }
}

/// Request to create a booking
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Unit to book
    pub unit_id: Uuid,
    /// Stay start (inclusive)
    pub start_at: DateTime<Utc>,
    /// Stay end (exclusive)
    pub end_at: DateTime<Utc>,
    /// Reserved quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Guest contact
    pub guest: GuestRequest,
}

const fn default_quantity() -> u32 {
    1
}

/// Body for cancellation
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Caller-supplied reason
    pub reason: String,
}

/// Creates a booking request
pub async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let interval = Interval::new(request.start_at, request.end_at)?;
    let booking = state
        .engine
        .create_booking(
            UnitId::from_uuid(request.unit_id),
            interval,
            request.quantity,
            request.guest.into(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Confirms a pending booking
pub async fn confirm(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .confirm(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking))
}

/// Cancels a pending or confirmed booking
pub async fn cancel(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .cancel(BookingId::from_uuid(booking_id), request.reason)
        .await?;
    Ok(Json(booking))
}

/// Checks the guest in
pub async fn check_in(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .check_in(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking))
}

/// Checks the guest out and settles the stay
pub async fn check_out(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .check_out(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking))
}

/// Marks a confirmed booking as a no-show
pub async fn mark_no_show(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .engine
        .mark_no_show(BookingId::from_uuid(booking_id))
        .await?;
    Ok(Json(booking))
}

/// Fetches one booking
pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking_id = BookingId::from_uuid(booking_id);
    let booking = state
        .engine
        .get_booking(booking_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("booking {booking_id} not found")))?;
    Ok(Json(booking))
}

/// All bookings on a unit, newest first
pub async fn bookings_for_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    let bookings = state
        .engine
        .bookings_for_unit(UnitId::from_uuid(unit_id))
        .await?;
    Ok(Json(bookings))
}
