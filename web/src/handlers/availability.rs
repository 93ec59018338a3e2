//! Availability and calendar endpoints.
//!
//! - `POST /api/availability/check` answers "can I book this?"
//! - `GET /api/availability/:unit_id` aggregates occupancy for calendar
//!   rendering; the response carries the server-derived percentages and
//!   bands so clients never redo the overlap math

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stayforge_core::{Interval, UnitId};
use stayforge_engine::availability::{AvailabilityCheck, Granularity, OccupancyBand};
use uuid::Uuid;

/// Request to check a concrete interval
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Unit to check
    pub unit_id: Uuid,
    /// Candidate start (inclusive)
    pub start_at: DateTime<Utc>,
    /// Candidate end (exclusive)
    pub end_at: DateTime<Utc>,
    /// Requested quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Availability check with suggestions
pub async fn check(
    State(state): State<AppState>,
    Json(request): Json<CheckRequest>,
) -> Result<Json<AvailabilityCheck>, ApiError> {
    let interval = Interval::new(request.start_at, request.end_at)?;
    let result = state
        .engine
        .check_availability(UnitId::from_uuid(request.unit_id), interval, request.quantity)
        .await?;
    Ok(Json(result))
}

/// Query parameters for the occupancy calendar
#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    /// Window start (inclusive)
    pub start: DateTime<Utc>,
    /// Window end (exclusive)
    pub end: DateTime<Utc>,
    /// Slot granularity
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
}

const fn default_granularity() -> Granularity {
    Granularity::Day
}

/// One rendered calendar slot
#[derive(Debug, Serialize)]
pub struct OccupancySlotResponse {
    /// Slot start (inclusive)
    pub slot_start: DateTime<Utc>,
    /// Slot end (exclusive)
    pub slot_end: DateTime<Utc>,
    /// Percentage of the slot covered by bookings, capped at 100
    pub percent_booked: u32,
    /// Free, partial, or full
    pub band: OccupancyBand,
    /// A checked-in booking touches the slot; takes rendering precedence
    pub active: bool,
}

/// Occupancy aggregation for calendar rendering
pub async fn occupancy(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
    Query(query): Query<OccupancyQuery>,
) -> Result<Json<Vec<OccupancySlotResponse>>, ApiError> {
    let window = Interval::new(query.start, query.end)?;
    let slots = state
        .engine
        .occupancy(UnitId::from_uuid(unit_id), window, query.granularity)
        .await?;

    let response = slots
        .into_iter()
        .map(|slot| OccupancySlotResponse {
            slot_start: slot.slot.start(),
            slot_end: slot.slot.end(),
            percent_booked: slot.percent_booked,
            band: slot.band(),
            active: slot.active,
        })
        .collect();
    Ok(Json(response))
}
