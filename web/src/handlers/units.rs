//! Unit catalog endpoints.
//!
//! - `POST /api/units` registers or updates a unit
//! - `GET /api/units` lists the catalog
//! - `GET /api/units/:id` fetches one unit

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use stayforge_core::{AllocationType, Money, PriceUnit, RentableUnit, UnitId};
use uuid::Uuid;

/// Request to register or update a unit
#[derive(Debug, Deserialize)]
pub struct UpsertUnitRequest {
    /// Existing unit id; omitted on first registration
    pub id: Option<Uuid>,
    /// Display name
    pub name: String,
    /// Base price in minor currency units
    pub base_price_minor: u64,
    /// ISO currency code
    pub currency: String,
    /// Billing granularity
    pub price_unit: PriceUnit,
    /// Minimum rental duration in hours
    #[serde(default = "default_min_duration")]
    pub min_duration_hours: u32,
    /// Maximum number of guests
    pub max_occupancy: u32,
    /// Capacity limit; omitted for exclusive allocation
    pub capacity: Option<u32>,
    /// Confirm immediately on creation
    #[serde(default)]
    pub instant_booking: bool,
    /// Cancellation policy tag
    #[serde(default = "default_policy_tag")]
    pub policy_tag: String,
}

const fn default_min_duration() -> u32 {
    1
}

fn default_policy_tag() -> String {
    "STRICT".to_string()
}

/// Registers a unit or updates its catalog snapshot
pub async fn upsert_unit(
    State(state): State<AppState>,
    Json(request): Json<UpsertUnitRequest>,
) -> Result<(StatusCode, Json<RentableUnit>), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("unit name must not be empty"));
    }
    if request.max_occupancy == 0 {
        return Err(ApiError::bad_request("max occupancy must be positive"));
    }

    let unit = RentableUnit {
        id: request.id.map_or_else(UnitId::new, UnitId::from_uuid),
        name: request.name,
        base_price: Money::from_minor(request.base_price_minor),
        currency: request.currency,
        price_unit: request.price_unit,
        min_duration_hours: request.min_duration_hours,
        max_occupancy: request.max_occupancy,
        allocation: request
            .capacity
            .map_or(AllocationType::Exclusive, |limit| AllocationType::Capacity {
                limit,
            }),
        instant_booking: request.instant_booking,
        policy_tag: request.policy_tag,
    };

    state.engine.upsert_unit(unit.clone()).await;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Lists all registered units
pub async fn list_units(State(state): State<AppState>) -> Json<Vec<RentableUnit>> {
    Json(state.engine.units().await)
}

/// Fetches one unit
pub async fn get_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<Uuid>,
) -> Result<Json<RentableUnit>, ApiError> {
    let unit = state.engine.unit(UnitId::from_uuid(unit_id)).await?;
    Ok(Json(unit))
}
