//! Walk-in Session Manager read projection.
//!
//! Walk-in command handling (quick check-in, extension, settlement) lives
//! in the lifecycle state machine; this module holds the operational view
//! over sessions currently checked in. The running price is a pure
//! function of `(now, actual_start_at, rate)` recomputed on every read.
//! It is never cached, because caching a value that moves with the wall
//! clock guarantees staleness.

use crate::pricing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stayforge_core::{Booking, BookingId, BookingStatus, Money, PolicyConfig, RentableUnit, UnitId};

/// Live snapshot of one checked-in session for operational dashboards
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActiveBookingView {
    /// Booking identifier
    pub booking_id: BookingId,
    /// Unit identifier
    pub unit_id: UnitId,
    /// Unit display name
    pub unit_name: String,
    /// Guest display name
    pub guest_name: String,
    /// Whether this is a walk-in session
    pub is_walk_in: bool,
    /// Actual arrival instant
    pub checked_in_at: DateTime<Utc>,
    /// Planning estimate for departure
    pub estimated_end_at: DateTime<Utc>,
    /// Billable hours elapsed so far, rounded up
    pub elapsed_hours: u32,
    /// Price owed if the guest checked out right now
    pub running_total: Money,
    /// ISO currency code
    pub currency: String,
}

/// Builds the live view for one booking, or `None` when the booking is
/// not currently checked in.
#[must_use]
pub fn active_view(
    unit: &RentableUnit,
    booking: &Booking,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Option<ActiveBookingView> {
    if booking.status != BookingStatus::CheckedIn {
        return None;
    }
    let checked_in_at = booking.actual_start_at?;
    let elapsed_hours = booking.billable_elapsed_hours(now)?;
    let running = pricing::settle_elapsed(unit, elapsed_hours, booking.quantity, policy);

    Some(ActiveBookingView {
        booking_id: booking.id,
        unit_id: unit.id,
        unit_name: unit.name.clone(),
        guest_name: booking.guest.name.clone(),
        is_walk_in: booking.is_walk_in,
        checked_in_at,
        estimated_end_at: booking.interval.end(),
        elapsed_hours,
        running_total: running.total,
        currency: unit.currency.clone(),
    })
}

/// Projects all checked-in sessions on a unit, oldest arrival first
#[must_use]
pub fn list_active<'a>(
    unit: &RentableUnit,
    bookings: impl IntoIterator<Item = &'a Booking>,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Vec<ActiveBookingView> {
    let mut views: Vec<ActiveBookingView> = bookings
        .into_iter()
        .filter_map(|b| active_view(unit, b, policy, now))
        .collect();
    views.sort_by_key(|v| v.checked_in_at);
    views
}
