//! Availability Engine.
//!
//! Pure interval-overlap reasoning over a unit's existing bookings:
//!
//! - [`check_availability`] answers "is this interval free for this
//!   quantity", listing conflicts and best-effort alternative intervals
//! - [`aggregate_occupancy`] buckets a window into hour/day/week/month
//!   slots with a booked percentage, for calendar rendering
//!
//! Only bookings whose status holds inventory (`PENDING`, `CONFIRMED`,
//! `CHECKED_IN`) count. All overlap math is half-open: touching endpoints
//! never conflict. No side effects anywhere in this module; admission
//! control happens in the service shell, which calls these functions under
//! the per-unit lock.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use stayforge_core::{AllocationType, Booking, EngineError, Interval, PriceUnit, RentableUnit};

/// Maximum forward probes when searching for alternative intervals
const SUGGESTION_PROBES: u32 = 14;

/// Maximum alternative intervals returned
const MAX_SUGGESTIONS: usize = 3;

// ============================================================================
// Availability check
// ============================================================================

/// Result of an availability check
#[derive(Clone, Debug, Serialize)]
pub struct AvailabilityCheck {
    /// Whether the requested interval and quantity can be admitted
    pub available: bool,
    /// Bookings that overlap the candidate interval
    pub conflicting_bookings: Vec<Booking>,
    /// Best-effort alternative intervals of the same duration (empty when
    /// available)
    pub suggested_intervals: Vec<Interval>,
}

/// Checks whether `interval` is free on `unit` for `quantity`.
///
/// For `Exclusive` units any overlapping active booking blocks admission.
/// For `Capacity` units the overlapping quantities are summed and the
/// request is admitted iff `existing + requested <= limit`.
///
/// When the slot is taken, up to three alternative intervals of the same
/// duration are suggested by probing forward at fixed steps (one day for
/// nightly and monthly units, one hour otherwise). This is a best-effort
/// heuristic, not an optimal scheduler.
///
/// # Errors
///
/// Returns [`EngineError::CapacityExceeded`] when `quantity` is zero or
/// exceeds the unit's capacity on its own.
pub fn check_availability(
    unit: &RentableUnit,
    bookings: &[Booking],
    interval: Interval,
    quantity: u32,
) -> Result<AvailabilityCheck, EngineError> {
    if quantity == 0 || quantity > unit.capacity() {
        return Err(EngineError::CapacityExceeded {
            unit_id: unit.id,
            requested: quantity,
            capacity: unit.capacity(),
        });
    }

    let conflicting_bookings = conflicts(bookings, interval);
    let available = admits(unit, &conflicting_bookings, quantity);

    let suggested_intervals = if available {
        Vec::new()
    } else {
        suggest_intervals(unit, bookings, interval, quantity)
    };

    Ok(AvailabilityCheck {
        available,
        conflicting_bookings,
        suggested_intervals,
    })
}

/// Active bookings overlapping `interval`, in creation order
fn conflicts(bookings: &[Booking], interval: Interval) -> Vec<Booking> {
    bookings
        .iter()
        .filter(|b| b.status.holds_inventory() && b.interval.overlaps(&interval))
        .cloned()
        .collect()
}

/// Capacity rule shared by the check and the suggestion probe
fn admits(unit: &RentableUnit, conflicting: &[Booking], quantity: u32) -> bool {
    match unit.allocation {
        AllocationType::Exclusive => conflicting.is_empty(),
        AllocationType::Capacity { limit } => {
            let existing: u32 = conflicting.iter().map(|b| b.quantity).sum();
            existing + quantity <= limit
        }
    }
}

/// Probes forward from the requested interval for free alternatives
fn suggest_intervals(
    unit: &RentableUnit,
    bookings: &[Booking],
    interval: Interval,
    quantity: u32,
) -> Vec<Interval> {
    let step = match unit.price_unit {
        PriceUnit::Hour => Duration::hours(1),
        PriceUnit::Night | PriceUnit::Month => Duration::days(1),
    };

    let mut suggestions = Vec::new();
    for probe in 1..=SUGGESTION_PROBES {
        let candidate = interval.shifted_by(step * i32::try_from(probe).unwrap_or(i32::MAX));
        let overlapping = conflicts(bookings, candidate);
        if admits(unit, &overlapping, quantity) {
            suggestions.push(candidate);
            if suggestions.len() == MAX_SUGGESTIONS {
                break;
            }
        }
    }
    suggestions
}

// ============================================================================
// Slot aggregation for calendar display
// ============================================================================

/// Calendar slot width
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One-hour slots
    Hour,
    /// One-day slots
    Day,
    /// Seven-day slots
    Week,
    /// Thirty-day slots
    Month,
}

impl Granularity {
    /// Slot width as a duration
    #[must_use]
    pub fn step(&self) -> Duration {
        match self {
            Self::Hour => Duration::hours(1),
            Self::Day => Duration::days(1),
            Self::Week => Duration::days(7),
            Self::Month => Duration::days(30),
        }
    }
}

/// Rendering band derived from the booked percentage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyBand {
    /// 0% booked
    Free,
    /// 1-99% booked
    Partial,
    /// 100% booked
    Full,
}

/// One aggregated calendar slot
#[derive(Clone, Debug, Serialize)]
pub struct OccupancySlot {
    /// Slot interval, half-open
    pub slot: Interval,
    /// Percentage of the slot covered by active bookings, capped at 100
    pub percent_booked: u32,
    /// Whether any `CHECKED_IN` booking touches the slot. Takes rendering
    /// precedence over the percentage band.
    pub active: bool,
}

impl OccupancySlot {
    /// Color band for rendering
    #[must_use]
    pub const fn band(&self) -> OccupancyBand {
        match self.percent_booked {
            0 => OccupancyBand::Free,
            100.. => OccupancyBand::Full,
            _ => OccupancyBand::Partial,
        }
    }
}

/// Buckets `window` into `granularity`-sized slots and computes how booked
/// each slot is.
///
/// `percent_booked` is the summed overlap duration between the slot and
/// each active booking, divided by the slot duration and capped at 100.
/// The server-side math here is the source of truth; rendering layers only
/// format what this returns.
#[must_use]
pub fn aggregate_occupancy(
    bookings: &[Booking],
    window: Interval,
    granularity: Granularity,
) -> Vec<OccupancySlot> {
    let step = granularity.step();
    let mut slots = Vec::new();
    let mut slot_start = window.start();

    while slot_start < window.end() {
        let slot_end = (slot_start + step).min(window.end());
        let Ok(slot) = Interval::new(slot_start, slot_end) else {
            break;
        };

        let slot_seconds = slot.duration().num_seconds().max(1);
        let mut overlap_seconds: i64 = 0;
        let mut active = false;
        for booking in bookings.iter().filter(|b| b.status.holds_inventory()) {
            let overlap = booking.interval.intersection_duration(&slot);
            if overlap > Duration::zero() {
                overlap_seconds += overlap.num_seconds();
                if booking.status == stayforge_core::BookingStatus::CheckedIn {
                    active = true;
                }
            }
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent_booked = ((overlap_seconds * 100) / slot_seconds).clamp(0, 100) as u32;

        slots.push(OccupancySlot {
            slot,
            percent_booked,
            active,
        });
        slot_start = slot_end;
    }

    slots
}
