//! Engine error taxonomy.
//!
//! Validation errors are rejected at the boundary before any lock is
//! taken. Concurrency losses (`SlotNoLongerAvailable`, `LockTimeout`) are
//! retryable conflicts. Lifecycle errors are client errors and leave the
//! booking untouched. Ledger errors are fatal to the settlement that
//! raised them.

use crate::types::{BookingId, BookingStatus, UnitId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Interval is empty or reversed
    #[error("invalid interval: end {end} is not after start {start}")]
    InvalidInterval {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },

    /// Unit id is not in the catalog
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),

    /// Booking id is unknown
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    /// Requested interval is shorter than the unit's minimum duration
    #[error("requested {requested_hours}h is below the minimum duration of {minimum_hours}h")]
    BelowMinimumDuration {
        /// Requested duration in whole hours
        requested_hours: u32,
        /// Unit's minimum duration in hours
        minimum_hours: u32,
    },

    /// Requested quantity exceeds the unit's occupancy limit
    #[error("quantity {requested} exceeds capacity {capacity} of unit {unit_id}")]
    CapacityExceeded {
        /// Unit being booked
        unit_id: UnitId,
        /// Requested quantity
        requested: u32,
        /// Unit capacity
        capacity: u32,
    },

    /// The candidate interval conflicts with existing bookings
    #[error("slot unavailable on unit {unit_id} ({conflicts} conflicting booking(s))")]
    SlotUnavailable {
        /// Unit being booked
        unit_id: UnitId,
        /// Number of conflicting bookings found
        conflicts: usize,
    },

    /// Availability was lost to a concurrent booking between request and
    /// confirmation; retryable
    #[error("slot on unit {unit_id} is no longer available")]
    SlotNoLongerAvailable {
        /// Unit being booked
        unit_id: UnitId,
    },

    /// Attempted transition between non-adjacent lifecycle states
    #[error("invalid state transition from {from} to {to} for booking {booking_id}")]
    InvalidStateTransition {
        /// Booking whose transition was rejected
        booking_id: BookingId,
        /// Current persisted status
        from: BookingStatus,
        /// Requested status
        to: BookingStatus,
    },

    /// Walk-in extension outside the allowed range
    #[error("invalid extension: {reason}")]
    InvalidExtension {
        /// Why the extension was rejected
        reason: String,
    },

    /// Could not acquire the per-unit lock within the bounded wait;
    /// retryable
    #[error("timed out waiting for the lock on unit {unit_id}")]
    LockTimeout {
        /// Unit whose lock could not be acquired
        unit_id: UnitId,
    },

    /// Malformed ledger entry rejected before append
    #[error("ledger write rejected: {reason}")]
    LedgerWriteRejected {
        /// Why the entry was rejected
        reason: String,
    },

    /// Underlying store failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether the caller may retry the same operation (concurrency
    /// losses, not validation or lifecycle errors)
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SlotNoLongerAvailable { .. } | Self::LockTimeout { .. }
        )
    }
}
