//! Booking Lifecycle Manager.
//!
//! The state machine is a decide/apply pair in the functional-core style:
//!
//! - [`BookingReducer::decide`] validates a command against the current
//!   [`ScheduleState`] and either returns the events to record or a typed
//!   [`EngineError`]. It never mutates state.
//! - [`BookingReducer::apply`] folds an event into state and cannot fail.
//!
//! The split is what lets the service shell order side effects correctly:
//! ledger entries derived from the decided events are appended *before*
//! apply, so a settlement whose ledger write fails leaves the booking in
//! its prior state (`CHECKED_IN`, not falsely `CHECKED_OUT`).
//!
//! Every transition is checked against the persisted status; non-adjacent
//! attempts fail with `InvalidStateTransition` and are never silently
//! coerced. Confirming an already-confirmed booking is the one sanctioned
//! no-op: it succeeds with no events and no duplicate ledger entry.

use crate::availability;
use crate::pricing;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use stayforge_core::{
    Booking, BookingId, BookingStatus, Clock, EngineError, GuestContact, Interval, Money,
    PolicyConfig, PriceQuote, PriceUnit, RentableUnit,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Events produced by one decision
pub type Decided = SmallVec<[BookingEvent; 2]>;

// ============================================================================
// State
// ============================================================================

/// All bookings on one unit, the granularity of the admission-control
/// critical section.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleState {
    /// The unit this schedule belongs to (read-only catalog snapshot)
    pub unit: RentableUnit,
    /// All bookings on the unit, terminal ones included
    pub bookings: HashMap<BookingId, Booking>,
}

impl ScheduleState {
    /// Creates an empty schedule for a unit
    #[must_use]
    pub fn new(unit: RentableUnit) -> Self {
        Self {
            unit,
            bookings: HashMap::new(),
        }
    }

    /// Gets a booking by id
    #[must_use]
    pub fn get(&self, id: &BookingId) -> Option<&Booking> {
        self.bookings.get(id)
    }

    /// Bookings whose status still holds inventory
    #[must_use]
    pub fn active_bookings(&self) -> Vec<Booking> {
        self.bookings
            .values()
            .filter(|b| b.status.holds_inventory())
            .cloned()
            .collect()
    }

    /// Active bookings excluding one id (for self-excluding re-validation)
    #[must_use]
    pub fn active_bookings_except(&self, id: &BookingId) -> Vec<Booking> {
        self.bookings
            .values()
            .filter(|b| b.id != *id && b.status.holds_inventory())
            .cloned()
            .collect()
    }
}

// ============================================================================
// Commands and events
// ============================================================================

/// Commands accepted by the lifecycle manager
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BookingCommand {
    /// Create a booking request for a fixed interval
    Create {
        /// Caller-supplied booking id
        booking_id: BookingId,
        /// Requested stay
        interval: Interval,
        /// Reserved quantity (capacity units)
        quantity: u32,
        /// Guest contact snapshot
        guest: GuestContact,
    },
    /// Confirm a pending booking
    Confirm {
        /// Booking to confirm
        booking_id: BookingId,
    },
    /// Cancel a pending or confirmed booking
    Cancel {
        /// Booking to cancel
        booking_id: BookingId,
        /// Caller-supplied reason
        reason: String,
    },
    /// Check the guest in
    CheckIn {
        /// Booking to check in
        booking_id: BookingId,
    },
    /// Check the guest out and settle
    CheckOut {
        /// Booking to settle
        booking_id: BookingId,
    },
    /// Mark a confirmed booking as a no-show after the grace deadline
    MarkNoShow {
        /// Booking to mark
        booking_id: BookingId,
    },
    /// Walk-in: create and check in immediately, billed by elapsed time
    QuickCheckIn {
        /// Caller-supplied booking id
        booking_id: BookingId,
        /// Guest contact snapshot
        guest: GuestContact,
        /// Number of guests
        guests: u32,
        /// Planning estimate, not authoritative for billing
        estimated_duration_hours: u32,
        /// Operational notes
        notes: Option<String>,
    },
    /// Walk-in: extend the planning estimate
    Extend {
        /// Session to extend
        booking_id: BookingId,
        /// Hours to add to the estimate
        additional_hours: u32,
    },
}

/// Facts recorded by the lifecycle manager
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BookingEvent {
    /// A booking was created (request or walk-in check-in)
    Created {
        /// The full booking record
        booking: Booking,
    },
    /// A pending booking was confirmed
    Confirmed {
        /// Booking id
        booking_id: BookingId,
        /// When
        at: DateTime<Utc>,
    },
    /// A booking was cancelled
    Cancelled {
        /// Booking id
        booking_id: BookingId,
        /// Caller-supplied reason
        reason: String,
        /// Deposit refund owed per the cancellation policy, if any
        refund: Option<Money>,
        /// When
        at: DateTime<Utc>,
    },
    /// The guest arrived
    CheckedIn {
        /// Booking id
        booking_id: BookingId,
        /// Actual arrival instant
        at: DateTime<Utc>,
    },
    /// The guest left; the stay is settled
    CheckedOut {
        /// Booking id
        booking_id: BookingId,
        /// Actual departure instant
        at: DateTime<Utc>,
        /// Final price breakdown
        settled: PriceQuote,
        /// Billable elapsed hours the settlement was computed from
        elapsed_hours: u32,
    },
    /// The guest never arrived within the grace period
    NoShowMarked {
        /// Booking id
        booking_id: BookingId,
        /// When
        at: DateTime<Utc>,
    },
    /// A walk-in estimate was extended
    Extended {
        /// Session id
        booking_id: BookingId,
        /// Hours added
        additional_hours: u32,
        /// New estimated end
        new_end: DateTime<Utc>,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Injected dependencies for lifecycle decisions
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Clock for timestamps, refund bands, and grace deadlines
    pub clock: Arc<dyn Clock>,
    /// Pricing and cancellation policy configuration
    pub policies: PolicyConfig,
    /// Hours after `start_at` before a confirmed booking may be swept as
    /// a no-show
    pub no_show_grace_hours: i64,
    /// Maximum hours a single walk-in extension may add
    pub max_extension_hours: u32,
}

impl LifecycleEnvironment {
    /// Creates an environment with the default grace (2h) and extension
    /// cap (24h)
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, policies: PolicyConfig) -> Self {
        Self {
            clock,
            policies,
            no_show_grace_hours: 2,
            max_extension_hours: 24,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// The booking state machine
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a command against current state and returns the events
    /// to record. State is untouched; rejected commands change nothing.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] variant; see the individual command arms.
    #[allow(clippy::too_many_lines)] // One arm per lifecycle command
    pub fn decide(
        &self,
        state: &ScheduleState,
        command: BookingCommand,
        env: &LifecycleEnvironment,
    ) -> Result<Decided, EngineError> {
        match command {
            BookingCommand::Create {
                booking_id,
                interval,
                quantity,
                guest,
            } => {
                let quote =
                    pricing::quote(&state.unit, interval, quantity, &env.policies, false)?;
                let check = availability::check_availability(
                    &state.unit,
                    &state.active_bookings(),
                    interval,
                    quantity,
                )?;
                if !check.available {
                    return Err(EngineError::SlotUnavailable {
                        unit_id: state.unit.id,
                        conflicts: check.conflicting_bookings.len(),
                    });
                }

                let now = env.clock.now();
                let status = if state.unit.instant_booking {
                    BookingStatus::Confirmed
                } else {
                    BookingStatus::Pending
                };
                let booking = Booking {
                    id: booking_id,
                    unit_id: state.unit.id,
                    interval,
                    quantity,
                    status,
                    guest,
                    quote,
                    is_walk_in: false,
                    notes: None,
                    actual_start_at: None,
                    actual_end_at: None,
                    estimated_duration_hours: None,
                    cancelled_at: None,
                    cancel_reason: None,
                    refund_issued: None,
                    settled: None,
                    created_at: now,
                };
                Ok(smallvec![BookingEvent::Created { booking }])
            }

            BookingCommand::Confirm { booking_id } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                match booking.status {
                    // Idempotent: confirming a confirmed booking is a
                    // no-op success, not a duplicate transition
                    BookingStatus::Confirmed => Ok(SmallVec::new()),
                    BookingStatus::Pending => {
                        let others = state.active_bookings_except(&booking_id);
                        let check = availability::check_availability(
                            &state.unit,
                            &others,
                            booking.interval,
                            booking.quantity,
                        )?;
                        if check.available {
                            Ok(smallvec![BookingEvent::Confirmed {
                                booking_id,
                                at: env.clock.now(),
                            }])
                        } else {
                            // Lost the race to a concurrent booking
                            Err(EngineError::SlotNoLongerAvailable {
                                unit_id: state.unit.id,
                            })
                        }
                    }
                    from => Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from,
                        to: BookingStatus::Confirmed,
                    }),
                }
            }

            BookingCommand::Cancel { booking_id, reason } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                if !booking.status.can_transition_to(BookingStatus::Cancelled) {
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::Cancelled,
                    });
                }

                let now = env.clock.now();
                let refund = Self::refund_for(state, booking, now, env);
                Ok(smallvec![BookingEvent::Cancelled {
                    booking_id,
                    reason,
                    refund,
                    at: now,
                }])
            }

            BookingCommand::CheckIn { booking_id } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                if !booking.status.can_transition_to(BookingStatus::CheckedIn) {
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::CheckedIn,
                    });
                }
                Ok(smallvec![BookingEvent::CheckedIn {
                    booking_id,
                    at: env.clock.now(),
                }])
            }

            BookingCommand::CheckOut { booking_id } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                if !booking.status.can_transition_to(BookingStatus::CheckedOut) {
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::CheckedOut,
                    });
                }

                let now = env.clock.now();
                let elapsed_hours = booking
                    .billable_elapsed_hours(now)
                    .unwrap_or(booking.quote.billable_units);
                // Walk-ins always settle on elapsed time. Scheduled stays
                // re-price only for hourly units whose guest overstayed
                // the interval; nightly and monthly stays settle the
                // quoted total regardless of the departure hour.
                let overstayed_hourly = state.unit.price_unit == PriceUnit::Hour
                    && now > booking.interval.end();
                let settled = if booking.is_walk_in || overstayed_hourly {
                    pricing::settle_elapsed(
                        &state.unit,
                        elapsed_hours,
                        booking.quantity,
                        &env.policies,
                    )
                } else {
                    booking.quote.clone()
                };
                Ok(smallvec![BookingEvent::CheckedOut {
                    booking_id,
                    at: now,
                    settled,
                    elapsed_hours,
                }])
            }

            BookingCommand::MarkNoShow { booking_id } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                if !booking.status.can_transition_to(BookingStatus::NoShow) {
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::NoShow,
                    });
                }
                let now = env.clock.now();
                let deadline =
                    booking.interval.start() + Duration::hours(env.no_show_grace_hours);
                if now <= deadline {
                    // Grace period still running; the sweep came too early
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::NoShow,
                    });
                }
                Ok(smallvec![BookingEvent::NoShowMarked { booking_id, at: now }])
            }

            BookingCommand::QuickCheckIn {
                booking_id,
                guest,
                guests,
                estimated_duration_hours,
                notes,
            } => {
                if guests == 0 || guests > state.unit.max_occupancy {
                    return Err(EngineError::CapacityExceeded {
                        unit_id: state.unit.id,
                        requested: guests,
                        capacity: state.unit.max_occupancy,
                    });
                }

                let now = env.clock.now();
                // A zero-hour estimate produces an empty interval and is
                // rejected here
                let interval = Interval::new(
                    now,
                    now + Duration::hours(i64::from(estimated_duration_hours)),
                )?;
                let check = availability::check_availability(
                    &state.unit,
                    &state.active_bookings(),
                    interval,
                    1,
                )?;
                if !check.available {
                    return Err(EngineError::SlotUnavailable {
                        unit_id: state.unit.id,
                        conflicts: check.conflicting_bookings.len(),
                    });
                }

                let quote = pricing::quote(&state.unit, interval, 1, &env.policies, true)?;
                let booking = Booking {
                    id: booking_id,
                    unit_id: state.unit.id,
                    interval,
                    quantity: 1,
                    status: BookingStatus::CheckedIn,
                    guest,
                    quote,
                    is_walk_in: true,
                    notes,
                    actual_start_at: Some(now),
                    actual_end_at: None,
                    estimated_duration_hours: Some(estimated_duration_hours),
                    cancelled_at: None,
                    cancel_reason: None,
                    refund_issued: None,
                    settled: None,
                    created_at: now,
                };
                Ok(smallvec![BookingEvent::Created { booking }])
            }

            BookingCommand::Extend {
                booking_id,
                additional_hours,
            } => {
                let booking = state
                    .get(&booking_id)
                    .ok_or(EngineError::BookingNotFound(booking_id))?;
                if !booking.is_walk_in {
                    return Err(EngineError::InvalidExtension {
                        reason: format!("booking {booking_id} is not a walk-in session"),
                    });
                }
                if booking.status != BookingStatus::CheckedIn {
                    return Err(EngineError::InvalidStateTransition {
                        booking_id,
                        from: booking.status,
                        to: BookingStatus::CheckedIn,
                    });
                }
                if additional_hours == 0 {
                    return Err(EngineError::InvalidExtension {
                        reason: "additional hours must be positive".to_string(),
                    });
                }
                if additional_hours > env.max_extension_hours {
                    return Err(EngineError::InvalidExtension {
                        reason: format!(
                            "additional hours {additional_hours} exceed the per-call cap of {}",
                            env.max_extension_hours
                        ),
                    });
                }
                Ok(smallvec![BookingEvent::Extended {
                    booking_id,
                    additional_hours,
                    new_end: booking.interval.end()
                        + Duration::hours(i64::from(additional_hours)),
                }])
            }
        }
    }

    /// Folds an event into the schedule. Infallible: every event was
    /// produced by `decide` against this state.
    pub fn apply(&self, state: &mut ScheduleState, event: &BookingEvent) {
        match event {
            BookingEvent::Created { booking } => {
                state.bookings.insert(booking.id, booking.clone());
            }
            BookingEvent::Confirmed { booking_id, .. } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::Confirmed;
                }
            }
            BookingEvent::Cancelled {
                booking_id,
                reason,
                refund,
                at,
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::Cancelled;
                    booking.cancelled_at = Some(*at);
                    booking.cancel_reason = Some(reason.clone());
                    booking.refund_issued = *refund;
                }
            }
            BookingEvent::CheckedIn { booking_id, at } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::CheckedIn;
                    booking.actual_start_at = Some(*at);
                }
            }
            BookingEvent::CheckedOut {
                booking_id,
                at,
                settled,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::CheckedOut;
                    booking.actual_end_at = Some(*at);
                    booking.settled = Some(settled.clone());
                }
            }
            BookingEvent::NoShowMarked { booking_id, at } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.status = BookingStatus::NoShow;
                    booking.actual_end_at = Some(*at);
                }
            }
            BookingEvent::Extended {
                booking_id,
                additional_hours,
                ..
            } => {
                if let Some(booking) = state.bookings.get_mut(booking_id) {
                    booking.interval = booking
                        .interval
                        .extended_by(Duration::hours(i64::from(*additional_hours)));
                    booking.estimated_duration_hours = Some(
                        booking
                            .estimated_duration_hours
                            .unwrap_or(0)
                            .saturating_add(*additional_hours),
                    );
                }
            }
        }
    }

    /// Deposit refund owed on cancellation, per the unit's refund bands.
    ///
    /// Only a captured deposit can be refunded: the deposit ledger entry
    /// exists once a non-walk-in booking reached `CONFIRMED` under a
    /// due-now deposit policy.
    fn refund_for(
        state: &ScheduleState,
        booking: &Booking,
        now: DateTime<Utc>,
        env: &LifecycleEnvironment,
    ) -> Option<Money> {
        let captured = booking.status == BookingStatus::Confirmed
            && !booking.is_walk_in
            && env.policies.deposit.due_now
            && !booking.quote.deposit.is_zero();
        if !captured {
            return None;
        }

        let hours_before_start = (booking.interval.start() - now).num_hours();
        let policy = env.policies.cancellation_for(&state.unit.policy_tag);
        let percent = policy.refund_percent_for(hours_before_start);
        let amount = booking.quote.deposit.percent_of(percent);
        if amount.is_zero() { None } else { Some(amount) }
    }
}
