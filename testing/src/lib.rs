//! # Stayforge Testing
//!
//! Testing utilities for the Stayforge engine.
//!
//! This crate provides:
//! - Mock environment implementations (a settable [`FixedClock`])
//! - Domain fixtures with stable, easy-to-assert prices
//! - [`DecideTest`]: a Given-When-Then harness for the booking state
//!   machine
//!
//! ## Example
//!
//! ```ignore
//! use stayforge_testing::{DecideTest, fixtures, test_clock};
//!
//! DecideTest::new()
//!     .given_unit(fixtures::hour_unit())
//!     .when(BookingCommand::Create { .. })
//!     .then_events(|events| assert_eq!(events.len(), 1))
//!     .run();
//! ```

pub mod decide_test;

use chrono::{DateTime, Duration, Utc};
use stayforge_core::environment::Clock;

/// Mock implementations for deterministic tests.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::Mutex;

    /// Settable clock for deterministic tests.
    ///
    /// Starts at a fixed instant and only moves when a test calls
    /// [`FixedClock::set`] or [`FixedClock::advance`], so elapsed-time
    /// billing and grace deadlines can be asserted exactly.
    #[derive(Debug)]
    pub struct FixedClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Creates a clock frozen at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Jumps the clock to `time`
        #[allow(clippy::expect_used)]
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().expect("clock mutex poisoned") = time;
        }

        /// Moves the clock forward by `duration`
        #[allow(clippy::expect_used)]
        pub fn advance(&self, duration: Duration) {
            let mut time = self.time.lock().expect("clock mutex poisoned");
            *time += duration;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::expect_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().expect("clock mutex poisoned")
        }
    }

    /// Creates a fixed clock at the default test instant
    /// (2025-06-01 09:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should
    /// never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Domain fixtures with round prices chosen for readable assertions.
pub mod fixtures {
    use stayforge_core::{
        AllocationType, Booking, BookingId, BookingStatus, GuestContact, GuestId, Interval, Money,
        PolicyConfig, PriceUnit, RentableUnit, UnitId,
    };
    use stayforge_engine::pricing;

    /// An exclusive hourly unit at 100_000 minor units per hour
    #[must_use]
    pub fn hour_unit() -> RentableUnit {
        RentableUnit {
            id: UnitId::new(),
            name: "Meeting Room A".to_string(),
            base_price: Money::from_minor(100_000),
            currency: "USD".to_string(),
            price_unit: PriceUnit::Hour,
            min_duration_hours: 1,
            max_occupancy: 8,
            allocation: AllocationType::Exclusive,
            instant_booking: false,
            policy_tag: "FLEXIBLE".to_string(),
        }
    }

    /// An exclusive nightly unit at 500_000 minor units per night
    #[must_use]
    pub fn night_unit() -> RentableUnit {
        RentableUnit {
            id: UnitId::new(),
            name: "Studio 12".to_string(),
            base_price: Money::from_minor(500_000),
            currency: "USD".to_string(),
            price_unit: PriceUnit::Night,
            min_duration_hours: 12,
            max_occupancy: 2,
            allocation: AllocationType::Exclusive,
            instant_booking: false,
            policy_tag: "MODERATE".to_string(),
        }
    }

    /// A capacity-allocated hourly unit with the given limit
    #[must_use]
    pub fn capacity_unit(limit: u32) -> RentableUnit {
        RentableUnit {
            id: UnitId::new(),
            name: "Coworking Floor".to_string(),
            base_price: Money::from_minor(10_000),
            currency: "USD".to_string(),
            price_unit: PriceUnit::Hour,
            min_duration_hours: 1,
            max_occupancy: limit,
            allocation: AllocationType::Capacity { limit },
            instant_booking: true,
            policy_tag: "FLEXIBLE".to_string(),
        }
    }

    /// A guest contact snapshot
    #[must_use]
    pub fn guest() -> GuestContact {
        GuestContact {
            guest_id: GuestId::new(),
            name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
        }
    }

    /// A pending quantity-1 booking on `unit` over `interval`, quoted with
    /// bare policies.
    ///
    /// # Panics
    ///
    /// Panics if the interval cannot be quoted, which only happens for a
    /// malformed fixture interval.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn booking(unit: &RentableUnit, interval: Interval) -> Booking {
        let quote = pricing::quote(unit, interval, 1, &PolicyConfig::bare(), true)
            .expect("fixture interval should quote");
        Booking {
            id: BookingId::new(),
            unit_id: unit.id,
            interval,
            quantity: 1,
            status: BookingStatus::Pending,
            guest: guest(),
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
            created_at: interval.start(),
        }
    }
}

// Re-export commonly used items
pub use decide_test::DecideTest;
pub use mocks::{FixedClock, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fixed_clock_only_moves_on_demand() {
        let clock = test_clock();
        let t1 = clock.now();
        let t2 = clock.now();
        assert_eq!(t1, t2);

        clock.advance(Duration::hours(3));
        assert_eq!(clock.now(), t1 + Duration::hours(3));
    }
}
