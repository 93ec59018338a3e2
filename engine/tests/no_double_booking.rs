//! No-double-booking property.
//!
//! Feeds random interval batches through the state machine against an
//! exclusive unit and checks that no two inventory-holding bookings ever
//! overlap, whatever subset of creations the engine admitted.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use stayforge_core::{BookingId, Interval, PolicyConfig};
use stayforge_engine::lifecycle::{
    BookingCommand, BookingReducer, LifecycleEnvironment, ScheduleState,
};
use stayforge_testing::{FixedClock, fixtures};

fn interval_at(start_hour: u32, duration_hours: u32) -> Interval {
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let start = base + Duration::hours(i64::from(start_hour));
    Interval::new(start, start + Duration::hours(i64::from(duration_hours))).unwrap()
}

proptest! {
    #[test]
    fn admitted_exclusive_bookings_never_overlap(
        requests in prop::collection::vec((0u32..72, 1u32..12), 1..25)
    ) {
        let mut unit = fixtures::hour_unit();
        unit.instant_booking = true; // admitted bookings hold inventory immediately
        let mut state = ScheduleState::new(unit);
        let reducer = BookingReducer::new();
        let env = LifecycleEnvironment::new(
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap(),
            )),
            PolicyConfig::bare(),
        );

        let mut admitted = 0usize;
        for (start_hour, duration_hours) in requests {
            let command = BookingCommand::Create {
                booking_id: BookingId::new(),
                interval: interval_at(start_hour, duration_hours),
                quantity: 1,
                guest: fixtures::guest(),
            };
            if let Ok(events) = reducer.decide(&state, command, &env) {
                for event in &events {
                    reducer.apply(&mut state, event);
                }
                admitted += 1;
            }
        }

        let active = state.active_bookings();
        prop_assert_eq!(active.len(), admitted);
        for (i, a) in active.iter().enumerate() {
            for b in active.iter().skip(i + 1) {
                prop_assert!(
                    !a.interval.overlaps(&b.interval),
                    "admitted bookings overlap: {} and {}",
                    a.interval,
                    b.interval
                );
            }
        }
    }

    #[test]
    fn touching_intervals_are_always_admitted(start_hour in 0u32..48, len in 1u32..12) {
        let mut unit = fixtures::hour_unit();
        unit.instant_booking = true;
        let mut state = ScheduleState::new(unit);
        let reducer = BookingReducer::new();
        let env = LifecycleEnvironment::new(
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2025, 5, 31, 12, 0, 0).unwrap(),
            )),
            PolicyConfig::bare(),
        );

        // [T, T+len) then [T+len, T+2*len): half-open endpoints touch
        for offset in [0, len] {
            let command = BookingCommand::Create {
                booking_id: BookingId::new(),
                interval: interval_at(start_hour + offset, len),
                quantity: 1,
                guest: fixtures::guest(),
            };
            let events = reducer.decide(&state, command, &env);
            prop_assert!(events.is_ok(), "back-to-back interval was rejected");
            for event in &events.unwrap() {
                reducer.apply(&mut state, event);
            }
        }
    }
}
