//! Booking state machine flows.
//!
//! Exercises `decide`/`apply` through the Given-When-Then harness: the
//! happy path, rejected transitions, idempotent confirmation, refund
//! bands, no-show grace, and walk-in settlement.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use stayforge_core::{
    BookingId, BookingStatus, DepositPolicy, DepositRule, EngineError, Interval, Money,
    PolicyConfig,
};
use stayforge_engine::lifecycle::{
    BookingCommand, BookingEvent, LifecycleEnvironment, ScheduleState,
};
use stayforge_testing::{DecideTest, FixedClock, fixtures};

fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
}

fn iv(day: u32, start_h: u32, end_h: u32) -> Interval {
    Interval::new(at(day, start_h), at(day, end_h)).unwrap()
}

fn create(booking_id: BookingId, interval: Interval) -> BookingCommand {
    BookingCommand::Create {
        booking_id,
        interval,
        quantity: 1,
        guest: fixtures::guest(),
    }
}

fn deposit_policy(deposit: u64) -> PolicyConfig {
    let mut policy = PolicyConfig::bare();
    policy.deposit = DepositPolicy {
        rule: DepositRule::Flat(Money::from_minor(deposit)),
        due_now: true,
    };
    policy
}

fn env_at(day: u32, hour: u32, policy: PolicyConfig) -> LifecycleEnvironment {
    LifecycleEnvironment::new(Arc::new(FixedClock::new(at(day, hour))), policy)
}

#[test]
fn create_yields_pending_without_instant_booking() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .when(create(booking_id, iv(1, 10, 12)))
        .then_state(move |state| {
            let booking = state.get(&booking_id).unwrap();
            assert_eq!(booking.status, BookingStatus::Pending);
            assert!(!booking.is_walk_in);
            assert_eq!(booking.quote.total, Money::from_minor(200_000));
        })
        .run();
}

#[test]
fn create_yields_confirmed_with_instant_booking() {
    let mut unit = fixtures::hour_unit();
    unit.instant_booking = true;
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(unit)
        .when(create(booking_id, iv(1, 10, 12)))
        .then_state(move |state| {
            assert_eq!(
                state.get(&booking_id).unwrap().status,
                BookingStatus::Confirmed
            );
        })
        .run();
}

#[test]
fn full_scheduled_stay_flow() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(create(booking_id, iv(1, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .after(BookingCommand::CheckIn { booking_id })
        .when(BookingCommand::CheckOut { booking_id })
        .then_state(move |state| {
            let booking = state.get(&booking_id).unwrap();
            assert_eq!(booking.status, BookingStatus::CheckedOut);
            assert!(booking.settled.is_some());
        })
        .run();
}

#[test]
fn confirm_is_idempotent() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(create(booking_id, iv(1, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .when(BookingCommand::Confirm { booking_id })
        .then_events(|events| assert!(events.is_empty()))
        .then_state(move |state| {
            assert_eq!(
                state.get(&booking_id).unwrap().status,
                BookingStatus::Confirmed
            );
        })
        .run();
}

#[test]
fn confirm_fails_when_slot_was_lost() {
    // A confirmed booking lands on the same slot while ours is pending
    let unit = fixtures::hour_unit();
    let mut state = ScheduleState::new(unit.clone());
    let pending = fixtures::booking(&unit, iv(1, 10, 12));
    let pending_id = pending.id;
    let mut winner = fixtures::booking(&unit, iv(1, 10, 12));
    winner.status = BookingStatus::Confirmed;
    state.bookings.insert(pending.id, pending);
    state.bookings.insert(winner.id, winner);

    DecideTest::new()
        .given_state(state)
        .when(BookingCommand::Confirm {
            booking_id: pending_id,
        })
        .then_error(|error| {
            assert!(matches!(error, EngineError::SlotNoLongerAvailable { .. }));
        })
        .run();
}

#[test]
fn checkin_from_pending_is_rejected() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(create(booking_id, iv(1, 10, 12)))
        .when(BookingCommand::CheckIn { booking_id })
        .then_error(|error| {
            assert!(matches!(
                error,
                EngineError::InvalidStateTransition {
                    from: BookingStatus::Pending,
                    to: BookingStatus::CheckedIn,
                    ..
                }
            ));
        })
        .run();
}

#[test]
fn cancel_after_checkout_is_rejected() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(create(booking_id, iv(1, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .after(BookingCommand::CheckIn { booking_id })
        .after(BookingCommand::CheckOut { booking_id })
        .when(BookingCommand::Cancel {
            booking_id,
            reason: "changed plans".to_string(),
        })
        .then_error(|error| {
            assert!(matches!(
                error,
                EngineError::InvalidStateTransition {
                    from: BookingStatus::CheckedOut,
                    ..
                }
            ));
        })
        .run();
}

#[test]
fn unknown_booking_is_reported() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .when(BookingCommand::Confirm { booking_id })
        .then_error(move |error| {
            assert_eq!(error, &EngineError::BookingNotFound(booking_id));
        })
        .run();
}

// ============================================================================
// Refund bands
// ============================================================================

#[test]
fn flexible_cancellation_refunds_full_deposit() {
    // Clock June 1 09:00, stay starts June 3 10:00: 49h ahead of start,
    // FLEXIBLE refunds 100% beyond 24h
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit()) // FLEXIBLE tag
        .with_env(env_at(1, 9, deposit_policy(500_000)))
        .after(create(booking_id, iv(3, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .when(BookingCommand::Cancel {
            booking_id,
            reason: "trip cancelled".to_string(),
        })
        .then_events(|events| {
            assert!(matches!(
                events,
                [BookingEvent::Cancelled {
                    refund: Some(amount),
                    ..
                }] if *amount == Money::from_minor(500_000)
            ));
        })
        .then_state(move |state| {
            let booking = state.get(&booking_id).unwrap();
            assert_eq!(booking.status, BookingStatus::Cancelled);
            assert_eq!(booking.refund_issued, Some(Money::from_minor(500_000)));
        })
        .run();
}

#[test]
fn strict_cancellation_refunds_nothing() {
    let mut unit = fixtures::hour_unit();
    unit.policy_tag = "STRICT".to_string();
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(unit)
        .with_env(env_at(1, 9, deposit_policy(500_000)))
        .after(create(booking_id, iv(3, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .when(BookingCommand::Cancel {
            booking_id,
            reason: "trip cancelled".to_string(),
        })
        .then_events(|events| {
            assert!(matches!(
                events,
                [BookingEvent::Cancelled { refund: None, .. }]
            ));
        })
        .run();
}

#[test]
fn pending_cancellation_never_refunds() {
    // No deposit was captured before confirmation
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .with_env(env_at(1, 9, deposit_policy(500_000)))
        .after(create(booking_id, iv(3, 10, 12)))
        .when(BookingCommand::Cancel {
            booking_id,
            reason: "never confirmed".to_string(),
        })
        .then_events(|events| {
            assert!(matches!(
                events,
                [BookingEvent::Cancelled { refund: None, .. }]
            ));
        })
        .run();
}

// ============================================================================
// No-show grace
// ============================================================================

#[test]
fn no_show_rejected_inside_grace() {
    let booking_id = BookingId::new();
    // Stay starts 10:00, grace 2h, clock 11:00
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .with_env(env_at(1, 11, PolicyConfig::bare()))
        .after(create(booking_id, iv(1, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .when(BookingCommand::MarkNoShow { booking_id })
        .then_error(|error| {
            assert!(matches!(error, EngineError::InvalidStateTransition { .. }));
        })
        .run();
}

#[test]
fn no_show_applies_after_grace() {
    let booking_id = BookingId::new();
    // Clock 13:00 is past 10:00 + 2h grace
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .with_env(env_at(1, 13, PolicyConfig::bare()))
        .after(create(booking_id, iv(1, 10, 12)))
        .after(BookingCommand::Confirm { booking_id })
        .when(BookingCommand::MarkNoShow { booking_id })
        .then_state(move |state| {
            assert_eq!(
                state.get(&booking_id).unwrap().status,
                BookingStatus::NoShow
            );
        })
        .run();
}

// ============================================================================
// Walk-in sessions
// ============================================================================

#[test]
fn quick_check_in_lands_directly_in_checked_in() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .when(BookingCommand::QuickCheckIn {
            booking_id,
            guest: fixtures::guest(),
            guests: 2,
            estimated_duration_hours: 3,
            notes: Some("walked in from the street".to_string()),
        })
        .then_state(move |state| {
            let booking = state.get(&booking_id).unwrap();
            assert_eq!(booking.status, BookingStatus::CheckedIn);
            assert!(booking.is_walk_in);
            assert_eq!(booking.actual_start_at, Some(booking.interval.start()));
            assert_eq!(booking.estimated_duration_hours, Some(3));
        })
        .run();
}

#[test]
fn quick_check_in_respects_occupancy() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit()) // max_occupancy 8
        .when(BookingCommand::QuickCheckIn {
            booking_id,
            guest: fixtures::guest(),
            guests: 9,
            estimated_duration_hours: 2,
            notes: None,
        })
        .then_error(|error| {
            assert!(matches!(error, EngineError::CapacityExceeded { .. }));
        })
        .run();
}

#[test]
fn zero_hour_estimate_is_an_invalid_interval() {
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .when(BookingCommand::QuickCheckIn {
            booking_id: BookingId::new(),
            guest: fixtures::guest(),
            guests: 1,
            estimated_duration_hours: 0,
            notes: None,
        })
        .then_error(|error| {
            assert!(matches!(error, EngineError::InvalidInterval { .. }));
        })
        .run();
}

#[test]
fn walk_in_checkout_settles_on_elapsed_time() {
    // Check in 09:00 with a 2h estimate; check out at 11:30 -> 3 billable
    // hours at 100_000
    let booking_id = BookingId::new();
    let clock = Arc::new(FixedClock::new(at(1, 9)));
    let env = LifecycleEnvironment::new(clock.clone(), PolicyConfig::bare());

    let mut state = ScheduleState::new(fixtures::hour_unit());
    let reducer = stayforge_engine::lifecycle::BookingReducer::new();
    let events = reducer
        .decide(
            &state,
            BookingCommand::QuickCheckIn {
                booking_id,
                guest: fixtures::guest(),
                guests: 1,
                estimated_duration_hours: 2,
                notes: None,
            },
            &env,
        )
        .unwrap();
    for event in &events {
        reducer.apply(&mut state, event);
    }

    clock.set(at(1, 11) + Duration::minutes(30));
    let events = reducer
        .decide(&state, BookingCommand::CheckOut { booking_id }, &env)
        .unwrap();
    match &events[..] {
        [BookingEvent::CheckedOut {
            settled,
            elapsed_hours,
            ..
        }] => {
            assert_eq!(*elapsed_hours, 3);
            assert_eq!(settled.total, Money::from_minor(300_000));
        }
        other => panic!("expected a single CheckedOut event, got {other:?}"),
    }
}

#[test]
fn hourly_overstay_reprices_from_elapsed_time() {
    // Booked 10:00-12:00 (200_000), checked in on time, left at 14:30:
    // 4.5 elapsed hours bill as 5 at 100_000
    let booking_id = BookingId::new();
    let clock = Arc::new(FixedClock::new(at(1, 9)));
    let env = LifecycleEnvironment::new(clock.clone(), PolicyConfig::bare());
    let reducer = stayforge_engine::lifecycle::BookingReducer::new();
    let mut state = ScheduleState::new(fixtures::hour_unit());

    for command in [
        create(booking_id, iv(1, 10, 12)),
        BookingCommand::Confirm { booking_id },
    ] {
        for event in &reducer.decide(&state, command, &env).unwrap() {
            reducer.apply(&mut state, event);
        }
    }
    clock.set(at(1, 10));
    for event in &reducer
        .decide(&state, BookingCommand::CheckIn { booking_id }, &env)
        .unwrap()
    {
        reducer.apply(&mut state, event);
    }

    clock.set(at(1, 14) + Duration::minutes(30));
    let events = reducer
        .decide(&state, BookingCommand::CheckOut { booking_id }, &env)
        .unwrap();
    match &events[..] {
        [BookingEvent::CheckedOut {
            settled,
            elapsed_hours,
            ..
        }] => {
            assert_eq!(*elapsed_hours, 5);
            assert_eq!(settled.total, Money::from_minor(500_000));
        }
        other => panic!("expected a single CheckedOut event, got {other:?}"),
    }
}

#[test]
fn nightly_late_checkout_settles_the_quoted_total() {
    // Two quoted nights (1_000_000); leaving five hours after the stay
    // interval must not re-bill the stay as three elapsed-hour nights
    let booking_id = BookingId::new();
    let clock = Arc::new(FixedClock::new(at(1, 13)));
    let env = LifecycleEnvironment::new(clock.clone(), PolicyConfig::bare());
    let reducer = stayforge_engine::lifecycle::BookingReducer::new();
    let mut state = ScheduleState::new(fixtures::night_unit());

    let interval = Interval::new(at(1, 14), at(3, 11)).unwrap();
    for command in [
        create(booking_id, interval),
        BookingCommand::Confirm { booking_id },
    ] {
        for event in &reducer.decide(&state, command, &env).unwrap() {
            reducer.apply(&mut state, event);
        }
    }
    clock.set(at(1, 14));
    for event in &reducer
        .decide(&state, BookingCommand::CheckIn { booking_id }, &env)
        .unwrap()
    {
        reducer.apply(&mut state, event);
    }

    clock.set(at(3, 16));
    let events = reducer
        .decide(&state, BookingCommand::CheckOut { booking_id }, &env)
        .unwrap();
    match &events[..] {
        [BookingEvent::CheckedOut { settled, .. }] => {
            assert_eq!(settled.billable_units, 2);
            assert_eq!(settled.total, Money::from_minor(1_000_000));
        }
        other => panic!("expected a single CheckedOut event, got {other:?}"),
    }
}

#[test]
fn extend_only_applies_to_checked_in_walk_ins() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(create(booking_id, iv(1, 10, 12)))
        .when(BookingCommand::Extend {
            booking_id,
            additional_hours: 2,
        })
        .then_error(|error| {
            assert!(matches!(error, EngineError::InvalidExtension { .. }));
        })
        .run();
}

#[test]
fn extend_moves_the_estimate() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(BookingCommand::QuickCheckIn {
            booking_id,
            guest: fixtures::guest(),
            guests: 1,
            estimated_duration_hours: 2,
            notes: None,
        })
        .when(BookingCommand::Extend {
            booking_id,
            additional_hours: 2,
        })
        .then_state(move |state| {
            let booking = state.get(&booking_id).unwrap();
            assert_eq!(booking.estimated_duration_hours, Some(4));
            assert_eq!(
                booking.interval.duration(),
                chrono::Duration::hours(4)
            );
        })
        .run();
}

#[test]
fn extension_cap_is_enforced() {
    let booking_id = BookingId::new();
    DecideTest::new()
        .given_unit(fixtures::hour_unit())
        .after(BookingCommand::QuickCheckIn {
            booking_id,
            guest: fixtures::guest(),
            guests: 1,
            estimated_duration_hours: 2,
            notes: None,
        })
        .when(BookingCommand::Extend {
            booking_id,
            additional_hours: 25,
        })
        .then_error(|error| {
            assert!(matches!(error, EngineError::InvalidExtension { .. }));
        })
        .run();
}
