//! Ergonomic testing for the booking state machine
//!
//! This module provides a fluent Given-When-Then API around
//! [`BookingReducer::decide`] and [`BookingReducer::apply`].

#![allow(clippy::module_name_repetitions)] // DecideTest is the natural name

use crate::mocks;
use std::sync::Arc;
use stayforge_core::{EngineError, PolicyConfig, RentableUnit};
use stayforge_engine::lifecycle::{
    BookingCommand, BookingEvent, BookingReducer, LifecycleEnvironment, ScheduleState,
};

/// Type alias for state assertion functions
type StateAssertion = Box<dyn FnOnce(&ScheduleState)>;

/// Type alias for event assertion functions
type EventAssertion = Box<dyn FnOnce(&[BookingEvent])>;

/// Type alias for error assertion functions
type ErrorAssertion = Box<dyn FnOnce(&EngineError)>;

/// Fluent Given-When-Then harness for the booking state machine
///
/// Setup commands added with [`DecideTest::after`] are decided and applied
/// before the command under test, so multi-step flows read top to bottom.
///
/// # Example
///
/// ```ignore
/// DecideTest::new()
///     .given_unit(fixtures::hour_unit())
///     .after(create_command)
///     .when(BookingCommand::Confirm { booking_id })
///     .then_events(|events| assert_eq!(events.len(), 1))
///     .then_state(|state| {
///         assert_eq!(state.get(&booking_id).unwrap().status, BookingStatus::Confirmed);
///     })
///     .run();
/// ```
pub struct DecideTest {
    environment: Option<LifecycleEnvironment>,
    initial_state: Option<ScheduleState>,
    setup_commands: Vec<BookingCommand>,
    command: Option<BookingCommand>,
    event_assertions: Vec<EventAssertion>,
    state_assertions: Vec<StateAssertion>,
    error_assertion: Option<ErrorAssertion>,
}

impl Default for DecideTest {
    fn default() -> Self {
        Self::new()
    }
}

impl DecideTest {
    /// Creates an empty harness
    #[must_use]
    pub const fn new() -> Self {
        Self {
            environment: None,
            initial_state: None,
            setup_commands: Vec::new(),
            command: None,
            event_assertions: Vec::new(),
            state_assertions: Vec::new(),
            error_assertion: None,
        }
    }

    /// Starts from an empty schedule on `unit` (Given)
    #[must_use]
    pub fn given_unit(mut self, unit: RentableUnit) -> Self {
        self.initial_state = Some(ScheduleState::new(unit));
        self
    }

    /// Starts from a prepared schedule (Given)
    #[must_use]
    pub fn given_state(mut self, state: ScheduleState) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Overrides the default environment (frozen test clock, bare policies)
    #[must_use]
    pub fn with_env(mut self, env: LifecycleEnvironment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Decides and applies a setup command before the command under test
    #[must_use]
    pub fn after(mut self, command: BookingCommand) -> Self {
        self.setup_commands.push(command);
        self
    }

    /// Sets the command under test (When)
    #[must_use]
    pub fn when(mut self, command: BookingCommand) -> Self {
        self.command = Some(command);
        self
    }

    /// Adds an assertion about the decided events (Then)
    #[must_use]
    pub fn then_events<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[BookingEvent]) + 'static,
    {
        self.event_assertions.push(Box::new(assertion));
        self
    }

    /// Adds an assertion about the state after events are applied (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&ScheduleState) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Asserts that the command under test is rejected (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&EngineError) + 'static,
    {
        self.error_assertion = Some(Box::new(assertion));
        self
    }

    /// Runs the flow and executes all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state or command is not set, if a setup
    /// command is rejected, if the outcome (events vs error) does not
    /// match the registered assertions, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_unit() or given_state()");
        let command = self.command.expect("Command must be set with when()");
        let env = self.environment.unwrap_or_else(|| {
            LifecycleEnvironment::new(Arc::new(mocks::test_clock()), PolicyConfig::bare())
        });

        let reducer = BookingReducer::new();

        for setup in self.setup_commands {
            let events = reducer
                .decide(&state, setup, &env)
                .expect("setup command should be accepted");
            for event in &events {
                reducer.apply(&mut state, event);
            }
        }

        match reducer.decide(&state, command, &env) {
            Ok(events) => {
                assert!(
                    self.error_assertion.is_none(),
                    "Expected an error, but the command was accepted with {} event(s)",
                    events.len()
                );
                for event in &events {
                    reducer.apply(&mut state, event);
                }
                for assertion in self.event_assertions {
                    assertion(&events);
                }
                for assertion in self.state_assertions {
                    assertion(&state);
                }
            }
            Err(error) => {
                let assertion = self.error_assertion.unwrap_or_else(|| {
                    panic!("Command was rejected unexpectedly: {error}")
                });
                assertion(&error);
            }
        }
    }
}
