//! Injected environment dependencies.
//!
//! The only ambient dependency the engine needs is time. Abstracting it
//! behind `Clock` keeps every time-dependent computation (walk-in billing,
//! refund bands, no-show grace) deterministic under test.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
