//! # Stayforge Engine
//!
//! Availability, pricing, booking lifecycle, walk-in sessions, and the
//! append-only ledger for short-term and walk-in rentals.
//!
//! The engine is split into a functional core and an imperative shell:
//!
//! - [`availability`] and [`pricing`] are pure functions over catalog and
//!   schedule snapshots.
//! - [`lifecycle`] is the decide/apply state machine covering
//!   `PENDING → CONFIRMED → CHECKED_IN → CHECKED_OUT` with `CANCELLED`
//!   and `NO_SHOW` branches, plus walk-in quick check-in and extension.
//! - [`service`] owns the per-unit critical sections, write-through
//!   persistence, and ledger emission on terminal transitions.
//! - [`ledger`] and [`store`] define the storage traits with in-memory
//!   implementations; [`postgres`] backs both with `sqlx`.
//! - [`reconcile`] cross-checks ledger totals against invoices and
//!   refunds, advisory only.
//!
//! ## Example
//!
//! ```ignore
//! use stayforge_engine::prelude::*;
//!
//! let engine = BookingEngine::new(repository, ledger, env);
//! engine.upsert_unit(unit).await;
//! let booking = engine
//!     .create_booking(unit_id, interval, 1, guest)
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod postgres;
pub mod pricing;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod walkin;

pub use availability::{AvailabilityCheck, Granularity, OccupancyBand, OccupancySlot};
pub use ledger::{AppendOutcome, InMemoryLedgerStore, LedgerFilter, LedgerStore};
pub use lifecycle::{
    BookingCommand, BookingEvent, BookingReducer, Decided, LifecycleEnvironment, ScheduleState,
};
pub use reconcile::{Discrepancy, Expectation, ReconciliationReport};
pub use service::BookingEngine;
pub use store::{BookingRepository, InMemoryBookingRepository};
pub use walkin::ActiveBookingView;

/// Commonly used engine types
pub mod prelude {
    pub use crate::availability::{AvailabilityCheck, Granularity, OccupancySlot};
    pub use crate::ledger::{AppendOutcome, InMemoryLedgerStore, LedgerFilter, LedgerStore};
    pub use crate::lifecycle::{
        BookingCommand, BookingEvent, BookingReducer, LifecycleEnvironment, ScheduleState,
    };
    pub use crate::reconcile::ReconciliationReport;
    pub use crate::service::BookingEngine;
    pub use crate::store::{BookingRepository, InMemoryBookingRepository};
    pub use crate::walkin::ActiveBookingView;
}
