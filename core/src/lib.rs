//! # Stayforge Core
//!
//! Domain types and foundation traits for the Stayforge booking engine.
//!
//! This crate holds the vocabulary shared by every other crate in the
//! workspace:
//!
//! - **Identifiers**: typed UUID newtypes (`UnitId`, `BookingId`, ...)
//! - **Money**: minor-unit fixed-point arithmetic (no floating point on
//!   any financial path)
//! - **Interval**: half-open `[start, end)` UTC intervals with the overlap
//!   test used for all availability reasoning
//! - **Entities**: `RentableUnit`, `Booking`, `PriceQuote`, `LedgerEntry`,
//!   `Invoice`
//! - **Policies**: cancellation refund bands, deposits, fee and discount
//!   schedules
//! - **Environment**: the `Clock` trait injected wherever "now" matters,
//!   so every time-dependent computation is testable with a fixed clock
//! - **Errors**: the `EngineError` taxonomy surfaced by engine operations
//!
//! Everything here is owned data with no I/O. Side effects live in the
//! `stayforge-engine` shell.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod environment;
pub mod error;
pub mod interval;
pub mod policy;
pub mod types;

pub use environment::{Clock, SystemClock};
pub use error::EngineError;
pub use interval::Interval;
pub use policy::{
    CancellationPolicy, DepositPolicy, DepositRule, DiscountKind, DiscountRule, FeeKind, FeeRule,
    PolicyConfig, RefundBand,
};
pub use types::{
    AllocationType, Booking, BookingId, BookingStatus, EntryType, GuestContact, GuestId, Invoice,
    InvoiceId, InvoiceStatus, LedgerEntry, LedgerEntryId, Money, PriceQuote, PriceUnit,
    ReferenceId, RentableUnit, UnitId,
};
