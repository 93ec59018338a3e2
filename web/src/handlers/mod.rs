//! HTTP handlers, one module per resource.

pub mod availability;
pub mod bookings;
pub mod health;
pub mod ledger;
pub mod units;
pub mod walkin;
