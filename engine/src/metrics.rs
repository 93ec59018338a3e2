//! Engine metrics.
//!
//! Counter names are stable; dashboards and alerts key on them.

use metrics::describe_counter;

/// Booking transitions by resulting status
pub const BOOKINGS_TOTAL: &str = "stayforge_bookings_total";
/// Ledger appends by entry type
pub const LEDGER_ENTRIES_TOTAL: &str = "stayforge_ledger_entries_total";
/// Settled revenue in minor currency units
pub const REVENUE_MINOR_UNITS_TOTAL: &str = "stayforge_revenue_minor_units_total";
/// Per-unit lock acquisitions that timed out
pub const LOCK_TIMEOUTS_TOTAL: &str = "stayforge_lock_timeouts_total";

/// Registers metric descriptions. Call once at startup.
pub fn register_engine_metrics() {
    describe_counter!(
        BOOKINGS_TOTAL,
        "Booking lifecycle transitions, labeled by resulting status"
    );
    describe_counter!(
        LEDGER_ENTRIES_TOTAL,
        "Ledger entries appended, labeled by entry type"
    );
    describe_counter!(
        REVENUE_MINOR_UNITS_TOTAL,
        "Settled revenue recorded at checkout, in minor currency units"
    );
    describe_counter!(
        LOCK_TIMEOUTS_TOTAL,
        "Per-unit lock acquisitions that exceeded the bounded wait"
    );
}
