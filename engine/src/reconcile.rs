//! Advisory reconciliation.
//!
//! Cross-checks ledger totals for a window against two independent
//! sources: PAID invoices (expected credit) and refunds recorded on
//! cancelled bookings (expected debit). Mismatches are reported, never
//! auto-corrected; the ledger stays append-only and reconciliation stays
//! advisory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stayforge_core::{
    Booking, EntryType, Interval, Invoice, InvoiceStatus, LedgerEntry, Money, ReferenceId,
};

/// One amount the ledger is expected to hold for a reference
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    /// The invoice or booking the amount belongs to
    pub reference_id: ReferenceId,
    /// CREDIT for payments, DEBIT for refunds
    pub entry_type: EntryType,
    /// Amount the independent source says should be recorded
    pub amount: Money,
}

/// One expected-vs-actual mismatch for a single reference
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// The invoice or booking the amounts disagree on
    pub reference_id: ReferenceId,
    /// Which side of the ledger is off
    pub entry_type: EntryType,
    /// What the independent source says should be recorded
    pub expected: Money,
    /// What the ledger actually holds
    pub actual: Money,
}

/// Result of reconciling one window
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Window start (inclusive)
    pub window_start: DateTime<Utc>,
    /// Window end (exclusive)
    pub window_end: DateTime<Utc>,
    /// Sum of PAID invoice totals in the window
    pub expected_credit: Money,
    /// Sum of ledger CREDIT entries matched to those invoices
    pub actual_credit: Money,
    /// Sum of refunds recorded on cancelled bookings in the window
    pub expected_debit: Money,
    /// Sum of ledger DEBIT entries matched to those refunds
    pub actual_debit: Money,
    /// Per-reference mismatches, one line each
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    /// True when every expected amount is matched in the ledger
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Builds reconciliation expectations from invoice and booking archives.
///
/// Invoices contribute when PAID with `paid_at` inside the window;
/// cancelled bookings contribute when `cancelled_at` is inside the window
/// and a refund was issued.
#[must_use]
pub fn expectations<'a>(
    window: Interval,
    invoices: impl IntoIterator<Item = &'a Invoice>,
    cancelled_bookings: impl IntoIterator<Item = &'a Booking>,
) -> Vec<Expectation> {
    let in_window = |at: DateTime<Utc>| at >= window.start() && at < window.end();

    let mut sources = Vec::new();
    for invoice in invoices {
        if invoice.status == InvoiceStatus::Paid && invoice.paid_at.is_some_and(in_window) {
            sources.push(Expectation {
                reference_id: ReferenceId::from(invoice.id),
                entry_type: EntryType::Credit,
                amount: invoice.total_amount,
            });
        }
    }
    for booking in cancelled_bookings {
        if let (Some(cancelled_at), Some(refund)) = (booking.cancelled_at, booking.refund_issued) {
            if in_window(cancelled_at) && !refund.is_zero() {
                sources.push(Expectation {
                    reference_id: ReferenceId::from(booking.id),
                    entry_type: EntryType::Debit,
                    amount: refund,
                });
            }
        }
    }
    sources
}

/// Reconciles a window.
///
/// `entries` are the ledger rows whose `created_at` falls inside the
/// window; `expected` comes from [`expectations`]. Each expectation is
/// compared against the ledger sum for its reference and side; any
/// mismatch yields exactly one discrepancy line.
#[must_use]
pub fn reconcile(
    window: Interval,
    expected: &[Expectation],
    entries: &[LedgerEntry],
) -> ReconciliationReport {
    let mut credit_by_ref: BTreeMap<ReferenceId, Money> = BTreeMap::new();
    let mut debit_by_ref: BTreeMap<ReferenceId, Money> = BTreeMap::new();
    for entry in entries {
        let bucket = match entry.entry_type {
            EntryType::Credit => &mut credit_by_ref,
            EntryType::Debit => &mut debit_by_ref,
        };
        let slot = bucket.entry(entry.reference_id).or_insert(Money::ZERO);
        *slot = slot.add(entry.amount);
    }

    let mut expected_credit = Money::ZERO;
    let mut actual_credit = Money::ZERO;
    let mut expected_debit = Money::ZERO;
    let mut actual_debit = Money::ZERO;
    let mut discrepancies = Vec::new();

    for source in expected {
        let recorded = match source.entry_type {
            EntryType::Credit => credit_by_ref.get(&source.reference_id),
            EntryType::Debit => debit_by_ref.get(&source.reference_id),
        }
        .copied()
        .unwrap_or(Money::ZERO);

        match source.entry_type {
            EntryType::Credit => {
                expected_credit = expected_credit.add(source.amount);
                actual_credit = actual_credit.add(recorded);
            }
            EntryType::Debit => {
                expected_debit = expected_debit.add(source.amount);
                actual_debit = actual_debit.add(recorded);
            }
        }
        if recorded != source.amount {
            discrepancies.push(Discrepancy {
                reference_id: source.reference_id,
                entry_type: source.entry_type,
                expected: source.amount,
                actual: recorded,
            });
        }
    }

    ReconciliationReport {
        window_start: window.start(),
        window_end: window.end(),
        expected_credit,
        actual_credit,
        expected_debit,
        actual_debit,
        discrepancies,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use stayforge_core::{InvoiceId, LedgerEntry};

    fn window() -> Interval {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        Interval::new(start, start + Duration::days(30)).unwrap()
    }

    fn paid_invoice(total: u64, paid_day: u32) -> Invoice {
        let paid_at = Utc.with_ymd_and_hms(2025, 6, paid_day, 12, 0, 0).unwrap();
        Invoice {
            id: InvoiceId::new(),
            total_amount: Money::from_minor(total),
            currency: "USD".to_string(),
            status: InvoiceStatus::Paid,
            issued_at: paid_at - Duration::days(3),
            paid_at: Some(paid_at),
        }
    }

    fn credit_for(invoice: &Invoice) -> LedgerEntry {
        LedgerEntry::new(
            EntryType::Credit,
            invoice.total_amount,
            invoice.currency.clone(),
            ReferenceId::from(invoice.id),
            "payment".to_string(),
            invoice.paid_at.unwrap(),
        )
    }

    #[test]
    fn matched_window_is_clean() {
        // Invoices totaling 10_000_000 with matching CREDIT entries
        let invoices = vec![
            paid_invoice(4_000_000, 3),
            paid_invoice(3_500_000, 10),
            paid_invoice(2_500_000, 20),
        ];
        let entries: Vec<LedgerEntry> = invoices.iter().map(credit_for).collect();

        let expected = expectations(window(), &invoices, []);
        let report = reconcile(window(), &expected, &entries);
        assert!(report.is_clean());
        assert_eq!(report.expected_credit, Money::from_minor(10_000_000));
        assert_eq!(report.actual_credit, Money::from_minor(10_000_000));
    }

    #[test]
    fn one_unrecorded_payment_is_one_line() {
        let invoices = vec![
            paid_invoice(4_000_000, 3),
            paid_invoice(3_500_000, 10),
            paid_invoice(2_500_000, 20),
        ];
        // Drop the ledger entry for the middle invoice
        let entries: Vec<LedgerEntry> = invoices
            .iter()
            .filter(|i| i.total_amount != Money::from_minor(3_500_000))
            .map(credit_for)
            .collect();

        let expected = expectations(window(), &invoices, []);
        let report = reconcile(window(), &expected, &entries);
        assert_eq!(report.discrepancies.len(), 1);
        let line = &report.discrepancies[0];
        assert_eq!(line.reference_id, ReferenceId::from(invoices[1].id));
        assert_eq!(line.expected, Money::from_minor(3_500_000));
        assert_eq!(line.actual, Money::ZERO);
    }

    #[test]
    fn invoices_outside_the_window_are_ignored() {
        let inside = paid_invoice(1_000_000, 15);
        let mut outside = paid_invoice(9_000_000, 15);
        outside.paid_at = Some(Utc.with_ymd_and_hms(2025, 7, 2, 0, 0, 0).unwrap());

        let expected = expectations(window(), [&inside, &outside], []);
        assert_eq!(expected.len(), 1);
        assert_eq!(expected[0].reference_id, ReferenceId::from(inside.id));
    }
}
