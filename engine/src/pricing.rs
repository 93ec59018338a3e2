//! Pricing Calculator.
//!
//! Pure quoting: rate configuration plus a requested interval (or elapsed
//! walk-in duration) in, immutable [`PriceQuote`] out. No storage, no
//! clock, no side effects. Calling twice with identical inputs yields
//! byte-identical output.
//!
//! Computation order: billable units, subtotal, fees (additive), discounts
//! (subtractive, clamped at zero), deposit (tracked separately unless the
//! policy marks it due now), total. All arithmetic is fixed-point on
//! [`Money`]; no floating point touches a financial path.

use stayforge_core::{EngineError, Interval, Money, PolicyConfig, PriceQuote, PriceUnit, RentableUnit};

/// Quotes a stay on `unit` over `interval` for `quantity` reserved slots.
///
/// Walk-in sessions skip the minimum-duration check: their interval is a
/// planning estimate, and billing happens at settlement from elapsed time.
///
/// # Errors
///
/// Returns [`EngineError::BelowMinimumDuration`] when a non-walk-in
/// interval is shorter than the unit's minimum rental duration.
pub fn quote(
    unit: &RentableUnit,
    interval: Interval,
    quantity: u32,
    policy: &PolicyConfig,
    walk_in: bool,
) -> Result<PriceQuote, EngineError> {
    if !walk_in && interval.whole_hours() < unit.min_duration_hours {
        return Err(EngineError::BelowMinimumDuration {
            requested_hours: interval.whole_hours(),
            minimum_hours: unit.min_duration_hours,
        });
    }

    let billable_units = match unit.price_unit {
        PriceUnit::Hour => interval.whole_hours(),
        PriceUnit::Night => interval.whole_nights(),
        PriceUnit::Month => interval.whole_months(),
    };

    Ok(build_quote(unit, billable_units, quantity, policy))
}

/// Settles an open-ended session from elapsed billable hours.
///
/// Used at walk-in checkout and for late checkouts: the elapsed duration,
/// already rounded up to whole hours by the caller, replaces the original
/// estimate. Nightly and monthly units convert elapsed hours to whole
/// nights/months, rounding up.
#[must_use]
pub fn settle_elapsed(
    unit: &RentableUnit,
    elapsed_hours: u32,
    quantity: u32,
    policy: &PolicyConfig,
) -> PriceQuote {
    let billable_units = match unit.price_unit {
        PriceUnit::Hour => elapsed_hours,
        PriceUnit::Night => elapsed_hours.div_ceil(24).max(1),
        PriceUnit::Month => elapsed_hours.div_ceil(30 * 24).max(1),
    };
    build_quote(unit, billable_units, quantity, policy)
}

fn build_quote(
    unit: &RentableUnit,
    billable_units: u32,
    quantity: u32,
    policy: &PolicyConfig,
) -> PriceQuote {
    let subtotal = unit
        .base_price
        .multiply(billable_units)
        .multiply(quantity.max(1));

    let fees: std::collections::BTreeMap<_, _> = policy
        .fees
        .iter()
        .map(|(kind, rule)| (*kind, rule.amount(subtotal)))
        .filter(|(_, amount)| !amount.is_zero())
        .collect();

    let discounts: std::collections::BTreeMap<_, _> = policy
        .discounts
        .iter()
        .map(|(kind, rule)| (*kind, rule.amount(subtotal, billable_units)))
        .filter(|(_, amount)| !amount.is_zero())
        .collect();

    let fee_total = fees.values().fold(Money::ZERO, |acc, f| acc.add(*f));
    let discount_total = discounts.values().fold(Money::ZERO, |acc, d| acc.add(*d));

    let deposit = policy.deposit.amount(subtotal);

    // Discounts never push the amount due below zero
    let mut total = subtotal.add(fee_total).saturating_sub(discount_total);
    if policy.deposit.due_now {
        total = total.add(deposit);
    }

    PriceQuote {
        base_price: unit.base_price,
        price_unit: unit.price_unit,
        billable_units,
        subtotal,
        fees,
        discounts,
        deposit,
        total,
        currency: unit.currency.clone(),
    }
}
