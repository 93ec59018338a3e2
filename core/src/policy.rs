//! Pricing and cancellation policy configuration.
//!
//! Fees and discounts are a closed, tagged set of kinds with explicit
//! numeric semantics; internal storage stays a keyed mapping so quotes can
//! itemize them. Cancellation refunds are explicit, versioned policy data
//! (ordered bands), never thresholds inferred at the call site.

use crate::types::Money;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================================
// Fees
// ============================================================================

/// Closed set of fee kinds the calculator understands
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeeKind {
    /// Platform service fee
    Service,
    /// Property management fee
    Management,
    /// Parking
    Parking,
    /// Internet access
    Internet,
}

impl fmt::Display for FeeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service => write!(f, "service"),
            Self::Management => write!(f, "management"),
            Self::Parking => write!(f, "parking"),
            Self::Internet => write!(f, "internet"),
        }
    }
}

/// How a fee amount is computed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeRule {
    /// Fixed amount per booking
    Flat(Money),
    /// Percentage of the pre-fee subtotal
    PercentOfSubtotal(u32),
}

impl FeeRule {
    /// Computes the fee amount for a given subtotal
    #[must_use]
    pub const fn amount(&self, subtotal: Money) -> Money {
        match self {
            Self::Flat(amount) => *amount,
            Self::PercentOfSubtotal(percent) => subtotal.percent_of(*percent),
        }
    }
}

// ============================================================================
// Discounts
// ============================================================================

/// Closed set of discount kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DiscountKind {
    /// Length-of-stay discount for long bookings
    LengthOfStay,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthOfStay => write!(f, "length_of_stay"),
        }
    }
}

/// A discount triggered by booking length
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountRule {
    /// Minimum billable units before the discount applies
    pub min_billable_units: u32,
    /// Percentage of the subtotal deducted
    pub percent: u32,
}

impl DiscountRule {
    /// Discount amount for a subtotal, zero when the stay is too short
    #[must_use]
    pub const fn amount(&self, subtotal: Money, billable_units: u32) -> Money {
        if billable_units >= self.min_billable_units {
            subtotal.percent_of(self.percent)
        } else {
            Money::ZERO
        }
    }
}

// ============================================================================
// Deposits
// ============================================================================

/// How the deposit amount is derived
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositRule {
    /// No deposit required
    Waived,
    /// Fixed deposit amount
    Flat(Money),
    /// Percentage of the subtotal
    PercentOfSubtotal(u32),
}

/// Deposit / booking-hold policy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositPolicy {
    /// Amount derivation rule
    pub rule: DepositRule,
    /// When set, the deposit is part of the amount due now and a CREDIT
    /// ledger entry is captured at confirmation
    pub due_now: bool,
}

impl DepositPolicy {
    /// Policy requiring no deposit
    #[must_use]
    pub const fn waived() -> Self {
        Self {
            rule: DepositRule::Waived,
            due_now: false,
        }
    }

    /// Deposit amount for a given subtotal
    #[must_use]
    pub const fn amount(&self, subtotal: Money) -> Money {
        match self.rule {
            DepositRule::Waived => Money::ZERO,
            DepositRule::Flat(amount) => amount,
            DepositRule::PercentOfSubtotal(percent) => subtotal.percent_of(percent),
        }
    }
}

// ============================================================================
// Cancellation
// ============================================================================

/// One refund band: cancelling at least `min_hours_before_start` hours
/// ahead refunds `refund_percent` of the captured deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundBand {
    /// Inclusive lower bound on hours between cancellation and `start_at`
    pub min_hours_before_start: i64,
    /// Percentage of the deposit refunded
    pub refund_percent: u32,
}

/// Versioned cancellation policy: an ordered set of refund bands.
///
/// Bands are evaluated most-generous-first; the first band whose
/// `min_hours_before_start` is met wins. No matching band means no refund.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPolicy {
    /// Policy tag referenced by `RentableUnit::policy_tag`
    pub tag: String,
    /// Refund bands, ordered by descending `min_hours_before_start`
    pub bands: Vec<RefundBand>,
}

impl CancellationPolicy {
    /// Full refund when cancelling at least 24 hours ahead
    #[must_use]
    pub fn flexible() -> Self {
        Self {
            tag: "FLEXIBLE".to_string(),
            bands: vec![RefundBand {
                min_hours_before_start: 24,
                refund_percent: 100,
            }],
        }
    }

    /// Full refund at five days out, half at one day out
    #[must_use]
    pub fn moderate() -> Self {
        Self {
            tag: "MODERATE".to_string(),
            bands: vec![
                RefundBand {
                    min_hours_before_start: 120,
                    refund_percent: 100,
                },
                RefundBand {
                    min_hours_before_start: 24,
                    refund_percent: 50,
                },
            ],
        }
    }

    /// No refund at any point
    #[must_use]
    pub fn strict() -> Self {
        Self {
            tag: "STRICT".to_string(),
            bands: Vec::new(),
        }
    }

    /// Refund percentage for a cancellation `hours_before_start` hours
    /// ahead of the stay. Negative values (cancellation after the start
    /// instant) never match a band.
    #[must_use]
    pub fn refund_percent_for(&self, hours_before_start: i64) -> u32 {
        self.bands
            .iter()
            .find(|band| hours_before_start >= band.min_hours_before_start)
            .map_or(0, |band| band.refund_percent)
    }
}

// ============================================================================
// Combined configuration
// ============================================================================

/// All pricing and cancellation policy inputs, resolved once at startup
/// and passed into the engine as explicit configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Fee schedule applied to every quote
    pub fees: BTreeMap<FeeKind, FeeRule>,
    /// Discount schedule
    pub discounts: BTreeMap<DiscountKind, DiscountRule>,
    /// Deposit policy
    pub deposit: DepositPolicy,
    /// Cancellation policies by tag
    pub cancellation: HashMap<String, CancellationPolicy>,
    /// Fallback when a unit's tag is unknown
    pub default_cancellation: CancellationPolicy,
}

impl PolicyConfig {
    /// Configuration with no fees, no discounts, no deposit, and the
    /// standard cancellation presets registered.
    #[must_use]
    pub fn bare() -> Self {
        let presets = [
            CancellationPolicy::flexible(),
            CancellationPolicy::moderate(),
            CancellationPolicy::strict(),
        ];
        Self {
            fees: BTreeMap::new(),
            discounts: BTreeMap::new(),
            deposit: DepositPolicy::waived(),
            cancellation: presets
                .into_iter()
                .map(|p| (p.tag.clone(), p))
                .collect(),
            default_cancellation: CancellationPolicy::strict(),
        }
    }

    /// Resolves a unit's policy tag, falling back to the default
    #[must_use]
    pub fn cancellation_for(&self, tag: &str) -> &CancellationPolicy {
        self.cancellation
            .get(tag)
            .unwrap_or(&self.default_cancellation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_refunds_at_and_beyond_24h() {
        let policy = CancellationPolicy::flexible();
        assert_eq!(policy.refund_percent_for(48), 100);
        assert_eq!(policy.refund_percent_for(24), 100);
        assert_eq!(policy.refund_percent_for(23), 0);
        assert_eq!(policy.refund_percent_for(-2), 0);
    }

    #[test]
    fn moderate_bands_evaluated_most_generous_first() {
        let policy = CancellationPolicy::moderate();
        assert_eq!(policy.refund_percent_for(200), 100);
        assert_eq!(policy.refund_percent_for(120), 100);
        assert_eq!(policy.refund_percent_for(119), 50);
        assert_eq!(policy.refund_percent_for(24), 50);
        assert_eq!(policy.refund_percent_for(1), 0);
    }

    #[test]
    fn strict_never_refunds() {
        let policy = CancellationPolicy::strict();
        assert_eq!(policy.refund_percent_for(10_000), 0);
    }

    #[test]
    fn unknown_tag_falls_back_to_default() {
        let config = PolicyConfig::bare();
        assert_eq!(config.cancellation_for("NO_SUCH_TAG").tag, "STRICT");
        assert_eq!(config.cancellation_for("FLEXIBLE").tag, "FLEXIBLE");
    }

    #[test]
    fn fee_rules() {
        let subtotal = Money::from_minor(10_000);
        assert_eq!(
            FeeRule::Flat(Money::from_minor(500)).amount(subtotal),
            Money::from_minor(500)
        );
        assert_eq!(
            FeeRule::PercentOfSubtotal(10).amount(subtotal),
            Money::from_minor(1_000)
        );
    }

    #[test]
    fn length_of_stay_discount_needs_minimum_units() {
        let rule = DiscountRule {
            min_billable_units: 7,
            percent: 10,
        };
        let subtotal = Money::from_minor(70_000);
        assert_eq!(rule.amount(subtotal, 6), Money::ZERO);
        assert_eq!(rule.amount(subtotal, 7), Money::from_minor(7_000));
    }
}
