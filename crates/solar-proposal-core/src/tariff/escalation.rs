//! Anniversary-based tariff escalation.
//!
//! The full (undiscounted) tariff is raised once per contract year by the
//! annual inflation rate. The first raise never lands before a complete
//! 12-month cycle has elapsed since activation, whatever the distance between
//! the reference month and the anniversary month.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::time_value::growth_factor;
use crate::types::{clamp_fraction, non_negative, Money, Rate};

/// Anniversary month used when the configured one is outside 1..=12.
pub const DEFAULT_ANNIVERSARY_MONTH: u32 = 6;
/// Reference month used when the configured one is outside 1..=12.
pub const DEFAULT_REFERENCE_MONTH: u32 = 1;

const MONTHS_PER_YEAR: u32 = 12;

/// Tariff inputs for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffParameters {
    /// Tarifa cheia, R$/kWh
    pub full_tariff: Money,
    /// Contractual discount fraction (desconto), clamped to [0, 1]
    pub discount: Rate,
    /// Annual tariff adjustment rate (inflação a.a.)
    pub annual_inflation: Rate,
    /// Month of the year in which the distributor adjusts tariffs (1-12)
    pub anniversary_month: u32,
    /// Month in which the contract was activated (1-12)
    pub reference_month: u32,
}

impl TariffParameters {
    pub fn full_tariff_at(&self, month: u32) -> Money {
        projected_full_tariff(
            self.full_tariff,
            self.annual_inflation,
            month,
            self.anniversary_month,
            self.reference_month,
        )
    }

    pub fn discounted_tariff_at(&self, month: u32) -> Money {
        discounted_tariff(
            self.full_tariff,
            self.discount,
            self.annual_inflation,
            month,
            self.anniversary_month,
            self.reference_month,
        )
    }
}

/// Snap a calendar month into 1..=12, using `fallback` for anything else.
pub fn normalize_month(month: u32, fallback: u32) -> u32 {
    if (1..=MONTHS_PER_YEAR).contains(&month) {
        month
    } else {
        fallback
    }
}

/// Reference month for a contract activated on `activation`.
pub fn reference_month_from_date(activation: NaiveDate) -> u32 {
    activation.month()
}

/// Months from activation until the first tariff adjustment.
///
/// The naive distance `(anniversary - reference + 12) mod 12` is forced up to
/// 12 whenever it is 0 or shorter than a full cycle, so an adjustment is
/// never applied inside the first contract year. An anniversary 11 months
/// after activation also waits the full 12.
pub fn months_to_first_adjustment(anniversary_month: u32, reference_month: u32) -> u32 {
    let anniversary = normalize_month(anniversary_month, DEFAULT_ANNIVERSARY_MONTH);
    let reference = normalize_month(reference_month, DEFAULT_REFERENCE_MONTH);

    let naive = (anniversary + MONTHS_PER_YEAR - reference) % MONTHS_PER_YEAR;
    let first = if naive == 0 || naive < MONTHS_PER_YEAR {
        MONTHS_PER_YEAR
    } else {
        naive
    };
    log::trace!(
        "anniversary {anniversary}, reference {reference}: naive distance {naive}, first adjustment after {first}"
    );
    first
}

/// Number of annual adjustments applied by contract month `month` (1-based).
/// Non-decreasing in `month`.
pub fn escalation_steps(month: u32, anniversary_month: u32, reference_month: u32) -> u32 {
    if month <= 1 {
        return 0;
    }
    let first = months_to_first_adjustment(anniversary_month, reference_month);
    let elapsed = month - 1;
    if elapsed < first {
        0
    } else {
        1 + (elapsed - first) / MONTHS_PER_YEAR
    }
}

/// Escalated full tariff for contract month `month`.
///
/// A negative base tariff is floored at 0; a multiplier that overflows
/// suppresses the result to 0.
pub fn projected_full_tariff(
    full_tariff: Money,
    annual_inflation: Rate,
    month: u32,
    anniversary_month: u32,
    reference_month: u32,
) -> Money {
    let base = non_negative(full_tariff);
    let steps = escalation_steps(month, anniversary_month, reference_month);
    let multiplier = match growth_factor(annual_inflation, steps) {
        Some(m) => m,
        None => return Decimal::ZERO,
    };
    base.checked_mul(multiplier).unwrap_or(Decimal::ZERO)
}

/// Billing tariff: escalated tariff (floored at 0) times `1 - discount`.
pub fn discounted_tariff(
    full_tariff: Money,
    discount: Rate,
    annual_inflation: Rate,
    month: u32,
    anniversary_month: u32,
    reference_month: u32,
) -> Money {
    let escalated = non_negative(projected_full_tariff(
        full_tariff,
        annual_inflation,
        month,
        anniversary_month,
        reference_month,
    ));
    escalated * (Decimal::ONE - clamp_fraction(discount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalize_month() {
        assert_eq!(normalize_month(0, 6), 6);
        assert_eq!(normalize_month(13, 6), 6);
        assert_eq!(normalize_month(12, 6), 12);
        assert_eq!(normalize_month(1, 6), 1);
    }

    #[test]
    fn test_first_adjustment_always_waits_full_cycle() {
        for reference in 1..=12 {
            for anniversary in 1..=12 {
                assert_eq!(months_to_first_adjustment(anniversary, reference), 12);
            }
        }
    }

    #[test]
    fn test_anniversary_eleven_months_out_still_waits_twelve() {
        // reference 7, anniversary 6 → naive distance 11
        assert_eq!(months_to_first_adjustment(6, 7), 12);
    }

    #[test]
    fn test_steps_boundary_around_first_adjustment() {
        let first = months_to_first_adjustment(6, 3);
        // elapsed == first - 1 → no adjustment yet
        assert_eq!(escalation_steps(first, 6, 3), 0);
        // elapsed == first → one adjustment
        assert_eq!(escalation_steps(first + 1, 6, 3), 1);
    }

    #[test]
    fn test_steps_per_year() {
        assert_eq!(escalation_steps(0, 6, 1), 0);
        assert_eq!(escalation_steps(1, 6, 1), 0);
        assert_eq!(escalation_steps(12, 6, 1), 0);
        assert_eq!(escalation_steps(13, 6, 1), 1);
        assert_eq!(escalation_steps(24, 6, 1), 1);
        assert_eq!(escalation_steps(25, 6, 1), 2);
        assert_eq!(escalation_steps(360, 6, 1), 29);
    }

    #[test]
    fn test_steps_non_decreasing() {
        let mut prev = 0;
        for m in 0..=400 {
            let s = escalation_steps(m, 3, 11);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn test_full_tariff_month_thirteen() {
        let t1 = projected_full_tariff(dec!(0.95), dec!(0.08), 1, 6, 2);
        let t13 = projected_full_tariff(dec!(0.95), dec!(0.08), 13, 6, 2);
        assert_eq!(t1, dec!(0.95));
        assert_eq!(t13, dec!(0.95) * dec!(1.08));
    }

    #[test]
    fn test_negative_tariff_floored() {
        assert_eq!(projected_full_tariff(dec!(-1), dec!(0.08), 30, 6, 1), Decimal::ZERO);
        assert_eq!(discounted_tariff(dec!(-1), dec!(0.1), dec!(0.08), 30, 6, 1), Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_multiplier_suppressed() {
        assert_eq!(
            projected_full_tariff(dec!(1), dec!(1000000), 600, 6, 1),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_unrepresentable_inflation_suppressed() {
        assert_eq!(projected_full_tariff(dec!(1), Decimal::MAX, 1, 6, 1), dec!(1));
        assert_eq!(projected_full_tariff(dec!(1), Decimal::MAX, 13, 6, 1), Decimal::ZERO);
    }

    #[test]
    fn test_discount_clamped() {
        assert_eq!(discounted_tariff(dec!(1), dec!(1.5), dec!(0.08), 1, 6, 1), Decimal::ZERO);
        assert_eq!(discounted_tariff(dec!(1), dec!(-0.5), dec!(0.08), 1, 6, 1), dec!(1));
    }

    #[test]
    fn test_reference_month_from_date() {
        let d = NaiveDate::from_ymd_opt(2025, 9, 14).unwrap();
        assert_eq!(reference_month_from_date(d), 9);
    }

    #[test]
    fn test_parameters_methods_match_free_functions() {
        let p = TariffParameters {
            full_tariff: dec!(0.89),
            discount: dec!(0.15),
            annual_inflation: dec!(0.06),
            anniversary_month: 4,
            reference_month: 10,
        };
        assert_eq!(p.full_tariff_at(40), projected_full_tariff(dec!(0.89), dec!(0.06), 40, 4, 10));
        assert_eq!(
            p.discounted_tariff_at(40),
            discounted_tariff(dec!(0.89), dec!(0.15), dec!(0.06), 40, 4, 10)
        );
    }
}
