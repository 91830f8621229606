//! TUSD Fio B encargo on compensated energy (Lei 14.300 phase-in).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{clamp_fraction, non_negative, Kwh, Money, Rate};

/// Share of generation consumed instantly when none is configured.
pub const DEFAULT_SIMULTANEITY: Rate = dec!(0.6);
/// Legal incidence factor when none is configured.
pub const DEFAULT_INCIDENCE_FACTOR: Rate = Decimal::ONE;

/// TUSD Fio B settings for a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TusdConfig {
    /// Legacy Fio B share of the TUSD rate (percentual Fio B), as a fraction
    pub fio_b_percent: Rate,
    /// Self-consumption simultaneity fraction
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simultaneity: Option<Rate>,
    /// Legacy TUSD rate, R$/kWh
    pub tariff_rkwh: Money,
    /// Official published Fio B rate, preferred when present and positive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_fio_b_rate: Option<Money>,
    /// Lei 14.300 incidence factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidence_factor: Option<Rate>,
}

impl Default for TusdConfig {
    fn default() -> Self {
        Self {
            fio_b_percent: Decimal::ZERO,
            simultaneity: Some(DEFAULT_SIMULTANEITY),
            tariff_rkwh: Decimal::ZERO,
            official_fio_b_rate: None,
            incidence_factor: Some(DEFAULT_INCIDENCE_FACTOR),
        }
    }
}

impl TusdConfig {
    /// Charge for `generated_kwh`, with `legacy_rate` standing in for the
    /// configured TUSD rate.
    pub fn charge(&self, generated_kwh: Kwh, legacy_rate: Money) -> Money {
        tusd_fio_b_charge(
            generated_kwh,
            self.simultaneity,
            self.fio_b_percent,
            legacy_rate,
            self.official_fio_b_rate,
            self.incidence_factor,
        )
    }
}

/// Energy injected into the grid and later compensated.
pub fn compensated_energy(generated_kwh: Kwh, simultaneity: Option<Rate>) -> Kwh {
    let simultaneity = clamp_fraction(simultaneity.unwrap_or(DEFAULT_SIMULTANEITY));
    non_negative(generated_kwh) * (Decimal::ONE - simultaneity)
}

/// Official Fio B rate when positive, otherwise `legacy_rate * legacy_percent`.
pub fn applied_fio_b_rate(
    legacy_percent: Rate,
    legacy_rate: Money,
    official_rate: Option<Money>,
) -> Money {
    match official_rate {
        Some(rate) if rate > Decimal::ZERO => rate,
        _ => non_negative(legacy_rate) * clamp_fraction(legacy_percent),
    }
}

/// Monthly TUSD Fio B charge. Never negative; non-positive generation
/// yields 0.
pub fn tusd_fio_b_charge(
    generated_kwh: Kwh,
    simultaneity: Option<Rate>,
    legacy_percent: Rate,
    legacy_rate: Money,
    official_rate: Option<Money>,
    incidence_factor: Option<Rate>,
) -> Money {
    if generated_kwh <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let compensated = compensated_energy(generated_kwh, simultaneity);
    let rate = applied_fio_b_rate(legacy_percent, legacy_rate, official_rate);
    let incidence = clamp_fraction(incidence_factor.unwrap_or(DEFAULT_INCIDENCE_FACTOR));

    rate.checked_mul(compensated)
        .and_then(|v| v.checked_mul(incidence))
        .map(non_negative)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_official_rate_preferred() {
        // 500 kWh, 50% simultaneity → 250 compensated; 0.22 * 250 * 0.75
        let charge = tusd_fio_b_charge(
            dec!(500),
            Some(dec!(0.5)),
            dec!(0.25),
            dec!(0.2),
            Some(dec!(0.22)),
            Some(dec!(0.75)),
        );
        assert_eq!(charge, dec!(41.25));
        assert!(charge > Decimal::ZERO);
    }

    #[test]
    fn test_legacy_fallback_when_official_missing_or_zero() {
        let none = tusd_fio_b_charge(dec!(500), Some(dec!(0.5)), dec!(0.25), dec!(0.2), None, None);
        let zero = tusd_fio_b_charge(
            dec!(500),
            Some(dec!(0.5)),
            dec!(0.25),
            dec!(0.2),
            Some(Decimal::ZERO),
            None,
        );
        // 0.2 * 0.25 * 250 * 1
        assert_eq!(none, dec!(12.5));
        assert_eq!(zero, dec!(12.5));
    }

    #[test]
    fn test_default_simultaneity() {
        assert_eq!(compensated_energy(dec!(100), None), dec!(40.0));
    }

    #[test]
    fn test_fractions_clamped() {
        assert_eq!(compensated_energy(dec!(100), Some(dec!(1.4))), Decimal::ZERO);
        let full = tusd_fio_b_charge(dec!(100), Some(Decimal::ZERO), dec!(1), dec!(0.1), None, Some(dec!(3)));
        assert_eq!(full, dec!(10.0));
    }

    #[test]
    fn test_non_positive_generation() {
        assert_eq!(
            tusd_fio_b_charge(Decimal::ZERO, None, dec!(0.3), dec!(0.5), None, None),
            Decimal::ZERO
        );
        assert_eq!(
            tusd_fio_b_charge(dec!(-10), None, dec!(0.3), dec!(0.5), None, None),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_config_default_and_charge() {
        let cfg = TusdConfig {
            fio_b_percent: dec!(0.28),
            tariff_rkwh: dec!(0.45),
            ..TusdConfig::default()
        };
        let direct = tusd_fio_b_charge(dec!(300), Some(dec!(0.6)), dec!(0.28), dec!(0.45), None, Some(Decimal::ONE));
        assert_eq!(cfg.charge(dec!(300), dec!(0.45)), direct);
    }
}
