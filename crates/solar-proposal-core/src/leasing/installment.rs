//! Net monthly installment (mensalidade líquida) for a leasing client.
//!
//! Every function here is pure: the installment for month *m* depends only on
//! the input, so a full schedule is just the breakdown evaluated for each
//! month in turn.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tariff::escalation::TariffParameters;
use crate::tariff::tusd::TusdConfig;
use crate::types::{clamp_fraction, non_negative, Kwh, Money};

/// How an upfront payment (entrada) is returned to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownPaymentMode {
    /// Spread evenly as a monthly credit over the contract term
    Credit,
    /// Shrink the contracted energy in proportion to the prepaid share
    ReduceContracted,
    /// Down payment has no effect on the installment
    #[default]
    None,
}

/// Everything needed to price one month of a leasing contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentInput {
    /// Contracted energy, kWh/month
    pub contracted_kwh: Kwh,
    pub tariff: TariffParameters,
    /// Contract month, 1-based
    pub month: u32,
    /// Minimum billing fee (custo de disponibilidade), R$/month
    #[serde(default)]
    pub minimum_fee: Money,
    /// Other fixed monthly charges such as CIP, R$/month
    #[serde(default)]
    pub extra_charges: Money,
    #[serde(default)]
    pub down_payment: Money,
    #[serde(default)]
    pub down_payment_mode: DownPaymentMode,
    pub term_months: u32,
    #[serde(default)]
    pub tusd: TusdConfig,
    /// Minimum fee, fixed charges and TUSD are waived
    #[serde(default)]
    pub fees_exempt: bool,
}

/// Components of one month's installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentBreakdown {
    pub month: u32,
    pub contracted_kwh: Kwh,
    pub full_tariff: Money,
    pub discounted_tariff: Money,
    pub energy_cost: Money,
    pub fixed_charges: Money,
    pub tusd_fio_b: Money,
    pub credit: Money,
    pub total: Money,
}

impl InstallmentBreakdown {
    fn zero(month: u32, contracted_kwh: Kwh) -> Self {
        Self {
            month,
            contracted_kwh,
            full_tariff: Decimal::ZERO,
            discounted_tariff: Decimal::ZERO,
            energy_cost: Decimal::ZERO,
            fixed_charges: Decimal::ZERO,
            tusd_fio_b: Decimal::ZERO,
            credit: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

/// Grid-side bill (conta de rede) the client still pays the distributor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkBill {
    pub minimum_fee: Money,
    pub cip: Money,
    pub tusd_fio_b: Money,
    pub total: Money,
}

/// Uniform monthly credit that returns a down payment over the term.
pub fn monthly_credit(down_payment: Money, term_months: u32) -> Money {
    if term_months == 0 || down_payment <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    down_payment / Decimal::from(term_months)
}

/// Contracted energy after applying the down-payment mode.
///
/// Under `ReduceContracted` the nominal energy shrinks by the share of the
/// discounted contract value (priced at the unescalated tariff over the whole
/// term) that the down payment covers.
pub fn resolve_contracted_energy(input: &InstallmentInput) -> Kwh {
    let nominal = non_negative(input.contracted_kwh);
    if input.down_payment_mode != DownPaymentMode::ReduceContracted {
        return nominal;
    }

    let down_payment = non_negative(input.down_payment);
    let contract_value = nominal
        .checked_mul(non_negative(input.tariff.full_tariff))
        .and_then(|v| v.checked_mul(Decimal::ONE - clamp_fraction(input.tariff.discount)))
        .and_then(|v| v.checked_mul(Decimal::from(input.term_months)));

    // An overflowing share means the down payment dwarfs the contract.
    let fraction = match contract_value {
        Some(value) if value > Decimal::ZERO => down_payment
            .checked_div(value)
            .map(clamp_fraction)
            .unwrap_or(Decimal::ONE),
        _ => Decimal::ZERO,
    };
    nominal * (Decimal::ONE - fraction)
}

/// Breakdown for `input.month`.
pub fn installment_breakdown(input: &InstallmentInput) -> InstallmentBreakdown {
    breakdown_for_month(input, input.month)
}

fn breakdown_for_month(input: &InstallmentInput, month: u32) -> InstallmentBreakdown {
    let contracted = resolve_contracted_energy(input);
    if contracted <= Decimal::ZERO {
        return InstallmentBreakdown::zero(month, contracted);
    }

    let full_tariff = input.tariff.full_tariff_at(month);
    let discounted_tariff = input.tariff.discounted_tariff_at(month);

    let energy_cost = match contracted.checked_mul(discounted_tariff) {
        Some(cost) => cost,
        None => return InstallmentBreakdown::zero(month, contracted),
    };

    let (fixed_charges, tusd_fio_b) = if input.fees_exempt {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let fixed = non_negative(input.minimum_fee)
            .checked_add(non_negative(input.extra_charges))
            .unwrap_or(Decimal::ZERO);
        let legacy_rate = if input.tusd.tariff_rkwh > Decimal::ZERO {
            input.tusd.tariff_rkwh
        } else {
            full_tariff
        };
        (fixed, input.tusd.charge(contracted, legacy_rate))
    };

    let credit = if input.down_payment_mode == DownPaymentMode::Credit {
        monthly_credit(input.down_payment, input.term_months)
    } else {
        Decimal::ZERO
    };

    let total = energy_cost
        .checked_add(fixed_charges)
        .and_then(|v| v.checked_add(tusd_fio_b))
        .map(|base| non_negative(base - credit))
        .unwrap_or(Decimal::ZERO);

    InstallmentBreakdown {
        month,
        contracted_kwh: contracted,
        full_tariff,
        discounted_tariff,
        energy_cost,
        fixed_charges,
        tusd_fio_b,
        credit,
        total,
    }
}

/// Net installment the client pays in `input.month`.
pub fn monthly_installment(input: &InstallmentInput) -> Money {
    installment_breakdown(input).total
}

/// Breakdowns for months 1..=months; `input.month` is ignored.
pub fn installment_schedule(input: &InstallmentInput, months: u32) -> Vec<InstallmentBreakdown> {
    (1..=months).map(|m| breakdown_for_month(input, m)).collect()
}

/// Minimum billable energy at the escalated tariff, plus CIP and TUSD Fio B.
pub fn network_bill(
    minimum_billable_kwh: Kwh,
    full_tariff: Money,
    cip: Money,
    tusd_fio_b: Money,
) -> NetworkBill {
    let minimum_fee = non_negative(minimum_billable_kwh)
        .checked_mul(non_negative(full_tariff))
        .unwrap_or(Decimal::ZERO);
    let cip = non_negative(cip);
    let tusd_fio_b = non_negative(tusd_fio_b);
    let total = minimum_fee
        .checked_add(cip)
        .and_then(|v| v.checked_add(tusd_fio_b))
        .unwrap_or(Decimal::ZERO);
    NetworkBill {
        minimum_fee,
        cip,
        tusd_fio_b,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_input() -> InstallmentInput {
        InstallmentInput {
            contracted_kwh: dec!(500),
            tariff: TariffParameters {
                full_tariff: dec!(1.00),
                discount: dec!(0.20),
                annual_inflation: dec!(0.08),
                anniversary_month: 6,
                reference_month: 1,
            },
            month: 1,
            minimum_fee: dec!(50),
            extra_charges: dec!(15),
            down_payment: Decimal::ZERO,
            down_payment_mode: DownPaymentMode::None,
            term_months: 60,
            tusd: TusdConfig {
                fio_b_percent: dec!(0.25),
                simultaneity: Some(dec!(0.6)),
                tariff_rkwh: dec!(0.40),
                official_fio_b_rate: None,
                incidence_factor: Some(dec!(0.5)),
            },
            fees_exempt: false,
        }
    }

    #[test]
    fn test_monthly_credit() {
        assert_eq!(monthly_credit(dec!(4200), 60), dec!(70));
        assert_eq!(monthly_credit(dec!(4200), 0), Decimal::ZERO);
        assert_eq!(monthly_credit(dec!(-1), 60), Decimal::ZERO);
    }

    #[test]
    fn test_month_one_components() {
        let b = installment_breakdown(&base_input());
        // 500 * 0.80 = 400
        assert_eq!(b.energy_cost, dec!(400));
        assert_eq!(b.fixed_charges, dec!(65));
        // 500 * 0.4 compensated = 200; rate 0.40 * 0.25 = 0.10; * 0.5 incidence = 10
        assert_eq!(b.tusd_fio_b, dec!(10));
        assert_eq!(b.total, dec!(475));
        assert_eq!(monthly_installment(&base_input()), dec!(475));
    }

    #[test]
    fn test_exempt_skips_fees_and_tusd() {
        let mut input = base_input();
        input.fees_exempt = true;
        let b = installment_breakdown(&input);
        assert_eq!(b.fixed_charges, Decimal::ZERO);
        assert_eq!(b.tusd_fio_b, Decimal::ZERO);
        assert_eq!(b.total, dec!(400));
    }

    #[test]
    fn test_credit_mode_subtracts_uniform_credit() {
        let mut input = base_input();
        input.down_payment = dec!(4200);
        input.down_payment_mode = DownPaymentMode::Credit;
        assert_eq!(monthly_installment(&input), dec!(405));
    }

    #[test]
    fn test_credit_never_drives_total_negative() {
        let mut input = base_input();
        input.down_payment = dec!(1000000);
        input.down_payment_mode = DownPaymentMode::Credit;
        assert_eq!(monthly_installment(&input), Decimal::ZERO);
    }

    #[test]
    fn test_reduce_contracted_energy() {
        let mut input = base_input();
        // contract value = 500 * 1.00 * 0.8 * 60 = 24000; 6000 covers 25%
        input.down_payment = dec!(6000);
        input.down_payment_mode = DownPaymentMode::ReduceContracted;
        assert_eq!(resolve_contracted_energy(&input), dec!(375));
    }

    #[test]
    fn test_reduce_contracted_fully_prepaid_is_zero() {
        let mut input = base_input();
        input.down_payment = dec!(50000);
        input.down_payment_mode = DownPaymentMode::ReduceContracted;
        assert_eq!(resolve_contracted_energy(&input), Decimal::ZERO);
        assert_eq!(monthly_installment(&input), Decimal::ZERO);
    }

    #[test]
    fn test_reduce_contracted_overflowing_share_is_fully_prepaid() {
        let mut input = base_input();
        input.contracted_kwh = dec!(0.0000000001);
        input.tariff.full_tariff = dec!(0.0000000001);
        input.term_months = 1;
        input.down_payment = dec!(10000000000);
        input.down_payment_mode = DownPaymentMode::ReduceContracted;
        assert_eq!(resolve_contracted_energy(&input), Decimal::ZERO);
        assert_eq!(monthly_installment(&input), Decimal::ZERO);
    }

    #[test]
    fn test_huge_fixed_charges_do_not_overflow() {
        let mut input = base_input();
        input.minimum_fee = Decimal::MAX;
        input.extra_charges = Decimal::MAX;
        let b = installment_breakdown(&input);
        assert_eq!(b.fixed_charges, Decimal::ZERO);
    }

    #[test]
    fn test_network_bill_overflow_is_zero_total() {
        let bill = network_bill(Decimal::ONE, Decimal::MAX, Decimal::MAX, Decimal::ONE);
        assert_eq!(bill.minimum_fee, Decimal::MAX);
        assert_eq!(bill.total, Decimal::ZERO);
    }

    #[test]
    fn test_legacy_rate_falls_back_to_escalated_tariff() {
        let mut input = base_input();
        input.tusd.tariff_rkwh = Decimal::ZERO;
        input.month = 13;
        let b = installment_breakdown(&input);
        // 200 kWh compensated * (1.08 * 0.25) * 0.5
        assert_eq!(b.tusd_fio_b, dec!(27.0));
    }

    #[test]
    fn test_escalation_applies_after_first_year() {
        let mut input = base_input();
        input.fees_exempt = true;
        input.month = 12;
        assert_eq!(monthly_installment(&input), dec!(400));
        input.month = 13;
        assert_eq!(monthly_installment(&input), dec!(432));
    }

    #[test]
    fn test_schedule_matches_point_evaluation() {
        let input = base_input();
        let schedule = installment_schedule(&input, 36);
        assert_eq!(schedule.len(), 36);
        for line in &schedule {
            let mut point = input.clone();
            point.month = line.month;
            assert_eq!(line.total, monthly_installment(&point));
        }
    }

    #[test]
    fn test_network_bill_sums_components() {
        let tusd = crate::tariff::tusd::tusd_fio_b_charge(
            dec!(500),
            Some(dec!(0.5)),
            dec!(0.25),
            dec!(0.2),
            Some(dec!(0.22)),
            Some(dec!(0.75)),
        );
        let bill = network_bill(dec!(100), dec!(1.08), dec!(18.5), tusd);
        assert_eq!(bill.minimum_fee, dec!(108));
        assert_eq!(bill.total, dec!(108) + dec!(18.5) + tusd);
    }
}
