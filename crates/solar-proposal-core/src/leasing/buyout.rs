//! Early buyout valuation for leased solar assets.
//!
//! From month 7 until the last contract month the client may purchase the
//! asset. The price is the depreciated replacement value plus the projected
//! operating costs still to be incurred, grossed up for expected default and
//! tax leakage, minus a cashback credit on what the client has already paid.
//! Outside that window (including the month after the contract ends, when
//! the asset transfers without charge) the buyout value is 0.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProposalError;
use crate::leasing::installment::{monthly_installment, InstallmentInput};
use crate::time_value::{checked_pow, to_monthly};
use crate::types::{clamp_fraction, non_negative, with_metadata, ComputationOutput, Money, Rate};
use crate::ProposalResult;

/// First contract month in which the client may buy the asset.
pub const BUYOUT_FIRST_MONTH: u32 = 7;
/// Longest contract accepted by the table generator.
pub const MAX_CONTRACT_MONTHS: u32 = 600;

/// Economic assumptions behind the buyout price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyoutParameters {
    /// Replacement value of the installed system at activation (VM0)
    pub replacement_value: Money,
    pub annual_depreciation: Rate,
    /// Annual general inflation (IPCA) used to project operating costs
    pub annual_ipca: Rate,
    pub annual_default_rate: Rate,
    pub annual_tax_rate: Rate,
    #[serde(default)]
    pub monthly_fixed_costs: Money,
    #[serde(default)]
    pub monthly_opex: Money,
    #[serde(default)]
    pub monthly_insurance: Money,
    /// Share of cumulative payments credited back against the price
    #[serde(default)]
    pub cashback_fraction: Rate,
    pub duration_months: u32,
}

/// Which buyout curve a proposal presents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyoutCurve {
    /// Full month-by-month valuation
    #[default]
    Valuation,
    /// Month-7 valuation interpolated linearly down to 0 at contract end
    Linear,
}

/// Contract state driving the buyout table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyoutTableInput {
    /// Installment terms; `month` is ignored
    pub installment: InstallmentInput,
    pub buyout: BuyoutParameters,
    #[serde(default)]
    pub curve: BuyoutCurve,
}

/// One row of the buyout table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyoutLine {
    pub month: u32,
    pub full_tariff: Money,
    pub discounted_tariff: Money,
    pub installment: Money,
    pub cumulative_paid: Money,
    pub cashback: Money,
    pub buyout_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyoutTableOutput {
    pub curve: BuyoutCurve,
    pub lines: Vec<BuyoutLine>,
    pub total_paid: Money,
    /// Month-7 valuation the linear curve starts from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linear_baseline: Option<Money>,
}

fn in_buyout_window(month: u32, duration_months: u32) -> bool {
    month >= BUYOUT_FIRST_MONTH && month <= duration_months
}

/// `VM0 * (1 - monthly depreciation)^month`, floored at 0.
pub fn depreciated_value(params: &BuyoutParameters, month: u32) -> Money {
    let monthly = to_monthly(params.annual_depreciation);
    let factor = checked_pow(Decimal::ONE - monthly, month);
    factor
        .and_then(|f| non_negative(params.replacement_value).checked_mul(f))
        .map(non_negative)
        .unwrap_or(Decimal::ZERO)
}

/// Fixed monthly costs from `month` through the last contract month,
/// compounding at monthly IPCA.
pub fn remaining_operating_costs(params: &BuyoutParameters, month: u32) -> Money {
    let base = match non_negative(params.monthly_fixed_costs)
        .checked_add(non_negative(params.monthly_opex))
        .and_then(|v| v.checked_add(non_negative(params.monthly_insurance)))
    {
        Some(b) => b,
        None => return Decimal::ZERO,
    };
    if base.is_zero() || month > params.duration_months {
        return Decimal::ZERO;
    }

    let growth = Decimal::ONE + to_monthly(params.annual_ipca);
    let mut factor = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for _ in month..=params.duration_months {
        total = match base.checked_mul(factor).and_then(|c| total.checked_add(c)) {
            Some(t) => t,
            None => return Decimal::ZERO,
        };
        factor = match factor.checked_mul(growth) {
            Some(f) => f,
            None => return Decimal::ZERO,
        };
    }
    total
}

/// `1 / ((1 - monthly default) * (1 - monthly tax))`, or 1 when the
/// denominator is not positive.
pub fn gross_up_factor(params: &BuyoutParameters) -> Decimal {
    let default_m = to_monthly(params.annual_default_rate);
    let tax_m = to_monthly(params.annual_tax_rate);
    let denominator = (Decimal::ONE - default_m) * (Decimal::ONE - tax_m);
    if denominator <= Decimal::ZERO {
        return Decimal::ONE;
    }
    Decimal::ONE.checked_div(denominator).unwrap_or(Decimal::ONE)
}

/// Cashback owed on `cumulative_paid`.
pub fn cashback_credit(cashback_fraction: Rate, cumulative_paid: Money) -> Money {
    if cashback_fraction <= Decimal::ZERO || cumulative_paid <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    clamp_fraction(cashback_fraction) * cumulative_paid
}

/// Buyout price in `month` given everything paid so far. Rounded to cents.
pub fn buyout_value(params: &BuyoutParameters, month: u32, cumulative_paid: Money) -> Money {
    if !in_buyout_window(month, params.duration_months) {
        return Decimal::ZERO;
    }

    let asset = depreciated_value(params, month);
    let costs = remaining_operating_costs(params, month);
    let cashback = cashback_credit(params.cashback_fraction, cumulative_paid);

    let raw = match asset
        .checked_add(costs)
        .and_then(|v| v.checked_mul(gross_up_factor(params)))
    {
        Some(v) => v - cashback,
        None => return Decimal::ZERO,
    };

    non_negative(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Linear buyout curve: `baseline * (duration - month) / (duration - 7)`.
///
/// Only defined inside the buyout window and for contracts longer than
/// seven months; 0 elsewhere.
pub fn linear_buyout_value(baseline: Money, month: u32, duration_months: u32) -> Money {
    if duration_months <= BUYOUT_FIRST_MONTH || !in_buyout_window(month, duration_months) {
        return Decimal::ZERO;
    }
    let remaining = Decimal::from(duration_months - month);
    let span = Decimal::from(duration_months - BUYOUT_FIRST_MONTH);
    non_negative(baseline)
        .checked_mul(remaining)
        .map(|v| non_negative(v / span))
        .unwrap_or(Decimal::ZERO)
}

/// Month-by-month buyout table for months 1..=duration.
pub fn buyout_lines(input: &BuyoutTableInput) -> Vec<BuyoutLine> {
    let params = &input.buyout;
    let tariff = &input.installment.tariff;
    let mut point = input.installment.clone();
    let mut cumulative_paid = Decimal::ZERO;
    let mut baseline: Option<Money> = None;
    let mut lines = Vec::with_capacity(params.duration_months as usize);

    for month in 1..=params.duration_months {
        point.month = month;
        let installment = monthly_installment(&point);
        cumulative_paid = cumulative_paid.saturating_add(installment);

        let valuation = buyout_value(params, month, cumulative_paid);
        if month == BUYOUT_FIRST_MONTH {
            baseline = Some(valuation);
        }
        let value = match (input.curve, baseline) {
            (BuyoutCurve::Valuation, _) => valuation,
            (BuyoutCurve::Linear, Some(b)) => linear_buyout_value(b, month, params.duration_months),
            (BuyoutCurve::Linear, None) => Decimal::ZERO,
        };

        lines.push(BuyoutLine {
            month,
            full_tariff: tariff.full_tariff_at(month),
            discounted_tariff: tariff.discounted_tariff_at(month),
            installment,
            cumulative_paid,
            cashback: cashback_credit(params.cashback_fraction, cumulative_paid),
            buyout_value: value,
        });
    }

    lines
}

/// Build the buyout table wrapped in the standard output envelope.
pub fn build_buyout_table(
    input: &BuyoutTableInput,
) -> ProposalResult<ComputationOutput<BuyoutTableOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let params = &input.buyout;

    if params.duration_months > MAX_CONTRACT_MONTHS {
        return Err(ProposalError::InvalidInput {
            field: "duration_months".into(),
            reason: format!("Contract duration must not exceed {MAX_CONTRACT_MONTHS} months"),
        });
    }

    if params.duration_months < BUYOUT_FIRST_MONTH {
        warnings.push(format!(
            "Contract of {} months ends before the buyout window opens in month {BUYOUT_FIRST_MONTH}",
            params.duration_months
        ));
    }
    if input.installment.term_months != params.duration_months {
        warnings.push(format!(
            "Installment term ({} months) differs from buyout duration ({} months)",
            input.installment.term_months, params.duration_months
        ));
    }
    if params.cashback_fraction > Decimal::ONE {
        warnings.push("Cashback fraction above 100% clamped to 100%".into());
    }

    let lines = buyout_lines(input);
    let total_paid = lines
        .last()
        .map(|l| l.cumulative_paid)
        .unwrap_or(Decimal::ZERO);
    let linear_baseline = lines
        .iter()
        .find(|l| l.month == BUYOUT_FIRST_MONTH)
        .map(|l| buyout_value(params, l.month, l.cumulative_paid));

    let output = BuyoutTableOutput {
        curve: input.curve,
        lines,
        total_paid,
        linear_baseline,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Leasing buyout: depreciated replacement value + projected costs, grossed up, less cashback",
        &serde_json::json!({
            "duration_months": params.duration_months,
            "curve": input.curve,
            "gross_up_factor": gross_up_factor(params).to_string(),
            "first_buyout_month": BUYOUT_FIRST_MONTH,
        }),
        warnings,
        elapsed,
        output,
    ))
}
