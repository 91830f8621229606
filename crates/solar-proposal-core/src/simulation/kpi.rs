//! Investment KPIs derived from a scenario's year-by-year records.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::simulation::scenario::SimulationYearRecord;
use crate::time_value::{irr, npv};
use crate::types::{non_negative, Money, Rate};

const MONTHS_PER_YEAR: u32 = 12;

/// Headline KPIs shown on the proposal cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssentialKpis {
    pub total_capex: Money,
    pub monthly_opex: Money,
    pub annual_opex: Money,
    pub monthly_net_profit: Money,
    pub annual_net_profit: Money,
    pub total_net_profit: Money,
    pub roi_pct: Decimal,
    /// `None` when cumulative profit never recovers CAPEX in the horizon
    pub payback_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedKpis {
    pub npv: Money,
    /// `None` when the root-finder cannot produce a rate
    pub irr: Option<Rate>,
    /// R$/kWh
    pub lcoe: Money,
}

/// Months until cumulative profit reaches `capex`, spreading each year's
/// profit evenly over its 12 months.
pub fn payback_months(capex: Money, annual_profits: &[Money]) -> Option<u32> {
    if capex <= Decimal::ZERO {
        return Some(0);
    }

    let months = Decimal::from(MONTHS_PER_YEAR);
    let mut cumulative = Decimal::ZERO;
    let mut elapsed = 0u32;
    for profit in annual_profits {
        let monthly = *profit / months;
        for _ in 0..MONTHS_PER_YEAR {
            cumulative = cumulative.saturating_add(monthly);
            elapsed += 1;
            if cumulative >= capex {
                return Some(elapsed);
            }
        }
    }
    None
}

/// `total_profit / capex * 100`, 0 without investment.
pub fn roi_pct(total_profit: Money, capex: Money) -> Decimal {
    if capex <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    total_profit
        .checked_div(capex)
        .and_then(|r| r.checked_mul(dec!(100)))
        .unwrap_or(Decimal::ZERO)
}

/// `(capex + total_opex) / total_energy`, 0 without energy.
pub fn lcoe(capex: Money, total_opex: Money, total_energy_kwh: Decimal) -> Money {
    if total_energy_kwh <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    capex
        .checked_add(total_opex)
        .and_then(|cost| cost.checked_div(total_energy_kwh))
        .unwrap_or(Decimal::ZERO)
}

/// `[-capex, profit_1, profit_2, ...]`
pub fn cash_flow_series(capex: Money, annual_profits: &[Money]) -> Vec<Money> {
    std::iter::once(-capex)
        .chain(annual_profits.iter().copied())
        .collect()
}

/// NPV of the scenario cash flows; 0 when the rate cannot discount.
pub fn scenario_npv(capex: Money, annual_profits: &[Money], discount_rate: Rate) -> Money {
    match npv(discount_rate, &cash_flow_series(capex, annual_profits)) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("scenario NPV unavailable: {e}");
            Decimal::ZERO
        }
    }
}

/// IRR of the scenario cash flows.
pub fn scenario_irr(capex: Money, annual_profits: &[Money], guess: Rate) -> Option<Rate> {
    match irr(&cash_flow_series(capex, annual_profits), guess) {
        Ok(rate) if rate > dec!(-1) => Some(rate),
        Ok(_) => None,
        Err(e) => {
            log::debug!("scenario IRR not computable: {e}");
            None
        }
    }
}

pub fn essential_kpis(
    capex: Money,
    monthly_opex: Money,
    records: &[SimulationYearRecord],
) -> EssentialKpis {
    let profits: Vec<Money> = records.iter().map(|r| r.net_profit).collect();
    let annual_net_profit = profits.first().copied().unwrap_or(Decimal::ZERO);
    let total_net_profit = profits
        .iter()
        .fold(Decimal::ZERO, |acc, p| acc.saturating_add(*p));
    let monthly_opex = non_negative(monthly_opex);

    EssentialKpis {
        total_capex: capex,
        monthly_opex,
        annual_opex: monthly_opex
            .checked_mul(Decimal::from(MONTHS_PER_YEAR))
            .unwrap_or(Decimal::ZERO),
        monthly_net_profit: annual_net_profit / Decimal::from(MONTHS_PER_YEAR),
        annual_net_profit,
        total_net_profit,
        roi_pct: roi_pct(total_net_profit, capex),
        payback_months: payback_months(capex, &profits),
    }
}

pub fn advanced_kpis(
    capex: Money,
    records: &[SimulationYearRecord],
    discount_rate: Rate,
    irr_guess: Rate,
) -> AdvancedKpis {
    let profits: Vec<Money> = records.iter().map(|r| r.net_profit).collect();
    let total_opex = records
        .iter()
        .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.opex));
    let total_energy = records
        .iter()
        .fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.energy_generated_kwh));

    AdvancedKpis {
        npv: scenario_npv(capex, &profits, discount_rate),
        irr: scenario_irr(capex, &profits, irr_guess),
        lcoe: lcoe(capex, total_opex, total_energy),
    }
}
