use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ProposalError;
use crate::simulation::kpi::{
    advanced_kpis, essential_kpis, lcoe, roi_pct, AdvancedKpis, EssentialKpis,
};
use crate::tariff::projection::{
    project_tariffs, usable_history, ProjectionMethod, ProjectionSettings, TariffPoint,
    TariffProjection, MAX_HORIZON_YEARS,
};
use crate::types::{clamp_fraction, non_negative, with_metadata, ComputationOutput, Kwh, Money, Rate};
use crate::ProposalResult;

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Scenario configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioKind {
    Base,
    Optimistic,
    Pessimistic,
}

/// Multipliers applied to the base-case drivers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMultipliers {
    pub tariff: Decimal,
    pub energy: Decimal,
    pub opex: Decimal,
}

impl ScenarioMultipliers {
    pub const BASE: ScenarioMultipliers = ScenarioMultipliers {
        tariff: Decimal::ONE,
        energy: Decimal::ONE,
        opex: Decimal::ONE,
    };
    pub const OPTIMISTIC: ScenarioMultipliers = ScenarioMultipliers {
        tariff: dec!(1.10),
        energy: dec!(1.05),
        opex: dec!(0.95),
    };
    pub const PESSIMISTIC: ScenarioMultipliers = ScenarioMultipliers {
        tariff: dec!(0.95),
        energy: dec!(0.95),
        opex: dec!(1.05),
    };
}

/// Engine tunables. Every field has a default so callers only override what
/// they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationAssumptions {
    pub projection: ProjectionSettings,
    pub irr_guess: Rate,
    pub optimistic: ScenarioMultipliers,
    pub pessimistic: ScenarioMultipliers,
}

impl Default for SimulationAssumptions {
    fn default() -> Self {
        Self {
            projection: ProjectionSettings::default(),
            irr_guess: dec!(0.10),
            optimistic: ScenarioMultipliers::OPTIMISTIC,
            pessimistic: ScenarioMultipliers::PESSIMISTIC,
        }
    }
}

impl SimulationAssumptions {
    pub fn multipliers(&self, kind: ScenarioKind) -> ScenarioMultipliers {
        match kind {
            ScenarioKind::Base => ScenarioMultipliers::BASE,
            ScenarioKind::Optimistic => self.optimistic,
            ScenarioKind::Pessimistic => self.pessimistic,
        }
    }
}

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub capex: Money,
    pub monthly_opex: Money,
    pub monthly_consumption_kwh: Kwh,
    pub monthly_energy_sold_kwh: Kwh,
    /// Starting tariff, R$/kWh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_tariff: Option<Money>,
    #[serde(default)]
    pub tariff_history: Vec<TariffPoint>,
    pub horizon_years: u32,
    /// Share of gross revenue absorbed by TUSD charges
    #[serde(default)]
    pub tusd_absorbed_fraction: Rate,
    pub discount_rate: Rate,
    #[serde(default)]
    pub assumptions: SimulationAssumptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationYearRecord {
    pub year: u32,
    pub gross_revenue: Money,
    pub opex: Money,
    pub tusd_absorbed: Money,
    pub net_profit: Money,
    pub projected_tariff: Money,
    pub lcoe_to_date: Money,
    pub energy_generated_kwh: Kwh,
    pub cumulative_roi_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub kind: ScenarioKind,
    pub multipliers: ScenarioMultipliers,
    pub years: Vec<SimulationYearRecord>,
    pub essentials: EssentialKpis,
    pub advanced: AdvancedKpis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub tariff_projection: TariffProjection,
    pub base: ScenarioResult,
    pub optimistic: ScenarioResult,
    pub pessimistic: ScenarioResult,
}

/// Drivers after coercion, shared by all three scenarios.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioDrivers {
    pub capex: Money,
    pub monthly_opex: Money,
    pub monthly_energy_kwh: Kwh,
    pub tusd_absorbed_fraction: Rate,
}

impl ScenarioDrivers {
    /// Coerce raw input; energy sold falls back to consumption when zero.
    pub fn from_input(input: &SimulationInput) -> Self {
        let sold = non_negative(input.monthly_energy_sold_kwh);
        let monthly_energy_kwh = if sold > Decimal::ZERO {
            sold
        } else {
            non_negative(input.monthly_consumption_kwh)
        };
        Self {
            capex: non_negative(input.capex),
            monthly_opex: non_negative(input.monthly_opex),
            monthly_energy_kwh,
            tusd_absorbed_fraction: clamp_fraction(input.tusd_absorbed_fraction),
        }
    }
}

fn mul_or_zero(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// One record per projected tariff year under the given multipliers.
pub fn build_year_records(
    drivers: &ScenarioDrivers,
    tariffs: &[Money],
    multipliers: &ScenarioMultipliers,
) -> Vec<SimulationYearRecord> {
    let annual_energy = mul_or_zero(
        mul_or_zero(drivers.monthly_energy_kwh, multipliers.energy),
        MONTHS_PER_YEAR,
    );
    let annual_opex = mul_or_zero(
        mul_or_zero(drivers.monthly_opex, multipliers.opex),
        MONTHS_PER_YEAR,
    );

    let mut cumulative_profit = Decimal::ZERO;
    let mut cumulative_opex = Decimal::ZERO;
    let mut cumulative_energy = Decimal::ZERO;
    let mut records = Vec::with_capacity(tariffs.len());

    for (i, tariff) in tariffs.iter().enumerate() {
        let projected_tariff = mul_or_zero(*tariff, multipliers.tariff);
        let gross_revenue = mul_or_zero(annual_energy, projected_tariff);
        let tusd_absorbed = mul_or_zero(gross_revenue, drivers.tusd_absorbed_fraction);
        let net_profit = gross_revenue
            .checked_sub(tusd_absorbed)
            .and_then(|v| v.checked_sub(annual_opex))
            .unwrap_or(Decimal::ZERO);

        cumulative_profit = cumulative_profit.saturating_add(net_profit);
        cumulative_opex = cumulative_opex.saturating_add(annual_opex);
        cumulative_energy = cumulative_energy.saturating_add(annual_energy);

        let lcoe_to_date = lcoe(drivers.capex, cumulative_opex, cumulative_energy);
        let cumulative_roi_pct = roi_pct(cumulative_profit, drivers.capex);

        records.push(SimulationYearRecord {
            year: i as u32 + 1,
            gross_revenue,
            opex: annual_opex,
            tusd_absorbed,
            net_profit,
            projected_tariff,
            lcoe_to_date,
            energy_generated_kwh: annual_energy,
            cumulative_roi_pct,
        });
    }

    records
}

/// Year series plus both KPI groups for one scenario.
pub fn run_scenario(
    kind: ScenarioKind,
    drivers: &ScenarioDrivers,
    tariffs: &[Money],
    discount_rate: Rate,
    assumptions: &SimulationAssumptions,
) -> ScenarioResult {
    let multipliers = assumptions.multipliers(kind);
    let years = build_year_records(drivers, tariffs, &multipliers);
    let essentials = essential_kpis(
        drivers.capex,
        mul_or_zero(drivers.monthly_opex, multipliers.opex),
        &years,
    );
    let advanced = advanced_kpis(drivers.capex, &years, discount_rate, assumptions.irr_guess);

    ScenarioResult {
        kind,
        multipliers,
        years,
        essentials,
        advanced,
    }
}

/// Project tariffs and evaluate the base, optimistic and pessimistic
/// scenarios.
pub fn run_scenario_simulation(
    input: &SimulationInput,
) -> ProposalResult<ComputationOutput<SimulationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.horizon_years > MAX_HORIZON_YEARS {
        return Err(ProposalError::InvalidInput {
            field: "horizon_years".into(),
            reason: format!("Analysis horizon must not exceed {MAX_HORIZON_YEARS} years"),
        });
    }

    if input.capex < Decimal::ZERO {
        warnings.push("Negative CAPEX treated as zero".into());
    }
    if input.tusd_absorbed_fraction < Decimal::ZERO || input.tusd_absorbed_fraction > Decimal::ONE {
        warnings.push(format!(
            "TUSD absorbed fraction {} clamped to [0, 1]",
            input.tusd_absorbed_fraction
        ));
    }
    if input.monthly_energy_sold_kwh <= Decimal::ZERO {
        warnings.push("No energy sold; monthly consumption used as generation basis".into());
    }
    let discount_rate = if input.discount_rate <= dec!(-1) {
        warnings.push(format!(
            "Discount rate {} is not above -100%; NPV computed at 0%",
            input.discount_rate
        ));
        Decimal::ZERO
    } else {
        input.discount_rate
    };

    let (_, dropped) = usable_history(&input.tariff_history);
    if dropped > 0 {
        warnings.push(format!(
            "{dropped} tariff history points with an invalid year/month were ignored"
        ));
    }

    let projection = project_tariffs(
        &input.tariff_history,
        input.initial_tariff,
        input.horizon_years,
        &input.assumptions.projection,
    );
    if projection.method == ProjectionMethod::FallbackGrowth && !input.tariff_history.is_empty() {
        warnings.push(format!(
            "Only {} usable tariff history points; projected with {} annual growth",
            projection.points_used, input.assumptions.projection.fallback_growth
        ));
    }

    let drivers = ScenarioDrivers::from_input(input);
    let run = |kind| {
        run_scenario(
            kind,
            &drivers,
            &projection.tariffs,
            discount_rate,
            &input.assumptions,
        )
    };
    let base = run(ScenarioKind::Base);
    let optimistic = run(ScenarioKind::Optimistic);
    let pessimistic = run(ScenarioKind::Pessimistic);

    if base.advanced.irr.is_none() && drivers.capex > Decimal::ZERO {
        warnings.push("Base-case IRR could not be computed".into());
    }

    let output = SimulationOutput {
        tariff_projection: projection,
        base,
        optimistic,
        pessimistic,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Base/Optimistic/Pessimistic solar investment simulation",
        &serde_json::json!({
            "horizon_years": input.horizon_years,
            "discount_rate": discount_rate.to_string(),
            "tusd_absorbed_fraction": drivers.tusd_absorbed_fraction.to_string(),
            "assumptions": input.assumptions,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> SimulationInput {
        SimulationInput {
            capex: dec!(60000),
            monthly_opex: dec!(250),
            monthly_consumption_kwh: dec!(1800),
            monthly_energy_sold_kwh: dec!(2000),
            initial_tariff: Some(dec!(0.90)),
            tariff_history: vec![],
            horizon_years: 10,
            tusd_absorbed_fraction: dec!(0.10),
            discount_rate: dec!(0.08),
            assumptions: SimulationAssumptions::default(),
        }
    }

    #[test]
    fn test_year_one_record() {
        let input = sample_input();
        let drivers = ScenarioDrivers::from_input(&input);
        let records = build_year_records(&drivers, &[dec!(0.90)], &ScenarioMultipliers::BASE);
        let r = &records[0];
        // 2000 * 12 * 0.90 = 21600
        assert_eq!(r.gross_revenue, dec!(21600));
        assert_eq!(r.tusd_absorbed, dec!(2160));
        assert_eq!(r.opex, dec!(3000));
        assert_eq!(r.net_profit, dec!(16440));
        assert_eq!(r.energy_generated_kwh, dec!(24000));
        // (60000 + 3000) / 24000
        assert_eq!(r.lcoe_to_date, dec!(2.625));
        assert_eq!(r.cumulative_roi_pct, dec!(27.4));
    }

    #[test]
    fn test_optimistic_multipliers_applied() {
        let drivers = ScenarioDrivers::from_input(&sample_input());
        let r = &build_year_records(&drivers, &[dec!(1)], &ScenarioMultipliers::OPTIMISTIC)[0];
        assert_eq!(r.projected_tariff, dec!(1.10));
        assert_eq!(r.energy_generated_kwh, dec!(25200));
        assert_eq!(r.opex, dec!(2850));
    }

    #[test]
    fn test_consumption_used_when_nothing_sold() {
        let mut input = sample_input();
        input.monthly_energy_sold_kwh = Decimal::ZERO;
        let drivers = ScenarioDrivers::from_input(&input);
        assert_eq!(drivers.monthly_energy_kwh, dec!(1800));
    }

    #[test]
    fn test_simulation_three_scenarios_ordered() {
        let out = run_scenario_simulation(&sample_input()).unwrap();
        let r = &out.result;
        assert_eq!(r.base.years.len(), 10);
        assert!(r.optimistic.essentials.total_net_profit > r.base.essentials.total_net_profit);
        assert!(r.pessimistic.essentials.total_net_profit < r.base.essentials.total_net_profit);
        assert_eq!(r.tariff_projection.method, ProjectionMethod::FallbackGrowth);
    }

    #[test]
    fn test_essentials_consistent_with_records() {
        let out = run_scenario_simulation(&sample_input()).unwrap();
        let base = &out.result.base;
        let total: Decimal = base.years.iter().map(|y| y.net_profit).sum();
        assert_eq!(base.essentials.total_net_profit, total);
        assert_eq!(base.essentials.annual_net_profit, base.years[0].net_profit);
        assert_eq!(base.essentials.annual_opex, dec!(3000));
        assert_eq!(
            base.years.last().unwrap().cumulative_roi_pct,
            base.essentials.roi_pct
        );
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        let mut input = sample_input();
        input.horizon_years = 0;
        let out = run_scenario_simulation(&input).unwrap();
        assert!(out.result.base.years.is_empty());
        assert_eq!(out.result.base.essentials.payback_months, None);
        assert_eq!(out.result.base.advanced.irr, None);
        assert_eq!(out.result.base.advanced.npv, dec!(-60000));
    }

    #[test]
    fn test_bad_discount_rate_coerced() {
        let mut input = sample_input();
        input.discount_rate = dec!(-2);
        let out = run_scenario_simulation(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Discount rate")));
    }

    #[test]
    fn test_horizon_guard() {
        let mut input = sample_input();
        input.horizon_years = MAX_HORIZON_YEARS + 1;
        assert!(run_scenario_simulation(&input).is_err());
    }

    #[test]
    fn test_assumptions_deserialize_with_defaults() {
        let a: SimulationAssumptions = serde_json::from_str(r#"{"irr_guess": "0.2"}"#).unwrap();
        assert_eq!(a.irr_guess, dec!(0.2));
        assert_eq!(a.optimistic, ScenarioMultipliers::OPTIMISTIC);
        assert_eq!(a.projection, ProjectionSettings::default());
    }
}
