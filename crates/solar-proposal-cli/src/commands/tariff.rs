use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use solar_proposal_core::tariff::escalation::{
    self, DEFAULT_ANNIVERSARY_MONTH, DEFAULT_REFERENCE_MONTH,
};
use solar_proposal_core::tariff::projection::{self, TariffProjectionInput};
use solar_proposal_core::tariff::tusd;

use crate::input;

/// Arguments for the escalated tariff of one contract month
#[derive(Args)]
pub struct TariffArgs {
    /// Full (undiscounted) tariff, R$/kWh
    #[arg(long)]
    pub full_tariff: Decimal,

    /// Contractual discount (e.g. 0.15 for 15%)
    #[arg(long, default_value = "0")]
    pub discount: Decimal,

    /// Annual tariff adjustment rate (e.g. 0.08 for 8%)
    #[arg(long)]
    pub inflation: Decimal,

    /// Contract month, 1-based
    #[arg(long)]
    pub month: u32,

    /// Distributor anniversary month (1-12)
    #[arg(long, default_value_t = DEFAULT_ANNIVERSARY_MONTH)]
    pub anniversary_month: u32,

    /// Contract activation month (1-12)
    #[arg(long, default_value_t = DEFAULT_REFERENCE_MONTH)]
    pub reference_month: u32,
}

/// Arguments for the TUSD Fio B charge
#[derive(Args)]
pub struct TusdArgs {
    /// Energy generated in the month, kWh
    #[arg(long)]
    pub generated_kwh: Decimal,

    /// Self-consumption simultaneity fraction (default 0.6)
    #[arg(long)]
    pub simultaneity: Option<Decimal>,

    /// Legacy Fio B share of the TUSD rate
    #[arg(long, default_value = "0")]
    pub fio_b_percent: Decimal,

    /// Legacy TUSD rate, R$/kWh
    #[arg(long, default_value = "0")]
    pub tariff_rkwh: Decimal,

    /// Official Fio B rate, R$/kWh (preferred when positive)
    #[arg(long)]
    pub official_rate: Option<Decimal>,

    /// Lei 14.300 incidence factor (default 1)
    #[arg(long)]
    pub incidence: Option<Decimal>,
}

/// Arguments for tariff projection from history
#[derive(Args)]
pub struct ProjectTariffsArgs {
    /// Path to JSON input file (history, initial_tariff, horizon_years)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
struct TariffOutput {
    month: u32,
    escalation_steps: u32,
    months_to_first_adjustment: u32,
    full_tariff: Decimal,
    discounted_tariff: Decimal,
}

#[derive(Debug, Serialize)]
struct TusdOutput {
    compensated_kwh: Decimal,
    applied_rate: Decimal,
    charge: Decimal,
}

pub fn run_tariff(args: TariffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let out = TariffOutput {
        month: args.month,
        escalation_steps: escalation::escalation_steps(
            args.month,
            args.anniversary_month,
            args.reference_month,
        ),
        months_to_first_adjustment: escalation::months_to_first_adjustment(
            args.anniversary_month,
            args.reference_month,
        ),
        full_tariff: escalation::projected_full_tariff(
            args.full_tariff,
            args.inflation,
            args.month,
            args.anniversary_month,
            args.reference_month,
        ),
        discounted_tariff: escalation::discounted_tariff(
            args.full_tariff,
            args.discount,
            args.inflation,
            args.month,
            args.anniversary_month,
            args.reference_month,
        ),
    };
    Ok(serde_json::to_value(out)?)
}

pub fn run_tusd(args: TusdArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let out = TusdOutput {
        compensated_kwh: tusd::compensated_energy(args.generated_kwh, args.simultaneity),
        applied_rate: tusd::applied_fio_b_rate(
            args.fio_b_percent,
            args.tariff_rkwh,
            args.official_rate,
        ),
        charge: tusd::tusd_fio_b_charge(
            args.generated_kwh,
            args.simultaneity,
            args.fio_b_percent,
            args.tariff_rkwh,
            args.official_rate,
            args.incidence,
        ),
    };
    Ok(serde_json::to_value(out)?)
}

pub fn run_project_tariffs(args: ProjectTariffsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let proj_input: TariffProjectionInput = input::read_input(&args.input, "tariff projection")?;
    let result = projection::tariff_projection_report(&proj_input)?;
    Ok(serde_json::to_value(result)?)
}
