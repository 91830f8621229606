use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use solar_proposal_core::leasing::buyout::{self, BuyoutParameters, BuyoutTableInput};
use solar_proposal_core::leasing::installment::{self, InstallmentInput};

use crate::input;

/// Arguments for the monthly installment
#[derive(Args)]
pub struct InstallmentArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,

    /// Emit a schedule for months 1..=N instead of a single month
    #[arg(long)]
    pub months: Option<u32>,
}

/// Arguments for the grid-side bill
#[derive(Args)]
pub struct NetworkBillArgs {
    /// Minimum billable energy (availability cost), kWh
    #[arg(long)]
    pub minimum_kwh: Decimal,

    /// Escalated full tariff for the month, R$/kWh
    #[arg(long)]
    pub full_tariff: Decimal,

    /// Public lighting contribution (CIP)
    #[arg(long, default_value = "0")]
    pub cip: Decimal,

    /// TUSD Fio B charge for the month
    #[arg(long, default_value = "0")]
    pub tusd_fio_b: Decimal,
}

/// Arguments for a single-month buyout price
#[derive(Args)]
pub struct BuyoutArgs {
    /// Path to JSON file with the buyout parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Contract month
    #[arg(long)]
    pub month: u32,

    /// Installments paid up to and including this month
    #[arg(long, default_value = "0")]
    pub cumulative_paid: Decimal,
}

/// Arguments for the month-by-month buyout table
#[derive(Args)]
pub struct BuyoutTableArgs {
    /// Path to JSON input file (installment, buyout, curve)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
struct BuyoutQuote {
    month: u32,
    cumulative_paid: Decimal,
    depreciated_value: Decimal,
    remaining_costs: Decimal,
    cashback: Decimal,
    buyout_value: Decimal,
}

pub fn run_installment(args: InstallmentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inst_input: InstallmentInput = input::read_input(&args.input, "installment")?;
    match args.months {
        Some(months) => {
            if months > buyout::MAX_CONTRACT_MONTHS {
                return Err(format!(
                    "--months must not exceed {}",
                    buyout::MAX_CONTRACT_MONTHS
                )
                .into());
            }
            let schedule = installment::installment_schedule(&inst_input, months);
            Ok(serde_json::json!({ "lines": schedule }))
        }
        None => {
            let breakdown = installment::installment_breakdown(&inst_input);
            Ok(serde_json::to_value(breakdown)?)
        }
    }
}

pub fn run_network_bill(args: NetworkBillArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bill = installment::network_bill(
        args.minimum_kwh,
        args.full_tariff,
        args.cip,
        args.tusd_fio_b,
    );
    Ok(serde_json::to_value(bill)?)
}

pub fn run_buyout(args: BuyoutArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let params: BuyoutParameters = input::read_input(&args.input, "buyout")?;
    let quote = BuyoutQuote {
        month: args.month,
        cumulative_paid: args.cumulative_paid,
        depreciated_value: buyout::depreciated_value(&params, args.month),
        remaining_costs: buyout::remaining_operating_costs(&params, args.month),
        cashback: buyout::cashback_credit(params.cashback_fraction, args.cumulative_paid),
        buyout_value: buyout::buyout_value(&params, args.month, args.cumulative_paid),
    };
    Ok(serde_json::to_value(quote)?)
}

pub fn run_buyout_table(args: BuyoutTableArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table_input: BuyoutTableInput = input::read_input(&args.input, "buyout table")?;
    let result = buyout::build_buyout_table(&table_input)?;
    Ok(serde_json::to_value(result)?)
}
