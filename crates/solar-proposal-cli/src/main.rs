mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::leasing::{BuyoutArgs, BuyoutTableArgs, InstallmentArgs, NetworkBillArgs};
use commands::simulation::SimulateArgs;
use commands::tariff::{ProjectTariffsArgs, TariffArgs, TusdArgs};

/// Solar proposal engine: tariffs, installments, buyout and scenario KPIs
#[derive(Parser)]
#[command(
    name = "proposta",
    version,
    about = "Solar leasing and direct-sale proposal calculations",
    long_about = "A CLI for the financial engine behind solar leasing and direct-sale \
                  proposals, with decimal precision. Supports tariff escalation, TUSD Fio B, \
                  monthly installments, buyout tables and base/optimistic/pessimistic \
                  investment simulations."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Escalated and discounted tariff for a contract month
    Tariff(TariffArgs),
    /// TUSD Fio B charge on compensated energy
    Tusd(TusdArgs),
    /// Monthly installment breakdown, or a schedule with --months
    Installment(InstallmentArgs),
    /// Grid-side bill: minimum fee + CIP + TUSD Fio B
    NetworkBill(NetworkBillArgs),
    /// Buyout price for a single month
    Buyout(BuyoutArgs),
    /// Month-by-month buyout table for a leasing contract
    BuyoutTable(BuyoutTableArgs),
    /// Project annual tariffs from distributor history
    ProjectTariffs(ProjectTariffsArgs),
    /// Run the base/optimistic/pessimistic investment simulation
    Simulate(SimulateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Tariff(args) => commands::tariff::run_tariff(args),
        Commands::Tusd(args) => commands::tariff::run_tusd(args),
        Commands::Installment(args) => commands::leasing::run_installment(args),
        Commands::NetworkBill(args) => commands::leasing::run_network_bill(args),
        Commands::Buyout(args) => commands::leasing::run_buyout(args),
        Commands::BuyoutTable(args) => commands::leasing::run_buyout_table(args),
        Commands::ProjectTariffs(args) => commands::tariff::run_project_tariffs(args),
        Commands::Simulate(args) => commands::simulation::run_simulate(args),
        Commands::Version => {
            println!("proposta {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
