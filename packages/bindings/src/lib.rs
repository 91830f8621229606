use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use solar_proposal_core::leasing::{buyout, installment};
use solar_proposal_core::simulation::scenario;
use solar_proposal_core::tariff::projection;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn to_json(value: &impl Serialize) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Leasing
// ---------------------------------------------------------------------------

/// Net installment for `input.month`, returned as a decimal string.
#[napi]
pub fn monthly_installment(input_json: String) -> NapiResult<String> {
    let input: installment::InstallmentInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    Ok(installment::monthly_installment(&input).to_string())
}

#[napi]
pub fn installment_schedule(input_json: String, months: u32) -> NapiResult<String> {
    if months > buyout::MAX_CONTRACT_MONTHS {
        return Err(to_napi_error(format!(
            "months must not exceed {}",
            buyout::MAX_CONTRACT_MONTHS
        )));
    }
    let input: installment::InstallmentInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    to_json(&installment::installment_schedule(&input, months))
}

#[napi]
pub fn build_buyout_table(input_json: String) -> NapiResult<String> {
    let input: buyout::BuyoutTableInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = buyout::build_buyout_table(&input).map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Tariff projection and simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn project_tariffs(input_json: String) -> NapiResult<String> {
    let input: projection::TariffProjectionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = projection::tariff_projection_report(&input).map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn run_scenario_simulation(input_json: String) -> NapiResult<String> {
    let input: scenario::SimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenario::run_scenario_simulation(&input).map_err(to_napi_error)?;
    to_json(&output)
}
