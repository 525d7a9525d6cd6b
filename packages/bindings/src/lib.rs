use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Loans
// ---------------------------------------------------------------------------

#[napi]
pub fn flat_schedule(input_json: String) -> NapiResult<String> {
    let input: koperasi_core::loans::flat_rate::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        koperasi_core::loans::flat_rate::build_flat_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_loan(input_json: String) -> NapiResult<String> {
    let input: koperasi_core::loans::simulation::LoanSimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        koperasi_core::loans::simulation::simulate_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[napi]
pub fn allocate_pool(input_json: String) -> NapiResult<String> {
    let input: koperasi_core::allocation::proportional::AllocationPool =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = koperasi_core::allocation::proportional::build_allocation(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn distribute_shu(input_json: String) -> NapiResult<String> {
    let input: koperasi_core::allocation::shu::ShuInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        koperasi_core::allocation::shu::distribute_shu(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
