use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use koperasi_core::loans::flat_rate::{self, LoanTerms};
use koperasi_core::loans::simulation::{self, LoanProduct, LoanSimulationInput};

use crate::input;

/// Arguments for a flat-rate installment schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal (e.g. 12000000)
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual flat rate in percent (e.g. 18 for 18% per year)
    #[arg(long, alias = "rate")]
    pub annual_rate_percent: Option<Decimal>,

    /// Tenor in months
    #[arg(long, alias = "tenor")]
    pub tenor_months: Option<u32>,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        LoanTerms::new(
            args.principal
                .ok_or("--principal is required (or provide --input)")?,
            args.annual_rate_percent
                .ok_or("--annual-rate-percent is required (or provide --input)")?,
            args.tenor_months
                .ok_or("--tenor-months is required (or provide --input)")?,
        )
    };

    debug!(?terms, "building flat schedule");
    let result = flat_rate::build_flat_schedule(&terms)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for a loan simulation against a product
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a full simulation input file (product, principal, tenor)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON/YAML loan product definition
    #[arg(long)]
    pub product: Option<String>,

    /// Requested loan amount
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Requested tenor in months
    #[arg(long, alias = "tenor")]
    pub tenor_months: Option<u32>,

    /// Due date of the first installment (YYYY-MM-DD)
    #[arg(long)]
    pub first_due_date: Option<NaiveDate>,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sim_input: LoanSimulationInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let path = args
            .product
            .ok_or("--product <file> is required (or provide --input)")?;
        let product: LoanProduct = input::file::read_input(&path)?;
        LoanSimulationInput {
            product,
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            tenor_months: args
                .tenor_months
                .ok_or("--tenor-months is required (or provide --input)")?,
            first_due_date: args.first_due_date,
        }
    };

    debug!(product = %sim_input.product.code, "simulating loan");
    let result = simulation::simulate_loan(&sim_input)?;
    Ok(serde_json::to_value(result)?)
}
