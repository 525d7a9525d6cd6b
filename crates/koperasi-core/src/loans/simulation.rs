//! Loan simulation against a cooperative loan product.
//!
//! A product fixes the flat rate, the amount and tenor limits and the
//! up-front fees. The simulation checks the requested nominal and tenor
//! against those limits, builds the flat schedule and works out what the
//! member actually receives after fees.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::KoperasiError;
use crate::loans::flat_rate::{build_flat_schedule, InstallmentLine, LoanTerms};
use crate::money::{percent_to_rate, round_whole};
use crate::types::*;
use crate::KoperasiResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanProduct {
    pub code: String,
    pub name: String,
    pub annual_rate_percent: Percent,
    pub min_principal: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_principal: Option<Money>,
    pub max_tenor_months: u32,
    /// Charged once on the principal and deducted at disbursement.
    #[serde(default)]
    pub admin_fee_percent: Percent,
    #[serde(default)]
    pub provision_fee_percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSimulationInput {
    pub product: LoanProduct,
    pub principal: Money,
    pub tenor_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedInstallment {
    #[serde(flatten)]
    pub line: InstallmentLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSimulationOutput {
    pub product_code: String,
    pub product_name: String,
    pub terms: LoanTerms,
    pub admin_fee: Money,
    pub provision_fee: Money,
    pub total_fees: Money,
    pub net_disbursement: Money,
    pub installment_amount: Money,
    pub total_interest: Money,
    pub total_payment: Money,
    pub installments: Vec<SimulatedInstallment>,
}

pub fn simulate_loan(
    input: &LoanSimulationInput,
) -> KoperasiResult<ComputationOutput<LoanSimulationOutput>> {
    let start = Instant::now();

    validate_product(&input.product)?;
    validate_against_product(input)?;

    let terms = LoanTerms::new(
        input.principal,
        input.product.annual_rate_percent,
        input.tenor_months,
    );
    let schedule = build_flat_schedule(&terms)?;
    let mut warnings = schedule.warnings;
    let summary = schedule.result;

    let product = &input.product;
    let admin_fee = fee_on(input.principal, product.admin_fee_percent)?;
    let provision_fee = fee_on(input.principal, product.provision_fee_percent)?;
    let total_fees = admin_fee
        .checked_add(provision_fee)
        .ok_or_else(|| KoperasiError::terms("principal", "Principal too large to price fees"))?;
    let net_disbursement = input.principal - total_fees;

    if net_disbursement <= Decimal::ZERO {
        let field = if provision_fee > admin_fee {
            "product.provision_fee_percent"
        } else {
            "product.admin_fee_percent"
        };
        return Err(KoperasiError::terms(
            field,
            format!(
                "Fees of {total_fees} leave nothing to disburse from {}",
                input.principal
            ),
        ));
    }

    let installments = summary
        .lines
        .into_iter()
        .map(|line| -> KoperasiResult<SimulatedInstallment> {
            let due_date = match input.first_due_date {
                Some(first) => Some(due_date_for(first, line.period_index)?),
                None => None,
            };
            Ok(SimulatedInstallment { line, due_date })
        })
        .collect::<KoperasiResult<Vec<_>>>()?;

    if input.first_due_date.is_none() {
        warnings.push("No first due date given; installments carry no due dates".into());
    }

    debug!(
        product = %product.code,
        principal = %input.principal,
        net_disbursement = %net_disbursement,
        "loan simulated"
    );

    let output = LoanSimulationOutput {
        product_code: product.code.clone(),
        product_name: product.name.clone(),
        terms,
        admin_fee,
        provision_fee,
        total_fees,
        net_disbursement,
        installment_amount: summary.installment_amount,
        total_interest: summary.total_interest,
        total_payment: summary.total_payment,
        installments,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Flat-Rate Loan Simulation",
        &serde_json::json!({
            "product": product.code,
            "principal": input.principal.to_string(),
            "tenor_months": input.tenor_months,
            "annual_rate_percent": product.annual_rate_percent.to_string(),
            "fees": "deducted from principal at disbursement",
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate_product(product: &LoanProduct) -> KoperasiResult<()> {
    if product.annual_rate_percent < Decimal::ZERO {
        return Err(KoperasiError::terms(
            "product.annual_rate_percent",
            "Product rate cannot be negative",
        ));
    }
    if product.min_principal < Decimal::ZERO {
        return Err(KoperasiError::terms(
            "product.min_principal",
            "Minimum amount cannot be negative",
        ));
    }
    if let Some(max) = product.max_principal {
        if max < product.min_principal {
            return Err(KoperasiError::terms(
                "product.max_principal",
                "Maximum amount is below the minimum amount",
            ));
        }
    }
    if product.max_tenor_months == 0 {
        return Err(KoperasiError::terms(
            "product.max_tenor_months",
            "Product must allow at least 1 month",
        ));
    }
    if product.admin_fee_percent < Decimal::ZERO {
        return Err(KoperasiError::terms(
            "product.admin_fee_percent",
            "Fee percentage cannot be negative",
        ));
    }
    if product.provision_fee_percent < Decimal::ZERO {
        return Err(KoperasiError::terms(
            "product.provision_fee_percent",
            "Fee percentage cannot be negative",
        ));
    }
    Ok(())
}

fn validate_against_product(input: &LoanSimulationInput) -> KoperasiResult<()> {
    let product = &input.product;
    if input.principal < product.min_principal {
        return Err(KoperasiError::terms(
            "principal",
            format!(
                "Minimum amount for {} is {}",
                product.name, product.min_principal
            ),
        ));
    }
    if let Some(max) = product.max_principal {
        if input.principal > max {
            return Err(KoperasiError::terms(
                "principal",
                format!("Maximum amount for {} is {max}", product.name),
            ));
        }
    }
    if input.tenor_months > product.max_tenor_months {
        return Err(KoperasiError::terms(
            "tenor_months",
            format!(
                "Maximum tenor for {} is {} months",
                product.name, product.max_tenor_months
            ),
        ));
    }
    Ok(())
}

/// One-off fee on the principal, rounded to a whole unit.
fn fee_on(principal: Money, fee_percent: Percent) -> KoperasiResult<Money> {
    principal
        .checked_mul(percent_to_rate(fee_percent))
        .map(round_whole)
        .ok_or_else(|| KoperasiError::terms("principal", "Principal too large to price fees"))
}

/// Period 1 falls on `first`; each later period one calendar month on.
fn due_date_for(first: NaiveDate, period_index: u32) -> KoperasiResult<NaiveDate> {
    first
        .checked_add_months(Months::new(period_index - 1))
        .ok_or_else(|| KoperasiError::terms("first_due_date", "Due date out of range"))
}
