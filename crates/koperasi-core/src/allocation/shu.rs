//! SHU (Sisa Hasil Usaha) distribution.
//!
//! The year's surplus is first cut by percentage into components. Retained
//! components (reserve, education, management, social fund) stay with the
//! cooperative; member components are spread across members in proportion
//! to savings balance (jasa modal) or transactions / loan interest paid
//! (jasa usaha) through [`allocate`]. Every rounding gap is reported at the
//! level where it arises.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

use crate::allocation::proportional::{allocate, AllocationPool, MemberBasis};
use crate::error::KoperasiError;
use crate::money::{proportion_of, round_whole, sum_money};
use crate::types::*;
use crate::KoperasiResult;

const HUNDRED: Decimal = dec!(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShuBasis {
    /// Jasa modal: weighted by savings balance.
    Savings,
    /// Jasa usaha: weighted by transaction volume or loan interest paid.
    Transactions,
    /// Not distributed to members.
    Retained,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuComponent {
    pub name: String,
    pub percent: Percent,
    pub basis: ShuBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuMember {
    pub member_id: String,
    #[serde(default)]
    pub savings_balance: Money,
    #[serde(default)]
    pub transaction_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuInput {
    pub total_shu: Money,
    pub components: Vec<ShuComponent>,
    pub members: Vec<ShuMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuComponentResult {
    pub name: String,
    pub basis: ShuBasis,
    pub percent: Percent,
    pub amount: Money,
    pub allocated_to_members: Money,
    pub rounding_residual: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuMemberShare {
    pub member_id: String,
    pub savings_share: Money,
    pub transaction_share: Money,
    pub total_share: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuOutput {
    pub total_shu: Money,
    /// `total_shu` minus the sum of rounded component amounts.
    pub split_residual: Money,
    pub components: Vec<ShuComponentResult>,
    pub members: Vec<ShuMemberShare>,
    pub total_to_members: Money,
    pub total_retained: Money,
    /// Sum of per-component allocation residuals.
    pub total_rounding_residual: Money,
}

pub fn distribute_shu(input: &ShuInput) -> KoperasiResult<ComputationOutput<ShuOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_shu_input(input)?;

    let mut members: Vec<ShuMemberShare> = input
        .members
        .iter()
        .map(|m| ShuMemberShare {
            member_id: m.member_id.clone(),
            savings_share: Decimal::ZERO,
            transaction_share: Decimal::ZERO,
            total_share: Decimal::ZERO,
        })
        .collect();

    let mut components = Vec::with_capacity(input.components.len());
    let mut total_retained = Decimal::ZERO;
    let mut total_rounding_residual = Decimal::ZERO;
    let mut split_total = Decimal::ZERO;

    for component in &input.components {
        let amount = proportion_of(input.total_shu, component.percent, HUNDRED)
            .map(round_whole)
            .ok_or_else(|| KoperasiError::pool("total_shu", "SHU too large to split"))?;
        add_to(&mut split_total, amount)?;

        let (allocated, residual) = match component.basis {
            ShuBasis::Retained => {
                add_to(&mut total_retained, amount)?;
                (Decimal::ZERO, Decimal::ZERO)
            }
            basis => {
                let pool = AllocationPool {
                    total_fund: amount,
                    members: input
                        .members
                        .iter()
                        .map(|m| MemberBasis::new(m.member_id.clone(), basis_amount(m, basis)))
                        .collect(),
                };
                let outcome = allocate(&pool)?;
                for (share, result) in members.iter_mut().zip(&outcome.results) {
                    match basis {
                        ShuBasis::Savings => add_to(&mut share.savings_share, result.share)?,
                        _ => add_to(&mut share.transaction_share, result.share)?,
                    }
                }
                if outcome.basis_total.is_zero() && !amount.is_zero() {
                    warnings.push(format!(
                        "Component '{}' has no member basis; {} left unallocated",
                        component.name, amount
                    ));
                }
                (outcome.total_allocated, outcome.rounding_residual)
            }
        };
        add_to(&mut total_rounding_residual, residual)?;

        components.push(ShuComponentResult {
            name: component.name.clone(),
            basis: component.basis,
            percent: component.percent,
            amount,
            allocated_to_members: allocated,
            rounding_residual: residual,
        });
    }

    for share in &mut members {
        share.total_share = share.savings_share;
        add_to(&mut share.total_share, share.transaction_share)?;
    }
    let total_to_members = sum_money(members.iter().map(|m| &m.total_share))
        .ok_or_else(|| KoperasiError::pool("total_shu", "SHU too large to distribute"))?;
    let split_residual = input.total_shu - split_total;

    if !split_residual.is_zero() {
        warnings.push(format!(
            "Component split leaves a rounding residual of {split_residual}"
        ));
    }
    if !total_rounding_residual.is_zero() {
        warnings.push(format!(
            "Member shares leave a rounding residual of {total_rounding_residual}"
        ));
    }

    debug!(
        total_shu = %input.total_shu,
        total_to_members = %total_to_members,
        total_retained = %total_retained,
        split_residual = %split_residual,
        total_rounding_residual = %total_rounding_residual,
        "SHU distributed"
    );

    let output = ShuOutput {
        total_shu: input.total_shu,
        split_residual,
        components,
        members,
        total_to_members,
        total_retained,
        total_rounding_residual,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "SHU Distribution (percentage split, proportional member shares)",
        &serde_json::json!({
            "total_shu": input.total_shu.to_string(),
            "components": input.components.len(),
            "members": input.members.len(),
            "residual_policy": "reported, not redistributed",
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn add_to(total: &mut Money, amount: Money) -> KoperasiResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| KoperasiError::pool("total_shu", "SHU too large to distribute"))?;
    Ok(())
}

fn basis_amount(member: &ShuMember, basis: ShuBasis) -> Money {
    match basis {
        ShuBasis::Savings => member.savings_balance,
        ShuBasis::Transactions => member.transaction_amount,
        ShuBasis::Retained => Decimal::ZERO,
    }
}

fn validate_shu_input(input: &ShuInput) -> KoperasiResult<()> {
    if input.total_shu < Decimal::ZERO {
        return Err(KoperasiError::pool(
            "total_shu",
            "SHU to distribute cannot be negative",
        ));
    }
    if input.components.is_empty() {
        return Err(KoperasiError::pool(
            "components",
            "At least one SHU component is required",
        ));
    }

    let mut names = HashSet::with_capacity(input.components.len());
    for (i, component) in input.components.iter().enumerate() {
        if component.name.trim().is_empty() {
            return Err(KoperasiError::pool(
                format!("components[{i}].name"),
                "Component name cannot be blank",
            ));
        }
        if !names.insert(component.name.as_str()) {
            return Err(KoperasiError::pool(
                format!("components[{i}].name"),
                format!("Duplicate component '{}'", component.name),
            ));
        }
        if component.percent < Decimal::ZERO {
            return Err(KoperasiError::pool(
                format!("components[{i}].percent"),
                "Component percentage cannot be negative",
            ));
        }
    }

    let percent_total = sum_money(input.components.iter().map(|c| &c.percent)).ok_or_else(|| {
        KoperasiError::pool("components", "Component percentages too large to total")
    })?;
    if percent_total != HUNDRED {
        return Err(KoperasiError::pool(
            "components",
            format!("Component percentages must total 100, got {percent_total}"),
        ));
    }

    let mut ids = HashSet::with_capacity(input.members.len());
    for (i, member) in input.members.iter().enumerate() {
        if member.member_id.trim().is_empty() {
            return Err(KoperasiError::pool(
                format!("members[{i}].member_id"),
                "Member id cannot be blank",
            ));
        }
        if !ids.insert(member.member_id.as_str()) {
            return Err(KoperasiError::pool(
                format!("members[{i}].member_id"),
                format!("Duplicate member id '{}'", member.member_id),
            ));
        }
        if member.savings_balance < Decimal::ZERO {
            return Err(KoperasiError::pool(
                format!("members[{i}].savings_balance"),
                "Savings balance cannot be negative",
            ));
        }
        if member.transaction_amount < Decimal::ZERO {
            return Err(KoperasiError::pool(
                format!("members[{i}].transaction_amount"),
                "Transaction amount cannot be negative",
            ));
        }
    }
    Ok(())
}
