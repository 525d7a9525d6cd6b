use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::KoperasiError;
use crate::money::{proportion_of, round_whole, sum_money};
use crate::types::*;
use crate::KoperasiResult;

/// A member and the amount their share is weighted by
/// (savings balance, loan interest paid, transaction volume, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBasis {
    pub member_id: String,
    pub basis_amount: Money,
}

impl MemberBasis {
    pub fn new(member_id: impl Into<String>, basis_amount: Money) -> Self {
        Self {
            member_id: member_id.into(),
            basis_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPool {
    pub total_fund: Money,
    pub members: Vec<MemberBasis>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub member_id: String,
    pub basis_amount: Money,
    pub share: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// One row per member, in input order.
    pub results: Vec<AllocationResult>,
    pub basis_total: Money,
    pub total_allocated: Money,
    /// `total_fund - total_allocated`. Belongs to the pool; never pushed
    /// back onto a member. May be negative when shares round up.
    pub rounding_residual: Money,
}

impl AllocationOutcome {
    pub fn share_of(&self, member_id: &str) -> Option<Money> {
        self.results
            .iter()
            .find(|r| r.member_id == member_id)
            .map(|r| r.share)
    }
}

/// Split `total_fund` across members in proportion to their basis.
///
/// Each share is rounded half-up to a whole unit on its own; the gap left
/// by rounding is reported as `rounding_residual` rather than forced onto
/// any member. A pool whose bases are all zero allocates nothing and the
/// whole fund becomes the residual.
pub fn allocate(pool: &AllocationPool) -> KoperasiResult<AllocationOutcome> {
    validate_pool(pool)?;

    let bases: Vec<Money> = pool.members.iter().map(|m| m.basis_amount).collect();
    let basis_total = sum_money(&bases)
        .ok_or_else(|| KoperasiError::pool("members", "Member bases too large to total"))?;

    let results = pool
        .members
        .iter()
        .map(|member| -> KoperasiResult<AllocationResult> {
            let share = if basis_total.is_zero() {
                Decimal::ZERO
            } else {
                proportion_of(pool.total_fund, member.basis_amount, basis_total)
                    .map(round_whole)
                    .ok_or_else(|| {
                        KoperasiError::pool("total_fund", "Fund too large to allocate")
                    })?
            };
            Ok(AllocationResult {
                member_id: member.member_id.clone(),
                basis_amount: member.basis_amount,
                share,
            })
        })
        .collect::<KoperasiResult<Vec<_>>>()?;

    let shares: Vec<Money> = results.iter().map(|r| r.share).collect();
    let total_allocated = sum_money(&shares)
        .ok_or_else(|| KoperasiError::pool("total_fund", "Fund too large to allocate"))?;
    let rounding_residual = pool.total_fund - total_allocated;

    debug!(
        members = results.len(),
        basis_total = %basis_total,
        total_allocated = %total_allocated,
        rounding_residual = %rounding_residual,
        "pool allocated"
    );

    Ok(AllocationOutcome {
        results,
        basis_total,
        total_allocated,
        rounding_residual,
    })
}

/// [`allocate`] wrapped in the standard output envelope.
pub fn build_allocation(
    pool: &AllocationPool,
) -> KoperasiResult<ComputationOutput<AllocationOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let outcome = allocate(pool)?;

    if pool.members.is_empty() {
        warnings.push("No members in pool; whole fund reported as residual".into());
    } else if outcome.basis_total.is_zero() {
        warn!(total_fund = %pool.total_fund, "every member basis is zero");
        warnings.push("Every member basis is zero; whole fund reported as residual".into());
    } else if !outcome.rounding_residual.is_zero() {
        warnings.push(format!(
            "Rounding residual of {} stays with the pool",
            outcome.rounding_residual
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Proportional Allocation (round half-up per share)",
        &serde_json::json!({
            "total_fund": pool.total_fund.to_string(),
            "members": pool.members.len(),
            "residual_policy": "reported, not redistributed",
        }),
        warnings,
        elapsed,
        outcome,
    ))
}

fn validate_pool(pool: &AllocationPool) -> KoperasiResult<()> {
    if pool.total_fund < Decimal::ZERO {
        return Err(KoperasiError::pool(
            "total_fund",
            "Fund to distribute cannot be negative",
        ));
    }

    let mut seen = HashSet::with_capacity(pool.members.len());
    for (i, member) in pool.members.iter().enumerate() {
        if member.member_id.trim().is_empty() {
            return Err(KoperasiError::pool(
                format!("members[{i}].member_id"),
                "Member id cannot be blank",
            ));
        }
        if !seen.insert(member.member_id.as_str()) {
            return Err(KoperasiError::pool(
                format!("members[{i}].member_id"),
                format!("Duplicate member id '{}'", member.member_id),
            ));
        }
        if member.basis_amount < Decimal::ZERO {
            return Err(KoperasiError::pool(
                format!("members[{i}].basis_amount"),
                format!("Basis for member '{}' cannot be negative", member.member_id),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pool(total_fund: Money, bases: &[(&str, Money)]) -> AllocationPool {
        AllocationPool {
            total_fund,
            members: bases
                .iter()
                .map(|(id, basis)| MemberBasis::new(*id, *basis))
                .collect(),
        }
    }

    #[test]
    fn test_three_member_savings_split() {
        let p = pool(
            dec!(200000000),
            &[
                ("A-001", dec!(15000000)),
                ("A-002", dec!(25000000)),
                ("A-003", dec!(5000000)),
            ],
        );
        let out = allocate(&p).unwrap();
        assert_eq!(out.basis_total, dec!(45000000));
        assert_eq!(out.share_of("A-001"), Some(dec!(66666667)));
        assert_eq!(out.share_of("A-002"), Some(dec!(111111111)));
        assert_eq!(out.share_of("A-003"), Some(dec!(22222222)));
        assert_eq!(out.total_allocated + out.rounding_residual, dec!(200000000));
        assert_eq!(out.rounding_residual, Decimal::ZERO);
    }

    #[test]
    fn test_residual_is_reported_not_redistributed() {
        let p = pool(dec!(100), &[("a", dec!(1)), ("b", dec!(1)), ("c", dec!(1))]);
        let out = allocate(&p).unwrap();
        assert!(out.results.iter().all(|r| r.share == dec!(33)));
        assert_eq!(out.rounding_residual, dec!(1));
    }

    #[test]
    fn test_negative_residual_when_shares_round_up() {
        let p = pool(dec!(2), &[("a", dec!(1)), ("b", dec!(1)), ("c", dec!(1))]);
        let out = allocate(&p).unwrap();
        assert!(out.results.iter().all(|r| r.share == dec!(1)));
        assert_eq!(out.rounding_residual, dec!(-1));
        assert_eq!(out.total_allocated + out.rounding_residual, dec!(2));
    }

    #[test]
    fn test_zero_basis_pool() {
        let p = pool(dec!(5000), &[("a", Decimal::ZERO), ("b", Decimal::ZERO)]);
        let out = allocate(&p).unwrap();
        assert!(out.results.iter().all(|r| r.share.is_zero()));
        assert_eq!(out.rounding_residual, dec!(5000));
    }

    #[test]
    fn test_empty_pool() {
        let out = allocate(&pool(dec!(750), &[])).unwrap();
        assert!(out.results.is_empty());
        assert_eq!(out.rounding_residual, dec!(750));

        let env = build_allocation(&pool(dec!(750), &[])).unwrap();
        assert_eq!(env.warnings.len(), 1);
    }

    #[test]
    fn test_negative_fund_rejected() {
        let err = allocate(&pool(dec!(-1), &[("a", dec!(1))])).unwrap_err();
        assert!(matches!(err, KoperasiError::InvalidPool { .. }));
        assert_eq!(err.field(), Some("total_fund"));
    }

    #[test]
    fn test_negative_basis_rejected() {
        let err = allocate(&pool(dec!(10), &[("a", dec!(1)), ("b", dec!(-2))])).unwrap_err();
        assert_eq!(err.field(), Some("members[1].basis_amount"));
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let err = allocate(&pool(dec!(10), &[("a", dec!(1)), ("a", dec!(2))])).unwrap_err();
        assert_eq!(err.field(), Some("members[1].member_id"));
    }

    #[test]
    fn test_basis_total_overflow_is_an_error() {
        let huge = dec!(40000000000000000000000000000);
        let err = allocate(&pool(dec!(1000), &[("a", huge), ("b", huge)])).unwrap_err();
        assert!(matches!(err, KoperasiError::InvalidPool { .. }));
        assert_eq!(err.field(), Some("members"));
    }

    #[test]
    fn test_order_does_not_change_values() {
        let forward = allocate(&pool(
            dec!(1000),
            &[("a", dec!(3)), ("b", dec!(7)), ("c", dec!(11))],
        ))
        .unwrap();
        let reverse = allocate(&pool(
            dec!(1000),
            &[("c", dec!(11)), ("b", dec!(7)), ("a", dec!(3))],
        ))
        .unwrap();
        for id in ["a", "b", "c"] {
            assert_eq!(forward.share_of(id), reverse.share_of(id));
        }
        assert_eq!(forward.rounding_residual, reverse.rounding_residual);
    }
}
