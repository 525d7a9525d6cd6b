use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::KoperasiError;
use crate::money::{monthly_flat_rate, round_whole, sum_money};
use crate::types::*;
use crate::KoperasiResult;

/// `annual% / 100 / 12` folded into one divisor so interest is computed multiply-first.
const PERCENT_MONTHS: Decimal = dec!(1200);

/// Longest tenor accepted: 50 years of monthly installments.
pub const MAX_TENOR_MONTHS: u32 = 600;

/// Inputs to a flat-rate installment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// 18 means 18% per year.
    pub annual_rate_percent: Percent,
    pub tenor_months: u32,
}

impl LoanTerms {
    pub fn new(principal: Money, annual_rate_percent: Percent, tenor_months: u32) -> Self {
        Self {
            principal,
            annual_rate_percent,
            tenor_months,
        }
    }

    pub fn validate(&self) -> KoperasiResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(KoperasiError::terms(
                "principal",
                "Loan principal must be positive",
            ));
        }
        if !self.principal.fract().is_zero() {
            return Err(KoperasiError::terms(
                "principal",
                "Loan principal must be a whole amount",
            ));
        }
        if self.tenor_months == 0 {
            return Err(KoperasiError::terms(
                "tenor_months",
                "Tenor must be at least 1 month",
            ));
        }
        if self.tenor_months > MAX_TENOR_MONTHS {
            return Err(KoperasiError::terms(
                "tenor_months",
                format!("Tenor cannot exceed {MAX_TENOR_MONTHS} months"),
            ));
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(KoperasiError::terms(
                "annual_rate_percent",
                "Annual flat rate cannot be negative",
            ));
        }
        Ok(())
    }

    /// Unrounded flat interest over the whole tenor:
    /// `principal * annual% / 100 / 12 * tenor`.
    pub fn exact_total_interest(&self) -> KoperasiResult<Money> {
        self.principal
            .checked_mul(self.annual_rate_percent)
            .and_then(|v| v.checked_mul(Decimal::from(self.tenor_months)))
            .map(|v| v / PERCENT_MONTHS)
            .ok_or_else(|| {
                KoperasiError::terms("principal", "Principal too large for flat interest")
            })
    }
}

/// One row of an installment schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentLine {
    /// 1-based.
    pub period_index: u32,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub total_payment: Money,
    pub remaining_principal: Money,
}

/// Schedule plus the totals shown under a simulation table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatScheduleOutput {
    pub terms: LoanTerms,
    pub monthly_flat_rate: Rate,
    /// Regular monthly payment (first period).
    pub installment_amount: Money,
    pub total_principal: Money,
    pub total_interest: Money,
    pub total_payment: Money,
    /// Flat interest before per-period rounding.
    pub exact_total_interest: Money,
    /// `total_interest - exact_total_interest`
    pub interest_rounding_difference: Money,
    pub lines: Vec<InstallmentLine>,
}

/// Month-by-month flat-rate schedule.
///
/// Interest is charged on the original principal and spread evenly; the
/// principal is amortized in equal rounded steps. Every non-final period
/// pays the rounded step (capped at the outstanding balance) and the final
/// period pays whatever remains, so the balance lands on exactly zero and
/// the principal portions sum to the principal.
pub fn compute_flat_schedule(terms: &LoanTerms) -> KoperasiResult<Vec<InstallmentLine>> {
    terms.validate()?;

    let tenor = Decimal::from(terms.tenor_months);
    let total_interest = terms.exact_total_interest()?;
    let principal = terms.principal.normalize();
    let principal_step = round_whole(principal / tenor);
    let interest_step = round_whole(total_interest / tenor);

    let mut lines = Vec::with_capacity(terms.tenor_months as usize);
    let mut remaining = principal;

    for period_index in 1..=terms.tenor_months {
        let principal_portion = if period_index == terms.tenor_months {
            remaining
        } else {
            principal_step.min(remaining)
        };
        remaining -= principal_portion;
        let total_payment = principal_portion.checked_add(interest_step).ok_or_else(|| {
            KoperasiError::terms("principal", "Principal too large for an installment")
        })?;

        lines.push(InstallmentLine {
            period_index,
            principal_portion,
            interest_portion: interest_step,
            total_payment,
            remaining_principal: remaining,
        });
    }

    debug!(
        principal = %terms.principal,
        annual_rate_percent = %terms.annual_rate_percent,
        tenor_months = terms.tenor_months,
        principal_step = %principal_step,
        interest_step = %interest_step,
        "flat schedule computed"
    );

    Ok(lines)
}

/// Flat schedule wrapped with totals and the standard output envelope.
pub fn build_flat_schedule(
    terms: &LoanTerms,
) -> KoperasiResult<ComputationOutput<FlatScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let lines = compute_flat_schedule(terms)?;
    let exact_total_interest = terms.exact_total_interest()?;

    let principals: Vec<Money> = lines.iter().map(|l| l.principal_portion).collect();
    let interests: Vec<Money> = lines.iter().map(|l| l.interest_portion).collect();
    let (total_principal, total_interest, total_payment) = sum_money(&principals)
        .zip(sum_money(&interests))
        .and_then(|(p, i)| Some((p, i, p.checked_add(i)?)))
        .ok_or_else(|| KoperasiError::terms("principal", "Principal too large to total"))?;

    let installment_amount = lines
        .first()
        .map(|l| l.total_payment)
        .unwrap_or(Decimal::ZERO);

    if let (Some(first), Some(last)) = (lines.first(), lines.last()) {
        if lines.len() > 1 && last.principal_portion != first.principal_portion {
            warnings.push(format!(
                "Final period principal of {} absorbs rounding (regular portion {})",
                last.principal_portion, first.principal_portion
            ));
        }
    }

    let interest_rounding_difference = total_interest - exact_total_interest;
    if !interest_rounding_difference.is_zero() {
        warn!(
            difference = %interest_rounding_difference,
            "rounded flat interest differs from exact total"
        );
        warnings.push(format!(
            "Rounded interest totals {} against exact flat interest of {}",
            total_interest,
            exact_total_interest.normalize()
        ));
    }

    let output = FlatScheduleOutput {
        terms: terms.clone(),
        monthly_flat_rate: monthly_flat_rate(terms.annual_rate_percent),
        installment_amount,
        total_principal,
        total_interest,
        total_payment,
        exact_total_interest,
        interest_rounding_difference,
        lines,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Flat-Rate Installment Schedule",
        &serde_json::json!({
            "principal": terms.principal.to_string(),
            "annual_rate_percent": terms.annual_rate_percent.to_string(),
            "tenor_months": terms.tenor_months,
            "interest_basis": "original principal",
            "rounding": "half-up to whole unit per line",
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

    fn terms(principal: Money, rate: Percent, tenor: u32) -> LoanTerms {
        LoanTerms::new(principal, rate, tenor)
    }

    #[test]
    fn test_twelve_month_twelve_percent() {
        let lines = compute_flat_schedule(&terms(dec!(12000000), dec!(12), 12)).unwrap();
        assert_eq!(lines.len(), 12);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line.period_index, i as u32 + 1);
            assert_eq!(line.principal_portion, dec!(1000000));
            assert_eq!(line.interest_portion, dec!(120000));
            assert_eq!(line.total_payment, dec!(1120000));
        }
        assert_eq!(lines[0].remaining_principal, dec!(11000000));
        assert_eq!(lines[11].remaining_principal, Decimal::ZERO);
    }

    #[test]
    fn test_final_period_absorbs_principal_rounding() {
        let lines = compute_flat_schedule(&terms(dec!(1000000), dec!(18), 7)).unwrap();
        for line in &lines[..6] {
            assert_eq!(line.principal_portion, dec!(142857));
        }
        assert_eq!(lines[6].principal_portion, dec!(142858));
        assert_eq!(lines[6].remaining_principal, Decimal::ZERO);

        let total: Money = lines.iter().map(|l| l.principal_portion).sum();
        assert_eq!(total, dec!(1000000));
    }

    #[test]
    fn test_balance_never_negative_for_tiny_principal() {
        // round(7 / 12) = 1, so the balance is exhausted after seven periods
        let lines = compute_flat_schedule(&terms(dec!(7), dec!(12), 12)).unwrap();
        let mut previous = dec!(7);
        for line in &lines {
            assert!(line.remaining_principal >= Decimal::ZERO);
            assert!(line.remaining_principal <= previous);
            previous = line.remaining_principal;
        }
        assert_eq!(lines[6].remaining_principal, Decimal::ZERO);
        assert_eq!(lines[7].principal_portion, Decimal::ZERO);
        assert_eq!(lines[11].remaining_principal, Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_has_no_interest() {
        let lines = compute_flat_schedule(&terms(dec!(3000000), Decimal::ZERO, 6)).unwrap();
        assert!(lines.iter().all(|l| l.interest_portion.is_zero()));
        assert!(lines.iter().all(|l| l.total_payment == dec!(500000)));
    }

    #[test]
    fn test_single_period() {
        let lines = compute_flat_schedule(&terms(dec!(1000000), dec!(24), 1)).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].principal_portion, dec!(1000000));
        assert_eq!(lines[0].interest_portion, dec!(20000));
        assert_eq!(lines[0].remaining_principal, Decimal::ZERO);
    }

    #[test]
    fn test_invalid_terms_name_the_field() {
        let cases = [
            (terms(Decimal::ZERO, dec!(12), 12), "principal"),
            (terms(dec!(-5), dec!(12), 12), "principal"),
            (terms(dec!(1000.5), dec!(12), 12), "principal"),
            (terms(dec!(1000), dec!(12), 0), "tenor_months"),
            (terms(dec!(1000), dec!(12), 601), "tenor_months"),
            (terms(dec!(1000), dec!(-0.5), 12), "annual_rate_percent"),
        ];
        for (t, field) in cases {
            let err = compute_flat_schedule(&t).unwrap_err();
            assert!(matches!(err, KoperasiError::InvalidTerms { .. }));
            assert_eq!(err.field(), Some(field));
        }
    }

    #[test]
    fn test_tenor_capped() {
        let err = compute_flat_schedule(&terms(dec!(1000000), dec!(12), u32::MAX)).unwrap_err();
        assert_eq!(err.field(), Some("tenor_months"));

        let lines =
            compute_flat_schedule(&terms(dec!(1000000), dec!(12), MAX_TENOR_MONTHS)).unwrap();
        assert_eq!(lines.len(), MAX_TENOR_MONTHS as usize);
    }

    #[test]
    fn test_trailing_zero_principal_yields_whole_lines() {
        let lines = compute_flat_schedule(&terms(dec!(12000000.00), dec!(12), 12)).unwrap();
        let last = &lines[11];
        assert_eq!(last.principal_portion.scale(), 0);
        assert_eq!(last.remaining_principal.to_string(), "0");
        assert_eq!(lines[0].remaining_principal.to_string(), "11000000");
    }

    #[test]
    fn test_installment_overflow_is_an_error() {
        // the whole 96-bit range goes out in one period, plus interest
        let err = compute_flat_schedule(&terms(Decimal::MAX, dec!(0.0000001), 1)).unwrap_err();
        assert!(matches!(err, KoperasiError::InvalidTerms { .. }));
        assert_eq!(err.field(), Some("principal"));
    }

    #[test]
    fn test_summary_totals() {
        let out = build_flat_schedule(&terms(dec!(5000000), dec!(18), 10)).unwrap();
        let s = &out.result;
        assert_eq!(s.monthly_flat_rate, dec!(0.015));
        assert_eq!(s.installment_amount, dec!(575000));
        assert_eq!(s.total_principal, dec!(5000000));
        assert_eq!(s.total_interest, dec!(750000));
        assert_eq!(s.total_payment, dec!(5750000));
        assert!(s.interest_rounding_difference.is_zero());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_summary_reports_interest_rounding() {
        // 1,000,000 * 10% flat over a year = 100,000; 8,333.33 per month rounds to 8,333
        let out = build_flat_schedule(&terms(dec!(1000000), dec!(10), 12)).unwrap();
        let s = &out.result;
        assert_eq!(s.exact_total_interest, dec!(100000));
        assert_eq!(s.total_interest, dec!(99996));
        assert_eq!(s.interest_rounding_difference, dec!(-4));
        assert!(out.warnings.iter().any(|w| w.contains("exact flat interest")));
    }
}
