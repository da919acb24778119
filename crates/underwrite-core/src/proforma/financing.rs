use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ProjectionDefaults, MAX_AMORTIZATION_YEARS};
use crate::deal::{DealInput, LoanType};
use crate::format;
use crate::normalize::{self, positive};
use crate::proforma::resolve::{EquitySource, LoanSource};
use crate::time_value::amortization_payment;
use crate::types::{Money, Rate, PROJECTION_YEARS};

const MONTHS_PER_YEAR: u32 = 12;

/// Resolved debt and equity for the hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financing {
    pub loan_amount: Money,
    pub loan_source: LoanSource,
    pub equity: Money,
    pub equity_source: EquitySource,
    pub interest_rate: Rate,
    pub amortization_years: u32,
    pub loan_type: LoanType,
    /// Years of interest-only payments at the start of the loan
    pub io_years: u32,
    /// Level payment over the full amortization term
    pub monthly_payment: Money,
}

/// One year of the monthly debt roll-forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtYear {
    pub year: u32,
    pub beginning_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub ending_balance: Money,
}

impl DebtYear {
    pub fn debt_service(&self) -> Money {
        self.interest + self.principal
    }
}

/// Whole years from a raw field; None when absent, non-positive or not a
/// whole number of years.
fn whole_years(value: Option<Decimal>) -> Option<u32> {
    value
        .filter(|v| *v > Decimal::ZERO && v.fract().is_zero())
        .and_then(|v| v.to_u32())
}

/// Price the loan. Notes describe any fallback taken.
pub fn resolve_terms(
    deal: &DealInput,
    loan_amount: Money,
    loan_source: LoanSource,
    equity: Money,
    equity_source: EquitySource,
    defaults: &ProjectionDefaults,
    notes: &mut Vec<String>,
) -> Financing {
    let interest_rate = match deal.interest_rate.as_ref() {
        None => defaults.interest_rate,
        Some(raw) => normalize::opt_rate(Some(raw)).unwrap_or_else(|| {
            notes.push(format!(
                "Interest rate is not a rate between -100% and 100%; using {}",
                format::percent(defaults.interest_rate)
            ));
            defaults.interest_rate
        }),
    };

    let amortization_years = match deal.amortization_years.as_ref() {
        None => defaults.amortization_years,
        Some(raw) => whole_years(normalize::parse(Some(raw)))
            .filter(|years| *years <= MAX_AMORTIZATION_YEARS)
            .unwrap_or_else(|| {
                notes.push(format!(
                    "Amortization term is not a whole number of years from 1 to {}; using {} years",
                    MAX_AMORTIZATION_YEARS, defaults.amortization_years
                ));
                defaults.amortization_years
            }),
    };

    let loan_type = LoanType::parse(deal.loan_type.as_deref());
    let io_years = match loan_type {
        LoanType::Amortizing => 0,
        LoanType::InterestOnly => {
            whole_years(positive(deal.io_years.as_ref())).unwrap_or(PROJECTION_YEARS)
        }
    };

    let monthly_rate = interest_rate / Decimal::from(MONTHS_PER_YEAR);
    let term_months = amortization_years.saturating_mul(MONTHS_PER_YEAR);
    let monthly_payment = match amortization_payment(monthly_rate, term_months, loan_amount) {
        Ok(payment) => payment,
        Err(e) => {
            notes.push(format!("Loan payment not representable ({e}); treating loan as interest-only"));
            loan_amount * monthly_rate
        }
    };

    debug!(
        %interest_rate,
        amortization_years,
        io_years,
        %monthly_payment,
        "loan terms resolved"
    );

    Financing {
        loan_amount,
        loan_source,
        equity,
        equity_source,
        interest_rate,
        amortization_years,
        loan_type,
        io_years,
        monthly_payment,
    }
}

/// Month-by-month balance roll-forward summed into years.
///
/// Interest accrues on the opening monthly balance. Principal is the level
/// payment less interest, capped at the remaining balance, and zero during
/// the interest-only period.
pub fn debt_schedule(financing: &Financing, years: u32) -> Vec<DebtYear> {
    let monthly_rate = financing.interest_rate / Decimal::from(MONTHS_PER_YEAR);
    let mut balance = financing.loan_amount;
    let mut schedule = Vec::with_capacity(years as usize);

    for year in 1..=years {
        let beginning_balance = balance;
        let interest_only = year <= financing.io_years;
        let mut interest = Decimal::ZERO;
        let mut principal = Decimal::ZERO;

        for _ in 0..MONTHS_PER_YEAR {
            let month_interest = balance * monthly_rate;
            let month_principal = if interest_only {
                Decimal::ZERO
            } else {
                (financing.monthly_payment - month_interest)
                    .min(balance)
                    .max(Decimal::ZERO)
            };
            interest += month_interest;
            principal += month_principal;
            balance -= month_principal;
        }

        schedule.push(DebtYear {
            year,
            beginning_balance,
            interest,
            principal,
            ending_balance: balance,
        });
    }

    schedule
}
