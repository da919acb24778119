//! Five-year levered pro forma.
//!
//! `project_deal` resolves the deal anchors, prices the loan, rolls the
//! operating statement forward, values the exit and distributes to the LP.
//! Each step is a pure function in its own module.

pub mod exit;
pub mod financing;
pub mod metrics;
pub mod resolve;
pub mod schedule;
pub mod waterfall;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ProjectionDefaults, MIN_EXIT_CAP_RATE};
use crate::deal::{DealInput, LoanType};
use crate::format;
use crate::normalize::{self, positive, positive_rate};
use crate::types::{Money, Rate, PROJECTION_YEARS};

pub use exit::ExitValuation;
pub use financing::{DebtYear, Financing};
pub use metrics::{CocBasis, HeadlineMetrics};
pub use resolve::{
    EquitySource, ExpenseBasis, IncomeSource, LoanSource, OpexSource, PriceSource, VacancySource,
};
pub use schedule::{ExpenseLines, OperatingPlan, YearRecord};
pub use waterfall::LpWaterfall;

/// A required anchor the projection could not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    PurchasePrice,
    GrossIncome,
    LoanAmount,
}

impl Anchor {
    pub fn label(&self) -> &'static str {
        match self {
            Anchor::PurchasePrice => "purchase price",
            Anchor::GrossIncome => "gross income",
            Anchor::LoanAmount => "loan amount",
        }
    }
}

/// Outcome of a projection. Missing anchors are a state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Projection {
    Complete(Box<ProjectionResult>),
    Incomplete { missing: Vec<Anchor> },
}

impl Projection {
    pub fn result(&self) -> Option<&ProjectionResult> {
        match self {
            Projection::Complete(result) => Some(result),
            Projection::Incomplete { .. } => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Projection::Complete(_))
    }
}

/// Every assumption the projection ran with, after defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    pub purchase_price: Money,
    pub gross_income: Money,
    pub other_income: Money,
    pub vacancy_rate: Rate,
    pub rent_growth: Rate,
    pub expense_growth: Rate,
    pub insurance_growth: Rate,
    pub maintenance_growth: Rate,
    pub expenses: ExpenseBasis,
    pub interest_rate: Rate,
    pub amortization_years: u32,
    pub loan_type: LoanType,
    pub io_years: u32,
    pub monthly_payment: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<Rate>,
    pub exit_cap_rate: Rate,
    pub sale_commission_rate: Rate,
    pub preferred_return: Rate,
    pub profit_share: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_left_in_deal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<Decimal>,
}

/// Which branch of each fallback chain produced the anchors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingFlags {
    pub used_explicit_loan: bool,
    pub used_arv_loan: bool,
    pub loan_source: LoanSource,
    pub equity_source: EquitySource,
    pub price_source: PriceSource,
    pub income_source: IncomeSource,
    pub vacancy_source: VacancySource,
    pub opex_source: OpexSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub assumptions: Assumptions,
    pub loan_amount: Money,
    pub equity: Money,
    pub years: Vec<YearRecord>,
    pub exit: ExitValuation,
    pub deal_cash_flows: Vec<Money>,
    pub waterfall: LpWaterfall,
    pub metrics: HeadlineMetrics,
    pub flags: SourcingFlags,
    /// Fallbacks taken while resolving assumptions
    pub notes: Vec<String>,
}

impl ProjectionResult {
    pub fn year(&self, year: u32) -> Option<&YearRecord> {
        self.years.iter().find(|y| y.year == year)
    }

    pub fn first_year(&self) -> Option<&YearRecord> {
        self.years.first()
    }

    pub fn final_year(&self) -> Option<&YearRecord> {
        self.years.last()
    }
}

/// Project a deal over [`PROJECTION_YEARS`] years.
pub fn project_deal(deal: &DealInput, defaults: &ProjectionDefaults) -> Projection {
    let price = resolve::resolve_price(deal);
    let income = resolve::resolve_income(deal);
    let loan = resolve::resolve_loan(deal, price.map(|p| p.value));

    let (price, income, loan) = match (price, income, loan) {
        (Some(price), Some(income), Some(loan)) => (price, income, loan),
        (price, income, loan) => {
            let missing: Vec<Anchor> = [
                (Anchor::PurchasePrice, price.is_none()),
                (Anchor::GrossIncome, income.is_none()),
                (Anchor::LoanAmount, loan.is_none()),
            ]
            .into_iter()
            .filter_map(|(anchor, absent)| absent.then_some(anchor))
            .collect();
            debug!(?missing, "projection incomplete");
            return Projection::Incomplete { missing };
        }
    };

    let mut notes = Vec::new();
    let purchase_price = price.value;
    let gross_income = income.value;
    let other_income = positive(deal.other_income.as_ref()).unwrap_or(Decimal::ZERO);

    let vacancy = resolve::resolve_vacancy(deal, defaults);
    if vacancy.source == VacancySource::Default {
        notes.push(format!(
            "Occupancy and vacancy not supplied; assuming {} vacancy",
            format::percent(vacancy.value)
        ));
    }

    let expenses = resolve::resolve_expenses(deal, gross_income, other_income, defaults);
    if expenses.source() == OpexSource::Heuristic {
        notes.push(format!(
            "Operating expenses not supplied; estimated at {} of income",
            format::percent(defaults.opex_heuristic_ratio)
        ));
    }

    let equity = resolve::resolve_equity(deal, purchase_price, loan.value);
    if equity.source.is_derived() {
        notes.push("Equity derived from cost less loan; no explicit equity figure".into());
    }

    let financing = financing::resolve_terms(
        deal,
        loan.value,
        loan.source,
        equity.value,
        equity.source,
        defaults,
        &mut notes,
    );

    let exit_cap_rate = match normalize::opt_rate(deal.exit_cap_rate.as_ref()) {
        Some(cap) if cap >= MIN_EXIT_CAP_RATE => cap,
        Some(_) => {
            warn!("exit cap rate below floor; using default");
            notes.push(format!(
                "Exit cap rate must be at least {}; using {}",
                format::percent(MIN_EXIT_CAP_RATE),
                format::percent(defaults.exit_cap_rate)
            ));
            defaults.exit_cap_rate
        }
        None => defaults.exit_cap_rate,
    };
    let sale_commission_rate =
        normalize::rate(deal.sale_commission_rate.as_ref(), defaults.sale_commission_rate);
    let preferred_return = normalize::rate(deal.preferred_return.as_ref(), defaults.preferred_return);
    let profit_share = normalize::rate(deal.profit_share.as_ref(), defaults.profit_share);

    let plan = OperatingPlan {
        gross_income,
        other_income,
        vacancy_rate: vacancy.value,
        rent_growth: normalize::rate(deal.rent_growth.as_ref(), defaults.rent_growth),
        expense_growth: normalize::rate(deal.expense_growth.as_ref(), defaults.expense_growth),
        insurance_growth: defaults.insurance_growth,
        maintenance_growth: defaults.maintenance_growth,
        expenses,
    };

    let debt = financing::debt_schedule(&financing, PROJECTION_YEARS);
    let years = plan.project(&debt, purchase_price);
    let exit = exit::value_exit(&years, exit_cap_rate, sale_commission_rate);
    let deal_cash_flows = exit::deal_cash_flows(financing.equity, &years, &exit);
    let waterfall = waterfall::distribute(
        financing.equity,
        PROJECTION_YEARS,
        &exit,
        preferred_return,
        profit_share,
    );

    let units = positive(deal.units.as_ref());
    let sqft = positive(deal.sqft.as_ref());
    let cash_left_in_deal = positive(deal.cash_left_in_deal.as_ref());
    let (year1_cash_flow, year1_noi, year1_dscr) = years
        .first()
        .map(|y| (y.cash_flow, y.noi, y.dscr))
        .unwrap_or_default();

    let metrics = metrics::headline(&metrics::MetricInputs {
        lp_cash_flows: &waterfall.cash_flows,
        deal_cash_flows: &deal_cash_flows,
        year1_cash_flow,
        year1_noi,
        year1_dscr,
        equity: financing.equity,
        cash_left_in_deal,
        exit_payout: waterfall.exit_payout,
        purchase_price,
        units,
        sqft,
        irr_guess: defaults.irr_guess,
    });
    if !metrics.irr.converged {
        notes.push(format!(
            "IRR did not converge after {} iterations; reporting last estimate",
            metrics.irr.iterations
        ));
    }

    let flags = SourcingFlags {
        used_explicit_loan: loan.source == LoanSource::Explicit,
        used_arv_loan: loan.source == LoanSource::ArvLtv,
        loan_source: loan.source,
        equity_source: equity.source,
        price_source: price.source,
        income_source: income.source,
        vacancy_source: vacancy.source,
        opex_source: plan.expenses.source(),
    };

    let assumptions = Assumptions {
        purchase_price,
        gross_income,
        other_income,
        vacancy_rate: plan.vacancy_rate,
        rent_growth: plan.rent_growth,
        expense_growth: plan.expense_growth,
        insurance_growth: plan.insurance_growth,
        maintenance_growth: plan.maintenance_growth,
        expenses: plan.expenses,
        interest_rate: financing.interest_rate,
        amortization_years: financing.amortization_years,
        loan_type: financing.loan_type,
        io_years: financing.io_years,
        monthly_payment: financing.monthly_payment,
        ltv: positive_rate(deal.ltv.as_ref()),
        exit_cap_rate,
        sale_commission_rate,
        preferred_return,
        profit_share,
        cash_left_in_deal,
        units,
        sqft,
    };

    Projection::Complete(Box::new(ProjectionResult {
        assumptions,
        loan_amount: financing.loan_amount,
        equity: financing.equity,
        years,
        exit,
        deal_cash_flows,
        waterfall,
        metrics,
        flags,
        notes,
    }))
}
