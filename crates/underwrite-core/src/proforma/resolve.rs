//! Prioritised resolution of deal anchors.
//!
//! Each field group walks an ordered list of candidates (explicit figure,
//! derived figure, heuristic default) and returns the first one present
//! together with a tag naming the branch that produced it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProjectionDefaults;
use crate::deal::DealInput;
use crate::normalize::{self, positive, positive_rate};
use crate::types::{Money, Rate};

/// A resolved value and the branch it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolved<S> {
    pub value: Decimal,
    pub source: S,
}

/// First candidate with a value, in priority order.
fn first_present<S>(candidates: impl IntoIterator<Item = (S, Option<Decimal>)>) -> Option<Resolved<S>> {
    candidates
        .into_iter()
        .find_map(|(source, value)| value.map(|value| Resolved { value, source }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    OfferPrice,
    AskingPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeSource {
    GrossIncome,
    UnitRentRoll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacancySource {
    Occupancy,
    VacancyRate,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanSource {
    Explicit,
    ArvLtv,
    PriceLtv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquitySource {
    EquityRaise,
    CapitalInvested,
    ProjectCostLessLoan,
    PriceLessLoan,
}

impl EquitySource {
    /// Derived equity is a residual, not a figure anyone supplied.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            EquitySource::ProjectCostLessLoan | EquitySource::PriceLessLoan
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpexSource {
    Itemized,
    Total,
    Heuristic,
}

/// Year-one expense basis before escalation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum ExpenseBasis {
    Itemized {
        taxes: Money,
        insurance: Money,
        maintenance: Money,
        management_fixed: Money,
        management_rate: Rate,
        reserves: Money,
        utilities: Money,
    },
    /// A single annual opex figure supplied by the deal.
    Total { amount: Money },
    /// `(gross income + other income) × heuristic ratio`
    Heuristic { amount: Money },
}

impl ExpenseBasis {
    pub fn source(&self) -> OpexSource {
        match self {
            ExpenseBasis::Itemized { .. } => OpexSource::Itemized,
            ExpenseBasis::Total { .. } => OpexSource::Total,
            ExpenseBasis::Heuristic { .. } => OpexSource::Heuristic,
        }
    }
}

pub fn resolve_price(deal: &DealInput) -> Option<Resolved<PriceSource>> {
    first_present([
        (PriceSource::OfferPrice, positive(deal.offer_price.as_ref())),
        (PriceSource::AskingPrice, positive(deal.asking_price.as_ref())),
    ])
}

pub fn resolve_income(deal: &DealInput) -> Option<Resolved<IncomeSource>> {
    let rent_roll = positive(deal.units.as_ref())
        .zip(positive(deal.market_rent.as_ref()))
        .and_then(|(units, rent)| units.checked_mul(rent)?.checked_mul(Decimal::from(12)))
        .filter(|income| *income <= normalize::MAX_MAGNITUDE);

    first_present([
        (IncomeSource::GrossIncome, positive(deal.gross_income.as_ref())),
        (IncomeSource::UnitRentRoll, rent_roll),
    ])
}

pub fn resolve_vacancy(deal: &DealInput, defaults: &ProjectionDefaults) -> Resolved<VacancySource> {
    let from_occupancy = positive_rate(deal.occupancy.as_ref()).map(|occ| Decimal::ONE - occ);
    let resolved = first_present([
        (VacancySource::Occupancy, from_occupancy),
        (
            VacancySource::VacancyRate,
            normalize::opt_rate(deal.vacancy_rate.as_ref()),
        ),
        (VacancySource::Default, Some(defaults.vacancy_rate)),
    ]);

    resolved.unwrap_or(Resolved {
        value: defaults.vacancy_rate,
        source: VacancySource::Default,
    })
}

/// Loan amount: explicit, else ARV × LTV, else price × LTV.
pub fn resolve_loan(deal: &DealInput, price: Option<Money>) -> Option<Resolved<LoanSource>> {
    let ltv = positive_rate(deal.ltv.as_ref());
    let arv_loan = positive(deal.after_repair_value.as_ref())
        .zip(ltv)
        .map(|(arv, ltv)| arv * ltv);
    let price_loan = price.zip(ltv).map(|(price, ltv)| price * ltv);

    let resolved = first_present([
        (LoanSource::Explicit, positive(deal.loan_amount.as_ref())),
        (LoanSource::ArvLtv, arv_loan),
        (LoanSource::PriceLtv, price_loan),
    ]);
    if let Some(r) = &resolved {
        debug!(source = ?r.source, amount = %r.value, "loan amount resolved");
    }
    resolved
}

/// Equity: explicit raise, else capital invested, else the residual of
/// project cost (or price) over the loan, floored at zero.
pub fn resolve_equity(deal: &DealInput, price: Money, loan: Money) -> Resolved<EquitySource> {
    let residual = |basis: Money| (basis - loan).max(Decimal::ZERO);

    let resolved = first_present([
        (EquitySource::EquityRaise, positive(deal.equity_raise.as_ref())),
        (
            EquitySource::CapitalInvested,
            positive(deal.total_capital_invested.as_ref()),
        ),
        (
            EquitySource::ProjectCostLessLoan,
            positive(deal.total_project_cost.as_ref()).map(residual),
        ),
    ])
    .unwrap_or(Resolved {
        value: residual(price),
        source: EquitySource::PriceLessLoan,
    });

    debug!(source = ?resolved.source, amount = %resolved.value, "equity resolved");
    resolved
}

/// Itemized lines when any is present, else the opex total, else the flat
/// heuristic on gross plus other income.
pub fn resolve_expenses(
    deal: &DealInput,
    gross_income: Money,
    other_income: Money,
    defaults: &ProjectionDefaults,
) -> ExpenseBasis {
    let line = |raw| positive(raw).unwrap_or(Decimal::ZERO);
    let taxes = line(deal.taxes.as_ref());
    let insurance = line(deal.insurance.as_ref());
    let maintenance = line(deal.maintenance.as_ref());
    let management_fixed = line(deal.management.as_ref());
    let reserves = line(deal.reserves.as_ref());
    let utilities = line(deal.utilities.as_ref());

    let any_itemized = [taxes, insurance, maintenance, management_fixed, reserves, utilities]
        .iter()
        .any(|v| *v > Decimal::ZERO);

    if any_itemized {
        return ExpenseBasis::Itemized {
            taxes,
            insurance,
            maintenance,
            management_fixed,
            management_rate: normalize::rate(deal.management_rate.as_ref(), defaults.management_rate),
            reserves,
            utilities,
        };
    }

    if let Some(amount) = positive(deal.opex.as_ref()) {
        return ExpenseBasis::Total { amount };
    }

    debug!("no expense figures supplied; using heuristic ratio");
    ExpenseBasis::Heuristic {
        amount: (gross_income + other_income) * defaults.opex_heuristic_ratio,
    }
}
