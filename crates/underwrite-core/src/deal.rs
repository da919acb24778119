use serde::{Deserialize, Serialize};

use crate::normalize::RawValue;
use crate::UnderwriteResult;

/// Deal inputs as entered on the form or filled by a document extractor.
///
/// Every field is optional. Numeric fields accept numbers or text
/// (`"$1,200,000"`, `"92%"`); see [`crate::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealInput {
    // Identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submarket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Deal source (broker, off-market, auction...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Physical
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<RawValue>,
    /// Lot size in acres
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqft: Option<RawValue>,

    // Acquisition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asking_price: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_price: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_repair_value: Option<RawValue>,

    // Income
    /// Annual gross rental income
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_income: Option<RawValue>,
    /// Annual common fees / ancillary income, not subject to vacancy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_income: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vacancy_rate: Option<RawValue>,
    /// Market rent per unit per month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_rent: Option<RawValue>,

    // Expenses (annual)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opex: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxes: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<RawValue>,
    /// Fixed management fee in dollars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management: Option<RawValue>,
    /// Management fee as a share of EGI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_rate: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserves: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilities: Option<RawValue>,
    /// Planned capital expenditure; informational, not an operating expense
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex: Option<RawValue>,

    // Debt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ltv: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amortization_years: Option<RawValue>,
    /// `amortizing` or `interest-only`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_years: Option<RawValue>,

    // Capital stack
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_raise: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_capital_invested: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_project_cost: Option<RawValue>,
    /// Capital remaining in the deal after a refinance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_left_in_deal: Option<RawValue>,

    // Growth & exit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_growth: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_growth: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_cap_rate: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_commission_rate: Option<RawValue>,

    // LP structure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_return: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_share: Option<RawValue>,

    // Targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_irr: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_coc: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_multiple: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_period: Option<RawValue>,

    // Market context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_risks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

impl DealInput {
    pub fn from_json(json: &str) -> UnderwriteResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Copy of this deal with slider overrides applied. A vacancy override
    /// also clears occupancy so that it takes priority.
    pub fn with_sensitivity(&self, overrides: &SensitivityParameters) -> DealInput {
        let mut deal = self.clone();
        if let Some(v) = &overrides.vacancy {
            deal.vacancy_rate = Some(v.clone());
            deal.occupancy = None;
        }
        if let Some(v) = &overrides.rent_growth {
            deal.rent_growth = Some(v.clone());
        }
        if let Some(v) = &overrides.expense_growth {
            deal.expense_growth = Some(v.clone());
        }
        if let Some(v) = &overrides.exit_cap_rate {
            deal.exit_cap_rate = Some(v.clone());
        }
        if let Some(v) = &overrides.interest_rate {
            deal.interest_rate = Some(v.clone());
        }
        deal
    }
}

/// What-if overrides layered over a [`DealInput`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vacancy: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rent_growth: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense_growth: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_cap_rate: Option<RawValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<RawValue>,
}

impl SensitivityParameters {
    pub fn is_empty(&self) -> bool {
        self == &SensitivityParameters::default()
    }
}

/// Loan repayment profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanType {
    #[default]
    Amortizing,
    InterestOnly,
}

impl LoanType {
    /// Lenient parse of extractor text; anything unrecognised amortizes.
    pub fn parse(text: Option<&str>) -> LoanType {
        let Some(text) = text else {
            return LoanType::Amortizing;
        };
        let key: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "io" | "interestonly" => LoanType::InterestOnly,
            _ => LoanType::Amortizing,
        }
    }
}
