use clap::Args;
use serde_json::Value;
use std::time::Instant;

use underwrite_core::audit::audit_deal;
use underwrite_core::deal::{DealInput, SensitivityParameters};
use underwrite_core::digest::deal_digest;
use underwrite_core::normalize::RawValue;
use underwrite_core::proforma::{project_deal, Projection};
use underwrite_core::types::with_metadata;
use underwrite_core::underwrite::{underwrite, UnderwriteRequest};
use underwrite_core::EngineConfig;

use crate::input;

/// Deal source: a JSON file, piped stdin, or headline flags for quick runs
#[derive(Args)]
pub struct DealArgs {
    /// Path to JSON deal file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Purchase price (e.g. "1,250,000")
    #[arg(long)]
    pub price: Option<String>,

    /// Annual gross rental income
    #[arg(long)]
    pub gross_income: Option<String>,

    /// Number of units
    #[arg(long)]
    pub units: Option<String>,

    /// Market rent per unit per month
    #[arg(long)]
    pub market_rent: Option<String>,

    /// Occupancy (e.g. "92" or "0.92")
    #[arg(long)]
    pub occupancy: Option<String>,

    /// Annual operating expenses
    #[arg(long)]
    pub opex: Option<String>,

    /// Explicit loan amount
    #[arg(long)]
    pub loan_amount: Option<String>,

    /// Loan-to-value (e.g. "70")
    #[arg(long)]
    pub ltv: Option<String>,

    /// Annual interest rate (e.g. "7.25")
    #[arg(long)]
    pub interest_rate: Option<String>,

    /// Amortization term in years
    #[arg(long)]
    pub amortization_years: Option<String>,

    /// Exit cap rate (e.g. "6.5")
    #[arg(long)]
    pub exit_cap_rate: Option<String>,
}

impl DealArgs {
    /// Raw JSON from `--input` or stdin, if either was supplied.
    pub fn json_source(&self) -> Result<Option<Value>, Box<dyn std::error::Error>> {
        if let Some(ref path) = self.input {
            return Ok(Some(input::file::read_json(path)?));
        }
        input::stdin::read_stdin()
    }

    fn from_flags(&self) -> Option<DealInput> {
        let raw = |v: &Option<String>| v.as_deref().map(RawValue::from);
        let deal = DealInput {
            asking_price: raw(&self.price),
            gross_income: raw(&self.gross_income),
            units: raw(&self.units),
            market_rent: raw(&self.market_rent),
            occupancy: raw(&self.occupancy),
            opex: raw(&self.opex),
            loan_amount: raw(&self.loan_amount),
            ltv: raw(&self.ltv),
            interest_rate: raw(&self.interest_rate),
            amortization_years: raw(&self.amortization_years),
            exit_cap_rate: raw(&self.exit_cap_rate),
            ..Default::default()
        };
        (deal != DealInput::default()).then_some(deal)
    }

    pub fn load(&self) -> Result<DealInput, Box<dyn std::error::Error>> {
        if let Some(value) = self.json_source()? {
            return Ok(serde_json::from_value(value)?);
        }
        self.from_flags()
            .ok_or_else(|| "--input <deal.json>, piped stdin, or deal flags (e.g. --price) required".into())
    }
}

pub fn run_project(args: DealArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let deal = args.load()?;
    let projection = project_deal(&deal, &config.projection);

    let (assumptions, warnings) = match &projection {
        Projection::Complete(result) => (serde_json::to_value(&result.assumptions)?, result.notes.clone()),
        Projection::Incomplete { missing } => (
            serde_json::json!({ "missing": missing }),
            vec!["Projection incomplete".to_string()],
        ),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata("Five-Year Pro Forma", &assumptions, warnings, elapsed, projection);
    Ok(serde_json::to_value(output)?)
}

pub fn run_audit(args: DealArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let deal = args.load()?;
    let projection = project_deal(&deal, &config.projection);
    let report = audit_deal(&deal, &projection, &config.audit);

    let elapsed = start.elapsed().as_micros() as u64;
    let output = with_metadata(
        "Underwriting Audit",
        &config.audit,
        Vec::new(),
        elapsed,
        report,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_digest(args: DealArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let deal = args.load()?;
    let projection = project_deal(&deal, &config.projection);
    Ok(serde_json::json!({ "digest": deal_digest(&deal, &projection) }))
}

/// Arguments for the full underwriting run
#[derive(Args)]
pub struct UnderwriteArgs {
    #[command(flatten)]
    pub deal: DealArgs,

    /// Vacancy slider override (replaces occupancy)
    #[arg(long)]
    pub vacancy_override: Option<String>,

    /// Rent growth slider override
    #[arg(long, allow_hyphen_values = true)]
    pub rent_growth_override: Option<String>,

    /// Expense growth slider override
    #[arg(long, allow_hyphen_values = true)]
    pub expense_growth_override: Option<String>,

    /// Exit cap rate slider override
    #[arg(long)]
    pub exit_cap_override: Option<String>,

    /// Interest rate slider override
    #[arg(long)]
    pub interest_rate_override: Option<String>,
}

impl UnderwriteArgs {
    fn overrides(&self) -> SensitivityParameters {
        let raw = |v: &Option<String>| v.as_deref().map(RawValue::from);
        SensitivityParameters {
            vacancy: raw(&self.vacancy_override),
            rent_growth: raw(&self.rent_growth_override),
            expense_growth: raw(&self.expense_growth_override),
            exit_cap_rate: raw(&self.exit_cap_override),
            interest_rate: raw(&self.interest_rate_override),
        }
    }
}

pub fn run_underwrite(
    args: UnderwriteArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    // A file may hold a full request ({deal, sensitivity}) or a bare deal
    let mut request: UnderwriteRequest = match args.deal.json_source()? {
        Some(value) if value.get("deal").is_some() => serde_json::from_value(value)?,
        Some(value) => UnderwriteRequest {
            deal: serde_json::from_value(value)?,
            sensitivity: None,
        },
        None => UnderwriteRequest {
            deal: args.deal.load()?,
            sensitivity: None,
        },
    };

    let flags = args.overrides();
    if !flags.is_empty() {
        let mut merged = request.sensitivity.take().unwrap_or_default();
        merge_overrides(&mut merged, flags);
        request.sensitivity = Some(merged);
    }

    let result = underwrite(&request, config)?;
    Ok(serde_json::to_value(result)?)
}

/// Command-line sliders take precedence over those in the request file.
fn merge_overrides(base: &mut SensitivityParameters, flags: SensitivityParameters) {
    if flags.vacancy.is_some() {
        base.vacancy = flags.vacancy;
    }
    if flags.rent_growth.is_some() {
        base.rent_growth = flags.rent_growth;
    }
    if flags.expense_growth.is_some() {
        base.expense_growth = flags.expense_growth;
    }
    if flags.exit_cap_rate.is_some() {
        base.exit_cap_rate = flags.exit_cap_rate;
    }
    if flags.interest_rate.is_some() {
        base.interest_rate = flags.interest_rate;
    }
}
