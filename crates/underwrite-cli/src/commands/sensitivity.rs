use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use underwrite_core::sensitivity::{
    self, GridMetric, SensitivityInput, SensitivityVariable, SliderVariable,
};
use underwrite_core::EngineConfig;

use crate::commands::deal::DealArgs;

/// Arguments for a two-way sensitivity grid
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub deal: DealArgs,

    /// First slider in format name:min:max:step
    /// (e.g. "vacancy:0.04:0.10:0.01")
    #[arg(long, allow_hyphen_values = true)]
    pub var1: Option<String>,

    /// Second slider in the same format (e.g. "exit_cap_rate:0.06:0.08:0.005")
    #[arg(long, allow_hyphen_values = true)]
    pub var2: Option<String>,

    /// Metric: irr, cash_on_cash, equity_multiple, year1_dscr, net_sale_proceeds
    #[arg(long, default_value = "irr")]
    pub metric: String,
}

fn parse_slider(spec: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("Sensitivity variable must be name:min:max:step, got '{spec}'").into());
    }
    let variable: SliderVariable = serde_json::from_value(Value::String(parts[0].to_string()))
        .map_err(|_| {
            format!(
                "Unknown slider '{}': expected vacancy, rent_growth, expense_growth, exit_cap_rate or interest_rate",
                parts[0]
            )
        })?;
    Ok(SensitivityVariable {
        variable,
        min: parts[1].parse::<Decimal>()?,
        max: parts[2].parse::<Decimal>()?,
        step: parts[3].parse::<Decimal>()?,
    })
}

fn parse_metric(name: &str) -> Result<GridMetric, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(name.to_string()))
        .map_err(|_| format!("Unknown metric '{name}'").into())
}

pub fn run_sensitivity(
    args: SensitivityArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let input: SensitivityInput = match args.deal.json_source()? {
        // A complete grid request
        Some(value) if value.get("variable_1").is_some() => serde_json::from_value(value)?,
        source => {
            let deal = match source {
                Some(value) => serde_json::from_value(value)?,
                None => args.deal.load()?,
            };
            let var1 = args.var1.as_deref().ok_or("--var1 is required (or provide a grid request)")?;
            let var2 = args.var2.as_deref().ok_or("--var2 is required (or provide a grid request)")?;
            SensitivityInput {
                deal,
                variable_1: parse_slider(var1)?,
                variable_2: parse_slider(var2)?,
                metric: parse_metric(&args.metric)?,
            }
        }
    };

    let result = sensitivity::sensitivity_grid(&input, config)?;
    Ok(serde_json::to_value(result)?)
}
