use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::EngineConfig;
use crate::deal::{DealInput, SensitivityParameters};
use crate::error::UnderwriteError;
use crate::normalize::RawValue;
use crate::proforma::{project_deal, ProjectionResult};
use crate::types::{with_metadata, ComputationOutput};
use crate::UnderwriteResult;

const MAX_CELLS: usize = 10_000;

/// The what-if sliders a grid can sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliderVariable {
    Vacancy,
    RentGrowth,
    ExpenseGrowth,
    ExitCapRate,
    InterestRate,
}

impl SliderVariable {
    fn apply(&self, overrides: &mut SensitivityParameters, value: Decimal) {
        let value = Some(RawValue::Number(value));
        match self {
            SliderVariable::Vacancy => overrides.vacancy = value,
            SliderVariable::RentGrowth => overrides.rent_growth = value,
            SliderVariable::ExpenseGrowth => overrides.expense_growth = value,
            SliderVariable::ExitCapRate => overrides.exit_cap_rate = value,
            SliderVariable::InterestRate => overrides.interest_rate = value,
        }
    }

    /// Value the base projection actually ran with.
    fn base_value(&self, result: &ProjectionResult) -> Decimal {
        let a = &result.assumptions;
        match self {
            SliderVariable::Vacancy => a.vacancy_rate,
            SliderVariable::RentGrowth => a.rent_growth,
            SliderVariable::ExpenseGrowth => a.expense_growth,
            SliderVariable::ExitCapRate => a.exit_cap_rate,
            SliderVariable::InterestRate => a.interest_rate,
        }
    }
}

/// Output metric read from each cell's projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridMetric {
    #[default]
    Irr,
    CashOnCash,
    EquityMultiple,
    Year1Dscr,
    NetSaleProceeds,
}

impl GridMetric {
    fn read(&self, result: &ProjectionResult) -> Decimal {
        match self {
            GridMetric::Irr => result.metrics.irr.rate,
            GridMetric::CashOnCash => result.metrics.cash_on_cash,
            GridMetric::EquityMultiple => result.metrics.equity_multiple,
            GridMetric::Year1Dscr => result.metrics.year1_dscr,
            GridMetric::NetSaleProceeds => result.exit.net_sale_proceeds,
        }
    }
}

/// Sweep range for one slider. Values are fractions (0.05 = 5%).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub variable: SliderVariable,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub deal: DealInput,
    pub variable_1: SensitivityVariable,
    pub variable_2: SensitivityVariable,
    #[serde(default)]
    pub metric: GridMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1: SliderVariable,
    pub variable_2: SliderVariable,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub metric: GridMetric,
    /// Matrix[i][j] = metric when variable_1 = values_1[i], variable_2 = values_2[j];
    /// None where the cell could not be projected
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Metric for the deal with no overrides
    pub base_case_value: Decimal,
    /// Cell nearest the base-case assumptions (row, col)
    pub base_case_position: (usize, usize),
}

fn invalid(var: &SensitivityVariable, reason: &str) -> UnderwriteError {
    UnderwriteError::InvalidInput {
        field: format!("variable:{:?}", var.variable),
        reason: reason.into(),
    }
}

/// Values from min to max by step, always ending on max.
fn sweep_values(var: &SensitivityVariable) -> UnderwriteResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(invalid(var, "Step must be positive"));
    }
    if var.min > var.max {
        return Err(invalid(var, "Min must be <= max"));
    }

    let steps = var
        .max
        .checked_sub(var.min)
        .and_then(|span| span.checked_div(var.step))
        .map(|n| n.floor());
    match steps {
        Some(n) if n < Decimal::from(MAX_CELLS) => {}
        _ => return Err(invalid(var, "Too many sweep values")),
    }

    let mut values = Vec::new();
    let mut current = Some(var.min);
    while let Some(value) = current.filter(|v| *v <= var.max) {
        values.push(value);
        current = value.checked_add(var.step);
    }
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| v.checked_sub(target).map_or(Decimal::MAX, |d| d.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Two-way grid of a projection metric over two sliders.
pub fn sensitivity_grid(
    input: &SensitivityInput,
    config: &EngineConfig,
) -> UnderwriteResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    config.validate()?;

    if input.variable_1.variable == input.variable_2.variable {
        return Err(invalid(&input.variable_2, "Must differ from variable_1"));
    }
    let v1_values = sweep_values(&input.variable_1)?;
    let v2_values = sweep_values(&input.variable_2)?;
    let cells = v1_values.len() * v2_values.len();
    if cells > MAX_CELLS {
        return Err(UnderwriteError::InvalidInput {
            field: "variable_2".into(),
            reason: format!("Grid of {cells} cells exceeds {MAX_CELLS}"),
        });
    }

    let base = project_deal(&input.deal, &config.projection);
    let base = base.result().ok_or_else(|| {
        UnderwriteError::InsufficientData(
            "Base deal lacks purchase price, gross income or loan amount".into(),
        )
    })?;

    let mut warnings = Vec::new();
    let mut matrix = Vec::with_capacity(v1_values.len());
    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            let mut overrides = SensitivityParameters::default();
            input.variable_1.variable.apply(&mut overrides, *v1);
            input.variable_2.variable.apply(&mut overrides, *v2);

            let projection = project_deal(&input.deal.with_sensitivity(&overrides), &config.projection);
            match projection.result() {
                Some(result) => row.push(Some(input.metric.read(result))),
                None => {
                    warnings.push(format!("Cell ({v1}, {v2}) could not be projected"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }
    debug!(cells, "sensitivity grid evaluated");

    let base_row = closest_index(&v1_values, input.variable_1.variable.base_value(base));
    let base_col = closest_index(&v2_values, input.variable_2.variable.base_value(base));

    let output = SensitivityOutput {
        variable_1: input.variable_1.variable,
        variable_2: input.variable_2.variable,
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        metric: input.metric,
        matrix,
        base_case_value: input.metric.read(base),
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-Way Pro Forma Sensitivity",
        &serde_json::json!({
            "variable_1": input.variable_1,
            "variable_2": input.variable_2,
            "metric": input.metric,
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

    fn deal() -> DealInput {
        DealInput {
            asking_price: Some("1000000".into()),
            gross_income: Some("150000".into()),
            occupancy: Some("95".into()),
            opex: Some("50000".into()),
            ltv: Some("70".into()),
            interest_rate: Some("6".into()),
            ..Default::default()
        }
    }

    fn axis(variable: SliderVariable, min: Decimal, max: Decimal, step: Decimal) -> SensitivityVariable {
        SensitivityVariable {
            variable,
            min,
            max,
            step,
        }
    }

    #[test]
    fn test_sweep_includes_max() {
        let values =
            sweep_values(&axis(SliderVariable::Vacancy, dec!(0.02), dec!(0.07), dec!(0.02))).unwrap();
        assert_eq!(values, vec![dec!(0.02), dec!(0.04), dec!(0.06), dec!(0.07)]);
    }

    #[test]
    fn test_sweep_rejects_bad_step() {
        assert!(sweep_values(&axis(SliderVariable::Vacancy, dec!(0), dec!(1), dec!(0))).is_err());
        assert!(sweep_values(&axis(SliderVariable::Vacancy, dec!(1), dec!(0), dec!(0.1))).is_err());
    }

    #[test]
    fn test_sweep_rejects_unrepresentable_span() {
        let wide = axis(SliderVariable::Vacancy, Decimal::MIN, Decimal::MAX, dec!(1));
        assert!(sweep_values(&wide).is_err());
        let fine = axis(SliderVariable::Vacancy, dec!(0), dec!(1000000), dec!(0.0000000000000000000001));
        assert!(sweep_values(&fine).is_err());
    }

    #[test]
    fn test_sweep_stops_at_decimal_max() {
        let values = sweep_values(&axis(SliderVariable::Vacancy, Decimal::MAX, Decimal::MAX, dec!(1))).unwrap();
        assert_eq!(values, vec![Decimal::MAX]);
        assert_eq!(closest_index(&values, Decimal::MIN), 0);
    }

    #[test]
    fn test_grid_irr_falls_with_exit_cap() {
        let input = SensitivityInput {
            deal: deal(),
            variable_1: axis(SliderVariable::ExitCapRate, dec!(0.06), dec!(0.08), dec!(0.01)),
            variable_2: axis(SliderVariable::Vacancy, dec!(0.05), dec!(0.10), dec!(0.05)),
            metric: GridMetric::Irr,
        };
        let out = sensitivity_grid(&input, &EngineConfig::default()).unwrap().result;
        assert_eq!(out.matrix.len(), 3);
        assert_eq!(out.matrix[0].len(), 2);

        let low_cap = out.matrix[0][0].unwrap();
        let high_cap = out.matrix[2][0].unwrap();
        assert!(low_cap > high_cap, "{low_cap} should exceed {high_cap}");

        // Base case: exit cap defaults to 7%, occupancy 95% → vacancy 5%
        assert_eq!(out.base_case_position, (1, 0));
    }

    #[test]
    fn test_identical_variables_rejected() {
        let input = SensitivityInput {
            deal: deal(),
            variable_1: axis(SliderVariable::Vacancy, dec!(0.05), dec!(0.10), dec!(0.05)),
            variable_2: axis(SliderVariable::Vacancy, dec!(0.05), dec!(0.10), dec!(0.05)),
            metric: GridMetric::Irr,
        };
        assert!(sensitivity_grid(&input, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_incomplete_base_is_insufficient_data() {
        let input = SensitivityInput {
            deal: DealInput::default(),
            variable_1: axis(SliderVariable::Vacancy, dec!(0.05), dec!(0.10), dec!(0.05)),
            variable_2: axis(SliderVariable::InterestRate, dec!(0.05), dec!(0.07), dec!(0.01)),
            metric: GridMetric::CashOnCash,
        };
        match sensitivity_grid(&input, &EngineConfig::default()) {
            Err(UnderwriteError::InsufficientData(_)) => {}
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let input = SensitivityInput {
            deal: deal(),
            variable_1: axis(SliderVariable::Vacancy, dec!(0), dec!(0.2), dec!(0.0001)),
            variable_2: axis(SliderVariable::InterestRate, dec!(0.04), dec!(0.08), dec!(0.001)),
            metric: GridMetric::Irr,
        };
        assert!(sensitivity_grid(&input, &EngineConfig::default()).is_err());
    }
}
