//! Every default assumption and audit threshold in one place.
//!
//! Files may set any subset of fields; the rest keep their defaults.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::UnderwriteError;
use crate::types::{Multiple, Rate};
use crate::UnderwriteResult;

/// Longest loan term the projection will amortize over.
pub const MAX_AMORTIZATION_YEARS: u32 = 50;

/// Exit cap rates below this are treated as missing.
pub const MIN_EXIT_CAP_RATE: Rate = dec!(0.001);

/// Engine configuration: projection defaults plus audit thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub projection: ProjectionDefaults,
    pub audit: AuditThresholds,
}

/// Defaults applied when a deal leaves an assumption blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionDefaults {
    pub vacancy_rate: Rate,
    pub management_rate: Rate,
    pub opex_heuristic_ratio: Rate,
    pub rent_growth: Rate,
    pub expense_growth: Rate,
    pub insurance_growth: Rate,
    pub maintenance_growth: Rate,
    pub interest_rate: Rate,
    pub amortization_years: u32,
    pub exit_cap_rate: Rate,
    pub sale_commission_rate: Rate,
    pub preferred_return: Rate,
    pub profit_share: Rate,
    pub irr_guess: Rate,
}

impl Default for ProjectionDefaults {
    fn default() -> Self {
        Self {
            vacancy_rate: dec!(0.06),
            management_rate: dec!(0.02),
            opex_heuristic_ratio: dec!(0.42),
            rent_growth: dec!(0.03),
            expense_growth: dec!(0.03),
            insurance_growth: dec!(0.05),
            maintenance_growth: dec!(0.02),
            interest_rate: dec!(0.07),
            amortization_years: 30,
            exit_cap_rate: dec!(0.07),
            sale_commission_rate: dec!(0.02),
            preferred_return: dec!(0.08),
            profit_share: dec!(0.45),
            irr_guess: dec!(0.15),
        }
    }
}

/// Inclusive `[min, max]` band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: Decimal,
    pub max: Decimal,
}

impl Band {
    pub const fn new(min: Decimal, max: Decimal) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Thresholds and scoring constants for the audit battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditThresholds {
    pub expense_ratio: Band,
    pub vacancy: Band,
    pub ltv: Band,
    pub interest_rate: Band,
    pub dscr_pass: Decimal,
    pub dscr_warn: Decimal,
    pub target_irr: Rate,
    pub min_equity_multiple: Multiple,
    pub yearly_min_dscr: Decimal,
    pub yearly_target_dscr: Decimal,
    pub cap_rate: Band,
    pub min_debt_yield: Rate,
    pub noi_stress: Rate,
    pub debt_service_stress: Rate,
    pub min_cash_flow_margin: Rate,
    pub max_noi_decline: Rate,
    pub vacancy_sanity: Band,
    pub rent_growth_sanity: Band,
    pub expense_growth_sanity: Band,
    pub exit_cap_sanity: Band,
    pub max_irr: Rate,
    pub year1_dscr_sanity: Band,
    pub fail_penalty: Decimal,
    pub warn_penalty: Decimal,
    pub warn_summary_threshold: u32,
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            expense_ratio: Band::new(dec!(0.30), dec!(0.60)),
            vacancy: Band::new(dec!(0.02), dec!(0.15)),
            ltv: Band::new(dec!(0.55), dec!(0.80)),
            interest_rate: Band::new(dec!(0.04), dec!(0.12)),
            dscr_pass: dec!(1.20),
            dscr_warn: dec!(1.05),
            target_irr: dec!(0.12),
            min_equity_multiple: dec!(1.5),
            yearly_min_dscr: dec!(1.0),
            yearly_target_dscr: dec!(1.2),
            cap_rate: Band::new(dec!(0.04), dec!(0.12)),
            min_debt_yield: dec!(0.08),
            noi_stress: dec!(0.05),
            debt_service_stress: dec!(0.08),
            min_cash_flow_margin: dec!(0.10),
            max_noi_decline: dec!(0.10),
            vacancy_sanity: Band::new(dec!(0), dec!(0.30)),
            rent_growth_sanity: Band::new(dec!(-0.05), dec!(0.10)),
            expense_growth_sanity: Band::new(dec!(-0.05), dec!(0.10)),
            exit_cap_sanity: Band::new(dec!(0.03), dec!(0.15)),
            max_irr: dec!(0.40),
            year1_dscr_sanity: Band::new(dec!(0.8), dec!(2.0)),
            fail_penalty: dec!(4),
            warn_penalty: dec!(1.5),
            warn_summary_threshold: 10,
        }
    }
}

impl EngineConfig {
    /// Reject configurations that would make the projection meaningless.
    pub fn validate(&self) -> UnderwriteResult<()> {
        let p = &self.projection;

        if p.amortization_years == 0 || p.amortization_years > MAX_AMORTIZATION_YEARS {
            return Err(invalid("projection.amortization_years", "must be 1 to 50 years"));
        }
        if p.exit_cap_rate < MIN_EXIT_CAP_RATE || p.exit_cap_rate > Decimal::ONE {
            return Err(invalid("projection.exit_cap_rate", "must be between 0.1% and 100%"));
        }
        for (field, value) in [
            ("projection.opex_heuristic_ratio", p.opex_heuristic_ratio),
            ("projection.rent_growth", p.rent_growth),
            ("projection.expense_growth", p.expense_growth),
            ("projection.insurance_growth", p.insurance_growth),
            ("projection.maintenance_growth", p.maintenance_growth),
            ("projection.interest_rate", p.interest_rate),
            ("projection.preferred_return", p.preferred_return),
        ] {
            if value.abs() > Decimal::ONE {
                return Err(invalid(field, "must be in [-1, 1]"));
            }
        }
        if p.vacancy_rate < Decimal::ZERO || p.vacancy_rate >= Decimal::ONE {
            return Err(invalid("projection.vacancy_rate", "must be in [0, 1)"));
        }
        for (field, value) in [
            ("projection.management_rate", p.management_rate),
            ("projection.sale_commission_rate", p.sale_commission_rate),
            ("projection.profit_share", p.profit_share),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(invalid(field, "must be in [0, 1]"));
            }
        }
        if p.irr_guess <= dec!(-0.99) {
            return Err(invalid("projection.irr_guess", "must be greater than -99%"));
        }

        let a = &self.audit;
        for (field, band) in [
            ("audit.expense_ratio", a.expense_ratio),
            ("audit.vacancy", a.vacancy),
            ("audit.ltv", a.ltv),
            ("audit.interest_rate", a.interest_rate),
            ("audit.cap_rate", a.cap_rate),
            ("audit.vacancy_sanity", a.vacancy_sanity),
            ("audit.rent_growth_sanity", a.rent_growth_sanity),
            ("audit.expense_growth_sanity", a.expense_growth_sanity),
            ("audit.exit_cap_sanity", a.exit_cap_sanity),
            ("audit.year1_dscr_sanity", a.year1_dscr_sanity),
        ] {
            if band.min > band.max {
                return Err(invalid(field, "min must be <= max"));
            }
        }
        if a.dscr_warn > a.dscr_pass {
            return Err(invalid("audit.dscr_warn", "must not exceed audit.dscr_pass"));
        }
        for (field, value) in [
            ("audit.noi_stress", a.noi_stress),
            ("audit.debt_service_stress", a.debt_service_stress),
            ("audit.max_noi_decline", a.max_noi_decline),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(invalid(field, "must be in [0, 1]"));
            }
        }
        for (field, value) in [
            ("audit.fail_penalty", a.fail_penalty),
            ("audit.warn_penalty", a.warn_penalty),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(invalid(field, "must be in [0, 100]"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> UnderwriteError {
    UnderwriteError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"projection": {"vacancy_rate": "0.08"}}"#).unwrap();
        assert_eq!(cfg.projection.vacancy_rate, dec!(0.08));
        assert_eq!(cfg.projection.profit_share, dec!(0.45));
        assert_eq!(cfg.audit, AuditThresholds::default());
    }

    #[test]
    fn test_zero_exit_cap_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.projection.exit_cap_rate = Decimal::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_out_of_range_defaults_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.projection.amortization_years = 51;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.projection.rent_growth = dec!(2);
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.audit.noi_stress = dec!(1.5);
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.audit.fail_penalty = dec!(1000);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.audit.ltv = Band::new(dec!(0.9), dec!(0.5));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_band_is_inclusive() {
        let band = Band::new(dec!(0.30), dec!(0.60));
        assert!(band.contains(dec!(0.30)));
        assert!(band.contains(dec!(0.60)));
        assert!(!band.contains(dec!(0.61)));
    }
}
