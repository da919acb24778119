//! Rule-based underwriting audit.
//!
//! A fixed battery of checks over the deal inputs and the projection, each
//! producing a pass/warn/fail finding, rolled up into a 1-100 score.

mod checks;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuditThresholds;
use crate::deal::DealInput;
use crate::proforma::Projection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Financial,
    Market,
    Debt,
    Returns,
    DataQuality,
    Yearly,
    Anomaly,
    Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub title: String,
    pub status: AuditStatus,
    pub detail: String,
    pub category: AuditCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
    pub score: u32,
    pub pass_count: u32,
    pub warn_count: u32,
    pub fail_count: u32,
    pub summary: String,
}

impl AuditReport {
    pub fn by_category(&self, category: AuditCategory) -> impl Iterator<Item = &AuditFinding> {
        self.findings.iter().filter(move |f| f.category == category)
    }

    pub fn failures(&self) -> impl Iterator<Item = &AuditFinding> {
        self.findings
            .iter()
            .filter(|f| f.status == AuditStatus::Fail)
    }
}

const CRITICAL_SUMMARY: &str =
    "Critical issues found: resolve failing checks before committing capital.";
const WARNING_SUMMARY: &str = "Multiple warnings: review assumptions and fill data gaps.";
const CLEAN_SUMMARY: &str = "Deal passes core underwriting checks.";

/// Run the full battery. An incomplete projection yields a single failing
/// finding and a score of zero.
pub fn audit_deal(deal: &DealInput, projection: &Projection, thresholds: &AuditThresholds) -> AuditReport {
    let result = match projection {
        Projection::Complete(result) => result,
        Projection::Incomplete { missing } => {
            let labels: Vec<&str> = missing.iter().map(|a| a.label()).collect();
            return AuditReport {
                findings: vec![AuditFinding {
                    title: "DCF generated".into(),
                    status: AuditStatus::Fail,
                    detail: format!("Cannot project the deal; missing {}", labels.join(", ")),
                    category: AuditCategory::Projection,
                }],
                score: 0,
                pass_count: 0,
                warn_count: 0,
                fail_count: 1,
                summary: CRITICAL_SUMMARY.into(),
            };
        }
    };

    let findings = checks::run_battery(deal, result, thresholds);
    let count = |status: AuditStatus| findings.iter().filter(|f| f.status == status).count() as u32;
    let pass_count = count(AuditStatus::Pass);
    let warn_count = count(AuditStatus::Warn);
    let fail_count = count(AuditStatus::Fail);

    let summary = if fail_count > 0 {
        CRITICAL_SUMMARY
    } else if warn_count > thresholds.warn_summary_threshold {
        WARNING_SUMMARY
    } else {
        CLEAN_SUMMARY
    };

    let score = score(fail_count, warn_count, thresholds);
    debug!(score, pass_count, warn_count, fail_count, "audit complete");

    AuditReport {
        findings,
        score,
        pass_count,
        warn_count,
        fail_count,
        summary: summary.into(),
    }
}

/// `clamp(1, 100, round(100 − fail_penalty·fails − warn_penalty·warns))`
pub fn score(fail_count: u32, warn_count: u32, thresholds: &AuditThresholds) -> u32 {
    let raw = Decimal::ONE_HUNDRED
        - thresholds.fail_penalty * Decimal::from(fail_count)
        - thresholds.warn_penalty * Decimal::from(warn_count);
    raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ONE, Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proforma::Anchor;

    #[test]
    fn test_score_formula() {
        let t = AuditThresholds::default();
        assert_eq!(score(0, 0, &t), 100);
        assert_eq!(score(1, 0, &t), 96);
        // 100 - 1.5 = 98.5 rounds away from zero
        assert_eq!(score(0, 1, &t), 99);
        assert_eq!(score(2, 3, &t), 88);
        assert_eq!(score(30, 0, &t), 1);
    }

    #[test]
    fn test_incomplete_projection_single_failure() {
        let projection = Projection::Incomplete {
            missing: vec![Anchor::PurchasePrice, Anchor::LoanAmount],
        };
        let report = audit_deal(&DealInput::default(), &projection, &AuditThresholds::default());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.score, 0);
        assert_eq!(report.fail_count, 1);
        assert_eq!(report.findings[0].title, "DCF generated");
        assert_eq!(report.findings[0].category, AuditCategory::Projection);
        assert!(report.findings[0].detail.contains("purchase price, loan amount"));
        assert_eq!(report.summary, CRITICAL_SUMMARY);
    }
}
