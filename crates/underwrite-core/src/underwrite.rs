use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::audit::{audit_deal, AuditReport};
use crate::config::EngineConfig;
use crate::deal::{DealInput, SensitivityParameters};
use crate::proforma::{project_deal, Projection};
use crate::types::{with_metadata, ComputationOutput};
use crate::UnderwriteResult;

const METHODOLOGY: &str = "Five-Year Pro Forma & Underwriting Audit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnderwriteRequest {
    pub deal: DealInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<SensitivityParameters>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderwritingReport {
    pub projection: Projection,
    pub audit: AuditReport,
}

/// Project and audit a deal, wrapped in the standard output envelope.
pub fn underwrite(
    request: &UnderwriteRequest,
    config: &EngineConfig,
) -> UnderwriteResult<ComputationOutput<UnderwritingReport>> {
    let start = Instant::now();
    config.validate()?;

    let deal = match &request.sensitivity {
        Some(overrides) if !overrides.is_empty() => request.deal.with_sensitivity(overrides),
        _ => request.deal.clone(),
    };

    let projection = project_deal(&deal, &config.projection);
    let audit = audit_deal(&deal, &projection, &config.audit);

    let (assumptions, warnings) = match &projection {
        Projection::Complete(result) => (
            serde_json::to_value(&result.assumptions)?,
            result.notes.clone(),
        ),
        Projection::Incomplete { missing } => (
            serde_json::json!({ "missing": missing }),
            vec![format!(
                "Projection incomplete; missing {}",
                missing.iter().map(|a| a.label()).collect::<Vec<_>>().join(", ")
            )],
        ),
    };

    info!(
        score = audit.score,
        fails = audit.fail_count,
        warns = audit.warn_count,
        "deal underwritten"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        METHODOLOGY,
        &assumptions,
        warnings,
        elapsed,
        UnderwritingReport { projection, audit },
    ))
}
