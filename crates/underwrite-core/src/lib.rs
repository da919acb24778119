pub mod audit;
pub mod config;
pub mod deal;
pub mod error;
pub mod format;
pub mod normalize;
pub mod proforma;
pub mod time_value;
pub mod types;
pub mod underwrite;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "digest")]
pub mod digest;

pub use audit::{audit_deal, AuditCategory, AuditFinding, AuditReport, AuditStatus};
pub use config::{AuditThresholds, EngineConfig, ProjectionDefaults};
pub use deal::{DealInput, LoanType, SensitivityParameters};
pub use error::UnderwriteError;
pub use proforma::{project_deal, Anchor, Projection, ProjectionResult};
pub use types::*;
pub use underwrite::{underwrite, UnderwriteRequest, UnderwritingReport};

#[cfg(feature = "sensitivity")]
pub use sensitivity::sensitivity_grid;

#[cfg(feature = "digest")]
pub use digest::deal_digest;

/// Standard result type for all underwriting operations
pub type UnderwriteResult<T> = Result<T, UnderwriteError>;
