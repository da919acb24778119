use napi::Result as NapiResult;
use napi_derive::napi;

use underwrite_core::deal::DealInput;
use underwrite_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional engine configuration; absent means defaults.
fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    let config: EngineConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

fn parse_deal(input_json: &str) -> NapiResult<DealInput> {
    DealInput::from_json(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projection & audit
// ---------------------------------------------------------------------------

#[napi]
pub fn project_deal(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let projection = underwrite_core::project_deal(&parse_deal(&input_json)?, &config.projection);
    serde_json::to_string(&projection).map_err(to_napi_error)
}

#[napi]
pub fn audit_deal(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let deal = parse_deal(&input_json)?;
    let projection = underwrite_core::project_deal(&deal, &config.projection);
    let report = underwrite_core::audit_deal(&deal, &projection, &config.audit);
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[napi]
pub fn underwrite_deal(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let request: underwrite_core::UnderwriteRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwrite_core::underwrite(&request, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity & digest
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_grid(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: underwrite_core::sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = underwrite_core::sensitivity_grid(&input, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn deal_digest(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let deal = parse_deal(&input_json)?;
    let projection = underwrite_core::project_deal(&deal, &config.projection);
    Ok(underwrite_core::deal_digest(&deal, &projection))
}
