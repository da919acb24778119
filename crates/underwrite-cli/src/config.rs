use std::path::Path;

use tracing::debug;
use underwrite_core::EngineConfig;

use crate::input;

/// Load engine configuration from a JSON or YAML file, or defaults when no
/// path is given. Fields missing from the file keep their defaults.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let contents = input::file::read_text(path)?;
    let is_yaml = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

    let config: EngineConfig = if is_yaml {
        serde_yaml::from_str(&contents).map_err(|e| format!("Failed to parse '{path}': {e}"))?
    } else {
        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse '{path}': {e}"))?
    };
    config.validate()?;

    debug!(path, "engine config loaded");
    Ok(config)
}
