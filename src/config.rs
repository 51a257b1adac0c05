use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::normalize::types::BID_MARKETS;

/// Knobs of the normalization pipeline.
///
/// Stored as a JSON object on disk; omitted keys take their defaults:
/// ```json
/// {
///   "marker_column": "HU",
///   "countries": ["US", "MX", "CA"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bid column checked for `ERROR...` markers. Upstream failures always
    /// corrupt the first market column, so that is the default.
    pub marker_column: String,
    /// Markets kept in the reshaped output.
    pub countries: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            marker_column: BID_MARKETS[0].to_string(),
            countries: vec!["US".to_string(), "MX".to_string(), "CA".to_string()],
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_default_uses_first_market_and_north_america() {
        let config = PipelineConfig::default();
        assert_eq!(config.marker_column, "HU");
        assert_eq!(config.countries, vec!["US", "MX", "CA"]);
    }

    #[test]
    fn test_load_fills_missing_keys() {
        let path = temp_path("motel_bids_test_config.json");
        fs::write(&path, r#"{ "countries": ["DE"] }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.marker_column, "HU");
        assert_eq!(config.countries, vec!["DE"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = PipelineConfig::load(&temp_path("motel_bids_no_such_config.json")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
