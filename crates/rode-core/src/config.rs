//! Service configuration.

use rode_grafeas::GrafeasConfig;
use rode_opa::OpaConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a Rode service instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RodeConfig {
    /// Artifact metadata store.
    #[serde(default)]
    pub grafeas: GrafeasConfig,

    /// Rule engine.
    #[serde(default)]
    pub opa: OpaConfig,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

impl RodeConfig {
    /// Create config from environment variables.
    ///
    /// Reads `RODE_GRAFEAS_*`, `RODE_OPA_*` and `RODE_LOG_JSON`.
    pub fn from_env() -> Self {
        Self {
            grafeas: GrafeasConfig::from_env(),
            opa: OpaConfig::from_env(),
            log_json: std::env::var("RODE_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    pub fn with_grafeas(mut self, grafeas: GrafeasConfig) -> Self {
        self.grafeas = grafeas;
        self
    }

    pub fn with_opa(mut self, opa: OpaConfig) -> Self {
        self.opa = opa;
        self
    }

    pub fn with_log_json(mut self, log_json: bool) -> Self {
        self.log_json = log_json;
        self
    }
}
