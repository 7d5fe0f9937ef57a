//! Orchestrator configuration
//!
//! Service base URLs come from the environment (optionally via `.env`);
//! everything else has fixed defaults that callers may override.

use crate::error::OrchestrationError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_INTENT: &str = "general_financial_query";
pub const DEFAULT_TARGET_INFO: &[&str] = &["risk", "earnings"];
pub const DEFAULT_RETRIEVAL_TOP_K: usize = 5;

const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(60);

/// Base URLs of the downstream services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUrls {
    pub api: String,
    pub scraping: String,
    pub retriever: String,
    pub language: String,
    pub analysis: String,
    pub voice: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            api: "http://localhost:8000".to_string(),
            scraping: "http://localhost:8001".to_string(),
            retriever: "http://localhost:8002".to_string(),
            language: "http://localhost:8003".to_string(),
            analysis: "http://localhost:8004".to_string(),
            voice: "http://localhost:8005".to_string(),
        }
    }
}

impl ServiceUrls {
    /// Read `*_SERVICE_URL` variables, falling back to the localhost defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api: env_url("API_SERVICE_URL", defaults.api),
            scraping: env_url("SCRAPING_SERVICE_URL", defaults.scraping),
            retriever: env_url("RETRIEVER_SERVICE_URL", defaults.retriever),
            language: env_url("LANGUAGE_SERVICE_URL", defaults.language),
            analysis: env_url("ANALYSIS_SERVICE_URL", defaults.analysis),
            voice: env_url("VOICE_SERVICE_URL", defaults.voice),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("api", &self.api),
            ("scraping", &self.scraping),
            ("retriever", &self.retriever),
            ("language", &self.language),
            ("analysis", &self.analysis),
            ("voice", &self.voice),
        ]
    }
}

fn env_url(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Fixed intent fields attached to every parsed query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefaults {
    pub intent: String,
    pub target_info: Vec<String>,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            intent: DEFAULT_INTENT.to_string(),
            target_info: DEFAULT_TARGET_INFO.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub services: ServiceUrls,
    pub query_defaults: QueryDefaults,

    /// Timeout applied to GET requests
    pub get_timeout: Duration,

    /// Timeout applied to POST requests
    pub post_timeout: Duration,

    pub retrieval_top_k: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            services: ServiceUrls::default(),
            query_defaults: QueryDefaults::default(),
            get_timeout: DEFAULT_GET_TIMEOUT,
            post_timeout: DEFAULT_POST_TIMEOUT,
            retrieval_top_k: DEFAULT_RETRIEVAL_TOP_K,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            services: ServiceUrls::from_env(),
            ..Self::default()
        };
        config.validate()?;
        config.log_summary();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in self.services.entries() {
            let parsed = reqwest::Url::parse(url).map_err(|e| {
                OrchestrationError::ConfigError(format!(
                    "{} service URL '{}' is invalid: {}",
                    name, url, e
                ))
            })?;

            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(OrchestrationError::ConfigError(format!(
                    "{} service URL '{}' must use http or https",
                    name, url
                )));
            }
        }

        if self.get_timeout.is_zero() || self.post_timeout.is_zero() {
            return Err(OrchestrationError::ConfigError(
                "Request timeouts must be non-zero".to_string(),
            ));
        }

        if self.retrieval_top_k == 0 {
            return Err(OrchestrationError::ConfigError(
                "retrieval_top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn log_summary(&self) {
        info!("Orchestrator configured with service URLs:");
        for (name, url) in self.services.entries() {
            info!(service = name, url = %url, "Service endpoint");
        }
    }
}
