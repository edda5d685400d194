//! Gateway settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. serde defaults below,
//! 2. the YAML / TOML / JSON file named by `COORDINATOR_CONFIG` (optional),
//! 3. `COORDINATOR__<SECTION>__<KEY>` environment variables.
//!
//! ```yaml
//! server:
//!   port: 3000
//! dispatch:
//!   forward_timeout_ms: 30000
//! routing:
//!   acceptance_threshold: 0.3
//! decision:
//!   engine: keyword
//!   rules:
//!     - { keyword: payment, service: payments, confidence: 0.8 }
//! logging:
//!   format: json
//! ```

use crate::forward::{DEFAULT_FORWARD_TIMEOUT, DEFAULT_ROUTED_BY};
use crate::orchestrator::DEFAULT_MAX_IN_FLIGHT;
use crate::routing::keyword::DEFAULT_CAPABILITY_CONFIDENCE;
use crate::routing::remote::DEFAULT_DECISION_TIMEOUT;
use crate::routing::{
    DEFAULT_ACCEPTANCE_THRESHOLD, KeywordDecisionEngine, KeywordRule, RemoteDecisionEngine,
};
use coordinator_kernel::config::{ConfigError, load_layered};
use coordinator_kernel::{DecisionEngine, RoutingMode, RoutingStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the optional settings file.
pub const CONFIG_PATH_ENV: &str = "COORDINATOR_CONFIG";

/// Prefix of per-key environment overrides.
pub const ENV_PREFIX: &str = "COORDINATOR";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] ConfigError),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub server: ServerSettings,
    pub dispatch: DispatchSettings,
    pub routing: RoutingSettings,
    pub decision: DecisionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub forward_timeout_ms: u64,
    pub max_in_flight: usize,
    pub routed_by: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            forward_timeout_ms: DEFAULT_FORWARD_TIMEOUT.as_millis() as u64,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            routed_by: DEFAULT_ROUTED_BY.to_string(),
        }
    }
}

impl DispatchSettings {
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_millis(self.forward_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    pub acceptance_threshold: f64,
    pub mode: RoutingMode,
    pub priority: String,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        let strategy = RoutingStrategy::default();
        Self {
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            mode: strategy.mode,
            priority: strategy.priority,
        }
    }
}

impl RoutingSettings {
    pub fn strategy(&self) -> RoutingStrategy {
        RoutingStrategy::default()
            .with_mode(self.mode)
            .with_priority(&self.priority)
    }
}

/// Which decision engine ranks candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum DecisionSettings {
    Keyword {
        #[serde(default)]
        rules: Vec<KeywordRule>,
        #[serde(default = "default_capability_confidence")]
        capability_confidence: f64,
    },
    Remote {
        url: String,
        #[serde(default = "default_decision_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for DecisionSettings {
    fn default() -> Self {
        DecisionSettings::Keyword {
            rules: Vec::new(),
            capability_confidence: DEFAULT_CAPABILITY_CONFIDENCE,
        }
    }
}

fn default_capability_confidence() -> f64 {
    DEFAULT_CAPABILITY_CONFIDENCE
}

fn default_decision_timeout_ms() -> u64 {
    DEFAULT_DECISION_TIMEOUT.as_millis() as u64
}

impl DecisionSettings {
    /// Instantiate the configured engine.
    pub fn build_engine(&self) -> Arc<dyn DecisionEngine> {
        match self {
            DecisionSettings::Keyword {
                rules,
                capability_confidence,
            } => Arc::new(
                KeywordDecisionEngine::new(rules.clone())
                    .with_capability_confidence(*capability_confidence),
            ),
            DecisionSettings::Remote { url, timeout_ms } => Arc::new(
                RemoteDecisionEngine::new(url).with_timeout(Duration::from_millis(*timeout_ms)),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

impl GatewaySettings {
    /// Load from the layered sources and validate.
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref(), ENV_PREFIX)
    }

    pub fn load_from(path: Option<&str>, env_prefix: &str) -> Result<Self, SettingsError> {
        let settings: Self = load_layered(path, env_prefix)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let threshold = self.routing.acceptance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SettingsError::Invalid(format!(
                "routing.acceptance_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.dispatch.forward_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "dispatch.forward_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.dispatch.max_in_flight == 0 {
            return Err(SettingsError::Invalid(
                "dispatch.max_in_flight must be greater than zero".to_string(),
            ));
        }
        if let DecisionSettings::Remote { url, timeout_ms } = &self.decision {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SettingsError::Invalid(format!(
                    "decision.url must be an http(s) URL, got '{url}'"
                )));
            }
            if *timeout_ms == 0 {
                return Err(SettingsError::Invalid(
                    "decision.timeout_ms must be greater than zero".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
