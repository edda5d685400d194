//! HTTP client for an external decision service.
//!
//! Request sent to the configured URL:
//!
//! ```text
//! POST {url}
//! { "query": "...",
//!   "candidates": [{ "name", "version", "status", "metadata" }, ...],
//!   "strategy": { "mode": "single", "priority": "accuracy" } }
//! ```
//!
//! Expected answer: `{ "candidates": [{ "service_name", "confidence", "reasoning" }] }`.

use async_trait::async_trait;
use coordinator_kernel::{
    DecisionEngine, DecisionError, RoutedCandidate, RoutingStrategy, ServiceRecord,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(10);

const ENGINE_NAME: &str = "remote";

#[derive(Serialize)]
struct DecideRequest<'a> {
    query: &'a str,
    candidates: Vec<CandidateSummary<'a>>,
    strategy: &'a RoutingStrategy,
}

#[derive(Serialize)]
struct CandidateSummary<'a> {
    name: &'a str,
    version: &'a str,
    status: &'a str,
    metadata: &'a Map<String, Value>,
}

#[derive(Deserialize)]
struct DecideResponse {
    candidates: Vec<RoutedCandidate>,
}

/// [`DecisionEngine`] that delegates ranking to a remote service.
pub struct RemoteDecisionEngine {
    url: String,
    timeout: Duration,
    client: Client,
}

impl RemoteDecisionEngine {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_DECISION_TIMEOUT,
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn unavailable(reason: impl ToString) -> DecisionError {
        DecisionError::Unavailable {
            engine: ENGINE_NAME.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl DecisionEngine for RemoteDecisionEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    #[instrument(skip_all, fields(url = %self.url, pool = candidates.len()))]
    async fn decide(
        &self,
        query: &str,
        candidates: &[ServiceRecord],
        strategy: &RoutingStrategy,
    ) -> Result<Vec<RoutedCandidate>, DecisionError> {
        let body = DecideRequest {
            query,
            candidates: candidates
                .iter()
                .map(|r| CandidateSummary {
                    name: &r.name,
                    version: &r.version,
                    status: r.status.as_str(),
                    metadata: &r.metadata,
                })
                .collect(),
            strategy,
        };

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::unavailable(format!("decision service returned HTTP {status}")));
        }

        let text = response.text().await.map_err(Self::unavailable)?;
        let parsed: DecideResponse =
            serde_json::from_str(&text).map_err(|e| DecisionError::InvalidResponse {
                engine: ENGINE_NAME.to_string(),
                reason: e.to_string(),
            })?;
        debug!(returned = parsed.candidates.len(), "Remote decision received");
        Ok(parsed.candidates)
    }
}
