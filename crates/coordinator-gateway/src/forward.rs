//! Bounded-timeout relay to a downstream service.
//!
//! [`Forwarder`] POSTs the dispatch body to `{endpoint}/api/fill-content-metrics/`
//! and classifies the outcome.  The whole exchange, including reading the
//! response body, runs under one deadline; when it expires the in-flight
//! future is dropped, which closes the connection and discards any partial
//! response.

use coordinator_kernel::ServiceRecord;
use coordinator_kernel::dispatch::DISPATCH_PATH;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Deadline for one forwarded exchange.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Field used to wrap a downstream body that is not JSON.
pub const RAW_BODY_FIELD: &str = "raw";

pub const REQUESTER_HEADER: &str = "x-requester-service";
pub const ROUTED_BY_HEADER: &str = "x-routed-by";

/// Value of the routed-by header unless configured otherwise.
pub const DEFAULT_ROUTED_BY: &str = "coordinator";

/// Classified forwarding failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ForwardError {
    #[error("request to '{target}' timed out after {}ms", .timeout.as_millis())]
    Timeout { target: String, timeout: Duration },

    #[error("service '{target}' is unreachable: {source}")]
    Unreachable {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Target service returned {status}: {body}")]
    UpstreamStatus {
        target: String,
        status: u16,
        body: String,
    },

    #[error("transport error while talking to '{target}': {source}")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("service '{target}' declared a JSON body that does not parse: {reason}")]
    MalformedBody { target: String, reason: String },
}

impl ForwardError {
    /// Name of the service the failed exchange was addressed to.
    pub fn target(&self) -> &str {
        match self {
            ForwardError::Timeout { target, .. }
            | ForwardError::Unreachable { target, .. }
            | ForwardError::UpstreamStatus { target, .. }
            | ForwardError::Transport { target, .. }
            | ForwardError::MalformedBody { target, .. } => target,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Timeout { .. } => "timeout",
            ForwardError::Unreachable { .. } => "unreachable",
            ForwardError::UpstreamStatus { .. } => "upstream_status",
            ForwardError::Transport { .. } => "transport",
            ForwardError::MalformedBody { .. } => "malformed_body",
        }
    }
}

/// HTTP relay shared by all dispatches.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
    timeout: Duration,
    routed_by: String,
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl Forwarder {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_FORWARD_TIMEOUT,
            routed_by: DEFAULT_ROUTED_BY.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_routed_by(mut self, routed_by: impl Into<String>) -> Self {
        self.routed_by = routed_by.into();
        self
    }

    /// `{endpoint}/api/fill-content-metrics/`
    pub fn forward_url(record: &ServiceRecord) -> String {
        format!("{}{}", record.endpoint.trim_end_matches('/'), DISPATCH_PATH)
    }

    /// Relay `body` to `record` and return the parsed downstream answer.
    #[instrument(
        name = "forward",
        skip(self, record, body, requester),
        fields(target = %record.name, url = tracing::field::Empty)
    )]
    pub async fn forward(
        &self,
        record: &ServiceRecord,
        body: &Value,
        requester: &str,
    ) -> Result<Value, ForwardError> {
        let url = Self::forward_url(record);
        tracing::Span::current().record("url", url.as_str());

        match tokio::time::timeout(self.timeout, self.exchange(&record.name, &url, body, requester))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Forward timed out");
                Err(ForwardError::Timeout {
                    target: record.name.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }

    async fn exchange(
        &self,
        target: &str,
        url: &str,
        body: &Value,
        requester: &str,
    ) -> Result<Value, ForwardError> {
        let response = self
            .client
            .post(url)
            .header(REQUESTER_HEADER, requester)
            .header(ROUTED_BY_HEADER, &self.routed_by)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(target, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "Target service returned an error status");
            return Err(ForwardError::UpstreamStatus {
                target: target.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(|e| self.classify(target, e))?;
        debug!(status = status.as_u16(), bytes = text.len(), "Downstream answered");
        parse_body(target, content_type.as_deref(), &text)
    }

    fn classify(&self, target: &str, source: reqwest::Error) -> ForwardError {
        let target = target.to_string();
        if source.is_timeout() {
            ForwardError::Timeout {
                target,
                timeout: self.timeout,
            }
        } else if source.is_connect() {
            ForwardError::Unreachable { target, source }
        } else {
            ForwardError::Transport { target, source }
        }
    }
}

/// Interpret a successful downstream body.
///
/// JSON is returned as-is.  Text that does not parse is wrapped as
/// `{ "raw": text }` unless the content type promised JSON.  An empty body
/// does not parse either, so it follows the same two rules.
pub fn parse_body(target: &str, content_type: Option<&str>, text: &str) -> Result<Value, ForwardError> {
    let declared_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(e) if declared_json => Err(ForwardError::MalformedBody {
            target: target.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(json!({ RAW_BODY_FIELD: text })),
    }
}
