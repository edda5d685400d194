//! Routing decision types and the decision-engine contract.
//!
//! The [`DecisionEngine`] trait is the seam to the external collaborator that
//! ranks candidate services for a query.  The gateway's routing resolver
//! applies threshold and strategy policy on top of whatever the engine
//! returns; engines themselves are free to be naive.

use super::error::DecisionError;
use super::service::ServiceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Strategy
// ─────────────────────────────────────────────────────────────────────────────

/// How many candidates a routing decision may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// At most one candidate.
    #[default]
    Single,
    /// Several candidates, ordered by confidence.
    Multiple,
}

/// Strategy passed along with every resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStrategy {
    pub mode: RoutingMode,
    /// Opaque hint forwarded to the decision engine (e.g. `accuracy`).
    pub priority: String,
}

impl Default for RoutingStrategy {
    fn default() -> Self {
        Self {
            mode: RoutingMode::Single,
            priority: "accuracy".to_string(),
        }
    }
}

impl RoutingStrategy {
    /// Builder: set the mode.
    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: set the priority hint.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = priority.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Candidates and decisions
// ─────────────────────────────────────────────────────────────────────────────

/// One ranked answer from a decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedCandidate {
    pub service_name: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl RoutedCandidate {
    pub fn new(
        service_name: impl Into<String>,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            confidence,
            reasoning: reasoning.into(),
        }
    }
}

/// Output of the routing resolver for one inbound request.
///
/// `candidates` is ordered by descending confidence and contains only
/// candidates above the acceptance threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub candidates: Vec<RoutedCandidate>,
}

impl RoutingDecision {
    pub fn new(candidates: Vec<RoutedCandidate>) -> Self {
        Self { candidates }
    }

    /// The head of `candidates`, if any.
    pub fn primary(&self) -> Option<&RoutedCandidate> {
        self.candidates.first()
    }

    /// `true` when nothing cleared the threshold: a genuine no-match.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecisionEngine trait
// ─────────────────────────────────────────────────────────────────────────────

/// Contract for the collaborator that ranks candidate services.
///
/// Implementations return their ranking in their own preferred order; the
/// resolver re-orders by confidence stably, so ties keep the engine's order.
/// An empty `Ok` vector means "no match"; `Err` means the engine itself
/// failed and the request must fail as an infrastructure error.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    /// Stable identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Rank `candidates` for `query`.
    async fn decide(
        &self,
        query: &str,
        candidates: &[ServiceRecord],
        strategy: &RoutingStrategy,
    ) -> Result<Vec<RoutedCandidate>, DecisionError>;
}
