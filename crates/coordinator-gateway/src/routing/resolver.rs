//! Confidence policy on top of a [`DecisionEngine`].

use coordinator_kernel::{
    DecisionEngine, DecisionError, RoutedCandidate, RoutingDecision, RoutingMode,
    RoutingStrategy, ServiceRecord,
};
use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Minimum confidence a candidate must exceed to be usable.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.3;

/// Resolver failure.  A genuine no-match is `Ok` with an empty decision.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("routing resolver unavailable: {0}")]
    ResolverUnavailable(#[from] DecisionError),
}

/// Turns a query into a [`RoutingDecision`].
#[derive(Clone)]
pub struct RoutingResolver {
    engine: Arc<dyn DecisionEngine>,
    acceptance_threshold: f64,
}

impl RoutingResolver {
    pub fn new(engine: Arc<dyn DecisionEngine>) -> Self {
        Self {
            engine,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }

    /// Builder: override the acceptance threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Ask the engine to rank `candidates` and apply threshold and mode policy.
    #[instrument(
        name = "resolve",
        skip(self, query, candidates, strategy),
        fields(engine = %self.engine_name(), pool = candidates.len(), mode = ?strategy.mode)
    )]
    pub async fn resolve(
        &self,
        query: &str,
        candidates: &[ServiceRecord],
        strategy: &RoutingStrategy,
    ) -> Result<RoutingDecision, ResolveError> {
        let ranked = self
            .engine
            .decide(query, candidates, strategy)
            .await
            .inspect_err(|e| warn!(error = %e, "Decision engine failed"))?;

        let returned = ranked.len();
        let decision = self.apply_policy(ranked, strategy);
        debug!(
            returned,
            accepted = decision.candidates.len(),
            threshold = self.acceptance_threshold,
            "Routing decision computed"
        );
        Ok(decision)
    }

    /// Drop unusable scores, order by confidence and honour the routing mode.
    pub fn apply_policy(
        &self,
        ranked: Vec<RoutedCandidate>,
        strategy: &RoutingStrategy,
    ) -> RoutingDecision {
        let mut accepted: Vec<RoutedCandidate> = ranked
            .into_iter()
            .filter(|c| c.confidence.is_finite())
            .map(|mut c| {
                c.confidence = c.confidence.clamp(0.0, 1.0);
                c
            })
            .filter(|c| c.confidence > self.acceptance_threshold)
            .collect();

        // `sort_by` is stable: ties keep the engine's order.
        accepted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        if strategy.mode == RoutingMode::Single {
            accepted.truncate(1);
        }
        RoutingDecision::new(accepted)
    }
}
