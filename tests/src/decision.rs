use async_trait::async_trait;
use coordinator_kernel::{
    DecisionEngine, DecisionError, RoutedCandidate, RoutingStrategy, ServiceRecord,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A decision engine that answers every query with a fixed ranking.
///
/// The ranking can be swapped at any time, failure can be injected, and every
/// query the engine saw is recorded.
#[derive(Clone, Default)]
pub struct ScriptedDecisionEngine {
    ranking: Arc<RwLock<Vec<RoutedCandidate>>>,
    failure: Arc<RwLock<Option<String>>>,
    /// Queries received, in call order
    pub call_history: Arc<RwLock<Vec<String>>>,
}

impl ScriptedDecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that always ranks `service` first with `confidence`.
    pub fn choosing(service: &str, confidence: f64) -> Self {
        Self {
            ranking: Arc::new(RwLock::new(vec![RoutedCandidate::new(
                service,
                confidence,
                "scripted",
            )])),
            ..Self::default()
        }
    }

    /// Replace the ranking returned from now on.
    pub async fn set_ranking(&self, ranking: Vec<RoutedCandidate>) {
        *self.ranking.write().await = ranking;
    }

    /// Make every following call fail as unavailable.
    pub async fn fail_with(&self, reason: &str) {
        *self.failure.write().await = Some(reason.to_string());
    }

    /// Clear an injected failure.
    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }

    pub async fn history(&self) -> Vec<String> {
        self.call_history.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_history.read().await.len()
    }
}

#[async_trait]
impl DecisionEngine for ScriptedDecisionEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(
        &self,
        query: &str,
        _candidates: &[ServiceRecord],
        _strategy: &RoutingStrategy,
    ) -> Result<Vec<RoutedCandidate>, DecisionError> {
        self.call_history.write().await.push(query.to_string());

        if let Some(reason) = self.failure.read().await.clone() {
            return Err(DecisionError::Unavailable {
                engine: "scripted".to_string(),
                reason,
            });
        }
        Ok(self.ranking.read().await.clone())
    }
}

#[macro_export]
macro_rules! assert_engine_called {
    ($engine:expr, $expected_count:expr) => {
        let count = $engine.call_count().await;
        assert_eq!(
            count, $expected_count,
            "Expected decision engine to be called {} times, but it was called {} times",
            $expected_count, count
        );
    };
}
