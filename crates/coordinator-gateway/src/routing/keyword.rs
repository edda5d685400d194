//! Deterministic keyword scorer.
//!
//! Runs without any external collaborator, which makes it the default engine
//! for local deployments and tests.  A candidate is scored by:
//!
//! - configured [`KeywordRule`]s whose keyword occurs in the query,
//! - terms of its `metadata.capabilities` array occurring in the query,
//! - its own name occurring in the query.
//!
//! All matching is case-insensitive substring matching.  A candidate keeps
//! its best score.

use async_trait::async_trait;
use coordinator_kernel::{
    DecisionEngine, DecisionError, RoutedCandidate, RoutingStrategy, ServiceRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Confidence awarded for a capability or name hit.
pub const DEFAULT_CAPABILITY_CONFIDENCE: f64 = 0.9;

/// Maps a keyword to a service with a fixed confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub service: String,
    pub confidence: f64,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, service: impl Into<String>, confidence: f64) -> Self {
        Self {
            keyword: keyword.into(),
            service: service.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeywordDecisionEngine {
    rules: Vec<KeywordRule>,
    capability_confidence: f64,
}

impl Default for KeywordDecisionEngine {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl KeywordDecisionEngine {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self {
            rules,
            capability_confidence: DEFAULT_CAPABILITY_CONFIDENCE,
        }
    }

    pub fn with_capability_confidence(mut self, confidence: f64) -> Self {
        self.capability_confidence = confidence;
        self
    }

    fn score(&self, query: &str, candidate: &ServiceRecord) -> Option<(f64, String)> {
        let mut best: Option<(f64, String)> = None;
        let mut consider = |score: f64, reason: String| {
            if best.as_ref().is_none_or(|(current, _)| score > *current) {
                best = Some((score, reason));
            }
        };

        for rule in self.rules.iter().filter(|r| r.service == candidate.name) {
            if contains_ignore_case(query, &rule.keyword) {
                consider(rule.confidence, format!("keyword '{}' matched", rule.keyword));
            }
        }

        for capability in capabilities(candidate) {
            if contains_ignore_case(query, capability) {
                consider(
                    self.capability_confidence,
                    format!("capability '{capability}' matched"),
                );
            }
        }

        if contains_ignore_case(query, &candidate.name) {
            consider(self.capability_confidence, "service name mentioned".to_string());
        }

        best
    }
}

#[async_trait]
impl DecisionEngine for KeywordDecisionEngine {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn decide(
        &self,
        query: &str,
        candidates: &[ServiceRecord],
        _strategy: &RoutingStrategy,
    ) -> Result<Vec<RoutedCandidate>, DecisionError> {
        let mut ranked: Vec<RoutedCandidate> = candidates
            .iter()
            .filter_map(|candidate| {
                self.score(query, candidate)
                    .map(|(score, reason)| RoutedCandidate::new(&candidate.name, score, reason))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        Ok(ranked)
    }
}

fn capabilities(record: &ServiceRecord) -> impl Iterator<Item = &str> {
    record
        .metadata
        .get("capabilities")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|term| !term.trim().is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}
