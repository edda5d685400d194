//! Request lifecycle of one dispatch.
//!
//! ```text
//! Validating ─► Resolving ─► Confirming ─► Forwarding ─► Reconciling ─► Done
//!      │             │             │              │
//!      └─────────────┴─────────────┴──────────────┴──────► Failed(kind)
//! ```
//!
//! Every failure becomes a [`DispatchError`]; nothing here panics or
//! affects other in-flight requests.  Admission is bounded by a semaphore:
//! when all permits are taken a request fails immediately as
//! [`DispatchError::Saturated`] instead of queueing.

use crate::error::DispatchError;
use crate::forward::Forwarder;
use crate::registry::ServiceRegistry;
use crate::routing::RoutingResolver;
use coordinator_kernel::{DispatchRequest, RoutingStrategy, build_query, reconcile};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

/// Default cap on concurrently processed dispatches.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    Validating,
    Resolving,
    Confirming,
    Forwarding,
    Reconciling,
    Done,
    Failed,
}

impl DispatchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStage::Validating => "validating",
            DispatchStage::Resolving => "resolving",
            DispatchStage::Confirming => "confirming",
            DispatchStage::Forwarding => "forwarding",
            DispatchStage::Reconciling => "reconciling",
            DispatchStage::Done => "done",
            DispatchStage::Failed => "failed",
        }
    }
}

impl fmt::Display for DispatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful dispatch: reconciled data plus decision metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
    pub data: Value,
    pub routed_to: String,
    pub confidence: f64,
    pub requester: String,
    pub processing_time_ms: u64,
}

impl DispatchOutcome {
    /// `{ success: true, data, metadata: { routed_to, confidence, requester, processing_time_ms } }`
    pub fn into_body(self) -> Value {
        json!({
            "success": true,
            "data": self.data,
            "metadata": {
                "routed_to": self.routed_to,
                "confidence": self.confidence,
                "requester": self.requester,
                "processing_time_ms": self.processing_time_ms,
            }
        })
    }
}

/// Ties registry, resolver, forwarder and reconciler together.
pub struct Dispatcher {
    registry: ServiceRegistry,
    resolver: RoutingResolver,
    forwarder: Forwarder,
    strategy: RoutingStrategy,
    permits: Semaphore,
    max_in_flight: usize,
}

impl Dispatcher {
    pub fn new(registry: ServiceRegistry, resolver: RoutingResolver, forwarder: Forwarder) -> Self {
        Self {
            registry,
            resolver,
            forwarder,
            strategy: RoutingStrategy::default(),
            permits: Semaphore::new(DEFAULT_MAX_IN_FLIGHT),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder: cap concurrent dispatches at `limit` (at least one).
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        let limit = limit.max(1);
        self.permits = Semaphore::new(limit);
        self.max_in_flight = limit;
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Validate a raw JSON body, then dispatch it.
    pub async fn dispatch_value(&self, body: &Value) -> Result<DispatchOutcome, DispatchError> {
        let request = DispatchRequest::from_value(body).inspect_err(|e| {
            warn!(stage = %DispatchStage::Validating, error = %e, "Dispatch request rejected");
        })?;
        self.dispatch(request).await
    }

    /// Run a validated request through resolve, confirm, forward and reconcile.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatchError> {
        let _permit = self.permits.try_acquire().map_err(|_| {
            warn!(limit = self.max_in_flight, "Dispatch rejected, gateway saturated");
            DispatchError::Saturated {
                limit: self.max_in_flight,
            }
        })?;

        let span = info_span!(
            "dispatch",
            request_id = %Uuid::new_v4(),
            requester = %request.requester_service,
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: DispatchRequest) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();
        let requester = request.requester_service.clone();
        let elapsed_ms = || u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        // Resolving
        let query = build_query(&request.payload_value());
        let pool = self.registry.list_all();
        info!(
            stage = %DispatchStage::Resolving,
            engine = self.resolver.engine_name(),
            query = %query,
            pool = pool.len(),
            "Resolving target"
        );

        let decision = match self.resolver.resolve(&query, &pool, &self.strategy).await {
            Ok(decision) => decision,
            Err(source) => {
                error!(stage = %DispatchStage::Failed, error = %source, elapsed_ms = elapsed_ms(), "Routing failed");
                return Err(DispatchError::ResolverUnavailable {
                    requester,
                    query,
                    source,
                });
            }
        };

        let Some(primary) = decision.primary().cloned() else {
            warn!(
                stage = %DispatchStage::Failed,
                query = %query,
                available_services = pool.len(),
                "No suitable service found"
            );
            return Err(DispatchError::NoMatch {
                requester,
                query,
                available_services: pool.len(),
            });
        };

        // Confirming
        info!(
            stage = %DispatchStage::Confirming,
            target = %primary.service_name,
            confidence = primary.confidence,
            reasoning = %primary.reasoning,
            "Target identified"
        );
        let Some(target) = self.registry.get_by_name(&primary.service_name) else {
            error!(stage = %DispatchStage::Failed, target = %primary.service_name, "Target not in registry");
            return Err(DispatchError::NotRegistered {
                requester,
                target: primary.service_name,
            });
        };
        if !target.is_active() {
            warn!(stage = %DispatchStage::Failed, target = %target.name, status = %target.status, "Target not active");
            return Err(DispatchError::NotActive {
                requester,
                target: target.name,
                status: target.status,
            });
        }

        // Forwarding
        info!(stage = %DispatchStage::Forwarding, target = %target.name, "Forwarding request");
        let response = match self
            .forwarder
            .forward(&target, &request.forward_body(), &requester)
            .await
        {
            Ok(response) => response,
            Err(source) => {
                error!(
                    stage = %DispatchStage::Failed,
                    target = %target.name,
                    kind = source.kind(),
                    error = %source,
                    elapsed_ms = elapsed_ms(),
                    "Forwarding failed"
                );
                return Err(DispatchError::Forwarding {
                    requester,
                    target: target.name,
                    source,
                });
            }
        };

        // Reconciling
        let data = reconcile(&response, &request.response_template);
        let processing_time_ms = elapsed_ms();
        info!(
            stage = %DispatchStage::Done,
            target = %target.name,
            confidence = primary.confidence,
            elapsed_ms = processing_time_ms,
            "Dispatch completed"
        );

        Ok(DispatchOutcome {
            data,
            routed_to: target.name,
            confidence: primary.confidence,
            requester,
            processing_time_ms,
        })
    }
}
