//! Shared application state for the HTTP server

use crate::forward::Forwarder;
use crate::metrics::GatewayMetrics;
use crate::orchestrator::Dispatcher;
use crate::registry::ServiceRegistry;
use crate::routing::RoutingResolver;
use crate::settings::GatewaySettings;
use coordinator_kernel::DecisionEngine;
use std::sync::Arc;
use std::time::Instant;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Source of truth for downstream services
    pub registry: ServiceRegistry,
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Arc<GatewayMetrics>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(registry: ServiceRegistry, dispatcher: Arc<Dispatcher>, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            registry,
            dispatcher,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// Wire an in-memory registry, the given engine and settings together.
    pub fn from_settings(
        settings: &GatewaySettings,
        engine: Arc<dyn DecisionEngine>,
    ) -> Result<Self, prometheus::Error> {
        Self::with_registry(settings, engine, ServiceRegistry::in_memory())
    }

    pub fn with_registry(
        settings: &GatewaySettings,
        engine: Arc<dyn DecisionEngine>,
        registry: ServiceRegistry,
    ) -> Result<Self, prometheus::Error> {
        let resolver =
            RoutingResolver::new(engine).with_threshold(settings.routing.acceptance_threshold);
        let forwarder = Forwarder::new()
            .with_timeout(settings.dispatch.forward_timeout())
            .with_routed_by(&settings.dispatch.routed_by);
        let dispatcher = Dispatcher::new(registry.clone(), resolver, forwarder)
            .with_strategy(settings.routing.strategy())
            .with_max_in_flight(settings.dispatch.max_in_flight);

        Ok(Self::new(
            registry,
            Arc::new(dispatcher),
            Arc::new(GatewayMetrics::new()?),
        ))
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
