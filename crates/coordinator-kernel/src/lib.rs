//! `coordinator-kernel`: contracts and pure logic of the dispatch gateway.
//!
//! The kernel owns everything that can be specified without network I/O:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`dispatch::service`] | [`ServiceRecord`](dispatch::ServiceRecord), lifecycle status, the [`ServiceStore`](dispatch::ServiceStore) seam |
//! | [`dispatch::decision`] | Routing strategy, candidates, [`DecisionEngine`](dispatch::DecisionEngine) seam |
//! | [`dispatch::request`] | Inbound dispatch request parsing and validation |
//! | [`dispatch::query`] | Payload → query string flattening |
//! | [`dispatch::reconcile`] | Downstream response → caller template mapping |
//! | [`config`] | Multi-format configuration loading with env substitution |
//!
//! Runtime implementations (in-memory registry, HTTP forwarding, the axum
//! server) live in `coordinator-gateway`.

pub mod config;
pub mod dispatch;

pub use dispatch::{
    DecisionEngine, DecisionError, DispatchRequest, InvalidRequest, RegistrationMode,
    RegistryError, RoutedCandidate, RoutingDecision, RoutingMode, RoutingStrategy,
    ServiceRecord, ServiceRegistration, ServiceStatus, ServiceStore, build_query, reconcile,
};
