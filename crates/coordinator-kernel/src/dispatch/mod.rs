//! Dispatch kernel contract.
//!
//! This module defines the *data model, trait seams and pure algorithms* of
//! the dispatch gateway.  Concrete stores, decision engines and the HTTP
//! runtime belong in `coordinator-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              coordinator-kernel  (this module)              │
//! │  ServiceRecord / ServiceStore trait   DecisionEngine trait  │
//! │  DispatchRequest   build_query()      reconcile()           │
//! │  RegistryError     DecisionError      InvalidRequest        │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              coordinator-gateway  (runtime crate)           │
//! │  InMemoryServiceStore: impl ServiceStore                    │
//! │  KeywordDecisionEngine / RemoteDecisionEngine               │
//! │  ServiceRegistry   RoutingResolver   Forwarder              │
//! │  Dispatcher  (request lifecycle)    GatewayServer (axum)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod decision;
pub mod error;
pub mod query;
pub mod reconcile;
pub mod request;
pub mod service;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use decision::{DecisionEngine, RoutedCandidate, RoutingDecision, RoutingMode, RoutingStrategy};
pub use error::{DecisionError, InvalidRequest, RegistryError};
pub use query::{EMPTY_REQUEST_QUERY, build_query};
pub use reconcile::{reconcile, working_payload};
pub use request::{DISPATCH_PATH, DispatchRequest};
pub use service::{
    RegistrationMode, ServiceRecord, ServiceRegistration, ServiceStatus, ServiceStore,
};
