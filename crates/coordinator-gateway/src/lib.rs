//! `coordinator-gateway`: runtime of the dispatch gateway.
//!
//! Implements the contracts of `coordinator-kernel`:
//!
//! - [`registry`]: [`ServiceRegistry`] over a sharded in-memory store
//! - [`routing`]: [`RoutingResolver`] plus keyword and remote decision engines
//! - [`forward`]: [`Forwarder`], the bounded-timeout relay
//! - [`orchestrator`]: [`Dispatcher`], the per-request state machine
//! - [`server`]: axum HTTP surface, see [`GatewayServer`]
//!
//! Ambient concerns live in [`settings`], [`telemetry`], [`metrics`] and
//! [`error`].

pub mod error;
pub mod forward;
pub mod handlers;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod routing;
pub mod server;
pub mod settings;
pub mod state;
pub mod telemetry;

pub use error::{DispatchError, GatewayError, GatewayResult};
pub use forward::{ForwardError, Forwarder};
pub use metrics::GatewayMetrics;
pub use orchestrator::{DispatchOutcome, DispatchStage, Dispatcher};
pub use registry::{InMemoryServiceStore, ServiceRegistry};
pub use routing::{
    KeywordDecisionEngine, KeywordRule, RemoteDecisionEngine, ResolveError, RoutingResolver,
};
pub use server::{GatewayServer, build_router};
pub use settings::GatewaySettings;
pub use state::AppState;
