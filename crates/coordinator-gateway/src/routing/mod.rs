//! Routing: the resolver policy and the built-in decision engines.

pub mod keyword;
pub mod remote;
pub mod resolver;

pub use keyword::{KeywordDecisionEngine, KeywordRule};
pub use remote::RemoteDecisionEngine;
pub use resolver::{DEFAULT_ACCEPTANCE_THRESHOLD, ResolveError, RoutingResolver};
