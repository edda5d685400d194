//! Coordinator Testing Framework
//!
//! Deterministic stand-ins for the gateway's external collaborators: a
//! scripted decision engine and a mock downstream service, so dispatch flows
//! can be exercised end to end without a real ranking model or real services.

pub mod decision;
pub mod downstream;

pub use decision::ScriptedDecisionEngine;
pub use downstream::{MockDownstream, MockReply, ReceivedRequest};
