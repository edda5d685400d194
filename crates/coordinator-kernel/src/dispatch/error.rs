//! Error types for the dispatch kernel contract.
//!
//! [`RegistryError`] covers registry lifecycle failures, [`DecisionError`]
//! covers failures of the external decision collaborator and
//! [`InvalidRequest`] covers malformed inbound dispatch requests.  Network
//! failures while forwarding belong in the gateway implementation crate.

use thiserror::Error;
use uuid::Uuid;

/// Failure of a service registry operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A non-deleted record already uses this name.
    #[error("service '{0}' is already registered")]
    DuplicateName(String),

    /// No record carries this id.
    #[error("service '{0}' is not registered")]
    NotFound(Uuid),

    /// The requested lifecycle transition is not allowed from the current state.
    #[error("service '{name}' is {status}, expected {expected}")]
    InvalidState {
        name: String,
        status: String,
        expected: String,
    },

    /// A registration request failed field validation.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
}

/// Failure of the external decision collaborator.
///
/// This is an infrastructure failure and must never be confused with a
/// genuine empty ranking, which is a successful `Ok(vec![])`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecisionError {
    /// The collaborator could not be reached or reported an error.
    #[error("decision engine '{engine}' unavailable: {reason}")]
    Unavailable { engine: String, reason: String },

    /// The collaborator answered with something that is not a ranking.
    #[error("decision engine '{engine}' returned an invalid ranking: {reason}")]
    InvalidResponse { engine: String, reason: String },
}

/// A malformed inbound dispatch request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidRequest {
    /// The body is not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,

    /// `requester_service` is absent, empty or not a string.
    #[error("Missing required field: requester_service")]
    MissingRequester,

    /// `response` is absent or not an object.
    #[error("Missing or invalid required field: response (must be an object)")]
    InvalidTemplate,

    /// `payload` is present but is neither `null` nor an object.
    #[error("Invalid field: payload (must be an object)")]
    InvalidPayload,
}
