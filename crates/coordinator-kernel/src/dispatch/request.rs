//! Inbound dispatch request.
//!
//! The same logical shape travels caller → gateway and gateway → target:
//!
//! ```text
//! { "requester_service": "svc-name",
//!   "payload":  { … },          // optional, defaults to {}
//!   "response": { … } }         // required, may be empty
//! ```

use super::error::InvalidRequest;
use serde_json::{Map, Value, json};

/// Dispatch contract path, used for inbound and forwarded requests alike.
pub const DISPATCH_PATH: &str = "/api/fill-content-metrics/";

/// A validated dispatch request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Identity of the calling service.
    pub requester_service: String,
    /// Free-form request payload.
    pub payload: Map<String, Value>,
    /// Caller-declared response template.
    pub response_template: Map<String, Value>,
}

impl DispatchRequest {
    pub fn new(
        requester_service: impl Into<String>,
        payload: Map<String, Value>,
        response_template: Map<String, Value>,
    ) -> Self {
        Self {
            requester_service: requester_service.into(),
            payload,
            response_template,
        }
    }

    /// Validate a raw JSON body.
    ///
    /// Checks run in this order: body is an object, requester present and
    /// non-empty, template is an object, payload is absent/`null`/an object.
    pub fn from_value(body: &Value) -> Result<Self, InvalidRequest> {
        let fields = body.as_object().ok_or(InvalidRequest::NotAnObject)?;

        let requester_service = match fields.get("requester_service") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err(InvalidRequest::MissingRequester),
        };

        let response_template = match fields.get("response") {
            Some(Value::Object(template)) => template.clone(),
            _ => return Err(InvalidRequest::InvalidTemplate),
        };

        let payload = match fields.get("payload") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(payload)) => payload.clone(),
            Some(_) => return Err(InvalidRequest::InvalidPayload),
        };

        Ok(Self::new(requester_service, payload, response_template))
    }

    /// Body forwarded verbatim to the chosen target.
    pub fn forward_body(&self) -> Value {
        json!({
            "requester_service": self.requester_service,
            "payload": self.payload,
            "response": self.response_template,
        })
    }

    /// Payload as a JSON value, for query construction.
    pub fn payload_value(&self) -> Value {
        Value::Object(self.payload.clone())
    }
}
