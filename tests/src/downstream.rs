use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use coordinator_gateway::forward::{REQUESTER_HEADER, ROUTED_BY_HEADER};
use coordinator_kernel::dispatch::DISPATCH_PATH;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// What the mock service answers with.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
    pub delay: Duration,
}

impl MockReply {
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "application/json",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/plain",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            content_type: "text/plain",
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    /// Hold the answer back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as the mock service saw it.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub body: Value,
    pub requester: Option<String>,
    pub routed_by: Option<String>,
}

#[derive(Clone)]
struct MockState {
    reply: Arc<RwLock<MockReply>>,
    received: Arc<RwLock<Vec<ReceivedRequest>>>,
}

/// A downstream service listening on `127.0.0.1:<ephemeral>` that serves the
/// dispatch contract path with a canned reply and records what it receives.
///
/// The server task is aborted when the mock is dropped.
pub struct MockDownstream {
    addr: SocketAddr,
    state: MockState,
    task: JoinHandle<()>,
}

impl MockDownstream {
    pub async fn start(reply: MockReply) -> std::io::Result<Self> {
        let state = MockState {
            reply: Arc::new(RwLock::new(reply)),
            received: Arc::new(RwLock::new(Vec::new())),
        };
        let app = Router::new()
            .route(DISPATCH_PATH, post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "mock downstream stopped");
            }
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL to register as the service endpoint.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn set_reply(&self, reply: MockReply) {
        *self.state.reply.write().await = reply;
    }

    pub async fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.received.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.received.read().await.len()
    }
}

impl Drop for MockDownstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> Response {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    state.received.write().await.push(ReceivedRequest {
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        requester: header_value(REQUESTER_HEADER),
        routed_by: header_value(ROUTED_BY_HEADER),
    });

    let reply = state.reply.read().await.clone();
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    (
        reply.status,
        [(header::CONTENT_TYPE, reply.content_type)],
        reply.body,
    )
        .into_response()
}
