//! HTTP server for MCP over the SSE transport.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL
//! to POST its JSON-RPC frames to. Responses come back as `message` events on
//! the same stream. Closing the stream ends the session.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::mcp::server::McpServer;
use crate::mcp::session::{SessionGuard, SessionRegistry};
use crate::mcp::transport::{Message, SseTransport};
use crate::metrics::Metrics;

/// Path clients POST frames to.
pub const MESSAGE_PATH: &str = "/message";

/// HTTP server state.
#[derive(Clone)]
pub struct HttpState {
    server: McpServer,
    sessions: Arc<SessionRegistry>,
    metrics: Arc<Metrics>,
}

impl HttpState {
    pub fn new(server: McpServer) -> Self {
        let metrics = server.metrics();
        Self {
            server,
            sessions: Arc::new(SessionRegistry::new()),
            metrics,
        }
    }

    pub fn sessions(&self) -> Arc<SessionRegistry> {
        self.sessions.clone()
    }

    fn refresh_session_gauge(&self) {
        self.metrics.set_active_sessions(self.sessions.len() as u64);
    }
}

/// Build the router with all routes and layers.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/sse", get(open_stream))
        .route(MESSAGE_PATH, post(post_message))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn start_server(config: &Config, server: McpServer) -> Result<()> {
    let addr = config.bind_addr();
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    info!("WordPress MCP Server running on http://{}/sse", listener.local_addr()?);

    serve(listener, HttpState::new(server)).await
}

/// Serve on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: HttpState) -> Result<()> {
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "sessions": state.sessions.len()
    }))
}

/// Prometheus exposition.
async fn metrics(State(state): State<HttpState>) -> impl IntoResponse {
    state.refresh_session_gauge();
    (
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Open a session and stream its responses.
async fn open_stream(
    State(state): State<HttpState>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, Response> {
    let session_id = Uuid::new_v4().to_string();
    let (transport, rx) = SseTransport::new(session_id.clone());

    if let Err(e) = state.sessions.register(transport) {
        warn!("Could not open session: {}", e);
        return Err((StatusCode::CONFLICT, e.to_string()).into_response());
    }
    state.metrics.inc_sessions_opened();
    state.refresh_session_gauge();

    let guard = SessionGuard::new(state.sessions.clone(), session_id.clone());
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{}?sessionId={}", MESSAGE_PATH, session_id));

    let stream = stream::once(async move { Ok(endpoint) }).chain(session_events(rx, guard));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// `message` events for one session. Dropping the stream drops the guard,
/// which removes the session.
fn session_events(
    rx: mpsc::Receiver<Message>,
    guard: SessionGuard,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        loop {
            let message = rx.recv().await?;
            match message.to_json() {
                Ok(data) => {
                    let event = Event::default().event("message").data(data);
                    return Some((Ok(event), (rx, guard)));
                }
                Err(e) => warn!("Dropping unserializable frame for {}: {}", guard.session_id(), e),
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageQuery {
    session_id: Option<String>,
}

/// Accept one JSON-RPC frame for a session.
///
/// The frame is dispatched on its own task; the response travels over the
/// session's event stream.
async fn post_message(
    State(state): State<HttpState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let transport = match state.sessions.lookup(&session_id) {
        Ok(transport) => transport,
        Err(e) => {
            debug!("{}", e);
            return (StatusCode::NOT_FOUND, "Session not found").into_response();
        }
    };

    let message = match Message::parse(&body) {
        Ok(message) => message,
        Err(e) => {
            debug!("Rejected frame for {}: {}", session_id, e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match message {
        Message::Request(req) => {
            let server = state.server.clone();
            let sessions = state.sessions.clone();
            tokio::spawn(async move {
                let response = server.handle_request(req).await;
                if let Err(e) = transport.send(Message::Response(response)).await {
                    debug!("Response dropped: {}", e);
                    if e.is_transport() {
                        sessions.unregister(&session_id);
                    }
                }
            });
        }
        Message::Notification(notif) => {
            state.server.handle_notification(notif).await;
        }
        Message::Response(_) => {
            warn!("Received unexpected response on session {}", session_id);
        }
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
