use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::embed::Embedder;
use crate::server::{parse_message, route_prefix, JsonRpcResponse, McpHandler, ServerOptions, Transport};
use crate::Result;

pub const SESSION_HEADER: &str = "mcp-session-id";

type Sessions = Arc<RwLock<HashMap<String, mpsc::Sender<JsonRpcResponse>>>>;

struct AppState<E: Embedder> {
    handler: McpHandler<E>,
    sessions: Sessions,
    messages_path: String,
}

impl<E: Embedder> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            sessions: Arc::clone(&self.sessions),
            messages_path: self.messages_path.clone(),
        }
    }
}

/// Build the HTTP routes for `transport` under `mount_path`.
///
/// `Transport::Stdio` has no HTTP surface and yields an empty router.
pub fn router<E: Embedder>(handler: McpHandler<E>, transport: Transport, mount_path: &str) -> Router {
    let prefix = route_prefix(mount_path);
    let state = AppState {
        handler,
        sessions: Arc::new(RwLock::new(HashMap::new())),
        messages_path: format!("{prefix}/messages/"),
    };

    match transport {
        Transport::Sse => Router::new()
            .route(&format!("{prefix}/sse"), get(sse_stream::<E>))
            .route(&format!("{prefix}/messages/"), post(post_message::<E>))
            .route(&format!("{prefix}/messages"), post(post_message::<E>))
            .with_state(state),
        Transport::StreamableHttp => Router::new()
            .route(&format!("{prefix}/mcp"), post(streamable_post::<E>))
            .with_state(state),
        Transport::Stdio => Router::new(),
    }
}

pub(crate) async fn serve<E: Embedder>(handler: McpHandler<E>, options: &ServerOptions) -> Result<()> {
    let app = router(handler, options.transport, &options.mount_path);
    let listener = tokio::net::TcpListener::bind((options.host.as_str(), options.port)).await?;
    let addr = listener.local_addr()?;
    let prefix = route_prefix(&options.mount_path);
    let endpoint = match options.transport {
        Transport::Sse => format!("{prefix}/sse"),
        _ => format!("{prefix}/mcp"),
    };
    info!(transport = %options.transport, "serving MCP on http://{addr}{endpoint}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Removes an SSE session once its stream is dropped.
struct SessionGuard {
    sessions: Sessions,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Ok(mut sessions) = self.sessions.try_write() {
            sessions.remove(&self.id);
            debug!(session = %self.id, "sse session closed");
            return;
        }
        // map is busy; finish the removal on the runtime
        let sessions = Arc::clone(&self.sessions);
        let id = std::mem::take(&mut self.id);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                sessions.write().await.remove(&id);
                debug!(session = %id, "sse session closed");
            });
        }
    }
}

async fn sse_stream<E: Embedder>(
    State(state): State<AppState<E>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<JsonRpcResponse>(32);
    state.sessions.write().await.insert(id.clone(), tx);
    debug!(session = %id, "sse session opened");

    let endpoint = format!("{}?session_id={}", state.messages_path, id);
    let guard = SessionGuard {
        sessions: Arc::clone(&state.sessions),
        id,
    };

    let announce =
        stream::once(async move { Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint)) });
    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let response = rx.recv().await?;
        let event = Event::default().event("message").data(response.to_json());
        Some((Ok::<_, Infallible>(event), (rx, guard)))
    });

    Sse::new(announce.chain(messages)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn post_message<E: Embedder>(
    State(state): State<AppState<E>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    let sender = state.sessions.read().await.get(&query.session_id).cloned();
    let Some(sender) = sender else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let handler = state.handler.clone();
    tokio::spawn(async move {
        if let Some(response) = handler.handle_message(&body).await {
            if sender.send(response).await.is_err() {
                warn!("sse client went away before the response was ready");
            }
        }
    });
    StatusCode::ACCEPTED.into_response()
}

async fn streamable_post<E: Embedder>(State(state): State<AppState<E>>, body: String) -> Response {
    let request = match parse_message(&body) {
        Ok(request) => request,
        Err(error) => return (StatusCode::BAD_REQUEST, Json(error)).into_response(),
    };

    let initialize = request.method == "initialize";
    let Some(reply) = state.handler.handle(request).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut response = Json(reply).into_response();
    if initialize {
        let id = Uuid::new_v4().simple().to_string();
        if let Ok(value) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}
