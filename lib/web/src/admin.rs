use crate::error::ProxyServerError;
use crate::AppState;
use axum::extract::{Path, Request, State};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::TypedHeader;
use futures::{stream, Stream, StreamExt};
use headers::authorization::Basic;
use headers::Authorization;
use serde_json::{json, Value};
use sparql_proxy_engine::{QueueState, TaskId};
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

pub fn create_admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/state", get(handle_state))
        .route("/events", get(handle_events))
        .route("/jobs/{id}/cancel", post(handle_cancel))
        .route("/cache/purge", post(handle_purge))
        .route_layer(from_fn_with_state(state, require_admin))
}

async fn require_admin(
    State(state): State<AppState>,
    authorization: Option<TypedHeader<Authorization<Basic>>>,
    request: Request,
    next: Next,
) -> Result<Response, ProxyServerError> {
    let Some(admin) = &state.admin else {
        return Err(ProxyServerError::Unauthorized);
    };
    match authorization {
        Some(TypedHeader(Authorization(basic)))
            if admin.matches(basic.username(), basic.password()) =>
        {
            Ok(next.run(request).await)
        }
        _ => Err(ProxyServerError::Unauthorized),
    }
}

async fn handle_state(
    State(state): State<AppState>,
) -> Result<Json<QueueState>, ProxyServerError> {
    Ok(Json(state.proxy.state().await?))
}

async fn handle_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ProxyServerError> {
    let receiver = state.proxy.subscribe();
    let initial = state.proxy.state().await?;
    let events = state_updates(initial, receiver).filter_map(|snapshot| async move {
        match Event::default().event("state").json_data(&snapshot) {
            Ok(event) => Some(Ok(event)),
            Err(error) => {
                warn!(%error, "Could not encode queue state");
                None
            }
        }
    });
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// The current state followed by every published change. Lagging subscribers skip the
/// snapshots they missed.
fn state_updates(
    initial: QueueState,
    receiver: broadcast::Receiver<QueueState>,
) -> impl Stream<Item = QueueState> {
    stream::once(async move { initial }).chain(
        BroadcastStream::new(receiver).filter_map(|update| async move { update.ok() }),
    )
}

async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ProxyServerError> {
    let success = match id.parse::<TaskId>() {
        Ok(id) => state.proxy.cancel(id).await?,
        Err(_) => false,
    };
    info!(task_id = %id, success, "Cancel requested by admin");
    Ok(Json(json!({ "success": success })))
}

async fn handle_purge(State(state): State<AppState>) -> Result<Json<Value>, ProxyServerError> {
    state.proxy.purge_cache().await?;
    info!("Cache purged by admin");
    Ok(Json(json!({ "success": true })))
}
