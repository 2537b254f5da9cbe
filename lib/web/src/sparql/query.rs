use crate::error::ProxyServerError;
use crate::sparql::params::{client_ip, SparqlQueryParams};
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::header::{
    ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONNECTION, CONTENT_TYPE, COOKIE, HOST,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use sparql_proxy_engine::{ProxyResponse, QueryRequest, Requester};
use time::OffsetDateTime;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Headers that are never relayed to the backend.
const UNSAFE_HEADERS: [HeaderName; 5] = [AUTHORIZATION, COOKIE, HOST, CONNECTION, ACCEPT_ENCODING];

pub async fn handle_sparql(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ProxyServerError> {
    if request.method() == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if request.method() == Method::GET && request.uri().query().map_or(true, str::is_empty) {
        return forward_to_backend(&state, request.headers()).await;
    }

    let ip = client_ip(&request, state.trust_proxy);
    let accept = request
        .headers()
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let params = SparqlQueryParams::from_request(request).await?;
    let Some(query) = params.query.filter(|query| !query.is_empty()) else {
        return Err(ProxyServerError::BadRequest("Query is required".to_owned()));
    };

    let started_at = OffsetDateTime::now_utc();
    let response = state
        .proxy
        .query(QueryRequest {
            query: query.clone(),
            requester: Requester {
                ip: ip.clone(),
                accept,
            },
            token: params.token,
        })
        .await?;

    if let Some(query_log) = &state.query_log {
        query_log.append(started_at, &ip, &query, &response).await;
    }
    Ok(results_response(response))
}

fn results_response(response: ProxyResponse) -> Response {
    let cache = if response.cache_hit { "hit" } else { "miss" };
    let headers = [(X_CACHE, HeaderValue::from_static(cache))];
    let mut http_response = (StatusCode::OK, headers, response.body).into_response();
    if !response.content_type.is_empty() {
        if let Ok(content_type) = HeaderValue::from_str(&response.content_type) {
            http_response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
    }
    http_response
}

/// Relays a bare `GET /sparql`, e.g. a service description request, to the backend.
async fn forward_to_backend(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Response, ProxyServerError> {
    let mut headers = headers.clone();
    for name in &UNSAFE_HEADERS {
        headers.remove(name);
    }

    let forwarded = state.proxy.forward(headers).await?;
    let status = StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, forwarded.body).into_response();
    response.headers_mut().extend(forwarded.headers);
    if let Some(content_type) = forwarded
        .content_type
        .and_then(|value| HeaderValue::from_str(&value).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}
