use axum::http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sparql_proxy_engine::{JobError, ProxyError, QueueError};
use sparql_proxy_query::QueryError;
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum ProxyServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unsupported Media Type")]
    UnsupportedMediaType,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl IntoResponse for ProxyServerError {
    fn into_response(self) -> Response {
        match self {
            ProxyServerError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ProxyServerError::UnsupportedMediaType => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type").into_response()
            }
            ProxyServerError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed").into_response()
            }
            ProxyServerError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(
                    WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"sparql-proxy\""),
                )],
                "Unauthorized",
            )
                .into_response(),
            ProxyServerError::NotFound(message) => {
                (StatusCode::NOT_FOUND, message).into_response()
            }
            ProxyServerError::Proxy(error) => proxy_error_response(error),
        }
    }
}

fn proxy_error_response(error: ProxyError) -> Response {
    match error {
        ProxyError::Query(QueryError::Parse { cause, .. }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Query parse failed", "data": cause.to_string() })),
        )
            .into_response(),
        ProxyError::Query(QueryError::UnsupportedType { kind }) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Query type not allowed", "data": kind })),
        )
            .into_response(),
        ProxyError::Queue(QueueError::Failed(error)) | ProxyError::Job(error) => {
            job_error_response(error)
        }
        ProxyError::Queue(error @ (QueueError::TooManyWaiting | QueueError::Canceled)) => {
            (StatusCode::SERVICE_UNAVAILABLE, error.to_string()).into_response()
        }
        error => {
            error!(%error, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

fn job_error_response(error: JobError) -> Response {
    match error {
        JobError::Backend {
            status,
            content_type,
            body,
        } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, body).into_response();
            if let Some(value) = content_type.and_then(|value| HeaderValue::from_str(&value).ok())
            {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            response
        }
        JobError::Canceled => {
            (StatusCode::SERVICE_UNAVAILABLE, QueueError::Canceled.to_string()).into_response()
        }
        JobError::Timeout => (StatusCode::GATEWAY_TIMEOUT, error.to_string()).into_response(),
        error => (StatusCode::BAD_GATEWAY, error.to_string()).into_response(),
    }
}
