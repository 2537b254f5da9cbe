use crate::config::MAX_SPARQL_BODY_SIZE;
use crate::error::ProxyServerError;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use std::net::SocketAddr;

/// The parameters of a query request, taken from the query string and, for `POST`, the body.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SparqlQueryParams {
    pub query: Option<String>,
    /// Identifier under which the client wants to poll the job.
    pub token: Option<String>,
}

impl SparqlQueryParams {
    pub async fn from_request(request: Request) -> Result<Self, ProxyServerError> {
        let (parts, body) = request.into_parts();
        let mut params = Self::from_form(parts.uri.query().unwrap_or_default().as_bytes());

        match parts.method {
            Method::GET => Ok(params),
            Method::POST => {
                params.query = read_body_query(&parts.headers, body).await?;
                Ok(params)
            }
            _ => Err(ProxyServerError::MethodNotAllowed),
        }
    }

    fn from_form(form: &[u8]) -> Self {
        let mut params = Self::default();
        for (name, value) in url::form_urlencoded::parse(form) {
            match name.as_ref() {
                "query" => params.query = Some(value.into_owned()),
                "token" => params.token = Some(value.into_owned()),
                _ => {}
            }
        }
        params
    }
}

async fn read_body_query(
    headers: &HeaderMap,
    body: Body,
) -> Result<Option<String>, ProxyServerError> {
    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase());

    let is_form = match media_type.as_deref() {
        Some("application/x-www-form-urlencoded") => true,
        Some("application/sparql-query") => false,
        _ => return Err(ProxyServerError::UnsupportedMediaType),
    };

    let body = axum::body::to_bytes(body, MAX_SPARQL_BODY_SIZE)
        .await
        .map_err(|error| ProxyServerError::BadRequest(error.to_string()))?;
    if is_form {
        Ok(SparqlQueryParams::from_form(&body).query)
    } else {
        String::from_utf8(body.to_vec())
            .map(Some)
            .map_err(|_| ProxyServerError::BadRequest("Query is not valid UTF-8".to_owned()))
    }
}

/// The address of the client. With `trust_proxy`, the first `X-Forwarded-For` entry wins.
pub fn client_ip(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_owned();
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| address.ip().to_string())
        .unwrap_or_default()
}
