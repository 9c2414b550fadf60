use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use reqwest::Client;
use std::sync::Arc;
use url::Url;

use crate::auth::relay::decode_credentials;
use crate::auth::{url_host, CredentialAttacher, DigestAuth, CAMERA_AUTH_HEADER};
use crate::config::RelayConfig;

#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub config: Arc<RelayConfig>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Camera relay: digest is performed here on the caller's behalf
        .route("/proxy/:host/:port/*path", get(handle_proxy))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
}

async fn handle_proxy(
    State(state): State<AppState>,
    Path((host, port, path)): Path<(String, String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let port = match port.parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => {
            tracing::warn!("Rejected relay request with invalid port: {}", port);
            return (StatusCode::BAD_REQUEST, "Invalid port").into_response();
        }
    };

    if !state.config.allows(&host) {
        tracing::warn!("Rejected relay request for host not in allowed_hosts: {}", host);
        return (StatusCode::FORBIDDEN, "Host not allowed").into_response();
    }

    let credentials = headers
        .get(CAMERA_AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(decode_credentials);

    let (username, password) = match credentials {
        Some(Ok(credentials)) => credentials,
        Some(Err(e)) => {
            tracing::warn!("Rejected relay request for {}: {}", host, e);
            return (StatusCode::UNAUTHORIZED, format!("Invalid {} header", CAMERA_AUTH_HEADER)).into_response();
        }
        None => {
            return (StatusCode::UNAUTHORIZED, format!("Missing {} header", CAMERA_AUTH_HEADER)).into_response();
        }
    };

    let target = match camera_url(&host, port, &path, query.as_deref()) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Rejected relay request with bad target: {}", e);
            return (StatusCode::BAD_REQUEST, format!("Invalid camera path: {}", e)).into_response();
        }
    };

    tracing::info!("Relaying /{} to camera {}:{}", path, host, port);

    let auth = DigestAuth::new(&username, &password);
    let upstream = match auth.send(&state.http_client, target).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Camera {}:{} unreachable: {}", host, port, e);
            return (StatusCode::BAD_GATEWAY, format!("Camera unreachable: {}", e)).into_response();
        }
    };

    relay_response(upstream)
}

/// `http://{host}:{port}/{path}?{query}`, query passed through untouched.
fn camera_url(host: &str, port: u16, path: &str, query: Option<&str>) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!(
        "http://{}:{}/{}",
        url_host(host),
        port,
        path.trim_start_matches('/')
    ))?;
    url.set_query(query);
    Ok(url)
}

/// Pass status, content type and body back verbatim. The body is streamed
/// so images and MJPEG arrive byte-for-byte.
fn relay_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    if !status.is_success() {
        tracing::debug!("Camera answered {}", status);
    }

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
        builder = builder.header(header::CONTENT_TYPE, content_type.clone());
    }

    match builder.body(Body::from_stream(upstream.bytes_stream())) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to build relay response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
