use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::middleware::request_id::RequestId;
use crate::utils::token::redact_token;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;
const MAX_LOGGED_BODY_BYTES: usize = 2048;
const SIGNATURE_PATH_PREFIX: &str = "/api/signature/";

/// Span for `TraceLayer` that records the redacted path instead of the full URI.
pub fn redacted_span(req: &Request<Body>) -> tracing::Span {
    tracing::debug_span!(
        "http",
        method = %req.method(),
        uri = %redact_uri(req.uri().path()),
        version = ?req.version(),
    )
}

/// Masks the credential segment of public signature URIs.
pub fn redact_uri(path: &str) -> String {
    let Some(rest) = path.strip_prefix(SIGNATURE_PATH_PREFIX) else {
        return path.to_string();
    };
    let (token, tail) = match rest.find('/') {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };
    format!("{}{}{}", SIGNATURE_PATH_PREFIX, redact_token(token), tail)
}

struct ErrorEvent {
    status: u16,
    method: String,
    path: String,
    request_id: String,
    latency_ms: u64,
}

impl ErrorEvent {
    fn emit(&self, body: &str) {
        if self.status >= 500 {
            tracing::error!(
                status = self.status,
                method = %self.method,
                path = %self.path,
                request_id = %self.request_id,
                latency_ms = self.latency_ms,
                body,
                "Request completed with error status"
            );
        } else {
            tracing::warn!(
                status = self.status,
                method = %self.method,
                path = %self.path,
                request_id = %self.request_id,
                latency_ms = self.latency_ms,
                body,
                "Request completed with error status"
            );
        }
    }
}

/// Logs every 4xx/5xx response with a preview of its body. Signature tokens
/// are masked and request bodies are never logged, since they carry signatures.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = redact_uri(req.uri().path());
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let event = ErrorEvent {
        status: status.as_u16(),
        method,
        path,
        request_id,
        latency_ms: start.elapsed().as_millis() as u64,
    };
    let (mut parts, body) = response.into_parts();
    match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => {
            event.emit(&preview(&bytes));
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(err) => {
            event.emit(&format!("<unreadable body: {}>", err));
            parts.headers.remove(CONTENT_LENGTH);
            Response::from_parts(parts, Body::empty())
        }
    }
}

fn preview(bytes: &Bytes) -> String {
    if bytes.len() > MAX_LOGGED_BODY_BYTES {
        format!(
            "{}... (truncated, {} bytes total)",
            String::from_utf8_lossy(&bytes[..MAX_LOGGED_BODY_BYTES]),
            bytes.len()
        )
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}
