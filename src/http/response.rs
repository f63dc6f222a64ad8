//! HTTP response building module
//!
//! JSON and status-code builders shared by every route. Each response
//! carries the configured `Server` header and, when enabled, the CORS
//! origin header.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, ALLOW, CONTENT_TYPE, SERVER,
};
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::HttpConfig;
use crate::logger;

/// Methods served by the API routes
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

const JSON: &str = "application/json";

/// Body of every error response
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn builder(status: StatusCode, http: &HttpConfig) -> Builder {
    let builder = Response::builder()
        .status(status)
        .header(SERVER, http.server_name.as_str());
    if http.enable_cors {
        builder.header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
    } else {
        builder
    }
}

fn finish(builder: Builder, body: Bytes, status: StatusCode) -> Response<Full<Bytes>> {
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        let mut fallback = Response::new(Full::new(Bytes::new()));
        *fallback.status_mut() = status;
        fallback
    })
}

/// Build JSON response
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    http: &HttpConfig,
) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => finish(
            builder(status, http).header(CONTENT_TYPE, JSON),
            Bytes::from(json),
            status,
        ),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                crate::error::GENERIC_FAILURE_MESSAGE,
                http,
            )
        }
    }
}

/// Build `{ "error": message }` response
pub fn error_response(
    status: StatusCode,
    message: &str,
    http: &HttpConfig,
) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(&ErrorBody { error: message })
        .unwrap_or_else(|_| br#"{"error":"Internal server error"}"#.to_vec());
    finish(
        builder(status, http).header(CONTENT_TYPE, JSON),
        Bytes::from(json),
        status,
    )
}

/// Build 404 Not Found response
pub fn build_404_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found", http)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    let json = br#"{"error":"Method Not Allowed"}"#;
    finish(
        builder(status, http)
            .header(CONTENT_TYPE, JSON)
            .header(ALLOW, ALLOWED_METHODS),
        Bytes::from_static(json),
        status,
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    error_response(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large", http)
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    let status = StatusCode::NO_CONTENT;
    let mut builder = builder(status, http).header(ALLOW, ALLOWED_METHODS);

    if http.enable_cors {
        builder = builder
            .header(ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
            .header(ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type")
            .header(ACCESS_CONTROL_MAX_AGE, "86400");
    }

    finish(builder, Bytes::new(), status)
}

/// Build health check response
pub fn build_health_response(status: &str, http: &HttpConfig) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({ "status": status }), http)
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
