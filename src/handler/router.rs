//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body limits, method checks,
//! route matching and the access log line.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppState, HttpConfig};
use crate::error::DispatchError;
use crate::generation::{ActionResult, Payload};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::market::now_rfc3339;

/// Response plus the action it served, for the access log
pub struct Routed {
    pub response: Response<Full<Bytes>>,
    pub action: Option<String>,
}

impl From<Response<Full<Bytes>>> for Routed {
    fn from(response: Response<Full<Bytes>>) -> Self {
        Self {
            response,
            action: None,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let routed = match read_body(&parts, body, &state.config.http).await {
        Ok(bytes) => {
            route(
                &parts.method,
                parts.uri.path(),
                parts.uri.query(),
                &bytes,
                &state,
            )
            .await
        }
        Err(resp) => resp.into(),
    };

    if state.config.logging.access_log {
        log_access(
            &parts,
            peer_addr,
            &routed,
            started,
            &state.config.logging.access_log_format,
        );
    }

    Ok(routed.response)
}

/// Collect the request body, answering 413 above `max_body_size`
async fn read_body<B>(
    parts: &Parts,
    body: B,
    http_config: &HttpConfig,
) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let max_body_size = http_config.max_body_size;

    // Reject early on a declared length before reading anything
    if let Some(size) = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        if size > max_body_size {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            return Err(http::build_413_response(http_config));
        }
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body exceeded {max_body_size} bytes while streaming"
            ));
            Err(http::build_413_response(http_config))
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read request body: {e}"));
            Err(http::error_response(
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                http_config,
            ))
        }
    }
}

/// Route request based on method, path and configuration
pub async fn route(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
    state: &AppState,
) -> Routed {
    let http_config = &state.config.http;
    let routes = &state.config.routes;

    if method == Method::OPTIONS {
        return http::build_options_response(http_config).into();
    }

    // Health check endpoints (highest priority, no upstream calls)
    if routes.health.enabled
        && (path == routes.health.liveness_path || path == routes.health.readiness_path)
    {
        return match *method {
            Method::GET => http::build_health_response("ok", http_config),
            _ => http::build_405_response(http_config),
        }
        .into();
    }

    if path == routes.dominance_path {
        return match *method {
            Method::GET => serve_dominance(state).await,
            _ => http::build_405_response(http_config),
        }
        .into();
    }

    if path == routes.generation_path {
        return match *method {
            Method::GET => serve_generation_query(query, state).await,
            Method::POST => serve_generation_body(body, state).await,
            _ => http::build_405_response(http_config).into(),
        };
    }

    http::build_404_response(http_config).into()
}

async fn serve_dominance(state: &AppState) -> Response<Full<Bytes>> {
    let outcome = state.market.fetch().await;
    let body = outcome.into_response(now_rfc3339());
    http::json_response(StatusCode::OK, &body, &state.config.http)
}

/// `GET /generation?action=...`, every other parameter becomes a string field
async fn serve_generation_query(query: Option<&str>, state: &AppState) -> Routed {
    let mut action = None;
    let mut payload = Payload::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key == "action" {
            action = Some(value.into_owned());
        } else {
            payload.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }

    let result = state
        .dispatcher
        .dispatch_read(action.as_deref(), &payload)
        .await;
    Routed {
        response: dispatch_response(result, &state.config.http),
        action,
    }
}

/// `POST /generation` with `{ "action": ..., ...payload }`
async fn serve_generation_body(body: &[u8], state: &AppState) -> Routed {
    let http_config = &state.config.http;
    let Ok(Value::Object(mut payload)) = serde_json::from_slice::<Value>(body) else {
        return http::error_response(StatusCode::BAD_REQUEST, "Invalid JSON body", http_config)
            .into();
    };

    // A non-string action is treated as absent
    let action = match payload.remove("action") {
        Some(Value::String(name)) => Some(name),
        _ => None,
    };

    let result = state.dispatcher.dispatch(action.as_deref(), &payload).await;
    Routed {
        response: dispatch_response(result, http_config),
        action,
    }
}

fn dispatch_response(
    result: Result<ActionResult, DispatchError>,
    http_config: &HttpConfig,
) -> Response<Full<Bytes>> {
    let encoded = result.and_then(|result| {
        serde_json::to_value(result).map_err(|e| {
            let err = DispatchError::Internal(format!("failed to encode result: {e}"));
            logger::log_error(&err.to_string());
            err
        })
    });
    match encoded {
        Ok(body) => http::json_response(StatusCode::OK, &body, http_config),
        Err(e) => http::error_response(e.status(), &e.public_message(), http_config),
    }
}

fn log_access(
    parts: &Parts,
    peer_addr: SocketAddr,
    routed: &Routed,
    started: Instant,
    format: &str,
) {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = match parts.version {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.status = routed.response.status().as_u16();
    entry.body_bytes = routed
        .response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.action.clone_from(&routed.action);
    entry.user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, format);
}
