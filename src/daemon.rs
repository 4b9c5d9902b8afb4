//! HTTP daemon surface.
//!
//! Serves the three channel-test endpoints over a plain hyper/http1 loop:
//!
//! - `GET /api/channel/test_template?model_name=..&endpoint_type=..`
//! - `GET /api/channel/test` (start a fleet sweep)
//! - `GET /api/channel/test/{id}?model=..&endpoint_type=..`

use std::collections::HashMap;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;

use crate::core::api;
use crate::core::audit::MemoryAuditSink;
use crate::core::channel::{
    LogNotifier, MemoryChannelStore, MemoryModelMapper, MemoryOverrideStore, StaticGroupResolver,
};
use crate::core::fleet::FleetTester;
use crate::core::policy::DefaultBanPolicy;
use crate::core::pricing::MemoryPricingSource;
use crate::core::probe::MonitorDeps;
use crate::core::settings::MonitorSettings;
use crate::error::{RelayError, Result};
use crate::relay::transport::Transport;
use crate::storage::DaemonConfig;

// =============================================================================
// App State
// =============================================================================

/// Shared daemon state.
#[derive(Clone)]
pub struct AppState {
    pub deps: MonitorDeps,
    pub fleet: Arc<FleetTester>,
}

/// Wire the in-memory collaborators from a loaded config.
pub fn build_state(config: &DaemonConfig, transport: Arc<dyn Transport>) -> Result<AppState> {
    let channels = Arc::new(MemoryChannelStore::with_channels(config.build_channels()?));

    let aliases = Arc::new(MemoryModelMapper::new());
    for channel in &config.channels {
        for (model, upstream) in &channel.model_mapping {
            aliases.insert(channel.id, model, upstream);
        }
    }

    let pricing = Arc::new(MemoryPricingSource::new());
    for (model, price) in &config.pricing {
        pricing.insert(model, *price);
    }

    let overrides = Arc::new(MemoryOverrideStore::new());
    for (model, body) in &config.overrides {
        overrides.insert(model, body);
    }

    let deps = MonitorDeps {
        channels,
        groups: Arc::new(StaticGroupResolver::default()),
        aliases,
        overrides,
        pricing,
        policy: Arc::new(DefaultBanPolicy::new()),
        audit: Arc::new(MemoryAuditSink::new()),
        notifier: Arc::new(LogNotifier),
        transport,
        settings: Arc::new(MonitorSettings::new(config.monitor)),
    };
    let fleet = FleetTester::new(deps.clone());
    Ok(AppState { deps, fleet })
}

// =============================================================================
// Routing
// =============================================================================

/// Handle one request.
///
/// Generic over the body type; routing never reads the body.
pub async fn handle<B>(state: AppState, req: Request<B>) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let query = parse_query(req.uri().query().unwrap_or(""));

    if req.method() != Method::GET {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "only GET is supported on this surface",
        );
    }

    let endpoint_hint = query.get("endpoint_type").map_or("", String::as_str);

    match path.as_str() {
        // The template route names its query key "model_name"; the
        // per-channel route uses "model".
        "/api/channel/test_template" => {
            let model = query.get("model_name").map_or("", String::as_str);
            match api::probe_template(model, endpoint_hint) {
                Ok(template) => json_response(
                    StatusCode::OK,
                    &json!({"success": true, "data": template}),
                ),
                Err(err) => relay_error_response(&err),
            }
        }
        "/api/channel/test" => match api::test_all_channels(&state.fleet) {
            Ok(report) => json_response(StatusCode::OK, &report),
            Err(err) => relay_error_response(&err),
        },
        _ => match path.strip_prefix("/api/channel/test/") {
            Some(raw_id) => match raw_id.parse::<i64>() {
                Ok(id) => {
                    let model = query.get("model").map_or("", String::as_str);
                    match api::test_channel(&state.deps, id, model, endpoint_hint).await {
                        Ok(report) => json_response(StatusCode::OK, &report),
                        Err(err) => relay_error_response(&err),
                    }
                }
                Err(_) => error_response(StatusCode::BAD_REQUEST, "channel id must be an integer"),
            },
            None => error_response(StatusCode::NOT_FOUND, "no such endpoint"),
        },
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((key.to_string(), percent_decode(value)))
        })
        .collect()
}

/// Minimal percent-decoding for query values (`%XX` sequences and `+`).
fn percent_decode(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2
                && let Ok(byte) = u8::from_str_radix(&hex, 16)
            {
                output.push(char::from(byte));
                continue;
            }
            // Malformed escape; keep the original characters.
            output.push('%');
            output.push_str(&hex);
        } else if c == '+' {
            output.push(' ');
        } else {
            output.push(c);
        }
    }
    output
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let rendered = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(rendered)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({"success": false, "message": message}))
}

fn relay_error_response(err: &RelayError) -> Response<Full<Bytes>> {
    let status = match err {
        RelayError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        RelayError::SweepAlreadyRunning => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    json_response(
        status,
        &json!({"success": false, "message": err.to_string(), "code": err.code()}),
    )
}

// =============================================================================
// Server Loop
// =============================================================================

/// Bind and serve until the process exits.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| RelayError::Configuration {
            message: format!("cannot bind {bind}: {e}"),
        })?;
    tracing::info!(bind, "daemon listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, std::convert::Infallible>(handle(state, req).await) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!(peer = %peer, error = %e, "connection error");
            }
        });
    }
}
