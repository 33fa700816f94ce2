//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router: webhook endpoint plus a catch-all serve
//!   handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Map resolution outcomes to status codes and error pages
//! - Verify webhook signatures before any mutation happens
//!
//! # Design Decisions
//! - The webhook responds 200 before a restart is triggered, so the
//!   sender marks the delivery as received
//! - Error pages come from the `error` base tree when one is planted
//!   for the status, with a plain status line as the fallback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ArborConfig;
use crate::error::ArborError;
use crate::handler::Context;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle;
use crate::observability::metrics;
use crate::route::Target;
use crate::server::Arbor;
use crate::sync::driver::RestartAction;
use crate::sync::{signature, PushPayload, SyncDriver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub arbor: Arc<Arbor>,
    pub driver: Option<Arc<SyncDriver>>,
}

/// HTTP server for the content tree.
pub struct HttpServer {
    router: Router,
    config: ArborConfig,
}

impl HttpServer {
    pub fn new(arbor: Arc<Arbor>, driver: Option<Arc<SyncDriver>>) -> Self {
        let config = arbor.config.clone();
        let state = AppState { arbor, driver };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    fn build_router(config: &ArborConfig, state: AppState) -> Router {
        let mut router = Router::new();
        if config.sync.enabled {
            router = router.route(&config.sync.payload_path, post(webhook_handler));
        }
        router
            .fallback(serve_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(lifecycle::shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }
}

/// Webhook endpoint. Signature verification happens on the raw body
/// before anything is parsed or mutated.
async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(driver) = state.driver.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let config = &state.arbor.config.sync;

    let signature_header = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !signature::verify(&config.secret, &body, signature_header) {
        tracing::warn!("Webhook delivery rejected: signature mismatch");
        return StatusCode::FORBIDDEN.into_response();
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if event != "push" {
        tracing::debug!(event = %event, "Acknowledging non-push event");
        return StatusCode::OK.into_response();
    }

    let payload: PushPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook delivery rejected: malformed payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let outcome = driver.apply(&payload).await;
    tracing::info!(
        applied = outcome.applied,
        failed = outcome.failed,
        restart = ?outcome.restart,
        "Push payload processed"
    );

    if outcome.restart != RestartAction::None {
        let install = match outcome.restart {
            RestartAction::InstallAndRestart => Some(config.install_command.clone()),
            _ => None,
        };
        // Let the 200 flush to the sender before the process goes down.
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            lifecycle::restart_process(install.as_deref()).await;
        });
    }

    StatusCode::OK.into_response()
}

/// Catch-all content handler.
async fn serve_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Response {
    let start = Instant::now();
    let response = serve(&state.arbor, &method, &uri).await;
    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn serve(arbor: &Arbor, method: &Method, uri: &Uri) -> Response {
    let Some(decoded) = decode_path(uri.path()) else {
        return status_page(arbor, StatusCode::BAD_REQUEST, method).await;
    };
    let normalized = arbor.normalize(&decoded);

    // Canonical form only: `/a/b.html`, `/a/index` and friends redirect
    // to their extensionless shape.
    if normalized != decoded {
        let encoded = utf8_percent_encode(&normalized, PATH_ENCODE);
        let location = match uri.query() {
            Some(q) => format!("{encoded}?{q}"),
            None => encoded.to_string(),
        };
        return redirect(StatusCode::MOVED_PERMANENTLY, &location);
    }

    let public_root = match arbor.config.content.roots.first() {
        Some(root) => root.clone(),
        None => return status_page(arbor, StatusCode::NOT_FOUND, method).await,
    };
    let logical = format!("{public_root}{normalized}");

    let resolved = match arbor.resolve(&logical, method).await {
        Ok(r) => r,
        Err(ArborError::NotPlanted(_)) => {
            return status_page(arbor, StatusCode::NOT_FOUND, method).await;
        }
        Err(e) => {
            tracing::error!(path = %logical, error = %e, "Resolution failed");
            return status_page(arbor, StatusCode::INTERNAL_SERVER_ERROR, method).await;
        }
    };

    if resolved.forbidden {
        return status_page(arbor, StatusCode::FORBIDDEN, method).await;
    }
    if resolved.method_not_allowed {
        let mut response = status_page(arbor, StatusCode::METHOD_NOT_ALLOWED, method).await;
        if let Ok(allow) = allow_header(&resolved.allowed_methods) {
            response.headers_mut().insert(header::ALLOW, allow);
        }
        return response;
    }
    let Some(target) = &resolved.target else {
        return status_page(arbor, StatusCode::NOT_FOUND, method).await;
    };

    match target {
        Target::Static(_) => serve_static(arbor, &resolved.raw_path, method).await,
        Target::Handler(_) => serve_handler_route(arbor, &logical, method, uri).await,
    }
}

async fn serve_static(arbor: &Arbor, raw_path: &str, method: &Method) -> Response {
    let abs = arbor.base_path.join(raw_path);
    let bytes = match tokio::fs::read(&abs).await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(path = %raw_path, error = %e, "Static read failed");
            return status_page(arbor, StatusCode::INTERNAL_SERVER_ERROR, method).await;
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(raw_path));

    // Minified assets advertise their sibling map for debuggers.
    if arbor.pipeline.has_siblings(raw_path) {
        let file_name = raw_path.rsplit('/').next().unwrap_or(raw_path);
        builder = builder.header("SourceMap", format!("{file_name}.map"));
    }

    builder
        .body(Body::from(bytes))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn serve_handler_route(arbor: &Arbor, logical: &str, method: &Method, uri: &Uri) -> Response {
    let mut caller = Context::for_method(method.clone());
    caller.query = uri.query().map(str::to_owned);

    match arbor.load(logical, &caller).await {
        Ok(ctx) => context_response(ctx),
        Err(e) => {
            tracing::error!(path = %logical, error = %e, "Handler execution failed");
            status_page(arbor, StatusCode::INTERNAL_SERVER_ERROR, method).await
        }
    }
}

/// Turn a finished handler context into an HTTP response.
fn context_response(ctx: Context) -> Response {
    if let Some(location) = &ctx.redirect {
        let status = ctx
            .status
            .and_then(|s| StatusCode::from_u16(s).ok())
            .filter(StatusCode::is_redirection)
            .unwrap_or(StatusCode::FOUND);
        return redirect(status, location);
    }

    let status = ctx
        .status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .unwrap_or(StatusCode::OK);

    let mut builder = Response::builder().status(status);
    for (name, value) in &ctx.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(ctx.value))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Serve an error page from the `error` tree, falling back to a plain
/// status line when none is planted for this status.
async fn status_page(arbor: &Arbor, status: StatusCode, method: &Method) -> Response {
    let logical = format!("error/{}", status.as_u16());
    let resolved = arbor.resolve(&logical, method).await;

    if matches!(&resolved, Ok(r) if r.is_found()) {
        let caller = Context::for_method(method.clone());
        if let Ok(mut ctx) = arbor.load(&logical, &caller).await {
            ctx.status = Some(status.as_u16());
            ctx.redirect = None;
            return context_response(ctx);
        }
    }

    let line = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    (status, line).into_response()
}

/// Characters that cannot appear raw in a `Location` path.
const PATH_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Percent-decode a request path. `None` when a `%` escape is
/// malformed or the decoded bytes are not valid UTF-8; those requests
/// are answered with 400 rather than matched literally.
fn decode_path(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = i + 2 < bytes.len()
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn redirect(status: StatusCode, location: &str) -> Response {
    let mut builder = Response::builder().status(status);
    if let Ok(value) = header::HeaderValue::from_str(location) {
        builder = builder.header(header::LOCATION, value);
    }
    builder
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn allow_header(methods: &[Method]) -> Result<header::HeaderValue, header::InvalidHeaderValue> {
    let joined = methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    header::HeaderValue::from_str(&joined)
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "txt" | "source" => "text/plain; charset=utf-8",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_cover_pipeline_outputs() {
        assert_eq!(content_type("www/app.js"), "text/javascript; charset=utf-8");
        assert_eq!(
            content_type("www/app.js.map"),
            "application/json; charset=utf-8"
        );
        assert_eq!(
            content_type("www/app.js.source"),
            "text/plain; charset=utf-8"
        );
        assert_eq!(content_type("www/logo"), "application/octet-stream");
    }

    #[test]
    fn percent_escapes_decode_before_resolution() {
        assert_eq!(decode_path("/a%20b").as_deref(), Some("/a b"));
        assert_eq!(decode_path("/plain").as_deref(), Some("/plain"));
        assert!(decode_path("/bad%2").is_none());
        assert!(decode_path("/bad%zz").is_none());
        // A lone 0xFF byte is not valid UTF-8 once decoded.
        assert!(decode_path("/bad%ff").is_none());
    }

    #[test]
    fn redirect_locations_are_re_encoded() {
        assert_eq!(
            utf8_percent_encode("/a b/c", PATH_ENCODE).to_string(),
            "/a%20b/c"
        );
    }

    #[test]
    fn allow_header_joins_methods() {
        let value = allow_header(&[Method::GET, Method::POST]).unwrap();
        assert_eq!(value.to_str().unwrap(), "GET, POST");
    }
}
