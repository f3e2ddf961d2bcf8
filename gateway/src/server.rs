//! axum server wiring.
//!
//! Both deployments expose `/healthz` and `/readyz`. On top of that:
//! - local: `GET /mcp/modules`, `POST /mcp/execute`
//! - proxy: `GET /api/modules`, `POST /api/execute`, plus the fixed `POST /add` and
//!   `POST /multiply` endpoints

use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{
    catalog::ModuleCatalog,
    config::{GatewayConfig, GatewayMode},
    dispatcher::{Dispatcher, LocalBackend, ProxyBackend},
    location::DocumentLocation,
    microservice::HttpServiceInvoker,
    registry::ModuleTarget,
};

struct AppState<B> {
    dispatcher: Dispatcher,
    backend: Arc<B>,
    max_body_bytes: usize,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            backend: Arc::clone(&self.backend),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

fn text(status: StatusCode, body: impl Into<String>) -> Response {
    (status, body.into()).into_response()
}

/// Router for the local deployment.
pub fn local_router(backend: Arc<LocalBackend>, max_body_bytes: usize) -> Router {
    let state = AppState {
        dispatcher: Dispatcher::new(backend.clone()),
        backend,
        max_body_bytes,
    };

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .route("/mcp/modules", get(list_local_modules))
        .route("/mcp/execute", post(handle_execute::<LocalBackend>))
        .with_state(state)
}

/// Router for the proxy deployment.
pub fn proxy_router(backend: Arc<ProxyBackend>, max_body_bytes: usize) -> Router {
    let state = AppState {
        dispatcher: Dispatcher::new(backend.clone()),
        backend,
        max_body_bytes,
    };

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .route("/api/modules", get(list_proxy_modules))
        .route("/api/execute", post(handle_execute::<ProxyBackend>))
        .route("/add", post(handle_add))
        .route("/multiply", post(handle_multiply))
        .with_state(state)
}

/// Build the router for the configured deployment.
pub async fn build_app(cfg: &GatewayConfig) -> anyhow::Result<Router> {
    match cfg.mode {
        GatewayMode::Local => {
            let backend = Arc::new(LocalBackend::builtin()?);
            tracing::info!(
                event = "modules_registered",
                modules = backend.modules().len(),
                "local modules registered"
            );
            Ok(local_router(backend, cfg.max_body_bytes))
        }
        GatewayMode::Proxy => {
            let http = reqwest::Client::builder()
                .timeout(Duration::from_millis(cfg.request_timeout_ms))
                .build()?;
            let catalog = ModuleCatalog::new(
                DocumentLocation::parse(&cfg.modules)?,
                cfg.reload,
                Duration::from_millis(cfg.reload_interval_ms),
                http.clone(),
            );
            let backend = Arc::new(ProxyBackend::new(
                catalog,
                Arc::new(HttpServiceInvoker::from_client(http)),
            ));

            // The catalog may be fixed after start-up, so a bad document is not fatal here.
            if let Err(err) = backend.catalog().current().await {
                tracing::warn!(
                    event = "catalog_unavailable",
                    location = %backend.catalog().location(),
                    error = %err.cause,
                    "module catalog not loadable yet"
                );
            }
            Ok(proxy_router(backend, cfg.max_body_bytes))
        }
    }
}

pub async fn run(cfg: GatewayConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr()).await?;
    tracing::info!(
        event = "listening",
        addr = %listener.local_addr()?,
        mode = ?cfg.mode,
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// Serve `app` on an already bound listener until `shutdown` fires.
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: oneshot::Receiver<()>,
) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await?;
    Ok(())
}

/// Decode the body and hand it to the dispatcher.
///
/// Oversized and non-JSON bodies are rejected here with a plain-text reply; the dispatcher is
/// never reached and no envelope is produced.
async fn handle_execute<B>(State(state): State<AppState<B>>, req: Request<Body>) -> Response
where
    B: Send + Sync + 'static,
{
    let id = format!("r-{}", Uuid::new_v4());
    let span = tracing::info_span!("execute", request_id = %id, module = tracing::field::Empty);

    let body = match to_bytes(req.into_body(), state.max_body_bytes).await {
        Ok(b) => b,
        Err(_) => return text(StatusCode::PAYLOAD_TOO_LARGE, "body too large"),
    };

    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(parent: &span, event = "decode_rejected", error = %err, "request rejected");
            return text(StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}"));
        }
    };

    let (status, envelope) = state
        .dispatcher
        .dispatch_with_status(&raw)
        .instrument(span)
        .await;
    (status, Json(envelope)).into_response()
}

#[derive(Debug, Serialize)]
struct LocalModuleInfo<'a> {
    name: &'a str,
    description: &'a str,
    handler_path: &'a str,
}

async fn list_local_modules(State(state): State<AppState<LocalBackend>>) -> Response {
    let modules: Vec<LocalModuleInfo<'_>> = state
        .backend
        .modules()
        .list_all()
        .iter()
        .filter_map(|m| match &m.target {
            ModuleTarget::Local(target) => Some(LocalModuleInfo {
                name: &m.name,
                description: &m.description,
                handler_path: &target.reference,
            }),
            ModuleTarget::Remote(_) => None,
        })
        .collect();
    Json(modules).into_response()
}

#[derive(Debug, Serialize)]
struct ModuleInfo {
    name: String,
    description: String,
}

async fn list_proxy_modules(State(state): State<AppState<ProxyBackend>>) -> Response {
    match state.backend.catalog().current().await {
        Ok(registry) => Json(
            registry
                .list_all()
                .iter()
                .map(|m| ModuleInfo {
                    name: m.name.clone(),
                    description: m.description.clone(),
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => {
            tracing::error!(event = "catalog_unavailable", error = %err, "module listing failed");
            text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct NumbersRequest {
    num1: f64,
    num2: f64,
}

#[derive(Debug, Serialize)]
struct NumberResult {
    result: f64,
}

async fn handle_add(Json(req): Json<NumbersRequest>) -> Json<NumberResult> {
    Json(NumberResult {
        result: req.num1 + req.num2,
    })
}

async fn handle_multiply(Json(req): Json<NumbersRequest>) -> Json<NumberResult> {
    Json(NumberResult {
        result: req.num1 * req.num2,
    })
}
