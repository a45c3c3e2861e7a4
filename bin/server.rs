// Identity Resolver - Web Server
// REST API with Axum
//
//   GET  /api/health
//   GET  /api/resolve?id=<raw>&name=<filter>
//   POST /api/resolve/batch            [{"id": "...", "name": "..."}]
//   GET  /api/candidates/:personal
//   GET  /api/events/:id               audit history, newest first

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use identity_resolver::config::ENV_CONFIG_PATH;
use identity_resolver::{
    candidates, AuditLog, Event, Outcome, PersonalNumber, ResolutionEngine, ResolveRequest,
    ResolverConfig, VERSION,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "identity-server", version = VERSION)]
struct Args {
    /// Resolver config file (TOML)
    #[arg(long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    #[arg(long, env = "IDENTITY_SERVER_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    engine: Arc<ResolutionEngine>,
    audit: Option<Arc<AuditLog>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    fn failed(data: T, error: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(error),
        }
    }
}

#[derive(Deserialize)]
struct ResolveParams {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct CandidateView {
    tax_id: String,
    formatted: String,
}

/// HTTP status carried by an outcome
fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Outcome::ProviderError { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::OK,
    }
}

/// Write one audit event per resolution on the blocking pool
async fn audit(state: &AppState, entries: Vec<(ResolveRequest, Outcome)>) {
    let Some(log) = state.audit.clone() else {
        return;
    };

    let written = tokio::task::spawn_blocking(move || {
        for (request, outcome) in &entries {
            log.record_resolution(&request.id, request.name.as_deref(), outcome, "api")?;
        }
        Ok::<_, anyhow::Error>(())
    })
    .await;

    match written {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to write audit event"),
        Err(e) => tracing::warn!(error = %e, "Audit task did not complete"),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/resolve - Resolve one identifier
async fn resolve(State(state): State<AppState>, Query(params): Query<ResolveParams>) -> Response {
    let name = params.name.as_deref();
    let outcome = state.engine.resolve(&params.id, name).await;
    audit(&state, vec![(ResolveRequest::new(&params.id, name), outcome.clone())]).await;

    let status = outcome_status(&outcome);
    let body = if outcome.is_error() {
        let error = outcome.summary();
        ApiResponse::failed(outcome, error)
    } else {
        ApiResponse::ok(outcome)
    };

    (status, Json(body)).into_response()
}

/// POST /api/resolve/batch - Resolve many identifiers, results in request order
async fn resolve_batch(
    State(state): State<AppState>,
    Json(requests): Json<Vec<ResolveRequest>>,
) -> Response {
    let outcomes = state.engine.resolve_batch(requests.clone()).await;
    audit(&state, requests.into_iter().zip(outcomes.iter().cloned()).collect()).await;

    (StatusCode::OK, Json(ApiResponse::ok(outcomes))).into_response()
}

/// GET /api/candidates/:personal - Tax-ID candidates of a personal number
async fn get_candidates(Path(personal): Path<String>) -> Response {
    match PersonalNumber::new(personal.trim()) {
        Ok(personal) => {
            let views: Vec<CandidateView> = candidates(&personal)
                .into_iter()
                .map(|tax_id| CandidateView {
                    formatted: tax_id.formatted(),
                    tax_id: tax_id.to_string(),
                })
                .collect();

            (StatusCode::OK, Json(ApiResponse::ok(views))).into_response()
        }
        Err(reason) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failed(
                Vec::<CandidateView>::new(),
                format!("invalid personal number: {}", reason),
            )),
        )
            .into_response(),
    }
}

/// GET /api/events/:id - Audit history of one raw identifier
async fn get_events(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(log) = state.audit.clone() else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::failed(Vec::<Event>::new(), "audit log is not configured".into())),
        )
            .into_response();
    };

    let error = match tokio::task::spawn_blocking(move || log.events_for_id(&id)).await {
        Ok(Ok(events)) => return (StatusCode::OK, Json(ApiResponse::ok(events))).into_response(),
        Ok(Err(e)) => e.to_string(),
        Err(e) => e.to_string(),
    };

    tracing::error!(%error, "Failed to read audit events");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::failed(Vec::<Event>::new(), error)),
    )
        .into_response()
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/resolve", get(resolve))
        .route("/resolve/batch", post(resolve_batch))
        .route("/candidates/:personal", get(get_candidates))
        .route("/events/:id", get(get_events))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_resolver=info,identity_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    println!("🌐 Identity Resolver - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = ResolverConfig::load(args.config.as_deref())?;
    let engine = ResolutionEngine::from_config(&config)?;
    println!("✓ Providers (priority order): {}", engine.provider_names().join(", "));

    let audit = match &config.audit_db {
        Some(path) => {
            println!("✓ Audit log: {}", path.display());
            Some(Arc::new(AuditLog::open(path)?))
        }
        None => None,
    };

    let state = AppState {
        engine: Arc::new(engine),
        audit,
    };

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;

    println!("\n🚀 Server running on http://{}", args.addr);
    println!("   API: http://{}/api/resolve?id=47156273", args.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, build_router(state))
        .await
        .context("Server terminated")?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use identity_resolver::{CandidateRecord, MemoryProvider, Provider, TaxId};
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let provider = MemoryProvider::with_records(
            "memory",
            vec![CandidateRecord::new("PEREZ JUAN", TaxId::parse("20471562735").unwrap())],
        );
        let engine = ResolutionEngine::new(vec![Arc::new(provider) as Arc<dyn Provider>]);

        AppState {
            engine: Arc::new(engine),
            audit: Some(Arc::new(AuditLog::in_memory().unwrap())),
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(build_router(create_test_state()), get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_resolve_ok_and_audited() {
        let state = create_test_state();
        let app = build_router(state.clone());

        let (status, body) = send(app, get_request("/api/resolve?id=47156273&name=juan")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "filtered_single");
        assert_eq!(body["data"]["data"]["tax_id"], "20471562735");
        assert!(body.get("error").is_none());

        let audit = state.audit.as_ref().unwrap();
        assert_eq!(audit.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolve_invalid_input_is_400() {
        let (status, body) = send(build_router(create_test_state()), get_request("/api/resolve?id=12AB")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["outcome"], "invalid_input");
        assert_eq!(body["data"]["data"]["reason"], "non_numeric");
    }

    #[tokio::test]
    async fn test_resolve_not_found_is_200() {
        let (status, body) = send(build_router(create_test_state()), get_request("/api/resolve?id=30111222")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["outcome"], "not_found");
    }

    #[tokio::test]
    async fn test_provider_error_is_502() {
        assert_eq!(
            outcome_status(&Outcome::ProviderError {
                provider: "gateway".into(),
                reason: "timed out after 10 ms".into(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn test_candidates() {
        let app = build_router(create_test_state());
        let (status, body) = send(app, get_request("/api/candidates/47156273")).await;

        assert_eq!(status, StatusCode::OK);
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["tax_id"], "20471562735");
        assert_eq!(list[0]["formatted"], "20-47156273-5");

        let app = build_router(create_test_state());
        let (status, _) = send(app, get_request("/api/candidates/12")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_batch() {
        let app = build_router(create_test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/api/resolve/batch")
            .header("content-type", "application/json")
            .body(Body::from(r#"[{"id": "47156273"}, {"id": "12AB"}]"#))
            .unwrap();

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["outcome"], "resolved");
        assert_eq!(body["data"][1]["outcome"], "invalid_input");
    }

    #[tokio::test]
    async fn test_batch_is_audited() {
        let state = create_test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/resolve/batch")
            .header("content-type", "application/json")
            .body(Body::from(r#"[{"id": "47156273", "name": "juan"}, {"id": "12AB"}]"#))
            .unwrap();

        let (status, _) = send(build_router(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let audit = state.audit.as_ref().unwrap();
        assert_eq!(audit.count().unwrap(), 2);
        let events = audit.events_for_id("12AB").unwrap();
        assert_eq!(events[0].outcome, "invalid_input");
        assert_eq!(events[0].actor, "api");
    }

    #[tokio::test]
    async fn test_events_history() {
        let state = create_test_state();
        send(build_router(state.clone()), get_request("/api/resolve?id=47156273")).await;
        send(build_router(state.clone()), get_request("/api/resolve?id=47156273&name=maria")).await;

        let (status, body) = send(build_router(state), get_request("/api/events/47156273")).await;

        assert_eq!(status, StatusCode::OK);
        let events = body["data"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["outcome"], "no_match_best_effort");
        assert_eq!(events[0]["data"]["name_filter"], "maria");
        assert_eq!(events[1]["outcome"], "resolved");
    }

    #[tokio::test]
    async fn test_events_without_audit_log_is_404() {
        let state = AppState {
            audit: None,
            ..create_test_state()
        };
        let (status, body) = send(build_router(state), get_request("/api/events/47156273")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
