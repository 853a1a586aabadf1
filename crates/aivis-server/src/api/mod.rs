mod analyses;
mod brands;
mod content;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use aivis_core::ContentExtractor;

use crate::middleware::{request_id, RequestId};
use crate::runs::RunLauncher;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub launcher: Arc<RunLauncher>,
    pub extractor: Arc<dyn ContentExtractor>,
    pub trend_window: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" | "empty_content" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "upstream_unavailable" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn normalize_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

pub(super) fn map_db_error(request_id: String, error: &aivis_db::DbError) -> ApiError {
    if matches!(error, aivis_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "record not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/analyses",
            get(analyses::list_analyses).post(analyses::submit_analysis),
        )
        .route("/api/v1/analyses/{public_id}", get(analyses::get_analysis))
        .route(
            "/api/v1/analyses/{public_id}/results",
            get(analyses::list_analysis_results),
        )
        .route(
            "/api/v1/analyses/{public_id}/cancel",
            post(analyses::cancel_analysis),
        )
        .route(
            "/api/v1/content/scores",
            get(content::list_scores).post(content::score_content),
        )
        .route(
            "/api/v1/brands",
            get(brands::list_brands).post(brands::create_brand),
        )
        .route(
            "/api/v1/brands/{slug}/competitors",
            get(brands::list_competitors).post(brands::add_competitor),
        )
        .route(
            "/api/v1/brands/{slug}/prompts",
            get(brands::list_prompts).post(brands::create_prompt),
        )
        .route("/api/v1/brands/{slug}/history", get(brands::history))
        .route("/api/v1/brands/{slug}/comparison", get(brands::comparison))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match aivis_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use tower::ServiceExt;

    use aivis_core::{EngineQuery, ExternalError, Notifier, RunSummary};
    use aivis_engines::LogNotifier;
    use aivis_pipeline::{Orchestrator, OrchestratorConfig, PgRunStore};

    struct StubEngine;

    impl EngineQuery for StubEngine {
        fn query<'a>(
            &'a self,
            engine: &'a str,
            _prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, ExternalError>> {
            async move { Ok(format!("Acme is excellent, says {engine}.")) }.boxed()
        }
    }

    struct StubExtractor(&'static str);

    impl ContentExtractor for StubExtractor {
        fn extract<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, ExternalError>> {
            async move { Ok(self.0.to_string()) }.boxed()
        }
    }

    fn test_state(pool: PgPool, page_text: &'static str) -> AppState {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(PgRunStore::new(pool.clone())),
            Arc::new(StubEngine),
            Arc::new(LogNotifier),
            OrchestratorConfig {
                engines: vec!["atlas".to_string()],
                max_concurrency: 2,
                max_retries: 0,
                backoff_base_ms: 0,
            },
        ));
        AppState {
            pool: pool.clone(),
            launcher: Arc::new(RunLauncher::new(pool, orchestrator)),
            extractor: Arc::new(StubExtractor(page_text)),
            trend_window: 7,
        }
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_route_reports_ok(pool: PgPool) {
        let app = build_app(test_state(pool, ""));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"status\":\"ok\""));
        assert!(body.contains("request_id"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_rejects_an_invalid_email(pool: PgPool) {
        let app = build_app(test_state(pool.clone(), ""));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyses")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"domain": "acme.io", "email": "not-an-email"})
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analysis_runs")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0, "rejected submissions must not create runs");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn submit_queues_a_run_and_returns_202(pool: PgPool) {
        let app = build_app(test_state(pool.clone(), ""));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyses")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"domain": "Acme.IO", "email": "dev@acme.io"})
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = body_string(response).await;
        assert!(body.contains("\"queued\":true"));
        assert!(body.contains("\"domain\":\"acme.io\""));

        let domain: String = sqlx::query_scalar("SELECT domain FROM analysis_runs LIMIT 1")
            .fetch_one(&pool)
            .await
            .expect("run row");
        assert_eq!(domain, "acme.io");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_then_list_brands_round_trips(pool: PgPool) {
        let state = test_state(pool, "");
        let response = build_app(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/brands")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "name": "Acme",
                            "domain": "acme.io",
                            "industry": "saas",
                            "aliases": ["Acme Corp"]
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/brands")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("\"slug\":\"acme\""));
        assert!(body.contains("Acme Corp"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn scoring_an_empty_page_is_a_400_and_persists_nothing(pool: PgPool) {
        // Extractors reduce markup-only pages to an empty string.
        let app = build_app(test_state(pool.clone(), ""));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/content/scores")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"url": "https://acme.io/empty"}).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("empty_content"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_scores")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn scoring_a_real_page_persists_a_history_point(pool: PgPool) {
        let app = build_app(test_state(
            pool.clone(),
            "Acme widgets are excellent and reliable. Teams love the simple setup.",
        ));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/content/scores")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"url": "https://acme.io/blog"}).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("composite_score"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content_scores")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn normalize_offset_floors_at_zero() {
        assert_eq!(normalize_offset(None), 0);
        assert_eq!(normalize_offset(Some(-5)), 0);
        assert_eq!(normalize_offset(Some(30)), 30);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_empty_content_maps_to_bad_request() {
        let response = ApiError::new("req-1", "empty_content", "no scoreable text").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
