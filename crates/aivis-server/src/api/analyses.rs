//! Analysis intake and run inspection.
//!
//! Intake validates synchronously, creates the run row, and answers 202
//! before any engine work happens; the launcher drives the run on a
//! background task.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aivis_core::{validate_submission, AnalysisRequest};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct SubmitBody {
    pub domain: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SubmitAccepted {
    queued: bool,
    domain: String,
    email: String,
    analysis_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct AnalysisItem {
    analysis_id: Uuid,
    domain: String,
    requester_email: String,
    status: String,
    failed_step: Option<String>,
    error_message: Option<String>,
    degraded: bool,
    submitted_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl AnalysisItem {
    fn from_row(row: aivis_db::AnalysisRunRow) -> Self {
        Self {
            analysis_id: row.public_id,
            domain: row.domain,
            requester_email: row.requester_email,
            status: row.status,
            failed_step: row.failed_step,
            error_message: row.error_message,
            degraded: row.degraded,
            submitted_at: row.submitted_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

pub(super) async fn submit_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<SubmitBody>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitAccepted>>), ApiError> {
    validate_submission(&body.domain, &body.email)
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;
    let request = AnalysisRequest {
        domain: body.domain.trim().to_lowercase(),
        requester_email: body.email.trim().to_string(),
        submitted_at: Utc::now(),
    };

    let brand = aivis_db::find_or_create_brand_by_domain(&state.pool, &request.domain)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let run = aivis_db::create_analysis_run(
        &state.pool,
        brand.id,
        &request.domain,
        &request.requester_email,
        request.submitted_at,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(run_id = run.id, domain = %run.domain, "analysis queued");
    let accepted = SubmitAccepted {
        queued: true,
        domain: run.domain.clone(),
        email: run.requester_email.clone(),
        analysis_id: run.public_id,
    };
    state.launcher.spawn(run);

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: accepted,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct AnalysesQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_analyses(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<AnalysesQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisItem>>>, ApiError> {
    let rows = aivis_db::list_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(AnalysisItem::from_row).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalysisItem>>, ApiError> {
    let row = aivis_db::get_run_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: AnalysisItem::from_row(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ResultItem {
    prompt_id: i64,
    engine: String,
    mentioned: bool,
    sentiment: String,
    compound: f64,
    score: f64,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_analysis_results(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ResultItem>>>, ApiError> {
    let run = aivis_db::get_run_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = aivis_db::list_results_for_run(&state.pool, run.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| ResultItem {
            prompt_id: row.prompt_id,
            engine: row.engine,
            mentioned: row.mentioned,
            sentiment: row.sentiment,
            compound: row.compound,
            score: row.score,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct CancelData {
    analysis_id: Uuid,
    cancel_requested: bool,
}

pub(super) async fn cancel_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(public_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelData>>, ApiError> {
    let run = aivis_db::get_run_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    aivis_db::request_cancel(&state.pool, run.id)
        .await
        .map_err(|e| match e {
            aivis_db::DbError::NotFound => ApiError::new(
                req_id.0.clone(),
                "conflict",
                "run already reached a terminal state",
            ),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    Ok(Json(ApiResponse {
        data: CancelData {
            analysis_id: public_id,
            cancel_requested: true,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
