//! On-demand content scoring and its history.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use aivis_core::{validate_url, ExternalError};
use aivis_scoring::{score_content as compute_content_score, ScoreWeights, ScoringError};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, normalize_offset, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ScoreBody {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ContentScoreItem {
    url: String,
    composite_score: f64,
    readability_ease: f64,
    sentiment_favorability: f64,
    subscores: Value,
    scored_at: DateTime<Utc>,
}

impl ContentScoreItem {
    fn from_row(row: aivis_db::ContentScoreRow) -> Self {
        Self {
            url: row.url,
            composite_score: row.composite_score,
            readability_ease: row.readability_ease,
            sentiment_favorability: row.sentiment_favorability,
            subscores: row.subscores,
            scored_at: row.scored_at,
        }
    }
}

async fn score_and_persist(
    state: AppState,
    req_id: String,
    url: &str,
) -> Result<ContentScoreItem, ApiError> {
    validate_url(url)
        .map_err(|e| ApiError::new(req_id.clone(), "validation_error", e.to_string()))?;

    let text = state.extractor.extract(url).await.map_err(|e| match e {
        ExternalError::Rejected { .. } => {
            ApiError::new(req_id.clone(), "bad_request", e.to_string())
        }
        _ => ApiError::new(req_id.clone(), "upstream_unavailable", e.to_string()),
    })?;

    let score = compute_content_score(&text, ScoreWeights::default()).map_err(|e| match e {
        ScoringError::EmptyContent => ApiError::new(
            req_id.clone(),
            "empty_content",
            "page has no scoreable text",
        ),
        other => ApiError::new(req_id.clone(), "internal_error", other.to_string()),
    })?;

    let subscores = serde_json::json!({
        "readability": score.readability,
        "sentiment": score.sentiment,
    });
    let row = aivis_db::insert_content_score(
        &state.pool,
        url,
        score.composite,
        score.readability_ease,
        score.sentiment_favorability,
        &subscores,
        Utc::now(),
    )
    .await
    .map_err(|e| map_db_error(req_id, &e))?;

    Ok(ContentScoreItem::from_row(row))
}

pub(super) async fn score_content(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ScoreBody>,
) -> Result<Json<ApiResponse<ContentScoreItem>>, ApiError> {
    let url = body.url.trim().to_string();
    let item = score_and_persist(state, req_id.0.clone(), &url).await?;

    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ScoresQuery {
    pub url: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub(super) async fn list_scores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ScoresQuery>,
) -> Result<Json<ApiResponse<Vec<ContentScoreItem>>>, ApiError> {
    let rows = aivis_db::list_content_scores(
        &state.pool,
        query.url.as_deref(),
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ContentScoreItem::from_row).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
