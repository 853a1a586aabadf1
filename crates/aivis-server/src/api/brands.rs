//! Brand management, visibility history, and competitor comparison.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aivis_core::Industry;
use aivis_db::{BrandRow, NewBrand, VisibilityPointRow};
use aivis_pipeline::{compare, ComparisonResult, EntityHistory, ScorePoint};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, normalize_offset, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct BrandItem {
    id: i64,
    name: String,
    slug: String,
    domain: String,
    industry: String,
    aliases: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl BrandItem {
    fn from_row(row: BrandRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            domain: row.domain,
            industry: row.industry,
            aliases: row.aliases,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BrandsQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_brands(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<BrandsQuery>,
) -> Result<Json<ApiResponse<Vec<BrandItem>>>, ApiError> {
    let rows = aivis_db::list_brands(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BrandItem::from_row).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateBrandBody {
    pub name: String,
    pub domain: String,
    pub industry: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

pub(super) async fn create_brand(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateBrandBody>,
) -> Result<(StatusCode, Json<ApiResponse<BrandItem>>), ApiError> {
    let name = body.name.trim();
    let domain = body.domain.trim().to_lowercase();
    if name.is_empty() || domain.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "name and domain are required",
        ));
    }

    let industry = body
        .industry
        .as_deref()
        .map_or(Industry::Other, Industry::parse);
    let row = aivis_db::create_brand(
        &state.pool,
        &NewBrand {
            name: name.to_string(),
            domain,
            industry: industry.as_str().to_string(),
            aliases: body.aliases,
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: BrandItem::from_row(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_competitors(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<BrandItem>>>, ApiError> {
    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = aivis_db::list_competitors(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(BrandItem::from_row).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddCompetitorBody {
    pub competitor_slug: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CompetitorLink {
    brand_id: i64,
    competitor_id: i64,
}

pub(super) async fn add_competitor(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Json(body): Json<AddCompetitorBody>,
) -> Result<(StatusCode, Json<ApiResponse<CompetitorLink>>), ApiError> {
    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let competitor = aivis_db::get_brand_by_slug(&state.pool, &body.competitor_slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if brand.id == competitor.id {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "a brand cannot compete with itself",
        ));
    }

    aivis_db::add_competitor(&state.pool, brand.id, competitor.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CompetitorLink {
                brand_id: brand.id,
                competitor_id: competitor.id,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub(super) struct PromptItem {
    id: i64,
    text: String,
    tags: Vec<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

pub(super) async fn list_prompts(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<PromptItem>>>, ApiError> {
    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = aivis_db::list_prompts(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PromptItem {
            id: row.id,
            text: row.text,
            tags: row.tags,
            is_active: row.is_active,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePromptBody {
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

pub(super) async fn create_prompt(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Json(body): Json<CreatePromptBody>,
) -> Result<(StatusCode, Json<ApiResponse<PromptItem>>), ApiError> {
    let text = body.text.trim();
    if text.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "prompt text is required",
        ));
    }

    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let row = aivis_db::create_prompt(&state.pool, brand.id, text, &body.tags)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: PromptItem {
                id: row.id,
                text: row.text,
                tags: row.tags,
                is_active: row.is_active,
                created_at: row.created_at,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct HistoryPoint {
    run_id: i64,
    completed_at: DateTime<Utc>,
    score: f64,
    result_count: i64,
}

pub(super) async fn history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoryPoint>>>, ApiError> {
    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let rows = aivis_db::visibility_history(
        &state.pool,
        brand.id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| HistoryPoint {
            run_id: row.run_id,
            completed_at: row.completed_at,
            score: row.score,
            result_count: row.result_count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn to_history(brand: &BrandRow, points: Vec<VisibilityPointRow>) -> EntityHistory {
    EntityHistory {
        entity_id: brand.id,
        label: brand.name.clone(),
        points: points
            .into_iter()
            .map(|p| ScorePoint {
                completed_at: p.completed_at,
                score: p.score,
            })
            .collect(),
    }
}

pub(super) async fn comparison(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ComparisonResult>>, ApiError> {
    let brand = aivis_db::get_brand_by_slug(&state.pool, &slug)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let competitors = aivis_db::list_competitors(&state.pool, brand.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    // One history fetch per entity; the window + 1 newest points suffice for
    // current score and trend.
    let depth = i64::try_from(state.trend_window).unwrap_or(7) + 1;
    let mut histories = Vec::with_capacity(competitors.len() + 1);
    for entity in std::iter::once(&brand).chain(competitors.iter()) {
        let points = aivis_db::visibility_history(&state.pool, entity.id, depth, 0)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
        histories.push(to_history(entity, points));
    }

    Ok(Json(ApiResponse {
        data: compare(&histories, state.trend_window),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_item_is_serializable() {
        let item = BrandItem {
            id: 1,
            name: "Acme".to_string(),
            slug: "acme".to_string(),
            domain: "acme.io".to_string(),
            industry: "saas".to_string(),
            aliases: vec!["Acme Corp".to_string()],
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).expect("serialize brand");
        assert!(json.contains("\"slug\":\"acme\""));
        assert!(json.contains("Acme Corp"));
    }

    #[test]
    fn history_point_is_serializable() {
        let point = HistoryPoint {
            run_id: 9,
            completed_at: Utc::now(),
            score: 58.25,
            result_count: 6,
        };
        let json = serde_json::to_string(&point).expect("serialize point");
        assert!(json.contains("\"score\":58.25"));
    }
}
