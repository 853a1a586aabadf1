//! Database operations for `brands` and `brand_competitors`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `brands` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub domain: String,
    pub industry: String,
    pub aliases: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a brand explicitly (as opposed to intake auto-creation).
#[derive(Debug, Clone)]
pub struct NewBrand {
    pub name: String,
    pub domain: String,
    pub industry: String,
    pub aliases: Vec<String>,
}

const BRAND_COLUMNS: &str = "id, name, slug, domain, industry, aliases, is_active, created_at";

/// Generate a URL-safe slug from a brand name or domain.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else if c == ' ' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Look up the brand tracking `domain`, creating a minimal row if absent.
///
/// Intake auto-creates brands so a submission for a never-seen domain still
/// produces a run. The brand name defaults to the domain's first label.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_or_create_brand_by_domain(
    pool: &PgPool,
    domain: &str,
) -> Result<BrandRow, DbError> {
    let domain = domain.to_lowercase();
    if let Some(row) = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE domain = $1"
    ))
    .bind(&domain)
    .fetch_optional(pool)
    .await?
    {
        return Ok(row);
    }

    let name = domain.split('.').next().unwrap_or(&domain).to_string();
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "INSERT INTO brands (name, slug, domain) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (domain) DO UPDATE SET domain = EXCLUDED.domain \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(&name)
    .bind(slugify(&domain))
    .bind(&domain)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Insert an explicitly configured brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including unique-domain
/// violations, which the API layer maps to a conflict response).
pub async fn create_brand(pool: &PgPool, brand: &NewBrand) -> Result<BrandRow, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(&format!(
        "INSERT INTO brands (name, slug, domain, industry, aliases) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {BRAND_COLUMNS}"
    ))
    .bind(&brand.name)
    .bind(slugify(&brand.name))
    .bind(brand.domain.to_lowercase())
    .bind(&brand.industry)
    .bind(&brand.aliases)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no brand has the given id.
pub async fn get_brand(pool: &PgPool, id: i64) -> Result<BrandRow, DbError> {
    sqlx::query_as::<_, BrandRow>(&format!("SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no brand has the given slug.
pub async fn get_brand_by_slug(pool: &PgPool, slug: &str) -> Result<BrandRow, DbError> {
    sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// List brands, active first, newest within each group.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brands(pool: &PgPool, limit: i64) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(&format!(
        "SELECT {BRAND_COLUMNS} FROM brands \
         ORDER BY is_active DESC, created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Link a competitor to a brand. Linking twice is a no-op.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (e.g. the self-link check).
pub async fn add_competitor(pool: &PgPool, brand_id: i64, competitor_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO brand_competitors (brand_id, competitor_id) \
         VALUES ($1, $2) \
         ON CONFLICT (brand_id, competitor_id) DO NOTHING",
    )
    .bind(brand_id)
    .bind(competitor_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// All competitor brands linked to `brand_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_competitors(pool: &PgPool, brand_id: i64) -> Result<Vec<BrandRow>, DbError> {
    let rows = sqlx::query_as::<_, BrandRow>(
        "SELECT b.id, b.name, b.slug, b.domain, b.industry, b.aliases, b.is_active, b.created_at \
         FROM brand_competitors c \
         JOIN brands b ON b.id = c.competitor_id \
         WHERE c.brand_id = $1 \
         ORDER BY b.name",
    )
    .bind(brand_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
