//! Database operations for the `prompts` table.
//!
//! Prompts are deactivated, never deleted: inactive prompts are excluded
//! from new runs but their historical results remain queryable.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `prompts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: i64,
    pub brand_id: i64,
    pub text: String,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PROMPT_COLUMNS: &str = "id, brand_id, text, tags, is_active, created_at, updated_at";

/// Insert a new active prompt for a brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_prompt(
    pool: &PgPool,
    brand_id: i64,
    text: &str,
    tags: &[String],
) -> Result<PromptRow, DbError> {
    let row = sqlx::query_as::<_, PromptRow>(&format!(
        "INSERT INTO prompts (brand_id, text, tags) \
         VALUES ($1, $2, $3) \
         RETURNING {PROMPT_COLUMNS}"
    ))
    .bind(brand_id)
    .bind(text)
    .bind(tags)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Active prompts for a brand, oldest first (stable fan-out order).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_prompts(pool: &PgPool, brand_id: i64) -> Result<Vec<PromptRow>, DbError> {
    let rows = sqlx::query_as::<_, PromptRow>(&format!(
        "SELECT {PROMPT_COLUMNS} FROM prompts \
         WHERE brand_id = $1 AND is_active \
         ORDER BY id"
    ))
    .bind(brand_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All prompts for a brand including inactive ones, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_prompts(pool: &PgPool, brand_id: i64) -> Result<Vec<PromptRow>, DbError> {
    let rows = sqlx::query_as::<_, PromptRow>(&format!(
        "SELECT {PROMPT_COLUMNS} FROM prompts WHERE brand_id = $1 ORDER BY id"
    ))
    .bind(brand_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Deactivate a prompt, keeping its history.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the prompt does not exist or belongs to
/// a different brand.
pub async fn deactivate_prompt(pool: &PgPool, brand_id: i64, prompt_id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE prompts SET is_active = FALSE, updated_at = NOW() \
         WHERE id = $1 AND brand_id = $2",
    )
    .bind(prompt_id)
    .bind(brand_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brands::find_or_create_brand_by_domain;

    #[sqlx::test(migrations = "../../migrations")]
    async fn inactive_prompts_are_excluded_from_active_listing(pool: PgPool) {
        let brand = find_or_create_brand_by_domain(&pool, "example.com")
            .await
            .expect("brand");

        let keep = create_prompt(&pool, brand.id, "best crm tools", &[])
            .await
            .expect("prompt");
        let drop = create_prompt(&pool, brand.id, "legacy question", &["old".to_string()])
            .await
            .expect("prompt");

        deactivate_prompt(&pool, brand.id, drop.id)
            .await
            .expect("deactivate");

        let active = list_active_prompts(&pool, brand.id).await.expect("list");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);

        // Full listing retains the deactivated prompt for history.
        let all = list_prompts(&pool, brand.id).await.expect("list all");
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|p| p.id == drop.id && !p.is_active));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn deactivating_a_foreign_prompt_is_not_found(pool: PgPool) {
        let brand = find_or_create_brand_by_domain(&pool, "one.com")
            .await
            .expect("brand");
        let other = find_or_create_brand_by_domain(&pool, "two.com")
            .await
            .expect("brand");
        let prompt = create_prompt(&pool, brand.id, "question", &[])
            .await
            .expect("prompt");

        let err = deactivate_prompt(&pool, other.id, prompt.id)
            .await
            .expect_err("must fail");
        assert!(matches!(err, DbError::NotFound));
    }
}
