//! Per-pair analysis: query an engine, detect the brand, score the context.

use aivis_core::{EngineQuery, ExternalError, PromptResultSummary, Sentiment};
use aivis_scoring::composite::favorability;
use aivis_scoring::sentiment_scores;

use crate::mention::MentionMatcher;
use crate::types::PromptFacts;

/// Queries one engine with one prompt and reduces the answer to a summary.
///
/// # Errors
///
/// Propagates the engine's [`ExternalError`] untouched so the caller can
/// decide retriability.
pub async fn analyze_pair(
    engine_client: &dyn EngineQuery,
    matcher: &MentionMatcher,
    prompt: &PromptFacts,
    engine: &str,
) -> Result<PromptResultSummary, ExternalError> {
    let answer = engine_client.query(engine, &prompt.text).await?;
    tracing::debug!(
        prompt_id = prompt.id,
        engine,
        answer_len = answer.len(),
        "engine answered"
    );
    Ok(summarize_answer(matcher, prompt.id, engine, &answer))
}

/// Reduces a raw answer to the persisted per-pair summary.
///
/// No mention means a zero visibility score and neutral sentiment; the brand
/// simply was not part of the answer. With a mention, sentiment is scored on
/// the context snippet only, and the visibility score is the favorability of
/// its compound.
#[must_use]
pub fn summarize_answer(
    matcher: &MentionMatcher,
    prompt_id: i64,
    engine: &str,
    answer: &str,
) -> PromptResultSummary {
    let context = matcher.scan(answer);
    match context.snippet {
        Some(snippet) => {
            let scores = sentiment_scores(&snippet);
            PromptResultSummary {
                prompt_id,
                engine: engine.to_string(),
                mentioned: true,
                sentiment: Sentiment::from_compound(scores.compound),
                compound: scores.compound,
                score: favorability(scores.compound),
            }
        }
        None => PromptResultSummary {
            prompt_id,
            engine: engine.to_string(),
            mentioned: false,
            sentiment: Sentiment::Neutral,
            compound: 0.0,
            score: 0.0,
        },
    }
}
