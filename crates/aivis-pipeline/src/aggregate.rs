//! History and comparison aggregation over persisted visibility scores.
//!
//! Inputs arrive newest-first, matching the order the store returns history
//! in. Everything here is pure so the server and CLI can share it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{PairOutcome, PairResult};

/// One completed run's average visibility score for an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    pub completed_at: DateTime<Utc>,
    pub score: f64,
}

/// An entity's score series, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct EntityHistory {
    pub entity_id: i64,
    pub label: String,
    pub points: Vec<ScorePoint>,
}

/// Where one entity sits in a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct EntityStanding {
    pub entity_id: i64,
    pub label: String,
    /// Latest score, absent when the entity has no completed runs.
    pub current: Option<f64>,
    pub trend: Option<f64>,
    /// 1-based, 1 is best.
    pub rank: usize,
    /// Share of compared entities this one beats, 0 to 100.
    pub percentile: f64,
}

/// A ranked comparison across entities over a shared trend window.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub window: usize,
    pub standings: Vec<EntityStanding>,
}

/// Aggregate visibility of one run's fan-out outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunVisibility {
    pub expected_pairs: usize,
    pub succeeded_pairs: usize,
    pub failed_pairs: usize,
    pub mentioned_pairs: usize,
    /// Succeeded share of expected pairs, 0 to 1.
    pub coverage: f64,
    /// Mentioned share of succeeded pairs. Absent when nothing succeeded.
    pub mention_rate: Option<f64>,
    /// Mean visibility score of succeeded pairs. Absent when nothing succeeded.
    pub mean_score: Option<f64>,
}

/// Score change over the last `window` completed runs: newest score minus
/// the score `window` runs back, clamped to the oldest point available.
///
/// `None` with fewer than two points, since no meaningful delta exists.
#[must_use]
pub fn trend(points: &[ScorePoint], window: usize) -> Option<f64> {
    if points.len() < 2 || window == 0 {
        return None;
    }
    let baseline = window.min(points.len() - 1);
    Some(points[0].score - points[baseline].score)
}

/// Ranks entities by current score.
///
/// Ordering is total and deterministic: entities with a current score beat
/// entities without one, higher scores beat lower, a tie goes to the entity
/// whose latest run completed more recently, and entity id breaks anything
/// left. Percentile is the share of other entities ranked below.
#[must_use]
pub fn compare(histories: &[EntityHistory], window: usize) -> ComparisonResult {
    let mut ordered: Vec<&EntityHistory> = histories.iter().collect();
    ordered.sort_by(|a, b| {
        let a_head = a.points.first();
        let b_head = b.points.first();
        match (a_head, b_head) {
            (Some(ap), Some(bp)) => bp
                .score
                .partial_cmp(&ap.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| bp.completed_at.cmp(&ap.completed_at))
                .then_with(|| a.entity_id.cmp(&b.entity_id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.entity_id.cmp(&b.entity_id),
        }
    });

    let n = ordered.len();
    let standings = ordered
        .into_iter()
        .enumerate()
        .map(|(index, history)| {
            let rank = index + 1;
            #[allow(clippy::cast_precision_loss)]
            let percentile = if n <= 1 {
                100.0
            } else {
                (n - rank) as f64 / (n - 1) as f64 * 100.0
            };
            EntityStanding {
                entity_id: history.entity_id,
                label: history.label.clone(),
                current: history.points.first().map(|p| p.score),
                trend: trend(&history.points, window),
                rank,
                percentile,
            }
        })
        .collect();

    ComparisonResult { window, standings }
}

/// Folds one run's pair outcomes into aggregate visibility numbers.
#[must_use]
pub fn run_visibility(outcomes: &[PairOutcome]) -> RunVisibility {
    let expected = outcomes.len();
    let mut succeeded = 0usize;
    let mut mentioned = 0usize;
    let mut score_sum = 0.0f64;

    for outcome in outcomes {
        if let PairResult::Succeeded { summary } = &outcome.result {
            succeeded += 1;
            if summary.mentioned {
                mentioned += 1;
            }
            score_sum += summary.score;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let (coverage, mention_rate, mean_score) = if succeeded == 0 {
        (0.0, None, None)
    } else {
        (
            succeeded as f64 / expected as f64,
            Some(mentioned as f64 / succeeded as f64),
            Some(score_sum / succeeded as f64),
        )
    };

    RunVisibility {
        expected_pairs: expected,
        succeeded_pairs: succeeded,
        failed_pairs: expected - succeeded,
        mentioned_pairs: mentioned,
        coverage,
        mention_rate,
        mean_score,
    }
}

#[cfg(test)]
mod tests {
    use aivis_core::{PromptResultSummary, Sentiment};
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, day, 12, 0, 0).unwrap()
    }

    fn series(entity_id: i64, label: &str, scores: &[f64]) -> EntityHistory {
        // Newest first, one point per day counting back from the 28th.
        let points = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| ScorePoint {
                completed_at: at(28 - u32::try_from(i).unwrap()),
                score,
            })
            .collect();
        EntityHistory {
            entity_id,
            label: label.to_string(),
            points,
        }
    }

    #[test]
    fn trend_needs_at_least_two_points() {
        assert_eq!(trend(&[], 7), None);
        let one = series(1, "a", &[60.0]);
        assert_eq!(trend(&one.points, 7), None);
    }

    #[test]
    fn trend_clamps_the_window_to_available_points() {
        let h = series(1, "a", &[62.0, 58.0, 50.0]);
        // Full window reaches past the series, so the oldest point anchors it.
        assert_eq!(trend(&h.points, 7), Some(12.0));
        assert_eq!(trend(&h.points, 1), Some(4.0));
    }

    #[test]
    fn compare_ranks_by_current_score_descending() {
        let histories = vec![
            series(1, "acme", &[55.0, 50.0]),
            series(2, "rival", &[72.0, 70.0]),
            series(3, "niche", &[40.0]),
        ];
        let result = compare(&histories, 7);

        let ids: Vec<i64> = result.standings.iter().map(|s| s.entity_id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(result.standings[0].rank, 1);
        assert!((result.standings[0].percentile - 100.0).abs() < f64::EPSILON);
        assert!((result.standings[2].percentile - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn entities_without_history_rank_last() {
        let histories = vec![
            series(5, "empty", &[]),
            series(2, "scored", &[10.0]),
        ];
        let result = compare(&histories, 7);
        assert_eq!(result.standings[0].entity_id, 2);
        assert_eq!(result.standings[1].entity_id, 5);
        assert_eq!(result.standings[1].current, None);
        assert_eq!(result.standings[1].trend, None);
    }

    #[test]
    fn score_ties_break_on_recency_then_id() {
        let older = EntityHistory {
            entity_id: 1,
            label: "older".to_string(),
            points: vec![ScorePoint {
                completed_at: at(20),
                score: 60.0,
            }],
        };
        let newer = EntityHistory {
            entity_id: 2,
            label: "newer".to_string(),
            points: vec![ScorePoint {
                completed_at: at(27),
                score: 60.0,
            }],
        };
        let result = compare(&[older, newer], 7);
        assert_eq!(result.standings[0].entity_id, 2, "fresher data wins a tie");

        // Identical timestamps fall back to entity id, keeping order stable.
        let twin_a = series(3, "a", &[60.0]);
        let twin_b = series(4, "b", &[60.0]);
        let result = compare(&[twin_b.clone(), twin_a.clone()], 7);
        assert_eq!(result.standings[0].entity_id, 3);
        let result = compare(&[twin_a, twin_b], 7);
        assert_eq!(result.standings[0].entity_id, 3);
    }

    #[test]
    fn single_entity_gets_the_top_percentile() {
        let result = compare(&[series(1, "solo", &[50.0, 40.0])], 7);
        assert_eq!(result.standings.len(), 1);
        assert!((result.standings[0].percentile - 100.0).abs() < f64::EPSILON);
    }

    fn pair(prompt_id: i64, engine: &str, result: PairResult) -> PairOutcome {
        PairOutcome {
            prompt_id,
            engine: engine.to_string(),
            result,
        }
    }

    fn success(prompt_id: i64, engine: &str, mentioned: bool, score: f64) -> PairOutcome {
        pair(
            prompt_id,
            engine,
            PairResult::Succeeded {
                summary: PromptResultSummary {
                    prompt_id,
                    engine: engine.to_string(),
                    mentioned,
                    sentiment: Sentiment::Neutral,
                    compound: 0.0,
                    score,
                },
            },
        )
    }

    #[test]
    fn run_visibility_averages_succeeded_pairs_only() {
        let outcomes = vec![
            success(1, "atlas", true, 80.0),
            success(1, "borealis", false, 0.0),
            pair(
                2,
                "atlas",
                PairResult::Failed {
                    error: "engine atlas: call timed out".to_string(),
                },
            ),
            success(2, "borealis", true, 40.0),
        ];

        let vis = run_visibility(&outcomes);
        assert_eq!(vis.expected_pairs, 4);
        assert_eq!(vis.succeeded_pairs, 3);
        assert_eq!(vis.failed_pairs, 1);
        assert_eq!(vis.mentioned_pairs, 2);
        assert!((vis.coverage - 0.75).abs() < 1e-9);
        assert!((vis.mention_rate.unwrap() - 2.0 / 3.0).abs() < 1e-9);
        assert!((vis.mean_score.unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn run_visibility_with_no_successes_has_no_averages() {
        let outcomes = vec![pair(
            1,
            "atlas",
            PairResult::Failed {
                error: "down".to_string(),
            },
        )];
        let vis = run_visibility(&outcomes);
        assert_eq!(vis.mean_score, None);
        assert_eq!(vis.mention_rate, None);
        assert!((vis.coverage - 0.0).abs() < f64::EPSILON);
    }
}
