//! Lexicon sentiment scorer.
//!
//! Splits text into lowercase words, sums matching lexicon weights with
//! single-token negation flipping ("not great" reads negative), and
//! normalizes the sum into a compound polarity. Proportions are token
//! shares, so `negative + neutral + positive == 1.0` by construction.

use serde::{Deserialize, Serialize};

/// General-purpose word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative.
const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("positive", 0.4),
    ("amazing", 0.5),
    ("outstanding", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("like", 0.2),
    ("best", 0.5),
    ("better", 0.3),
    ("recommend", 0.4),
    ("recommended", 0.4),
    ("quality", 0.3),
    ("reliable", 0.4),
    ("trusted", 0.4),
    ("trustworthy", 0.4),
    ("leading", 0.3),
    ("leader", 0.3),
    ("popular", 0.3),
    ("innovative", 0.3),
    ("powerful", 0.3),
    ("easy", 0.3),
    ("fast", 0.3),
    ("secure", 0.3),
    ("helpful", 0.3),
    ("useful", 0.3),
    ("impressive", 0.4),
    ("favorite", 0.4),
    ("win", 0.4),
    ("winner", 0.4),
    ("success", 0.4),
    ("successful", 0.4),
    ("affordable", 0.3),
    ("robust", 0.3),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("horrible", -0.6),
    ("worst", -0.6),
    ("worse", -0.4),
    ("negative", -0.4),
    ("poor", -0.4),
    ("hate", -0.5),
    ("hated", -0.5),
    ("avoid", -0.5),
    ("scam", -0.7),
    ("fraud", -0.7),
    ("lawsuit", -0.5),
    ("breach", -0.6),
    ("hack", -0.5),
    ("hacked", -0.6),
    ("outage", -0.5),
    ("broken", -0.5),
    ("buggy", -0.5),
    ("slow", -0.3),
    ("expensive", -0.3),
    ("overpriced", -0.4),
    ("unreliable", -0.5),
    ("confusing", -0.3),
    ("difficult", -0.3),
    ("failed", -0.4),
    ("failure", -0.4),
    ("problem", -0.3),
    ("problems", -0.3),
    ("concern", -0.3),
    ("concerns", -0.3),
    ("warning", -0.4),
    ("complaint", -0.4),
    ("complaints", -0.4),
    ("decline", -0.3),
    ("declining", -0.3),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "neither", "nor", "hardly", "barely", "cannot", "cant", "dont",
    "doesnt", "didnt", "isnt", "wasnt", "wont", "without", "lacks", "lacking",
];

/// Normalization constant for the compound score, after VADER.
const COMPOUND_ALPHA: f64 = 15.0;

/// Sentiment polarity breakdown for one text blob.
///
/// `negative + neutral + positive == 1.0`; `compound` is in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    pub compound: f64,
}

impl SentimentScores {
    /// The documented result for empty or fully unknown text.
    pub const NEUTRAL: SentimentScores = SentimentScores {
        negative: 0.0,
        neutral: 1.0,
        positive: 0.0,
        compound: 0.0,
    };
}

fn lexicon_weight(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(lex_word, _)| *lex_word == word)
        .map(|&(_, weight)| weight)
}

/// Score a text string with the lexicon.
///
/// Empty or whitespace-only input returns [`SentimentScores::NEUTRAL`],
/// never an error.
#[must_use]
pub fn sentiment_scores(text: &str) -> SentimentScores {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return SentimentScores::NEUTRAL;
    }

    let mut sum = 0.0_f64;
    let mut positive_hits = 0usize;
    let mut negative_hits = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        let Some(mut weight) = lexicon_weight(token) else {
            continue;
        };
        // A negator immediately before the hit flips its polarity.
        if i > 0 && NEGATORS.contains(&tokens[i - 1].as_str()) {
            weight = -weight;
        }
        sum += weight;
        if weight > 0.0 {
            positive_hits += 1;
        } else {
            negative_hits += 1;
        }
    }

    let compound = (sum / (sum * sum + COMPOUND_ALPHA).sqrt()).clamp(-1.0, 1.0);

    #[allow(clippy::cast_precision_loss)]
    let total = tokens.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let positive = positive_hits as f64 / total;
    #[allow(clippy::cast_precision_loss)]
    let negative = negative_hits as f64 / total;
    let neutral = (1.0 - positive - negative).max(0.0);

    SentimentScores {
        negative,
        neutral,
        positive,
        compound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_neutral() {
        assert_eq!(sentiment_scores(""), SentimentScores::NEUTRAL);
        assert_eq!(sentiment_scores("   \t"), SentimentScores::NEUTRAL);
    }

    #[test]
    fn unknown_text_is_neutral() {
        let scores = sentiment_scores("the quick brown fox jumps");
        assert!((scores.compound).abs() < f64::EPSILON);
        assert!((scores.neutral - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn positive_keyword_yields_positive_compound() {
        let scores = sentiment_scores("this product is great");
        assert!(scores.compound > 0.0, "got {}", scores.compound);
        assert!(scores.positive > 0.0);
    }

    #[test]
    fn negative_keyword_yields_negative_compound() {
        let scores = sentiment_scores("the rollout was a failure");
        assert!(scores.compound < 0.0, "got {}", scores.compound);
        assert!(scores.negative > 0.0);
    }

    #[test]
    fn negation_flips_polarity() {
        let plain = sentiment_scores("the product is great");
        let negated = sentiment_scores("the product is not great");
        assert!(plain.compound > 0.0);
        assert!(negated.compound < 0.0, "got {}", negated.compound);
    }

    #[test]
    fn proportions_sum_to_one() {
        for text in [
            "great great terrible fine whatever",
            "love it",
            "nothing remarkable here at all",
        ] {
            let s = sentiment_scores(text);
            let sum = s.negative + s.neutral + s.positive;
            assert!((sum - 1.0).abs() < 1e-9, "{text:?}: proportions sum {sum}");
        }
    }

    #[test]
    fn compound_stays_in_range_under_stacking() {
        let piled = "excellent amazing outstanding best love win success impressive";
        let s = sentiment_scores(piled);
        assert!(s.compound > 0.5 && s.compound <= 1.0, "got {}", s.compound);

        let buried = "scam fraud breach terrible awful worst failure outage";
        let s = sentiment_scores(buried);
        assert!(s.compound < -0.5 && s.compound >= -1.0, "got {}", s.compound);
    }

    #[test]
    fn punctuation_is_stripped_before_lookup() {
        let s = sentiment_scores("Great!");
        assert!(s.compound > 0.0, "'Great!' should match 'great'");
    }

    #[test]
    fn scorer_is_deterministic() {
        let text = "a reliable but expensive service with occasional problems";
        assert_eq!(sentiment_scores(text), sentiment_scores(text));
    }
}
