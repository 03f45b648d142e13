//! Inference contract consumed by the prediction service.
//!
//! Classifiers plug in behind [`EmotionModel`]; the crate only relies on the
//! `predict(text) -> {label: score}` shape. [`LexiconModel`] is a small
//! deterministic stand-in so the service runs end to end without an external
//! model process.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::core::Result;

/// Fixed closed vocabulary of emotion labels.
pub const EMOTION_LABELS: [&str; 28] = [
    "anger",
    "anticipation",
    "disgust",
    "fear",
    "joy",
    "love",
    "optimism",
    "pessimism",
    "sadness",
    "surprise",
    "trust",
    "neutral",
    "excitement",
    "gratitude",
    "pride",
    "confusion",
    "embarrassment",
    "guilt",
    "shame",
    "anxiety",
    "desire",
    "jealousy",
    "disappointment",
    "amusement",
    "contentment",
    "relief",
    "boredom",
    "frustration",
];

/// How many top-scoring labels are kept per prediction.
pub const TOP_K: usize = 5;

/// A text-emotion classifier.
///
/// `predict` is expected to be pure: scores in [0.0, 1.0] over the label
/// vocabulary, no side effects, no persistent state mutation. Failures
/// surface to callers as [`crate::ServiceError::Upstream`].
pub trait EmotionModel: Send + Sync {
    fn predict(&self, text: &str) -> Result<BTreeMap<String, f64>>;

    fn is_loaded(&self) -> bool {
        true
    }
}

/// Keeps the `k` highest-scoring labels (score descending, label ascending
/// on ties).
pub fn top_emotions(scores: &BTreeMap<String, f64>, k: usize) -> BTreeMap<String, f64> {
    let mut pairs: Vec<(&String, &f64)> = scores.iter().collect();
    pairs.sort_by(|a, b| {
        b.1.partial_cmp(a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    pairs
        .into_iter()
        .take(k)
        .map(|(label, score)| (label.clone(), *score))
        .collect()
}

/// Keyword-lexicon scorer over the fixed vocabulary.
///
/// Not a real classifier and not meant to approximate one; it exists so the
/// binary and the tests have a model to call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconModel;

const LEXICON: &[(&str, &[&str])] = &[
    ("joy", &["happy", "joy", "delighted", "glad", "wonderful"]),
    ("excitement", &["thrilled", "excited", "exciting", "stoked"]),
    ("sadness", &["sad", "unhappy", "depressed", "miserable", "cry"]),
    ("anger", &["angry", "furious", "mad", "rage", "annoyed"]),
    ("fear", &["afraid", "scared", "terrified", "dread"]),
    ("love", &["love", "adore", "cherish"]),
    ("gratitude", &["thank", "grateful", "appreciate"]),
    ("surprise", &["surprised", "unexpected", "astonished"]),
    ("disgust", &["disgusting", "gross", "revolting"]),
    ("anxiety", &["anxious", "worried", "nervous", "uneasy"]),
    ("disappointment", &["disappointed", "letdown"]),
    ("relief", &["relieved", "relief"]),
    ("frustration", &["frustrated", "frustrating", "stuck"]),
    ("boredom", &["bored", "boring", "dull"]),
];

const BASE_SCORE: f64 = 0.02;
const NEUTRAL_IDLE_SCORE: f64 = 0.85;

impl EmotionModel for LexiconModel {
    fn predict(&self, text: &str) -> Result<BTreeMap<String, f64>> {
        let lowered = text.to_lowercase();
        let mut total_hits = 0usize;
        let mut scores: BTreeMap<String, f64> = EMOTION_LABELS
            .iter()
            .map(|label| (label.to_string(), BASE_SCORE))
            .collect();

        for (label, keywords) in LEXICON {
            let hits = keywords
                .iter()
                .filter(|keyword| lowered.contains(*keyword))
                .count();
            if hits > 0 {
                total_hits += hits;
                let score = (0.35 + 0.2 * hits as f64).min(0.99);
                scores.insert(label.to_string(), round4(score));
            }
        }

        let neutral = if total_hits == 0 {
            NEUTRAL_IDLE_SCORE
        } else {
            0.05
        };
        scores.insert("neutral".to_string(), neutral);

        Ok(scores)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
