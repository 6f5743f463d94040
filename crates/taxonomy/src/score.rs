//! Distance scoring between a normalized query and an item-group name.
//!
//! A score is a distance in [0, 1] where 0 is a perfect hit. It is built
//! from normalized Levenshtein similarity in two passes:
//!
//! * exact letters, weight 1.0
//! * Turkish diacritics stripped on both sides, weight [`FOLDED_WEIGHT`]
//!
//! Each pass takes the better of a whole-string comparison and the best
//! token window (the shorter token sequence slid over the longer one,
//! weighted by [`WINDOW_WEIGHT`]). `confidence = 1 - score`.

use strsim::normalized_levenshtein;
use tezgah_core::text::strip_diacritics;

pub const FOLDED_WEIGHT: f64 = 0.95;
pub const WINDOW_WEIGHT: f64 = 0.9;

/// Hits scoring above this are not reported at all.
pub const MAX_SCORE: f64 = 0.6;

pub fn score(query: &str, name: &str) -> f64 {
    if query.is_empty() || name.is_empty() {
        return 1.0;
    }
    if query == name {
        return 0.0;
    }
    let exact = similarity(query, name);
    let folded = similarity(&strip_diacritics(query), &strip_diacritics(name)) * FOLDED_WEIGHT;
    (1.0 - exact.max(folded)).clamp(0.0, 1.0)
}

/// Fixed mapping from a distance score to a match confidence.
pub fn confidence(score: f64) -> f32 {
    (1.0 - score).clamp(0.0, 1.0) as f32
}

fn similarity(a: &str, b: &str) -> f64 {
    let whole = normalized_levenshtein(a, b);
    whole.max(best_window(a, b) * WINDOW_WEIGHT)
}

fn best_window(a: &str, b: &str) -> f64 {
    let a_tokens: Vec<&str> = a.split(' ').collect();
    let b_tokens: Vec<&str> = b.split(' ').collect();
    let (short, long) = if a_tokens.len() <= b_tokens.len() {
        (a_tokens, b_tokens)
    } else {
        (b_tokens, a_tokens)
    };
    if short.len() == long.len() {
        return 0.0;
    }

    let needle = short.join(" ");
    long.windows(short.len())
        .map(|w| normalized_levenshtein(&needle, &w.join(" ")))
        .fold(0.0, f64::max)
}
