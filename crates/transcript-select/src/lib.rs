//! Speech-engine candidate handling at the input boundary.
//!
//! The recognition engine is a black box that may return several candidate
//! transcripts, each with a confidence score. This crate picks the one the
//! pipeline should see: highest confidence, ties broken by the larger
//! count of non-filler tokens. That tie-break is the whole selection rule;
//! nothing further is inferred from engine internals. A repetition
//! detector is provided separately so callers can discard degenerate
//! ("hallucinated") engine output before selecting.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One transcription hypothesis from the speech engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptCandidate {
    pub text: String,
    /// Engine confidence in [0,1].
    pub confidence: f32,
    /// BCP-47-ish language tag when the engine reports one ("fr", "ar").
    #[serde(default)]
    pub language: Option<String>,
}

/// Pick the candidate the pipeline should process.
///
/// Highest confidence wins; an exact confidence tie goes to the candidate
/// with more non-filler tokens; a full tie keeps the earlier candidate.
/// Empty input yields `None`.
pub fn select_best<'a>(
    candidates: &'a [TranscriptCandidate],
    fillers: &[String],
) -> Option<&'a TranscriptCandidate> {
    let best = candidates.iter().reduce(|best, candidate| {
        if candidate.confidence > best.confidence {
            candidate
        } else if candidate.confidence == best.confidence
            && content_token_count(&candidate.text, fillers)
                > content_token_count(&best.text, fillers)
        {
            candidate
        } else {
            best
        }
    });
    if let Some(winner) = best {
        debug!(
            confidence = winner.confidence,
            text = %winner.text,
            "selected transcript candidate"
        );
    }
    best
}

/// Tokens that carry content: everything that is not a filler.
fn content_token_count(text: &str, fillers: &[String]) -> usize {
    text.split_whitespace()
        .filter(|token| {
            let token = token.to_lowercase();
            !fillers.iter().any(|f| *f == token)
        })
        .count()
}

/// Degenerate-output heuristic: engines under noise emit the same word or
/// word pair over and over. True when at least four tokens draw on at most
/// two distinct words, or the leading two-word pair occurs three or more
/// times.
pub fn is_repetitive(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() < 3 {
        return false;
    }

    let mut distinct: Vec<&str> = words.clone();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() <= 2 && words.len() >= 4 {
        return true;
    }

    let pair = format!("{} {}", words[0], words[1]);
    lowered.matches(&pair).count() >= 3
}
