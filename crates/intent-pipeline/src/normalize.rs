//! Transcript normalization.
//!
//! Turns the raw engine transcript into the canonical text every other
//! stage operates on: lower-case, no sentence punctuation, no diacritics,
//! no hesitation fillers, dialect variants collapsed to one spelling,
//! stutter repetitions removed, single spaces. Total and idempotent.

use crate::config::PipelineConfig;
use crate::slots::Span;
use std::fmt;

/// Cleaned utterance text.
///
/// Invariants: lower-case, tokens separated by exactly one space, no filler
/// tokens, dialect variants in canonical spelling, no leading or trailing
/// whitespace. May be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// Tokens with their byte spans into the normalized string.
    pub fn token_spans(&self) -> Vec<(&str, Span)> {
        let s = self.0.as_str();
        let mut out = Vec::new();
        let mut start: Option<usize> = None;
        for (i, ch) in s.char_indices() {
            if ch == ' ' {
                if let Some(b) = start.take() {
                    out.push((&s[b..i], Span::new(b, i)));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(b) = start {
            out.push((&s[b..], Span::new(b, s.len())));
        }
        out
    }

    /// Leftmost whole-token occurrence of a space-separated phrase.
    pub fn find_phrase(&self, phrase: &str) -> Option<Span> {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        if needle.is_empty() {
            return None;
        }
        let tokens = self.token_spans();
        for window in tokens.windows(needle.len()) {
            if window.iter().map(|(t, _)| *t).eq(needle.iter().copied()) {
                let first = window[0].1;
                let last = window[window.len() - 1].1;
                return Some(Span::new(first.start, last.end));
            }
        }
        None
    }

    pub fn has_phrase(&self, phrase: &str) -> bool {
        self.find_phrase(phrase).is_some()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transcript cleaner driven by the filler and dialect tables.
pub struct Normalizer<'a> {
    cfg: &'a PipelineConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(cfg: &'a PipelineConfig) -> Self {
        Self { cfg }
    }

    /// Normalize a raw transcript. Never fails; worst case the result is
    /// empty. Filler removal runs before variant mapping (a filler can sit
    /// inside a variant phrase); duplicate collapse runs after it (mapping
    /// two variants of one word may create a new adjacent pair).
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        let mut folded = String::with_capacity(raw.len());
        for ch in raw.trim().chars() {
            for lower in ch.to_lowercase() {
                push_folded(&mut folded, lower);
            }
        }

        let mut out = String::with_capacity(folded.len());
        let mut prev: Option<&str> = None;
        for token in folded.split_whitespace() {
            if self.is_filler(token) {
                continue;
            }
            let token = match self.cfg.dialect_variants.get(token) {
                Some(canonical) if canonical.is_empty() => continue,
                Some(canonical) => canonical.as_str(),
                None => token,
            };
            if prev == Some(token) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(token);
            prev = Some(token);
        }
        NormalizedText(out)
    }

    fn is_filler(&self, token: &str) -> bool {
        self.cfg.fillers.iter().any(|f| f == token)
    }
}

/// Lower-case diacritic folding plus punctuation-to-space mapping. Arabic
/// script and anything else unknown passes through unchanged.
fn push_folded(out: &mut String, c: char) {
    match c {
        'à' | 'â' | 'ä' => out.push('a'),
        'é' | 'è' | 'ê' | 'ë' => out.push('e'),
        'î' | 'ï' => out.push('i'),
        'ô' | 'ö' => out.push('o'),
        'ù' | 'û' | 'ü' => out.push('u'),
        'ç' => out.push('c'),
        'œ' => out.push_str("oe"),
        '.' | ',' | ';' | ':' | '!' | '?' | '…' | '-' | '\'' | '’' | '"' | '«' | '»' | '(' | ')' => {
            out.push(' ')
        }
        _ => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> NormalizedText {
        let cfg = PipelineConfig::default();
        Normalizer::new(&cfg).normalize(raw)
    }

    #[test]
    fn strips_fillers_as_whole_tokens() {
        assert_eq!(
            normalize("Euh rappelle moi demain").as_str(),
            "rappelle moi demain"
        );
        // "bahar" contains the filler "bah" but is not one
        assert_eq!(normalize("bah bahar").as_str(), "bahar");
    }

    #[test]
    fn maps_dialect_variants() {
        assert_eq!(
            normalize("ghodwa sbah doctour").as_str(),
            "demain matin docteur"
        );
        assert_eq!(normalize("el jaw lyoum").as_str(), "meteo aujourdhui");
    }

    #[test]
    fn folds_diacritics_and_punctuation() {
        assert_eq!(
            normalize("Rappelle-moi, le médicament!").as_str(),
            "rappelle moi le medicament"
        );
    }

    #[test]
    fn collapses_stutter_repetitions() {
        assert_eq!(
            normalize("appelle appelle appelle fatma").as_str(),
            "appelle fatma"
        );
        // variants of the same word collapse too
        assert_eq!(normalize("ghodwa demain").as_str(), "demain");
    }

    #[test]
    fn arabic_script_tokens_survive_or_map() {
        assert_eq!(normalize("غدوة rappelle").as_str(), "demain rappelle");
        assert_eq!(normalize("مرحبا").as_str(), "مرحبا");
    }

    #[test]
    fn empty_and_junk_input_is_total() {
        assert_eq!(normalize("").as_str(), "");
        assert_eq!(normalize("   ...!!  ").as_str(), "");
        assert_eq!(normalize("euh euh hmm").as_str(), "");
    }

    #[test]
    fn idempotent_over_samples() {
        let samples = [
            "Euh rappelle moi demain matin doctour a 10h",
            "el jaw fi tunis ghodwa",
            "appelle appelle Fatma stp!",
            "ben... quelle heure il est?",
            "خذ دواء el soir",
            "",
        ];
        let cfg = PipelineConfig::default();
        let n = Normalizer::new(&cfg);
        for raw in samples {
            let once = n.normalize(raw);
            let twice = n.normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn token_spans_index_into_text() {
        let t = normalize("rappelle demain docteur");
        let spans = t.token_spans();
        assert_eq!(spans.len(), 3);
        for (tok, span) in spans {
            assert_eq!(&t.as_str()[span.start..span.end], tok);
        }
    }

    #[test]
    fn phrase_lookup_is_whole_token() {
        let t = normalize("il y a apres demain un rdv");
        assert!(t.has_phrase("apres demain"));
        assert!(!t.has_phrase("pres demain"));
        assert_eq!(
            t.find_phrase("apres demain").map(|s| (s.start, s.end)),
            Some((7, 19))
        );
    }
}
