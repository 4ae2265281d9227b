//! Slot extractors.
//!
//! A fixed set of focused extractors, each a pure function from normalized
//! text to at most one slot. They run independently, never see each other's
//! output, and resolve internal conflicts by taking the leftmost match.
//! Relative dates resolve against the injected reference date in
//! [`ExtractCtx`], never against a system clock.

use crate::config::{PeriodEntry, PipelineConfig};
use crate::intent::IntentLabel;
use crate::normalize::NormalizedText;
use crate::slots::{Slot, SlotName, SlotValue, Span};
use regex::Regex;
use std::sync::OnceLock;
use time::{Date, Duration, Time, Weekday};

/// Per-call context shared by all extractors.
pub struct ExtractCtx<'a> {
    /// Reference date for resolving "demain", weekday names, etc.
    pub today: Date,
    pub cfg: &'a PipelineConfig,
}

/// Uniform extractor capability.
pub trait SlotExtract {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot>;
}

/// The fixed extractor set, invoked uniformly by the pipeline.
pub fn extractors() -> [&'static dyn SlotExtract; 8] {
    [
        &DateExtractor,
        &TimeExtractor,
        &DurationExtractor,
        &ContactExtractor,
        &MedicationExtractor,
        &MediaExtractor,
        &CityExtractor,
        &TextPayloadExtractor,
    ]
}

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("lundi", Weekday::Monday),
    ("mardi", Weekday::Tuesday),
    ("mercredi", Weekday::Wednesday),
    ("jeudi", Weekday::Thursday),
    ("vendredi", Weekday::Friday),
    ("samedi", Weekday::Saturday),
    ("dimanche", Weekday::Sunday),
];

fn weekday_from_token(token: &str) -> Option<Weekday> {
    WEEKDAYS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, wd)| *wd)
}

fn add_days(date: Date, days: i64) -> Date {
    date.checked_add(Duration::days(days)).unwrap_or(date)
}

/// Relative date expressions: "apres demain", "demain", "aujourdhui",
/// weekday names (next strictly-future occurrence). Leftmost mention wins;
/// no mention yields no slot — defaulting is the composer's decision.
pub struct DateExtractor;

impl SlotExtract for DateExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        let tokens = text.token_spans();
        for (i, (token, span)) in tokens.iter().enumerate() {
            if *token == "apres" {
                if let Some((next, next_span)) = tokens.get(i + 1) {
                    if *next == "demain" {
                        return Some(Slot::extracted(
                            SlotName::Date,
                            SlotValue::Date(add_days(ctx.today, 2)),
                            Span::new(span.start, next_span.end),
                        ));
                    }
                }
                continue;
            }
            let date = match *token {
                "demain" => Some(add_days(ctx.today, 1)),
                "aujourdhui" => Some(ctx.today),
                other => weekday_from_token(other).map(|wd| {
                    let target = i64::from(wd.number_days_from_monday());
                    let current = i64::from(ctx.today.weekday().number_days_from_monday());
                    let mut delta = (target - current).rem_euclid(7);
                    if delta == 0 {
                        delta = 7;
                    }
                    add_days(ctx.today, delta)
                }),
            };
            if let Some(date) = date {
                return Some(Slot::extracted(SlotName::Date, SlotValue::Date(date), *span));
            }
        }
        None
    }
}

fn clock_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"\b([01]?\d|2[0-3])\s*h(?:\s*([0-5]\d))?\b")
                .expect("invalid built-in clock pattern"),
            Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b")
                .expect("invalid built-in clock pattern"),
        ]
    })
}

/// Clock times. Explicit forms ("10h", "10h30", "10:30") outrank vague
/// period words; absent an explicit form, the configured period table gives
/// the representative time (e.g. matin -> 08:00).
pub struct TimeExtractor;

impl SlotExtract for TimeExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        let mut leftmost: Option<(Span, Time)> = None;
        for pattern in clock_patterns() {
            if let Some(caps) = pattern.captures(text.as_str()) {
                let whole = caps.get(0)?;
                let hour: u8 = caps.get(1)?.as_str().parse().ok()?;
                let minute: u8 = caps
                    .get(2)
                    .map(|m| m.as_str().parse().unwrap_or(0))
                    .unwrap_or(0);
                let time = Time::from_hms(hour, minute, 0).ok()?;
                let span = Span::new(whole.start(), whole.end());
                if leftmost.map(|(s, _)| span.start < s.start).unwrap_or(true) {
                    leftmost = Some((span, time));
                }
            }
        }
        if let Some((span, time)) = leftmost {
            return Some(Slot::extracted(SlotName::Time, SlotValue::Time(time), span));
        }

        let mut best: Option<(Span, &PeriodEntry)> = None;
        for entry in &ctx.cfg.periods {
            if let Some(span) = text.find_phrase(&entry.phrase) {
                let better = match best {
                    None => true,
                    Some((b, _)) => {
                        span.start < b.start || (span.start == b.start && span.end > b.end)
                    }
                };
                if better {
                    best = Some((span, entry));
                }
            }
        }
        let (span, entry) = best?;
        let time = Time::from_hms(entry.hour, entry.minute, 0).ok()?;
        Some(Slot::extracted(SlotName::Time, SlotValue::Time(time), span))
    }
}

/// Durations introduced by "dans", "pendant" or "pour", in minutes.
pub struct DurationExtractor;

impl SlotExtract for DurationExtractor {
    fn extract(&self, text: &NormalizedText, _ctx: &ExtractCtx<'_>) -> Option<Slot> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"\b(?:dans|pendant|pour)\s+(\d{1,3})\s*(minutes?|heures?|min|h)\b")
                .expect("invalid built-in duration pattern")
        });
        let caps = pattern.captures(text.as_str())?;
        let whole = caps.get(0)?;
        let amount: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minutes = if caps.get(2)?.as_str().starts_with('h') {
            amount.saturating_mul(60)
        } else {
            amount
        };
        Some(Slot::extracted(
            SlotName::Duration,
            SlotValue::Duration(minutes),
            Span::new(whole.start(), whole.end()),
        ))
    }
}

/// Tokens that end a captured contact name: the name ran into a date, a
/// connective or an article, not more of the name. An article first means
/// no bare name was spoken ("appelle le docteur") and the relationship-hint
/// fallback takes over.
const CONTACT_CUTS: [&str; 21] = [
    "demain",
    "aujourdhui",
    "apres",
    "a",
    "au",
    "vers",
    "matin",
    "midi",
    "soir",
    "que",
    "de",
    "et",
    "le",
    "la",
    "les",
    "l",
    "un",
    "une",
    "mon",
    "ma",
    "ta",
];

fn is_contact_cut(token: &str) -> bool {
    CONTACT_CUTS.contains(&token)
        || weekday_from_token(token).is_some()
        || token.chars().any(|c| c.is_ascii_digit())
}

/// Name following a calling verb, checked against the known-contacts list.
/// A name the list does not know is still captured, flagged unresolved, so
/// the UI can ask for confirmation instead of dropping the request.
pub struct ContactExtractor;

impl SlotExtract for ContactExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"\b(?:appelle|contacte|telephone a|dis a)\s+([a-z0-9 ]+)")
                .expect("invalid built-in contact pattern")
        });

        if let Some(caps) = pattern.captures(text.as_str()) {
            if let Some(group) = caps.get(1) {
                let mut name = String::new();
                for token in group.as_str().split_whitespace() {
                    if is_contact_cut(token) {
                        break;
                    }
                    if !name.is_empty() {
                        name.push(' ');
                    }
                    name.push_str(token);
                }
                if !name.is_empty() {
                    let span = Span::new(group.start(), group.start() + name.len());
                    return Some(self.slot_for(name, span, ctx));
                }
            }
        }

        // no verb-led capture: accept a relationship word anywhere
        for (token, span) in text.token_spans() {
            if ctx.cfg.contact_hints.iter().any(|h| h == token) {
                return Some(self.slot_for(token.to_string(), span, ctx));
            }
        }
        None
    }
}

impl ContactExtractor {
    fn slot_for(&self, name: String, span: Span, ctx: &ExtractCtx<'_>) -> Slot {
        let resolved = ctx
            .cfg
            .contacts
            .iter()
            .any(|c| c.to_lowercase() == name);
        let value = SlotValue::Text(name);
        if resolved {
            Slot::extracted(SlotName::Contact, value, span)
        } else {
            Slot::unresolved(SlotName::Contact, value, span)
        }
    }
}

/// Medication name: the token following one of the medication keywords
/// (the single-token triggers of the medication intent).
pub struct MedicationExtractor;

impl SlotExtract for MedicationExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        let keywords: Vec<&str> = ctx
            .cfg
            .triggers_for(IntentLabel::MedicationReminder)
            .iter()
            .map(|t| t.phrase.as_str())
            .filter(|p| !p.contains(' '))
            .collect();
        let tokens = text.token_spans();
        for (i, (token, _)) in tokens.iter().enumerate() {
            if !keywords.contains(token) {
                continue;
            }
            if let Some((name, span)) = tokens.get(i + 1) {
                let unusable = is_contact_cut(name)
                    || ctx.cfg.payload_stopwords.iter().any(|s| s == name)
                    || keywords.contains(name);
                if !unusable {
                    return Some(Slot::extracted(
                        SlotName::Medication,
                        SlotValue::Text((*name).to_string()),
                        *span,
                    ));
                }
            }
        }
        None
    }
}

/// Media keywords mapped to the three supported channels.
const MEDIA_KINDS: [(&str, &str); 5] = [
    ("coran", "quran"),
    ("quran", "quran"),
    ("radio", "radio"),
    ("musique", "musique"),
    ("chanson", "musique"),
];

pub struct MediaExtractor;

impl SlotExtract for MediaExtractor {
    fn extract(&self, text: &NormalizedText, _ctx: &ExtractCtx<'_>) -> Option<Slot> {
        for (token, span) in text.token_spans() {
            if let Some((_, kind)) = MEDIA_KINDS.iter().find(|(word, _)| *word == token) {
                return Some(Slot::extracted(
                    SlotName::Media,
                    SlotValue::Text((*kind).to_string()),
                    span,
                ));
            }
        }
        None
    }
}

/// First known city mentioned, capitalized for display.
pub struct CityExtractor;

impl SlotExtract for CityExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        for (token, span) in text.token_spans() {
            if ctx.cfg.cities.iter().any(|c| c == token) {
                return Some(Slot::extracted(
                    SlotName::City,
                    SlotValue::Text(capitalize(token)),
                    span,
                ));
            }
        }
        None
    }
}

/// Human-readable summary of what remains once trigger phrases, date/time
/// words and function words are taken out. "docteur" anywhere short-cuts to
/// the canonical appointment summary.
pub struct TextPayloadExtractor;

impl SlotExtract for TextPayloadExtractor {
    fn extract(&self, text: &NormalizedText, ctx: &ExtractCtx<'_>) -> Option<Slot> {
        if let Some(span) = text.find_phrase("docteur") {
            return Some(Slot::extracted(
                SlotName::Text,
                SlotValue::Text("Rendez-vous docteur".to_string()),
                span,
            ));
        }

        let tokens = text.token_spans();
        let mut keep = vec![true; tokens.len()];

        for intent in IntentLabel::priority_order() {
            for trigger in ctx.cfg.triggers_for(*intent) {
                mark_phrase(&tokens, &mut keep, &trigger.phrase);
            }
        }
        for entry in &ctx.cfg.periods {
            mark_phrase(&tokens, &mut keep, &entry.phrase);
        }
        for (i, (token, _)) in tokens.iter().enumerate() {
            if is_contact_cut(token) || ctx.cfg.payload_stopwords.iter().any(|s| s == token) {
                keep[i] = false;
            }
        }
        for pattern in clock_patterns() {
            for m in pattern.find_iter(text.as_str()) {
                mark_range(&tokens, &mut keep, m.start(), m.end());
            }
        }

        let mut summary = String::new();
        let mut span: Option<Span> = None;
        for (i, (token, token_span)) in tokens.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            if !summary.is_empty() {
                summary.push(' ');
            }
            summary.push_str(token);
            span = Some(match span {
                None => *token_span,
                Some(s) => Span::new(s.start, token_span.end),
            });
        }
        let span = span?;
        Some(Slot::extracted(
            SlotName::Text,
            SlotValue::Text(capitalize(&summary)),
            span,
        ))
    }
}

fn mark_phrase(tokens: &[(&str, Span)], keep: &mut [bool], phrase: &str) {
    let needle: Vec<&str> = phrase.split_whitespace().collect();
    if needle.is_empty() || needle.len() > tokens.len() {
        return;
    }
    for start in 0..=(tokens.len() - needle.len()) {
        let matched = needle
            .iter()
            .enumerate()
            .all(|(j, want)| tokens[start + j].0 == *want);
        if matched {
            for flag in keep.iter_mut().skip(start).take(needle.len()) {
                *flag = false;
            }
        }
    }
}

fn mark_range(tokens: &[(&str, Span)], keep: &mut [bool], start: usize, end: usize) {
    for (i, (_, span)) in tokens.iter().enumerate() {
        if span.start < end && span.end > start {
            keep[i] = false;
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use time::macros::date;

    fn run(extractor: &dyn SlotExtract, raw: &str) -> Option<Slot> {
        run_with(extractor, raw, PipelineConfig::default())
    }

    fn run_with(extractor: &dyn SlotExtract, raw: &str, cfg: PipelineConfig) -> Option<Slot> {
        let text = Normalizer::new(&cfg).normalize(raw);
        let ctx = ExtractCtx {
            today: date!(2026 - 02 - 28),
            cfg: &cfg,
        };
        extractor.extract(&text, &ctx)
    }

    fn value_of(slot: Option<Slot>) -> String {
        slot.map(|s| s.value.to_string()).unwrap_or_default()
    }

    #[test]
    fn date_relative_expressions() {
        assert_eq!(value_of(run(&DateExtractor, "rappelle moi demain")), "2026-03-01");
        assert_eq!(value_of(run(&DateExtractor, "apres demain matin")), "2026-03-02");
        assert_eq!(value_of(run(&DateExtractor, "lyoum le soir")), "2026-02-28");
        // 2026-02-28 is a Saturday; next Friday is March 6th
        assert_eq!(value_of(run(&DateExtractor, "vendredi a 9h")), "2026-03-06");
        // same weekday means next week, not today
        assert_eq!(value_of(run(&DateExtractor, "samedi")), "2026-03-07");
        assert!(run(&DateExtractor, "rappelle moi le rdv").is_none());
    }

    #[test]
    fn date_leftmost_mention_wins() {
        assert_eq!(
            value_of(run(&DateExtractor, "demain ou apres demain")),
            "2026-03-01"
        );
    }

    #[test]
    fn time_explicit_forms() {
        assert_eq!(value_of(run(&TimeExtractor, "a 10h")), "10:00");
        assert_eq!(value_of(run(&TimeExtractor, "a 10h45")), "10:45");
        assert_eq!(value_of(run(&TimeExtractor, "vers 9 h 15")), "09:15");
        assert_eq!(value_of(run(&TimeExtractor, "a 18:30")), "18:30");
        assert!(run(&TimeExtractor, "dans la journee").is_none());
    }

    #[test]
    fn time_explicit_outranks_period() {
        assert_eq!(
            value_of(run(&TimeExtractor, "demain matin a 10h")),
            "10:00"
        );
    }

    #[test]
    fn time_period_table() {
        assert_eq!(value_of(run(&TimeExtractor, "demain matin")), "08:00");
        assert_eq!(value_of(run(&TimeExtractor, "ghodwa sbah")), "08:00");
        assert_eq!(value_of(run(&TimeExtractor, "demain apres midi")), "15:00");
        assert_eq!(value_of(run(&TimeExtractor, "ce soir")), "20:00");
    }

    #[test]
    fn invalid_clock_values_are_ignored() {
        // 25h is not a time; "h" alone neither
        assert!(run(&TimeExtractor, "a 25h").is_none());
        assert!(run(&TimeExtractor, "l heure h").is_none());
    }

    #[test]
    fn duration_minutes_and_hours() {
        assert_eq!(value_of(run(&DurationExtractor, "dans 20 minutes")), "20min");
        assert_eq!(value_of(run(&DurationExtractor, "pendant 2 heures")), "120min");
        assert!(run(&DurationExtractor, "dans un moment").is_none());
    }

    #[test]
    fn contact_unresolved_without_list() {
        let slot = run(&ContactExtractor, "appelle fatma").unwrap();
        assert_eq!(slot.value.to_string(), "fatma");
        assert_eq!(slot.origin, crate::slots::SlotOrigin::Unresolved);
    }

    #[test]
    fn contact_resolved_against_list() {
        let cfg = PipelineConfig {
            contacts: vec!["Fatma".to_string()],
            ..PipelineConfig::default()
        };
        let slot = run_with(&ContactExtractor, "appelle fatma", cfg).unwrap();
        assert_eq!(slot.origin, crate::slots::SlotOrigin::Extracted);
    }

    #[test]
    fn contact_name_stops_at_date_words() {
        let slot = run(&ContactExtractor, "appelle fatma demain matin").unwrap();
        assert_eq!(slot.value.to_string(), "fatma");
    }

    #[test]
    fn contact_hint_fallback() {
        let slot = run(&ContactExtractor, "il faut joindre la pharmacie").unwrap();
        assert_eq!(slot.value.to_string(), "pharmacie");
        assert_eq!(slot.origin, crate::slots::SlotOrigin::Unresolved);
    }

    #[test]
    fn medication_name_after_keyword() {
        let slot = run(&MedicationExtractor, "rappelle moi le cachet doliprane").unwrap();
        assert_eq!(slot.value.to_string(), "doliprane");
        // keyword with nothing usable after it
        assert!(run(&MedicationExtractor, "prends ton medicament demain").is_none());
    }

    #[test]
    fn media_kinds() {
        assert_eq!(value_of(run(&MediaExtractor, "mets el coran")), "quran");
        assert_eq!(value_of(run(&MediaExtractor, "mets la radio")), "radio");
        assert_eq!(value_of(run(&MediaExtractor, "une chanson douce")), "musique");
        assert!(run(&MediaExtractor, "mets quelque chose").is_none());
    }

    #[test]
    fn city_capitalized() {
        assert_eq!(value_of(run(&CityExtractor, "el jaw fi sousse")), "Sousse");
        assert!(run(&CityExtractor, "el jaw").is_none());
    }

    #[test]
    fn payload_doctor_summary() {
        let slot = run(&TextPayloadExtractor, "rappelle moi demain matin doctour a 10h").unwrap();
        assert_eq!(slot.value.to_string(), "Rendez-vous docteur");
    }

    #[test]
    fn payload_strips_triggers_and_dates() {
        let slot = run(&TextPayloadExtractor, "rappelle moi demain d acheter du pain").unwrap();
        assert_eq!(slot.value.to_string(), "Acheter pain");
        assert!(run(&TextPayloadExtractor, "rappelle moi demain a 10h").is_none());
    }

    #[test]
    fn extractor_set_is_fixed() {
        assert_eq!(extractors().len(), 8);
    }
}
