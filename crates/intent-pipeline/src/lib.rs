//! Transcript-to-intent pipeline for the SeniorVoice assistant.
//!
//! Takes one finalized speech-engine transcript (mixed Tunisian dialectal
//! Arabic and French, usually hesitant) and produces a deterministic,
//! well-typed action record: normalization, intent classification, slot
//! extraction, composition. Every stage is total — malformed input
//! degrades (unknown intent, unresolved or defaulted slots), it never
//! errors. The whole pipeline is a pure function chain: configuration and
//! the reference date come in as explicit arguments, nothing reads a
//! clock or mutates shared state.

mod compose;
mod config;
mod extract;
mod intent;
mod normalize;
mod slots;

pub use compose::{compose, ActionRecord};
pub use config::{ConfigError, IntentTriggers, PeriodEntry, PipelineConfig, Trigger};
pub use extract::{extractors, ExtractCtx, SlotExtract};
pub use intent::{Classification, IntentClassifier, IntentLabel};
pub use normalize::{NormalizedText, Normalizer};
pub use slots::{Slot, SlotName, SlotOrigin, SlotValue, Span};

use time::Date;

/// One finalized utterance from the speech engine. Ephemeral: lives for a
/// single request.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Engine recognition confidence in [0,1], when the engine reports one.
    pub confidence: Option<f32>,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: Some(confidence),
        }
    }
}

/// The assembled pipeline: owns its configuration, processes one
/// transcript per call. Stateless across calls, so one instance can serve
/// any number of requests.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full chain: normalize, classify, extract, compose.
    ///
    /// `today` is the reference date all relative-date resolution uses;
    /// injecting it keeps results reproducible.
    pub fn process(&self, transcript: &Transcript, today: Date) -> ActionRecord {
        let normalized = Normalizer::new(&self.config).normalize(&transcript.text);
        tracing::debug!(raw = %transcript.text, normalized = %normalized, "normalized transcript");

        let classification = IntentClassifier::new(&self.config).classify(&normalized);

        // extractors are independent; the composer sees the complete set
        let ctx = ExtractCtx {
            today,
            cfg: &self.config,
        };
        let slots: Vec<Slot> = extractors()
            .iter()
            .filter_map(|e| e.extract(&normalized, &ctx))
            .collect();

        compose(
            classification.label,
            classification.confidence,
            slots,
            &transcript.text,
            today,
        )
    }
}

/// Parse one transcript with the built-in configuration.
pub fn parse_command(text: &str, today: Date) -> ActionRecord {
    Pipeline::with_defaults().process(&Transcript::new(text), today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const NOW: Date = date!(2026 - 02 - 28);

    #[test]
    fn end_to_end_reminder_scenario() {
        let record = parse_command("Euh rappelle moi demain matin doctour a 10h", NOW);
        assert_eq!(record.action, IntentLabel::CreateReminder);
        assert_eq!(
            record.slots.get(&SlotName::Date).map(|v| v.to_string()),
            Some("2026-03-01".to_string())
        );
        assert_eq!(
            record.slots.get(&SlotName::Time).map(|v| v.to_string()),
            Some("10:00".to_string())
        );
        let text = record
            .slots
            .get(&SlotName::Text)
            .map(|v| v.to_string())
            .unwrap_or_default();
        assert!(text.to_lowercase().contains("docteur"), "text was {text:?}");
        assert!(record.defaulted.is_empty());
    }

    #[test]
    fn tomorrow_morning_resolves_deterministically() {
        let record = parse_command("rappelle moi demain matin le docteur", NOW);
        assert_eq!(
            record.slots.get(&SlotName::Date).map(|v| v.to_string()),
            Some("2026-03-01".to_string())
        );
        assert_eq!(
            record.slots.get(&SlotName::Time).map(|v| v.to_string()),
            Some("08:00".to_string())
        );
    }

    #[test]
    fn unknown_fallback_is_empty() {
        let record = parse_command("le chat dort sur la chaise", NOW);
        assert_eq!(record.action, IntentLabel::Unknown);
        assert_eq!(record.confidence, 0.0);
        assert!(record.slots.is_empty());
    }

    #[test]
    fn unresolved_contact_with_empty_contact_list() {
        let record = parse_command("appelle Fatma", NOW);
        assert_eq!(record.action, IntentLabel::CallContact);
        assert_eq!(
            record.slots.get(&SlotName::Contact).map(|v| v.to_string()),
            Some("fatma".to_string())
        );
        assert_eq!(record.unresolved, vec![SlotName::Contact]);
    }

    #[test]
    fn known_contact_resolves() {
        let pipeline = Pipeline::new(PipelineConfig {
            contacts: vec!["Fatma".to_string()],
            ..PipelineConfig::default()
        });
        let record = pipeline.process(&Transcript::new("appelle Fatma"), NOW);
        assert_eq!(record.action, IntentLabel::CallContact);
        assert!(record.unresolved.is_empty());
    }

    #[test]
    fn dialect_weather_request() {
        let record = parse_command("chnowa el jaw ghodwa fi sousse", NOW);
        assert_eq!(record.action, IntentLabel::GetWeather);
        assert_eq!(
            record.slots.get(&SlotName::City).map(|v| v.to_string()),
            Some("Sousse".to_string())
        );
        assert_eq!(
            record.slots.get(&SlotName::Date).map(|v| v.to_string()),
            Some("2026-03-01".to_string())
        );
    }

    #[test]
    fn emergency_never_loses_to_routine_triggers() {
        let record = parse_command("appelle le samu et rappelle moi le rdv", NOW);
        assert_eq!(record.action, IntentLabel::EmergencyCall);
        assert_eq!(
            record.slots.get(&SlotName::Contact).map(|v| v.to_string()),
            Some("urgence".to_string())
        );
    }

    #[test]
    fn medication_reminder_end_to_end() {
        let record = parse_command("fakarni bel dwa doliprane ghodwa", NOW);
        assert_eq!(record.action, IntentLabel::MedicationReminder);
        assert_eq!(
            record.slots.get(&SlotName::Medication).map(|v| v.to_string()),
            Some("doliprane".to_string())
        );
    }

    #[test]
    fn empty_transcript_is_unknown() {
        let record = parse_command("", NOW);
        assert_eq!(record.action, IntentLabel::Unknown);
        assert_eq!(record.confidence, 0.0);
        assert!(record.slots.is_empty());
        assert_eq!(record.raw_text, "");
    }

    #[test]
    fn record_echoes_raw_text() {
        let raw = "Euh appelle Fatma!";
        let record = parse_command(raw, NOW);
        assert_eq!(record.raw_text, raw);
    }
}
