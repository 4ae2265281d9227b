//! Pipeline configuration: every lexical table the pipeline consumes.
//!
//! The built-in defaults cover the senior Tunisian speech domain (mixed
//! dialectal Arabic and French). All of it is data: callers can replace any
//! table through a YAML overlay without touching pipeline logic. The dialect
//! and vague-period tables are versioned domain data, not inferred rules.

use crate::intent::IntentLabel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },
}

/// A trigger phrase for one intent, with its scoring weight.
///
/// Phrases are written in normalized form (lower-case, no diacritics) and
/// matched as whole-token sequences, never as substrings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub phrase: String,
    pub weight: f32,
}

impl Trigger {
    fn new(phrase: &str, weight: f32) -> Self {
        Self {
            phrase: phrase.to_string(),
            weight,
        }
    }
}

/// Trigger table for a single intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentTriggers {
    pub intent: IntentLabel,
    pub triggers: Vec<Trigger>,
}

/// One entry of the vague-time-period table, e.g. "matin" -> 08:00.
///
/// The hour/minute pair is the declared representative time for the period,
/// a documented policy rather than a guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub phrase: String,
    pub hour: u8,
    pub minute: u8,
}

impl PeriodEntry {
    fn new(phrase: &str, hour: u8, minute: u8) -> Self {
        Self {
            phrase: phrase.to_string(),
            hour,
            minute,
        }
    }
}

/// Immutable configuration for one pipeline instance.
///
/// Loaded once, passed by reference into every call; never mutated at
/// runtime. Each field falls back to the built-in table when absent from an
/// overlay file, so a partial YAML document is a valid overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hesitation tokens removed as whole tokens before anything else.
    pub fillers: Vec<String>,
    /// Dialectal spelling variants mapped to one canonical token. An empty
    /// value deletes the token (used for the Arabic article "el").
    pub dialect_variants: BTreeMap<String, String>,
    /// Per-intent trigger/weight tables.
    pub triggers: Vec<IntentTriggers>,
    /// Minimum normalized score for a classification to stand.
    pub confidence_threshold: f32,
    /// Known contacts; a captured name matching one of these is resolved.
    pub contacts: Vec<String>,
    /// Relationship words accepted as a contact when no name was captured.
    pub contact_hints: Vec<String>,
    /// Vague-period table mapping period words to a representative time.
    pub periods: Vec<PeriodEntry>,
    /// Known city names for the weather intent.
    pub cities: Vec<String>,
    /// Function words dropped when building the free-text summary.
    pub payload_stopwords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fillers: default_fillers(),
            dialect_variants: default_dialect_variants(),
            triggers: default_triggers(),
            confidence_threshold: 0.25,
            contacts: Vec::new(),
            contact_hints: default_contact_hints(),
            periods: default_periods(),
            cities: default_cities(),
            payload_stopwords: default_payload_stopwords(),
        }
    }
}

impl PipelineConfig {
    /// Load an overlay file; fields missing from the YAML keep the built-in
    /// defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Trigger table for one intent, empty when the intent has none.
    pub fn triggers_for(&self, intent: IntentLabel) -> &[Trigger] {
        self.triggers
            .iter()
            .find(|t| t.intent == intent)
            .map(|t| t.triggers.as_slice())
            .unwrap_or(&[])
    }
}

fn default_fillers() -> Vec<String> {
    ["euh", "heuu", "hmm", "mmm", "hein", "ben", "bah", "yaani", "uh", "ah"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_dialect_variants() -> BTreeMap<String, String> {
    // Values must be fixed points of the table so normalization stays
    // idempotent. "el" maps to the empty string: the article is dropped.
    let pairs = [
        // Tunisian dialect, Latin script
        ("sbah", "matin"),
        ("ghodwa", "demain"),
        ("ghodwaa", "demain"),
        ("ghedwa", "demain"),
        ("lyoum", "aujourdhui"),
        ("saa", "heure"),
        ("dwa", "medicament"),
        ("jaw", "meteo"),
        ("klim", "appelle"),
        ("fakarni", "rappelle"),
        ("fasakh", "annule"),
        ("fayakni", "reveille"),
        ("ab3ath", "envoie"),
        ("najda", "secours"),
        ("chnouwa", "quoi"),
        ("chnowa", "quoi"),
        ("el", ""),
        // Common engine misspellings
        ("doctour", "docteur"),
        ("docture", "docteur"),
        ("aujourd", "aujourdhui"),
        ("auj", "aujourdhui"),
        // Arabic script spellings of the same concepts
        ("غدوة", "demain"),
        ("اليوم", "aujourdhui"),
        ("دواء", "medicament"),
        ("صباح", "matin"),
    ];
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_triggers() -> Vec<IntentTriggers> {
    use IntentLabel::*;
    let table = |intent, triggers: Vec<Trigger>| IntentTriggers { intent, triggers };
    vec![
        table(
            EmergencyCall,
            vec![
                Trigger::new("urgence", 1.2),
                Trigger::new("samu", 1.2),
                Trigger::new("ambulance", 1.2),
                Trigger::new("secours", 1.2),
                Trigger::new("au secours", 1.4),
            ],
        ),
        table(
            MedicationReminder,
            vec![
                Trigger::new("medicament", 1.0),
                Trigger::new("cachet", 1.0),
                Trigger::new("pilule", 1.0),
                Trigger::new("comprime", 1.0),
                Trigger::new("traitement", 0.9),
            ],
        ),
        table(
            CallContact,
            vec![
                Trigger::new("appelle", 1.0),
                Trigger::new("contacte", 1.0),
                Trigger::new("telephone", 0.9),
                Trigger::new("appel", 0.8),
            ],
        ),
        table(
            CreateReminder,
            vec![
                Trigger::new("rappelle", 1.0),
                Trigger::new("rappel", 1.0),
                Trigger::new("souviens", 0.9),
                Trigger::new("rendez vous", 0.8),
                Trigger::new("rdv", 0.8),
            ],
        ),
        table(
            CancelReminder,
            vec![
                // heavier than the create_reminder nouns: "annule le rappel"
                // must not fall back to create_reminder on a score tie
                Trigger::new("annule", 1.2),
                Trigger::new("supprime", 1.2),
                Trigger::new("efface", 1.0),
                Trigger::new("enleve le rappel", 1.4),
            ],
        ),
        table(
            SetAlarm,
            vec![
                Trigger::new("alarme", 1.0),
                Trigger::new("reveil", 1.0),
                Trigger::new("reveille", 1.0),
            ],
        ),
        table(
            CheckTime,
            vec![
                Trigger::new("quelle heure", 1.2),
                Trigger::new("wa9tech", 1.0),
                Trigger::new("temps maintenant", 0.8),
                Trigger::new("heure", 0.4),
            ],
        ),
        table(
            SendMessage,
            vec![
                Trigger::new("message", 1.0),
                Trigger::new("sms", 1.0),
                Trigger::new("envoie", 0.9),
                Trigger::new("dis a", 0.9),
            ],
        ),
        table(
            GetWeather,
            vec![
                Trigger::new("meteo", 1.0),
                Trigger::new("pluie", 0.9),
                Trigger::new("temperature", 0.9),
                Trigger::new("temps", 0.5),
            ],
        ),
        table(
            PlayMedia,
            vec![
                Trigger::new("musique", 1.0),
                Trigger::new("radio", 1.0),
                Trigger::new("coran", 1.0),
                Trigger::new("quran", 1.0),
                Trigger::new("chanson", 1.0),
            ],
        ),
    ]
}

fn default_contact_hints() -> Vec<String> {
    [
        "fils", "fille", "docteur", "medecin", "voisin", "voisine", "soeur", "frere", "pharmacie",
        "taxi",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_periods() -> Vec<PeriodEntry> {
    vec![
        PeriodEntry::new("matin", 8, 0),
        PeriodEntry::new("midi", 12, 0),
        PeriodEntry::new("apres midi", 15, 0),
        PeriodEntry::new("soir", 20, 0),
        PeriodEntry::new("nuit", 21, 0),
    ]
}

fn default_cities() -> Vec<String> {
    [
        "tunis", "sfax", "sousse", "nabeul", "monastir", "bizerte", "gabes", "ariana",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_payload_stopwords() -> Vec<String> {
    // single letters are elision leftovers: apostrophes fold to spaces
    [
        "moi", "me", "le", "la", "les", "un", "une", "de", "du", "des", "mon", "ma", "mes", "a",
        "au", "aux", "et", "pour", "que", "qui", "qu", "est", "avec", "stp", "plait", "d", "l",
        "j", "c", "n", "s", "t", "fi", "bel", "lel", "bech", "w",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_intent() {
        let cfg = PipelineConfig::default();
        for intent in IntentLabel::priority_order() {
            assert!(
                !cfg.triggers_for(*intent).is_empty(),
                "no triggers for {intent}"
            );
        }
    }

    #[test]
    fn dialect_values_are_fixed_points() {
        // Required for normalize() idempotence.
        let cfg = PipelineConfig::default();
        for value in cfg.dialect_variants.values() {
            if value.is_empty() {
                continue;
            }
            assert!(
                !cfg.dialect_variants.contains_key(value.as_str()),
                "{value} maps again"
            );
        }
    }

    #[test]
    fn overlay_keeps_defaults_for_missing_fields() {
        let cfg: PipelineConfig =
            serde_yaml::from_str("confidence_threshold: 0.4\ncontacts: [fatma]").unwrap();
        assert_eq!(cfg.confidence_threshold, 0.4);
        assert_eq!(cfg.contacts, vec!["fatma".to_string()]);
        assert!(!cfg.fillers.is_empty());
        assert!(!cfg.triggers.is_empty());
    }
}
