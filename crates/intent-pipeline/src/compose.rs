//! Action composition: intent + extracted slots -> final record.
//!
//! The per-intent rules are a declared table: which slot names an intent
//! keeps, which defaults fill the gaps, and the single degradation edge
//! (medication reminder without medication falls back to a plain
//! reminder). Total over every (intent, slot-set) pair — composing never
//! fails, it degrades.

use crate::intent::IntentLabel;
use crate::slots::{Slot, SlotName, SlotOrigin, SlotValue};
use serde::Serialize;
use std::collections::BTreeMap;
use time::macros::time;
use time::Date;
use tracing::{debug, info};

/// Final structured output of the pipeline. Immutable once returned; the
/// core never persists it.
///
/// Serialized shape: `action`, `slots` (one string entry per populated
/// slot, absent slots omitted rather than null), `confidence`, `rawText`,
/// plus `defaulted`/`unresolved` slot-name lists present only when
/// non-empty so the caller can prompt for confirmation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub action: IntentLabel,
    pub slots: BTreeMap<SlotName, SlotValue>,
    pub confidence: f32,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defaulted: Vec<SlotName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<SlotName>,
}

/// Slot names an intent keeps. Anything else the extractors happened to
/// find is dropped, the map keys stay unique.
fn kept_slots(label: IntentLabel) -> &'static [SlotName] {
    use SlotName::*;
    match label {
        IntentLabel::CreateReminder => &[Date, Time, Text],
        IntentLabel::MedicationReminder => &[Date, Time, Text, Medication],
        IntentLabel::SetAlarm => &[Date, Time, Duration, Text],
        // the contact is forced to the emergency number regardless of input
        IntentLabel::EmergencyCall => &[],
        IntentLabel::CallContact => &[Contact],
        IntentLabel::CancelReminder => &[Date, Text],
        IntentLabel::CheckTime => &[],
        IntentLabel::SendMessage => &[Contact, Text],
        IntentLabel::GetWeather => &[City, Date],
        IntentLabel::PlayMedia => &[Media],
        IntentLabel::Unknown => &[],
    }
}

fn default_slot(slots: &mut Vec<Slot>, name: SlotName, value: SlotValue) {
    if !slots.iter().any(|s| s.name == name) {
        slots.push(Slot::defaulted(name, value));
    }
}

fn apply_defaults(label: IntentLabel, slots: &mut Vec<Slot>, today: Date) {
    let text = |s: &str| SlotValue::Text(s.to_string());
    match label {
        IntentLabel::CreateReminder | IntentLabel::MedicationReminder => {
            default_slot(slots, SlotName::Text, text("rappel"));
            default_slot(slots, SlotName::Date, SlotValue::Date(today));
        }
        IntentLabel::SetAlarm => {
            default_slot(slots, SlotName::Text, text("reveil"));
            default_slot(slots, SlotName::Date, SlotValue::Date(today));
            let timed = slots
                .iter()
                .any(|s| s.name == SlotName::Time || s.name == SlotName::Duration);
            if !timed {
                default_slot(slots, SlotName::Time, SlotValue::Time(time!(8:00)));
            }
        }
        IntentLabel::EmergencyCall => {
            default_slot(slots, SlotName::Contact, text("urgence"));
        }
        IntentLabel::CancelReminder => {
            default_slot(slots, SlotName::Date, SlotValue::Date(today));
        }
        IntentLabel::CheckTime => {
            default_slot(slots, SlotName::Timezone, text("Africa/Tunis"));
        }
        IntentLabel::SendMessage => {
            default_slot(slots, SlotName::Contact, text("famille"));
            default_slot(slots, SlotName::Text, text("message vocal"));
        }
        IntentLabel::GetWeather => {
            default_slot(slots, SlotName::City, text("Tunis"));
            default_slot(slots, SlotName::Date, SlotValue::Date(today));
        }
        IntentLabel::PlayMedia => {
            default_slot(slots, SlotName::Media, text("musique"));
        }
        IntentLabel::CallContact | IntentLabel::Unknown => {}
    }
}

/// Combine a classification with whatever the extractors found.
///
/// `today` is the same injected reference date the extractors used; it
/// feeds the date defaults.
pub fn compose(
    label: IntentLabel,
    confidence: f32,
    slots: Vec<Slot>,
    raw_text: &str,
    today: Date,
) -> ActionRecord {
    let label = degrade(label, &slots);

    let kept = kept_slots(label);
    let mut chosen: Vec<Slot> = Vec::new();
    for slot in slots {
        if kept.contains(&slot.name) && !chosen.iter().any(|c| c.name == slot.name) {
            chosen.push(slot);
        }
    }
    apply_defaults(label, &mut chosen, today);

    let mut map = BTreeMap::new();
    let mut defaulted = Vec::new();
    let mut unresolved = Vec::new();
    for slot in chosen {
        match slot.origin {
            SlotOrigin::Defaulted => defaulted.push(slot.name),
            SlotOrigin::Unresolved => unresolved.push(slot.name),
            SlotOrigin::Extracted => {}
        }
        map.insert(slot.name, slot.value);
    }
    debug!(action = %label, slots = map.len(), "composed action record");
    ActionRecord {
        action: label,
        slots: map,
        confidence: confidence.clamp(0.0, 1.0),
        raw_text: raw_text.to_string(),
        defaulted,
        unresolved,
    }
}

fn degrade(label: IntentLabel, slots: &[Slot]) -> IntentLabel {
    if label == IntentLabel::MedicationReminder {
        let supported = slots
            .iter()
            .any(|s| s.name == SlotName::Medication || s.name == SlotName::Text);
        if !supported {
            info!("medication reminder without medication or text, degrading to create_reminder");
            return IntentLabel::CreateReminder;
        }
    }
    label
}
