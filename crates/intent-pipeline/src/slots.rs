//! Slot vocabulary and typed slot values.

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Time};

/// Byte range into the normalized text a slot was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Span used for slots the composer fills from policy; points nowhere.
    pub const EMPTY: Span = Span { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Closed slot vocabulary. Which names an intent keeps is declared in the
/// composer's rule table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Date,
    Time,
    Duration,
    Contact,
    Text,
    Medication,
    Media,
    City,
    Timezone,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Date => "date",
            SlotName::Time => "time",
            SlotName::Duration => "duration",
            SlotName::Contact => "contact",
            SlotName::Text => "text",
            SlotName::Medication => "medication",
            SlotName::Media => "media",
            SlotName::City => "city",
            SlotName::Timezone => "timezone",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed slot payload. Serializes as its canonical string form so the
/// output record stays a flat string-keyed object.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Date(Date),
    Time(Time),
    /// Whole minutes.
    Duration(u32),
    Text(String),
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Date(d) => {
                write!(f, "{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
            }
            SlotValue::Time(t) => write!(f, "{:02}:{:02}", t.hour(), t.minute()),
            SlotValue::Duration(minutes) => write!(f, "{minutes}min"),
            SlotValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for SlotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// How a slot value came to be: read from the utterance, filled from an
/// intent's declared default, or captured verbatim without matching a known
/// entity. The latter two are degraded results the UI can confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOrigin {
    Extracted,
    Defaulted,
    Unresolved,
}

/// A named, typed piece of information supporting an intent.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub name: SlotName,
    pub value: SlotValue,
    pub span: Span,
    pub origin: SlotOrigin,
}

impl Slot {
    pub fn extracted(name: SlotName, value: SlotValue, span: Span) -> Self {
        Self {
            name,
            value,
            span,
            origin: SlotOrigin::Extracted,
        }
    }

    pub fn unresolved(name: SlotName, value: SlotValue, span: Span) -> Self {
        Self {
            name,
            value,
            span,
            origin: SlotOrigin::Unresolved,
        }
    }

    pub fn defaulted(name: SlotName, value: SlotValue) -> Self {
        Self {
            name,
            value,
            span: Span::EMPTY,
            origin: SlotOrigin::Defaulted,
        }
    }
}
