//! Catalogue types: the three activity tiers and their enumerations.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ActivityError, Result};

/// Flat attribute bag as supplied by a caller (e.g. a decoded JSON body).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// One storage row, column name to value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The tier an attribute bag or row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Sport,
    Event,
    Selection,
}

impl ActivityType {
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Sport => "sport",
            ActivityType::Event => "event",
            ActivityType::Selection => "selection",
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Whether an event is taken before or during play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", rename_all = "UPPERCASE")]
pub enum EventType {
    Preplay = 0,
    Inplay = 1,
}

impl EventType {
    pub fn ordinal(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventType::Preplay => "PREPLAY",
            EventType::Inplay => "INPLAY",
        }
    }
}

impl TryFrom<i64> for EventType {
    type Error = ActivityError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(EventType::Preplay),
            1 => Ok(EventType::Inplay),
            other => Err(ActivityError::validation(format!(
                "invalid event type {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Event progress. `Cancelled` doubles as the disable marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", rename_all = "UPPERCASE")]
pub enum EventStatus {
    Pending = 0,
    Started = 1,
    Ended = 2,
    Cancelled = 3,
}

impl EventStatus {
    pub fn ordinal(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Started => "STARTED",
            EventStatus::Ended => "ENDED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<i64> for EventStatus {
    type Error = ActivityError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(EventStatus::Pending),
            1 => Ok(EventStatus::Started),
            2 => Ok(EventStatus::Ended),
            3 => Ok(EventStatus::Cancelled),
            other => Err(ActivityError::validation(format!(
                "invalid event status {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Settlement of a selection. `Void` doubles as the disable marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", rename_all = "UPPERCASE")]
pub enum Outcome {
    Unsettled = 0,
    Void = 1,
    Lose = 2,
    Win = 3,
}

impl Outcome {
    pub fn ordinal(&self) -> i64 {
        *self as i64
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Unsettled => "UNSETTLED",
            Outcome::Void => "VOID",
            Outcome::Lose => "LOSE",
            Outcome::Win => "WIN",
        }
    }
}

impl TryFrom<i64> for Outcome {
    type Error = ActivityError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Outcome::Unsettled),
            1 => Ok(Outcome::Void),
            2 => Ok(Outcome::Lose),
            3 => Ok(Outcome::Win),
            other => Err(ActivityError::validation(format!(
                "invalid selection outcome {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Top tier of the catalogue (e.g. "Football").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sport {
    pub name: String,
    pub slug: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub active: bool,
}

/// A fixture belonging to one sport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub slug: Option<String>,
    #[serde(deserialize_with = "flag")]
    pub active: bool,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub status: EventStatus,
    /// UTC instant the event is due to start.
    pub scheduled_start: Option<DateTime<Utc>>,
    /// Stamped by storage whenever the status changes.
    pub actual_start: Option<DateTime<Utc>>,
    pub sport: String,
}

/// A priced outcome of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    #[serde(deserialize_with = "flag")]
    pub active: bool,
    /// Decimal price with exactly two fraction digits.
    pub price: String,
    pub outcome: Outcome,
    pub event: String,
}

impl Sport {
    pub fn from_row(row: &Row) -> Result<Self> {
        decode("sports", row)
    }
}

impl Event {
    pub fn from_row(row: &Row) -> Result<Self> {
        decode("events", row)
    }
}

impl Selection {
    pub fn from_row(row: &Row) -> Result<Self> {
        decode("selections", row)
    }
}

fn decode<T: DeserializeOwned>(table: &str, row: &Row) -> Result<T> {
    serde_json::from_value(serde_json::Value::Object(row.clone()))
        .map_err(|e| ActivityError::validation(format!("malformed {} row: {}", table, e)))
}

// SQLite hands booleans back as 0/1 integers.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
