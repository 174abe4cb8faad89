use std::str::FromStr;

use chrono::{NaiveDateTime, SecondsFormat};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::{ActivityError, Result};
use crate::types::{ActivityType, Attributes, Row};

use super::{required_text, text_attr};

/// Textual format accepted for `scheduled_start`, read as UTC.
pub const SCHEDULED_START_FORMAT: &str = "%Y/%m/%d, %H:%M:%S";

/// Used when an event is created without a `scheduled_start`.
pub const DEFAULT_SCHEDULED_START: &str = "2021/10/15, 19:30:39";

pub const DEFAULT_PRICE: &str = "0.00";

/// Derive the row to insert for a new activity of the given tier.
pub fn build(kind: ActivityType, attrs: &Attributes) -> Result<Row> {
    let name = required_text(attrs, "name")?;
    let mut row = Row::new();

    match kind {
        ActivityType::Sport => {
            row.insert("slug".into(), Value::String(slug_for(&name, attrs)?));
        }
        ActivityType::Event => {
            let sport = required_text(attrs, "sport")?;
            row.insert("slug".into(), Value::String(slug_for(&name, attrs)?));
            row.insert(
                "scheduled_start".into(),
                Value::String(parse_scheduled_start(attrs.get("scheduled_start"))?),
            );
            row.insert("sport".into(), Value::String(sport));
        }
        ActivityType::Selection => {
            let event = required_text(attrs, "event")?;
            row.insert(
                "price".into(),
                Value::String(parse_price(attrs.get("price"))?),
            );
            row.insert("event".into(), Value::String(event));
        }
    }

    row.insert("name".into(), Value::String(name));
    row.insert("active".into(), Value::Bool(true));
    Ok(row)
}

/// Lowercase alphanumerics, with every run of anything else collapsed to
/// a single hyphen. Leading and trailing hyphens are dropped.
pub fn slugify(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_separator = false;

    for c in s.chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_separator = false;
        } else if !last_was_separator && !result.is_empty() {
            result.push('-');
            last_was_separator = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

fn slug_for(name: &str, attrs: &Attributes) -> Result<String> {
    let slug = match text_attr(attrs, "slug")? {
        Some(explicit) => slugify(&explicit),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(ActivityError::validation(format!(
            "name '{}' does not produce a slug",
            name
        )));
    }
    Ok(slug)
}

/// Parse a price and format it with exactly two fraction digits.
pub fn parse_price(value: Option<&Value>) -> Result<String> {
    let raw = match value {
        None | Some(Value::Null) => return Ok(DEFAULT_PRICE.to_string()),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(ActivityError::validation(format!(
                "invalid price {}",
                other
            )))
        }
    };

    let parsed = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| ActivityError::validation(format!("invalid price '{}'", raw)))?;

    let mut price = parsed.round_dp(2);
    price.rescale(2);
    if price.scale() != 2 {
        return Err(ActivityError::validation(format!(
            "price '{}' has too many digits",
            raw
        )));
    }
    Ok(price.to_string())
}

/// Parse `YYYY/MM/DD, HH:MM:SS` (UTC) into an RFC 3339 instant.
pub fn parse_scheduled_start(value: Option<&Value>) -> Result<String> {
    let raw = match value {
        None | Some(Value::Null) => DEFAULT_SCHEDULED_START.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => {
            return Err(ActivityError::validation(format!(
                "invalid scheduled_start {}",
                other
            )))
        }
    };

    let naive = NaiveDateTime::parse_from_str(&raw, SCHEDULED_START_FORMAT).map_err(|e| {
        ActivityError::validation(format!("invalid scheduled_start '{}': {}", raw, e))
    })?;
    Ok(naive.and_utc().to_rfc3339_opts(SecondsFormat::Secs, false))
}
