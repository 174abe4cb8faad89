//! Disable and delete propagation across sport, event and selection.
//!
//! Disabling cascades both ways: a deactivated parent takes all of its
//! descendants with it, and a child that was the last active one under its
//! parent takes the parent with it. Deleting only cascades down.
//!
//! Descendants are always handled before the row that owns them.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::catalogue::{events_for_sport, selections_for_event};
use crate::data::{DataStore, Table};
use crate::error::{ActivityError, Result};
use crate::types::{ActivityType, Attributes, Event, EventStatus, Outcome, Row, Selection, Sport};

use super::{ordinal_attr, required_text};

/// A named activity of a known tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRef {
    pub kind: ActivityType,
    pub name: String,
}

impl ActivityRef {
    pub fn new(kind: ActivityType, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for ActivityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// What a disable touched beyond its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisableReport {
    pub target: ActivityRef,
    /// Ancestors closed because their last active child went inactive,
    /// nearest first.
    pub cascaded_up: Vec<ActivityRef>,
}

/// Rows removed by a delete, beyond the target itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub events: usize,
    pub selections: usize,
}

/// Soft-deactivate the activity named in `attrs`.
///
/// Selections take an optional `outcome` (default VOID) and events an
/// optional `status` (default CANCELLED).
pub fn disable<S: DataStore>(
    store: &S,
    kind: ActivityType,
    attrs: &Attributes,
) -> Result<DisableReport> {
    let name = required_text(attrs, "name")?;
    let mut report = DisableReport {
        target: ActivityRef::new(kind, &name),
        cascaded_up: Vec::new(),
    };

    match kind {
        ActivityType::Selection => {
            let outcome = match ordinal_attr(attrs, "outcome")? {
                Some(n) => Outcome::try_from(n)?,
                None => Outcome::Void,
            };
            disable_selection(store, &name, outcome, &mut report)?;
        }
        ActivityType::Event => {
            let status = match ordinal_attr(attrs, "status")? {
                Some(n) => EventStatus::try_from(n)?,
                None => EventStatus::Cancelled,
            };
            disable_event(store, &name, status, &mut report)?;
        }
        ActivityType::Sport => disable_sport(store, &name, false)?,
    }

    Ok(report)
}

fn disable_selection<S: DataStore>(
    store: &S,
    name: &str,
    outcome: Outcome,
    report: &mut DisableReport,
) -> Result<()> {
    let selection = fetch(store, Table::Selections, name, Selection::from_row)?;
    store.update_by_key(
        Table::Selections,
        &inactive_row("outcome", outcome.ordinal()),
        "name",
        name,
    )?;
    debug!(selection = name, outcome = %outcome, "selection disabled");
    if !selection.active {
        return Ok(());
    }

    let siblings = selections_for_event(store, &selection.event)?;
    if !siblings.iter().any(|s| s.active) {
        debug!(event = %selection.event, "no active selections left, closing event");
        report
            .cascaded_up
            .push(ActivityRef::new(ActivityType::Event, &selection.event));
        disable_event(store, &selection.event, EventStatus::Cancelled, report)?;
    }
    Ok(())
}

fn disable_event<S: DataStore>(
    store: &S,
    name: &str,
    status: EventStatus,
    report: &mut DisableReport,
) -> Result<()> {
    let event = fetch(store, Table::Events, name, Event::from_row)?;

    // Runs even when reached from a selection; already-inactive rows are
    // left untouched so this is a no-op there.
    disable_selections_for_event(store, name)?;
    store.update_by_key(
        Table::Events,
        &inactive_row("status", status.ordinal()),
        "name",
        name,
    )?;
    debug!(event = name, status = %status, "event disabled");
    if !event.active {
        return Ok(());
    }

    let siblings = events_for_sport(store, &event.sport)?;
    if !siblings.iter().any(|e| e.active) {
        debug!(sport = %event.sport, "no active events left, closing sport");
        report
            .cascaded_up
            .push(ActivityRef::new(ActivityType::Sport, &event.sport));
        disable_sport(store, &event.sport, true)?;
    }
    Ok(())
}

/// `event_triggered` is set when reached by cascade-up, in which case the
/// sport's events were already dealt with by the event that got us here.
fn disable_sport<S: DataStore>(store: &S, name: &str, event_triggered: bool) -> Result<()> {
    fetch(store, Table::Sports, name, Sport::from_row)?;
    if !event_triggered {
        disable_events_for_sport(store, name)?;
    }

    let mut values = Row::new();
    values.insert("active".into(), Value::Bool(false));
    store.update_by_key(Table::Sports, &values, "name", name)?;
    debug!(sport = name, event_triggered, "sport disabled");
    Ok(())
}

fn disable_events_for_sport<S: DataStore>(store: &S, sport: &str) -> Result<()> {
    for event in events_for_sport(store, sport)? {
        disable_selections_for_event(store, &event.name)?;
        if event.active {
            store.update_by_key(
                Table::Events,
                &inactive_row("status", EventStatus::Cancelled.ordinal()),
                "name",
                &event.name,
            )?;
        }
    }
    Ok(())
}

fn disable_selections_for_event<S: DataStore>(store: &S, event: &str) -> Result<()> {
    let values = inactive_row("outcome", Outcome::Void.ordinal());
    for selection in selections_for_event(store, event)? {
        if selection.active {
            store.update_by_key(Table::Selections, &values, "name", &selection.name)?;
        }
    }
    Ok(())
}

/// Permanently remove the activity named in `attrs` and everything below it.
/// The active flag plays no part.
pub fn delete<S: DataStore>(
    store: &S,
    kind: ActivityType,
    attrs: &Attributes,
) -> Result<DeleteReport> {
    let name = required_text(attrs, "name")?;
    let mut report = DeleteReport::default();

    match kind {
        ActivityType::Selection => {
            fetch(store, Table::Selections, &name, Selection::from_row)?;
            store.delete_by_key(Table::Selections, "name", &name)?;
        }
        ActivityType::Event => {
            fetch(store, Table::Events, &name, Event::from_row)?;
            report.selections += store.delete_by_key(Table::Selections, "event", &name)?;
            store.delete_by_key(Table::Events, "name", &name)?;
        }
        ActivityType::Sport => {
            fetch(store, Table::Sports, &name, Sport::from_row)?;
            for event in events_for_sport(store, &name)? {
                report.selections +=
                    store.delete_by_key(Table::Selections, "event", &event.name)?;
                report.events += store.delete_by_key(Table::Events, "name", &event.name)?;
            }
            store.delete_by_key(Table::Sports, "name", &name)?;
        }
    }

    debug!(kind = %kind, name = %name, events = report.events, selections = report.selections, "deleted");
    Ok(report)
}

/// Move an event to STARTED (and in-play). No cascade.
pub fn start<S: DataStore>(store: &S, name: &str) -> Result<()> {
    let event = fetch(store, Table::Events, name, Event::from_row)?;
    if !event.active {
        return Err(ActivityError::validation(format!(
            "event '{}' is inactive and cannot be started",
            name
        )));
    }

    let mut values = Row::new();
    values.insert("status".into(), Value::from(EventStatus::Started.ordinal()));
    values.insert("type".into(), Value::from(crate::types::EventType::Inplay.ordinal()));
    store.update_by_key(Table::Events, &values, "name", name)?;
    Ok(())
}

pub(crate) fn fetch<S, T>(
    store: &S,
    table: Table,
    name: &str,
    decode: fn(&Row) -> Result<T>,
) -> Result<T>
where
    S: DataStore,
{
    match store.select_by_key(table, "name", name)?.first() {
        Some(row) => decode(row),
        None => Err(ActivityError::NotFound {
            table: table.name(),
            name: name.to_string(),
        }),
    }
}

fn inactive_row(marker: &str, ordinal: i64) -> Row {
    let mut values = Row::new();
    values.insert("active".into(), Value::Bool(false));
    values.insert(marker.into(), Value::from(ordinal));
    values
}
