//! Lifecycle operations over the sport → event → selection hierarchy.

pub mod build;
pub mod cascade;
pub mod resolve;

pub use build::{build, slugify};
pub use cascade::{ActivityRef, DeleteReport, DisableReport};
pub use resolve::resolve;

use serde_json::Value;
use tracing::{info, warn};

use crate::data::{DataStore, Table};
use crate::error::{ActivityError, Result};
use crate::search;
use crate::types::{ActivityType, Attributes, Event, Row, Sport};

/// Entry point for the catalogue operations. Every mutating call runs as a
/// single unit of work on the store.
pub struct ActivityManager<'a, S: DataStore> {
    store: &'a S,
}

impl<'a, S: DataStore> ActivityManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Resolve the tier, derive defaults and insert the new row.
    pub fn create_activity(&self, attrs: &Attributes) -> Result<ActivityRef> {
        let kind = resolve(attrs);
        let row = build(kind, attrs)?;
        let name = required_text(attrs, "name")?;

        self.store.in_transaction(|| {
            match kind {
                ActivityType::Event => {
                    let sport = required_text(attrs, "sport")?;
                    cascade::fetch(self.store, Table::Sports, &sport, Sport::from_row)?;
                }
                ActivityType::Selection => {
                    let event = required_text(attrs, "event")?;
                    cascade::fetch(self.store, Table::Events, &event, Event::from_row)?;
                }
                ActivityType::Sport => {}
            }

            let columns: Vec<&str> = row.keys().map(String::as_str).collect();
            let values: Vec<Value> = row.values().cloned().collect();
            self.store
                .insert(Table::for_type(kind), &columns, &[values])?;
            Ok(())
        })?;

        info!(kind = %kind, name = %name, "activity created");
        Ok(ActivityRef::new(kind, &name))
    }

    /// Resolve the tier and soft-deactivate, cascading up and down.
    pub fn disable_activity(&self, attrs: &Attributes) -> Result<DisableReport> {
        let kind = resolve(attrs);
        let report = self
            .store
            .in_transaction(|| cascade::disable(self.store, kind, attrs))?;

        info!(
            kind = %kind,
            name = %report.target.name,
            cascaded_up = report.cascaded_up.len(),
            "activity disabled"
        );
        Ok(report)
    }

    /// Resolve the tier and delete it along with all descendants.
    pub fn delete_activity(&self, attrs: &Attributes) -> Result<DeleteReport> {
        let kind = resolve(attrs);
        let report = self
            .store
            .in_transaction(|| cascade::delete(self.store, kind, attrs))?;

        info!(
            kind = %kind,
            events = report.events,
            selections = report.selections,
            "activity deleted"
        );
        Ok(report)
    }

    pub fn start_event(&self, name: &str) -> Result<ActivityRef> {
        self.store.in_transaction(|| cascade::start(self.store, name))?;
        info!(name, "event started");
        Ok(ActivityRef::new(ActivityType::Event, name))
    }

    /// Compose the search and run it read-only.
    pub fn search_activities(
        &self,
        expression: &str,
        filters: &[i64],
        pattern: &str,
    ) -> Result<Vec<Row>> {
        let plan = search::compose(expression, filters, pattern).inspect_err(|e| {
            if matches!(e, ActivityError::RestrictedOperation(_)) {
                warn!(expression, pattern, "search rejected");
            }
        })?;
        let params: Vec<(&str, Value)> = plan
            .params
            .iter()
            .map(|(k, v)| (*k, Value::String(v.clone())))
            .collect();
        let rows = self.store.raw_query(&plan.sql, &params)?;
        info!(filters = ?filters, rows = rows.len(), "search complete");
        Ok(rows)
    }
}

/// A string-ish attribute. Numbers are accepted and rendered as text; blank
/// strings count as absent.
pub(crate) fn text_attr(attrs: &Attributes, key: &str) -> Result<Option<String>> {
    match attrs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ActivityError::validation(format!(
            "attribute '{}' must be a string, got {}",
            key, other
        ))),
    }
}

pub(crate) fn required_text(attrs: &Attributes, key: &str) -> Result<String> {
    text_attr(attrs, key)?.ok_or_else(|| {
        ActivityError::validation(format!("missing required attribute '{}'", key))
    })
}

/// An enum ordinal given either as a number or a numeric string.
pub(crate) fn ordinal_attr(attrs: &Attributes, key: &str) -> Result<Option<i64>> {
    let invalid = || ActivityError::validation(format!("attribute '{}' must be an integer", key));
    match attrs.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}
