//! Typed read access to the catalogue.

use crate::data::{DataStore, Table};
use crate::error::Result;
use crate::types::{Event, Row, Selection, Sport};

fn decode_all<T>(rows: Vec<Row>, decode: fn(&Row) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(decode).collect()
}

pub fn list_sports<S: DataStore>(store: &S) -> Result<Vec<Sport>> {
    decode_all(store.select_all(Table::Sports)?, Sport::from_row)
}

pub fn find_sport<S: DataStore>(store: &S, name: &str) -> Result<Option<Sport>> {
    let rows = store.select_by_key(Table::Sports, "name", name)?;
    rows.first().map(Sport::from_row).transpose()
}

pub fn events_for_sport<S: DataStore>(store: &S, sport: &str) -> Result<Vec<Event>> {
    decode_all(store.select_by_key(Table::Events, "sport", sport)?, Event::from_row)
}

pub fn list_events<S: DataStore>(store: &S) -> Result<Vec<Event>> {
    decode_all(store.select_all(Table::Events)?, Event::from_row)
}

pub fn find_event<S: DataStore>(store: &S, name: &str) -> Result<Option<Event>> {
    let rows = store.select_by_key(Table::Events, "name", name)?;
    rows.first().map(Event::from_row).transpose()
}

pub fn selections_for_event<S: DataStore>(store: &S, event: &str) -> Result<Vec<Selection>> {
    decode_all(
        store.select_by_key(Table::Selections, "event", event)?,
        Selection::from_row,
    )
}

pub fn list_selections<S: DataStore>(store: &S) -> Result<Vec<Selection>> {
    decode_all(store.select_all(Table::Selections)?, Selection::from_row)
}

pub fn find_selection<S: DataStore>(store: &S, name: &str) -> Result<Option<Selection>> {
    let rows = store.select_by_key(Table::Selections, "name", name)?;
    rows.first().map(Selection::from_row).transpose()
}
