use chrono::{SecondsFormat, Utc};
use serde_json::json;
use tracing::info;

use crate::error::Result;

use super::schema::{SEED_EVENT, SEED_SELECTION, SEED_SPORT};
use super::store::{DataStore, Table};

/// Insert the demo hierarchy: one sport, one event scheduled now, one
/// selection.
pub fn seed_demo<S: DataStore>(store: &S) -> Result<()> {
    let scheduled_start = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false);

    store.in_transaction(|| {
        store.insert(
            Table::Sports,
            &["name", "slug", "active"],
            &[vec![json!(SEED_SPORT.0), json!(SEED_SPORT.1), json!(true)]],
        )?;
        store.insert(
            Table::Events,
            &["name", "slug", "active", "scheduled_start", "sport"],
            &[vec![
                json!(SEED_EVENT.0),
                json!(SEED_EVENT.1),
                json!(true),
                json!(scheduled_start),
                json!(SEED_SPORT.0),
            ]],
        )?;
        store.insert(
            Table::Selections,
            &["name", "active", "price", "event"],
            &[vec![
                json!(SEED_SELECTION.0),
                json!(true),
                json!(SEED_SELECTION.1),
                json!(SEED_EVENT.0),
            ]],
        )?;
        Ok(())
    })?;

    info!(sport = SEED_SPORT.0, event = SEED_EVENT.0, "seeded demo catalogue");
    Ok(())
}
