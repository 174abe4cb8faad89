use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSql, Value as SqlValue, ValueRef};
use rusqlite::{Connection, Statement};
use serde_json::Value;
use tracing::debug;

use crate::error::{ActivityError, Result};
use crate::types::{ActivityType, Row};

use super::schema;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three catalogue tables, each keyed by `name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Sports,
    Events,
    Selections,
}

impl Table {
    pub fn for_type(kind: ActivityType) -> Self {
        match kind {
            ActivityType::Sport => Table::Sports,
            ActivityType::Event => Table::Events,
            ActivityType::Selection => Table::Selections,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::Sports => "sports",
            Table::Events => "events",
            Table::Selections => "selections",
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Sports => &["name", "slug", "active"],
            Table::Events => &[
                "name",
                "slug",
                "active",
                "type",
                "status",
                "scheduled_start",
                "actual_start",
                "sport",
            ],
            Table::Selections => &["name", "active", "price", "outcome", "event"],
        }
    }

    /// Resolve a caller-supplied column name to the table's own spelling.
    pub fn column(&self, name: &str) -> Result<&'static str> {
        self.columns()
            .iter()
            .copied()
            .find(|c| *c == name)
            .ok_or_else(|| ActivityError::UnknownColumn {
                table: self.name(),
                column: name.to_string(),
            })
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Abstraction over catalogue row storage.
///
/// Keys and column names are checked against [`Table::columns`]; values are
/// always bound, never spliced into SQL.
pub trait DataStore {
    fn init(&self) -> Result<()>;

    /// Drop every table and recreate an empty schema.
    fn reset(&self) -> Result<()>;

    fn select_all(&self, table: Table) -> Result<Vec<Row>>;
    fn select_by_key(&self, table: Table, key: &str, value: &str) -> Result<Vec<Row>>;
    fn insert(&self, table: Table, columns: &[&str], rows: &[Vec<Value>]) -> Result<usize>;
    fn update_by_key(&self, table: Table, values: &Row, key: &str, value: &str) -> Result<usize>;
    fn delete_by_key(&self, table: Table, key: &str, value: &str) -> Result<usize>;

    /// Run a read-only statement with named parameters and return its rows.
    fn raw_query(&self, sql: &str, params: &[(&str, Value)]) -> Result<Vec<Row>>;

    /// Run one or more statements for their side effects.
    fn execute_raw(&self, sql: &str) -> Result<()>;

    /// Run `f` as one unit of work: committed if it returns `Ok`, rolled
    /// back otherwise. Calls made while a unit is already open join it.
    fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;
}

/// Database path used when none is given: `$SPORTSBOOK_DB`, else
/// `$HOME/.local/share/sportsbook/catalogue.db`.
pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("SPORTSBOOK_DB") {
        if !p.is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/share/sportsbook/catalogue.db"))
}

/// SQLite-backed implementation.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        Ok(Self { conn })
    }

    /// Open a file-backed database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::new(conn)
    }

    /// Open an in-memory database (useful for tests).
    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }
}

impl DataStore for SqliteStore {
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(schema::CREATE_SPORTS)?;
        self.conn.execute_batch(schema::CREATE_EVENTS)?;
        self.conn.execute_batch(schema::CREATE_SELECTIONS)?;
        self.conn.execute_batch(schema::CREATE_INDEXES)?;
        self.conn.execute_batch(schema::CREATE_TRIGGERS)?;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.conn.execute_batch(schema::DROP_ALL)?;
        self.init()
    }

    fn select_all(&self, table: Table) -> Result<Vec<Row>> {
        let sql = format!("SELECT * FROM {}", table.name());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = read_rows(&mut stmt, [])?;
        debug!(table = table.name(), rows = rows.len(), "select all");
        Ok(rows)
    }

    fn select_by_key(&self, table: Table, key: &str, value: &str) -> Result<Vec<Row>> {
        let key = table.column(key)?;
        let sql = format!("SELECT * FROM {} WHERE {} = ?1", table.name(), key);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = read_rows(&mut stmt, [value])?;
        debug!(table = table.name(), key, value, rows = rows.len(), "select by key");
        Ok(rows)
    }

    fn insert(&self, table: Table, columns: &[&str], rows: &[Vec<Value>]) -> Result<usize> {
        if columns.is_empty() {
            return Err(ActivityError::validation("insert needs at least one column"));
        }
        let cols = columns
            .iter()
            .map(|c| table.column(c))
            .collect::<Result<Vec<_>>>()?;
        let placeholders: String = (1..=cols.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.name(),
            cols.join(", "),
            placeholders
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut inserted = 0;
        for row in rows {
            if row.len() != cols.len() {
                return Err(ActivityError::validation(format!(
                    "insert into {} expects {} values, got {}",
                    table,
                    cols.len(),
                    row.len()
                )));
            }
            let values: Vec<SqlValue> = row.iter().map(sql_value).collect();
            inserted += stmt.execute(rusqlite::params_from_iter(values.iter()))?;
        }
        debug!(table = table.name(), rows = inserted, "insert");
        Ok(inserted)
    }

    fn update_by_key(&self, table: Table, values: &Row, key: &str, value: &str) -> Result<usize> {
        if values.is_empty() {
            return Err(ActivityError::validation(format!(
                "update of {} has no columns to set",
                table
            )));
        }
        let key = table.column(key)?;

        let mut assignments = Vec::with_capacity(values.len());
        let mut bound = Vec::with_capacity(values.len() + 1);
        for (i, (column, v)) in values.iter().enumerate() {
            assignments.push(format!("{} = ?{}", table.column(column)?, i + 1));
            bound.push(sql_value(v));
        }
        bound.push(SqlValue::Text(value.to_string()));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table.name(),
            assignments.join(", "),
            key,
            bound.len()
        );
        let changed = self
            .conn
            .execute(&sql, rusqlite::params_from_iter(bound.iter()))?;
        debug!(table = table.name(), key, value, rows = changed, "update by key");
        Ok(changed)
    }

    fn delete_by_key(&self, table: Table, key: &str, value: &str) -> Result<usize> {
        let key = table.column(key)?;
        let sql = format!("DELETE FROM {} WHERE {} = ?1", table.name(), key);
        let removed = self.conn.execute(&sql, [value])?;
        debug!(table = table.name(), key, value, rows = removed, "delete by key");
        Ok(removed)
    }

    fn raw_query(&self, sql: &str, params: &[(&str, Value)]) -> Result<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(ActivityError::RestrictedOperation(
                "only read-only statements may be queried".to_string(),
            ));
        }
        let bound: Vec<(&str, SqlValue)> = params.iter().map(|(k, v)| (*k, sql_value(v))).collect();
        let named: Vec<(&str, &dyn ToSql)> =
            bound.iter().map(|(k, v)| (*k, v as &dyn ToSql)).collect();
        let rows = read_rows(&mut stmt, named.as_slice())?;
        debug!(rows = rows.len(), "raw query");
        Ok(rows)
    }

    fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if !self.conn.is_autocommit() {
            return f();
        }
        // Dropping the transaction without commit rolls it back.
        let tx = self.conn.unchecked_transaction()?;
        let out = f()?;
        tx.commit()?;
        Ok(out)
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let re: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = match ctx.get_raw(1) {
                ValueRef::Null => return Ok(false),
                v => v
                    .as_str()
                    .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?,
            };
            Ok(re.is_match(text))
        },
    )?;
    Ok(())
}

fn read_rows<P: rusqlite::Params>(stmt: &mut Statement<'_>, params: P) -> Result<Vec<Row>> {
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt.query_map(params, |row| {
        let mut out = Row::new();
        for (i, name) in names.iter().enumerate() {
            out.insert(name.clone(), json_value(row.get_ref(i)?));
        }
        Ok(out)
    })?;

    let mut result = Vec::new();
    for r in rows {
        result.push(r?);
    }
    Ok(result)
}

fn sql_value(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn json_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        store
    }

    fn seed_sport(store: &SqliteStore, name: &str) {
        store
            .insert(
                Table::Sports,
                &["name", "slug", "active"],
                &[vec![json!(name), json!(name.to_lowercase()), json!(true)]],
            )
            .unwrap();
    }

    fn seed_event(store: &SqliteStore, name: &str, sport: &str) {
        store
            .insert(
                Table::Events,
                &["name", "slug", "active", "sport"],
                &[vec![json!(name), json!(name), json!(1), json!(sport)]],
            )
            .unwrap();
    }

    #[test]
    fn test_init_is_idempotent() {
        let store = setup();
        store.init().unwrap();
        assert!(store.select_all(Table::Sports).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_select() {
        let store = setup();
        seed_sport(&store, "Football");
        seed_sport(&store, "Tennis");

        let all = store.select_all(Table::Sports).unwrap();
        assert_eq!(all.len(), 2);

        let one = store.select_by_key(Table::Sports, "name", "Tennis").unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0]["slug"], "tennis");
        // Booleans are stored as integers.
        assert_eq!(one[0]["active"], 1);
    }

    #[test]
    fn test_insert_multiple_rows() {
        let store = setup();
        let n = store
            .insert(
                Table::Sports,
                &["name", "active"],
                &[vec![json!("A"), json!(1)], vec![json!("B"), json!(0)]],
            )
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_insert_rejects_width_mismatch() {
        let store = setup();
        let err = store
            .insert(Table::Sports, &["name", "active"], &[vec![json!("A")]])
            .unwrap_err();
        assert!(matches!(err, ActivityError::Validation(_)));
    }

    #[test]
    fn test_duplicate_name_is_storage_error() {
        let store = setup();
        seed_sport(&store, "Football");
        let err = store
            .insert(
                Table::Sports,
                &["name", "active"],
                &[vec![json!("Football"), json!(1)]],
            )
            .unwrap_err();
        assert!(matches!(err, ActivityError::Storage(_)));
    }

    #[test]
    fn test_unknown_column_rejected() {
        let store = setup();
        let err = store
            .select_by_key(Table::Sports, "name; DROP TABLE sports", "x")
            .unwrap_err();
        assert!(matches!(err, ActivityError::UnknownColumn { table: "sports", .. }));

        let mut values = Row::new();
        values.insert("price".to_string(), json!("1.00"));
        let err = store
            .update_by_key(Table::Sports, &values, "name", "x")
            .unwrap_err();
        assert!(matches!(err, ActivityError::UnknownColumn { .. }));
    }

    #[test]
    fn test_update_and_delete_by_key() {
        let store = setup();
        seed_sport(&store, "Football");

        let mut values = Row::new();
        values.insert("active".to_string(), json!(false));
        let changed = store
            .update_by_key(Table::Sports, &values, "name", "Football")
            .unwrap();
        assert_eq!(changed, 1);
        let row = &store.select_by_key(Table::Sports, "name", "Football").unwrap()[0];
        assert_eq!(row["active"], 0);

        assert_eq!(store.delete_by_key(Table::Sports, "name", "Football").unwrap(), 1);
        assert_eq!(store.delete_by_key(Table::Sports, "name", "Football").unwrap(), 0);
        assert!(store.select_all(Table::Sports).unwrap().is_empty());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = setup();
        let err = store
            .insert(
                Table::Events,
                &["name", "active", "sport"],
                &[vec![json!("Orphan"), json!(1), json!("Nowhere")]],
            )
            .unwrap_err();
        assert!(matches!(err, ActivityError::Storage(_)));
    }

    #[test]
    fn test_status_trigger_starts_event() {
        let store = setup();
        seed_sport(&store, "Football");
        seed_event(&store, "Final", "Football");

        let before = &store.select_by_key(Table::Events, "name", "Final").unwrap()[0];
        assert_eq!(before["type"], 0);
        assert!(before["actual_start"].is_null());

        let mut values = Row::new();
        values.insert("status".to_string(), json!(1));
        store
            .update_by_key(Table::Events, &values, "name", "Final")
            .unwrap();

        let after = &store.select_by_key(Table::Events, "name", "Final").unwrap()[0];
        assert_eq!(after["status"], 1);
        assert_eq!(after["type"], 1);
        let stamped = after["actual_start"].as_str().unwrap();
        assert!(stamped.ends_with("+00:00"));
    }

    #[test]
    fn test_regexp_function() {
        let store = setup();
        seed_sport(&store, "Football");
        seed_sport(&store, "Netball");

        let rows = store
            .raw_query(
                "SELECT name FROM sports WHERE name REGEXP :pattern",
                &[(":pattern", json!("^N"))],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Netball");
    }

    #[test]
    fn test_raw_query_rejects_writes() {
        let store = setup();
        seed_sport(&store, "Football");
        let err = store.raw_query("DELETE FROM sports", &[]).unwrap_err();
        assert!(matches!(err, ActivityError::RestrictedOperation(_)));
        assert_eq!(store.select_all(Table::Sports).unwrap().len(), 1);
    }

    #[test]
    fn test_execute_raw_runs_statements() {
        let store = setup();
        seed_sport(&store, "Football");
        seed_sport(&store, "Tennis");
        store
            .execute_raw(
                "UPDATE sports SET active = 0 WHERE name = 'Tennis'; \
                 DELETE FROM sports WHERE name = 'Football';",
            )
            .unwrap();

        let rows = store.select_all(Table::Sports).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Tennis");
        assert_eq!(rows[0]["active"], 0);

        assert!(matches!(
            store.execute_raw("UPDATE nowhere SET x = 1"),
            Err(ActivityError::Storage(_))
        ));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = setup();
        let result: Result<()> = store.in_transaction(|| {
            seed_sport(&store, "Football");
            Err(ActivityError::validation("boom"))
        });
        assert!(result.is_err());
        assert!(store.select_all(Table::Sports).unwrap().is_empty());
    }

    #[test]
    fn test_transaction_commits_and_nests() {
        let store = setup();
        store
            .in_transaction(|| {
                seed_sport(&store, "Football");
                store.in_transaction(|| {
                    seed_sport(&store, "Tennis");
                    Ok(())
                })
            })
            .unwrap();
        assert_eq!(store.select_all(Table::Sports).unwrap().len(), 2);
    }

    #[test]
    fn test_reset_clears_tables() {
        let store = setup();
        seed_sport(&store, "Football");
        store.reset().unwrap();
        assert!(store.select_all(Table::Sports).unwrap().is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogue.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.init().unwrap();
            seed_sport(&store, "Football");
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.select_all(Table::Sports).unwrap().len(), 1);
    }
}
