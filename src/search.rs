//! Cross-tier search built from a fixed filter catalogue.
//!
//! The free-text expression is a raw SQL predicate over the aliases of
//! [`schema::SEARCH_BASE`]. It is screened by a keyword denylist only; the
//! store additionally refuses any statement that is not read-only.

use tracing::debug;

use crate::data::schema;
use crate::error::{ActivityError, Result};

/// Substrings that reject a search outright, matched case-insensitively.
pub const RESTRICTED_KEYWORDS: &[&str] = &["drop", "delete"];

/// Named parameter carrying the regex of [`SearchFilter::NameMatches`].
pub const PATTERN_PARAM: &str = ":pattern";

/// The predicates a caller can request by ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFilter {
    /// Sport, event or selection name matches the supplied regex.
    NameMatches = 0,
    /// Event scheduled to start within the last 24 hours.
    StartedLastDay = 1,
    /// Selection settled as a win.
    Won = 2,
}

impl SearchFilter {
    pub fn predicate(&self) -> &'static str {
        match self {
            SearchFilter::NameMatches => {
                "(t.name REGEXP :pattern OR t1.name REGEXP :pattern OR t2.name REGEXP :pattern)"
            }
            SearchFilter::StartedLastDay => {
                "(datetime(t1.scheduled_start) >= datetime('now', '-24 hours') \
                 AND datetime(t1.scheduled_start) <= datetime('now'))"
            }
            SearchFilter::Won => "t2.outcome = 3",
        }
    }
}

impl TryFrom<i64> for SearchFilter {
    type Error = ActivityError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(SearchFilter::NameMatches),
            1 => Ok(SearchFilter::StartedLastDay),
            2 => Ok(SearchFilter::Won),
            other => Err(ActivityError::validation(format!(
                "unknown search filter {}",
                other
            ))),
        }
    }
}

/// A composed read-only query and its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub sql: String,
    pub params: Vec<(&'static str, String)>,
}

/// Build the search query: the expression first (if any), then each filter
/// in the order requested, all ANDed together.
pub fn compose(expression: &str, filters: &[i64], pattern: &str) -> Result<QueryPlan> {
    check_restricted(expression)?;
    check_restricted(pattern)?;

    let mut predicates = Vec::with_capacity(filters.len() + 1);
    let mut params = Vec::new();

    let expression = expression.trim();
    if !expression.is_empty() {
        predicates.push(format!("({})", expression));
    }

    for id in filters {
        let filter = SearchFilter::try_from(*id)?;
        if filter == SearchFilter::NameMatches && params.is_empty() {
            params.push((PATTERN_PARAM, pattern.to_string()));
        }
        predicates.push(filter.predicate().to_string());
    }

    if predicates.is_empty() {
        return Err(ActivityError::NoCriteria);
    }

    let sql = format!("{} WHERE {}", schema::SEARCH_BASE, predicates.join(" AND "));
    debug!(sql = %sql, "composed search");
    Ok(QueryPlan { sql, params })
}

fn check_restricted(input: &str) -> Result<()> {
    let lowered = input.to_lowercase();
    match RESTRICTED_KEYWORDS.iter().find(|k| lowered.contains(*k)) {
        Some(keyword) => Err(ActivityError::RestrictedOperation(format!(
            "restricted keyword '{}' found, search not permitted",
            keyword
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataStore, SqliteStore, Table};
    use chrono::{Duration, SecondsFormat, Utc};
    use serde_json::{json, Value};

    #[test]
    fn test_restricted_keywords() {
        for (expr, pattern) in [("drop table", ""), ("", "DeLeTe"), ("1=1; DROP x", "^N")] {
            assert!(matches!(
                compose(expr, &[0], pattern).unwrap_err(),
                ActivityError::RestrictedOperation(_)
            ));
        }
        // Checked before the empty-criteria rule.
        assert!(matches!(
            compose("drop table", &[], "").unwrap_err(),
            ActivityError::RestrictedOperation(_)
        ));
    }

    #[test]
    fn test_no_criteria() {
        assert!(matches!(compose("", &[], "").unwrap_err(), ActivityError::NoCriteria));
        assert!(matches!(compose("   ", &[], "^N").unwrap_err(), ActivityError::NoCriteria));
    }

    #[test]
    fn test_filters_without_pattern() {
        let plan = compose("", &[1, 2], "^N").unwrap();
        assert!(plan.params.is_empty());
        assert_eq!(
            plan.sql,
            format!(
                "{} WHERE {} AND {}",
                schema::SEARCH_BASE,
                SearchFilter::StartedLastDay.predicate(),
                SearchFilter::Won.predicate()
            )
        );
    }

    #[test]
    fn test_pattern_is_bound() {
        let plan = compose("", &[0], "^N").unwrap();
        assert_eq!(plan.params, vec![(PATTERN_PARAM, "^N".to_string())]);
        assert!(plan.sql.contains("t2.name REGEXP :pattern"));
        assert!(!plan.sql.contains("^N"));
    }

    #[test]
    fn test_expression_comes_first() {
        let plan = compose("t.active = 1 OR t.active = 0", &[2, 0], "x").unwrap();
        let where_clause = plan.sql.split(" WHERE ").nth(1).unwrap();
        assert!(where_clause.starts_with("(t.active = 1 OR t.active = 0) AND t2.outcome = 3 AND (t.name"));
        assert_eq!(plan.params.len(), 1);
    }

    #[test]
    fn test_unknown_filter() {
        assert!(matches!(
            compose("", &[5], "").unwrap_err(),
            ActivityError::Validation(_)
        ));
    }

    fn seeded() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        store.init().unwrap();
        let now = Utc::now();
        let recent = (now - Duration::hours(2)).to_rfc3339_opts(SecondsFormat::Secs, false);
        let old = (now - Duration::days(3)).to_rfc3339_opts(SecondsFormat::Secs, false);

        store
            .insert(
                Table::Sports,
                &["name", "active"],
                &[vec![json!("Football"), json!(1)], vec![json!("Netball"), json!(1)]],
            )
            .unwrap();
        store
            .insert(
                Table::Events,
                &["name", "active", "scheduled_start", "sport"],
                &[
                    vec![json!("Cup"), json!(1), json!(recent), json!("Football")],
                    vec![json!("League"), json!(1), json!(old), json!("Netball")],
                ],
            )
            .unwrap();
        store
            .insert(
                Table::Selections,
                &["name", "active", "outcome", "event"],
                &[
                    vec![json!("Norway Win"), json!(1), json!(3), json!("Cup")],
                    vec![json!("Spain Win"), json!(1), json!(0), json!("Cup")],
                    vec![json!("Away"), json!(1), json!(3), json!("League")],
                ],
            )
            .unwrap();
        store
    }

    fn run(store: &SqliteStore, plan: &QueryPlan) -> Vec<String> {
        let params: Vec<(&str, Value)> = plan
            .params
            .iter()
            .map(|(k, v)| (*k, Value::String(v.clone())))
            .collect();
        let mut names: Vec<String> = store
            .raw_query(&plan.sql, &params)
            .unwrap()
            .iter()
            .map(|r| r["selection"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_filters_against_store() {
        let store = seeded();

        // Netball matches ^N through the sport name, Norway through the selection.
        assert_eq!(run(&store, &compose("", &[0], "^N").unwrap()), vec!["Away", "Norway Win"]);
        assert_eq!(
            run(&store, &compose("", &[1], "").unwrap()),
            vec!["Norway Win", "Spain Win"]
        );
        assert_eq!(run(&store, &compose("", &[2], "").unwrap()), vec!["Away", "Norway Win"]);
        assert_eq!(run(&store, &compose("", &[1, 2], "").unwrap()), vec!["Norway Win"]);
        assert_eq!(
            run(&store, &compose("t1.name = 'League'", &[2], "").unwrap()),
            vec!["Away"]
        );
    }

    #[test]
    fn test_pattern_cannot_inject() {
        let store = seeded();
        let plan = compose("", &[0], "x' OR '1'='1").unwrap();
        assert!(run(&store, &plan).is_empty());
    }
}
