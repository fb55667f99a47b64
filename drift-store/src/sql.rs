//! Dynamic SQL construction
//!
//! Folds ordered sets of optional assignment and predicate descriptors into
//! parameterized statements plus their bind list. Placeholder numbering
//! follows descriptor order, so the rendered text and the bound arguments
//! always line up.

use chrono::{DateTime, Utc};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;

/// A value bound to one `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i32),
    NullableInt(Option<i32>),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

/// One `column = value` pair for INSERT column lists and UPDATE SET lists.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub column: &'static str,
    pub value: SqlValue,
}

impl Assignment {
    pub fn new(column: &'static str, value: SqlValue) -> Assignment {
        Assignment { column, value }
    }
}

/// One `column = value` equality predicate for WHERE clauses.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub column: &'static str,
    pub value: SqlValue,
}

impl Predicate {
    pub fn new(column: &'static str, value: SqlValue) -> Predicate {
        Predicate { column, value }
    }
}

/// `INSERT INTO <table> (..) VALUES ($1..) RETURNING <columns>`
pub fn build_insert(
    table: &str,
    returning: &[&str],
    fields: &[Assignment],
) -> (String, Vec<SqlValue>) {
    let columns: Vec<&str> = fields.iter().map(|f| f.column).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING {}",
        columns.join(", "),
        placeholders.join(", "),
        returning.join(", "),
    );
    (sql, fields.iter().map(|f| f.value.clone()).collect())
}

/// `SELECT <columns> FROM <table> WHERE 1 = 1 AND ..` with the predicates
/// conjoined in order; an empty filter matches every row.
pub fn build_select(
    table: &str,
    columns: &[&str],
    filter: &[Predicate],
    order_by: Option<&str>,
) -> (String, Vec<SqlValue>) {
    let mut clauses = vec!["1 = 1".to_string()];
    let mut params = Vec::with_capacity(filter.len());
    for predicate in filter {
        params.push(predicate.value.clone());
        clauses.push(format!("{} = ${}", predicate.column, params.len()));
    }
    let mut sql = format!(
        "SELECT {} FROM {table} WHERE {}",
        columns.join(", "),
        clauses.join(" AND "),
    );
    if let Some(order) = order_by {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    (sql, params)
}

/// `UPDATE <table> SET .. WHERE id = $n RETURNING <columns>`; the target ID
/// is always the last bound parameter.
pub fn build_update(
    table: &str,
    returning: &[&str],
    assignments: &[Assignment],
    id: i32,
) -> (String, Vec<SqlValue>) {
    let mut set = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len() + 1);
    for assignment in assignments {
        params.push(assignment.value.clone());
        set.push(format!("{} = ${}", assignment.column, params.len()));
    }
    params.push(SqlValue::Int(id));
    let sql = format!(
        "UPDATE {table} SET {} WHERE id = ${} RETURNING {}",
        set.join(", "),
        params.len(),
        returning.join(", "),
    );
    (sql, params)
}

/// Binds the ordered parameter list onto a typed query.
pub fn bind_values<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    params: Vec<SqlValue>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in params {
        query = match value {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::NullableInt(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
            SqlValue::Json(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_insert_orders_placeholders_by_field() {
        let (sql, params) = build_insert(
            "pipeline",
            &["id", "name", "status"],
            &[
                Assignment::new("creator_id", SqlValue::Int(7)),
                Assignment::new("updater_id", SqlValue::Int(7)),
                Assignment::new("name", SqlValue::Text("release-42".to_string())),
            ],
        );
        assert_eq!(
            sql,
            "INSERT INTO pipeline (creator_id, updater_id, name) \
             VALUES ($1, $2, $3) RETURNING id, name, status"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Int(7),
                SqlValue::Int(7),
                SqlValue::Text("release-42".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_select_empty_filter_matches_all() {
        let (sql, params) = build_select("pipeline", &["id", "status"], &[], None);
        assert_eq!(sql, "SELECT id, status FROM pipeline WHERE 1 = 1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_select_conjoins_predicates_in_order() {
        let (sql, params) = build_select(
            "task",
            &["id"],
            &[
                Predicate::new("stage_id", SqlValue::Int(3)),
                Predicate::new("status", SqlValue::Text("PENDING".to_string())),
            ],
            Some("id ASC"),
        );
        assert_eq!(
            sql,
            "SELECT id FROM task WHERE 1 = 1 AND stage_id = $1 AND status = $2 ORDER BY id ASC"
        );
        assert_eq!(
            params,
            vec![SqlValue::Int(3), SqlValue::Text("PENDING".to_string())]
        );
    }

    #[test]
    fn test_build_update_binds_id_last() {
        let (sql, params) = build_update(
            "pipeline",
            &["id", "status"],
            &[
                Assignment::new("updater_id", SqlValue::Int(9)),
                Assignment::new("status", SqlValue::Text("DONE".to_string())),
            ],
            42,
        );
        assert_eq!(
            sql,
            "UPDATE pipeline SET updater_id = $1, status = $2 \
             WHERE id = $3 RETURNING id, status"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Int(9),
                SqlValue::Text("DONE".to_string()),
                SqlValue::Int(42),
            ]
        );
    }
}
