//! Query composition
//!
//! Turns a resolved [`Route`] plus the caller's column selection, filter,
//! bound arguments and sort order into a SQL [`Statement`]. Item routes get
//! an identity predicate conjoined to the caller's filter, with the row token
//! appended after the caller's arguments so positional `?` placeholders keep
//! their meaning. Join routes read from the join's source expression and
//! reject every mutation.

use crate::errors::{ContentDbError, Result};
use crate::projection::ProjectionMap;
use crate::router::Route;
use crate::schema::ID_COLUMN;
use crate::value::{ContentValues, Value};
use contentdb_core_types::ResourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Conflict resolution for inserts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictRule {
    #[default]
    Abort,
    Replace,
    Ignore,
    Fail,
    Rollback,
}

impl ConflictRule {
    pub fn keyword(&self) -> &'static str {
        match self {
            ConflictRule::Abort => "ABORT",
            ConflictRule::Replace => "REPLACE",
            ConflictRule::Ignore => "IGNORE",
            ConflictRule::Fail => "FAIL",
            ConflictRule::Rollback => "ROLLBACK",
        }
    }
}

impl fmt::Display for ConflictRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Caller side of a read: columns, filter, bound arguments, ordering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub columns: Option<Vec<String>>,
    pub selection: Option<String>,
    pub args: Vec<Value>,
    pub sort_order: Option<String>,
    pub limit: Option<u64>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    /// Filter with `?` placeholders bound positionally to `args`
    pub fn selection(mut self, selection: &str, args: impl IntoIterator<Item = Value>) -> Self {
        self.selection = Some(selection.to_string());
        self.args = args.into_iter().collect();
        self
    }

    pub fn sort_order(mut self, sort_order: &str) -> Self {
        self.sort_order = Some(sort_order.to_string());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Rendered SQL with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Conjoin two filters: empty + X = X, X + empty = X, X + Y = `(X) AND (Y)`
pub fn concatenate_where(a: Option<&str>, b: Option<&str>) -> Option<String> {
    let a = a.map(str::trim).filter(|s| !s.is_empty());
    let b = b.map(str::trim).filter(|s| !s.is_empty());
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.to_string()),
        (Some(x), Some(y)) => Some(format!("({}) AND ({})", x, y)),
    }
}

/// Caller arguments followed by `extra`
pub fn append_args(args: &[Value], extra: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut all = args.to_vec();
    all.extend(extra);
    all
}

/// Apply the identity predicate for item routes
fn scoped_filter(route: &Route, selection: Option<&str>, args: &[Value]) -> (Option<String>, Vec<Value>) {
    match route.item {
        Some(row) => (
            concatenate_where(selection, Some(&format!("{} = ?", ID_COLUMN))),
            append_args(args, [Value::Integer(row)]),
        ),
        None => (concatenate_where(selection, None), args.to_vec()),
    }
}

fn writable_table<'a>(resource_id: &ResourceId, route: &'a Route) -> Result<&'a str> {
    if route.join {
        return Err(ContentDbError::JoinNotWritable {
            resource_id: resource_id.to_string(),
        });
    }
    Ok(&route.table)
}

fn push_where(sql: &mut String, filter: Option<&str>) {
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }
}

/// `SELECT` for a route
///
/// With a projection map the select list goes through it; otherwise the
/// requested columns are used as-is, or `*`.
pub fn compose_query(
    route: &Route,
    request: &QueryRequest,
    projection: Option<&ProjectionMap>,
) -> Statement {
    let requested = request.columns.as_deref();
    let select_list = match projection {
        Some(map) => map.select_list(requested),
        None => requested.map(<[String]>::to_vec).unwrap_or_default(),
    };
    let select_list = if select_list.is_empty() {
        "*".to_string()
    } else {
        select_list.join(", ")
    };

    let (filter, args) = scoped_filter(route, request.selection.as_deref(), &request.args);

    let mut sql = format!("SELECT {} FROM {}", select_list, route.table);
    push_where(&mut sql, filter.as_deref());
    if let Some(order) = request.sort_order.as_deref().filter(|s| !s.trim().is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if let Some(limit) = request.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    Statement { sql, args }
}

/// `INSERT` of one row; empty values insert a row of defaults
pub fn compose_insert(
    resource_id: &ResourceId,
    route: &Route,
    values: &ContentValues,
    rule: ConflictRule,
) -> Result<Statement> {
    let table = writable_table(resource_id, route)?;
    let verb = match rule {
        ConflictRule::Abort => "INSERT".to_string(),
        other => format!("INSERT OR {}", other.keyword()),
    };

    if values.is_empty() {
        return Ok(Statement {
            sql: format!("{} INTO {} DEFAULT VALUES", verb, table),
            args: Vec::new(),
        });
    }

    let columns: Vec<&str> = values.columns().collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(Statement {
        sql: format!(
            "{} INTO {} ({}) VALUES ({})",
            verb,
            table,
            columns.join(", "),
            placeholders
        ),
        args: values.iter().map(|(_, v)| v.clone()).collect(),
    })
}

/// `UPDATE` of the rows a route and filter select
pub fn compose_update(
    resource_id: &ResourceId,
    route: &Route,
    values: &ContentValues,
    selection: Option<&str>,
    args: &[Value],
) -> Result<Statement> {
    let table = writable_table(resource_id, route)?;
    if values.is_empty() {
        return Err(ContentDbError::EmptyUpdate {
            table: table.to_string(),
        });
    }

    let assignments: Vec<String> = values.columns().map(|c| format!("{} = ?", c)).collect();
    let (filter, filter_args) = scoped_filter(route, selection, args);

    let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
    push_where(&mut sql, filter.as_deref());

    let set_args = values.iter().map(|(_, v)| v.clone());
    Ok(Statement {
        sql,
        args: set_args.chain(filter_args).collect(),
    })
}

/// `DELETE` of the rows a route and filter select
pub fn compose_delete(
    resource_id: &ResourceId,
    route: &Route,
    selection: Option<&str>,
    args: &[Value],
) -> Result<Statement> {
    let table = writable_table(resource_id, route)?;
    let (filter, args) = scoped_filter(route, selection, args);

    let mut sql = format!("DELETE FROM {}", table);
    push_where(&mut sql, filter.as_deref());
    Ok(Statement { sql, args })
}
