//! Query results and typed row readers
//!
//! A `RowSet` is fully materialized: the connection lock is released before
//! callers read it. `RowGetter` reads one row by column name; for join
//! results it can be pointed at one table so `name` resolves to the
//! `<table>_name` alias first.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use contentdb_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};

/// Column names plus materialized rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<RowGetter<'_>> {
        self.rows.get(index).map(|values| RowGetter {
            columns: &self.columns,
            values,
            prefix: None,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowGetter<'_>> {
        self.rows.iter().map(move |values| RowGetter {
            columns: &self.columns,
            values,
            prefix: None,
        })
    }

    /// Every value of one column, in row order
    pub fn column_values(&self, name: &str) -> Vec<Value> {
        match self.column_index(name) {
            Some(index) => self.rows.iter().map(|row| row[index].clone()).collect(),
            None => Vec::new(),
        }
    }
}

/// Named, typed access to one row
#[derive(Debug, Clone)]
pub struct RowGetter<'a> {
    columns: &'a [String],
    values: &'a [Value],
    prefix: Option<String>,
}

impl<'a> RowGetter<'a> {
    /// Resolve names against the `<table>_` join alias first
    pub fn with_table_prefix(mut self, table: &str) -> Self {
        self.prefix = Some(format!("{}_", table));
        self
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        if let Some(prefix) = &self.prefix {
            let aliased = format!("{}{}", prefix, name);
            if let Some(index) = self.columns.iter().position(|c| *c == aliased) {
                return Some(index);
            }
        }
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get_value(&self, name: &str) -> Option<&'a Value> {
        self.index_of(name).and_then(|i| self.values.get(i))
    }

    /// True when the column is missing or NULL
    pub fn is_null(&self, name: &str) -> bool {
        self.get_value(name).map_or(true, Value::is_null)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_value(name).and_then(Value::as_text)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get_value(name).and_then(Value::as_i64)
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get_value(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_i64(name).map(|v| v != 0)
    }

    pub fn get_blob(&self, name: &str) -> Option<&'a [u8]> {
        self.get_value(name).and_then(Value::as_blob)
    }

    /// Timestamp stored as unix seconds, `CURRENT_TIMESTAMP` text or RFC 3339
    pub fn get_date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get_value(name)? {
            Value::Integer(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Value::Real(secs) => Utc.timestamp_opt(*secs as i64, 0).single(),
            Value::Text(text) => parse_timestamp(text),
            Value::Null | Value::Blob(_) => None,
        }
    }

    /// Calendar date stored as `CURRENT_DATE` text or any timestamp form
    pub fn get_naive_date(&self, name: &str) -> Option<NaiveDate> {
        if let Some(Value::Text(text)) = self.get_value(name) {
            if let Ok(date) = NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
                return Some(date);
            }
        }
        self.get_date(name).map(|dt| dt.date_naive())
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert a core value for binding
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

pub(crate) fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RowSet {
        RowSet::new(
            vec![
                "_id".to_string(),
                "orders_total".to_string(),
                "customers_name".to_string(),
                "created".to_string(),
                "flag".to_string(),
            ],
            vec![vec![
                Value::Integer(1),
                Value::Real(9.5),
                Value::from("ada"),
                Value::from("2024-03-01 12:30:00"),
                Value::Integer(1),
            ]],
        )
    }

    #[test]
    fn test_typed_getters() {
        let rows = sample();
        let row = rows.row(0).unwrap();
        assert_eq!(row.get_i64("_id"), Some(1));
        assert_eq!(row.get_i32("_id"), Some(1));
        assert_eq!(row.get_f64("orders_total"), Some(9.5));
        assert_eq!(row.get_bool("flag"), Some(true));
        assert!(row.is_null("missing"));
        assert_eq!(row.get_string("customers_name").as_deref(), Some("ada"));
    }

    #[test]
    fn test_table_prefix_resolution() {
        let rows = sample();
        let row = rows.row(0).unwrap().with_table_prefix("customers");
        assert_eq!(row.get_string("name").as_deref(), Some("ada"));
        // unprefixed names still resolve
        assert_eq!(row.get_i64("_id"), Some(1));
    }

    #[test]
    fn test_dates() {
        let rows = sample();
        let row = rows.row(0).unwrap();
        let created = row.get_date("created").unwrap();
        assert_eq!(created.to_rfc3339(), "2024-03-01T12:30:00+00:00");
        assert_eq!(
            row.get_naive_date("created"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_column_values() {
        let rows = sample();
        assert_eq!(rows.column_values("_id"), vec![Value::Integer(1)]);
        assert!(rows.column_values("nope").is_empty());
    }
}
