//! Projection maps
//!
//! A projection map translates the column names a caller asks for into the
//! select expressions actually sent to the store. Joins use one to alias
//! every column of both tables as `<table>_<column>`.

use crate::schema::ID_COLUMN;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requested column name to select expression
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionMap(BTreeMap<String, String>);

impl ProjectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, expression: impl Into<String>) {
        self.0.insert(column.into(), expression.into());
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Default aliasing for `left LEFT OUTER JOIN right`
    ///
    /// `_id` resolves to the left table's identity; every other column `c` of
    /// table `t` is exposed as `t_c`.
    pub fn default_join(
        left_table: &str,
        left_columns: &[String],
        right_table: &str,
        right_columns: &[String],
    ) -> Self {
        let mut map = ProjectionMap::new();
        map.insert(
            ID_COLUMN,
            format!("{}.{} AS {}", left_table, ID_COLUMN, ID_COLUMN),
        );
        for (table, columns) in [(left_table, left_columns), (right_table, right_columns)] {
            for col in columns {
                let alias = format!("{}_{}", table, col);
                map.insert(alias.clone(), format!("{}.{} AS {}", table, col, alias));
            }
        }
        map
    }

    /// Select expressions for the requested columns
    ///
    /// Names missing from the map pass through unchanged. With no requested
    /// columns every mapped expression is selected, ordered by key.
    pub fn select_list(&self, requested: Option<&[String]>) -> Vec<String> {
        match requested {
            Some(columns) if !columns.is_empty() => columns
                .iter()
                .map(|c| self.get(c).map(str::to_string).unwrap_or_else(|| c.clone()))
                .collect(),
            _ => self.0.values().cloned().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProjectionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ProjectionMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_join_aliases_every_column() {
        let map = ProjectionMap::default_join(
            "orders",
            &cols(&["_id", "total"]),
            "customers",
            &cols(&["_id", "name"]),
        );
        assert_eq!(map.get("_id"), Some("orders._id AS _id"));
        assert_eq!(map.get("orders_total"), Some("orders.total AS orders_total"));
        assert_eq!(map.get("customers_name"), Some("customers.name AS customers_name"));
        assert_eq!(map.get("customers__id"), Some("customers._id AS customers__id"));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_select_list_maps_and_passes_through() {
        let map: ProjectionMap = [("total", "orders.total AS total")].into_iter().collect();
        assert_eq!(
            map.select_list(Some(&cols(&["total", "count(*)"]))),
            cols(&["orders.total AS total", "count(*)"])
        );
        assert_eq!(map.select_list(None), cols(&["orders.total AS total"]));
    }
}
