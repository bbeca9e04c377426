//! Resource routing
//!
//! Three pattern tables resolve a resource identifier, tried in fixed order:
//! collection (`/<table>`), single item (`/<table>/<row>`) and join
//! (`/<left>_<right>`). Each table maps a path pattern to a slot index in the
//! registry.

use crate::errors::{ContentDbError, Result};
use contentdb_core_types::ResourceId;
use matchit::Router as MatchitRouter;

const ROW_PARAM: &str = "row";

/// What kind of pattern an identifier matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Collection,
    /// Single row, carrying the trailing row token
    Item(i64),
    Join,
}

/// Slot-level routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch {
    pub kind: RouteKind,
    pub slot: usize,
}

/// Routing decision resolved against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Table name, or the join's multi-table source expression
    pub table: String,
    pub slot: usize,
    /// Row token when the identifier addresses one row
    pub item: Option<i64>,
    pub join: bool,
}

impl Route {
    pub fn is_item(&self) -> bool {
        self.item.is_some()
    }
}

/// Pattern tables for one authority
pub struct ResourceRouter {
    authority: String,
    collections: MatchitRouter<usize>,
    items: MatchitRouter<usize>,
    joins: MatchitRouter<usize>,
}

impl ResourceRouter {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
            collections: MatchitRouter::new(),
            items: MatchitRouter::new(),
            joins: MatchitRouter::new(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Install the collection and single-item patterns for a table
    pub fn add_table(&mut self, table: &str, slot: usize) -> Result<()> {
        insert(&mut self.collections, format!("/{}", table), slot)?;
        insert(
            &mut self.items,
            format!("/{}/{{{}}}", table, ROW_PARAM),
            slot,
        )
    }

    /// Install the pattern for a join path
    pub fn add_join(&mut self, path: &str, slot: usize) -> Result<()> {
        insert(&mut self.joins, format!("/{}", path), slot)
    }

    pub fn has_join(&self, path: &str) -> bool {
        self.joins.at(&format!("/{}", path)).is_ok()
    }

    /// Match an identifier against the three pattern tables
    pub fn route(&self, id: &ResourceId) -> Result<RouteMatch> {
        let no_route = || ContentDbError::NoRoute {
            resource_id: id.to_string(),
        };

        let (authority, path) = id
            .authority()
            .zip(id.path())
            .ok_or_else(no_route)?;
        if authority != self.authority {
            return Err(no_route());
        }

        if let Ok(matched) = self.collections.at(path) {
            return Ok(RouteMatch {
                kind: RouteKind::Collection,
                slot: *matched.value,
            });
        }

        if let Ok(matched) = self.items.at(path) {
            if let Some(row) = matched.params.get(ROW_PARAM).and_then(parse_row_token) {
                return Ok(RouteMatch {
                    kind: RouteKind::Item(row),
                    slot: *matched.value,
                });
            }
        }

        if let Ok(matched) = self.joins.at(path) {
            return Ok(RouteMatch {
                kind: RouteKind::Join,
                slot: *matched.value,
            });
        }

        tracing::debug!(resource_id = %id, "no route");
        Err(no_route())
    }
}

fn insert(router: &mut MatchitRouter<usize>, pattern: String, slot: usize) -> Result<()> {
    router
        .insert(pattern.clone(), slot)
        .map_err(|e| ContentDbError::Internal {
            message: format!("cannot install route {}: {}", pattern, e),
        })
}

/// Row tokens are non-negative decimal integers
fn parse_row_token(token: &str) -> Option<i64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
