//! Content provider
//!
//! The CRUD surface keyed by resource identifier. One provider owns the
//! registry and a single shared connection, opened lazily on first use; the
//! open runs the migration orchestrator before any request is served.
//!
//! Every public operation owns its lifecycle logging (start, end, end_error).

use crate::config::StoreConfig;
use crate::db;
use crate::errors::{config_error, from_rusqlite, lock_poisoned, table_error, Result};
use crate::migrations::{self, introspect, MigrationReport};
use crate::rows::{from_sql, RowSet};
use contentdb_core::query::{compose_delete, compose_insert, compose_query, compose_update};
use contentdb_core::{
    log_op_end, log_op_error, log_op_start, ContentDbError, ContentValues, DataModel, ExError,
    ProjectionMap, QueryRequest, Registry, ResourceId, Route, Statement, Value, ID_COLUMN,
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Run `$body`, logging start and end (or end_error) for `$op`
macro_rules! logged {
    ($op:expr, $id:expr, $body:expr) => {{
        log_op_start!($op, resource_id = %$id);
        let start = Instant::now();
        match $body {
            Ok(value) => {
                log_op_end!($op, duration_ms = start.elapsed().as_millis() as u64);
                Ok(value)
            }
            Err(e) => {
                let e: ExError = e;
                log_op_error!($op, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                Err(e)
            }
        }
    }};
}

pub struct ContentProvider {
    config: StoreConfig,
    registry: Registry,
    conn: Mutex<Option<Connection>>,
    last_migration: Mutex<Option<MigrationReport>>,
    /// Default join projections, computed once per join identifier
    join_projections: Mutex<HashMap<ResourceId, ProjectionMap>>,
}

impl ContentProvider {
    /// Bind a validated config to a populated registry
    ///
    /// The registry authority must match the configured one.
    pub fn new(config: StoreConfig, registry: Registry) -> Result<Self> {
        config.validate()?;
        if registry.authority() != config.authority {
            return Err(config_error(format!(
                "registry authority '{}' does not match configured authority '{}'",
                registry.authority(),
                config.authority
            )));
        }
        Ok(Self {
            config,
            registry,
            conn: Mutex::new(None),
            last_migration: Mutex::new(None),
            join_projections: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registration happens before the store serves requests
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Open and migrate now instead of on first use
    pub fn open(&self) -> Result<()> {
        self.with_conn("open", |_| Ok(()))
    }

    /// Report of the migration run by the last open
    pub fn last_migration(&self) -> Option<MigrationReport> {
        self.last_migration.lock().ok().and_then(|r| r.clone())
    }

    /// Close the connection; the next operation reopens it
    pub fn close(&self) -> Result<()> {
        let mut guard = self.lock("close")?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| from_rusqlite(e))?;
        }
        Ok(())
    }

    fn lock(&self, op: &str) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn.lock().map_err(|_| lock_poisoned(op))
    }

    fn with_conn<T>(&self, op: &str, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.lock(op)?;
        if guard.is_none() {
            let mut conn = db::open_configured(&self.config)?;
            let report = migrations::migrate(&mut conn, &self.registry, self.config.version)?;
            if let Ok(mut last) = self.last_migration.lock() {
                *last = Some(report);
            }
            *guard = Some(conn);
        }
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(lock_poisoned(op)),
        }
    }

    fn route(&self, resource_id: &ResourceId) -> Result<Route> {
        Ok(self.registry.route(resource_id)?)
    }

    /// Read rows addressed by an identifier
    pub fn query(&self, resource_id: &ResourceId, request: &QueryRequest) -> Result<RowSet> {
        logged!("query", resource_id, self.query_impl(resource_id, request))
    }

    fn query_impl(&self, resource_id: &ResourceId, request: &QueryRequest) -> Result<RowSet> {
        let route = self.route(resource_id)?;
        // open first so the default join projection reads physical columns
        self.open()?;
        let projection = if route.join {
            Some(self.join_projection(resource_id)?)
        } else {
            self.registry.projection_map(resource_id).cloned()
        };
        let stmt = compose_query(&route, request, projection.as_ref());
        self.with_conn("query", |conn| read_rows(conn, &stmt))
    }

    /// Insert one row, returning its item identifier
    ///
    /// `None` when the table's conflict rule is `Ignore` and the row was
    /// skipped.
    pub fn insert(
        &self,
        resource_id: &ResourceId,
        values: &ContentValues,
    ) -> Result<Option<ResourceId>> {
        logged!("insert", resource_id, self.insert_impl(resource_id, values))
    }

    fn insert_impl(
        &self,
        resource_id: &ResourceId,
        values: &ContentValues,
    ) -> Result<Option<ResourceId>> {
        let route = self.route(resource_id)?;
        let rule = self.config.conflict_rule_for(&route.table);
        let stmt = compose_insert(resource_id, &route, values, rule)?;
        let row_id = self.with_conn("insert", |conn| {
            let changed = db::execute(conn, &stmt).map_err(|e| table_error("insert", &route.table, e))?;
            Ok((changed > 0).then(|| conn.last_insert_rowid()))
        })?;
        Ok(row_id.map(|id| self.collection_id(&route.table).with_appended_id(id)))
    }

    /// Update rows, returning the number changed
    pub fn update(
        &self,
        resource_id: &ResourceId,
        values: &ContentValues,
        selection: Option<&str>,
        args: &[Value],
    ) -> Result<usize> {
        logged!(
            "update",
            resource_id,
            self.update_impl(resource_id, values, selection, args)
        )
    }

    fn update_impl(
        &self,
        resource_id: &ResourceId,
        values: &ContentValues,
        selection: Option<&str>,
        args: &[Value],
    ) -> Result<usize> {
        let route = self.route(resource_id)?;
        let stmt = compose_update(resource_id, &route, values, selection, args)?;
        self.with_conn("update", |conn| {
            db::execute(conn, &stmt).map_err(|e| table_error("update", &route.table, e))
        })
    }

    /// Delete rows, returning the number removed
    pub fn delete(
        &self,
        resource_id: &ResourceId,
        selection: Option<&str>,
        args: &[Value],
    ) -> Result<usize> {
        logged!(
            "delete",
            resource_id,
            self.delete_impl(resource_id, selection, args)
        )
    }

    fn delete_impl(
        &self,
        resource_id: &ResourceId,
        selection: Option<&str>,
        args: &[Value],
    ) -> Result<usize> {
        let route = self.route(resource_id)?;
        let stmt = compose_delete(resource_id, &route, selection, args)?;
        self.with_conn("delete", |conn| {
            db::execute(conn, &stmt).map_err(|e| table_error("delete", &route.table, e))
        })
    }

    /// Insert all rows in one transaction, all or nothing
    ///
    /// Returns the number of rows committed: every row, or 0 when any row
    /// failed. Row failures are logged, not returned. Routing and
    /// not-writable errors are still returned.
    pub fn bulk_insert(&self, resource_id: &ResourceId, rows: &[ContentValues]) -> Result<usize> {
        logged!("bulk_insert", resource_id, self.bulk_insert_impl(resource_id, rows))
    }

    fn bulk_insert_impl(&self, resource_id: &ResourceId, rows: &[ContentValues]) -> Result<usize> {
        let route = self.route(resource_id)?;
        let rule = self.config.conflict_rule_for(&route.table);
        let statements = rows
            .iter()
            .map(|values| compose_insert(resource_id, &route, values, rule))
            .collect::<std::result::Result<Vec<Statement>, _>>()?;

        self.with_conn("bulk_insert", |conn| {
            match insert_all(conn, &statements) {
                Ok(()) => Ok(statements.len()),
                Err((row, e)) => {
                    tracing::warn!(
                        table = %route.table,
                        row,
                        rows = statements.len(),
                        error = %e,
                        "bulk insert rolled back"
                    );
                    Ok(0)
                }
            }
        })
    }

    /// Update a model's row by identity, inserting when nothing matched
    ///
    /// Returns the row's item identifier.
    pub fn save<M: DataModel + 'static>(&self, model: &M) -> Result<Option<ResourceId>> {
        let collection = self.registry.resource_id::<M>()?;
        let mut values = ContentValues::new();
        model.populate_values(&mut values);

        if let Some(row_id) = model.row_id() {
            let item = collection.with_appended_id(row_id);
            if !values.is_empty() && self.update(&item, &values, None, &[])? > 0 {
                return Ok(Some(item));
            }
            values.put(ID_COLUMN, row_id);
        }
        self.insert(&collection, &values)
    }

    /// Bulk insert models of one registered type
    pub fn bulk_insert_models<M: DataModel + 'static>(&self, models: &[M]) -> Result<usize> {
        let collection = self.registry.resource_id::<M>()?;
        let rows: Vec<ContentValues> = models
            .iter()
            .map(|model| {
                let mut values = ContentValues::new();
                model.populate_values(&mut values);
                values
            })
            .collect();
        self.bulk_insert(&collection, &rows)
    }

    /// Delete every row of every registered table
    pub fn wipe(&self) -> Result<usize> {
        log_op_start!("wipe");
        let start = Instant::now();

        let result = self.with_conn("wipe", |conn| {
            let tx = conn.transaction().map_err(from_rusqlite)?;
            let mut removed = 0;
            for entry in self.registry.tables() {
                removed += tx
                    .execute(&format!("DELETE FROM {}", entry.table_name), [])
                    .map_err(|e| table_error("wipe", &entry.table_name, e))?;
            }
            tx.commit().map_err(from_rusqlite)?;
            Ok(removed)
        });

        match result {
            Ok(removed) => {
                log_op_end!(
                    "wipe",
                    duration_ms = start.elapsed().as_millis() as u64,
                    rows = removed
                );
                Ok(removed)
            }
            Err(e) => {
                log_op_error!("wipe", e.clone(), duration_ms = start.elapsed().as_millis() as u64);
                Err(e)
            }
        }
    }

    /// Projection used for a join identifier
    ///
    /// A map registered for the identifier wins; otherwise the default
    /// aliasing of both tables' columns, computed once and cached.
    pub fn join_projection(&self, resource_id: &ResourceId) -> Result<ProjectionMap> {
        if let Some(map) = self.registry.projection_map(resource_id) {
            return Ok(map.clone());
        }

        let route = self.route(resource_id)?;
        let join = self
            .registry
            .join(route.slot)
            .filter(|_| route.join)
            .ok_or_else(|| ContentDbError::NoRoute {
                resource_id: resource_id.to_string(),
            })?;

        let mut cache = self
            .join_projections
            .lock()
            .map_err(|_| lock_poisoned("join_projection"))?;
        if let Some(map) = cache.get(resource_id) {
            return Ok(map.clone());
        }

        let left = self.table_columns(&join.left_table)?;
        let right = self.table_columns(&join.right_table)?;
        let map = ProjectionMap::default_join(&join.left_table, &left, &join.right_table, &right);
        tracing::debug!(resource_id = %resource_id, columns = map.len(), "computed default join projection");
        cache.insert(resource_id.clone(), map.clone());
        Ok(map)
    }

    /// Column names of a registered table
    ///
    /// Physical metadata when the store is open, otherwise the columns the
    /// table's creator declares across both schema modes.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        {
            let guard = self.lock("table_columns")?;
            if let Some(conn) = guard.as_ref() {
                return introspect::table_columns(conn, table);
            }
        }
        Ok(self.registry.declared_columns(table, 0)?)
    }

    fn collection_id(&self, table: &str) -> ResourceId {
        ResourceId::new(&self.config.authority, table)
    }
}

/// Execute inserts in one transaction; on failure report the row index
fn insert_all(
    conn: &mut Connection,
    statements: &[Statement],
) -> std::result::Result<(), (usize, rusqlite::Error)> {
    let tx = conn.transaction().map_err(|e| (0, e))?;
    for (index, stmt) in statements.iter().enumerate() {
        db::execute(&tx, stmt).map_err(|e| (index, e))?;
    }
    // dropping an uncommitted transaction rolls it back
    tx.commit().map_err(|e| (statements.len(), e))
}

fn read_rows(conn: &Connection, stmt: &Statement) -> Result<RowSet> {
    tracing::debug!(sql = %stmt.sql, args = stmt.args.len(), "query");
    let mut prepared = conn.prepare(&stmt.sql).map_err(from_rusqlite)?;
    let columns: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let width = columns.len();

    let mut rows = prepared
        .query(rusqlite::params_from_iter(
            stmt.args.iter().map(crate::rows::to_sql),
        ))
        .map_err(from_rusqlite)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(from_rusqlite)? {
        let mut values = Vec::with_capacity(width);
        for index in 0..width {
            values.push(from_sql(row.get_ref(index).map_err(from_rusqlite)?));
        }
        out.push(values);
    }
    Ok(RowSet::new(columns, out))
}
