//! Model registry
//!
//! The single source of truth binding model types to table names, resource
//! identifiers and schema producers, plus the joins synthesized between
//! registered tables. Schema generation, routing and query composition all
//! consult one `Registry` instance owned by the storage root.
//!
//! Registration mutates the pattern tables and is expected to happen once at
//! startup, before request handling starts.

use crate::creator::{ModelType, TableCreator};
use crate::errors::{ContentDbError, Result};
use crate::projection::ProjectionMap;
use crate::router::{ResourceRouter, Route, RouteKind};
use crate::schema::{SchemaBuilder, SchemaUpgrader};
use contentdb_core_types::ResourceId;
use std::collections::HashMap;
use std::sync::Arc;

/// One registered model table
#[derive(Clone)]
pub struct TableEntry {
    pub model: ModelType,
    pub table_name: String,
    pub resource_id: ResourceId,
    creator: Arc<dyn TableCreator>,
}

impl TableEntry {
    pub fn creator(&self) -> &dyn TableCreator {
        self.creator.as_ref()
    }
}

impl std::fmt::Debug for TableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEntry")
            .field("model", &self.model)
            .field("table_name", &self.table_name)
            .field("resource_id", &self.resource_id)
            .finish()
    }
}

/// A synthesized left outer join between two registered tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEntry {
    pub resource_id: ResourceId,
    pub path: String,
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
    /// `left LEFT OUTER JOIN right ON (left.col = right.col)`
    pub source: String,
}

impl JoinEntry {
    fn describe(left_table: &str, left_column: &str, right_table: &str, right_column: &str) -> String {
        format!(
            "{}.{} = {}.{}",
            left_table, left_column, right_table, right_column
        )
    }
}

/// Registered tables, joins and their routing tables
pub struct Registry {
    authority: String,
    tables: Vec<TableEntry>,
    by_model: HashMap<ModelType, usize>,
    by_name: HashMap<String, usize>,
    joins: Vec<JoinEntry>,
    joins_by_path: HashMap<String, usize>,
    projections: HashMap<ResourceId, ProjectionMap>,
    router: ResourceRouter,
}

impl Registry {
    pub fn new(authority: &str) -> Self {
        Self {
            authority: authority.to_string(),
            tables: Vec::new(),
            by_model: HashMap::new(),
            by_name: HashMap::new(),
            joins: Vec::new(),
            joins_by_path: HashMap::new(),
            projections: HashMap::new(),
            router: ResourceRouter::new(authority),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Register `M` under its default table name (simple type name, lowercased)
    pub fn register<M: 'static>(&mut self, creator: impl TableCreator + 'static) -> Result<ResourceId> {
        let model = ModelType::of::<M>();
        let table_name = model.default_table_name();
        self.register_model(model, &table_name, Arc::new(creator))
    }

    /// Register `M` under an explicit table name
    pub fn register_as<M: 'static>(
        &mut self,
        table_name: &str,
        creator: impl TableCreator + 'static,
    ) -> Result<ResourceId> {
        self.register_model(ModelType::of::<M>(), table_name, Arc::new(creator))
    }

    /// Register a model declared by name, e.g. from a manifest
    ///
    /// The table name doubles as the model name.
    pub fn register_declared(
        &mut self,
        table_name: &str,
        creator: impl TableCreator + 'static,
    ) -> Result<ResourceId> {
        self.register_model(ModelType::declared(table_name), table_name, Arc::new(creator))
    }

    /// Bind `model` to `table_name` and install its routing patterns
    ///
    /// Registering the same model under the same name again returns the
    /// existing identifier and keeps the original creator.
    pub fn register_model(
        &mut self,
        model: ModelType,
        table_name: &str,
        creator: Arc<dyn TableCreator>,
    ) -> Result<ResourceId> {
        if !is_identifier(table_name) {
            return Err(ContentDbError::InvalidTableName {
                name: table_name.to_string(),
            });
        }

        if let Some(&slot) = self.by_name.get(table_name) {
            let existing = &self.tables[slot];
            if existing.model == model {
                return Ok(existing.resource_id.clone());
            }
            return Err(ContentDbError::TableNameConflict {
                table: table_name.to_string(),
                existing: existing.model.to_string(),
                requested: model.to_string(),
            });
        }

        if let Some(&slot) = self.by_model.get(&model) {
            return Err(ContentDbError::ModelAlreadyRegistered {
                model: model.to_string(),
                table: self.tables[slot].table_name.clone(),
            });
        }

        let slot = self.tables.len();
        self.router.add_table(table_name, slot)?;

        tracing::debug!(table = table_name, slot, model = %model, "registered model");
        let resource_id = ResourceId::new(&self.authority, table_name);
        self.by_model.insert(model.clone(), slot);
        self.by_name.insert(table_name.to_string(), slot);
        self.tables.push(TableEntry {
            model,
            table_name: table_name.to_string(),
            resource_id: resource_id.clone(),
            creator,
        });
        Ok(resource_id)
    }

    /// Registered tables in slot order
    pub fn tables(&self) -> &[TableEntry] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.table_name.clone()).collect()
    }

    pub fn entry(&self, table_name: &str) -> Option<&TableEntry> {
        self.by_name.get(table_name).map(|&slot| &self.tables[slot])
    }

    pub fn model_for_table(&self, table_name: &str) -> Option<ModelType> {
        self.entry(table_name).map(|e| e.model.clone())
    }

    pub fn creator_for_table(&self, table_name: &str) -> Option<&dyn TableCreator> {
        self.entry(table_name).map(TableEntry::creator)
    }

    pub fn entry_for(&self, model: &ModelType) -> Result<&TableEntry> {
        self.by_model
            .get(model)
            .map(|&slot| &self.tables[slot])
            .ok_or_else(|| ContentDbError::UnregisteredModel {
                model: model.to_string(),
            })
    }

    /// Collection identifier of a registered model
    pub fn resource_id<M: 'static>(&self) -> Result<ResourceId> {
        self.entry_for(&ModelType::of::<M>())
            .map(|e| e.resource_id.clone())
    }

    pub fn table_name<M: 'static>(&self) -> Result<&str> {
        self.entry_for(&ModelType::of::<M>())
            .map(|e| e.table_name.as_str())
    }

    /// Identifier of a left outer join between two registered models
    ///
    /// Joins are keyed by `<left>_<right>`. Asking again with the same
    /// columns returns the existing identifier; asking with different
    /// columns for an already-registered pair is a registration conflict.
    pub fn joined_resource_id<L: 'static, R: 'static>(
        &mut self,
        left_column: &str,
        right_column: &str,
        projection: Option<ProjectionMap>,
    ) -> Result<ResourceId> {
        self.join_models(
            &ModelType::of::<L>(),
            left_column,
            &ModelType::of::<R>(),
            right_column,
            projection,
        )
    }

    pub fn join_models(
        &mut self,
        left: &ModelType,
        left_column: &str,
        right: &ModelType,
        right_column: &str,
        projection: Option<ProjectionMap>,
    ) -> Result<ResourceId> {
        let left_table = self.entry_for(left)?.table_name.clone();
        let right_table = self.entry_for(right)?.table_name.clone();
        let path = format!("{}_{}", left_table, right_table);

        if let Some(&slot) = self.joins_by_path.get(&path) {
            let existing = &self.joins[slot];
            if existing.left_column == left_column && existing.right_column == right_column {
                return Ok(existing.resource_id.clone());
            }
            return Err(ContentDbError::JoinConflict {
                path,
                registered: JoinEntry::describe(
                    &existing.left_table,
                    &existing.left_column,
                    &existing.right_table,
                    &existing.right_column,
                ),
                requested: JoinEntry::describe(&left_table, left_column, &right_table, right_column),
            });
        }

        let slot = self.joins.len();
        self.router.add_join(&path, slot)?;

        let resource_id = ResourceId::new(&self.authority, &path);
        let source = format!(
            "{} LEFT OUTER JOIN {} ON ({}.{} = {}.{})",
            left_table, right_table, left_table, left_column, right_table, right_column
        );
        tracing::debug!(path = %path, source = %source, "registered join");

        if let Some(map) = projection {
            self.projections.insert(resource_id.clone(), map);
        }
        self.joins.push(JoinEntry {
            resource_id: resource_id.clone(),
            path: path.clone(),
            left_table,
            left_column: left_column.to_string(),
            right_table,
            right_column: right_column.to_string(),
            source,
        });
        self.joins_by_path.insert(path, slot);

        Ok(resource_id)
    }

    pub fn joins(&self) -> &[JoinEntry] {
        &self.joins
    }

    pub fn join(&self, slot: usize) -> Option<&JoinEntry> {
        self.joins.get(slot)
    }

    /// Register or replace the caller projection for an identifier
    pub fn set_projection_map(&mut self, resource_id: &ResourceId, projection: ProjectionMap) {
        self.projections.insert(resource_id.clone(), projection);
    }

    pub fn projection_map(&self, resource_id: &ResourceId) -> Option<&ProjectionMap> {
        self.projections.get(resource_id)
    }

    /// Resolve an identifier to its table, row and join status
    pub fn route(&self, resource_id: &ResourceId) -> Result<Route> {
        let matched = self.router.route(resource_id)?;
        let missing_slot = || ContentDbError::Internal {
            message: format!("route for {} points at empty slot {}", resource_id, matched.slot),
        };
        match matched.kind {
            RouteKind::Collection | RouteKind::Item(_) => {
                let entry = self.tables.get(matched.slot).ok_or_else(missing_slot)?;
                Ok(Route {
                    table: entry.table_name.clone(),
                    slot: matched.slot,
                    item: match matched.kind {
                        RouteKind::Item(row) => Some(row),
                        _ => None,
                    },
                    join: false,
                })
            }
            RouteKind::Join => {
                let join = self.joins.get(matched.slot).ok_or_else(missing_slot)?;
                Ok(Route {
                    table: join.source.clone(),
                    slot: matched.slot,
                    item: None,
                    join: true,
                })
            }
        }
    }

    /// Column names a table's creator declares, without touching the store
    ///
    /// Unions the create-mode columns with the migrate-mode columns for
    /// `version`, create order first, without duplicates. A recreate upgrade
    /// rebuilds from the create-mode schema, so its columns are not added.
    pub fn declared_columns(&self, table_name: &str, version: u32) -> Result<Vec<String>> {
        let entry = self
            .entry(table_name)
            .ok_or_else(|| ContentDbError::UnknownTable {
                table: table_name.to_string(),
            })?;
        let creator = entry.creator();

        let mut columns: Vec<String> = Vec::new();
        if let Some(create) = creator.create_schema(SchemaBuilder::new(table_name))? {
            columns.extend(create.column_names());
        }
        if let Some(upgrade) = creator
            .upgrade_schema(SchemaUpgrader::new(table_name), version)?
            .filter(|u| !u.is_recreate())
        {
            for name in upgrade.column_names() {
                if !columns.contains(&name) {
                    columns.push(name);
                }
            }
        }
        Ok(columns)
    }

    /// Forget every registration
    pub fn clear(&mut self) {
        self.tables.clear();
        self.by_model.clear();
        self.by_name.clear();
        self.joins.clear();
        self.joins_by_path.clear();
        self.projections.clear();
        self.router = ResourceRouter::new(&self.authority);
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
