//! Schema producers and model identity
//!
//! A model is registered together with the object that describes its table,
//! so no runtime discovery is needed to find a schema.

use crate::errors::Result;
use crate::schema::{SchemaBuilder, SchemaUpgrader, TableDefinition};
use crate::value::ContentValues;
use std::any::TypeId;
use std::borrow::Cow;
use std::fmt;

/// Describes a model's table for the create and migrate phases
///
/// Returning `Ok(None)` skips the table for that phase only.
pub trait TableCreator: Send + Sync {
    /// Declare the full schema of a freshly created table
    fn create_schema(&self, builder: SchemaBuilder) -> Result<Option<TableDefinition>>;

    /// Declare the changes needed to bring a table up from `old_version`
    ///
    /// The default has nothing to do on upgrade.
    fn upgrade_schema(
        &self,
        _upgrader: SchemaUpgrader,
        _old_version: u32,
    ) -> Result<Option<TableDefinition>> {
        Ok(None)
    }
}

/// A model that writes its field values into a row
pub trait DataModel {
    fn populate_values(&self, values: &mut ContentValues);

    /// Row identity of a persisted instance, if known
    fn row_id(&self) -> Option<i64> {
        None
    }
}

/// Creator for models that only populate values
///
/// The table holds the identity column alone; upgrades do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOnly;

impl TableCreator for IdentityOnly {
    fn create_schema(&self, builder: SchemaBuilder) -> Result<Option<TableDefinition>> {
        builder.build().map(Some)
    }
}

/// Runtime identity of a registered model
///
/// Either a Rust type, or a model declared by name only (for example one
/// read from a manifest). The two never compare equal.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ModelType {
    id: Option<TypeId>,
    name: Cow<'static, str>,
}

impl ModelType {
    pub fn of<M: 'static>() -> Self {
        Self {
            id: Some(TypeId::of::<M>()),
            name: Cow::Borrowed(std::any::type_name::<M>()),
        }
    }

    /// A model known only by name
    pub fn declared(name: &str) -> Self {
        Self {
            id: None,
            name: Cow::Owned(name.to_string()),
        }
    }

    pub fn is_declared(&self) -> bool {
        self.id.is_none()
    }

    /// Fully qualified type name, or the declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unqualified type name without generic arguments
    pub fn simple_name(&self) -> &str {
        let name = self.name();
        let base = name.split('<').next().unwrap_or(name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Default table name: the simple name lowercased
    pub fn default_table_name(&self) -> String {
        self.simple_name().to_lowercase()
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrderLine;
    struct Wrapper<T>(T);

    #[test]
    fn test_default_table_name() {
        assert_eq!(ModelType::of::<OrderLine>().default_table_name(), "orderline");
        assert_eq!(ModelType::of::<Wrapper<OrderLine>>().simple_name(), "Wrapper");
    }

    #[test]
    fn test_model_types_distinct() {
        assert_ne!(ModelType::of::<OrderLine>(), ModelType::of::<Wrapper<u8>>());
        assert_eq!(ModelType::of::<OrderLine>(), ModelType::of::<OrderLine>());
        assert_ne!(ModelType::declared("orderline"), ModelType::of::<OrderLine>());
        assert_eq!(ModelType::declared("orderline").default_table_name(), "orderline");
    }

    #[test]
    fn test_identity_only_schema() {
        let table = IdentityOnly
            .create_schema(SchemaBuilder::new("plain"))
            .unwrap()
            .unwrap();
        assert_eq!(
            table.create_sql(),
            "CREATE TABLE plain (_id INTEGER PRIMARY KEY AUTOINCREMENT);"
        );
        assert!(IdentityOnly
            .upgrade_schema(SchemaUpgrader::new("plain"), 1)
            .unwrap()
            .is_none());
    }
}
