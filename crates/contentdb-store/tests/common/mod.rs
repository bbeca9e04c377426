#![allow(dead_code)]

use contentdb_core::{
    ContentValues, DataModel, Registry, Result, SchemaBuilder, SchemaUpgrader, TableCreator,
    TableDefinition,
};

pub const AUTHORITY: &str = "contentdb";

pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
}

impl DataModel for Customer {
    fn populate_values(&self, values: &mut ContentValues) {
        values.put("name", self.name.as_str());
        values.put("email", self.email.as_str());
    }

    fn row_id(&self) -> Option<i64> {
        self.id
    }
}

pub struct CustomerTable;

impl TableCreator for CustomerTable {
    fn create_schema(&self, builder: SchemaBuilder) -> Result<Option<TableDefinition>> {
        builder
            .add_text_column("name")
            .add_text_column("email")
            .unique()
            .build()
            .map(Some)
    }
}

pub struct Purchase {
    pub customer: i64,
    pub total: f64,
}

impl DataModel for Purchase {
    fn populate_values(&self, values: &mut ContentValues) {
        values.put("customer", self.customer);
        values.put("total", self.total);
    }
}

pub struct PurchaseTable;

impl TableCreator for PurchaseTable {
    fn create_schema(&self, builder: SchemaBuilder) -> Result<Option<TableDefinition>> {
        builder
            .add_integer_column("customer")
            .add_real_column("total")
            .not_null()
            .default_value(0.0)
            .index(&["customer"])
            .build()
            .map(Some)
    }

    fn upgrade_schema(
        &self,
        _upgrader: SchemaUpgrader,
        _old_version: u32,
    ) -> Result<Option<TableDefinition>> {
        Ok(None)
    }
}

pub fn registry() -> Registry {
    let mut registry = Registry::new(AUTHORITY);
    registry.register::<Customer>(CustomerTable).unwrap();
    registry.register::<Purchase>(PurchaseTable).unwrap();
    registry
}

pub fn customer_values(name: &str, email: &str) -> ContentValues {
    ContentValues::new().with("name", name).with("email", email)
}
