#![allow(clippy::unwrap_used, clippy::expect_used)]

// CRUD, routing and join behaviour of the content provider

mod common;

use common::{customer_values, registry, Customer, Purchase};
use contentdb_core::{
    ConflictRule, ContentValues, ExErrorKind, ProjectionMap, QueryRequest, ResourceId, Result,
    SchemaBuilder, SchemaUpgrader, TableCreator, TableDefinition, Value,
};
use contentdb_store::{ContentProvider, StoreConfig};

fn provider() -> ContentProvider {
    ContentProvider::new(StoreConfig::in_memory(1), registry()).unwrap()
}

fn count(provider: &ContentProvider, id: &ResourceId) -> usize {
    provider.query(id, &QueryRequest::new()).unwrap().len()
}

#[test]
fn test_opens_lazily() {
    let provider = provider();
    assert!(!provider.is_open());

    let customers = provider.registry().resource_id::<Customer>().unwrap();
    assert_eq!(count(&provider, &customers), 0);
    assert!(provider.is_open());
    assert_eq!(
        provider.last_migration().unwrap().created,
        vec!["customer", "purchase"]
    );
}

#[test]
fn test_bulk_insert_commits_all_rows() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    let rows = vec![
        customer_values("ada", "ada@example.com"),
        customer_values("bob", "bob@example.com"),
        customer_values("cy", "cy@example.com"),
    ];
    assert_eq!(provider.bulk_insert(&customers, &rows).unwrap(), 3);
    assert_eq!(count(&provider, &customers), 3);
}

#[test]
fn test_bulk_insert_is_all_or_nothing() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    let rows = vec![
        customer_values("ada", "same@example.com"),
        customer_values("bob", "same@example.com"),
        customer_values("cy", "cy@example.com"),
    ];
    assert_eq!(provider.bulk_insert(&customers, &rows).unwrap(), 0);
    assert_eq!(count(&provider, &customers), 0);
}

#[test]
fn test_single_insert_constraint_violation_propagates() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    provider
        .insert(&customers, &customer_values("ada", "ada@example.com"))
        .unwrap();
    let err = provider
        .insert(&customers, &customer_values("ada2", "ada@example.com"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert_eq!(err.entity_id(), Some("customer"));
}

#[test]
fn test_ignore_rule_skips_conflicting_row() {
    let config = StoreConfig::in_memory(1).with_conflict_rule("customer", ConflictRule::Ignore);
    let provider = ContentProvider::new(config, registry()).unwrap();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    assert!(provider
        .insert(&customers, &customer_values("ada", "ada@example.com"))
        .unwrap()
        .is_some());
    assert!(provider
        .insert(&customers, &customer_values("ada2", "ada@example.com"))
        .unwrap()
        .is_none());
    assert_eq!(count(&provider, &customers), 1);
}

#[test]
fn test_item_routing_scopes_reads_and_writes() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    let ada = provider
        .insert(&customers, &customer_values("ada", "ada@example.com"))
        .unwrap()
        .unwrap();
    provider
        .insert(&customers, &customer_values("bob", "bob@example.com"))
        .unwrap();
    assert_eq!(ada.as_str(), "content://contentdb/customer/1");

    let rows = provider.query(&ada, &QueryRequest::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.row(0).unwrap().get_string("name").as_deref(), Some("ada"));

    // the caller filter and the row predicate are conjoined
    let rows = provider
        .query(
            &ada,
            &QueryRequest::new().selection("name = ?", [Value::from("bob")]),
        )
        .unwrap();
    assert!(rows.is_empty());

    let updated = provider
        .update(
            &ada,
            &ContentValues::new().with("name", "ada lovelace"),
            None,
            &[],
        )
        .unwrap();
    assert_eq!(updated, 1);

    assert_eq!(provider.delete(&ada, None, &[]).unwrap(), 1);
    assert_eq!(count(&provider, &customers), 1);
}

#[test]
fn test_unknown_identifier_is_not_found() {
    let provider = provider();
    let err = provider
        .query(
            &ResourceId::from("content://contentdb/nothing"),
            &QueryRequest::new(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_join_query_with_default_projection() {
    let mut reg = registry();
    let join = reg
        .joined_resource_id::<Purchase, Customer>("customer", "_id", None)
        .unwrap();
    let provider = ContentProvider::new(StoreConfig::in_memory(1), reg).unwrap();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    let ada = Customer {
        id: None,
        name: "ada".to_string(),
        email: "ada@example.com".to_string(),
    };
    provider.save(&ada).unwrap();
    provider
        .bulk_insert_models(&[
            Purchase {
                customer: 1,
                total: 12.5,
            },
            Purchase {
                customer: 99,
                total: 3.0,
            },
        ])
        .unwrap();
    assert_eq!(count(&provider, &customers), 1);

    let projection = provider.join_projection(&join).unwrap();
    assert_eq!(projection.get("_id"), Some("purchase._id AS _id"));
    assert_eq!(
        projection.get("customer_name"),
        Some("customer.name AS customer_name")
    );

    let rows = provider
        .query(&join, &QueryRequest::new().sort_order("purchase._id"))
        .unwrap();
    assert_eq!(rows.len(), 2);

    let first = rows.row(0).unwrap().with_table_prefix("customer");
    assert_eq!(first.get_string("name").as_deref(), Some("ada"));
    assert_eq!(first.get_i64("_id"), Some(1));

    // left outer join keeps the purchase without a customer
    let second = rows.row(1).unwrap();
    assert_eq!(second.get_f64("purchase_total"), Some(3.0));
    assert!(second.is_null("customer_name"));
}

struct Note;

/// Upgrades from version 1 by rebuilding; `legacy` never reaches the table
struct NoteTable;

impl TableCreator for NoteTable {
    fn create_schema(&self, builder: SchemaBuilder) -> Result<Option<TableDefinition>> {
        builder.add_integer_column("customer").build().map(Some)
    }

    fn upgrade_schema(
        &self,
        upgrader: SchemaUpgrader,
        old_version: u32,
    ) -> Result<Option<TableDefinition>> {
        if old_version < 2 {
            return upgrader
                .add_text_column("legacy")
                .recreate()
                .build()
                .map(Some);
        }
        Ok(None)
    }
}

#[test]
fn test_join_query_on_unopened_store_uses_physical_columns() {
    let mut reg = registry();
    reg.register::<Note>(NoteTable).unwrap();
    let join = reg
        .joined_resource_id::<Note, Customer>("customer", "_id", None)
        .unwrap();
    let provider = ContentProvider::new(StoreConfig::in_memory(2), reg).unwrap();
    assert!(!provider.is_open());

    let rows = provider.query(&join, &QueryRequest::new()).unwrap();
    assert!(rows.is_empty());

    let projection = provider.join_projection(&join).unwrap();
    assert_eq!(
        projection.get("note_customer"),
        Some("note.customer AS note_customer")
    );
    assert_eq!(projection.get("note_legacy"), None);

    // the cached projection keeps serving later queries
    let notes = provider.registry().resource_id::<Note>().unwrap();
    provider
        .insert(&notes, &ContentValues::new().with("customer", 1i64))
        .unwrap();
    assert_eq!(provider.query(&join, &QueryRequest::new()).unwrap().len(), 1);
}

#[test]
fn test_collection_projection_map_aliases_columns() {
    let mut reg = registry();
    let customers = reg.resource_id::<Customer>().unwrap();
    let mut aliases = ProjectionMap::new();
    aliases.insert("who", "name AS who");
    reg.set_projection_map(&customers, aliases);

    let provider = ContentProvider::new(StoreConfig::in_memory(1), reg).unwrap();
    provider
        .insert(&customers, &customer_values("ada", "ada@example.com"))
        .unwrap();

    let rows = provider
        .query(&customers, &QueryRequest::new().columns(&["who", "email"]))
        .unwrap();
    assert_eq!(rows.columns(), ["who".to_string(), "email".to_string()]);
    let row = rows.row(0).unwrap();
    assert_eq!(row.get_string("who").as_deref(), Some("ada"));
    assert_eq!(row.get_string("email").as_deref(), Some("ada@example.com"));
}

#[test]
fn test_join_rejects_writes() {
    let mut reg = registry();
    let join = reg
        .joined_resource_id::<Purchase, Customer>("customer", "_id", None)
        .unwrap();
    let provider = ContentProvider::new(StoreConfig::in_memory(1), reg).unwrap();

    let err = provider
        .insert(&join, &customer_values("ada", "ada@example.com"))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotWritable);
    assert_eq!(
        provider.delete(&join, None, &[]).unwrap_err().kind(),
        ExErrorKind::NotWritable
    );
}

#[test]
fn test_save_updates_known_rows() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();

    let mut ada = Customer {
        id: None,
        name: "ada".to_string(),
        email: "ada@example.com".to_string(),
    };
    let item = provider.save(&ada).unwrap().unwrap();
    ada.id = item.last_segment().and_then(|s| s.parse().ok());
    ada.name = "ada lovelace".to_string();

    assert_eq!(provider.save(&ada).unwrap(), Some(item.clone()));
    let rows = provider.query(&item, &QueryRequest::new()).unwrap();
    assert_eq!(
        rows.row(0).unwrap().get_string("name").as_deref(),
        Some("ada lovelace")
    );
    assert_eq!(count(&provider, &customers), 1);
}

#[test]
fn test_wipe_clears_every_table() {
    let provider = provider();
    let customers = provider.registry().resource_id::<Customer>().unwrap();
    let purchases = provider.registry().resource_id::<Purchase>().unwrap();

    provider
        .insert(&customers, &customer_values("ada", "ada@example.com"))
        .unwrap();
    provider
        .bulk_insert_models(&[Purchase {
            customer: 1,
            total: 1.0,
        }])
        .unwrap();

    assert_eq!(provider.wipe().unwrap(), 2);
    assert_eq!(count(&provider, &customers), 0);
    assert_eq!(count(&provider, &purchases), 0);
}

#[test]
fn test_authority_mismatch_is_configuration_error() {
    let config = StoreConfig::in_memory(1).with_authority("other");
    let err = ContentProvider::new(config, registry()).err().unwrap();
    assert_eq!(err.kind(), ExErrorKind::Configuration);
}
