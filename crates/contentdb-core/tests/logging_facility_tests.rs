#![allow(clippy::unwrap_used, clippy::expect_used)]

use contentdb_core::errors::{ContentDbError, ExError, ExErrorKind};
use contentdb_core::logging_facility::test_capture::init_test_capture;
use contentdb_core::{log_op_end, log_op_error, log_op_start};
use contentdb_core_types::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_DURATION_MS, FIELD_ERR_CODE, FIELD_TABLE,
};

#[test]
fn test_start_and_end_events_are_captured() {
    let capture = init_test_capture();
    let op_name = "logging_start_end_unique_1";

    log_op_start!(op_name, table = "orders");
    log_op_end!(op_name, duration_ms = 42);

    capture.assert_event_exists(op_name, EVENT_START);
    capture.assert_event_exists(op_name, EVENT_END);

    let events = capture.events_for(op_name);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].fields.get(FIELD_TABLE), Some(&"orders".to_string()));
    assert_eq!(events[1].fields.get(FIELD_DURATION_MS), Some(&"42".to_string()));
}

#[test]
fn test_error_event_carries_code() {
    let capture = init_test_capture();
    let op_name = "logging_error_code_unique_2";

    let err = ContentDbError::NoRoute {
        resource_id: "content://contentdb/nothing".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 3);

    let events = capture.events_for(op_name);
    let error_event = events
        .iter()
        .find(|e| e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("Should have error event");
    assert_eq!(
        error_event.fields.get(FIELD_ERR_CODE),
        Some(&"ERR_NOT_FOUND".to_string())
    );
}

#[test]
fn test_conversion_keeps_entity() {
    let err = ContentDbError::NotNullWithoutDefault {
        table: "orders".to_string(),
        column: "total".to_string(),
    };
    let ex: ExError = err.into();
    assert_eq!(ex.kind(), ExErrorKind::SchemaConflict);
    assert_eq!(ex.entity_id(), Some("orders"));
    assert!(!ex.kind().is_recoverable());
}

#[test]
fn test_count_events_filters_by_predicate() {
    let capture = init_test_capture();
    let op1 = "logging_count_unique_3a";
    let op2 = "logging_count_unique_3b";

    log_op_start!(op1);
    log_op_start!(op2);
    log_op_end!(op1, duration_ms = 1);

    let starts = capture.count_events(|e| {
        e.event.as_deref() == Some(EVENT_START)
            && (e.op.as_deref() == Some(op1) || e.op.as_deref() == Some(op2))
    });
    assert_eq!(starts, 2);
}
