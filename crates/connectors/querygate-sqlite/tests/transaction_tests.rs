//! Statements reaching the database around nested transactions and disconnects.

use similar_asserts::assert_eq;

use query_engine_execution::{ConnectionRegistry, Error};
use query_engine_sql::sql::{Param, Params};
use tests_common::fake::{RecordingConnector, StaticResolver};
use tests_common::helpers::init_logging;

fn registry() -> (
    ConnectionRegistry<StaticResolver, RecordingConnector>,
    tests_common::fake::Recorder,
) {
    init_logging();
    let connector = RecordingConnector::default();
    let recorder = connector.recorder.clone();
    let resolver = StaticResolver::new([("default", "fake:main"), ("archive", "fake:archive")]);
    (ConnectionRegistry::new(resolver, connector), recorder)
}

#[test]
fn nested_commits_issue_exactly_one_begin_and_commit() {
    let (mut registry, recorder) = registry();
    let db = registry.conn(None).unwrap();

    db.begin().unwrap();
    db.begin().unwrap();
    db.execute("UPDATE users SET name = ?", Params::values(["foo"]))
        .unwrap();
    db.commit().unwrap();
    db.commit().unwrap();

    assert_eq!(
        recorder.statements(),
        vec![
            "BEGIN".to_string(),
            "UPDATE users SET name = ?".to_string(),
            "COMMIT".to_string()
        ]
    );
}

#[test]
fn rollback_of_a_nested_transaction_refuses_the_outer_commit() {
    let (mut registry, recorder) = registry();
    let db = registry.conn(None).unwrap();

    db.begin().unwrap();
    db.begin().unwrap();
    db.rollback().unwrap();
    let err = db.commit().unwrap_err();

    assert!(matches!(err, Error::TransactionIntegrity));
    assert_eq!(
        err.to_string(),
        "Cannot commit because a nested transaction was rolled back"
    );
    assert_eq!(recorder.count("COMMIT"), 0);
    assert_eq!(recorder.count("ROLLBACK"), 0);
}

#[test]
fn a_failed_commit_keeps_the_transaction_open() {
    let (mut registry, recorder) = registry();
    recorder.fail_on("COMMIT");
    let db = registry.conn(None).unwrap();

    db.begin().unwrap();
    assert!(matches!(db.commit(), Err(Error::QueryFailed { ref sql, .. }) if sql == "COMMIT"));
    assert_eq!(db.transaction_depth(), 1);

    db.rollback().unwrap();
    assert_eq!(db.transaction_depth(), 0);
}

#[test]
fn disconnecting_inside_a_transaction_fails() {
    let (mut registry, recorder) = registry();
    let db = registry.conn(None).unwrap();

    db.begin().unwrap();
    let err = db.disconnect().unwrap_err();
    assert!(matches!(err, Error::TransactionState));
    assert_eq!(
        err.to_string(),
        "Cannot disconnect while a transaction is in progress"
    );
    assert_eq!(recorder.closed(), 0);
}

#[test]
fn queries_after_disconnect_are_refused() {
    let (mut registry, recorder) = registry();
    let db = registry.conn(None).unwrap();

    db.disconnect().unwrap();
    assert_eq!(recorder.closed(), 1);
    assert!(matches!(
        db.execute("SELECT 1", Params::none()),
        Err(Error::NotConnected)
    ));
    assert!(matches!(db.rollback(), Err(Error::NotConnected)));

    // the registry opens a fresh connection on the next request
    assert!(registry.conn(None).unwrap().is_connected());
    assert_eq!(recorder.opened(), 2);
}

#[test]
fn transactions_are_per_connection() {
    let (mut registry, recorder) = registry();

    registry.conn(None).unwrap().begin().unwrap();
    registry.conn(Some("archive")).unwrap().begin().unwrap();
    registry.conn(Some("archive")).unwrap().commit().unwrap();

    assert_eq!(registry.conn(None).unwrap().transaction_depth(), 1);
    assert_eq!(recorder.statements_on("fake:main"), vec!["BEGIN".to_string()]);
    assert_eq!(
        recorder.statements_on("fake:archive"),
        vec!["BEGIN".to_string(), "COMMIT".to_string()]
    );
}

#[test]
fn list_parameters_reach_the_driver_expanded() {
    let (mut registry, recorder) = registry();
    let db = registry.conn(None).unwrap();

    db.rows(
        "SELECT * FROM users WHERE id IN (?) AND status = ?",
        Params::positional([Param::list([10, 20, 30]), Param::scalar("active")]),
    )
    .unwrap();

    assert_eq!(
        recorder.statements(),
        vec!["SELECT * FROM users WHERE id IN (?, ?, ?) AND status = ?".to_string()]
    );
    assert_eq!(recorder.params()[0].len(), 4);
}
