//! Running queries against SQLite databases.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use query_engine_execution::driver::ConnectSettings;
use query_engine_execution::interceptors::{InvalidateOnWrite, WriteDuplicator};
use query_engine_execution::{Connection, ConnectionRegistry, DestinationResolver, Error};
use query_engine_sql::sql::helpers::{Limit, Record, SearchOptions};
use query_engine_sql::sql::{Param, ParamList, Params, Value};
use querygate_configuration::{Configuration, ResolvedDestination};
use querygate_sqlite::{health, state, SqliteConnector};
use tests_common::fake::StaticResolver;
use tests_common::helpers::init_logging;

const CREATE_USERS: &str =
    "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, score REAL)";

fn registry() -> ConnectionRegistry<StaticResolver, SqliteConnector> {
    init_logging();
    ConnectionRegistry::new(
        StaticResolver::new([("default", "sqlite::memory:")]),
        SqliteConnector,
    )
}

fn with_users(db: &mut Connection) {
    db.execute(CREATE_USERS, Params::none()).unwrap();
    for name in ["alice", "bob", "carol"] {
        db.insert("users", &record(&[("name", Value::from(name))]))
            .unwrap();
    }
}

fn record(entries: &[(&str, Value)]) -> Record {
    entries
        .iter()
        .map(|(column, value)| ((*column).to_string(), value.clone()))
        .collect()
}

fn names(db: &mut Connection) -> Vec<String> {
    db.rows("SELECT name FROM users ORDER BY id", Params::none())
        .unwrap()
        .into_iter()
        .map(|row| row["name"].to_string())
        .collect()
}

#[test]
fn convenience_operations() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    with_users(db);

    assert_eq!(db.last_insert_id().unwrap(), Some(3));
    assert_eq!(db.row_count(), 1);

    let bob = db
        .row("SELECT id, name FROM users WHERE name = ?", Params::values(["bob"]))
        .unwrap()
        .unwrap();
    assert_eq!(bob["id"], Value::Int(2));

    assert_eq!(
        db.value("SELECT COUNT(*) FROM users", Params::none()).unwrap(),
        Some(Value::Int(3))
    );
    assert_eq!(
        db.value("SELECT name FROM users WHERE id = 99", Params::none())
            .unwrap(),
        None
    );

    let updated = db
        .update(
            "users",
            &record(&[("score", Value::Float(1.5))]),
            &record(&[("name", Value::from("bob"))]),
        )
        .unwrap();
    assert_eq!(updated, 1);

    db.replace(
        "users",
        &record(&[("id", Value::Int(2)), ("name", Value::from("robert"))]),
    )
    .unwrap();
    assert_eq!(names(db), vec!["alice", "robert", "carol"]);

    let found = db
        .search(
            "users",
            "id IN (?)",
            Params::positional([Param::list([1, 2, 3])]),
            &SearchOptions {
                select_expr: Some("name".to_string()),
                order: Some("id DESC".to_string()),
                limit: Some(Limit::Range {
                    offset: 1,
                    count: 10,
                }),
            },
        )
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0]["name"], Value::from("robert"));
}

#[test]
fn positional_and_named_lists_select_the_same_rows() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    with_users(db);

    let positional = db
        .rows(
            "SELECT name FROM users WHERE id IN (?) AND name <> ? ORDER BY id",
            Params::positional([Param::list([1, 3]), Param::scalar("nobody")]),
        )
        .unwrap();
    let named = db
        .rows(
            "SELECT name FROM users WHERE id IN (:ids) AND name <> :name ORDER BY id",
            Params::named([
                (":ids", Param::list([1, 3])),
                ("name", Param::scalar("nobody")),
            ]),
        )
        .unwrap();
    assert_eq!(positional, named);
    assert_eq!(positional.len(), 2);

    // the same list used twice expands and binds identically
    let union = db
        .rows(
            "SELECT id FROM users WHERE id IN (:ids) UNION ALL SELECT id FROM users WHERE id IN (:ids)",
            Params::named([("ids", Param::list([2]))]),
        )
        .unwrap();
    assert_eq!(union.len(), 2);

    // an empty list binds NULL, which matches nothing
    let none = db
        .rows(
            "SELECT id FROM users WHERE id IN (?)",
            Params::positional([Param::List(ParamList::new())]),
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn colons_inside_literals_are_not_bind_names() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();

    let time = db
        .value(
            "SELECT '10:30' AS t WHERE 1 IN (:ids)",
            Params::named([("ids", Param::list([1, 2]))]),
        )
        .unwrap();
    assert_eq!(time, Some(Value::from("10:30")));

    let row = db
        .row(
            "SELECT \"a:b\" AS quoted, :at AS at FROM (SELECT 1 AS \"a:b\")",
            Params::named([("at", Param::scalar("x"))]),
        )
        .unwrap()
        .unwrap();
    assert_eq!(row["quoted"], Value::Int(1));
    assert_eq!(row["at"], Value::from("x"));
}

#[test]
fn row_count_excludes_trigger_changes() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    with_users(db);
    db.execute("CREATE TABLE audit (user_id INTEGER)", Params::none())
        .unwrap();
    db.execute(
        "CREATE TRIGGER users_audit AFTER UPDATE ON users BEGIN \
         INSERT INTO audit VALUES (NEW.id); INSERT INTO audit VALUES (NEW.id); END",
        Params::none(),
    )
    .unwrap();

    let updated = db
        .execute(
            "UPDATE users SET score = 2.0 WHERE name = ?",
            Params::values(["alice"]),
        )
        .unwrap();
    assert_eq!(updated, 1);
    assert_eq!(db.row_count(), 1);
    assert_eq!(
        db.value("SELECT COUNT(*) FROM audit", Params::none()).unwrap(),
        Some(Value::Int(2))
    );
}

#[test]
fn values_round_trip_by_storage_class() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();

    let row = db
        .row(
            "SELECT ? AS i, ? AS f, ? AS t, ? AS b, ? AS n, ? AS flag",
            Params::values([
                Value::Int(7),
                Value::Float(0.5),
                Value::from("text"),
                Value::Blob(vec![0, 1, 2]),
                Value::Null,
                Value::Bool(true),
            ]),
        )
        .unwrap()
        .unwrap();

    assert_eq!(
        row.into_values().collect::<Vec<_>>(),
        vec![
            Value::Int(7),
            Value::Float(0.5),
            Value::from("text"),
            Value::Blob(vec![0, 1, 2]),
            Value::Null,
            Value::Int(1),
        ]
    );
}

#[test]
fn rolled_back_transactions_leave_no_rows() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    db.execute(CREATE_USERS, Params::none()).unwrap();

    let outcome: Result<(), Error> = db.transaction(|db| {
        db.insert("users", &record(&[("name", Value::from("dave"))]))?;
        db.transaction(|db| {
            db.insert("users", &record(&[("name", Value::from("erin"))]))?;
            db.execute("INSERT INTO missing_table VALUES (1)", Params::none())?;
            Ok(())
        })
    });
    assert!(matches!(outcome, Err(Error::QueryFailed { .. })));
    assert_eq!(db.transaction_depth(), 0);
    assert!(names(db).is_empty());

    db.transaction(|db| db.insert("users", &record(&[("name", Value::from("frank"))])))
        .unwrap();
    assert_eq!(names(db), vec!["frank"]);
}

#[test]
fn failures_carry_the_expanded_sql() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();

    let err = db
        .execute(
            "SELECT * FROM nowhere WHERE id IN (?)",
            Params::positional([Param::list([1, 2])]),
        )
        .unwrap_err();
    match err {
        Error::QueryFailed { sql, source } => {
            assert_eq!(sql, "SELECT * FROM nowhere WHERE id IN (?, ?)");
            assert!(source.to_string().contains("no such table"));
        }
        other => panic!("expected a query failure, got {other:?}"),
    }
}

#[test]
fn cursors_iterate_once() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    with_users(db);

    let mut cursor = db
        .cursor("SELECT name FROM users ORDER BY id", Params::none())
        .unwrap();
    let seen: Vec<usize> = cursor.iterate().unwrap().map(|(position, _)| position).collect();
    assert_eq!(seen, vec![0, 1, 2]);

    let err = cursor.iterate().unwrap_err();
    assert_eq!(err.to_string(), "Can only iterate a result once");
}

#[test]
fn writes_invalidate_cached_entries() {
    let mut registry = registry();
    let cache: Arc<Mutex<BTreeSet<String>>> = Arc::default();
    let evict = cache.clone();
    registry.add_interceptor(InvalidateOnWrite::new("users", move |key: Option<&Value>| {
        if let Some(key) = key {
            evict.lock().unwrap().remove(&format!("user:{key}"));
        }
    }));

    let db = registry.conn(None).unwrap();
    with_users(db);
    cache
        .lock()
        .unwrap()
        .extend(["user:1".to_string(), "user:2".to_string()]);

    db.execute("DELETE FROM users WHERE id = ?", Params::values([1]))
        .unwrap();
    assert_eq!(
        cache.lock().unwrap().iter().cloned().collect::<Vec<_>>(),
        vec!["user:2".to_string()]
    );

    cache.lock().unwrap().insert("user:1".to_string());
    db.execute(
        "UPDATE users SET name = 'B A R' WHERE id = ?",
        Params::values([2]),
    )
    .unwrap();
    assert_eq!(
        cache.lock().unwrap().iter().cloned().collect::<Vec<_>>(),
        vec!["user:1".to_string()]
    );
}

#[test]
fn inserts_are_duplicated_into_the_copy_table() {
    let mut registry = registry();
    registry.add_interceptor(WriteDuplicator::new("users", "users_copy"));

    let db = registry.conn(None).unwrap();
    db.execute(CREATE_USERS, Params::none()).unwrap();
    db.execute(
        "CREATE TABLE users_copy (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, score REAL)",
        Params::none(),
    )
    .unwrap();

    db.insert("users", &record(&[("name", Value::from("foo"))]))
        .unwrap();
    db.execute(
        "UPDATE users SET name = ? WHERE id = 1",
        Params::values(["bar"]),
    )
    .unwrap();

    assert_eq!(
        db.value("SELECT name FROM users_copy", Params::none()).unwrap(),
        Some(Value::from("foo"))
    );
    assert_eq!(names(db), vec!["bar"]);

    registry.clear_interceptors();
    let db = registry.conn(None).unwrap();
    db.insert("users", &record(&[("name", Value::from("baz"))]))
        .unwrap();
    assert_eq!(
        db.value("SELECT COUNT(*) FROM users_copy", Params::none())
            .unwrap(),
        Some(Value::Int(1))
    );
}

#[test]
fn interceptors_see_transaction_boundaries() {
    let mut registry = registry();
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let record_sql = seen.clone();
    registry.add_interceptor(query_engine_execution::interceptor::interceptor_fn(
        move |mut next, query| {
            record_sql.lock().unwrap().push(query.sql.clone());
            next.run(query)
        },
    ));

    let db = registry.conn(None).unwrap();
    db.begin().unwrap();
    db.begin().unwrap();
    db.commit().unwrap();
    db.commit().unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["BEGIN".to_string(), "COMMIT".to_string()]
    );
}

#[test]
fn health_check_and_disconnect() {
    let mut registry = registry();
    let db = registry.conn(None).unwrap();
    health::health_check(db).unwrap();

    db.disconnect().unwrap();
    assert!(matches!(
        health::health_check(db),
        Err(Error::NotConnected)
    ));
    assert!(registry.is_empty());
}

#[test]
fn driver_options_become_pragmas() {
    struct WithPragma;

    impl DestinationResolver for WithPragma {
        fn resolve(
            &self,
            _destination: Option<&str>,
        ) -> Result<ConnectSettings, query_engine_execution::error::ResolveError> {
            let mut settings = ConnectSettings::new("sqlite::memory:");
            settings
                .options
                .insert("user_version".to_string(), "42".to_string());
            Ok(settings)
        }
    }

    init_logging();
    let mut registry = ConnectionRegistry::new(WithPragma, SqliteConnector);
    let version = registry
        .conn(None)
        .unwrap()
        .value("PRAGMA user_version", Params::none())
        .unwrap();
    assert_eq!(version, Some(Value::Int(42)));
}

#[test]
fn unreachable_databases_fail_to_connect() {
    init_logging();
    let mut registry = ConnectionRegistry::new(
        StaticResolver::new([("default", "sqlite:///nonexistent-dir/db.sqlite?mode=ro")]),
        SqliteConnector,
    );
    assert!(matches!(
        registry.conn(None),
        Err(Error::Connect { .. })
    ));
}

#[test]
fn reconnecting_reopens_the_same_database_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("users.db").display());
    let mut registry = ConnectionRegistry::new(
        StaticResolver::new([("default", dsn.as_str())]),
        SqliteConnector,
    );

    let db = registry.conn(None).unwrap();
    with_users(db);
    db.disconnect().unwrap();

    let db = registry.conn(None).unwrap();
    assert!(db.is_connected());
    assert_eq!(names(db), vec!["alice", "bob", "carol"]);
}

#[test]
fn state_reports_open_connections() {
    init_logging();
    let configuration = Configuration {
        destinations: BTreeMap::from([(
            "default".to_string(),
            ResolvedDestination {
                dsn: "sqlite::memory:".to_string(),
                username: None,
                password: None,
                driver_options: BTreeMap::new(),
            },
        )]),
    };
    let mut metrics_registry = prometheus::Registry::new();
    let mut state = state::create_state(configuration, &mut metrics_registry).unwrap();

    state.update_metrics();
    assert_eq!(state.metrics.connections_open.get(), 0);

    state
        .registry
        .conn(None)
        .unwrap()
        .execute("SELECT 1", Params::none())
        .unwrap();
    state.update_metrics();
    assert_eq!(state.metrics.connections_open.get(), 1);
    assert_eq!(state.metrics.query_total.get(), 1);

    state.registry.reset().unwrap();
    state.update_metrics();
    assert_eq!(state.metrics.connections_open.get(), 0);
}
