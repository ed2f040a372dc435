//! Nested transactions driven through a session

#[path = "testutils/mod.rs"]
mod testutils;

use querycache::{
    Discriminators, Param, ParamList, QueryError, Shape, TransactionState, Value,
};
use testutils::fake_db::FakeConnection;
use testutils::test_fixture::TestFixture;

const INSERT_ORDER: &str = "INSERT INTO orders (id) VALUES (1)";
const BAD_UPDATE: &str = "UPDATE missing SET x = 1";

fn orders_db() -> FakeConnection {
    FakeConnection::new()
        .with_rows("SELECT COUNT(*) FROM orders", &["n"], vec![vec![Value::Int(3)]])
        .failing(BAD_UPDATE, 1146, "Table 'missing' doesn't exist")
        .failing_prepare("SELEKT ?", 1064, "syntax error")
}

fn control_statements(fixture: &TestFixture) -> Vec<String> {
    fixture
        .db()
        .statements
        .iter()
        .filter(|s| *s != INSERT_ORDER && *s != BAD_UPDATE)
        .cloned()
        .collect()
}

#[test]
fn test_commit_without_errors() {
    let mut fixture = TestFixture::new(orders_db());

    fixture.session.begin().unwrap();
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 0, error_count: 0 })
    );
    fixture.session.execute(INSERT_ORDER).unwrap();
    assert!(fixture.session.complete().unwrap());

    assert_eq!(fixture.session.transaction_state(), None);
    assert_eq!(fixture.db().statements, vec!["BEGIN", INSERT_ORDER, "COMMIT"]);
}

#[test]
fn test_failed_statement_forces_rollback() {
    let mut fixture = TestFixture::new(orders_db());

    fixture.session.begin().unwrap();
    let err = fixture.session.execute(BAD_UPDATE).unwrap_err();
    assert!(matches!(err, QueryError::ExecuteFailed { code: 1146, .. }));
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 0, error_count: 1 })
    );

    assert!(!fixture.session.complete().unwrap());
    assert_eq!(fixture.session.transaction_state(), None);
    assert_eq!(control_statements(&fixture), vec!["BEGIN", "ROLLBACK"]);
}

#[test]
fn test_nested_failure_rolls_back_to_savepoint() {
    let mut fixture = TestFixture::new(orders_db());

    fixture.session.begin().unwrap();
    fixture.session.begin().unwrap();
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 1, error_count: 0 })
    );

    assert!(fixture.session.execute(BAD_UPDATE).is_err());
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 1, error_count: 1 })
    );

    assert!(!fixture.session.complete().unwrap());
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 0, error_count: 0 })
    );

    assert!(fixture.session.complete().unwrap());
    assert_eq!(
        control_statements(&fixture),
        vec!["BEGIN", "SAVEPOINT level1", "ROLLBACK TO SAVEPOINT level1", "COMMIT"]
    );
}

#[test]
fn test_nested_success_releases_savepoints() {
    let mut fixture = TestFixture::new(orders_db());

    for _ in 0..3 {
        fixture.session.begin().unwrap();
    }
    for _ in 0..3 {
        assert!(fixture.session.complete().unwrap());
    }
    assert_eq!(
        fixture.db().statements,
        vec![
            "BEGIN",
            "SAVEPOINT level1",
            "SAVEPOINT level2",
            "RELEASE SAVEPOINT level2",
            "RELEASE SAVEPOINT level1",
            "COMMIT",
        ]
    );
}

#[test]
fn test_outer_errors_reach_inner_levels() {
    let mut fixture = TestFixture::new(orders_db());

    fixture.session.begin().unwrap();
    assert!(fixture.session.execute(BAD_UPDATE).is_err());
    fixture.session.begin().unwrap();

    assert!(!fixture.session.complete().unwrap());
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 0, error_count: 1 })
    );
    assert!(!fixture.session.complete().unwrap());
    assert_eq!(
        control_statements(&fixture),
        vec![
            "BEGIN",
            "SAVEPOINT level1",
            "ROLLBACK TO SAVEPOINT level1",
            "ROLLBACK"
        ]
    );
}

#[test]
fn test_application_recorded_error() {
    let mut fixture = TestFixture::new(orders_db());

    assert!(!fixture.session.record_error());
    fixture.session.begin().unwrap();
    assert!(fixture.session.record_error());
    assert!(!fixture.session.complete().unwrap());
    assert_eq!(fixture.db().statements, vec!["BEGIN", "ROLLBACK"]);
}

#[test]
fn test_errors_outside_transaction_are_not_counted() {
    let mut fixture = TestFixture::new(orders_db());

    assert!(fixture.session.execute(BAD_UPDATE).is_err());
    assert_eq!(fixture.session.transaction_state(), None);

    fixture.session.begin().unwrap();
    assert!(fixture.session.complete().unwrap());
}

#[test]
fn test_complete_without_transaction() {
    let mut fixture = TestFixture::new(orders_db());

    assert_eq!(
        fixture.session.complete().unwrap_err(),
        QueryError::NoActiveTransaction
    );
    assert!(fixture.db().statements.is_empty());
}

#[test]
fn test_explicit_rollback() {
    let mut fixture = TestFixture::new(orders_db());

    fixture.session.begin().unwrap();
    fixture.session.begin().unwrap();
    fixture.session.rollback().unwrap();
    assert_eq!(
        fixture.session.transaction_state(),
        Some(TransactionState { level: 0, error_count: 0 })
    );
    fixture.session.rollback().unwrap();
    assert_eq!(fixture.session.transaction_state(), None);

    // Idle rollback is passed through to the database
    fixture.session.rollback().unwrap();
    assert_eq!(
        fixture.db().statements,
        vec![
            "BEGIN",
            "SAVEPOINT level1",
            "ROLLBACK TO SAVEPOINT level1",
            "ROLLBACK",
            "ROLLBACK"
        ]
    );
}

#[test]
fn test_prepare_failure_counts_against_transaction() {
    let mut fixture = TestFixture::new(orders_db());
    let params = ParamList::new(vec![Param::from(1)]).unwrap();

    fixture.session.begin().unwrap();
    let err = fixture
        .session
        .pget(Shape::One, "SELEKT ?", &params)
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::PrepareFailed {
            sql: "SELEKT ?".to_string(),
            code: 1064,
            message: "syntax error".to_string(),
        }
    );
    assert_eq!(fixture.session.transaction_state().unwrap().error_count, 1);
    assert!(fixture.db().open_statements.is_empty());
}

#[test]
fn test_cache_hits_inside_transaction_skip_database() {
    let mut fixture = TestFixture::new(orders_db());
    let none = Discriminators::none();
    let count_sql = "SELECT COUNT(*) FROM orders";

    fixture
        .session
        .cache_get(Shape::One, None, count_sql, &none)
        .unwrap();

    fixture.session.begin().unwrap();
    let cached = fixture
        .session
        .cache_get(Shape::One, None, count_sql, &none)
        .unwrap();
    assert_eq!(cached.as_one(), Some(&Value::Int(3)));
    assert!(fixture
        .session
        .cache_get(Shape::One, None, BAD_UPDATE, &none)
        .is_err());
    assert!(!fixture.session.complete().unwrap());

    assert_eq!(fixture.db().executions_of(count_sql), 1);
}
