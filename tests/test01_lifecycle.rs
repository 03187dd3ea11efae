mod common;

use common::{Call, ScriptedDriver, connected};
use mssql_connection::prelude::*;

#[test]
fn connect_builds_connection_string_and_reports_true() {
    let driver = ScriptedDriver::new();
    let mut manager = DatabaseManager::new(driver.clone());
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    let connected = manager
        .connect("db.local", "sales", "sa", "secret", "30")
        .unwrap();

    assert!(connected);
    assert!(manager.is_connected());
    assert_eq!(
        driver.calls(),
        vec![Call::Connect(
            "Driver={ODBC Driver 18 for SQL Server};Server=db.local;Database=sales;UID=sa;\
             PWD=secret;TrustServerCertificate=yes;Connection Timeout=30;"
                .to_string()
        )]
    );
}

#[test]
fn disconnect_is_idempotent() {
    let driver = ScriptedDriver::new();
    let mut manager = connected(&driver);

    manager.disconnect().unwrap();
    manager.disconnect().unwrap();

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert_eq!(driver.close_count(), 1);
}

#[test]
fn operations_without_connection_never_reach_the_driver() {
    let driver = ScriptedDriver::new();
    let mut manager = DatabaseManager::new(driver.clone());

    let errors = vec![
        manager.get_data("SELECT 1").unwrap_err(),
        manager.write_data("DELETE FROM t").unwrap_err(),
        manager
            .execute_parameterized_query("SELECT ?", &["a".to_string()])
            .unwrap_err(),
        // Parameter mismatch would also fail, but the missing connection is reported first.
        manager
            .execute_parameterized_query("SELECT ?", &[])
            .unwrap_err(),
        manager.query("SELECT 1", &[]).unwrap_err(),
        manager.execute("DELETE FROM t", &[]).unwrap_err(),
    ];

    for err in errors {
        assert!(matches!(err, MssqlConnectionError::NotConnected), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.to_string(), "Not connected to the database.");
    }
    assert!(driver.calls().is_empty());
}

#[test]
fn failed_connect_surfaces_diagnostic_and_stays_disconnected() {
    let driver = ScriptedDriver::new();
    driver.fail_next_connect(DiagnosticRecord::new(
        "28000",
        18456,
        "Login failed for user 'sa'.",
    ));
    let mut manager = DatabaseManager::new(driver.clone());

    let err = manager
        .connect("db.local", "sales", "sa", "wrong", "5")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Database);
    assert_eq!(
        err.to_string(),
        "SQL Error State: 28000, Native Error Code: 18456, Message: Login failed for user 'sa'."
    );
    assert!(!manager.is_connected());
    assert_eq!(
        manager.get_data("SELECT 1").unwrap_err().kind(),
        ErrorKind::Precondition
    );
}

#[test]
fn reconnecting_releases_the_previous_connection_first() {
    let driver = ScriptedDriver::new();
    let mut manager = connected(&driver);

    manager
        .connect("other.local", "hr", "sa", "secret", "15")
        .unwrap();

    let calls = driver.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::Connect(_)));
    assert_eq!(calls[1], Call::Close);
    assert!(matches!(&calls[2], Call::Connect(s) if s.contains("Server=other.local;")));
    assert!(manager.is_connected());
}

#[test]
fn disconnect_failure_is_unknown_and_still_disconnects() {
    let driver = ScriptedDriver::new();
    driver.fail_close(DiagnosticRecord::new("08003", 0, "Connection not open"));
    let mut manager = connected(&driver);

    let err = manager.disconnect().unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert!(err.to_string().contains("Connection not open"));
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    manager.disconnect().unwrap();
}

#[test]
fn panic_during_connect_becomes_unknown_error() {
    let driver = ScriptedDriver::new();
    driver.panic_on_connect();
    let mut manager = DatabaseManager::new(driver);

    let err = manager
        .connect("db.local", "sales", "sa", "secret", "15")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(
        err.to_string(),
        "An unknown error occurred in connect: driver exploded while connecting"
    );
    assert!(!manager.is_connected());
}

#[test]
fn dropping_a_connected_manager_disconnects() {
    let driver = ScriptedDriver::new();
    {
        let _manager = connected(&driver);
    }
    assert_eq!(driver.close_count(), 1);
}

#[test]
fn hostile_fields_cannot_add_connection_attributes() {
    let driver = ScriptedDriver::new();
    let mut manager = DatabaseManager::new(driver.clone());

    manager
        .connect("db.local", "sales;Encrypt=no", "sa", "p;w", "15")
        .unwrap();

    let Call::Connect(conn_str) = &driver.calls()[0] else {
        panic!("expected a connect call");
    };
    assert!(conn_str.contains("Database={sales;Encrypt=no};"));
    assert!(conn_str.contains("PWD={p;w};"));
}
