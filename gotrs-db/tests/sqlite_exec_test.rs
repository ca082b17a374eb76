use std::collections::HashMap;
use std::time::Duration;

use gotrs_db::{Condition, Driver, DriverOptions, DriverRegistry, Error, Migrator, Row, SchemaRegistry, Value};

const SCHEMA: &str = r#"
queue:
  columns:
    id: serial
    name: { type: varchar(200), required: true, unique: true }
    valid_id: { type: smallint, required: true, default: 1 }
  timestamps: true
  indexes: [valid_id]

ticket:
  columns:
    id: bigserial
    tn: { type: varchar(50), required: true, unique: true }
    title: { type: varchar(255), required: true }
    queue_id: { type: integer, required: true }
  indexes: [queue_id]
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn connected() -> Result<(Box<dyn Driver>, SchemaRegistry), Box<dyn std::error::Error>> {
    init_logging();

    let mut schemas = SchemaRegistry::new();
    schemas.load_from_str(SCHEMA)?;

    let mut driver = DriverRegistry::with_builtins().get_driver("sqlite")?;
    driver.connect("sqlite::memory:").await?;
    Ok((driver, schemas))
}

fn queue_row(name: &str) -> HashMap<String, Value> {
    HashMap::from([("name".to_string(), Value::from(name))])
}

#[tokio::test]
async fn test_create_insert_select() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    assert!(driver.is_connected());
    driver.ping().await?;

    let ddl = driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?;
    driver.exec(&ddl.sql, &ddl.args).await?;
    assert!(driver.table_exists("queue").await?);
    assert!(!driver.table_exists("ticket").await?);

    let first = driver.exec_query(&driver.insert("queue", &queue_row("Postmaster"))?).await?;
    assert_eq!(first.rows_affected, 1);
    assert_eq!(first.last_insert_id, Some(1));

    let second = driver.exec_query(&driver.insert("queue", &queue_row("Raw"))?).await?;
    assert_eq!(second.last_insert_id, Some(2));

    let select = driver.select("queue", &["id", "name", "valid_id"], &[Condition::eq("name", "Raw")])?;
    let rows = driver.fetch_all(&select.sql, &select.args).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<i64, _>("id")?, 2);
    assert_eq!(rows[0].try_get::<String, _>("name")?, "Raw");
    assert_eq!(rows[0].try_get::<i64, _>("valid_id")?, 1);

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_update_and_delete() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    driver.exec_query(&driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?).await?;

    for name in ["Postmaster", "Raw", "Junk"] {
        driver.exec_query(&driver.insert("queue", &queue_row(name))?).await?;
    }

    let values = HashMap::from([("valid_id".to_string(), Value::from(2))]);
    let update = driver.update("queue", &values, &[Condition::eq("name", "Junk")])?;
    assert_eq!(driver.exec_query(&update).await?.rows_affected, 1);

    let delete = driver.delete("queue", &[Condition::eq("valid_id", 2)])?;
    assert_eq!(driver.exec_query(&delete).await?.rows_affected, 1);

    let remaining = driver.fetch_all("SELECT name FROM queue ORDER BY id", &[]).await?;
    let names: Vec<String> = remaining.iter().map(|r| r.try_get("name")).collect::<Result<_, _>>()?;
    assert_eq!(names, vec!["Postmaster", "Raw"]);

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_unique_violation_is_execution_error() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    driver.exec_query(&driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?).await?;

    let insert = driver.insert("queue", &queue_row("Raw"))?;
    driver.exec_query(&insert).await?;
    match driver.exec_query(&insert).await {
        Err(Error::Execution { dialect, statement, .. }) => {
            assert_eq!(dialect, "sqlite");
            assert_eq!(statement, insert.sql);
        }
        other => panic!("expected Execution error, got {:?}", other),
    }

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_invalid_sql_is_execution_error() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, _) = connected().await?;
    let err = driver.exec("SELEC nothing", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Execution { .. }));
    assert!(err.format_detailed().contains("Caused by"));
    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_transaction_commit_and_rollback() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    driver.exec_query(&driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?).await?;

    let mut tx = driver.begin().await?;
    tx.exec_query(&driver.insert("queue", &queue_row("Committed"))?).await?;
    tx.commit().await?;

    let mut tx = driver.begin().await?;
    tx.exec_query(&driver.insert("queue", &queue_row("RolledBack"))?).await?;
    tx.rollback().await?;

    let rows = driver.fetch_all("SELECT name FROM queue", &[]).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<String, _>("name")?, "Committed");

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_migrator_creates_tables_and_indexes() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;

    let applied = Migrator::new(driver.as_ref(), &schemas).register_all().run().await?;
    // Two tables plus one index each.
    assert_eq!(applied, 4);

    assert!(driver.table_exists("queue").await?);
    assert!(driver.table_exists("ticket").await?);

    let indexes = driver
        .fetch_all("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name", &[])
        .await?;
    let names: Vec<String> = indexes.iter().map(|r| r.try_get("name")).collect::<Result<_, _>>()?;
    assert_eq!(names, vec!["idx_queue_valid_id", "idx_ticket_queue_id"]);

    // Every statement is idempotent.
    Migrator::new(driver.as_ref(), &schemas).register_all().run().await?;

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_migrator_unknown_table_executes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;

    let result = Migrator::new(driver.as_ref(), &schemas).register("queue").register("article").run().await;
    assert!(matches!(result, Err(Error::SchemaIntegrity { ref table, .. }) if table == "article"));
    assert!(!driver.table_exists("queue").await?);

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_close_is_idempotent_and_reconnect_works() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    driver.exec_query(&driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?).await?;

    driver.close().await?;
    driver.close().await?;
    assert!(!driver.is_connected());
    assert!(matches!(driver.exec("SELECT 1", &[]).await, Err(Error::NotConnected { .. })));

    // A new in-memory database starts empty.
    driver.connect("sqlite::memory:").await?;
    assert!(!driver.table_exists("queue").await?);

    // Connecting again replaces the pool.
    driver.connect("sqlite::memory:").await?;
    driver.ping().await?;

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_connect_failure() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}/missing/dir/gotrs.db", dir.path().display());

    let mut driver = DriverRegistry::with_builtins().get_driver("sqlite")?;
    driver.configure(DriverOptions::new().acquire_timeout(Duration::from_secs(2)));
    let err = driver.connect(&url).await.unwrap_err();

    assert!(matches!(err, Error::Connection { .. }), "unexpected error: {err}");
    assert!(!driver.is_connected());
    Ok(())
}

#[tokio::test]
async fn test_file_database_with_options() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}/gotrs.db?mode=rwc", dir.path().display());

    let mut schemas = SchemaRegistry::new();
    schemas.load_from_str(SCHEMA)?;

    let mut driver = DriverRegistry::with_builtins().get_driver("sqlite3")?;
    driver.configure(DriverOptions::new().max_connections(2).statement_timeout(Duration::from_secs(5)));
    assert_eq!(driver.options().get_max_connections(), 2);
    driver.connect(&url).await?;

    Migrator::new(driver.as_ref(), &schemas).register("queue").run().await?;
    driver.exec_query(&driver.insert("queue", &queue_row("Misc"))?).await?;

    let rows = driver.fetch_all("SELECT COUNT(*) AS n FROM queue", &[]).await?;
    assert_eq!(rows[0].try_get::<i64, _>("n")?, 1);

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_select_all_columns_on_timestamped_table() -> Result<(), Box<dyn std::error::Error>> {
    let (mut driver, schemas) = connected().await?;
    driver.exec_query(&driver.create_table(schemas.get_schema("queue").ok_or("queue")?)?).await?;
    driver.exec_query(&driver.insert("queue", &queue_row("Raw"))?).await?;

    let select = driver.select("queue", &[], &[])?;
    let rows = driver.fetch_all(&select.sql, &select.args).await?;
    assert_eq!(rows.len(), 1);

    let created: String = rows[0].try_get("create_time")?;
    let changed: String = rows[0].try_get("change_time")?;
    assert_eq!(created.len(), "2024-01-01 00:00:00".len());
    assert!(!changed.is_empty());

    driver.close().await?;
    Ok(())
}

#[tokio::test]
async fn test_typed_and_null_values_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let mut schemas = SchemaRegistry::new();
    schemas.load_from_str(
        r#"
event:
  columns:
    id: serial
    ref: uuid
    happened_at: timestamp
    happened_on: date
    payload: json
    queue_id: integer
"#,
    )?;

    let mut driver = DriverRegistry::with_builtins().get_driver("sqlite")?;
    driver.connect("sqlite::memory:").await?;
    Migrator::new(driver.as_ref(), &schemas).register("event").run().await?;

    let reference = uuid::Uuid::new_v4();
    let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).ok_or("date")?.and_hms_opt(12, 30, 0).ok_or("time")?;
    let values = HashMap::from([
        ("ref".to_string(), Value::from(reference)),
        ("happened_at".to_string(), Value::from(at)),
        ("happened_on".to_string(), Value::from(at.date())),
        ("payload".to_string(), Value::json(r#"{"state":"open"}"#)),
        ("queue_id".to_string(), Value::Null),
    ]);
    driver.exec_query(&driver.insert("event", &values)?).await?;

    let select = driver.select(
        "event",
        &["ref", "happened_at", "happened_on", "payload"],
        &[Condition::eq("ref", reference), Condition::eq("queue_id", Value::Null)],
    )?;
    let rows = driver.fetch_all(&select.sql, &select.args).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].try_get::<String, _>("ref")?, reference.to_string());
    assert_eq!(rows[0].try_get::<String, _>("happened_at")?, "2024-05-01 12:30:00");
    assert_eq!(rows[0].try_get::<String, _>("happened_on")?, "2024-05-01");
    assert_eq!(rows[0].try_get::<String, _>("payload")?, r#"{"state":"open"}"#);

    driver.close().await?;
    Ok(())
}
