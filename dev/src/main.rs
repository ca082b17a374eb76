use std::collections::HashMap;

use gotrs_db::{Condition, DatabaseConfig, DriverRegistry, Migrator, Row, SchemaRegistry, Value};

const DEFAULT_SCHEMA: &str = r#"
queue:
  columns:
    id: serial
    name: { type: varchar(200), required: true, unique: true }
    comments: varchar(250)
    valid_id: { type: smallint, required: true, default: 1 }
  timestamps: true
  indexes: [valid_id]

ticket:
  columns:
    id: bigserial
    tn: { type: varchar(50), required: true, unique: true }
    title: { type: varchar(255), required: true }
    queue_id: { type: integer, required: true }
    archive_flag: { type: smallint, default: 0 }
  timestamps: true
  indexes: [queue_id, title]
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = DatabaseConfig::from_env().unwrap_or_else(|| DatabaseConfig {
        driver: "sqlite".to_string(),
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        schema_path: None,
    });

    let mut schemas = SchemaRegistry::new();
    match &config.schema_path {
        Some(path) => schemas.load_from_file(path)?,
        None => schemas.load_from_str(DEFAULT_SCHEMA)?,
    }
    log::info!("loaded {} table(s): {:?}", schemas.len(), schemas.table_names());

    let drivers = DriverRegistry::with_builtins();
    let mut driver = drivers.get_driver(&config.driver)?;
    driver.configure(config.driver_options());
    driver.connect(&config.url).await?;

    let applied = Migrator::new(driver.as_ref(), &schemas).register_all().run().await?;
    println!("Migration completed: {} statement(s)", applied);

    if schemas.get_schema("queue").is_some() {
        let mut row = HashMap::new();
        row.insert("name".to_string(), Value::from("Raw"));
        row.insert("comments".to_string(), Value::from("All new tickets are placed in this queue by default."));

        let insert = driver.insert("queue", &row)?;
        println!("{}", insert.sql);
        let result = driver.exec_query(&insert).await?;
        println!("Inserted {} row(s), id {:?}", result.rows_affected, result.last_insert_id);

        let select = driver.select("queue", &["id", "name"], &[Condition::eq("valid_id", 1)])?;
        for queue in driver.fetch_all(&select.sql, &select.args).await? {
            let id: i64 = queue.try_get("id")?;
            let name: String = queue.try_get("name")?;
            println!("queue {} => {}", id, name);
        }
    }

    driver.close().await?;
    Ok(())
}
