use crate::{
    driver::Driver,
    error::{Error, Result},
    loader::SchemaRegistry,
    query::RenderedQuery,
    schema::TableSchema,
};

/// A queued migration step: renders its statements against a driver.
///
/// Rendering is deferred to `run` so the whole queue is validated before
/// anything is sent to the backend.
pub type MigrationTask = Box<dyn Fn(&dyn Driver, &SchemaRegistry) -> Result<Vec<RenderedQuery>> + Send + Sync>;

/// Schema migration runner.
///
/// Creates the tables of a [`SchemaRegistry`] on a connected driver: all
/// `CREATE TABLE` statements first, then all secondary indexes.
pub struct Migrator<'a> {
    pub(crate) driver: &'a dyn Driver,
    pub(crate) schemas: &'a SchemaRegistry,
    pub(crate) tasks: Vec<MigrationTask>,
    pub(crate) index_tasks: Vec<MigrationTask>,
}

impl<'a> Migrator<'a> {
    /// Creates a new Migrator for `schemas` on `driver`.
    pub fn new(driver: &'a dyn Driver, schemas: &'a SchemaRegistry) -> Self {
        Self { driver, schemas, tasks: Vec::new(), index_tasks: Vec::new() }
    }

    /// Queues a table for creation.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// Migrator::new(driver.as_ref(), &schemas)
    ///     .register("queue")
    ///     .register("ticket")
    ///     .run()
    ///     .await?;
    /// ```
    pub fn register(mut self, table: impl Into<String>) -> Self {
        let table: String = table.into();
        let index_table = table.clone();

        self.tasks.push(Box::new(move |driver: &dyn Driver, schemas: &SchemaRegistry| {
            let schema = lookup(schemas, &table)?;
            Ok(vec![driver.create_table(schema)?])
        }));

        self.index_tasks.push(Box::new(move |driver: &dyn Driver, schemas: &SchemaRegistry| {
            let schema = lookup(schemas, &index_table)?;
            driver.create_indexes(schema)
        }));

        self
    }

    /// Queues every loaded table, in name order.
    pub fn register_all(self) -> Self {
        let names: Vec<String> = self.schemas.table_names().into_iter().map(String::from).collect();
        names.into_iter().fold(self, |migrator, name| migrator.register(name))
    }

    /// Renders every queued step, then executes them in order.
    ///
    /// Returns the number of statements executed. Nothing is executed when a
    /// step fails to render.
    pub async fn run(self) -> Result<usize> {
        let mut statements = Vec::new();
        for task in self.tasks.iter().chain(self.index_tasks.iter()) {
            statements.extend((task)(self.driver, self.schemas)?);
        }

        for statement in &statements {
            self.driver.exec_query(statement).await?;
        }
        log::info!("{}: migration applied {} statement(s)", self.driver.dialect(), statements.len());
        Ok(statements.len())
    }
}

fn lookup<'s>(schemas: &'s SchemaRegistry, table: &str) -> Result<&'s TableSchema> {
    schemas
        .get_schema(table)
        .ok_or_else(|| Error::integrity(table, "table is not loaded in the schema registry"))
}
