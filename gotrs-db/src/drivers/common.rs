//! Statement rendering shared by the built-in drivers.
//!
//! Each driver describes its surface syntax with a [`Syntax`] value; the
//! functions here assemble DML, DROP and INDEX statements from it. Column
//! definitions in `CREATE TABLE` stay in the drivers because that is where
//! the dialects really differ.

use std::collections::HashMap;

use crate::{
    error::{Error, Result},
    query::{Condition, RenderedQuery, Value},
    schema::{ColumnDefinition, LogicalType, TableSchema},
};

/// Surface syntax of a dialect.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Syntax {
    pub dialect: &'static str,
    pub quote: fn(&str) -> Result<String>,
    /// `$1, $2, ...` instead of `?`.
    pub numbered_placeholders: bool,
    /// Whether `insert_returning` can be rendered.
    pub returning: bool,
    /// Body of an INSERT that supplies no columns.
    pub empty_insert: &'static str,
    /// Appended to `DROP TABLE IF EXISTS <name>`.
    pub drop_suffix: &'static str,
    /// Cast applied to placeholders of text-bound values.
    pub cast: fn(LogicalType) -> Option<&'static str>,
}

/// For dialects that convert text to the column type on their own.
pub(crate) fn no_cast(_: LogicalType) -> Option<&'static str> {
    None
}

impl Syntax {
    pub fn quote(&self, name: &str) -> Result<String> {
        (self.quote)(name)
    }

    /// Placeholder for the 1-based argument `index`.
    pub fn placeholder(&self, index: usize) -> String {
        if self.numbered_placeholders { format!("${}", index) } else { "?".to_string() }
    }

    /// Pushes `value` onto `args` and returns its placeholder, cast when the
    /// value is bound as text. `Null` renders the literal `NULL` and binds nothing.
    fn bind(&self, args: &mut Vec<Value>, value: &Value) -> String {
        if *value == Value::Null {
            return "NULL".to_string();
        }

        args.push(value.clone());
        let placeholder = self.placeholder(args.len());
        match value.text_bound_type().and_then(self.cast) {
            Some(ty) => format!("{}::{}", placeholder, ty),
            None => placeholder,
        }
    }
}

/// Sorted (column, value) pairs, so rendering does not depend on map order.
fn sorted_values(values: &HashMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut pairs: Vec<(&String, &Value)> = values.iter().collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(b.0));
    pairs
}

/// Appends ` WHERE ...` for `conditions`, numbering placeholders after `args`.
///
/// A `Null` value renders as `IS NULL` and binds nothing.
fn push_where(syntax: &Syntax, sql: &mut String, args: &mut Vec<Value>, conditions: &[Condition]) -> Result<()> {
    if conditions.is_empty() {
        return Ok(());
    }

    let mut clauses = Vec::with_capacity(conditions.len());
    for condition in conditions {
        let column = syntax.quote(&condition.column)?;
        if condition.value == Value::Null {
            clauses.push(format!("{} IS NULL", column));
        } else {
            clauses.push(format!("{} = {}", column, syntax.bind(args, &condition.value)));
        }
    }

    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    Ok(())
}

pub(crate) fn insert(syntax: &Syntax, table: &str, values: &HashMap<String, Value>) -> Result<RenderedQuery> {
    let table = syntax.quote(table)?;
    if values.is_empty() {
        return Ok(RenderedQuery::statement(format!("INSERT INTO {} {}", table, syntax.empty_insert)));
    }

    let pairs = sorted_values(values);
    let mut columns = Vec::with_capacity(pairs.len());
    let mut placeholders = Vec::with_capacity(pairs.len());
    let mut args = Vec::with_capacity(pairs.len());
    for (column, value) in pairs {
        columns.push(syntax.quote(column)?);
        placeholders.push(syntax.bind(&mut args, value));
    }

    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders.join(", "));
    Ok(RenderedQuery::new(sql, args))
}

/// INSERT followed by `RETURNING` of the named columns.
pub(crate) fn insert_returning(
    syntax: &Syntax,
    table: &str,
    values: &HashMap<String, Value>,
    returning: &[&str],
) -> Result<RenderedQuery> {
    let Some(first) = returning.first() else {
        return insert(syntax, table, values);
    };
    if !syntax.returning {
        return Err(Error::unsupported(syntax.dialect, table, first, "INSERT ... RETURNING is not supported"));
    }

    let mut query = insert(syntax, table, values)?;
    let columns = returning.iter().map(|c| syntax.quote(c)).collect::<Result<Vec<_>>>()?;
    query.sql.push_str(" RETURNING ");
    query.sql.push_str(&columns.join(", "));
    Ok(query)
}

pub(crate) fn update(
    syntax: &Syntax,
    table: &str,
    values: &HashMap<String, Value>,
    conditions: &[Condition],
) -> Result<RenderedQuery> {
    if values.is_empty() {
        return Err(Error::EmptyAssignment { table: table.to_string() });
    }

    let mut args = Vec::with_capacity(values.len() + conditions.len());
    let mut assignments = Vec::with_capacity(values.len());
    for (column, value) in sorted_values(values) {
        let column = syntax.quote(column)?;
        assignments.push(format!("{} = {}", column, syntax.bind(&mut args, value)));
    }

    let mut sql = format!("UPDATE {} SET {}", syntax.quote(table)?, assignments.join(", "));
    push_where(syntax, &mut sql, &mut args, conditions)?;
    Ok(RenderedQuery::new(sql, args))
}

pub(crate) fn delete(syntax: &Syntax, table: &str, conditions: &[Condition]) -> Result<RenderedQuery> {
    let mut args = Vec::with_capacity(conditions.len());
    let mut sql = format!("DELETE FROM {}", syntax.quote(table)?);
    push_where(syntax, &mut sql, &mut args, conditions)?;
    Ok(RenderedQuery::new(sql, args))
}

pub(crate) fn select(syntax: &Syntax, table: &str, columns: &[&str], conditions: &[Condition]) -> Result<RenderedQuery> {
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.iter().map(|c| syntax.quote(c)).collect::<Result<Vec<_>>>()?.join(", ")
    };

    let mut args = Vec::with_capacity(conditions.len());
    let mut sql = format!("SELECT {} FROM {}", projection, syntax.quote(table)?);
    push_where(syntax, &mut sql, &mut args, conditions)?;
    Ok(RenderedQuery::new(sql, args))
}

pub(crate) fn drop_table(syntax: &Syntax, table: &str) -> Result<RenderedQuery> {
    Ok(RenderedQuery::statement(format!("DROP TABLE IF EXISTS {}{}", syntax.quote(table)?, syntax.drop_suffix)))
}

/// `CREATE INDEX IF NOT EXISTS` statements for the schema's declared indexes.
pub(crate) fn create_indexes(syntax: &Syntax, schema: &TableSchema) -> Result<Vec<RenderedQuery>> {
    let table = syntax.quote(schema.table_name())?;
    schema
        .indexes()
        .iter()
        .map(|column| {
            Ok(RenderedQuery::statement(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                syntax.quote(&schema.index_name(column))?,
                table,
                syntax.quote(column)?
            )))
        })
        .collect()
}

/// Wraps rendered column definitions (and extra table elements) into the
/// final `CREATE TABLE` statement.
pub(crate) fn create_table(syntax: &Syntax, schema: &TableSchema, elements: Vec<String>, suffix: &str) -> Result<RenderedQuery> {
    Ok(RenderedQuery::statement(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n){}",
        syntax.quote(schema.table_name())?,
        elements.join(",\n    "),
        suffix
    )))
}

/// Best-effort native type for an unrecognized name: the name upper-cased,
/// or `TEXT` when it is blank.
pub(crate) fn uppercase_fallback(logical_type: &str) -> String {
    let trimmed = logical_type.trim();
    if trimmed.is_empty() { "TEXT".to_string() } else { trimmed.to_ascii_uppercase() }
}

/// Rejects float defaults that have no SQL literal.
pub(crate) fn check_float(syntax: &Syntax, schema: &TableSchema, column: &ColumnDefinition, value: f64) -> Result<String> {
    if value.is_finite() {
        Ok(value.to_string())
    } else {
        Err(Error::unsupported(
            syntax.dialect,
            schema.table_name(),
            column.name(),
            format!("default {} has no SQL literal", value),
        ))
    }
}

/// Rejects defaults on columns whose values the backend generates.
pub(crate) fn check_auto_increment_default(syntax: &Syntax, schema: &TableSchema, column: &ColumnDefinition) -> Result<()> {
    if column.logical_type().is_auto_increment() && column.default_value().is_some() {
        return Err(Error::unsupported(
            syntax.dialect,
            schema.table_name(),
            column.name(),
            "auto-increment columns cannot declare a default",
        ));
    }
    Ok(())
}
