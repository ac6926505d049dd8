//! A generic tabular-query adapter over [SharedDatabase].
//!
//! ```
//! use tinysql::{Connection, Value};
//!
//! let conn = Connection::open();
//! conn.execute("CREATE TABLE users (id INT, name TEXT)", &[]).unwrap();
//! conn.execute("INSERT INTO users VALUES (1, 'Alice')", &[]).unwrap();
//!
//! let mut rows = conn.query("SELECT id, name, id = 1 FROM users", &[]).unwrap();
//! assert_eq!(rows.columns(), vec!["id", "name", "?column?"]);
//! assert_eq!(
//!     rows.next(),
//!     Some(vec![Value::Int(1), Value::Text("Alice".into()), Value::Bool(true)])
//! );
//! assert_eq!(rows.next(), None);
//! ```

use std::vec;

use crate::cell::MemoryCell;
use crate::column_type::ColumnType;
use crate::database::{Outcome, ResultColumn, Results};
use crate::error::{DbError, Result};
use crate::shared::SharedDatabase;
use crate::value::Value;

/// A handle for running SQL. Connections made from the same
/// [SharedDatabase] see the same tables.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    database: SharedDatabase,
}

impl Connection {
    /// Opens a connection to a new, empty database.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn new(database: SharedDatabase) -> Self {
        Self { database }
    }

    /// Runs every statement in `sql` and returns the rows of the last
    /// `SELECT`, or no rows if there was none.
    ///
    /// # Errors
    /// [DbError::ParametersNotSupported] if `params` is not empty, otherwise
    /// any lexing, parsing, or execution error.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        if !params.is_empty() {
            return Err(DbError::ParametersNotSupported.into());
        }

        let results = self
            .database
            .run(sql)?
            .into_iter()
            .filter_map(|outcome| match outcome {
                Outcome::Selected(results) => Some(results),
                _ => None,
            })
            .next_back()
            .unwrap_or_default();

        Ok(Rows::new(results))
    }

    /// Runs every statement in `sql`, discarding any rows.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.query(sql, params).map(|_| ())
    }
}

/// Rows of a query result, decoded per column type.
#[derive(Debug)]
pub struct Rows {
    columns: Vec<ResultColumn>,
    rows: vec::IntoIter<Vec<MemoryCell>>,
}

impl Rows {
    fn new(results: Results) -> Self {
        Self {
            columns: results.columns,
            rows: results.rows.into_iter(),
        }
    }

    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    pub fn column_types(&self) -> Vec<ColumnType> {
        self.columns.iter().map(|column| column.column_type).collect()
    }
}

impl Iterator for Rows {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;
        Some(
            row.iter()
                .zip(&self.columns)
                .map(|(cell, column)| Value::decode(cell, column.column_type))
                .collect(),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_rejects_parameters() {
        let conn = Connection::open();
        let result = conn.query("SELECT 1", &[Value::Int(1)]);
        assert!(matches!(result, Err(Error::Db(DbError::ParametersNotSupported))));
    }

    #[test]
    fn test_last_select_wins() {
        let conn = Connection::open();
        let rows: Vec<_> = conn
            .query(
                "CREATE TABLE t (a INT); INSERT INTO t VALUES (1); SELECT 'first'; SELECT a FROM t",
                &[],
            )
            .unwrap()
            .collect();

        assert_eq!(rows, vec![vec![Value::Int(1)]]);
    }

    #[test]
    fn test_no_select_gives_no_rows() {
        let conn = Connection::open();
        let mut rows = conn.query("CREATE TABLE t (a INT)", &[]).unwrap();

        assert!(rows.columns().is_empty());
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn test_column_types() {
        let conn = Connection::open();
        conn.execute("CREATE TABLE t (a INT, b TEXT)", &[]).unwrap();
        let rows = conn.query("SELECT b, a = 1 AS one FROM t", &[]).unwrap();

        assert_eq!(rows.columns(), vec!["b", "one"]);
        assert_eq!(rows.column_types(), vec![ColumnType::Text, ColumnType::Bool]);
    }

    #[test]
    fn test_connections_share_a_database() {
        let database = SharedDatabase::new();
        let writer = Connection::new(database.clone());
        let reader = Connection::new(database);

        writer.execute("CREATE TABLE t (a TEXT)", &[]).unwrap();
        writer.execute("INSERT INTO t VALUES ('x')", &[]).unwrap();

        let rows: Vec<_> = reader.query("SELECT a FROM t", &[]).unwrap().collect();
        assert_eq!(rows, vec![vec![Value::Text("x".into())]]);
    }

    #[test]
    fn test_errors_propagate() {
        let conn = Connection::open();
        assert!(matches!(
            conn.query("SELECT a FROM missing", &[]),
            Err(Error::Db(DbError::TableDoesNotExist(_)))
        ));
    }
}
