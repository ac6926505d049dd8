use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::ast::Statement;
use crate::database::{Backend, Database, Outcome, Results};
use crate::error::{DbError, Result};
use crate::parser::parse;

/// A [Database] that can be shared between threads.
///
/// Each statement holds the lock for its own execution only: `SELECT` takes
/// the read lock, every other statement the write lock. Cloning yields
/// another handle to the same tables.
#[derive(Debug, Clone, Default)]
pub struct SharedDatabase {
    inner: Arc<RwLock<Database>>,
}

impl SharedDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `sql` and executes its statements in order, stopping at the
    /// first failure.
    ///
    /// # Errors
    /// Returns an error if lexing, parsing, or execution fails.
    pub fn run(&self, sql: &str) -> Result<Vec<Outcome>> {
        let ast = parse(sql)?;
        let mut outcomes = Vec::with_capacity(ast.statements.len());

        for statement in &ast.statements {
            let outcome = match statement {
                Statement::Select(select) => Outcome::Selected(self.inner.read().select(select)?),
                _ => self.inner.write().execute_statement(statement)?,
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// See [Database::query].
    pub fn query(&self, sql: &str) -> Result<Results> {
        let ast = parse(sql)?;
        let mut last = None;

        for statement in &ast.statements {
            let Statement::Select(select) = statement else {
                return Err(DbError::NotAQuery.into());
            };
            last = Some(self.inner.read().select(select)?);
        }

        last.ok_or_else(|| DbError::NotAQuery.into())
    }

    /// Read access to the underlying database for the guard's lifetime.
    pub fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.inner.read()
    }
}

impl From<Database> for SharedDatabase {
    fn from(database: Database) -> Self {
        Self {
            inner: Arc::new(RwLock::new(database)),
        }
    }
}
