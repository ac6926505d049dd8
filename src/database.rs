use std::collections::HashMap;

use allocative::Allocative;
use log::{debug, trace};

use crate::ast::{
    CreateTableStatement, DropTableStatement, Expression, InsertStatement, SelectItem,
    SelectStatement, Statement,
};
use crate::cell::{Cell, MemoryCell};
use crate::column_type::ColumnType;
use crate::error::{DbError, Result};
use crate::parser::parse;
use crate::table::Table;
use crate::tokenizer::{Location, Token, TokenKind};

/// The operations a table store offers to statement execution.
pub trait Backend {
    fn create_table(&mut self, statement: &CreateTableStatement) -> std::result::Result<(), DbError>;
    fn insert(&mut self, statement: &InsertStatement) -> std::result::Result<(), DbError>;
    fn select(&self, statement: &SelectStatement) -> std::result::Result<Results, DbError>;
    fn drop_table(&mut self, statement: &DropTableStatement) -> std::result::Result<(), DbError>;
}

/// The main entry point for the in-memory database engine.
/// It owns every table by name and executes statements against them.
#[derive(Debug, Default, Allocative)]
pub struct Database {
    tables: HashMap<String, Table>,
}

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultColumn {
    pub name: String,
    pub column_type: ColumnType,
}

/// Represents the result of a successful `SELECT`: a snapshot that does not
/// borrow from the table it was read from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    pub columns: Vec<ResultColumn>,
    /// One cell per column, read with that column's type.
    pub rows: Vec<Vec<MemoryCell>>,
}

/// What executing one statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    Dropped,
    Inserted,
    Selected(Results),
}

impl Database {
    /// Creates a new, empty database instance.
    pub fn new() -> Self {
        Self {
            tables: HashMap::default(),
        }
    }

    /// Retrieves a reference to a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Bytes allocated on the heap by the stored tables.
    pub fn memory_usage(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }

    /// Executes one parsed statement.
    ///
    /// # Errors
    /// Any [DbError] raised by the statement. A failed statement leaves the
    /// database unchanged.
    pub fn execute_statement(&mut self, statement: &Statement) -> std::result::Result<Outcome, DbError> {
        match statement {
            Statement::CreateTable(create) => self.create_table(create).map(|_| Outcome::Created),
            Statement::Insert(insert) => self.insert(insert).map(|_| Outcome::Inserted),
            Statement::Select(select) => self.select(select).map(Outcome::Selected),
            Statement::DropTable(drop) => self.drop_table(drop).map(|_| Outcome::Dropped),
        }
    }

    /// Parses `sql` and executes its statements in order, stopping at the
    /// first failure. Statements before the failing one stay applied.
    ///
    /// # Errors
    /// Returns an error if lexing, parsing, or execution fails.
    pub fn run(&mut self, sql: &str) -> Result<Vec<Outcome>> {
        let ast = parse(sql)?;
        let mut outcomes = Vec::with_capacity(ast.statements.len());

        for statement in &ast.statements {
            outcomes.push(self.execute_statement(statement)?);
        }

        Ok(outcomes)
    }

    /// Executes SQL that modifies the database (`CREATE TABLE`,
    /// `INSERT INTO`, `DROP TABLE`). Results of any `SELECT` are discarded;
    /// for data retrieval, use [Database::query] instead.
    ///
    /// # Errors
    /// Returns an error if lexing, parsing, or execution fails.
    ///
    /// # Example
    /// ```
    /// use tinysql::{Cell, Database};
    /// let mut db = Database::new();
    /// db.execute("CREATE TABLE users (id INT)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1); INSERT INTO users VALUES (2)").unwrap();
    ///
    /// let result = db.query("SELECT * FROM users WHERE id = 2").unwrap();
    /// assert_eq!(result.rows.len(), 1);
    /// assert_eq!(result.rows[0][0].as_int(), 2);
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        self.run(sql).map(|_| ())
    }

    /// Executes `SELECT` statements and returns the result of the last one.
    ///
    /// # Example
    ///
    /// ```
    /// use tinysql::{Cell, ColumnType, Database};
    ///
    /// let mut db = Database::new();
    /// db.execute("CREATE TABLE products (name TEXT, price INT)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Laptop', 1200)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Mouse', 25)").unwrap();
    ///
    /// let result = db.query("SELECT name, price + 1 AS next FROM products").unwrap();
    ///
    /// assert_eq!(result.columns[0].name, "name");
    /// assert_eq!(result.columns[1].name, "next");
    /// assert_eq!(result.columns[1].column_type, ColumnType::Int);
    /// assert_eq!(result.rows.len(), 2);
    /// assert_eq!(result.rows[0][0].as_text(), "Laptop");
    /// assert_eq!(result.rows[1][1].as_int(), 26);
    /// ```
    ///
    /// # Errors
    /// Returns an error if:
    /// - The SQL fails to lex or parse.
    /// - It contains no statement, or a statement that is not a `SELECT`
    ///   ([DbError::NotAQuery]).
    /// - The query itself fails.
    pub fn query(&self, sql: &str) -> Result<Results> {
        let ast = parse(sql)?;
        let mut last = None;

        for statement in &ast.statements {
            let Statement::Select(select) = statement else {
                return Err(DbError::NotAQuery.into());
            };
            last = Some(self.select(select)?);
        }

        last.ok_or_else(|| DbError::NotAQuery.into())
    }

    fn table(&self, name: &Token) -> std::result::Result<&Table, DbError> {
        self.tables
            .get(&name.value)
            .ok_or_else(|| DbError::TableDoesNotExist(name.value.clone()))
    }
}

impl Backend for Database {
    /// Registers a new, empty table.
    ///
    /// # Errors
    /// [DbError::TableAlreadyExists] if the name is taken,
    /// [DbError::InvalidDatatype] for a column type other than `int`/`text`.
    fn create_table(&mut self, statement: &CreateTableStatement) -> std::result::Result<(), DbError> {
        let name = &statement.name.value;
        if self.tables.contains_key(name) {
            return Err(DbError::TableAlreadyExists(name.clone()));
        }

        let table = Table::from_definitions(&statement.columns)?;
        debug!("created table {name} with {} columns", table.columns.len());
        self.tables.insert(name.clone(), table);
        Ok(())
    }

    fn insert(&mut self, statement: &InsertStatement) -> std::result::Result<(), DbError> {
        let name = &statement.table.value;
        let table = self
            .tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableDoesNotExist(name.clone()))?;

        table.insert(&statement.values)?;
        trace!("inserted row {} into {name}", table.row_count());
        Ok(())
    }

    /// Runs a `SELECT`.
    ///
    /// The query lifecycle:
    /// 1. **Resolves** the FROM table, or a single empty row without FROM.
    /// 2. **Expands** `*` into the table's columns, in definition order.
    /// 3. **Filters** rows on the WHERE condition.
    /// 4. **Skips** OFFSET rows and stops after LIMIT rows.
    /// 5. **Projects** every item; result columns are named and typed from
    ///    the first projected row, or statically when no row is projected.
    fn select(&self, statement: &SelectStatement) -> std::result::Result<Results, DbError> {
        let constant;
        let table = match &statement.from {
            Some(name) => self.table(name)?,
            None => {
                constant = Table::constant();
                &constant
            }
        };

        if statement.items.is_empty() {
            return Ok(Results::default());
        }

        let items = expand_items(table, &statement.items);
        let limit = statement
            .limit
            .as_ref()
            .map(|limit| row_count(limit, "LIMIT"))
            .transpose()?;
        let offset = statement
            .offset
            .as_ref()
            .map(|offset| row_count(offset, "OFFSET"))
            .transpose()?
            .unwrap_or(0);

        let mut columns: Option<Vec<ResultColumn>> = None;
        let mut rows = Vec::new();
        let mut skipped = 0;

        for row_index in 0..table.row_count() {
            if limit.is_some_and(|limit| rows.len() >= limit) {
                break;
            }

            if let Some(condition) = &statement.where_clause
                && !table.evaluate(row_index, condition)?.cell.as_bool()
            {
                continue;
            }

            if skipped < offset {
                skipped += 1;
                continue;
            }

            let mut row = Vec::with_capacity(items.len());
            let mut described = Vec::with_capacity(items.len());
            for (expression, alias) in &items {
                let evaluated = table.evaluate(row_index, expression)?;
                if columns.is_none() {
                    described.push(ResultColumn {
                        name: alias.clone().unwrap_or(evaluated.name),
                        column_type: evaluated.column_type,
                    });
                }
                row.push(evaluated.cell);
            }

            if columns.is_none() {
                columns = Some(described);
            }
            rows.push(row);
        }

        let columns = match columns {
            Some(columns) => columns,
            None => describe_items(table, &items)?,
        };

        debug!(
            "selected {} of {} rows from {}",
            rows.len(),
            table.row_count(),
            statement.from.as_ref().map_or("<none>", |from| from.value.as_str())
        );

        Ok(Results { columns, rows })
    }

    fn drop_table(&mut self, statement: &DropTableStatement) -> std::result::Result<(), DbError> {
        let name = &statement.name.value;
        match self.tables.remove(name) {
            Some(_) => {
                debug!("dropped table {name}");
                Ok(())
            }
            None => Err(DbError::TableDoesNotExist(name.clone())),
        }
    }
}

/// Select items as `(expression, alias)`, with `*` replaced by one
/// identifier per table column.
fn expand_items(table: &Table, items: &[SelectItem]) -> Vec<(Expression, Option<String>)> {
    let mut expanded = Vec::with_capacity(items.len());

    for item in items {
        match item {
            SelectItem::Asterisk => expanded.extend(table.columns.iter().map(|column| {
                let identifier = Token::new(column.as_str(), TokenKind::Identifier, Location::default());
                (Expression::Literal(identifier), None)
            })),
            SelectItem::Expression { expression, alias } => {
                expanded.push((expression.clone(), alias.as_ref().map(|alias| alias.value.clone())))
            }
        }
    }

    expanded
}

fn describe_items(
    table: &Table,
    items: &[(Expression, Option<String>)],
) -> std::result::Result<Vec<ResultColumn>, DbError> {
    items
        .iter()
        .map(|(expression, alias)| {
            let (name, column_type) = table.describe(expression)?;
            Ok(ResultColumn {
                name: alias.clone().unwrap_or(name),
                column_type,
            })
        })
        .collect()
}

/// Evaluates a LIMIT or OFFSET expression to a row count.
fn row_count(expression: &Expression, clause: &str) -> std::result::Result<usize, DbError> {
    let evaluated = Table::constant().evaluate(0, expression)?;

    if evaluated.column_type != ColumnType::Int || evaluated.cell.is_empty() {
        return Err(DbError::InvalidOperands(format!(
            "{clause}: expected int, got {}",
            evaluated.column_type
        )));
    }

    usize::try_from(evaluated.cell.as_int())
        .map_err(|_| DbError::InvalidOperands(format!("{clause}: must not be negative")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample_db() -> Database {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (a INT, b TEXT)").unwrap();
        db.execute("INSERT INTO t VALUES (1, 'x')").unwrap();
        db.execute("INSERT INTO t VALUES (2, 'y')").unwrap();
        db
    }

    fn column(name: &str, column_type: ColumnType) -> ResultColumn {
        ResultColumn {
            name: name.to_string(),
            column_type,
        }
    }

    fn db_error(result: Result<impl std::fmt::Debug>) -> DbError {
        match result {
            Err(Error::Db(err)) => err,
            other => panic!("expected a DbError, got {other:?}"),
        }
    }

    fn ints(results: &Results, index: usize) -> Vec<i32> {
        results.rows.iter().map(|row| row[index].as_int()).collect()
    }

    // ─── Test 1 : create / list / drop ───

    #[test]
    fn test_create_table() {
        let mut db = Database::new();
        db.execute("CREATE TABLE users (id INT, name TEXT)").unwrap();

        assert_eq!(db.list_tables(), vec!["users"]);
        let table = db.get_table("users").unwrap();
        assert_eq!(table.columns, vec!["id", "name"]);
    }

    #[test]
    fn test_create_duplicate_table() {
        let mut db = sample_db();
        let err = db_error(db.execute("CREATE TABLE t (z INT)"));

        assert_eq!(err, DbError::TableAlreadyExists("t".into()));
        assert_eq!(db.get_table("t").unwrap().columns, vec!["a", "b"]);
        assert_eq!(db.get_table("t").unwrap().row_count(), 2);
    }

    #[test]
    fn test_create_table_invalid_datatype_registers_nothing() {
        let mut db = Database::new();
        let err = db_error(db.execute("CREATE TABLE t (a INT, b BOOLEAN)"));

        assert_eq!(err, DbError::InvalidDatatype("boolean".into()));
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_create_table_without_columns() {
        let mut db = Database::new();
        db.execute("CREATE TABLE empty ()").unwrap();

        let result = db.query("SELECT * FROM empty").unwrap();
        assert!(result.columns.is_empty());
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_drop_table() {
        let mut db = sample_db();
        db.execute("DROP TABLE t").unwrap();
        assert!(db.list_tables().is_empty());

        let err = db_error(db.execute("DROP TABLE t"));
        assert_eq!(err, DbError::TableDoesNotExist("t".into()));
    }

    // ─── Test 2 : insert ───

    #[test]
    fn test_insert_round_trip() {
        let db = sample_db();
        let result = db.query("SELECT a, b FROM t WHERE a = 1").unwrap();

        assert_eq!(
            result.columns,
            vec![column("a", ColumnType::Int), column("b", ColumnType::Text)]
        );
        assert_eq!(
            result.rows,
            vec![vec![MemoryCell::from_int(1), MemoryCell::from_text("x")]]
        );
    }

    #[test]
    fn test_insert_into_missing_table() {
        let mut db = Database::new();
        let err = db_error(db.execute("INSERT INTO missing_table VALUES (1)"));
        assert_eq!(err, DbError::TableDoesNotExist("missing_table".into()));
    }

    #[test]
    fn test_insert_value_count_mismatch() {
        let mut db = sample_db();
        let err = db_error(db.execute("INSERT INTO t VALUES (3)"));

        assert_eq!(err, DbError::MissingValues { expected: 2, found: 1 });
        assert_eq!(db.get_table("t").unwrap().row_count(), 2);
    }

    #[test]
    fn test_insert_skips_non_literal_values() {
        let mut db = sample_db();
        db.execute("INSERT INTO t VALUES (1 + 2, 'z')").unwrap();

        // the stored row is shorter than the column list
        assert_eq!(db.get_table("t").unwrap().get_row(2).unwrap().len(), 1);
        let err = db_error(db.query("SELECT b FROM t"));
        assert_eq!(err, DbError::InvalidCell);
    }

    #[test]
    fn test_statements_before_a_failure_stay_applied() {
        let mut db = sample_db();
        let err = db_error(db.execute("INSERT INTO t VALUES (3, 'z'); INSERT INTO t VALUES (4)"));

        assert!(matches!(err, DbError::MissingValues { .. }));
        assert_eq!(db.get_table("t").unwrap().row_count(), 3);
    }

    // ─── Test 3 : select ───

    #[test]
    fn test_select_asterisk_matches_explicit_columns() {
        let db = sample_db();
        let star = db.query("SELECT * FROM t").unwrap();
        let explicit = db.query("SELECT a, b FROM t").unwrap();

        assert_eq!(star, explicit);
        assert_eq!(star.rows.len(), 2);
    }

    #[test]
    fn test_select_asterisk_mixed_with_expressions() {
        let db = sample_db();
        let result = db.query("SELECT a + 10, * FROM t WHERE b = 'y'").unwrap();

        assert_eq!(
            result.columns,
            vec![
                column("?column?", ColumnType::Int),
                column("a", ColumnType::Int),
                column("b", ColumnType::Text),
            ]
        );
        assert_eq!(ints(&result, 0), vec![12]);
    }

    #[test]
    fn test_where_filtering() {
        let db = sample_db();
        let result = db.query("SELECT a FROM t WHERE a = 2").unwrap();

        assert_eq!(result.rows, vec![vec![MemoryCell::from_int(2)]]);
    }

    #[test]
    fn test_where_with_logic() {
        let db = sample_db();
        let result = db.query("SELECT a FROM t WHERE a = 1 OR b = 'y'").unwrap();
        assert_eq!(ints(&result, 0), vec![1, 2]);

        let result = db.query("SELECT a FROM t WHERE (a = 1 OR a = 2) AND b <> 'x'").unwrap();
        assert_eq!(ints(&result, 0), vec![2]);
    }

    #[test]
    fn test_where_type_error() {
        let db = sample_db();
        let err = db_error(db.query("SELECT a FROM t WHERE a AND true"));
        assert!(matches!(err, DbError::InvalidOperands(_)));
    }

    #[test]
    fn test_select_without_from() {
        let db = Database::new();
        let result = db.query("SELECT 1 + 2 = 3, 'a' || 'b' AS ab").unwrap();

        assert_eq!(
            result.columns,
            vec![column("?column?", ColumnType::Bool), column("ab", ColumnType::Text)]
        );
        assert!(result.rows[0][0].as_bool());
        assert_eq!(result.rows[0][1].as_text(), "ab");
    }

    #[test]
    fn test_select_without_items_is_empty() {
        let db = sample_db();
        assert_eq!(db.query("SELECT FROM t").unwrap(), Results::default());
        assert_eq!(db.query("SELECT").unwrap(), Results::default());
        assert_eq!(db.query("SELECT FROM t WHERE a = 1").unwrap(), Results::default());
        assert_eq!(
            db_error(db.query("SELECT FROM nope")),
            DbError::TableDoesNotExist("nope".into())
        );
    }

    #[test]
    fn test_select_errors() {
        let db = sample_db();
        assert_eq!(
            db_error(db.query("SELECT missing_col FROM t")),
            DbError::ColumnDoesNotExist("missing_col".into())
        );
        assert_eq!(
            db_error(db.query("SELECT a FROM nope")),
            DbError::TableDoesNotExist("nope".into())
        );
        assert!(matches!(
            db_error(db.query("SELECT 1 + 'x'")),
            DbError::InvalidOperands(_)
        ));
    }

    #[test]
    fn test_empty_result_still_has_columns() {
        let db = sample_db();
        let result = db.query("SELECT b, a AS first FROM t WHERE a = 99").unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(
            result.columns,
            vec![column("b", ColumnType::Text), column("first", ColumnType::Int)]
        );
    }

    #[test]
    fn test_limit_and_offset() {
        let mut db = sample_db();
        db.execute("INSERT INTO t VALUES (3, 'z'); INSERT INTO t VALUES (4, 'w')").unwrap();

        assert_eq!(ints(&db.query("SELECT a FROM t LIMIT 2").unwrap(), 0), vec![1, 2]);
        assert_eq!(ints(&db.query("SELECT a FROM t OFFSET 3").unwrap(), 0), vec![4]);
        assert_eq!(
            ints(&db.query("SELECT a FROM t WHERE a <> 1 OFFSET 1 LIMIT 1").unwrap(), 0),
            vec![3]
        );
        assert_eq!(ints(&db.query("SELECT a FROM t LIMIT 1 + 1").unwrap(), 0), vec![1, 2]);
        assert!(db.query("SELECT a FROM t LIMIT 0").unwrap().rows.is_empty());
    }

    #[test]
    fn test_invalid_limit() {
        let db = sample_db();
        for sql in [
            "SELECT a FROM t LIMIT 'x'",
            "SELECT a FROM t LIMIT null",
            "SELECT a FROM t OFFSET 2147483647 + 1",
        ] {
            assert!(matches!(db_error(db.query(sql)), DbError::InvalidOperands(_)), "{sql}");
        }
        assert_eq!(
            db_error(db.query("SELECT a FROM t LIMIT a")),
            DbError::ColumnDoesNotExist("a".into())
        );
    }

    #[test]
    fn test_query_rejects_non_select() {
        let db = sample_db();
        assert_eq!(db_error(db.query("DROP TABLE t")), DbError::NotAQuery);
        assert_eq!(db_error(db.query("")), DbError::NotAQuery);
    }

    #[test]
    fn test_run_reports_outcomes() {
        let mut db = Database::new();
        let outcomes = db
            .run("CREATE TABLE t (a INT); INSERT INTO t VALUES (5); SELECT a FROM t; DROP TABLE t")
            .unwrap();

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0], Outcome::Created);
        assert_eq!(outcomes[1], Outcome::Inserted);
        assert!(matches!(&outcomes[2], Outcome::Selected(results) if results.rows.len() == 1));
        assert_eq!(outcomes[3], Outcome::Dropped);
    }

    #[test]
    fn test_lex_and_parse_errors() {
        let mut db = Database::new();
        assert!(matches!(db.execute("SELECT 'abc"), Err(Error::Lex(_))));
        assert!(matches!(db.execute("SELECT FROM WHERE"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_memory_usage_grows_with_rows() {
        let mut db = sample_db();
        let before = db.memory_usage();
        db.execute("INSERT INTO t VALUES (3, 'a much longer piece of text')").unwrap();
        assert!(db.memory_usage() > before);
    }
}
