use allocative::Allocative;
use log::warn;

use crate::ast::{ColumnDefinition, Expression};
use crate::cell::MemoryCell;
use crate::column_type::ColumnType;
use crate::error::DbError;
use crate::tokenizer::Keyword;

/// Row-oriented in-memory table.
///
/// `columns` and `column_types` are parallel. Rows normally hold one cell per
/// column, but an INSERT with non-literal values stores a shorter row.
#[derive(Debug, Clone, Default, PartialEq, Allocative)]
pub struct Table {
    pub columns: Vec<String>,
    pub column_types: Vec<ColumnType>,
    pub rows: Vec<Vec<MemoryCell>>,
    /// Index of the column declared `PRIMARY KEY`, if any. Not enforced.
    pub primary_key: Option<usize>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty table from CREATE TABLE column definitions.
    ///
    /// # Errors
    /// Returns [DbError::InvalidDatatype] if a column is declared with any
    /// type keyword other than `int` or `text`.
    pub fn from_definitions(definitions: &[ColumnDefinition]) -> Result<Self, DbError> {
        let mut table = Self::new();

        for (index, definition) in definitions.iter().enumerate() {
            let column_type = if definition.datatype.is_keyword(Keyword::Int) {
                ColumnType::Int
            } else if definition.datatype.is_keyword(Keyword::Text) {
                ColumnType::Text
            } else {
                return Err(DbError::InvalidDatatype(definition.datatype.value.clone()));
            };

            table.columns.push(definition.name.value.clone());
            table.column_types.push(column_type);

            if definition.primary_key {
                table.primary_key = Some(index);
            }
        }

        Ok(table)
    }

    /// A table with no columns and a single empty row, used to evaluate
    /// expressions that do not read from a table.
    pub fn constant() -> Self {
        Self {
            rows: vec![Vec::new()],
            ..Self::default()
        }
    }

    /// insert a new row built from literal value expressions
    ///
    /// Identifiers are not resolved against this table's rows: they fail
    /// with [DbError::ColumnDoesNotExist]. Non-literal values are skipped,
    /// so the stored row can be shorter than the column list.
    ///
    /// # Errors
    /// Returns [DbError::MissingValues] if the value count differs from the
    /// column count. The table is untouched on any error.
    pub fn insert(&mut self, values: &[Expression]) -> Result<(), DbError> {
        if values.len() != self.columns.len() {
            return Err(DbError::MissingValues {
                expected: self.columns.len(),
                found: values.len(),
            });
        }

        let literals = Table::new();
        let mut row = Vec::with_capacity(values.len());

        for value in values {
            match value {
                Expression::Literal(_) => row.push(literals.evaluate(0, value)?.cell),
                Expression::Binary(_) => warn!("skipping non-literal insert value {value}"),
            }
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn get_row(&self, row_index: usize) -> Option<&[MemoryCell]> {
        self.rows.get(row_index).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;
    use crate::parser::parse;

    fn definitions(sql: &str) -> Vec<ColumnDefinition> {
        match parse(sql).unwrap().statements.remove(0) {
            Statement::CreateTable(create) => create.columns,
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    fn values(sql: &str) -> Vec<Expression> {
        match parse(sql).unwrap().statements.remove(0) {
            Statement::Insert(insert) => insert.values,
            other => panic!("expected INSERT, got {other:?}"),
        }
    }

    fn users() -> Table {
        Table::from_definitions(&definitions("CREATE TABLE users (id INT PRIMARY KEY, name TEXT)")).unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = users();
        assert_eq!(table.columns, vec!["id", "name"]);
        assert_eq!(table.column_types, vec![ColumnType::Int, ColumnType::Text]);
        assert_eq!(table.primary_key, Some(0));
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_invalid_datatype() {
        for sql in [
            "CREATE TABLE t (flag BOOLEAN)",
            "CREATE TABLE t (a INT, b PRIMARY KEY)",
        ] {
            let result = Table::from_definitions(&definitions(sql));
            assert!(matches!(result, Err(DbError::InvalidDatatype(_))), "{sql}");
        }
    }

    #[test]
    fn test_table_insert_and_get() {
        let mut table = users();
        table.insert(&values("INSERT INTO users VALUES (1, 'Alice')")).unwrap();
        table.insert(&values("INSERT INTO users VALUES (2, null)")).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.get_row(0).unwrap(),
            &[MemoryCell::from_int(1), MemoryCell::from_text("Alice")]
        );
        assert_eq!(
            table.get_row(1).unwrap(),
            &[MemoryCell::from_int(2), MemoryCell::empty()]
        );
        assert!(table.get_row(2).is_none());
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut table = users();

        let result = table.insert(&values("INSERT INTO users VALUES (1)"));
        assert_eq!(result, Err(DbError::MissingValues { expected: 2, found: 1 }));

        let result = table.insert(&values("INSERT INTO users VALUES (1, 'a', 'b')"));
        assert_eq!(result, Err(DbError::MissingValues { expected: 2, found: 3 }));

        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_insert_is_all_or_nothing() {
        let mut table = users();

        let result = table.insert(&values("INSERT INTO users VALUES (1, name)"));
        assert_eq!(result, Err(DbError::ColumnDoesNotExist("name".into())));

        let result = table.insert(&values("INSERT INTO users VALUES (1.5, 'a')"));
        assert_eq!(result, Err(DbError::InvalidNumeric("1.5".into())));

        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_non_literal_values_are_skipped() {
        let mut table = users();
        table.insert(&values("INSERT INTO users VALUES (1 + 1, 'Bob')")).unwrap();

        assert_eq!(table.get_row(0).unwrap(), &[MemoryCell::from_text("Bob")]);
    }

    #[test]
    fn test_column_index() {
        let table = users();
        assert_eq!(table.column_index("id"), Some(0));
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(table.column_index("age"), None);
    }

    #[test]
    fn test_constant_table() {
        let table = Table::constant();
        assert!(table.columns.is_empty());
        assert_eq!(table.row_count(), 1);
    }
}
