//! Error types for lexing, parsing and executing statements.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// No sub-lexer matched the input at `line:column`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to lex token{hint}, at {line}:{column}")]
pub struct LexError {
    pub hint: String,
    pub line: usize,
    pub column: usize,
}

/// A statement did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{hint}, near {line}:{column}")]
pub struct ParseError {
    pub hint: String,
    pub line: usize,
    pub column: usize,
}

/// Failures raised while executing a statement against the table store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("Invalid datatype: {0}")]
    InvalidDatatype(String),

    #[error("Table does not exist: {0}")]
    TableDoesNotExist(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Missing values: expected {expected}, found {found}")]
    MissingValues { expected: usize, found: usize },

    #[error("Column does not exist: {0}")]
    ColumnDoesNotExist(String),

    #[error("Invalid operands for {0}")]
    InvalidOperands(String),

    #[error("Invalid cell")]
    InvalidCell,

    #[error("Invalid numeric literal: {0}")]
    InvalidNumeric(String),

    #[error("Statement is not a query")]
    NotAQuery,

    #[error("Parameterized queries are not supported")]
    ParametersNotSupported,
}

/// Any failure from source text to result set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Db(#[from] DbError),
}
