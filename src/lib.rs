//! A tiny in-memory SQL engine: a lexer, a precedence-climbing parser and a
//! row store supporting `CREATE TABLE`, `INSERT`, `SELECT` and `DROP TABLE`.

pub mod ast;
pub mod cell;
pub mod column_type;
pub mod database;
pub mod driver;
pub mod error;
pub mod eval;
pub mod parser;
pub mod shared;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use cell::{Cell, MemoryCell};
pub use column_type::ColumnType;
pub use database::{Backend, Database, Outcome, ResultColumn, Results};
pub use driver::{Connection, Rows};
pub use error::{DbError, Error, LexError, ParseError, Result};
pub use parser::parse;
pub use shared::SharedDatabase;
pub use table::Table;
pub use tokenizer::lex;
pub use value::Value;
