use std::fmt;

use crate::cell::{Cell, MemoryCell};
use crate::column_type::ColumnType;

/// A decoded cell, as handed to driver callers.
///
/// Cells are stored as raw bytes; this enum reads them with the type of
/// the column they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A 32-bit signed integer value.
    Int(i32),
    /// A UTF-8 string value.
    Text(String),
    /// A boolean value.
    Bool(bool),
}

impl Value {
    /// Reads `cell` as `column_type`.
    pub fn decode(cell: &MemoryCell, column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int => Self::Int(cell.as_int()),
            ColumnType::Text => Self::Text(cell.as_text()),
            ColumnType::Bool => Self::Bool(cell.as_bool()),
        }
    }

    /// Returns the inner integer value if this is a [Value::Int].
    /// Otherwise, returns `None`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a reference to the inner string slice if this is a [Value::Text].
    /// Otherwise, returns `None`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the inner boolean value if this is a [Value::Bool].
    /// Otherwise, returns `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the [ColumnType] this value decodes from.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Int(_) => ColumnType::Int,
            Self::Text(_) => ColumnType::Text,
            Self::Bool(_) => ColumnType::Bool,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}
