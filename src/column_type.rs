use std::fmt;

use allocative::Allocative;

/// The declared type of a table column, and the inferred type of an
/// evaluated expression. It decides how a cell's bytes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Allocative)]
pub enum ColumnType {
    /// Raw UTF-8 bytes.
    Text,
    /// A 32-bit signed integer, stored big-endian.
    Int,
    /// Non-empty for true, no bytes for false.
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Text => "text",
            ColumnType::Int => "int",
            ColumnType::Bool => "bool",
        })
    }
}
