//! Expression evaluation against one row of a table.
//!
//! A cell's bytes are only meaningful together with a [ColumnType], so every
//! evaluation yields the cell, the type it is read with, and the name it is
//! displayed under in a result set.

use crate::ast::{BinaryExpression, Expression};
use crate::cell::{Cell, MemoryCell};
use crate::column_type::ColumnType;
use crate::error::DbError;
use crate::table::Table;
use crate::tokenizer::{Keyword, Symbol, Token, TokenKind};

/// Display name of a result column that is not a plain column reference.
pub const ANONYMOUS_COLUMN: &str = "?column?";

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub cell: MemoryCell,
    pub name: String,
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    NotEq,
    Concat,
    Plus,
    And,
    Or,
}

impl Operator {
    fn from_token(token: &Token) -> Option<Self> {
        let operator = match token.kind {
            TokenKind::Symbol if token.is_symbol(Symbol::Eq) => Operator::Eq,
            TokenKind::Symbol if token.is_symbol(Symbol::NotEq) => Operator::NotEq,
            TokenKind::Symbol if token.is_symbol(Symbol::Concat) => Operator::Concat,
            TokenKind::Symbol if token.is_symbol(Symbol::Plus) => Operator::Plus,
            TokenKind::Keyword if token.is_keyword(Keyword::And) => Operator::And,
            TokenKind::Keyword if token.is_keyword(Keyword::Or) => Operator::Or,
            _ => return None,
        };
        Some(operator)
    }

    fn result_type(self) -> ColumnType {
        match self {
            Operator::Eq | Operator::NotEq | Operator::And | Operator::Or => ColumnType::Bool,
            Operator::Concat => ColumnType::Text,
            Operator::Plus => ColumnType::Int,
        }
    }
}

/// Type a non-identifier literal is read with. `null` reads as Int.
fn literal_type(token: &Token) -> Result<ColumnType, DbError> {
    match token.kind {
        TokenKind::Numeric | TokenKind::Null => Ok(ColumnType::Int),
        TokenKind::String => Ok(ColumnType::Text),
        TokenKind::Bool => Ok(ColumnType::Bool),
        _ => Err(DbError::InvalidCell),
    }
}

impl Table {
    /// Evaluates `expression` against the row at `row_index`.
    ///
    /// Identifiers resolve to the row's cell for that column. Other literals
    /// are converted the same way INSERT converts them. Both operands of a
    /// binary expression are always evaluated, left first.
    ///
    /// # Errors
    /// - [DbError::ColumnDoesNotExist] for an unknown identifier
    /// - [DbError::InvalidOperands] when an operator gets operand types it
    ///   does not support (`=` and `<>` accept any pair)
    /// - [DbError::InvalidCell] for an unsupported operator, or a row too
    ///   short to hold the referenced column
    pub fn evaluate(&self, row_index: usize, expression: &Expression) -> Result<Evaluated, DbError> {
        match expression {
            Expression::Literal(token) => self.evaluate_literal(row_index, token),
            Expression::Binary(binary) => self.evaluate_binary(row_index, binary),
        }
    }

    fn evaluate_literal(&self, row_index: usize, token: &Token) -> Result<Evaluated, DbError> {
        if token.kind == TokenKind::Identifier {
            let index = self
                .column_index(&token.value)
                .ok_or_else(|| DbError::ColumnDoesNotExist(token.value.clone()))?;
            let cell = self
                .get_row(row_index)
                .and_then(|row| row.get(index))
                .ok_or(DbError::InvalidCell)?;

            return Ok(Evaluated {
                cell: cell.clone(),
                name: token.value.clone(),
                column_type: self.column_types[index],
            });
        }

        Ok(Evaluated {
            column_type: literal_type(token)?,
            cell: MemoryCell::from_literal(token)?,
            name: ANONYMOUS_COLUMN.to_string(),
        })
    }

    fn evaluate_binary(&self, row_index: usize, binary: &BinaryExpression) -> Result<Evaluated, DbError> {
        let left = self.evaluate(row_index, &binary.left)?;
        let right = self.evaluate(row_index, &binary.right)?;
        let operator = Operator::from_token(&binary.operator).ok_or(DbError::InvalidCell)?;

        let require = |expected: ColumnType| {
            if left.column_type == expected && right.column_type == expected {
                Ok(())
            } else {
                Err(DbError::InvalidOperands(format!(
                    "{}: {} and {}",
                    binary.operator.value, left.column_type, right.column_type
                )))
            }
        };

        let same = left.column_type == right.column_type && left.cell == right.cell;

        let cell = match operator {
            Operator::Eq => MemoryCell::from_bool(same),
            Operator::NotEq => MemoryCell::from_bool(!same),
            Operator::Concat => {
                require(ColumnType::Text)?;
                left.cell.concat(&right.cell)
            }
            Operator::Plus => {
                require(ColumnType::Int)?;
                MemoryCell::from_int(left.cell.as_int().wrapping_add(right.cell.as_int()))
            }
            Operator::And => {
                require(ColumnType::Bool)?;
                MemoryCell::from_bool(left.cell.as_bool() && right.cell.as_bool())
            }
            Operator::Or => {
                require(ColumnType::Bool)?;
                MemoryCell::from_bool(left.cell.as_bool() || right.cell.as_bool())
            }
        };

        Ok(Evaluated {
            cell,
            name: ANONYMOUS_COLUMN.to_string(),
            column_type: operator.result_type(),
        })
    }

    /// Infers the display name and type of `expression` without reading a
    /// row. Used to name the columns of a result set with no rows.
    ///
    /// Unknown columns and operators fail as in [Table::evaluate]; operand
    /// types are not checked.
    pub fn describe(&self, expression: &Expression) -> Result<(String, ColumnType), DbError> {
        match expression {
            Expression::Literal(token) if token.kind == TokenKind::Identifier => {
                let index = self
                    .column_index(&token.value)
                    .ok_or_else(|| DbError::ColumnDoesNotExist(token.value.clone()))?;
                Ok((token.value.clone(), self.column_types[index]))
            }
            Expression::Literal(token) => Ok((ANONYMOUS_COLUMN.to_string(), literal_type(token)?)),
            Expression::Binary(binary) => {
                self.describe(&binary.left)?;
                self.describe(&binary.right)?;
                let operator = Operator::from_token(&binary.operator).ok_or(DbError::InvalidCell)?;
                Ok((ANONYMOUS_COLUMN.to_string(), operator.result_type()))
            }
        }
    }
}
