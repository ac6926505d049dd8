use allocative::Allocative;

use crate::error::DbError;
use crate::tokenizer::{Token, TokenKind};

/// Read access to a stored value. How the bytes are read depends on the
/// column type the caller knows the cell belongs to.
pub trait Cell {
    fn as_text(&self) -> String;
    fn as_int(&self) -> i32;
    fn as_bool(&self) -> bool;
}

/// A cell backed by raw bytes.
///
/// `None` is the "no value" marker: it is what `false` and `NULL` convert
/// to. Equality is byte equality, and a cell without value only equals
/// another cell without value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Allocative)]
pub struct MemoryCell(Option<Vec<u8>>);

impl MemoryCell {
    /// The cell without value.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn from_int(value: i32) -> Self {
        Self(Some(value.to_be_bytes().to_vec()))
    }

    pub fn from_text(value: &str) -> Self {
        Self(Some(value.as_bytes().to_vec()))
    }

    pub fn from_bool(value: bool) -> Self {
        if value { Self(Some(vec![1])) } else { Self(None) }
    }

    /// Converts a literal token to its stored representation.
    ///
    /// Numeric tokens become big-endian `i32`s, strings their UTF-8 bytes,
    /// booleans `[1]` or nothing. Every other token kind has no value.
    ///
    /// # Errors
    /// Returns [DbError::InvalidNumeric] if a numeric literal does not fit a
    /// 32-bit signed integer (this includes decimals and exponents).
    pub fn from_literal(token: &Token) -> Result<Self, DbError> {
        match token.kind {
            TokenKind::Numeric => token
                .value
                .parse::<i32>()
                .map(Self::from_int)
                .map_err(|_| DbError::InvalidNumeric(token.value.clone())),
            TokenKind::String => Ok(Self::from_text(&token.value)),
            TokenKind::Bool => Ok(Self::from_bool(token.value == "true")),
            _ => Ok(Self::empty()),
        }
    }

    /// The underlying bytes; empty when there is no value.
    pub fn bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or_default()
    }

    /// Returns `true` for the cell without value.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Byte concatenation, used by `||`.
    pub fn concat(&self, other: &MemoryCell) -> Self {
        let mut bytes = self.bytes().to_vec();
        bytes.extend_from_slice(other.bytes());
        Self(Some(bytes))
    }
}

impl Cell for MemoryCell {
    fn as_text(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }

    fn as_int(&self) -> i32 {
        match self.bytes().first_chunk::<4>() {
            Some(bytes) => i32::from_be_bytes(*bytes),
            None => {
                log::warn!("corrupted int cell {:?}", self.bytes());
                0
            }
        }
    }

    fn as_bool(&self) -> bool {
        !self.bytes().is_empty()
    }
}
