use std::fmt;

use bitvec::prelude::*;

use crate::error::LexError;

/// Position of a token in the source text. Both fields are zero-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Progress marker threaded through the sub-lexers.
///
/// `pointer` is a byte offset into the source, `location` the matching
/// line/column used for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub pointer: usize,
    pub location: Location,
}

impl Cursor {
    /// Moves forward by `bytes` on the current line.
    fn advance(self, bytes: usize) -> Self {
        Self {
            pointer: self.pointer + bytes,
            location: Location {
                line: self.location.line,
                column: self.location.column + bytes,
            },
        }
    }
}

/// The lexical class of a [Token].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Symbol,
    Identifier,
    String,
    Numeric,
    Bool,
    Null,
}

/// Reserved words, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    As,
    Table,
    Create,
    Drop,
    Insert,
    Into,
    Values,
    Int,
    Text,
    Boolean,
    Where,
    And,
    Or,
    True,
    False,
    Unique,
    Index,
    On,
    PrimaryKey,
    Null,
    Limit,
    Offset,
}

impl Keyword {
    pub const ALL: [Keyword; 24] = [
        Keyword::Select,
        Keyword::Insert,
        Keyword::Values,
        Keyword::Table,
        Keyword::Create,
        Keyword::Drop,
        Keyword::Where,
        Keyword::From,
        Keyword::Into,
        Keyword::Text,
        Keyword::Boolean,
        Keyword::Int,
        Keyword::And,
        Keyword::Or,
        Keyword::As,
        Keyword::True,
        Keyword::False,
        Keyword::Unique,
        Keyword::Index,
        Keyword::On,
        Keyword::PrimaryKey,
        Keyword::Null,
        Keyword::Limit,
        Keyword::Offset,
    ];

    /// The lower-case spelling stored in a token's value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::Select => "select",
            Keyword::From => "from",
            Keyword::As => "as",
            Keyword::Table => "table",
            Keyword::Create => "create",
            Keyword::Drop => "drop",
            Keyword::Insert => "insert",
            Keyword::Into => "into",
            Keyword::Values => "values",
            Keyword::Int => "int",
            Keyword::Text => "text",
            Keyword::Boolean => "boolean",
            Keyword::Where => "where",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Unique => "unique",
            Keyword::Index => "index",
            Keyword::On => "on",
            Keyword::PrimaryKey => "primary key",
            Keyword::Null => "null",
            Keyword::Limit => "limit",
            Keyword::Offset => "offset",
        }
    }
}

/// Punctuation and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Semicolon,
    Asterisk,
    Comma,
    LeftParen,
    RightParen,
    Eq,
    NotEq,
    /// `!=`, rewritten to [Symbol::NotEq] by the lexer.
    BangEq,
    Concat,
    Plus,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Symbol {
    pub const ALL: [Symbol; 14] = [
        Symbol::Eq,
        Symbol::NotEq,
        Symbol::BangEq,
        Symbol::Lt,
        Symbol::LtEq,
        Symbol::Gt,
        Symbol::GtEq,
        Symbol::Concat,
        Symbol::Plus,
        Symbol::Comma,
        Symbol::LeftParen,
        Symbol::RightParen,
        Symbol::Semicolon,
        Symbol::Asterisk,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Symbol::Semicolon => ";",
            Symbol::Asterisk => "*",
            Symbol::Comma => ",",
            Symbol::LeftParen => "(",
            Symbol::RightParen => ")",
            Symbol::Eq => "=",
            Symbol::NotEq => "<>",
            Symbol::BangEq => "!=",
            Symbol::Concat => "||",
            Symbol::Plus => "+",
            Symbol::Lt => "<",
            Symbol::LtEq => "<=",
            Symbol::Gt => ">",
            Symbol::GtEq => ">=",
        }
    }
}

/// The smallest meaningful unit of the SQL language.
///
/// Two tokens are equal when their kind and value match; the location is
/// only carried for error messages.
#[derive(Debug, Clone)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    pub location: Location,
    /// Position just past the token's source text, quotes included.
    pub end: Location,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for Token {}

impl Token {
    pub fn new(value: impl Into<String>, kind: TokenKind, location: Location) -> Self {
        Self {
            value: value.into(),
            kind,
            location,
            end: location,
        }
    }

    /// A location-less keyword token, used for matching.
    pub fn keyword(keyword: Keyword) -> Self {
        Self::new(keyword.as_str(), TokenKind::Keyword, Location::default())
    }

    /// A location-less symbol token, used for matching.
    pub fn symbol(symbol: Symbol) -> Self {
        Self::new(symbol.as_str(), TokenKind::Symbol, Location::default())
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword && self.value == keyword.as_str()
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol && self.value == symbol.as_str()
    }

    /// Precedence rank of a binary operator token; higher binds tighter.
    /// Anything that is not an operator ranks 0.
    pub fn binding_power(&self) -> u8 {
        match self.kind {
            TokenKind::Keyword if self.is_keyword(Keyword::And) || self.is_keyword(Keyword::Or) => {
                1
            }
            TokenKind::Symbol => match self.value.as_str() {
                "=" | "<>" => 2,
                "<" | ">" => 3,
                "<=" | ">=" => 4,
                "||" | "+" => 5,
                _ => 0,
            },
            _ => 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "'{}'", self.value.replace('\'', "''")),
            TokenKind::Identifier if !is_plain_identifier(&self.value) => {
                write!(f, "\"{}\"", self.value.replace('"', "\"\""))
            }
            _ => f.write_str(&self.value),
        }
    }
}

fn is_plain_identifier(value: &str) -> bool {
    let mut bytes = value.bytes();
    bytes
        .next()
        .is_some_and(|c| c.is_ascii_lowercase())
        && bytes.all(|c| is_identifier_char(c) && !c.is_ascii_uppercase())
}

fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'$' || c == b'_'
}

/// A sub-lexer: on a match returns the token (none for discarded input
/// such as whitespace) and the advanced cursor.
type LexFn = fn(&str, Cursor) -> Option<(Option<Token>, Cursor)>;

/// Splits source text into tokens.
///
/// At each position the keyword, symbol, string, numeric and identifier
/// lexers are tried in that order and the first match wins.
///
/// # Errors
/// Returns a [LexError] carrying the position when no lexer matches.
///
/// # Example
/// ```
/// # use tinysql::tokenizer::{lex, TokenKind};
/// let tokens = lex("SELECT a").unwrap();
/// assert_eq!(tokens[0].value, "select");
/// assert_eq!(tokens[1].kind, TokenKind::Identifier);
/// ```
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    const LEXERS: [LexFn; 5] = [
        lex_keyword,
        lex_symbol,
        lex_string,
        lex_numeric,
        lex_identifier,
    ];

    let mut tokens: Vec<Token> = Vec::new();
    let mut cursor = Cursor::default();

    'lex: while cursor.pointer < source.len() {
        for lexer in LEXERS {
            if let Some((token, next)) = lexer(source, cursor) {
                cursor = next;
                if let Some(mut token) = token {
                    token.end = next.location;
                    tokens.push(token);
                }
                continue 'lex;
            }
        }

        let mut hint = tokens
            .last()
            .map(|token| format!(" after {}", token.value))
            .unwrap_or_default();
        let failing = source.as_bytes()[cursor.pointer];
        if matches!(failing, b'\'' | b'"') {
            // a closed literal only fails here when it is an empty identifier
            match lex_character_delimited(source, cursor, failing) {
                Some(_) => hint.push_str(": empty quoted identifier"),
                None => hint.push_str(": unterminated quoted literal"),
            }
        }
        return Err(LexError {
            hint,
            line: cursor.location.line,
            column: cursor.location.column,
        });
    }

    Ok(tokens)
}

/// Finds the longest option that matches the source at `initial`.
///
/// A lower-cased prefix grows one byte at a time. Options that stop sharing
/// the prefix are eliminated, exact matches are recorded (keeping the
/// longest) and eliminated too, and the scan ends once nothing is left.
fn longest_match(source: &str, initial: Cursor, options: &[&'static str]) -> Option<&'static str> {
    let bytes = source.as_bytes();
    let mut value: Vec<u8> = Vec::new();
    let mut eliminated = bitvec![0; options.len()];
    let mut matched: Option<&'static str> = None;
    let mut pointer = initial.pointer;

    while pointer < bytes.len() && !eliminated.all() {
        value.push(bytes[pointer].to_ascii_lowercase());
        pointer += 1;

        for (i, option) in options.iter().enumerate() {
            if eliminated[i] {
                continue;
            }

            // int vs into: remember the exact match, keep looking for longer
            if option.as_bytes() == value.as_slice() {
                eliminated.set(i, true);
                if matched.is_none_or(|m| option.len() > m.len()) {
                    matched = Some(*option);
                }
                continue;
            }

            if value.len() > option.len() || !option.as_bytes().starts_with(&value) {
                eliminated.set(i, true);
            }
        }
    }

    matched
}

fn lex_keyword(source: &str, initial: Cursor) -> Option<(Option<Token>, Cursor)> {
    let options = Keyword::ALL.map(Keyword::as_str);
    let matched = longest_match(source, initial, &options)?;

    // `integer` is an identifier, not `int` followed by `eger`
    let end = initial.pointer + matched.len();
    if source
        .as_bytes()
        .get(end)
        .is_some_and(|&c| is_identifier_char(c))
    {
        return None;
    }

    let kind = if matched == Keyword::True.as_str() || matched == Keyword::False.as_str() {
        TokenKind::Bool
    } else if matched == Keyword::Null.as_str() {
        TokenKind::Null
    } else {
        TokenKind::Keyword
    };

    Some((
        Some(Token::new(matched, kind, initial.location)),
        initial.advance(matched.len()),
    ))
}

fn lex_symbol(source: &str, initial: Cursor) -> Option<(Option<Token>, Cursor)> {
    let c = *source.as_bytes().get(initial.pointer)?;

    match c {
        b'\n' => {
            let cursor = Cursor {
                pointer: initial.pointer + 1,
                location: Location {
                    line: initial.location.line + 1,
                    column: 0,
                },
            };
            return Some((None, cursor));
        }
        b' ' | b'\t' | b'\r' => return Some((None, initial.advance(1))),
        _ => {}
    }

    let options = Symbol::ALL.map(Symbol::as_str);
    let matched = longest_match(source, initial, &options)?;
    let value = if matched == Symbol::BangEq.as_str() {
        Symbol::NotEq.as_str()
    } else {
        matched
    };

    Some((
        Some(Token::new(value, TokenKind::Symbol, initial.location)),
        initial.advance(matched.len()),
    ))
}

/// Reads text between two `delimiter`s. A doubled delimiter inside the
/// text stands for one literal delimiter. Returns `None` when the input
/// does not start with the delimiter or ends before the closing one.
fn lex_character_delimited(source: &str, initial: Cursor, delimiter: u8) -> Option<(Token, Cursor)> {
    let bytes = source.as_bytes();
    if bytes.get(initial.pointer) != Some(&delimiter) {
        return None;
    }

    let mut value: Vec<u8> = Vec::new();
    let mut cursor = initial.advance(1);

    while cursor.pointer < bytes.len() {
        let c = bytes[cursor.pointer];

        if c == delimiter {
            if bytes.get(cursor.pointer + 1) == Some(&delimiter) {
                value.push(delimiter);
                cursor = cursor.advance(2);
                continue;
            }

            cursor = cursor.advance(1);
            // delimiters are ASCII so the bytes between them are still UTF-8
            let value = String::from_utf8(value).ok()?;
            return Some((Token::new(value, TokenKind::String, initial.location), cursor));
        }

        value.push(c);
        cursor = if c == b'\n' {
            Cursor {
                pointer: cursor.pointer + 1,
                location: Location {
                    line: cursor.location.line + 1,
                    column: 0,
                },
            }
        } else {
            cursor.advance(1)
        };
    }

    None
}

fn lex_string(source: &str, initial: Cursor) -> Option<(Option<Token>, Cursor)> {
    lex_character_delimited(source, initial, b'\'').map(|(token, cursor)| (Some(token), cursor))
}

/// Digits with at most one `.` and at most one `e` exponent marker, which
/// may carry a sign and forbids any later `.`.
fn lex_numeric(source: &str, initial: Cursor) -> Option<(Option<Token>, Cursor)> {
    let bytes = source.as_bytes();
    let mut pointer = initial.pointer;
    let mut period_found = false;
    let mut exp_marker_found = false;

    while pointer < bytes.len() {
        let c = bytes[pointer];
        let is_digit = c.is_ascii_digit();
        let is_period = c == b'.';
        let is_exp_marker = c == b'e';

        if pointer == initial.pointer {
            if !is_digit && !is_period {
                return None;
            }
            period_found = is_period;
            pointer += 1;
            continue;
        }

        if is_period {
            if period_found {
                return None;
            }
            period_found = true;
            pointer += 1;
            continue;
        }

        if is_exp_marker {
            if exp_marker_found {
                return None;
            }
            period_found = true;
            exp_marker_found = true;

            // the marker must be followed by something
            if pointer == bytes.len() - 1 {
                return None;
            }
            if matches!(bytes[pointer + 1], b'-' | b'+') {
                pointer += 1;
            }
            pointer += 1;
            continue;
        }

        if !is_digit {
            break;
        }
        pointer += 1;
    }

    if pointer == initial.pointer {
        return None;
    }

    let length = pointer - initial.pointer;
    Some((
        Some(Token::new(
            &source[initial.pointer..pointer],
            TokenKind::Numeric,
            initial.location,
        )),
        initial.advance(length),
    ))
}

/// Bare identifiers are ASCII, start with a letter and are folded to lower
/// case. Double-quoted identifiers keep their case and content.
fn lex_identifier(source: &str, initial: Cursor) -> Option<(Option<Token>, Cursor)> {
    if let Some((mut token, cursor)) = lex_character_delimited(source, initial, b'"') {
        if token.value.is_empty() {
            return None;
        }
        token.kind = TokenKind::Identifier;
        return Some((Some(token), cursor));
    }

    let bytes = source.as_bytes();
    if !bytes.get(initial.pointer)?.is_ascii_alphabetic() {
        return None;
    }

    let length = bytes[initial.pointer..]
        .iter()
        .take_while(|&&c| is_identifier_char(c))
        .count();
    let value = source[initial.pointer..initial.pointer + length].to_ascii_lowercase();

    Some((
        Some(Token::new(value, TokenKind::Identifier, initial.location)),
        initial.advance(length),
    ))
}
