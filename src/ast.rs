use std::fmt;

use crate::tokenizer::Token;

/// The statements parsed from one piece of source text, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
}

/// An expression tree. Binary nodes own their operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// An identifier, numeric, string, bool or null token.
    Literal(Token),
    Binary(BinaryExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub operator: Token,
}

impl Expression {
    pub fn binary(left: Expression, operator: Token, right: Expression) -> Self {
        Expression::Binary(BinaryExpression {
            left: Box::new(left),
            right: Box::new(right),
            operator,
        })
    }
}

/// Binary expressions are fully parenthesised so the grouping is visible.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(token) => write!(f, "{token}"),
            Expression::Binary(binary) => write!(
                f,
                "({} {} {})",
                binary.left, binary.operator.value, binary.right
            ),
        }
    }
}

/// One projection of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`, every column of the FROM table.
    Asterisk,
    Expression {
        expression: Expression,
        alias: Option<Token>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub items: Vec<SelectItem>,
    pub from: Option<Token>,
    pub where_clause: Option<Expression>,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: Token,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Token,
    pub datatype: Token,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: Token,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub name: Token,
}
