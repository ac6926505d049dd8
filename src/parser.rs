use crate::ast::*;
use crate::error::{Error, ParseError};
use crate::tokenizer::{Keyword, Symbol, Token, TokenKind, lex};

/// A parsed value and the cursor just past it.
type Parsed<T> = Result<(T, usize), ParseError>;

/// Like [Parsed], with `None` when the statement's leading keyword is
/// absent so the next statement form can be tried.
type Attempt<T> = Result<Option<(T, usize)>, ParseError>;

/// Lexes and parses source text into statements.
///
/// # Example
/// ```
/// # use tinysql::ast::Statement;
/// let ast = tinysql::parse("CREATE TABLE users (id INT); SELECT id FROM users;").unwrap();
/// assert_eq!(ast.statements.len(), 2);
/// assert!(matches!(ast.statements[1], Statement::Select(_)));
/// ```
pub fn parse(source: &str) -> Result<Ast, Error> {
    let tokens = lex(source)?;
    Ok(Parser::new(&tokens).parse()?)
}

/// Recursive-descent parser over a token slice.
///
/// The parser itself holds no position: every step takes a cursor (an
/// index into the tokens) and returns the cursor after what it consumed.
pub struct Parser<'a> {
    tokens: &'a [Token],
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens }
    }

    /// Parses `;`-separated statements until the tokens run out. The
    /// semicolon after the last statement is optional.
    pub fn parse(&self) -> Result<Ast, ParseError> {
        let semicolon = Token::symbol(Symbol::Semicolon);
        let mut statements = Vec::new();
        let mut cursor = 0;

        while cursor < self.tokens.len() {
            let (statement, next) = self.parse_statement(cursor)?;
            statements.push(statement);
            cursor = next;

            if cursor < self.tokens.len() && !self.expect(cursor, &semicolon) {
                return Err(self.error(cursor, "Expected semicolon between statements"));
            }
            while self.expect(cursor, &semicolon) {
                cursor += 1;
            }
        }

        Ok(Ast { statements })
    }

    fn parse_statement(&self, cursor: usize) -> Parsed<Statement> {
        if let Some((select, next)) = self.parse_select(cursor)? {
            return Ok((Statement::Select(select), next));
        }
        if let Some((insert, next)) = self.parse_insert(cursor)? {
            return Ok((Statement::Insert(insert), next));
        }
        if let Some((create, next)) = self.parse_create_table(cursor)? {
            return Ok((Statement::CreateTable(create), next));
        }
        if let Some((drop, next)) = self.parse_drop_table(cursor)? {
            return Ok((Statement::DropTable(drop), next));
        }

        Err(self.error(cursor, "Expected statement"))
    }

    // helpers

    fn peek(&self, cursor: usize) -> Option<&'a Token> {
        self.tokens.get(cursor)
    }

    fn expect(&self, cursor: usize, expected: &Token) -> bool {
        self.peek(cursor) == Some(expected)
    }

    fn consume(&self, cursor: usize, expected: &Token, hint: &str) -> Result<usize, ParseError> {
        if self.expect(cursor, expected) {
            Ok(cursor + 1)
        } else {
            Err(self.error(cursor, hint))
        }
    }

    fn consume_kind(&self, cursor: usize, kind: TokenKind, hint: &str) -> Parsed<Token> {
        match self.peek(cursor) {
            Some(token) if token.kind == kind => Ok((token.clone(), cursor + 1)),
            _ => Err(self.error(cursor, hint)),
        }
    }

    /// Builds an error pointing at the token under `cursor`, or just past
    /// the last token when the input ended early.
    fn error(&self, cursor: usize, hint: &str) -> ParseError {
        let (found, location) = match self.peek(cursor) {
            Some(token) => (format!("got {}", token.value), token.location),
            None => {
                let location = self
                    .tokens
                    .last()
                    .map(|last| last.end)
                    .unwrap_or_default();
                ("got end of input".to_string(), location)
            }
        };

        ParseError {
            hint: format!("{hint}, {found}"),
            line: location.line,
            column: location.column,
        }
    }

    // statements

    fn parse_select(&self, cursor: usize) -> Attempt<SelectStatement> {
        if !self.expect(cursor, &Token::keyword(Keyword::Select)) {
            return Ok(None);
        }
        let mut cursor = cursor + 1;

        let semicolon = Token::symbol(Symbol::Semicolon);
        let from = Token::keyword(Keyword::From);
        let where_keyword = Token::keyword(Keyword::Where);
        let limit = Token::keyword(Keyword::Limit);
        let offset = Token::keyword(Keyword::Offset);

        let (items, next) = self.parse_select_items(
            cursor,
            &[
                from.clone(),
                where_keyword.clone(),
                limit.clone(),
                offset.clone(),
                semicolon.clone(),
            ],
        )?;
        cursor = next;

        let mut select = SelectStatement {
            items,
            from: None,
            where_clause: None,
            limit: None,
            offset: None,
        };

        if self.expect(cursor, &from) {
            let (table, next) =
                self.consume_kind(cursor + 1, TokenKind::Identifier, "Expected table name after FROM")?;
            select.from = Some(table);
            cursor = next;
        }

        if self.expect(cursor, &where_keyword) {
            let (condition, next) = self.parse_expression(
                cursor + 1,
                &[limit.clone(), offset.clone(), semicolon.clone()],
                0,
            )?;
            select.where_clause = Some(condition);
            cursor = next;
        }

        // LIMIT and OFFSET may come in either order, each at most once
        loop {
            if select.limit.is_none() && self.expect(cursor, &limit) {
                let (count, next) =
                    self.parse_expression(cursor + 1, &[offset.clone(), semicolon.clone()], 0)?;
                select.limit = Some(count);
                cursor = next;
            } else if select.offset.is_none() && self.expect(cursor, &offset) {
                let (skip, next) =
                    self.parse_expression(cursor + 1, &[limit.clone(), semicolon.clone()], 0)?;
                select.offset = Some(skip);
                cursor = next;
            } else {
                break;
            }
        }

        Ok(Some((select, cursor)))
    }

    /// Parses `item (, item)*` up to one of `delimiters` or the end of
    /// input. An item is `*` or an expression with an optional `AS alias`.
    fn parse_select_items(&self, cursor: usize, delimiters: &[Token]) -> Parsed<Vec<SelectItem>> {
        let comma = Token::symbol(Symbol::Comma);
        let as_keyword = Token::keyword(Keyword::As);
        let mut item_delimiters = vec![comma.clone(), as_keyword.clone()];
        item_delimiters.extend_from_slice(delimiters);

        let mut items = Vec::new();
        let mut cursor = cursor;

        while let Some(current) = self.peek(cursor) {
            if delimiters.contains(current) {
                break;
            }

            if !items.is_empty() {
                cursor = self.consume(cursor, &comma, "Expected comma")?;
            }

            if self.expect(cursor, &Token::symbol(Symbol::Asterisk)) {
                items.push(SelectItem::Asterisk);
                cursor += 1;
                continue;
            }

            let (expression, next) = self.parse_expression(cursor, &item_delimiters, 0)?;
            cursor = next;

            let mut alias = None;
            if self.expect(cursor, &as_keyword) {
                let (name, next) = self.consume_kind(
                    cursor + 1,
                    TokenKind::Identifier,
                    "Expected identifier after AS",
                )?;
                alias = Some(name);
                cursor = next;
            }

            items.push(SelectItem::Expression { expression, alias });
        }

        Ok((items, cursor))
    }

    fn parse_insert(&self, cursor: usize) -> Attempt<InsertStatement> {
        if !self.expect(cursor, &Token::keyword(Keyword::Insert)) {
            return Ok(None);
        }

        let right_paren = Token::symbol(Symbol::RightParen);

        let cursor = self.consume(cursor + 1, &Token::keyword(Keyword::Into), "Expected INTO")?;
        let (table, cursor) = self.consume_kind(cursor, TokenKind::Identifier, "Expected table name")?;
        let cursor = self.consume(cursor, &Token::keyword(Keyword::Values), "Expected VALUES")?;
        let cursor = self.consume(
            cursor,
            &Token::symbol(Symbol::LeftParen),
            "Expected left parenthesis",
        )?;
        let (values, cursor) = self.parse_expressions(cursor, &right_paren)?;
        let cursor = self.consume(cursor, &right_paren, "Expected right parenthesis")?;

        Ok(Some((InsertStatement { table, values }, cursor)))
    }

    /// Comma-separated expressions up to `delimiter` (not consumed).
    fn parse_expressions(&self, cursor: usize, delimiter: &Token) -> Parsed<Vec<Expression>> {
        let comma = Token::symbol(Symbol::Comma);
        let delimiters = [comma.clone(), delimiter.clone()];
        let mut expressions = Vec::new();
        let mut cursor = cursor;

        while let Some(current) = self.peek(cursor) {
            if current == delimiter {
                break;
            }

            if !expressions.is_empty() {
                cursor = self.consume(cursor, &comma, "Expected comma")?;
            }

            let (expression, next) = self.parse_expression(cursor, &delimiters, 0)?;
            expressions.push(expression);
            cursor = next;
        }

        Ok((expressions, cursor))
    }

    fn parse_create_table(&self, cursor: usize) -> Attempt<CreateTableStatement> {
        if !self.expect(cursor, &Token::keyword(Keyword::Create)) {
            return Ok(None);
        }

        let left_paren = Token::symbol(Symbol::LeftParen);
        let right_paren = Token::symbol(Symbol::RightParen);

        let cursor = self.consume(cursor + 1, &Token::keyword(Keyword::Table), "Expected TABLE")?;
        let (name, cursor) = self.consume_kind(cursor, TokenKind::Identifier, "Expected table name")?;

        // a table may be declared without any column list
        if !self.expect(cursor, &left_paren) {
            return Ok(Some((
                CreateTableStatement {
                    name,
                    columns: Vec::new(),
                },
                cursor,
            )));
        }

        let (columns, cursor) = self.parse_column_definitions(cursor + 1, &right_paren)?;
        let cursor = self.consume(cursor, &right_paren, "Expected right parenthesis")?;

        Ok(Some((CreateTableStatement { name, columns }, cursor)))
    }

    /// `name type [PRIMARY KEY]` entries separated by commas, up to
    /// `delimiter` (not consumed).
    fn parse_column_definitions(
        &self,
        cursor: usize,
        delimiter: &Token,
    ) -> Parsed<Vec<ColumnDefinition>> {
        let comma = Token::symbol(Symbol::Comma);
        let primary_key = Token::keyword(Keyword::PrimaryKey);
        let mut columns = Vec::new();
        let mut cursor = cursor;

        loop {
            match self.peek(cursor) {
                None => return Err(self.error(cursor, "Expected column definition")),
                Some(current) if current == delimiter => break,
                Some(_) => {}
            }

            if !columns.is_empty() {
                cursor = self.consume(cursor, &comma, "Expected comma")?;
            }

            let (name, next) = self.consume_kind(cursor, TokenKind::Identifier, "Expected column name")?;
            let (datatype, next) = self.consume_kind(next, TokenKind::Keyword, "Expected column type")?;
            cursor = next;

            let is_primary_key = self.expect(cursor, &primary_key);
            if is_primary_key {
                cursor += 1;
            }

            columns.push(ColumnDefinition {
                name,
                datatype,
                primary_key: is_primary_key,
            });
        }

        Ok((columns, cursor))
    }

    fn parse_drop_table(&self, cursor: usize) -> Attempt<DropTableStatement> {
        if !self.expect(cursor, &Token::keyword(Keyword::Drop)) {
            return Ok(None);
        }

        let cursor = self.consume(cursor + 1, &Token::keyword(Keyword::Table), "Expected TABLE")?;
        let (name, cursor) = self.consume_kind(cursor, TokenKind::Identifier, "Expected table name")?;

        Ok(Some((DropTableStatement { name }, cursor)))
    }

    // expressions

    /// Precedence climbing.
    ///
    /// Parses one operand (a literal, or a parenthesised expression), then
    /// folds in binary operators for as long as they bind tighter than
    /// `min_power`. An operator that does not is left for the caller, which
    /// makes equal-power chains group to the left. Parsing stops at any of
    /// `delimiters` or at the end of input.
    fn parse_expression(
        &self,
        cursor: usize,
        delimiters: &[Token],
        min_power: u8,
    ) -> Parsed<Expression> {
        let left_paren = Token::symbol(Symbol::LeftParen);
        let right_paren = Token::symbol(Symbol::RightParen);

        let (mut expression, mut cursor) = if self.expect(cursor, &left_paren) {
            let mut inner_delimiters = delimiters.to_vec();
            inner_delimiters.push(right_paren.clone());

            let (inner, next) = self.parse_expression(cursor + 1, &inner_delimiters, 0)?;
            let next = self.consume(next, &right_paren, "Expected closing parenthesis")?;
            (inner, next)
        } else {
            self.parse_literal(cursor)?
        };

        while let Some(current) = self.peek(cursor) {
            if delimiters.contains(current) {
                break;
            }

            if !is_binary_operator(current) {
                return Err(self.error(cursor, "Expected binary operator"));
            }

            let power = current.binding_power();
            if power <= min_power {
                break;
            }

            let (right, next) = self.parse_expression(cursor + 1, delimiters, power)?;
            expression = Expression::binary(expression, current.clone(), right);
            cursor = next;
        }

        Ok((expression, cursor))
    }

    fn parse_literal(&self, cursor: usize) -> Parsed<Expression> {
        match self.peek(cursor) {
            Some(token)
                if matches!(
                    token.kind,
                    TokenKind::Identifier
                        | TokenKind::Numeric
                        | TokenKind::String
                        | TokenKind::Bool
                        | TokenKind::Null
                ) =>
            {
                Ok((Expression::Literal(token.clone()), cursor + 1))
            }
            _ => Err(self.error(cursor, "Expected expression")),
        }
    }
}

fn is_binary_operator(token: &Token) -> bool {
    token.is_keyword(Keyword::And)
        || token.is_keyword(Keyword::Or)
        || [Symbol::Eq, Symbol::NotEq, Symbol::Concat, Symbol::Plus]
            .into_iter()
            .any(|symbol| token.is_symbol(symbol))
}
