//! Recursive descent parser for SassScript expressions
//!
//! Precedence, loosest first: comma lists, space lists, `or`, `and`,
//! equality, relational, additive, multiplicative, unary, primary.

use crate::compiler::frontend::ast::*;
use crate::compiler::frontend::lexer::{Token, TokenType};
use crate::compiler::value::ListSeparator;
use crate::error::{ExtractError, Result};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Identifiers that end a space list, e.g. `in` inside `@each`
    stop_words: &'static [&'static str],
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            stop_words: &[],
        }
    }

    pub fn with_stop_words(mut self, words: &'static [&'static str]) -> Self {
        self.stop_words = words;
        self
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_comma_list()
    }

    /// Parse an expression and require that nothing follows it
    pub fn parse_complete(&mut self) -> Result<Expression> {
        let expression = self.parse_comma_list()?;
        self.expect_end()?;
        Ok(expression)
    }

    pub fn expect_end(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error(&format!("Unexpected {}", self.peek().token_type)))
        }
    }

    /// Strip trailing `!flag`s from the token stream
    pub fn take_trailing_flags(&mut self) -> Vec<String> {
        let mut flags = Vec::new();
        while self.tokens.len() >= 2 {
            let index = self.tokens.len() - 2;
            match &self.tokens[index].token_type {
                TokenType::Flag(flag) => {
                    flags.push(flag.clone());
                    self.tokens.remove(index);
                }
                _ => break,
            }
        }
        flags.reverse();
        flags
    }

    /// Identifier at the cursor, if it is exactly `word`
    pub fn match_word(&mut self, word: &str) -> bool {
        if let TokenType::Identifier(id) = &self.peek().token_type {
            if id == word {
                self.advance();
                return true;
            }
        }
        false
    }

    pub fn consume_variable(&mut self, message: &str) -> Result<String> {
        match &self.peek().token_type {
            TokenType::Variable(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    pub fn consume_identifier(&mut self, message: &str) -> Result<String> {
        match &self.peek().token_type {
            TokenType::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    pub fn consume_string(&mut self, message: &str) -> Result<String> {
        match &self.peek().token_type {
            TokenType::String(text) => {
                let text = text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.error(message)),
        }
    }

    fn parse_comma_list(&mut self) -> Result<Expression> {
        let first = self.parse_space_list()?;
        if !self.check(&TokenType::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenType::Comma) {
            if !self.starts_operand() {
                break;
            }
            items.push(self.parse_space_list()?);
        }

        Ok(Expression::List {
            items,
            separator: ListSeparator::Comma,
            bracketed: false,
        })
    }

    fn parse_space_list(&mut self) -> Result<Expression> {
        let first = self.parse_or()?;
        let mut items = vec![first];

        while self.starts_operand() {
            items.push(self.parse_or()?);
        }

        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Expression::List {
            items,
            separator: ListSeparator::Space,
            bracketed: false,
        })
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut expression = self.parse_and()?;
        while self.match_word("or") {
            let right = self.parse_and()?;
            expression = binary(BinaryOp::Or, expression, right);
        }
        Ok(expression)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut expression = self.parse_equality()?;
        while self.match_word("and") {
            let right = self.parse_equality()?;
            expression = binary(BinaryOp::And, expression, right);
        }
        Ok(expression)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut expression = self.parse_relational()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            expression = binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_relational(&mut self) -> Result<Expression> {
        let mut expression = self.parse_additive()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Less => BinaryOp::Less,
                TokenType::LessEqual => BinaryOp::LessEqual,
                TokenType::Greater => BinaryOp::Greater,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            expression = binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut expression = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Plus => BinaryOp::Plus,
                TokenType::Minus => BinaryOp::Minus,
                _ => break,
            };
            // `a -b` is a two-item list, not a subtraction
            if self.peek().spaced && !self.peek_next().spaced {
                break;
            }
            self.advance();
            let right = self.parse_multiplicative()?;
            expression = binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut expression = self.parse_unary()?;
        loop {
            let op = match self.peek().token_type {
                TokenType::Star => BinaryOp::Times,
                TokenType::Slash => BinaryOp::Divide,
                TokenType::Percent => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expression = binary(op, expression, right);
        }
        Ok(expression)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match &self.peek().token_type {
            TokenType::Minus => Some(UnaryOp::Minus),
            TokenType::Plus => Some(UnaryOp::Plus),
            TokenType::Identifier(id) if id == "not" => Some(UnaryOp::Not),
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.parse_concatenation(),
        }
    }

    /// Primaries glued together around an interpolation: `col-#{$i}-wide`
    fn parse_concatenation(&mut self) -> Result<Expression> {
        let first = self.parse_primary()?;
        let mut parts = vec![first];

        loop {
            let next = self.peek();
            if next.spaced {
                break;
            }
            let glues = match (&next.token_type, parts.last()) {
                (TokenType::InterpolationStart, _) => true,
                (TokenType::Identifier(_) | TokenType::Number(..), Some(Expression::Interpolation(_))) => true,
                _ => false,
            };
            if !glues {
                break;
            }
            parts.push(self.parse_primary()?);
        }

        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }
        Ok(Expression::Concat(parts))
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        if self.is_at_end() {
            return Err(self.error("Expected expression"));
        }
        let token = self.advance().clone();

        match token.token_type.clone() {
            TokenType::Number(value, unit) => Ok(Expression::Number { value, unit }),
            TokenType::String(text) => Ok(Expression::String { text, quoted: true }),
            TokenType::Color(hex) => Ok(Expression::Color(hex)),
            TokenType::Raw(text) => Ok(Expression::Raw(text)),
            TokenType::Variable(name) => Ok(Expression::Variable { namespace: None, name }),
            TokenType::NamespacedVariable(namespace, name) => Ok(Expression::Variable {
                namespace: Some(namespace),
                name,
            }),
            TokenType::Identifier(name) => {
                if self.check(&TokenType::LeftParen) && !self.peek().spaced {
                    let args = self.parse_arguments()?;
                    return Ok(Expression::FunctionCall {
                        namespace: None,
                        name,
                        args,
                    });
                }
                Ok(match name.as_str() {
                    "true" => Expression::Boolean(true),
                    "false" => Expression::Boolean(false),
                    "null" => Expression::Null,
                    _ => Expression::String { text: name, quoted: false },
                })
            }
            TokenType::Namespaced(namespace, name) => {
                if !self.check(&TokenType::LeftParen) {
                    return Err(self.error_at(&token, "Expected '(' after namespaced function"));
                }
                let args = self.parse_arguments()?;
                Ok(Expression::FunctionCall {
                    namespace: Some(namespace),
                    name,
                    args,
                })
            }
            TokenType::InterpolationStart => {
                let inner = self.parse_expression()?;
                self.consume(TokenType::RightBrace, "Expected '}' to close interpolation")?;
                Ok(Expression::Interpolation(Box::new(inner)))
            }
            TokenType::LeftParen => self.parse_parenthesized(),
            TokenType::LeftBracket => {
                if self.match_token(&TokenType::RightBracket) {
                    return Ok(Expression::List {
                        items: Vec::new(),
                        separator: ListSeparator::Undecided,
                        bracketed: true,
                    });
                }
                let inner = self.parse_expression()?;
                self.consume(TokenType::RightBracket, "Expected ']'")?;
                Ok(match inner {
                    Expression::List { items, separator, bracketed: false } => Expression::List {
                        items,
                        separator,
                        bracketed: true,
                    },
                    other => Expression::List {
                        items: vec![other],
                        separator: ListSeparator::Undecided,
                        bracketed: true,
                    },
                })
            }
            other => Err(self.error_at(&token, &format!("Expected expression, got {}", other))),
        }
    }

    /// After `(`: the empty list, a map, a parenthesized comma list, or a
    /// grouped expression.
    fn parse_parenthesized(&mut self) -> Result<Expression> {
        if self.match_token(&TokenType::RightParen) {
            return Ok(Expression::List {
                items: Vec::new(),
                separator: ListSeparator::Undecided,
                bracketed: false,
            });
        }

        let first = self.parse_space_list()?;

        if self.match_token(&TokenType::Colon) {
            let value = self.parse_space_list()?;
            let mut entries = vec![(first, value)];
            while self.match_token(&TokenType::Comma) {
                if self.check(&TokenType::RightParen) {
                    break;
                }
                let key = self.parse_space_list()?;
                self.consume(TokenType::Colon, "Expected ':' in map")?;
                let value = self.parse_space_list()?;
                entries.push((key, value));
            }
            self.consume(TokenType::RightParen, "Expected ')' to close map")?;
            return Ok(Expression::Map(entries));
        }

        if self.check(&TokenType::Comma) {
            let mut items = vec![first];
            while self.match_token(&TokenType::Comma) {
                if self.check(&TokenType::RightParen) {
                    break;
                }
                items.push(self.parse_space_list()?);
            }
            self.consume(TokenType::RightParen, "Expected ')'")?;
            return Ok(Expression::List {
                items,
                separator: ListSeparator::Comma,
                bracketed: false,
            });
        }

        self.consume(TokenType::RightParen, "Expected ')'")?;
        Ok(Expression::Paren(Box::new(first)))
    }

    /// `(a, $b: c, $rest...)` with the cursor on `(`
    pub fn parse_arguments(&mut self) -> Result<ArgumentList> {
        self.consume(TokenType::LeftParen, "Expected '('")?;
        let mut args = ArgumentList::default();

        while !self.check(&TokenType::RightParen) {
            let named = match (&self.peek().token_type, &self.peek_next().token_type) {
                (TokenType::Variable(name), TokenType::Colon) => Some(name.clone()),
                _ => None,
            };

            if let Some(name) = named {
                self.advance();
                self.advance();
                let value = self.parse_space_list()?;
                args.named.push((name, value));
            } else {
                let value = self.parse_space_list()?;
                if self.match_token(&TokenType::Ellipsis) {
                    args.rest = Some(Box::new(value));
                } else {
                    if !args.named.is_empty() {
                        return Err(self.error("Positional arguments must come before keyword arguments"));
                    }
                    args.positional.push(value);
                }
            }

            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RightParen, "Expected ')' to close argument list")?;
        Ok(args)
    }

    /// `($a, $b: 10px, $rest...)` with the cursor on `(`
    pub fn parse_parameters(&mut self) -> Result<ParameterList> {
        let mut list = ParameterList::default();
        if !self.match_token(&TokenType::LeftParen) {
            return Ok(list);
        }

        while !self.check(&TokenType::RightParen) {
            let name = self.consume_variable("Expected parameter name")?;
            if self.match_token(&TokenType::Ellipsis) {
                list.rest = Some(name);
            } else {
                let default = if self.match_token(&TokenType::Colon) {
                    Some(self.parse_space_list()?)
                } else {
                    None
                };
                list.params.push(Parameter { name, default });
            }
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RightParen, "Expected ')' to close parameter list")?;
        Ok(list)
    }

    fn starts_operand(&self) -> bool {
        match &self.peek().token_type {
            TokenType::Identifier(id) => {
                !matches!(id.as_str(), "and" | "or") && !self.stop_words.contains(&id.as_str())
            }
            TokenType::Number(..)
            | TokenType::String(_)
            | TokenType::Color(_)
            | TokenType::Variable(_)
            | TokenType::NamespacedVariable(..)
            | TokenType::Namespaced(..)
            | TokenType::InterpolationStart
            | TokenType::Raw(_)
            | TokenType::LeftParen
            | TokenType::LeftBracket => true,
            TokenType::Minus | TokenType::Plus => self.peek().spaced && !self.peek_next().spaced,
            _ => false,
        }
    }

    pub fn check(&self, token_type: &TokenType) -> bool {
        std::mem::discriminant(&self.peek().token_type) == std::mem::discriminant(token_type)
    }

    pub fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> &Token {
        let index = (self.current + 1).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    pub fn consume(&mut self, token_type: TokenType, message: &str) -> Result<&Token> {
        if self.check(&token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(&format!("{}, got {}", message, self.peek().token_type)))
        }
    }

    fn error(&self, message: &str) -> ExtractError {
        self.error_at(self.peek(), message)
    }

    fn error_at(&self, token: &Token, message: &str) -> ExtractError {
        ExtractError::parse(&token.filename, token.line, message)
    }
}

fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::frontend::lexer::Lexer;

    fn parse(input: &str) -> Expression {
        let tokens = Lexer::new(input, "test.scss", 1).tokenize().unwrap();
        Parser::new(tokens).parse_complete().unwrap()
    }

    fn number(value: f64, unit: &str) -> Expression {
        Expression::Number {
            value,
            unit: unit.to_string(),
        }
    }

    #[test]
    fn test_space_and_comma_lists() {
        match parse("10px 20px, none") {
            Expression::List { items, separator, .. } => {
                assert_eq!(separator, ListSeparator::Comma);
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[0], Expression::List { separator: ListSeparator::Space, .. }));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3"),
            binary(
                BinaryOp::Plus,
                number(1.0, ""),
                binary(BinaryOp::Times, number(2.0, ""), number(3.0, ""))
            )
        );
        assert!(matches!(parse("$a == 1 and not $b"), Expression::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn test_negative_item_in_space_list() {
        match parse("1 -2") {
            Expression::List { items, .. } => assert_eq!(items, vec![number(1.0, ""), number(-2.0, "")]),
            other => panic!("expected list, got {:?}", other),
        }
        match parse("$a -$b") {
            Expression::List { items, .. } => assert!(matches!(items[1], Expression::Unary { op: UnaryOp::Minus, .. })),
            other => panic!("expected list, got {:?}", other),
        }
        assert!(matches!(parse("$a - $b"), Expression::Binary { op: BinaryOp::Minus, .. }));
    }

    #[test]
    fn test_maps() {
        match parse("(key1: value1, 'key2': (nested: 1px 2px),)") {
            Expression::Map(entries) => {
                assert_eq!(entries.len(), 2);
                assert!(matches!(entries[1].1, Expression::Map(_)));
            }
            other => panic!("expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_parens_and_brackets() {
        assert!(matches!(parse("()"), Expression::List { ref items, .. } if items.is_empty()));
        assert!(matches!(parse("(1 + 2)"), Expression::Paren(_)));
        assert!(matches!(parse("(1, 2)"), Expression::List { separator: ListSeparator::Comma, .. }));
        assert!(matches!(parse("[a b]"), Expression::List { bracketed: true, separator: ListSeparator::Space, .. }));
    }

    #[test]
    fn test_function_calls() {
        match parse("darken($c, $amount: 10%)") {
            Expression::FunctionCall { namespace, name, args } => {
                assert_eq!(namespace, None);
                assert_eq!(name, "darken");
                assert_eq!(args.positional.len(), 1);
                assert_eq!(args.named[0].0, "amount");
            }
            other => panic!("expected call, got {:?}", other),
        }
        assert!(matches!(
            parse("math.div(10px, 2)"),
            Expression::FunctionCall { namespace: Some(_), .. }
        ));
        // A space before the parenthesis makes a list, not a call
        assert!(matches!(parse("foo (1)"), Expression::List { .. }));
    }

    #[test]
    fn test_interpolation_concatenation() {
        match parse("col-#{$i}-wide") {
            Expression::Concat(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(parts[1], Expression::Interpolation(_)));
            }
            other => panic!("expected concatenation, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_flags() {
        let tokens = Lexer::new("10px !default !global", "t", 1).tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        assert_eq!(parser.take_trailing_flags(), vec!["default", "global"]);
        assert_eq!(parser.parse_complete().unwrap(), number(10.0, "px"));
    }

    #[test]
    fn test_parameters() {
        let tokens = Lexer::new("($a, $b: 2px, $rest...)", "t", 1).tokenize().unwrap();
        let params = Parser::new(tokens).parse_parameters().unwrap();
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(params.params[1].default, Some(number(2.0, "px")));
        assert_eq!(params.rest.as_deref(), Some("rest"));
    }

    #[test]
    fn test_stop_words() {
        let tokens = Lexer::new("1 through 3", "t", 1).tokenize().unwrap();
        let mut parser = Parser::new(tokens).with_stop_words(&["through", "to"]);
        assert_eq!(parser.parse_expression().unwrap(), number(1.0, ""));
        assert!(parser.match_word("through"));
        assert_eq!(parser.parse_expression().unwrap(), number(3.0, ""));
    }

    #[test]
    fn test_errors_carry_location() {
        let tokens = Lexer::new("(1, 2", "theme.scss", 7).tokenize().unwrap();
        match Parser::new(tokens).parse_complete() {
            Err(ExtractError::Parse { file, line, .. }) => {
                assert_eq!(file, "theme.scss");
                assert_eq!(line, 7);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_tokens_report_their_line() {
        let tokens = Lexer::new("math.div", "theme.scss", 3).tokenize().unwrap();
        match Parser::new(tokens).parse_complete() {
            Err(ExtractError::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("namespaced function"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }

        let tokens = Lexer::new(")", "theme.scss", 5).tokenize().unwrap();
        match Parser::new(tokens).parse_complete() {
            Err(ExtractError::Parse { line, message, .. }) => {
                assert_eq!(line, 5);
                assert!(message.starts_with("Expected expression"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
