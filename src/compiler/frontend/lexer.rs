//! Lexical analysis for SassScript expressions

use crate::error::{ExtractError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    RightBrace,   // } closing an interpolation
    Comma,        // ,
    Colon,        // :
    Ellipsis,     // ...

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqualEqual,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Literals
    Number(f64, String),
    String(String),
    Color(String),
    Identifier(String),
    Namespaced(String, String),
    Variable(String),
    NamespacedVariable(String, String),
    Flag(String), // !default, !global, !important
    InterpolationStart,
    Raw(String),

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
    pub filename: String,
    /// Whitespace or a comment came right before this token
    pub spaced: bool,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBracket => write!(f, "["),
            TokenType::RightBracket => write!(f, "]"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Comma => write!(f, ","),
            TokenType::Colon => write!(f, ":"),
            TokenType::Ellipsis => write!(f, "..."),
            TokenType::Plus => write!(f, "+"),
            TokenType::Minus => write!(f, "-"),
            TokenType::Star => write!(f, "*"),
            TokenType::Slash => write!(f, "/"),
            TokenType::Percent => write!(f, "%"),
            TokenType::EqualEqual => write!(f, "=="),
            TokenType::NotEqual => write!(f, "!="),
            TokenType::Less => write!(f, "<"),
            TokenType::LessEqual => write!(f, "<="),
            TokenType::Greater => write!(f, ">"),
            TokenType::GreaterEqual => write!(f, ">="),
            TokenType::Number(n, unit) => write!(f, "number({}{})", n, unit),
            TokenType::String(s) => write!(f, "string(\"{}\")", s),
            TokenType::Color(c) => write!(f, "color({})", c),
            TokenType::Identifier(id) => write!(f, "identifier({})", id),
            TokenType::Namespaced(ns, id) => write!(f, "identifier({}.{})", ns, id),
            TokenType::Variable(name) => write!(f, "${}", name),
            TokenType::NamespacedVariable(ns, name) => write!(f, "{}.${}", ns, name),
            TokenType::Flag(flag) => write!(f, "!{}", flag),
            TokenType::InterpolationStart => write!(f, "#{{"),
            TokenType::Raw(text) => write!(f, "{}", text),
            TokenType::Eof => write!(f, "end of expression"),
        }
    }
}

/// Functions whose arguments are kept verbatim
const RAW_FUNCTIONS: &[&str] = &["calc", "clamp", "var", "env", "expression", "element"];

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    filename: String,
    previous_is_operand: bool,
    after_interpolation: bool,
}

impl Lexer {
    pub fn new(input: &str, filename: &str, line: usize) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line,
            column: 1,
            filename: filename.to_string(),
            previous_is_operand: false,
            after_interpolation: false,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let spaced = self.skip_whitespace_and_comments()?;
            if self.is_at_end() {
                break;
            }
            let line = self.line;
            let column = self.column;
            let token_type = self.next_token(spaced)?;
            self.previous_is_operand = matches!(
                token_type,
                TokenType::Number(..)
                    | TokenType::String(_)
                    | TokenType::Color(_)
                    | TokenType::Identifier(_)
                    | TokenType::Variable(_)
                    | TokenType::NamespacedVariable(..)
                    | TokenType::Raw(_)
                    | TokenType::RightParen
                    | TokenType::RightBracket
                    | TokenType::RightBrace
            );
            self.after_interpolation = token_type == TokenType::RightBrace;
            tokens.push(Token {
                token_type,
                line,
                column,
                filename: self.filename.clone(),
                spaced,
            });
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            line: self.line,
            column: self.column,
            filename: self.filename.clone(),
            spaced: true,
        });

        Ok(tokens)
    }

    fn next_token(&mut self, spaced: bool) -> Result<TokenType> {
        let ch = self.advance();

        let token_type = match ch {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '[' => TokenType::LeftBracket,
            ']' => TokenType::RightBracket,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            ':' => TokenType::Colon,
            '+' => TokenType::Plus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '%' => TokenType::Percent,
            '"' | '\'' => TokenType::String(self.read_string(ch)?),
            '$' => TokenType::Variable(self.read_name()?),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::NotEqual
                } else {
                    while matches!(self.peek(), Some(c) if c == ' ' || c == '\t') {
                        self.advance();
                    }
                    TokenType::Flag(self.read_name()?.to_ascii_lowercase())
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::EqualEqual
                } else {
                    return Err(self.error("Expected '=='"));
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                }
            }
            '#' => {
                if self.peek() == Some('{') {
                    self.advance();
                    TokenType::InterpolationStart
                } else {
                    self.read_hash()
                }
            }
            '.' => {
                if self.peek() == Some('.') && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    TokenType::Ellipsis
                } else if self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.read_number('.')?
                } else {
                    return Err(self.error("Unexpected '.'"));
                }
            }
            '-' => self.read_minus(spaced)?,
            '&' => TokenType::Identifier("&".to_string()),
            c if c.is_ascii_digit() => self.read_number(c)?,
            c if is_name_start(c) || c == '\\' => {
                self.position -= 1;
                self.column -= 1;
                self.read_identifier()?
            }
            other => return Err(self.error(&format!("Unexpected character '{}'", other))),
        };

        Ok(token_type)
    }

    /// `-` is a negative number, an identifier such as `-webkit-box`, or
    /// the minus operator depending on what surrounds it.
    fn read_minus(&mut self, spaced: bool) -> Result<TokenType> {
        let starts_number = match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_next().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        };

        if starts_number {
            if self.previous_is_operand && !spaced {
                return Ok(TokenType::Minus);
            }
            return self.read_number('-');
        }

        let glued = self.previous_is_operand && !spaced && !self.after_interpolation;
        match self.peek() {
            Some(c) if (is_name_start(c) || c == '-' || c == '\\') && !glued => {
                self.position -= 1;
                self.column -= 1;
                self.read_identifier()
            }
            _ => Ok(TokenType::Minus),
        }
    }

    fn read_number(&mut self, first_char: char) -> Result<TokenType> {
        let mut text = String::new();
        text.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(self.advance());
            } else if ch == '.' && self.peek_next().map_or(false, |c| c.is_ascii_digit()) && !text.contains('.') {
                text.push(self.advance());
            } else {
                break;
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let exponent = match self.peek_next() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => self
                    .input
                    .get(self.position + 2)
                    .map_or(false, |c| c.is_ascii_digit()),
                _ => false,
            };
            if exponent {
                text.push(self.advance());
                text.push(self.advance());
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    text.push(self.advance());
                }
            }
        }

        let value: f64 = text
            .parse()
            .map_err(|_| self.error(&format!("Invalid number '{}'", text)))?;

        let mut unit = String::new();
        if self.peek() == Some('%') {
            self.advance();
            unit.push('%');
        } else {
            while let Some(ch) = self.peek() {
                if ch.is_alphabetic() {
                    unit.push(self.advance());
                } else if ch == '-' && !unit.is_empty() && self.peek_next().map_or(false, |c| c.is_alphabetic()) {
                    unit.push(self.advance());
                } else {
                    break;
                }
            }
        }

        Ok(TokenType::Number(value, unit))
    }

    fn read_string(&mut self, quote: char) -> Result<String> {
        let start_line = self.line;
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.advance();
            if ch == quote {
                return Ok(value);
            }
            if ch == '\\' {
                match self.peek() {
                    Some(c) if c.is_ascii_hexdigit() => {
                        let mut code = String::new();
                        while code.len() < 6 && self.peek().map_or(false, |c| c.is_ascii_hexdigit()) {
                            code.push(self.advance());
                        }
                        if self.peek() == Some(' ') {
                            self.advance();
                        }
                        let decoded = u32::from_str_radix(&code, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or('\u{FFFD}');
                        value.push(decoded);
                    }
                    Some('\n') => {
                        self.advance();
                    }
                    Some(_) => value.push(self.advance()),
                    None => break,
                }
                continue;
            }
            if ch == '\n' {
                break;
            }
            value.push(ch);
        }

        Err(ExtractError::parse(&self.filename, start_line, "Unterminated string literal"))
    }

    fn read_hash(&mut self) -> TokenType {
        let mut text = String::from("#");
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                text.push(self.advance());
            } else {
                break;
            }
        }

        let digits = &text[1..];
        let is_color = matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit());
        if is_color {
            TokenType::Color(text)
        } else {
            TokenType::Identifier(text)
        }
    }

    fn read_name(&mut self) -> Result<String> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                name.push(self.advance());
            } else if ch == '\\' {
                self.advance();
                if !self.is_at_end() {
                    name.push(self.advance());
                }
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("Expected identifier"));
        }
        Ok(name)
    }

    fn read_identifier(&mut self) -> Result<TokenType> {
        let name = self.read_name()?;

        if self.peek() == Some('.') {
            match self.peek_next() {
                Some('$') => {
                    self.advance();
                    self.advance();
                    let member = self.read_name()?;
                    return Ok(TokenType::NamespacedVariable(name, member));
                }
                Some(c) if is_name_start(c) => {
                    self.advance();
                    let member = self.read_name()?;
                    return Ok(TokenType::Namespaced(name, member));
                }
                _ => {}
            }
        }

        if self.peek() == Some('(') && self.is_raw_function(&name) {
            return self.read_raw_call(name);
        }

        Ok(TokenType::Identifier(name))
    }

    fn is_raw_function(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        if RAW_FUNCTIONS.contains(&lower.as_str()) {
            return true;
        }
        if lower == "url" {
            // url("...") and url($var) are ordinary calls
            let mut index = self.position + 1;
            while matches!(self.input.get(index), Some(c) if c.is_whitespace()) {
                index += 1;
            }
            return !matches!(self.input.get(index), Some('"') | Some('\'') | Some('$'));
        }
        false
    }

    /// Copy `name(...)` verbatim up to the matching parenthesis
    fn read_raw_call(&mut self, name: String) -> Result<TokenType> {
        let start_line = self.line;
        let mut text = name;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        while !self.is_at_end() {
            let ch = self.advance();
            text.push(ch);
            if let Some(q) = quote {
                if ch == '\\' && !self.is_at_end() {
                    text.push(self.advance());
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '"' | '\'' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(TokenType::Raw(text));
                    }
                }
                _ => {}
            }
        }

        Err(ExtractError::parse(&self.filename, start_line, "Unclosed function call"))
    }

    /// Returns whether anything was skipped
    fn skip_whitespace_and_comments(&mut self) -> Result<bool> {
        let mut skipped = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                    skipped = true;
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let start_line = self.line;
                    self.advance();
                    self.advance();
                    loop {
                        if self.is_at_end() {
                            return Err(ExtractError::parse(&self.filename, start_line, "Unclosed comment"));
                        }
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                    skipped = true;
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.advance();
                    }
                    skipped = true;
                }
                _ => return Ok(skipped),
            }
        }
    }

    fn advance(&mut self) -> char {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            ch
        } else {
            '\0'
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn error(&self, message: &str) -> ExtractError {
        ExtractError::parse(&self.filename, self.line, message)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(input: &str) -> Vec<TokenType> {
        Lexer::new(input, "test.scss", 1)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_numbers_and_units() {
        assert_eq!(
            types("10px 1.5em 50% .5"),
            vec![
                TokenType::Number(10.0, "px".to_string()),
                TokenType::Number(1.5, "em".to_string()),
                TokenType::Number(50.0, "%".to_string()),
                TokenType::Number(0.5, String::new()),
                TokenType::Eof,
            ]
        );
        assert_eq!(types("1e3")[0], TokenType::Number(1000.0, String::new()));
    }

    #[test]
    fn test_minus_disambiguation() {
        assert_eq!(
            types("10px-5px"),
            vec![
                TokenType::Number(10.0, "px".to_string()),
                TokenType::Minus,
                TokenType::Number(5.0, "px".to_string()),
                TokenType::Eof,
            ]
        );
        assert_eq!(types("1 -2")[1], TokenType::Number(-2.0, String::new()));
        assert_eq!(types("1 - 2")[1], TokenType::Minus);
        assert_eq!(types("-webkit-box")[0], TokenType::Identifier("-webkit-box".to_string()));
        assert_eq!(types("-$x")[0], TokenType::Minus);
    }

    #[test]
    fn test_strings() {
        assert_eq!(types("\"a b\"")[0], TokenType::String("a b".to_string()));
        assert_eq!(types("'it\\'s'")[0], TokenType::String("it's".to_string()));
        assert_eq!(types("\"\\41\"")[0], TokenType::String("A".to_string()));
        assert!(Lexer::new("\"open", "t", 1).tokenize().is_err());
    }

    #[test]
    fn test_variables_and_namespaces() {
        assert_eq!(types("$primary-color")[0], TokenType::Variable("primary-color".to_string()));
        assert_eq!(
            types("theme.$accent")[0],
            TokenType::NamespacedVariable("theme".to_string(), "accent".to_string())
        );
        assert_eq!(
            types("math.div(1, 2)")[0],
            TokenType::Namespaced("math".to_string(), "div".to_string())
        );
    }

    #[test]
    fn test_colors_and_flags() {
        assert_eq!(types("#fff")[0], TokenType::Color("#fff".to_string()));
        assert_eq!(types("#main")[0], TokenType::Identifier("#main".to_string()));
        assert_eq!(types("1 !default")[1], TokenType::Flag("default".to_string()));
        assert_eq!(types("red ! important")[1], TokenType::Flag("important".to_string()));
        assert_eq!(types("#{$a}")[0], TokenType::InterpolationStart);
    }

    #[test]
    fn test_raw_functions() {
        assert_eq!(
            types("calc(100% - (2 * 10px))")[0],
            TokenType::Raw("calc(100% - (2 * 10px))".to_string())
        );
        assert_eq!(types("url(a/b.png)")[0], TokenType::Raw("url(a/b.png)".to_string()));
        assert_eq!(types("url(\"a.png\")")[0], TokenType::Identifier("url".to_string()));
    }

    #[test]
    fn test_spacing_and_comments() {
        let tokens = Lexer::new("a /* x */ b(c)", "t", 3).tokenize().unwrap();
        assert!(!tokens[0].spaced);
        assert!(tokens[1].spaced);
        assert!(!tokens[2].spaced);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            types("== != <= >= < > * % ..."),
            vec![
                TokenType::EqualEqual,
                TokenType::NotEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Star,
                TokenType::Percent,
                TokenType::Ellipsis,
                TokenType::Eof,
            ]
        );
    }
}
