//! Expression frontend: statement text from the pre-processor tree goes in,
//! expression trees come out.

pub mod ast;
pub mod lexer;
pub mod parser;

use crate::error::{ExtractError, Result};
use ast::{ArgumentList, Expression, ParameterList};
use lexer::{Lexer, TokenType};
use parser::Parser;

fn parser_for(text: &str, file: &str, line: usize) -> Result<Parser> {
    let tokens = Lexer::new(text, file, line).tokenize()?;
    Ok(Parser::new(tokens))
}

pub fn parse_expression(text: &str, file: &str, line: usize) -> Result<Expression> {
    parser_for(text, file, line)?.parse_complete()
}

/// A declaration value with its trailing `!default`/`!global`/`!important`
pub fn parse_value_with_flags(text: &str, file: &str, line: usize) -> Result<(Expression, Vec<String>)> {
    let mut parser = parser_for(text, file, line)?;
    let flags = parser.take_trailing_flags();
    let expression = parser.parse_complete()?;
    Ok((expression, flags))
}

/// `name($a, $b: 1)`, as written after `@mixin` / `@function` or as the key
/// of a custom function
pub fn parse_signature(text: &str, file: &str, line: usize) -> Result<(String, ParameterList)> {
    let mut parser = parser_for(text, file, line)?;
    let name = parser.consume_identifier("Expected a name")?;
    let params = parser.parse_parameters()?;
    parser.expect_end()?;
    Ok((name, params))
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeRule {
    pub namespace: Option<String>,
    pub name: String,
    pub args: ArgumentList,
}

/// `ns.name(args)` after `@include`
pub fn parse_include(text: &str, file: &str, line: usize) -> Result<IncludeRule> {
    let tokens = Lexer::new(text, file, line).tokenize()?;
    let (namespace, name) = match tokens.first().map(|t| &t.token_type) {
        Some(TokenType::Namespaced(ns, name)) => (Some(ns.clone()), name.clone()),
        Some(TokenType::Identifier(name)) => (None, name.clone()),
        _ => return Err(ExtractError::parse(file, line, "Expected mixin name")),
    };
    let mut parser = Parser::new(tokens);
    parser.match_token(&TokenType::Identifier(String::new()));
    parser.match_token(&TokenType::Namespaced(String::new(), String::new()));
    let args = if parser.check(&TokenType::LeftParen) {
        parser.parse_arguments()?
    } else {
        ArgumentList::default()
    };
    parser.expect_end()?;
    Ok(IncludeRule { namespace, name, args })
}

/// `$key, $value in <expression>` after `@each`
pub fn parse_each(text: &str, file: &str, line: usize) -> Result<(Vec<String>, Expression)> {
    let mut parser = parser_for(text, file, line)?;
    let mut variables = vec![parser.consume_variable("Expected variable name")?];
    while parser.match_token(&TokenType::Comma) {
        variables.push(parser.consume_variable("Expected variable name")?);
    }
    if !parser.match_word("in") {
        return Err(ExtractError::parse(file, line, "Expected 'in'"));
    }
    let list = parser.parse_complete()?;
    Ok((variables, list))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForRule {
    pub variable: String,
    pub from: Expression,
    pub to: Expression,
    pub inclusive: bool,
}

/// `$i from <expr> through|to <expr>` after `@for`
pub fn parse_for(text: &str, file: &str, line: usize) -> Result<ForRule> {
    let tokens = Lexer::new(text, file, line).tokenize()?;
    let mut parser = Parser::new(tokens).with_stop_words(&["through", "to"]);
    let variable = parser.consume_variable("Expected variable name")?;
    if !parser.match_word("from") {
        return Err(ExtractError::parse(file, line, "Expected 'from'"));
    }
    let from = parser.parse_expression()?;
    let inclusive = if parser.match_word("through") {
        true
    } else if parser.match_word("to") {
        false
    } else {
        return Err(ExtractError::parse(file, line, "Expected 'through' or 'to'"));
    };
    let to = parser.parse_complete()?;
    Ok(ForRule {
        variable,
        from,
        to,
        inclusive,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum UseNamespace {
    Named(String),
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseRule {
    pub url: String,
    pub namespace: UseNamespace,
    pub configuration: Vec<(String, Expression)>,
}

/// `"url" [as ns|*] [with ($a: 1)]` after `@use`; `@forward` shares the url
pub fn parse_use(text: &str, file: &str, line: usize) -> Result<UseRule> {
    let mut parser = parser_for(text, file, line)?;
    let url = parser.consume_string("Expected a quoted URL")?;

    let namespace = if parser.match_word("as") {
        if parser.match_token(&TokenType::Star) {
            UseNamespace::Global
        } else {
            UseNamespace::Named(parser.consume_identifier("Expected namespace")?)
        }
    } else {
        UseNamespace::Named(default_namespace(&url))
    };

    let mut configuration = Vec::new();
    if parser.match_word("with") {
        match parser.parse_complete()? {
            Expression::Map(entries) => {
                for (key, value) in entries {
                    match key {
                        Expression::Variable { namespace: None, name } => configuration.push((name, value)),
                        _ => {
                            return Err(ExtractError::parse(
                                file,
                                line,
                                "Expected variable name in configuration",
                            ))
                        }
                    }
                }
            }
            _ => return Err(ExtractError::parse(file, line, "Expected configuration map")),
        }
    }

    parser.expect_end()?;
    Ok(UseRule {
        url,
        namespace,
        configuration,
    })
}

/// `sass:math` -> `math`, `theme/_colors.scss` -> `colors`
pub fn default_namespace(url: &str) -> String {
    let last = url.rsplit(['/', ':']).next().unwrap_or(url);
    let stem = last.split('.').next().unwrap_or(last);
    stem.trim_start_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_with_flags() {
        let (expression, flags) = parse_value_with_flags("10px !default", "t", 1).unwrap();
        assert_eq!(flags, vec!["default"]);
        assert!(matches!(expression, Expression::Number { .. }));
    }

    #[test]
    fn test_signature() {
        let (name, params) = parse_signature("shade($color, $amount: 10%)", "t", 1).unwrap();
        assert_eq!(name, "shade");
        assert_eq!(params.params.len(), 2);

        let (name, params) = parse_signature("bare", "t", 1).unwrap();
        assert_eq!(name, "bare");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_include() {
        let rule = parse_include("theme.button(primary, $size: 2)", "t", 1).unwrap();
        assert_eq!(rule.namespace.as_deref(), Some("theme"));
        assert_eq!(rule.name, "button");
        assert_eq!(rule.args.positional.len(), 1);
        assert_eq!(rule.args.named.len(), 1);

        let rule = parse_include("clearfix", "t", 1).unwrap();
        assert_eq!(rule.name, "clearfix");
        assert!(rule.args.positional.is_empty());
    }

    #[test]
    fn test_each_and_for() {
        let (variables, _) = parse_each("$name, $glyph in $icons", "t", 1).unwrap();
        assert_eq!(variables, vec!["name", "glyph"]);

        let rule = parse_for("$i from 1 through $n", "t", 1).unwrap();
        assert_eq!(rule.variable, "i");
        assert!(rule.inclusive);
        assert!(!parse_for("$i from 1 to 3", "t", 1).unwrap().inclusive);
    }

    #[test]
    fn test_use_rules() {
        let rule = parse_use("\"sass:math\"", "t", 1).unwrap();
        assert_eq!(rule.namespace, UseNamespace::Named("math".to_string()));

        let rule = parse_use("'theme/colors' as *", "t", 1).unwrap();
        assert_eq!(rule.namespace, UseNamespace::Global);

        let rule = parse_use("\"config\" as cfg with ($primary: blue, $size: 2px)", "t", 1).unwrap();
        assert_eq!(rule.namespace, UseNamespace::Named("cfg".to_string()));
        assert_eq!(rule.configuration.len(), 2);
        assert_eq!(rule.configuration[0].0, "primary");
    }

    #[test]
    fn test_default_namespace() {
        assert_eq!(default_namespace("src/_corners.scss"), "corners");
        assert_eq!(default_namespace("sass:color"), "color");
    }
}
