//! Pre-processor that turns stylesheet source into a traversable syntax tree
//!
//! The tree is purely structural: statements are split into rules, at-rules,
//! declarations and comments, but values, selectors and at-rule parameters
//! are kept as raw text. Both the declaration scanner and the embedded
//! compiler work from this tree.

use crate::config::PreprocessorConfig;
use crate::error::{ExtractError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stylesheet syntaxes understood by the pre-processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    /// Brace-delimited SCSS
    #[default]
    Scss,
    /// Whitespace-indented Sass
    Indented,
    /// Plain CSS
    Css,
}

impl Syntax {
    /// Infer the syntax of a stylesheet file from its extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("css") => Syntax::Css,
            Some("sass") => Syntax::Indented,
            _ => Syntax::Scss,
        }
    }
}

/// Root of a parsed stylesheet
#[derive(Debug, Clone, Default)]
pub struct Root {
    pub file: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Declaration(Declaration),
    Rule(Rule),
    AtRule(AtRule),
    Comment(Comment),
}

/// `prop: value` statement, including `$variable: value`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub line: usize,
}

/// Style rule: selector plus a block
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub line: usize,
}

/// `@name params` with an optional block
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub nodes: Option<Vec<Node>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    /// `//` comments never reach the output
    pub silent: bool,
    pub line: usize,
}

/// Immediate container of a node while walking the tree
#[derive(Debug, Clone, Copy)]
pub enum Parent<'a> {
    Root,
    Rule(&'a Rule),
    AtRule(&'a AtRule),
}

impl Parent<'_> {
    pub fn is_root(&self) -> bool {
        matches!(self, Parent::Root)
    }
}

impl Root {
    /// Visit every declaration whose property matches `filter`, at any depth,
    /// in document order.
    pub fn walk_decls<F>(&self, filter: &Regex, visit: &mut F)
    where
        F: FnMut(&Declaration, Parent<'_>),
    {
        walk_nodes(&self.nodes, Parent::Root, filter, visit);
    }
}

fn walk_nodes<'a, F>(nodes: &'a [Node], parent: Parent<'a>, filter: &Regex, visit: &mut F)
where
    F: FnMut(&Declaration, Parent<'_>),
{
    for node in nodes {
        match node {
            Node::Declaration(decl) => {
                if filter.is_match(&decl.prop) {
                    visit(decl, parent);
                }
            }
            Node::Rule(rule) => walk_nodes(&rule.nodes, Parent::Rule(rule), filter, visit),
            Node::AtRule(at_rule) => {
                if let Some(children) = &at_rule.nodes {
                    walk_nodes(children, Parent::AtRule(at_rule), filter, visit);
                }
            }
            Node::Comment(_) => {}
        }
    }
}

/// Parse stylesheet source into a syntax tree
pub fn parse(source: &str, config: &PreprocessorConfig) -> Result<Root> {
    let file = config
        .from
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<input>".to_string());
    let syntax = config.syntax.unwrap_or_default();

    log::debug!("Pre-processing {} as {:?} ({} bytes)", file, syntax, source.len());

    let nodes = match syntax {
        Syntax::Scss | Syntax::Css => ScssParser::new(source, &file).parse()?,
        Syntax::Indented => IndentedParser::new(source, &file).parse()?,
    };

    Ok(Root { file, nodes })
}

/// Parse on tokio's blocking pool
pub async fn parse_async(source: String, config: PreprocessorConfig) -> Result<Root> {
    tokio::task::spawn_blocking(move || parse(&source, &config))
        .await
        .map_err(|e| ExtractError::Task {
            message: format!("pre-processing task failed: {}", e),
        })?
}

/// Split `prop: value` at the first colon outside of strings and brackets
pub(crate) fn split_declaration(text: &str) -> Option<(String, String)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                let prop = text[..i].trim();
                if prop.is_empty() {
                    return None;
                }
                return Some((prop.to_string(), text[i + 1..].trim().to_string()));
            }
            _ => {}
        }
    }

    None
}

fn at_rule_from_text(text: &str, nodes: Option<Vec<Node>>, line: usize) -> AtRule {
    let body = &text[1..];
    let name_end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(body.len());
    AtRule {
        name: body[..name_end].to_string(),
        params: body[name_end..].trim().to_string(),
        nodes,
        line,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Terminator {
    Semicolon,
    OpenBrace,
    CloseBrace,
    Eof,
}

struct ScssParser<'a> {
    input: Vec<char>,
    position: usize,
    line: usize,
    file: &'a str,
}

impl<'a> ScssParser<'a> {
    fn new(source: &str, file: &'a str) -> Self {
        Self {
            input: source.chars().collect(),
            position: 0,
            line: 1,
            file,
        }
    }

    fn parse(&mut self) -> Result<Vec<Node>> {
        self.parse_nodes(false)
    }

    fn parse_nodes(&mut self, nested: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();

            match self.peek() {
                None => {
                    if nested {
                        return Err(ExtractError::parse(self.file, self.line, "Unclosed block"));
                    }
                    return Ok(nodes);
                }
                Some('}') => {
                    if nested {
                        self.advance();
                        return Ok(nodes);
                    }
                    return Err(ExtractError::parse(self.file, self.line, "Unexpected '}'"));
                }
                Some(';') => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    let line = self.line;
                    self.advance();
                    self.advance();
                    let text = self.read_line_comment();
                    nodes.push(Node::Comment(Comment { text: text.trim().to_string(), silent: true, line }));
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let line = self.line;
                    let text = self.read_block_comment()?;
                    nodes.push(Node::Comment(Comment { text, silent: false, line }));
                }
                _ => {
                    if let Some(node) = self.parse_statement()? {
                        nodes.push(node);
                    }
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Option<Node>> {
        let line = self.line;
        let (raw, terminator) = self.read_prelude()?;
        let text = raw.trim();

        if terminator == Terminator::OpenBrace {
            let children = self.parse_nodes(true)?;
            if text.starts_with('@') {
                return Ok(Some(Node::AtRule(at_rule_from_text(text, Some(children), line))));
            }
            return Ok(Some(Node::Rule(Rule {
                selector: text.to_string(),
                nodes: children,
                line,
            })));
        }

        if text.is_empty() {
            return Ok(None);
        }

        if text.starts_with('@') {
            return Ok(Some(Node::AtRule(at_rule_from_text(text, None, line))));
        }

        match split_declaration(text) {
            Some((prop, value)) => Ok(Some(Node::Declaration(Declaration { prop, value, line }))),
            None => Err(ExtractError::parse(
                self.file,
                line,
                format!("Unknown word: '{}'", text),
            )),
        }
    }

    /// Read raw statement text up to `;`, `{` or `}` at nesting depth zero.
    /// `;` and `{` are consumed, `}` is left for the enclosing block.
    fn read_prelude(&mut self) -> Result<(String, Terminator)> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut interpolation = 0usize;

        while let Some(ch) = self.peek() {
            match ch {
                '"' | '\'' => {
                    let start_line = self.line;
                    text.push(self.advance());
                    self.read_string_into(ch, &mut text, start_line)?;
                }
                '/' if self.peek_next() == Some('*') => {
                    self.read_block_comment()?;
                }
                '/' if self.peek_next() == Some('/') && depth == 0 => {
                    self.read_line_comment();
                }
                '#' if self.peek_next() == Some('{') => {
                    interpolation += 1;
                    text.push(self.advance());
                    text.push(self.advance());
                }
                '}' if interpolation > 0 => {
                    interpolation -= 1;
                    text.push(self.advance());
                }
                '(' | '[' => {
                    depth += 1;
                    text.push(self.advance());
                }
                ')' | ']' => {
                    depth = depth.saturating_sub(1);
                    text.push(self.advance());
                }
                ';' if depth == 0 => {
                    self.advance();
                    return Ok((text, Terminator::Semicolon));
                }
                '{' if depth == 0 => {
                    self.advance();
                    return Ok((text, Terminator::OpenBrace));
                }
                '}' => return Ok((text, Terminator::CloseBrace)),
                _ => {
                    text.push(self.advance());
                }
            }
        }

        Ok((text, Terminator::Eof))
    }

    fn read_string_into(&mut self, quote: char, text: &mut String, start_line: usize) -> Result<()> {
        let mut escaped = false;

        while let Some(ch) = self.peek() {
            text.push(self.advance());
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                return Ok(());
            } else if ch == '\n' {
                break;
            }
        }

        Err(ExtractError::parse(self.file, start_line, "Unterminated string literal"))
    }

    fn read_line_comment(&mut self) -> String {
        let mut comment = String::new();

        while let Some(ch) = self.peek() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            comment.push(self.advance());
        }

        comment
    }

    fn read_block_comment(&mut self) -> Result<String> {
        let start_line = self.line;
        let mut comment = String::new();

        comment.push(self.advance());
        comment.push(self.advance());

        while let Some(ch) = self.peek() {
            if ch == '*' && self.peek_next() == Some('/') {
                comment.push(self.advance());
                comment.push(self.advance());
                return Ok(comment);
            }
            comment.push(self.advance());
        }

        Err(ExtractError::parse(self.file, start_line, "Unclosed comment"))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn advance(&mut self) -> char {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
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
}

struct SourceLine {
    indent: usize,
    text: String,
    line: usize,
}

struct IndentedParser<'a> {
    lines: Vec<SourceLine>,
    current: usize,
    file: &'a str,
}

impl<'a> IndentedParser<'a> {
    fn new(source: &str, file: &'a str) -> Self {
        let mut lines = Vec::new();
        let mut comment_indent: Option<usize> = None;

        for (i, raw) in source.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            let indent = raw.len() - raw.trim_start().len();

            if let Some(level) = comment_indent {
                if indent > level {
                    continue;
                }
                comment_indent = None;
            }
            if trimmed.starts_with("//") || trimmed.starts_with("/*") {
                comment_indent = Some(indent);
                continue;
            }

            lines.push(SourceLine {
                indent,
                text: trimmed.trim_end_matches(';').to_string(),
                line: i + 1,
            });
        }

        Self { lines, current: 0, file }
    }

    fn parse(&mut self) -> Result<Vec<Node>> {
        match self.lines.first() {
            Some(first) if first.indent > 0 => Err(ExtractError::parse(
                self.file,
                first.line,
                "Indented syntax must start at column zero",
            )),
            Some(_) => self.parse_block(0),
            None => Ok(Vec::new()),
        }
    }

    fn parse_block(&mut self, indent: usize) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        while let Some(current) = self.lines.get(self.current) {
            if current.indent < indent {
                break;
            }
            if current.indent > indent {
                return Err(ExtractError::parse(self.file, current.line, "Inconsistent indentation"));
            }

            let text = current.text.clone();
            let line = current.line;
            self.current += 1;

            let children = match self.lines.get(self.current) {
                Some(next) if next.indent > indent => {
                    let child_indent = next.indent;
                    Some(self.parse_block(child_indent)?)
                }
                _ => None,
            };

            nodes.push(self.build_node(&text, children, line)?);
        }

        Ok(nodes)
    }

    fn build_node(&self, text: &str, children: Option<Vec<Node>>, line: usize) -> Result<Node> {
        if let Some(mixin) = text.strip_prefix('=') {
            return Ok(Node::AtRule(at_rule_from_text(&format!("@mixin {}", mixin.trim()), children, line)));
        }
        if let Some(include) = text.strip_prefix('+') {
            return Ok(Node::AtRule(at_rule_from_text(&format!("@include {}", include.trim()), children, line)));
        }
        if text.starts_with('@') {
            return Ok(Node::AtRule(at_rule_from_text(text, children, line)));
        }

        match children {
            Some(nodes) => Ok(Node::Rule(Rule {
                selector: text.to_string(),
                nodes,
                line,
            })),
            None => match split_declaration(text) {
                Some((prop, value)) => Ok(Node::Declaration(Declaration { prop, value, line })),
                None => Err(ExtractError::parse(
                    self.file,
                    line,
                    format!("Expected a declaration or a nested block: '{}'", text),
                )),
            },
        }
    }
}
