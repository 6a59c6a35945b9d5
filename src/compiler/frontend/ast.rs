//! Expression syntax tree

use crate::compiler::value::ListSeparator;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number {
        value: f64,
        unit: String,
    },
    /// Quoted string, or an unquoted identifier such as `solid` or `white`
    String {
        text: String,
        quoted: bool,
    },
    /// Hex color as written
    Color(String),
    Boolean(bool),
    Null,
    Variable {
        namespace: Option<String>,
        name: String,
    },
    List {
        items: Vec<Expression>,
        separator: ListSeparator,
        bracketed: bool,
    },
    Map(Vec<(Expression, Expression)>),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Paren(Box<Expression>),
    FunctionCall {
        namespace: Option<String>,
        name: String,
        args: ArgumentList,
    },
    /// `#{...}`
    Interpolation(Box<Expression>),
    /// Adjacent parts without whitespace, e.g. `col-#{$i}`
    Concat(Vec<Expression>),
    /// Special functions kept as text: `url(...)`, `calc(...)`, `var(...)`
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Times,
    Divide,
    Modulo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentList {
    pub positional: Vec<Expression>,
    pub named: Vec<(String, Expression)>,
    /// `$args...`
    pub rest: Option<Box<Expression>>,
}

/// Declared parameters of a mixin, function or custom function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterList {
    pub params: Vec<Parameter>,
    pub rest: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Expression>,
}

impl ParameterList {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Times => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
        }
    }
}
