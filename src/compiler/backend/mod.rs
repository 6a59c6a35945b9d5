//! CSS output tree and its serialization

pub mod codegen;

/// A node of the evaluated stylesheet; nesting is already resolved
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Style {
        selectors: Vec<String>,
        declarations: Vec<(String, String)>,
    },
    AtRule {
        name: String,
        params: String,
        children: Option<Vec<CssNode>>,
    },
    /// Declaration directly inside an at-rule such as `@font-face`
    Declaration { prop: String, value: String },
    /// Loud comment, delimiters included
    Comment(String),
    /// Plain CSS `@import`
    Import(String),
}

impl CssNode {
    /// Whether the node produces no output
    pub fn is_invisible(&self) -> bool {
        match self {
            CssNode::Style { declarations, .. } => declarations.is_empty(),
            CssNode::AtRule {
                children: Some(children),
                ..
            } => children.iter().all(CssNode::is_invisible),
            _ => false,
        }
    }
}
