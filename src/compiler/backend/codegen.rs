//! CSS text generation

use super::CssNode;
use crate::config::OutputStyle;

pub struct CodeGenerator {
    output: String,
    style: OutputStyle,
}

impl CodeGenerator {
    pub fn new(style: OutputStyle) -> Self {
        Self {
            output: String::new(),
            style,
        }
    }

    pub fn generate(mut self, nodes: &[CssNode]) -> String {
        let visible: Vec<&CssNode> = nodes.iter().filter(|n| !n.is_invisible()).collect();
        match self.style {
            OutputStyle::Expanded => {
                for (i, node) in visible.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str("\n\n");
                    }
                    self.write_expanded(node, 0);
                }
                if !self.output.is_empty() {
                    self.output.push('\n');
                }
            }
            OutputStyle::Compressed => {
                for node in visible {
                    self.write_compressed(node);
                }
            }
        }
        self.output
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.output.push_str("  ");
        }
    }

    fn write_expanded(&mut self, node: &CssNode, depth: usize) {
        self.indent(depth);
        match node {
            CssNode::Style {
                selectors,
                declarations,
            } => {
                self.output.push_str(&selectors.join(",\n"));
                self.output.push_str(" {\n");
                for (prop, value) in declarations {
                    self.indent(depth + 1);
                    self.output.push_str(&format!("{}: {};\n", prop, value));
                }
                self.indent(depth);
                self.output.push('}');
            }
            CssNode::AtRule { name, params, children } => {
                self.output.push('@');
                self.output.push_str(name);
                if !params.is_empty() {
                    self.output.push(' ');
                    self.output.push_str(params);
                }
                match children {
                    None => self.output.push(';'),
                    Some(children) => {
                        self.output.push_str(" {\n");
                        for child in children.iter().filter(|n| !n.is_invisible()) {
                            self.write_expanded(child, depth + 1);
                            self.output.push('\n');
                        }
                        self.indent(depth);
                        self.output.push('}');
                    }
                }
            }
            CssNode::Declaration { prop, value } => {
                self.output.push_str(&format!("{}: {};", prop, value));
            }
            CssNode::Comment(text) => self.output.push_str(text),
            CssNode::Import(url) => self.output.push_str(&format!("@import {};", url)),
        }
    }

    fn write_compressed(&mut self, node: &CssNode) {
        match node {
            CssNode::Style {
                selectors,
                declarations,
            } => {
                self.output.push_str(&selectors.join(","));
                self.output.push('{');
                let body: Vec<String> = declarations
                    .iter()
                    .map(|(prop, value)| format!("{}:{}", prop, value))
                    .collect();
                self.output.push_str(&body.join(";"));
                self.output.push('}');
            }
            CssNode::AtRule { name, params, children } => {
                self.output.push('@');
                self.output.push_str(name);
                if !params.is_empty() {
                    self.output.push(' ');
                    self.output.push_str(params);
                }
                match children {
                    None => self.output.push(';'),
                    Some(children) => {
                        self.output.push('{');
                        for child in children.iter().filter(|n| !n.is_invisible()) {
                            self.write_compressed(child);
                        }
                        self.output.push('}');
                    }
                }
            }
            CssNode::Declaration { prop, value } => {
                self.output.push_str(&format!("{}:{};", prop, value));
            }
            // Only `/*!` comments survive compression
            CssNode::Comment(text) => {
                if text.starts_with("/*!") {
                    self.output.push_str(text);
                }
            }
            CssNode::Import(url) => self.output.push_str(&format!("@import {};", url)),
        }
    }
}
