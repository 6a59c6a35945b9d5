//! The extension hook name and the trailer that reports variable values
//! back through it.

use crate::error::{ExtractError, Result};
use crate::preprocessor::Syntax;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Name shared by the hook function and the variable that receives its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookName(String);

impl HookName {
    pub const DEFAULT: &'static str = "__nirvana__";

    pub fn new(name: impl Into<String>) -> Result<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("static pattern"));

        let name = name.into();
        if pattern.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(ExtractError::InvalidHookName { name })
        }
    }

    /// The default name, or the caller's override once validated
    pub fn from_option(name: Option<&str>) -> Result<Self> {
        match name {
            Some(name) => Self::new(name),
            None => Ok(Self::default()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Signature the hook is registered under
    pub fn signature(&self) -> String {
        format!("{}($variables)", self.0)
    }
}

impl Default for HookName {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append a statement that passes every named variable, in its final state,
/// to the hook: `<source>;$hook:hook(('$a':$a,'$b':$b));`
///
/// Indented sources get the statement on its own line at column zero instead.
pub fn synthesize<'a, I>(source: &str, names: I, hook: &HookName, syntax: Syntax) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let entries: Vec<String> = names
        .into_iter()
        .map(|name| format!("'{}':{}", name, name))
        .collect();
    let statement = format!("${hook}:{hook}(({}))", entries.join(","), hook = hook);
    log::trace!("Synthesized trailer: {}", statement);

    let mut augmented = String::with_capacity(source.len() + statement.len() + 3);
    augmented.push_str(source);
    match syntax {
        Syntax::Indented => {
            if !source.is_empty() && !source.ends_with('\n') {
                augmented.push('\n');
            }
            augmented.push_str(&statement);
            augmented.push('\n');
        }
        Syntax::Scss | Syntax::Css => {
            // A trailing line comment would swallow the trailer
            if source.lines().last().map_or(false, |line| line.contains("//")) {
                augmented.push('\n');
            }
            augmented.push(';');
            augmented.push_str(&statement);
            augmented.push(';');
        }
    }
    augmented
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hook() {
        assert_eq!(HookName::default().as_str(), "__nirvana__");
        assert_eq!(HookName::default().signature(), "__nirvana__($variables)");
        assert_eq!(HookName::from_option(None).unwrap(), HookName::default());
    }

    #[test]
    fn test_hook_validation() {
        assert!(HookName::new("collect-vars").is_ok());
        assert!(HookName::new("_x1").is_ok());

        for bad in ["", "1abc", "has space", "a(b)", "$dollar"] {
            match HookName::new(bad) {
                Err(ExtractError::InvalidHookName { name }) => assert_eq!(name, bad),
                other => panic!("expected InvalidHookName for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_synthesize() {
        let names = vec!["$a".to_string(), "$b".to_string()];
        let augmented = synthesize("$a: 1;\n$b: 2;", &names, &HookName::default(), Syntax::Scss);
        assert_eq!(
            augmented,
            "$a: 1;\n$b: 2;;$__nirvana__:__nirvana__(('$a':$a,'$b':$b));"
        );
    }

    #[test]
    fn test_synthesize_after_line_comment() {
        let names = vec!["$a".to_string()];
        let augmented = synthesize("$a: 1; // last", &names, &HookName::default(), Syntax::Scss);
        assert_eq!(augmented, "$a: 1; // last\n;$__nirvana__:__nirvana__(('$a':$a));");
    }

    #[test]
    fn test_synthesize_without_variables() {
        let hook = HookName::new("probe").unwrap();
        let names: Vec<String> = Vec::new();
        assert_eq!(synthesize("a { b: c }", &names, &hook, Syntax::Scss), "a { b: c };$probe:probe(());");
    }

    #[test]
    fn test_synthesize_indented() {
        let names = vec!["$a".to_string()];
        let augmented = synthesize("$a: 1\n.x\n  b: $a", &names, &HookName::default(), Syntax::Indented);
        assert_eq!(augmented, "$a: 1\n.x\n  b: $a\n$__nirvana__:__nirvana__(('$a':$a))\n");
    }
}
