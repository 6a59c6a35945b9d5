//! Discovery of root-scope variable declarations

use crate::preprocessor::Root;
use indexmap::IndexSet;
use regex::Regex;
use std::sync::OnceLock;

fn variable_filter() -> &'static Regex {
    static FILTER: OnceLock<Regex> = OnceLock::new();
    FILTER.get_or_init(|| Regex::new(r"^\$").expect("static pattern"))
}

/// Names (with `$`) of the variables declared directly at the root of the
/// tree, in order of first appearance. Declarations nested in rules,
/// at-rules, mixins or functions are skipped.
pub fn scan(root: &Root) -> IndexSet<String> {
    let mut names = IndexSet::new();
    root.walk_decls(variable_filter(), &mut |decl, parent| {
        if parent.is_root() {
            names.insert(decl.prop.clone());
        }
    });
    log::debug!("Discovered {} root variable(s) in {}", names.len(), root.file);
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreprocessorConfig;
    use crate::preprocessor::{self, Syntax};

    fn names(source: &str) -> Vec<String> {
        let root = preprocessor::parse(source, &PreprocessorConfig::default()).unwrap();
        scan(&root).into_iter().collect()
    }

    #[test]
    fn test_root_variables_in_order() {
        assert_eq!(names("$foo: 1;\n$bar: 10px;\n"), vec!["$foo", "$bar"]);
    }

    #[test]
    fn test_duplicates_collapse_to_first_position() {
        assert_eq!(names("$a: 1;\n$b: 2;\n$a: 3;"), vec!["$a", "$b"]);
    }

    #[test]
    fn test_nested_declarations_are_excluded() {
        let source = r#"
$top: 1;
.box { $inner: 2; width: $inner; }
@mixin m { $mixed: 3; }
@function f() { $local: 4; @return $local; }
@media screen { $media: 5; }
$last: 6;
"#;
        assert_eq!(names(source), vec!["$top", "$last"]);
    }

    #[test]
    fn test_plain_properties_are_ignored() {
        assert!(names("a { color: red; }").is_empty());
        assert!(names("").is_empty());
    }

    #[test]
    fn test_indented_syntax() {
        let config = PreprocessorConfig {
            syntax: Some(Syntax::Indented),
            from: None,
        };
        let root = preprocessor::parse("$a: 1\n.x\n  $b: 2\n", &config).unwrap();
        let found: Vec<String> = scan(&root).into_iter().collect();
        assert_eq!(found, vec!["$a"]);
    }
}
