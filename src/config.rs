//! Pre-processor and compiler configuration, and the rules for merging the
//! settings the extraction pipeline requires with the caller's own.

use crate::compiler::value::Value;
use crate::error::Result;
use crate::importer::Importer;
use crate::preprocessor::Syntax;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A host function callable from stylesheet code
pub type CustomFunction = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct PreprocessorConfig {
    pub syntax: Option<Syntax>,
    /// Source file name used in error messages
    pub from: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Expanded,
    Compressed,
}

#[derive(Clone, Default)]
pub struct CompilerConfig {
    /// Custom functions keyed by signature, e.g. `"double($n)"`
    pub functions: IndexMap<String, CustomFunction>,
    /// Consulted in order before the load paths
    pub importers: Vec<Arc<dyn Importer>>,
    pub load_paths: Vec<PathBuf>,
    pub style: Option<OutputStyle>,
    pub syntax: Option<Syntax>,
    /// Location of the entry stylesheet; relative loads resolve against it
    pub url: Option<PathBuf>,
    /// Silence `@warn` and `@debug`
    pub quiet: Option<bool>,
}

impl fmt::Debug for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerConfig")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("importers", &self.importers.len())
            .field("load_paths", &self.load_paths)
            .field("style", &self.style)
            .field("syntax", &self.syntax)
            .field("url", &self.url)
            .field("quiet", &self.quiet)
            .finish()
    }
}

impl CompilerConfig {
    pub fn with_function<F>(mut self, signature: &str, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(signature.to_string(), Arc::new(function));
        self
    }

    pub fn with_importer(mut self, importer: Arc<dyn Importer>) -> Self {
        self.importers.push(importer);
        self
    }

    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }
}

/// Name part of a function signature: `"double($n)"` -> `"double"`
pub fn signature_name(signature: &str) -> &str {
    signature
        .split('(')
        .next()
        .unwrap_or(signature)
        .trim()
}

/// The pipeline only ever requires SCSS; everything else is the caller's.
pub fn merge_preprocessor(required: PreprocessorConfig, user: PreprocessorConfig) -> PreprocessorConfig {
    PreprocessorConfig {
        syntax: required.syntax.or(user.syntax),
        from: required.from.or(user.from),
    }
}

pub fn merge_compiler(required: CompilerConfig, user: CompilerConfig) -> CompilerConfig {
    let mut functions = required.functions;
    for (signature, function) in user.functions {
        let name = signature_name(&signature);
        let clash = functions.keys().any(|existing| signature_name(existing) == name);
        if clash {
            log::warn!(
                "Custom function '{}' is reserved for variable extraction and was ignored",
                signature
            );
            continue;
        }
        functions.insert(signature, function);
    }

    let mut importers = required.importers;
    importers.extend(user.importers);

    let mut load_paths = required.load_paths;
    load_paths.extend(user.load_paths);

    CompilerConfig {
        functions,
        importers,
        load_paths,
        style: required.style.or(user.style),
        syntax: required.syntax.or(user.syntax),
        url: required.url.or(user.url),
        quiet: required.quiet.or(user.quiet),
    }
}
