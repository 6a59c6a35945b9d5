// Evaluation stage: variables, control flow, modules, functions

pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod operators;

use crate::compiler::backend::CssNode;
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::preprocessor::Root;
use environment::Environment;
use evaluator::{Context, Evaluator};
use std::path::PathBuf;

/// Result of evaluating an entry stylesheet
pub struct Evaluated {
    pub css: Vec<CssNode>,
    pub loaded_urls: Vec<PathBuf>,
}

/// Evaluate the entry stylesheet and everything it loads
pub fn evaluate(root: &Root, config: &CompilerConfig) -> Result<Evaluated> {
    let context = Context::new(config)?;
    let mut evaluator = Evaluator::new(&context, root.file.clone(), None, Environment::new());
    evaluator.run_nodes(&root.nodes)?;
    let (css, _) = evaluator.finish();
    Ok(Evaluated {
        css,
        loaded_urls: context.loaded_urls(),
    })
}
