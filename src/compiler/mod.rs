// This module defines the embedded compiler and orchestrates its pipeline.
//
// It understands the subset of Sass the extraction pipeline needs: variables
// and scoping, maps and lists, control flow, mixins and functions, `@import`,
// `@use`/`@forward`, the common built-in functions, and host functions
// registered through `CompilerConfig::functions`.

mod backend;
pub mod colors;
pub(crate) mod frontend;
pub(crate) mod middle_end;
pub mod value;

use crate::config::{CompilerConfig, PreprocessorConfig};
use crate::error::{ExtractError, Result};
use crate::preprocessor;
use backend::codegen::CodeGenerator;
use std::path::PathBuf;

/// Compiled stylesheet
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub css: String,
    /// Canonical locations of every stylesheet loaded during compilation
    pub loaded_urls: Vec<PathBuf>,
}

/// Entry point of the embedded compiler
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile stylesheet source text.
    pub fn compile_string(&self, source: &str, config: &CompilerConfig) -> Result<CompileOutput> {
        // STAGE 1: PRE-PROCESSING
        let root = preprocessor::parse(
            source,
            &PreprocessorConfig {
                syntax: Some(config.syntax.unwrap_or_default()),
                from: config.url.clone(),
            },
        )?;
        log::debug!("Compiling {} ({} top-level nodes)", root.file, root.nodes.len());

        // STAGE 2: EVALUATION
        let evaluated = middle_end::evaluate(&root, config)?;

        // STAGE 3: CODE GENERATION
        let css = CodeGenerator::new(config.style.unwrap_or_default()).generate(&evaluated.css);
        log::debug!(
            "Compiled {} ({} bytes of CSS, {} stylesheet(s) loaded)",
            root.file,
            css.len(),
            evaluated.loaded_urls.len()
        );

        Ok(CompileOutput {
            css,
            loaded_urls: evaluated.loaded_urls,
        })
    }

    /// Compile on tokio's blocking pool; custom functions run there too.
    pub async fn compile_string_async(&self, source: String, config: CompilerConfig) -> Result<CompileOutput> {
        let compiler = *self;
        tokio::task::spawn_blocking(move || compiler.compile_string(&source, &config))
            .await
            .map_err(|e| ExtractError::Task {
                message: format!("compilation task failed: {}", e),
            })?
    }
}
