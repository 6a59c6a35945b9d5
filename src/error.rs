//! Error types for Sass variable extraction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error in {file} at line {line}: {message}")]
    Parse { file: String, line: usize, message: String },

    #[error("Compile error in {file} at line {line}: {message}")]
    Compile { file: String, line: usize, message: String },

    #[error("Can't find stylesheet to import: {url}: {message}")]
    Import { url: String, message: String },

    #[error("Error in function {name}(): {message}")]
    Function { name: String, message: String },

    #[error("Invalid hook name '{name}': must be usable as a Sass variable and function name")]
    InvalidHookName { name: String },

    #[error("Hook function '{hook}' was never called during compilation")]
    HookNotInvoked { hook: String },

    #[error("Background task failed: {message}")]
    Task { message: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    pub fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn compile(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Compile {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn import(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Import {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Errors raised while evaluating an expression carry no location yet;
    /// the evaluator attaches one with [`ExtractError::at`].
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Compile {
            file: "<unknown>".to_string(),
            line: 0,
            message: message.into(),
        }
    }

    /// The message without its location prefix
    pub fn message(&self) -> String {
        match self {
            Self::Parse { message, .. } | Self::Compile { message, .. } | Self::Function { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Fill in the location of a location-less compile error.
    pub fn at(self, file: &str, line: usize) -> Self {
        match self {
            Self::Compile { file: f, line: 0, message } if f == "<unknown>" => Self::Compile {
                file: file.to_string(),
                line,
                message,
            },
            other => other,
        }
    }
}
