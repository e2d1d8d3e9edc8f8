//! Error types for the semantic convention model.

use thiserror::Error;

use crate::doc::Pos;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or resolving conventions.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] yaml_rust2::ScanError),
}

/// A validation failure pinned to a YAML source position.
///
/// `line` and `column` are 1-indexed. `id` names the nearest enclosing
/// entity (attribute fqn or group id) when one is known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub id: Option<String>,
}

impl ValidationError {
    pub fn new(pos: Pos, message: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            line: pos.line,
            column: pos.col,
            message: message.into(),
            id: id.map(str::to_owned),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - @{}:{}", self.message, self.line, self.column)?;
        if let Some(id) = &self.id {
            write!(f, " ('{}')", id)?;
        }
        Ok(())
    }
}
