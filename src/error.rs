use std::path::PathBuf;

/// Convenience result type used by the crate-level entry points.
pub type Result<T> = std::result::Result<T, Error>;

/// Syntax error while turning template source into a syntax tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the template source.
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// The syntax tree holds something the canonical form has no mapping for.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonError {
    #[error("unsupported node kind: {kind}")]
    UnsupportedNodeKind { kind: String },

    /// Canonical commands hold exactly one operand.
    #[error("command must have exactly one operand, got {count}")]
    CommandArity { count: usize },
}

/// Template/data mismatch found while rendering a canonical tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("can't evaluate field {field} in {found} value")]
    InvalidFieldTarget { field: String, found: &'static str },

    #[error("undefined variable: ${name}")]
    UndefinedVariable { name: String },

    #[error("range can't iterate over {found} value")]
    InvalidRangeTarget { found: &'static str },

    #[error("can't print {found} value")]
    UnprintableValue { found: &'static str },

    #[error("command must have exactly one argument, got {count}")]
    CommandArity { count: usize },
}

/// Top-level error taxonomy for the convenience APIs and [`crate::TemplateSet`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Canon(#[from] CanonError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("template {name:?} is not defined")]
    UnknownTemplate { name: String },

    /// A template file failed to load; `source` is the underlying cause.
    #[error("template {name:?}: {source}")]
    Template {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("io error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn in_template(name: impl Into<String>, source: Error) -> Self {
        Self::Template {
            name: name.into(),
            source: Box::new(source),
        }
    }
}
