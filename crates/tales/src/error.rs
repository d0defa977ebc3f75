use thiserror::Error;
use zpt_dom::DomError;
use zpt_traits::ResourceError;

/// A fault raised by a host object while reading one of its members.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HostFault(pub String);

impl HostFault {
    pub fn new(message: impl Into<String>) -> Self {
        HostFault(message.into())
    }
}

#[derive(Error, Debug)]
pub enum TalesError {
    #[error("Invalid path expression '{expression}': {reason} '{fragment}'")]
    PathParse {
        expression: String,
        fragment: String,
        reason: String,
    },

    #[error("Cannot resolve '{segment}' in path '{path}'")]
    NotFound { path: String, segment: String },

    #[error("Interpolated variable '{variable}' in path '{path}' resolved to no usable segment")]
    Interpolation { path: String, variable: String },

    #[error("Error reading member '{member}' of {type_name}: {fault}")]
    HostMember {
        type_name: String,
        member: String,
        fault: HostFault,
    },

    #[error("No alternate of expression '{expression}' succeeded at {node}: {}", join_causes(.causes))]
    AllAlternatesFailed {
        expression: String,
        node: String,
        causes: Vec<TalesError>,
    },

    #[error("Unknown expression type '{0}'")]
    UnknownPrefix(String),

    #[error("Invalid string expression '{expression}': {message}")]
    StringExpression { expression: String, message: String },

    #[error("Template '{path}' could not be loaded: {source}")]
    Template {
        path: String,
        #[source]
        source: Box<TalesError>,
    },

    #[error("Invalid pipe expression '{0}': expected a variable name, whitespace and an expression")]
    PipeSyntax(String),

    #[error("Pipe target '{expression}' is a {type_name}, not a function")]
    NotCallable { expression: String, type_name: String },

    #[error("Pipe function '{expression}' failed: {fault}")]
    PipeFailed { expression: String, fault: HostFault },

    #[error("'{expression}' is a {type_name}; only template documents and macros can be loaded")]
    NotLoadable { expression: String, type_name: String },

    #[error("Rendering '{expression}' failed: {source}")]
    Load {
        expression: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

fn join_causes(causes: &[TalesError]) -> String {
    causes
        .iter()
        .enumerate()
        .map(|(i, cause)| format!("[{}] {}", i + 1, cause))
        .collect::<Vec<_>>()
        .join("; ")
}

impl TalesError {
    pub fn path_parse(
        expression: impl Into<String>,
        fragment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TalesError::PathParse {
            expression: expression.into(),
            fragment: fragment.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        TalesError::NotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// The individual failures behind an aggregate error, or the error itself.
    pub fn causes(&self) -> Vec<&TalesError> {
        match self {
            TalesError::AllAlternatesFailed { causes, .. } => causes.iter().collect(),
            other => vec![other],
        }
    }
}
