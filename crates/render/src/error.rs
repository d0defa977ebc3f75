use thiserror::Error;
use zpt_dom::DomError;
use zpt_tales::TalesError;
use zpt_traits::ResourceError;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid '{attribute}' attribute on {node}: {message}")]
    InvalidAttribute {
        attribute: String,
        node: String,
        message: String,
    },

    #[error("{node} carries both 'content' and 'replace'; they may not be combined")]
    ContentAndReplace { node: String },

    #[error("Could not evaluate '{attribute}' expression '{expression}' on {node}: {source}")]
    Evaluation {
        attribute: String,
        expression: String,
        node: String,
        #[source]
        source: TalesError,
    },

    #[error("'repeat' on {node} requires a sequence, got {type_name}")]
    NotIterable { node: String, type_name: String },

    #[error("Macro '{expression}' used by {node} could not be found")]
    MacroNotFound {
        expression: String,
        node: String,
        #[source]
        source: Option<TalesError>,
    },

    #[error("'{expression}' used by {node} is a {type_name}, not a macro")]
    NotAMacro {
        expression: String,
        node: String,
        type_name: String,
    },

    #[error("Macro expansion at {node} exceeded the nesting limit of {limit}")]
    MacroDepth { node: String, limit: usize },

    #[error("'on-error' on {node} failed while handling '{original}': {source}")]
    OnError {
        node: String,
        original: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("Rendering was cancelled")]
    Cancelled,

    #[error("Invalid rendering configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Tales(#[from] TalesError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl RenderError {
    /// A short name for the kind of failure, exposed to `on-error` handlers
    /// as `error/type`.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::InvalidAttribute { .. } => "InvalidAttribute",
            RenderError::ContentAndReplace { .. } => "ContentAndReplace",
            RenderError::Evaluation { .. } => "Evaluation",
            RenderError::NotIterable { .. } => "NotIterable",
            RenderError::MacroNotFound { .. } => "MacroNotFound",
            RenderError::NotAMacro { .. } => "NotAMacro",
            RenderError::MacroDepth { .. } => "MacroDepth",
            RenderError::OnError { .. } => "OnError",
            RenderError::Cancelled => "Cancelled",
            RenderError::Config(_) => "Config",
            RenderError::Tales(_) => "Tales",
            RenderError::Dom(_) => "Dom",
            RenderError::Resource(_) => "Resource",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}
