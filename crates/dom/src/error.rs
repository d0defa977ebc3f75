use crate::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("Markup fragment could not be parsed: {0}")]
    Fragment(String),

    #[error("XML serialization error: {0}")]
    Serialize(String),

    #[error("Node {node:?} cannot be inserted: {reason}")]
    Hierarchy { node: NodeId, reason: String },
}

impl DomError {
    pub(crate) fn hierarchy(node: NodeId, reason: impl Into<String>) -> Self {
        DomError::Hierarchy {
            node,
            reason: reason.into(),
        }
    }
}
