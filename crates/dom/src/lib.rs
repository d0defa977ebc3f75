//! An arena-backed, mutable XML document tree.
//!
//! The renderer restructures documents in place: nodes are detached, cloned,
//! replaced and imported from other documents. Nodes are addressed by
//! [`NodeId`] handles into the owning [`Document`]'s arena, so parent links are
//! plain indices and detaching a node detaches its whole subtree at once.
//!
//! Parsing is delegated to `roxmltree` and serialization to `quick-xml`.

mod attribute;
mod document;
mod error;
mod node;
mod parse;
mod serialize;

pub use attribute::{AttributeSpec, NamespaceSpec};
pub use document::Document;
pub use error::DomError;
pub use node::{Attribute, Element, Location, Namespace, NodeId, NodeKind, QName, SourceInfo};
pub use parse::{parse_document, parse_fragment};
pub use serialize::SerializeOptions;

/// The namespace URI bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
