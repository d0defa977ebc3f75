use crate::error::DomError;
use crate::node::{Attribute, Element, Namespace, NodeId, NodeKind, QName, SourceInfo};
use crate::{AttributeSpec, XML_NAMESPACE};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    source: Option<SourceInfo>,
}

/// A mutable document tree. Node `0` is always the document node.
///
/// Nodes are never freed: a detached node stays in the arena and can be
/// re-inserted, which keeps every outstanding [`NodeId`] valid for the
/// lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    name: Option<Arc<str>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                source: None,
            }],
            name: None,
        }
    }

    pub fn with_name(name: impl Into<Arc<str>>) -> Self {
        let mut doc = Self::new();
        doc.name = Some(name.into());
        doc
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn shared_name(&self) -> Option<Arc<str>> {
        self.name.clone()
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The first element child of the document node.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Number of nodes in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn source(&self, id: NodeId) -> Option<&SourceInfo> {
        self.nodes[id.0].source.as_ref()
    }

    pub fn set_source(&mut self, id: NodeId, source: Option<SourceInfo>) {
        self.nodes[id.0].source = source;
    }

    /// Whether the node is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }

    pub(crate) fn push(&mut self, kind: NodeKind, source: Option<SourceInfo>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            source,
        });
        id
    }

    pub fn create_element(&mut self, name: QName) -> NodeId {
        self.push(NodeKind::Element(Element::new(name)), None)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()), None)
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()), None)
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == self.root() {
            return Err(DomError::hierarchy(child, "the document node has no parent"));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomError::hierarchy(
                child,
                "a node cannot be inserted beneath itself",
            ));
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    fn insert_at_sibling(
        &mut self,
        reference: NodeId,
        new: NodeId,
        offset: usize,
    ) -> Result<(), DomError> {
        let parent = self
            .parent(reference)
            .ok_or_else(|| DomError::hierarchy(reference, "reference node has no parent"))?;
        self.check_insertable(parent, new)?;
        self.detach(new);
        let position = self.position_in_parent(parent, reference).ok_or_else(|| {
            DomError::hierarchy(reference, "reference node is not a child of its parent")
        })?;
        self.nodes[parent.0].children.insert(position + offset, new);
        self.nodes[new.0].parent = Some(parent);
        Ok(())
    }

    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        self.insert_at_sibling(reference, new, 0)
    }

    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) -> Result<(), DomError> {
        self.insert_at_sibling(reference, new, 1)
    }

    fn position_in_parent(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    /// Removes a node, with its subtree, from its parent. No-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Replaces `old` with `replacements`, in order, and detaches `old`.
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> Result<(), DomError> {
        for &replacement in replacements {
            self.insert_before(old, replacement)?;
        }
        self.detach(old);
        Ok(())
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Copies a subtree within this document. The copy is detached.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let data = &self.nodes[id.0];
        let (kind, source, children) = (data.kind.clone(), data.source.clone(), data.children.clone());
        let copy = self.push(kind, source);
        for child in children {
            let child_copy = self.deep_copy(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Copies a subtree from another document into this one. The copy is
    /// detached and keeps the source information of the original nodes.
    pub fn import_subtree(&mut self, other: &Document, id: NodeId) -> NodeId {
        let data = &other.nodes[id.0];
        let kind = match &data.kind {
            NodeKind::Document => NodeKind::Element(Element::new(QName::local("document"))),
            kind => kind.clone(),
        };
        let copy = self.push(kind, data.source.clone());
        for &child in &data.children {
            let child_copy = self.import_subtree(other, child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// The node and its descendants, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev().copied());
        }
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node.0].kind {
                NodeKind::Text(text) | NodeKind::CData(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Namespace bindings in scope at a node, innermost declaration winning.
    pub fn in_scope_namespaces(&self, id: NodeId) -> Vec<Namespace> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            chain.push(node);
            current = self.nodes[node.0].parent;
        }
        let mut bindings: HashMap<Option<String>, String> = HashMap::new();
        for node in chain.into_iter().rev() {
            if let Some(element) = self.element(node) {
                for ns in &element.namespaces {
                    bindings.insert(ns.prefix.clone(), ns.uri.clone());
                }
            }
        }
        let mut namespaces: Vec<Namespace> = bindings
            .into_iter()
            .filter(|(prefix, _)| prefix.as_deref() != Some("xml"))
            .map(|(prefix, uri)| Namespace { prefix, uri })
            .collect();
        namespaces.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        namespaces
    }

    pub fn attribute(&self, id: NodeId, spec: &AttributeSpec) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|attr| spec.matches(&attr.name))
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, spec: &AttributeSpec) -> bool {
        self.attribute(id, spec).is_some()
    }

    /// Removes every attribute matching `spec`, returning the first value removed.
    pub fn remove_attribute(&mut self, id: NodeId, spec: &AttributeSpec) -> Option<String> {
        let element = self.element_mut(id)?;
        let mut removed = None;
        element.attributes.retain(|attr| {
            if spec.matches(&attr.name) {
                if removed.is_none() {
                    removed = Some(attr.value.clone());
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Sets an attribute, overwriting an existing attribute with the same name
    /// in place. Returns `false` when the node is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: impl Into<String>) -> bool {
        let Some(element) = self.element_mut(id) else {
            return false;
        };
        let value = value.into();
        match element.attributes.iter_mut().find(|attr| attr.name.same_as(&name)) {
            Some(existing) => existing.value = value,
            None => element.attributes.push(Attribute { name, value }),
        }
        true
    }

    /// Removes the attribute named exactly `name`, returning its value.
    pub fn remove_attribute_named(&mut self, id: NodeId, name: &QName) -> Option<String> {
        let element = self.element_mut(id)?;
        let position = element.attributes.iter().position(|attr| attr.name.same_as(name))?;
        Some(element.attributes.remove(position).value)
    }

    /// Finds the namespace URI bound to `prefix` at `id`, if any.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(element) = self.element(node)
                && let Some(ns) = element
                    .namespaces
                    .iter()
                    .find(|ns| ns.prefix.as_deref() == prefix)
            {
                return Some(ns.uri.clone());
            }
            current = self.nodes[node.0].parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(doc: &mut Document, name: &str) -> NodeId {
        doc.create_element(QName::local(name))
    }

    fn tree() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let html = element(&mut doc, "html");
        doc.append_child(root, html).unwrap();
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        doc.append_child(html, a).unwrap();
        doc.append_child(html, b).unwrap();
        (doc, html, a, b)
    }

    #[test]
    fn detach_removes_whole_subtree() {
        let (mut doc, html, a, _) = tree();
        let inner = element(&mut doc, "inner");
        doc.append_child(a, inner).unwrap();
        doc.detach(a);
        assert!(!doc.is_attached(a));
        assert!(!doc.is_attached(inner));
        assert_eq!(doc.children(html).len(), 1);
        assert_eq!(doc.parent(inner), Some(a));
    }

    #[test]
    fn insert_before_and_after_keep_order() {
        let (mut doc, html, a, b) = tree();
        let x = element(&mut doc, "x");
        let y = element(&mut doc, "y");
        doc.insert_before(b, x).unwrap();
        doc.insert_after(b, y).unwrap();
        assert_eq!(doc.children(html), &[a, x, b, y]);
    }

    #[test]
    fn cannot_insert_node_beneath_itself() {
        let (mut doc, html, a, _) = tree();
        assert!(doc.append_child(a, html).is_err());
        assert!(doc.append_child(a, a).is_err());
    }

    #[test]
    fn replace_with_multiple_nodes() {
        let (mut doc, html, a, b) = tree();
        let x = doc.create_text("x");
        let y = doc.create_text("y");
        doc.replace_with(a, &[x, y]).unwrap();
        assert_eq!(doc.children(html), &[x, y, b]);
        assert!(!doc.is_attached(a));
    }

    #[test]
    fn deep_copy_is_independent() {
        let (mut doc, _, a, _) = tree();
        let text = doc.create_text("hello");
        doc.append_child(a, text).unwrap();
        let copy = doc.deep_copy(a);
        assert!(!doc.is_attached(copy));
        let copied_text = doc.children(copy)[0];
        assert_ne!(copied_text, text);
        assert_eq!(doc.text_content(copy), "hello");

        doc.set_attribute(copy, QName::local("class"), "c");
        assert!(doc.element(a).unwrap().attributes.is_empty());
    }

    #[test]
    fn import_subtree_copies_across_documents() {
        let (source, _, a, _) = {
            let (mut doc, html, a, b) = tree();
            let text = doc.create_text("from source");
            doc.append_child(a, text).unwrap();
            (doc, html, a, b)
        };
        let mut target = Document::new();
        let imported = target.import_subtree(&source, a);
        let root = target.root();
        target.append_child(root, imported).unwrap();
        assert_eq!(target.text_content(root), "from source");
        assert_eq!(target.element(imported).unwrap().name.local, "a");
    }

    #[test]
    fn set_attribute_overwrites_in_place() {
        let (mut doc, html, _, _) = tree();
        doc.set_attribute(html, QName::local("a"), "1");
        doc.set_attribute(html, QName::local("b"), "2");
        doc.set_attribute(html, QName::local("a"), "3");
        let attrs = &doc.element(html).unwrap().attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value, "3");
    }

    #[test]
    fn descendants_are_in_document_order() {
        let (mut doc, html, a, b) = tree();
        let inner = element(&mut doc, "inner");
        doc.append_child(a, inner).unwrap();
        assert_eq!(doc.descendants(html), vec![html, a, inner, b]);
    }
}
