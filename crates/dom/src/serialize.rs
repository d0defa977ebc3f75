//! Writes a [`Document`] back to XML text using `quick-xml`.
//!
//! Namespace declarations recorded on elements are written as-is. Names whose
//! namespace is not bound in the output (for example in subtrees imported from
//! another document) receive a declaration on the element that uses them.

use crate::error::DomError;
use crate::node::{Element, Namespace, NodeId, NodeKind, QName};
use crate::{Document, XML_NAMESPACE};
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` before the content.
    pub xml_declaration: bool,
}

impl SerializeOptions {
    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.xml_declaration = enabled;
        self
    }
}

type Scope = HashMap<Option<String>, String>;

impl Document {
    /// Serializes the whole document.
    pub fn to_xml(&self, options: &SerializeOptions) -> Result<String, DomError> {
        let mut serializer = Serializer {
            doc: self,
            writer: Writer::new(Vec::new()),
        };
        if options.xml_declaration {
            serializer.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            serializer.writer.get_mut().push(b'\n');
        }
        let scope = Scope::new();
        for &child in self.children(self.root()) {
            serializer.node(child, &scope)?;
        }
        String::from_utf8(serializer.writer.into_inner())
            .map_err(|e| DomError::Serialize(e.to_string()))
    }

    /// Serializes one node and its subtree.
    pub fn node_to_xml(&self, id: NodeId) -> Result<String, DomError> {
        let mut serializer = Serializer {
            doc: self,
            writer: Writer::new(Vec::new()),
        };
        let scope: Scope = self
            .parent(id)
            .map(|parent| {
                self.in_scope_namespaces(parent)
                    .into_iter()
                    .map(|ns| (ns.prefix, ns.uri))
                    .collect()
            })
            .unwrap_or_default();
        serializer.node(id, &scope)?;
        String::from_utf8(serializer.writer.into_inner())
            .map_err(|e| DomError::Serialize(e.to_string()))
    }
}

struct Serializer<'d> {
    doc: &'d Document,
    writer: Writer<Vec<u8>>,
}

impl Serializer<'_> {
    fn write(&mut self, event: Event<'_>) -> Result<(), DomError> {
        self.writer
            .write_event(event)
            .map_err(|e| DomError::Serialize(e.to_string()))
    }

    fn node(&mut self, id: NodeId, scope: &Scope) -> Result<(), DomError> {
        let doc = self.doc;
        match doc.kind(id) {
            NodeKind::Document => {
                for &child in doc.children(id) {
                    self.node(child, scope)?;
                }
                Ok(())
            }
            NodeKind::Element(element) => self.element(id, element, scope),
            NodeKind::Text(text) => {
                self.write(Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))))
            }
            NodeKind::CData(text) => self.write(Event::CData(BytesCData::new(text.as_str()))),
            NodeKind::Comment(text) => {
                self.write(Event::Comment(BytesText::from_escaped(text.as_str())))
            }
            NodeKind::DocumentType(body) => {
                self.write(Event::DocType(BytesText::from_escaped(body.as_str())))?;
                self.writer.get_mut().push(b'\n');
                Ok(())
            }
            NodeKind::ProcessingInstruction { target, data } => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{} {}", target, data)
                };
                self.write(Event::PI(BytesPI::new(content)))
            }
        }
    }

    fn element(&mut self, id: NodeId, element: &Element, parent_scope: &Scope) -> Result<(), DomError> {
        let mut scope = parent_scope.clone();
        let mut declarations: Vec<Namespace> = Vec::new();
        for ns in &element.namespaces {
            scope.insert(ns.prefix.clone(), ns.uri.clone());
            declarations.push(ns.clone());
        }

        let element_name = bind_name(&element.name, &mut scope, &mut declarations, false);
        let attribute_names: Vec<String> = element
            .attributes
            .iter()
            .map(|attr| bind_name(&attr.name, &mut scope, &mut declarations, true))
            .collect();

        let mut start = BytesStart::new(element_name.clone());
        for ns in &declarations {
            let key = match &ns.prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_str(), ns.uri.as_str()));
        }
        for (attr, name) in element.attributes.iter().zip(&attribute_names) {
            start.push_attribute((name.as_str(), attr.value.as_str()));
        }

        let doc = self.doc;
        let children = doc.children(id);
        if children.is_empty() {
            return self.write(Event::Empty(start));
        }
        self.write(Event::Start(start))?;
        for &child in children {
            self.node(child, &scope)?;
        }
        self.write(Event::End(BytesEnd::new(element_name)))
    }
}

/// Ensures `name`'s namespace is bound in `scope`, recording any declaration
/// that has to be added, and returns the qualified name to write.
fn bind_name(
    name: &QName,
    scope: &mut Scope,
    declarations: &mut Vec<Namespace>,
    is_attribute: bool,
) -> String {
    let Some(uri) = &name.namespace else {
        if !is_attribute
            && name.prefix.is_none()
            && scope.get(&None).is_some_and(|default| !default.is_empty())
        {
            scope.insert(None, String::new());
            declarations.push(Namespace::new(None, ""));
        }
        return name.qualified();
    };
    if uri == XML_NAMESPACE {
        return format!("xml:{}", name.local);
    }

    let prefix = match &name.prefix {
        Some(prefix) => Some(prefix.clone()),
        None if is_attribute => Some(
            scope
                .iter()
                .find(|(prefix, bound)| prefix.is_some() && *bound == uri)
                .and_then(|(prefix, _)| prefix.clone())
                .unwrap_or_else(|| generated_prefix(scope)),
        ),
        None => None,
    };

    if scope.get(&prefix) != Some(uri) {
        scope.insert(prefix.clone(), uri.clone());
        declarations.push(Namespace {
            prefix: prefix.clone(),
            uri: uri.clone(),
        });
    }
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.clone(),
    }
}

fn generated_prefix(scope: &Scope) -> String {
    (0..)
        .map(|n| format!("ns{}", n))
        .find(|candidate| !scope.contains_key(&Some(candidate.clone())))
        .unwrap_or_else(|| "ns".to_string())
}
