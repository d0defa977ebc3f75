//! Builds a [`Document`] from XML text using `roxmltree`.

use crate::error::DomError;
use crate::node::{Attribute, Element, Location, Namespace, NodeId, NodeKind, QName, SourceInfo};
use crate::{Document, XML_NAMESPACE};
use quick_xml::escape::unescape;
use roxmltree::NodeType;
use std::sync::Arc;

const FRAGMENT_WRAPPER: &str = "zpt-fragment";

fn parsing_options<'input>() -> roxmltree::ParsingOptions<'input> {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parses a complete XML document. `name` is recorded as the source document
/// name of every node.
pub fn parse_document(text: &str, name: Option<&str>) -> Result<Document, DomError> {
    let xml = roxmltree::Document::parse_with_options(text, parsing_options())?;
    let mut doc = match name {
        Some(name) => Document::with_name(name),
        None => Document::new(),
    };
    let builder = Builder {
        xml: &xml,
        text,
        document_name: doc.shared_name(),
    };
    let root = doc.root();
    let mut doctype = document_type(&xml, text);
    for child in xml.root().children() {
        if doctype
            .as_ref()
            .is_some_and(|(start, _)| *start < child.range().start)
            && let Some((start, body)) = doctype.take()
        {
            builder.document_type(start, body, &mut doc, root);
        }
        builder.build(child, &mut doc, root);
    }
    log::trace!(
        "Parsed document {:?} into {} nodes",
        doc.name(),
        doc.node_count()
    );
    Ok(doc)
}

/// Parses a markup fragment, which may hold several top-level nodes or plain
/// text. `namespaces` are made available to prefixed names in the fragment.
///
/// The fragment's top-level nodes become children of the returned document's
/// document node.
pub fn parse_fragment(markup: &str, namespaces: &[Namespace]) -> Result<Document, DomError> {
    let mut wrapper = format!("<{}", FRAGMENT_WRAPPER);
    for ns in namespaces {
        match &ns.prefix {
            Some(prefix) => wrapper.push_str(&format!(" xmlns:{}=\"{}\"", prefix, escape_attr(&ns.uri))),
            None => wrapper.push_str(&format!(" xmlns=\"{}\"", escape_attr(&ns.uri))),
        }
    }
    wrapper.push('>');
    let text = format!("{}{}</{}>", wrapper, markup, FRAGMENT_WRAPPER);

    let xml = roxmltree::Document::parse_with_options(&text, parsing_options())
        .map_err(|e| DomError::Fragment(e.to_string()))?;
    let mut doc = Document::new();
    let builder = Builder {
        xml: &xml,
        text: &text,
        document_name: None,
    };
    let root = doc.root();
    for child in xml.root_element().children() {
        builder.build(child, &mut doc, root);
    }
    for child in doc.children(root).to_vec() {
        doc.set_source(child, None);
    }
    Ok(doc)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
}

struct Builder<'a, 'input> {
    xml: &'a roxmltree::Document<'input>,
    text: &'a str,
    document_name: Option<Arc<str>>,
}

impl Builder<'_, '_> {
    fn build(&self, node: roxmltree::Node<'_, '_>, doc: &mut Document, parent: NodeId) {
        let kind = match node.node_type() {
            NodeType::Root => return,
            NodeType::Element => NodeKind::Element(self.element(node)),
            NodeType::Text => {
                for kind in self.text_runs(node) {
                    self.append(doc, parent, kind, self.source_info(node));
                }
                return;
            }
            NodeType::Comment => NodeKind::Comment(node.text().unwrap_or_default().to_string()),
            NodeType::PI => match node.pi() {
                Some(pi) => NodeKind::ProcessingInstruction {
                    target: pi.target.to_string(),
                    data: pi.value.unwrap_or_default().to_string(),
                },
                None => return,
            },
        };
        let Some(id) = self.append(doc, parent, kind, self.source_info(node)) else {
            return;
        };
        for child in node.children() {
            self.build(child, doc, id);
        }
    }

    fn append(
        &self,
        doc: &mut Document,
        parent: NodeId,
        kind: NodeKind,
        source: SourceInfo,
    ) -> Option<NodeId> {
        let id = doc.push(kind, Some(source));
        match doc.append_child(parent, id) {
            Ok(()) => Some(id),
            Err(e) => {
                log::warn!("Dropping node while building document: {}", e);
                None
            }
        }
    }

    fn document_type(&self, start: usize, body: String, doc: &mut Document, parent: NodeId) {
        let source = self.source_at(start);
        self.append(doc, parent, NodeKind::DocumentType(body), source);
    }

    /// Splits a text node back into its text and CDATA runs. `roxmltree`
    /// merges adjacent runs into one node, so they are recovered from the
    /// source text. The node stays whole when the runs do not add up to its
    /// text (entity expansions, normalized line endings).
    fn text_runs(&self, node: roxmltree::Node<'_, '_>) -> Vec<NodeKind> {
        let text = node.text().unwrap_or_default();
        let whole = || vec![NodeKind::Text(text.to_string())];
        let Some(source) = self.text_source(node) else {
            return whole();
        };
        if !source.contains(CDATA_START) {
            return whole();
        }
        match cdata_runs(source) {
            Some(runs) if joined(&runs) == text => runs,
            _ => whole(),
        }
    }

    /// The source text a text node was built from: up to the next sibling,
    /// or up to the parent's end tag.
    fn text_source(&self, node: roxmltree::Node<'_, '_>) -> Option<&str> {
        let start = node.range().start;
        let end = match node.next_sibling() {
            Some(next) => next.range().start,
            None => {
                let parent = node.parent()?;
                let inner = self.text.get(start..parent.range().end)?;
                start + inner.rfind("</")?
            }
        };
        self.text.get(start..end)
    }

    fn source_info(&self, node: roxmltree::Node<'_, '_>) -> SourceInfo {
        self.source_at(node.range().start)
    }

    fn source_at(&self, offset: usize) -> SourceInfo {
        let pos = self.xml.text_pos_at(offset);
        SourceInfo {
            document: self.document_name.clone(),
            location: Location {
                line: pos.row as usize,
                col: pos.col as usize,
            },
        }
    }

    fn element(&self, node: roxmltree::Node<'_, '_>) -> Element {
        let tag = node.tag_name();
        let name = QName {
            namespace: tag.namespace().map(str::to_string),
            prefix: self.written_prefix(node.range().start),
            local: tag.name().to_string(),
        };

        let attributes = node
            .attributes()
            .map(|attr| {
                let namespace = attr.namespace().map(str::to_string);
                let prefix = namespace.as_deref().and_then(|uri| prefix_for(node, uri));
                Attribute {
                    name: QName {
                        namespace,
                        prefix,
                        local: attr.name().to_string(),
                    },
                    value: attr.value().to_string(),
                }
            })
            .collect();

        Element {
            name,
            attributes,
            namespaces: declared_namespaces(node),
        }
    }

    /// The prefix of an element's start tag, read from the source text at
    /// the tag's opening `<`.
    fn written_prefix(&self, start: usize) -> Option<String> {
        let tag = self.text.get(start + 1..)?;
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
            .unwrap_or(tag.len());
        let qualified = &tag[..end];
        qualified
            .split_once(':')
            .map(|(prefix, _)| prefix.to_string())
    }
}

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";

fn cdata_runs(mut source: &str) -> Option<Vec<NodeKind>> {
    let mut runs = Vec::new();
    while !source.is_empty() {
        match source.find(CDATA_START) {
            Some(0) => {
                let body = &source[CDATA_START.len()..];
                let end = body.find(CDATA_END)?;
                runs.push(NodeKind::CData(body[..end].to_string()));
                source = &body[end + CDATA_END.len()..];
            }
            Some(at) => {
                runs.push(NodeKind::Text(unescape(&source[..at]).ok()?.into_owned()));
                source = &source[at..];
            }
            None => {
                runs.push(NodeKind::Text(unescape(source).ok()?.into_owned()));
                source = "";
            }
        }
    }
    Some(runs)
}

fn joined(runs: &[NodeKind]) -> String {
    runs.iter()
        .filter_map(|run| match run {
            NodeKind::Text(text) | NodeKind::CData(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Finds the `<!DOCTYPE ...>` declaration in the prolog, which `roxmltree`
/// checks but does not keep. Returns its offset and body.
fn document_type(xml: &roxmltree::Document<'_>, text: &str) -> Option<(usize, String)> {
    let prolog = text.get(..xml.root_element().range().start)?;
    let mut pos = 0;
    while pos < prolog.len() {
        let rest = &prolog[pos..];
        if let Some(comment) = rest.strip_prefix("<!--") {
            pos += 4 + comment.find("-->")? + 3;
        } else if rest.starts_with("<?") {
            pos += rest.find("?>")? + 2;
        } else if let Some(body) = rest.strip_prefix("<!DOCTYPE") {
            let end = declaration_end(body)?;
            return Some((pos, body[..end].trim().to_string()));
        } else {
            pos += rest.chars().next()?.len_utf8();
        }
    }
    None
}

/// Offset of the `>` closing a doctype body, skipping quoted literals and the
/// internal subset.
fn declaration_end(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    for (i, c) in body.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                '>' if depth == 0 => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn prefix_for(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name())
        .map(str::to_string)
}

/// Namespaces in scope at `node` that are not in scope at its parent element.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<Namespace> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| Namespace::new(ns.name(), ns.uri()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAL: &str = "http://xml.zope.org/namespaces/tal";

    #[test]
    fn parses_elements_text_and_comments() {
        let doc = parse_document("<html><!-- c --><p>Hello</p></html>", Some("t.pt")).unwrap();
        let html = doc.document_element().unwrap();
        assert_eq!(doc.element(html).unwrap().name.local, "html");
        assert_eq!(doc.children(html).len(), 2);
        assert!(matches!(doc.kind(doc.children(html)[0]), NodeKind::Comment(c) if c == " c "));
        assert_eq!(doc.text_content(html), "Hello");
    }

    #[test]
    fn records_prefixes_and_namespaces() {
        let doc = parse_document(
            &format!(r#"<html xmlns:tal="{}"><p tal:content="x">a</p></html>"#, TAL),
            None,
        )
        .unwrap();
        let html = doc.document_element().unwrap();
        let element = doc.element(html).unwrap();
        assert_eq!(element.namespaces, vec![Namespace::new(Some("tal"), TAL)]);

        let p = doc.children(html)[0];
        let attr = &doc.element(p).unwrap().attributes[0];
        assert_eq!(attr.name.namespace.as_deref(), Some(TAL));
        assert_eq!(attr.name.prefix.as_deref(), Some("tal"));
        assert!(doc.element(p).unwrap().namespaces.is_empty());
    }

    #[test]
    fn records_element_prefix_from_source() {
        let doc = parse_document(
            &format!(r#"<tal:block xmlns:tal="{}">x</tal:block>"#, TAL),
            None,
        )
        .unwrap();
        let block = doc.document_element().unwrap();
        let name = &doc.element(block).unwrap().name;
        assert_eq!(name.prefix.as_deref(), Some("tal"));
        assert_eq!(name.namespace.as_deref(), Some(TAL));
    }

    #[test]
    fn records_source_locations() {
        let doc = parse_document("<a>\n  <b/>\n</a>", Some("loc.pt")).unwrap();
        let a = doc.document_element().unwrap();
        let b = doc
            .children(a)
            .iter()
            .copied()
            .find(|&id| doc.is_element(id))
            .unwrap();
        let source = doc.source(b).unwrap();
        assert_eq!(source.location.line, 2);
        assert_eq!(source.location.col, 3);
        assert_eq!(source.document.as_deref(), Some("loc.pt"));
    }

    #[test]
    fn fragment_may_hold_several_nodes() {
        let doc = parse_fragment("text <b>bold</b> tail", &[]).unwrap();
        assert_eq!(doc.children(doc.root()).len(), 3);
        assert_eq!(doc.text_content(doc.root()), "text bold tail");
    }

    #[test]
    fn fragment_resolves_supplied_namespaces() {
        let namespaces = [Namespace::new(Some("x"), "urn:x")];
        let doc = parse_fragment("<x:item/>", &namespaces).unwrap();
        let item = doc.children(doc.root())[0];
        assert_eq!(doc.element(item).unwrap().name.namespace.as_deref(), Some("urn:x"));
    }

    #[test]
    fn malformed_fragment_is_an_error() {
        assert!(matches!(parse_fragment("<b>", &[]), Err(DomError::Fragment(_))));
    }

    #[test]
    fn keeps_doctype_in_prolog_order() {
        let doc = parse_document(
            "<?xml version=\"1.0\"?>\n<!-- head -->\n<!DOCTYPE html [ <!ENTITY e \"x\"> ]>\n<html/>",
            None,
        )
        .unwrap();
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 3);
        assert!(matches!(doc.kind(children[0]), NodeKind::Comment(_)));
        assert!(matches!(
            doc.kind(children[1]),
            NodeKind::DocumentType(body) if body == "html [ <!ENTITY e \"x\"> ]"
        ));
        assert!(doc.is_element(children[2]));
    }

    #[test]
    fn separates_cdata_from_surrounding_text() {
        let doc = parse_document("<p>a&amp;<![CDATA[x<y]]>b</p>", None).unwrap();
        let p = doc.document_element().unwrap();
        let kinds: Vec<_> = doc.children(p).iter().map(|&id| doc.kind(id).clone()).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Text("a&".to_string()),
                NodeKind::CData("x<y".to_string()),
                NodeKind::Text("b".to_string()),
            ]
        );
        assert_eq!(doc.text_content(p), "a&x<yb");
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(matches!(parse_document("<a>", None), Err(DomError::XmlParse(_))));
    }
}
