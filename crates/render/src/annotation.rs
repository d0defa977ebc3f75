//! Source annotation: comments recording where parts of the output came from.

use crate::context::{ContextStrategy, ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::sync::Arc;
use zpt_dom::{Document, NodeId, SourceInfo};

const DIVIDER_WIDTH: usize = 78;

/// Inserts a comment naming the source document and line before the root
/// element, before each `define-macro` element and after each `define-slot`
/// element. Elements whose source document differs from their parent's, such
/// as expanded macros from another template, are annotated on both sides.
pub struct AnnotationStrategy {
    vocabulary: Arc<Vocabulary>,
    base_path: Option<String>,
}

enum Placement {
    Before,
    After,
    Around,
}

impl AnnotationStrategy {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            base_path: None,
        }
    }

    /// Strips `base_path` from document names in annotations.
    pub fn with_base_path(mut self, base_path: Option<String>) -> Self {
        self.base_path = base_path;
        self
    }

    fn placement(&self, doc: &Document, node: NodeId) -> Option<Placement> {
        let parent = doc.parent(node)?;
        if parent == doc.root() {
            return Some(Placement::Before);
        }
        let source_document = |id| doc.source(id).and_then(|s| s.document.clone());
        if source_document(node).is_some() && source_document(node) != source_document(parent) {
            return Some(Placement::Around);
        }
        if doc.has_attribute(node, &self.vocabulary.define_macro) {
            return Some(Placement::Before);
        }
        if doc.has_attribute(node, &self.vocabulary.define_slot) {
            return Some(Placement::After);
        }
        None
    }

    fn document_name<'a>(&self, name: &'a str) -> &'a str {
        let name = match &self.base_path {
            Some(base) => name.strip_prefix(base.as_str()).unwrap_or(name),
            None => name,
        };
        name.trim_start_matches(['/', '\\'])
    }

    fn annotation(&self, source: &SourceInfo, with_line: bool) -> String {
        let name = self.document_name(source.document.as_deref().unwrap_or("<unnamed>"));
        let info = if with_line {
            format!("{} (line {})", name, source.location.line)
        } else {
            name.to_string()
        };
        let divider = "=".repeat(DIVIDER_WIDTH);
        format!("\n{divider}\n{info}\n{divider}\n")
    }
}

impl ContextStrategy for AnnotationStrategy {
    fn process(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError> {
        let doc = &state.document;
        if !doc.is_element(ctx.node) {
            return Ok(ProcessingResult::noop());
        }
        let (Some(placement), Some(source)) = (self.placement(doc, ctx.node), doc.source(ctx.node))
        else {
            return Ok(ProcessingResult::noop());
        };
        let source = source.clone();

        let doc = &mut state.document;
        if matches!(placement, Placement::Before | Placement::Around) {
            let comment = doc.create_comment(self.annotation(&source, true));
            doc.insert_before(ctx.node, comment)?;
        }
        match placement {
            Placement::After => {
                let comment = doc.create_comment(self.annotation(&source, true));
                doc.insert_after(ctx.node, comment)?;
            }
            Placement::Around => {
                let comment = doc.create_comment(self.annotation(&source, false));
                doc.insert_after(ctx.node, comment)?;
            }
            Placement::Before => {}
        }
        Ok(ProcessingResult::noop())
    }
}
