//! The TAL pass: attribute rules applied to every element, in a fixed order.
//!
//! `define`, `condition`, `repeat`, `content`/`replace`, `attributes` and
//! `omit-tag` run in that order and each may end the sequence early.
//! `on-error` takes no part in normal processing; it is invoked through the
//! error-handler stack when the element or one of its descendants fails.

mod attributes;
mod condition;
mod content;
mod define;
mod omit_tag;
mod on_error;
mod repeat;
pub(crate) mod syntax;

use crate::context::{ContextStrategy, ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::ops::ControlFlow;
use std::sync::Arc;
use zpt_dom::{AttributeSpec, NodeId, parse_fragment};
use zpt_tales::Value;

type RuleFlow = Result<ControlFlow<ProcessingResult>, RenderError>;

pub struct TalStrategy {
    vocabulary: Arc<Vocabulary>,
}

impl TalStrategy {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    fn apply_rules(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError> {
        let vocab = &*self.vocabulary;
        define::handle_define(state, ctx, vocab)?;
        if let ControlFlow::Break(done) = condition::handle_condition(state, ctx, vocab)? {
            return Ok(done);
        }
        if let ControlFlow::Break(done) = repeat::handle_repeat(state, ctx, vocab)? {
            return Ok(done);
        }
        let mut result = ProcessingResult::noop();
        if let ControlFlow::Break(done) =
            content::handle_content_or_replace(state, ctx, vocab, &mut result)?
        {
            return Ok(done);
        }
        attributes::handle_attributes(state, ctx, vocab)?;
        if let ControlFlow::Break(done) = omit_tag::handle_omit_tag(state, ctx, vocab, &result)? {
            return Ok(done);
        }
        Ok(result)
    }
}

impl ContextStrategy for TalStrategy {
    fn process(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError> {
        if !state.document.is_element(ctx.node) {
            return Ok(ProcessingResult::noop());
        }
        match self.apply_rules(state, ctx) {
            Ok(result) => Ok(result),
            Err(error) if error.is_cancelled() => Err(error),
            Err(error) => match on_error::handle_error(state, &error, ctx, &self.vocabulary)? {
                Some(result) => Ok(result),
                None => Err(error),
            },
        }
    }

    fn handles_errors(&self) -> bool {
        true
    }

    fn handle_error(
        &self,
        state: &mut RenderState<'_>,
        error: &RenderError,
        ctx: &ExpressionContext,
    ) -> Result<Option<ProcessingResult>, RenderError> {
        on_error::handle_error(state, error, ctx, &self.vocabulary)
    }
}

/// Evaluates the expression of a TAL attribute, naming the attribute and the
/// node when it fails.
pub(crate) fn evaluate(
    state: &RenderState<'_>,
    ctx: &ExpressionContext,
    spec: &AttributeSpec,
    expression: &str,
) -> Result<Value, RenderError> {
    state
        .evaluate(expression, ctx)
        .map_err(|source| RenderError::Evaluation {
            attribute: spec.qname().qualified(),
            expression: expression.to_string(),
            node: state.describe(ctx.node),
            source,
        })
}

pub(crate) fn invalid_attribute(
    state: &RenderState<'_>,
    node: NodeId,
    spec: &AttributeSpec,
    message: impl Into<String>,
) -> RenderError {
    RenderError::InvalidAttribute {
        attribute: spec.qname().qualified(),
        node: state.describe(node),
        message: message.into(),
    }
}

/// Builds the nodes a `content`, `replace` or `on-error` result stands for.
/// Structure (the keyword, or a `structure:` value) is parsed as markup in
/// the namespace scope of `node`; anything else becomes one text node.
pub(crate) fn content_nodes(
    state: &mut RenderState<'_>,
    node: NodeId,
    value: &Value,
    structure: bool,
) -> Result<Vec<NodeId>, RenderError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let text = value.to_string();
    let doc = &mut state.document;
    if !structure && !value.is_structure() {
        return Ok(vec![doc.create_text(text)]);
    }
    let fragment = parse_fragment(&text, &doc.in_scope_namespaces(node))?;
    Ok(fragment
        .children(fragment.root())
        .iter()
        .map(|&child| doc.import_subtree(&fragment, child))
        .collect())
}
