use super::syntax::parse_content;
use super::{RuleFlow, content_nodes, evaluate};
use crate::context::{ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::ops::ControlFlow;

/// `content` replaces the element's children; `replace` replaces the element.
/// The inserted nodes are not processed as TAL.
pub(crate) fn handle_content_or_replace(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
    result: &mut ProcessingResult,
) -> RuleFlow {
    let doc = &state.document;
    let content = doc.attribute(ctx.node, &vocab.content).map(str::to_string);
    let replace = doc.attribute(ctx.node, &vocab.replace).map(str::to_string);
    match (content, replace) {
        (Some(_), Some(_)) => Err(RenderError::ContentAndReplace {
            node: state.describe(ctx.node),
        }),
        (Some(content), None) => {
            let parsed = parse_content(&content);
            let value = evaluate(state, ctx, &vocab.content, &parsed.expression)?;
            if value.is_default() {
                return Ok(ControlFlow::Continue(()));
            }
            let nodes = content_nodes(state, ctx.node, &value, parsed.structure)?;
            let doc = &mut state.document;
            doc.clear_children(ctx.node);
            for node in nodes {
                doc.append_child(ctx.node, node)?;
            }
            result.process_children = false;
            Ok(ControlFlow::Continue(()))
        }
        (None, Some(replace)) => {
            let parsed = parse_content(&replace);
            let value = evaluate(state, ctx, &vocab.replace, &parsed.expression)?;
            if value.is_default() {
                return Ok(ControlFlow::Continue(()));
            }
            let nodes = content_nodes(state, ctx.node, &value, parsed.structure)?;
            state.document.replace_with(ctx.node, &nodes)?;
            Ok(ControlFlow::Break(ProcessingResult::without_children()))
        }
        (None, None) => Ok(ControlFlow::Continue(())),
    }
}
