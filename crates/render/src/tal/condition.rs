use super::{RuleFlow, evaluate};
use crate::context::{ExpressionContext, ProcessingResult, RenderState};
use crate::vocabulary::Vocabulary;
use std::ops::ControlFlow;

/// Removes the element and its subtree when the condition is falsey. The
/// cancel token counts as true.
pub(crate) fn handle_condition(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
) -> RuleFlow {
    let Some(expression) = state.document.attribute(ctx.node, &vocab.condition) else {
        return Ok(ControlFlow::Continue(()));
    };
    let expression = expression.to_string();
    let result = evaluate(state, ctx, &vocab.condition, &expression)?;
    if result.is_default() || result.is_truthy() {
        return Ok(ControlFlow::Continue(()));
    }
    log::trace!("Condition '{}' is false; removing {}", expression, state.describe(ctx.node));
    state.document.detach(ctx.node);
    Ok(ControlFlow::Break(ProcessingResult::without_children()))
}
