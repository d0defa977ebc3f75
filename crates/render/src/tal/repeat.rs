use super::syntax::parse_repeat;
use super::{RuleFlow, evaluate, invalid_attribute};
use crate::context::{ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::ops::ControlFlow;
use std::sync::Arc;
use zpt_tales::RepetitionInfo;

/// Replaces the element with one copy per item. Each copy is processed in
/// its own sibling context binding the loop variable and its repetition
/// info; the original only serves as the pattern and is removed.
pub(crate) fn handle_repeat(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
) -> RuleFlow {
    let Some(value) = state.document.attribute(ctx.node, &vocab.repeat) else {
        return Ok(ControlFlow::Continue(()));
    };
    let (name, expression) = parse_repeat(value).ok_or_else(|| {
        invalid_attribute(state, ctx.node, &vocab.repeat, "expected 'variable expression'")
    })?;

    let result = evaluate(state, ctx, &vocab.repeat, &expression)?;
    if result.is_null() || result.is_default() {
        state.document.detach(ctx.node);
        return Ok(ControlFlow::Break(ProcessingResult::without_children()));
    }
    let items = result.as_sequence().ok_or_else(|| RenderError::NotIterable {
        node: state.describe(ctx.node),
        type_name: result.type_name().to_string(),
    })?;
    let items = Arc::new(items);
    log::trace!("Repeating {} {} time(s)", state.describe(ctx.node), items.len());

    let mut contexts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let doc = &mut state.document;
        let copy = doc.deep_copy(ctx.node);
        for spec in [&vocab.repeat, &vocab.define, &vocab.condition] {
            doc.remove_attribute(copy, spec);
        }
        doc.insert_before(ctx.node, copy)?;

        let mut repetition = ctx.create_child(copy);
        repetition.locals.insert(name.clone(), item.clone());
        repetition.repetitions.insert(
            name.clone(),
            RepetitionInfo::new(name.clone(), index, Arc::clone(&items)),
        );
        contexts.push(repetition);
    }
    state.document.detach(ctx.node);
    Ok(ControlFlow::Break(
        ProcessingResult::without_children().with_additional_contexts(contexts),
    ))
}
