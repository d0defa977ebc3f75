use super::{RuleFlow, evaluate};
use crate::context::{ExpressionContext, ProcessingResult, RenderState};
use crate::vocabulary::Vocabulary;
use std::ops::ControlFlow;

/// Removes the element's tags, splicing its children into its place once
/// they have been processed. Until then the element's `on-error` still
/// covers them.
///
/// Without an `omit-tag` attribute only elements in the TAL or METAL
/// namespace are omitted. An empty attribute always omits; otherwise a
/// falsey result omits and a truthy result or the cancel token keeps the tag.
pub(crate) fn handle_omit_tag(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
    result: &ProcessingResult,
) -> RuleFlow {
    let omit = match state.document.attribute(ctx.node, &vocab.omit_tag) {
        None => vocab.is_zpt_element(&state.document, ctx.node),
        Some(expression) if expression.trim().is_empty() => true,
        Some(expression) => {
            let expression = expression.to_string();
            let value = evaluate(state, ctx, &vocab.omit_tag, &expression)?;
            !value.is_default() && !value.is_truthy()
        }
    };
    if !omit {
        return Ok(ControlFlow::Continue(()));
    }

    let omitted = if result.process_children {
        ProcessingResult::noop()
    } else {
        ProcessingResult::without_children()
    };
    Ok(ControlFlow::Break(omitted.unwrapping()))
}

#[cfg(test)]
mod tests {
    use crate::tal::test_support::render_tal;
    use serde_json::json;

    #[test]
    fn on_error_of_an_omitted_element_covers_its_children() {
        let out = render_tal(
            r#"<div><span tal:omit-tag="" tal:on-error="string:E"><b tal:content="here/missing"/><i>after</i></span></div>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<div>E</div>");
    }

    #[test]
    fn empty_attribute_omits_and_children_are_still_processed() {
        let out = render_tal(
            r#"<span tal:omit-tag="">a<b tal:content="here/x"/>c</span>"#,
            json!({"x": "X"}),
        )
        .unwrap();
        assert_eq!(out, "a<b>X</b>c");
    }

    #[test]
    fn falsey_expression_omits_truthy_keeps() {
        let out = render_tal(
            r#"<i tal:omit-tag="here/no">1</i><u tal:omit-tag="here/yes">2</u><s tal:omit-tag="default">3</s>"#,
            json!({"no": false, "yes": true}),
        )
        .unwrap();
        assert_eq!(out, "1<u>2</u><s>3</s>");
    }

    #[test]
    fn tal_namespace_elements_are_omitted() {
        let out = render_tal(
            r#"<tal:block tal:define="v string:V"><b tal:content="v"/></tal:block>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<b>V</b>");
    }

    #[test]
    fn omitted_content_is_not_reprocessed() {
        let out = render_tal(
            r#"<span tal:omit-tag="" tal:content="here/x">old</span>"#,
            json!({"x": "new"}),
        )
        .unwrap();
        assert_eq!(out, "new");
    }
}
