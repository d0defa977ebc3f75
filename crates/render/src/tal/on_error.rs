use super::syntax::{ContentExpression, parse_content};
use super::{content_nodes, evaluate};
use crate::context::{ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use zpt_dom::NodeId;
use zpt_tales::{Value, ValueMap};

/// Recovers from `error` at the element of `ctx` when it carries `on-error`:
/// the element's children are replaced by the result of the `on-error`
/// expression, evaluated with `error` bound. Cancellation is never handled.
pub(crate) fn handle_error(
    state: &mut RenderState<'_>,
    error: &RenderError,
    ctx: &ExpressionContext,
    vocab: &Vocabulary,
) -> Result<Option<ProcessingResult>, RenderError> {
    if error.is_cancelled() {
        return Ok(None);
    }
    let Some(value) = state.document.attribute(ctx.node, &vocab.on_error) else {
        return Ok(None);
    };
    let parsed = parse_content(value);
    log::debug!(
        "'on-error' at {} is suppressing: {}",
        state.describe(ctx.node),
        error
    );

    let mut error_ctx = ctx.clone();
    error_ctx.error = Some(error_value(error));
    let nodes = match replacement_nodes(state, &error_ctx, vocab, &parsed) {
        Ok(nodes) => nodes,
        Err(handling_error) => {
            log::error!(
                "'on-error' at {} failed while handling '{}': {}",
                state.describe(ctx.node),
                error,
                handling_error
            );
            return Err(RenderError::OnError {
                node: state.describe(ctx.node),
                original: error.to_string(),
                source: Box::new(handling_error),
            });
        }
    };

    if let Some(nodes) = nodes {
        let doc = &mut state.document;
        doc.clear_children(ctx.node);
        for node in nodes {
            doc.append_child(ctx.node, node)?;
        }
    }
    Ok(Some(ProcessingResult::without_children()))
}

/// `None` when the expression yields the cancel token.
fn replacement_nodes(
    state: &mut RenderState<'_>,
    ctx: &ExpressionContext,
    vocab: &Vocabulary,
    parsed: &ContentExpression,
) -> Result<Option<Vec<NodeId>>, RenderError> {
    let value = evaluate(state, ctx, &vocab.on_error, &parsed.expression)?;
    if value.is_default() {
        return Ok(None);
    }
    content_nodes(state, ctx.node, &value, parsed.structure).map(Some)
}

/// The value bound to `error`: a map with the error's `type` and message.
fn error_value(error: &RenderError) -> Value {
    let mut map = ValueMap::new();
    map.insert("type".to_string(), Value::from(error.kind()));
    map.insert("value".to_string(), Value::from(error.to_string()));
    Value::Map(map)
}

#[cfg(test)]
mod tests {
    use crate::error::RenderError;
    use crate::tal::test_support::render_tal;
    use serde_json::json;

    #[test]
    fn handler_replaces_its_subtree_and_siblings_render() {
        let out = render_tal(
            r#"<div tal:on-error="string:Error!"><p tal:content="here/missing"/></div><p tal:content="here/x"/>"#,
            json!({"x": "fine"}),
        )
        .unwrap();
        assert_eq!(out, "<div>Error!</div><p>fine</p>");
    }

    #[test]
    fn element_handles_its_own_errors() {
        let out = render_tal(
            r#"<p tal:content="here/missing" tal:on-error="string:oops">x</p>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<p>oops</p>");
    }

    #[test]
    fn innermost_handler_wins() {
        let out = render_tal(
            r#"<div tal:on-error="string:outer"><span tal:on-error="string:inner"><b tal:content="here/missing"/></span><i>ok</i></div>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<div><span>inner</span><i>ok</i></div>");
    }

    #[test]
    fn error_is_bound_while_handling() {
        let out = render_tal(
            r#"<div tal:on-error="error/type"><b tal:repeat="x here/n"/></div>"#,
            json!({"n": 3}),
        )
        .unwrap();
        assert_eq!(out, "<div>NotIterable</div>");
    }

    #[test]
    fn failing_handler_defers_to_outer_handler() {
        let out = render_tal(
            r#"<div tal:on-error="string:outer"><span tal:on-error="here/also/missing"><b tal:content="here/missing"/></span></div>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<div>outer</div>");
    }

    #[test]
    fn unhandled_errors_fail_the_render() {
        let err = render_tal(r#"<p tal:content="here/missing"/>"#, json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Evaluation { .. }));
    }
}
