use super::syntax::{Scope, parse_definition, split_clauses};
use super::{evaluate, invalid_attribute};
use crate::context::{ExpressionContext, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;

/// Binds each `[local|global] name expression` clause in order, so later
/// clauses see earlier bindings. A null result unbinds the name in its
/// scope; the cancel token leaves the scope untouched.
pub(crate) fn handle_define(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
) -> Result<(), RenderError> {
    let Some(value) = state.document.attribute(ctx.node, &vocab.define) else {
        return Ok(());
    };
    for clause in split_clauses(value) {
        let definition = parse_definition(&clause).ok_or_else(|| {
            invalid_attribute(
                state,
                ctx.node,
                &vocab.define,
                format!("'{}' is not of the form '[local|global] name expression'", clause),
            )
        })?;
        let result = evaluate(state, ctx, &vocab.define, &definition.expression)?;
        if result.is_default() {
            continue;
        }
        let scope = match definition.scope {
            Scope::Local => &mut ctx.locals,
            Scope::Global => &mut state.globals,
        };
        if result.is_null() {
            scope.remove(&definition.name);
        } else {
            scope.insert(definition.name, result);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::tal::test_support::render_tal;
    use serde_json::json;

    #[test]
    fn later_clauses_see_earlier_bindings() {
        let out = render_tal(
            r#"<p tal:define="a here/x; b a" tal:content="b"/>"#,
            json!({"x": "X"}),
        )
        .unwrap();
        assert_eq!(out, "<p>X</p>");
    }

    #[test]
    fn locals_stay_in_subtree_globals_reach_later_siblings() {
        let out = render_tal(
            r#"<div tal:define="local a string:A; global b string:B"><i tal:content="a"/></div><p tal:content="b"/><q tal:content="a | nothing">x</q>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<div><i>A</i></div><p>B</p><q/>");
    }

    #[test]
    fn escaped_semicolons_stay_in_expressions() {
        let out = render_tal(
            r#"<p tal:define="msg string:one;; two" tal:content="msg"/>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<p>one; two</p>");
    }

    #[test]
    fn null_leaves_name_undefined() {
        let out = render_tal(
            r#"<p tal:define="x nothing" tal:content="x | default">undefined</p>"#,
            json!({}),
        )
        .unwrap();
        assert_eq!(out, "<p>undefined</p>");
    }

    #[test]
    fn malformed_clause_is_an_error() {
        assert!(render_tal(r#"<p tal:define="lonely"/>"#, json!({})).is_err());
    }
}
