use super::syntax::{AttributeDefinition, parse_attribute_definition, split_clauses};
use super::{evaluate, invalid_attribute};
use crate::context::{ExpressionContext, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use zpt_dom::{NodeId, QName};
use zpt_tales::Value;

/// Sets, overwrites or removes attributes from `[prefix:]name expression`
/// clauses. `true` writes the attribute's own name as its value; `false` and
/// null remove it; the cancel token leaves it as written in the template.
pub(crate) fn handle_attributes(
    state: &mut RenderState<'_>,
    ctx: &mut ExpressionContext,
    vocab: &Vocabulary,
) -> Result<(), RenderError> {
    let Some(value) = state.document.attribute(ctx.node, &vocab.attributes) else {
        return Ok(());
    };
    for clause in split_clauses(value) {
        let definition = parse_attribute_definition(&clause).ok_or_else(|| {
            invalid_attribute(
                state,
                ctx.node,
                &vocab.attributes,
                format!("'{}' is not of the form '[prefix:]name expression'", clause),
            )
        })?;
        let result = evaluate(state, ctx, &vocab.attributes, &definition.expression)?;
        let name = attribute_name(state, ctx.node, &definition);
        let doc = &mut state.document;
        match result {
            Value::Default => {}
            Value::Null | Value::Bool(false) => {
                doc.remove_attribute_named(ctx.node, &name);
            }
            Value::Bool(true) => {
                doc.set_attribute(ctx.node, name, definition.qualified_name());
            }
            other => {
                doc.set_attribute(ctx.node, name, other.to_string());
            }
        }
    }
    Ok(())
}

fn attribute_name(state: &RenderState<'_>, node: NodeId, definition: &AttributeDefinition) -> QName {
    let Some(prefix) = definition.prefix.as_deref() else {
        return QName::local(definition.name.clone());
    };
    match state.document.lookup_namespace(node, Some(prefix)) {
        Some(uri) => QName::namespaced(uri, Some(prefix), definition.name.clone()),
        None => QName {
            namespace: None,
            prefix: Some(prefix.to_string()),
            local: definition.name.clone(),
        },
    }
}
