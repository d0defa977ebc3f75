//! Walks parsed path expressions through the resolution chain.

use crate::ast::{AlternateExpression, PathExpression};
use crate::context::{EvaluationContext, RootScope};
use crate::error::TalesError;
use crate::resolver::{Host, ValueResolver};
use crate::value::Value;

/// Walks one alternate. The first part is resolved against the context
/// (honouring its root scope), each later part against the previous value.
pub fn walk_alternate(
    alternate: &AlternateExpression,
    ctx: &EvaluationContext<'_>,
    resolver: &ValueResolver,
) -> Result<Value, TalesError> {
    let mut parts = alternate.parts.iter();
    let Some(first) = parts.next() else {
        return Err(TalesError::not_found(alternate.to_string(), ""));
    };
    let mut current = resolver
        .resolve(&first.name, Host::Context(ctx))?
        .ok_or_else(|| TalesError::not_found(alternate.to_string(), &first.name))?;

    for part in parts {
        let segment = if part.interpolated {
            interpolate(alternate, &part.name, ctx, resolver)?
        } else {
            part.name.clone()
        };
        current = resolver
            .resolve(&segment, Host::Value(&current))?
            .ok_or_else(|| TalesError::not_found(alternate.to_string(), &segment))?;
    }
    Ok(current)
}

/// Resolves `?variable` to the literal segment it stands for.
fn interpolate(
    alternate: &AlternateExpression,
    variable: &str,
    ctx: &EvaluationContext<'_>,
    resolver: &ValueResolver,
) -> Result<String, TalesError> {
    let value = walk_alternate(&AlternateExpression::variable(variable), ctx, resolver)?;
    let segment = value.to_string();
    if value.is_null() || segment.is_empty() {
        return Err(TalesError::Interpolation {
            path: alternate.to_string(),
            variable: variable.to_string(),
        });
    }
    Ok(segment)
}

/// Tries each alternate in order against a view of `ctx` limited to
/// `root_scope`. Returns the first success, or one aggregate error carrying
/// every alternate's failure.
pub fn evaluate_path(
    expression: &PathExpression,
    ctx: &EvaluationContext<'_>,
    resolver: &ValueResolver,
    root_scope: RootScope,
) -> Result<Value, TalesError> {
    let mut causes = Vec::new();
    for alternate in &expression.alternates {
        let view = ctx.with_root_scope(root_scope);
        match walk_alternate(alternate, &view, resolver) {
            Ok(value) => return Ok(value),
            Err(e) => {
                log::trace!("Alternate '{}' failed: {}", alternate, e);
                causes.push(e);
            }
        }
    }
    Err(TalesError::AllAlternatesFailed {
        expression: expression.text.clone(),
        node: ctx.describe_node(),
        causes,
    })
}
