use crate::context::EvaluationContext;
use crate::error::TalesError;
use crate::evaluator::{ExpressionEngine, PATH_PREFIX};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([a-zA-Z0-9 /_.,~|?-]+)\}|\$([a-zA-Z0-9_/]+)")
        .expect("BUG: invalid PLACEHOLDER regex literal")
});

/// Expands `$$`, `$path` and `${path}` in `body`. Placeholders are path
/// expressions; a null result expands to nothing.
pub(crate) fn evaluate_string_expression(
    body: &str,
    ctx: &EvaluationContext<'_>,
    engine: &ExpressionEngine,
) -> Result<String, TalesError> {
    let mut out = String::with_capacity(body.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(body) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&body[last..whole.start()]);
        last = whole.end();

        let Some(path) = placeholder_path(&caps) else {
            out.push('$');
            continue;
        };
        let value = engine
            .evaluate_with_prefix(PATH_PREFIX, path, ctx)
            .map_err(|e| TalesError::StringExpression {
                expression: body.to_string(),
                message: e.to_string(),
            })?;
        if !value.is_null() {
            out.push_str(&value.to_string());
        }
    }
    out.push_str(&body[last..]);
    Ok(out)
}

fn placeholder_path<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}
