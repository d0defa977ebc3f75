//! Expression languages and the registry dispatching on `prefix:`.

use crate::context::{EvaluationContext, RootScope};
use crate::error::TalesError;
use crate::parser::parse_path_expression;
use crate::resolver::ValueResolver;
use crate::string_expr::evaluate_string_expression;
use crate::value::Value;
use crate::walker::evaluate_path;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

pub const PATH_PREFIX: &str = "path";

/// One expression language, registered under a prefix.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `body`, the expression text after `prefix:`.
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError>;
}

/// Path expressions, optionally limited to local or global variables at
/// the root.
pub struct PathExpressionEvaluator {
    root_scope: RootScope,
}

impl PathExpressionEvaluator {
    pub fn new(root_scope: RootScope) -> Self {
        Self { root_scope }
    }
}

impl ExpressionEvaluator for PathExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        let expression = parse_path_expression(body)?;
        evaluate_path(&expression, ctx, engine.resolver(), self.root_scope)
    }
}

/// `string:` expressions: literal text with `$name` and `${path}` placeholders.
pub struct StringExpressionEvaluator;

impl ExpressionEvaluator for StringExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        evaluate_string_expression(body, ctx, engine).map(Value::String)
    }
}

/// `not:` expressions: the boolean negation of another expression.
pub struct NotExpressionEvaluator;

impl ExpressionEvaluator for NotExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        let inner = engine.evaluate(body, ctx)?;
        Ok(Value::Bool(!inner.is_truthy()))
    }
}

/// `structure:` expressions: the result of another expression, inserted as
/// markup by `content`, `replace` and `on-error` without the `structure`
/// keyword.
pub struct StructureExpressionEvaluator;

impl ExpressionEvaluator for StructureExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        engine.evaluate(body, ctx).map(Value::structure)
    }
}

static PIPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*([a-zA-Z_][a-zA-Z0-9_]*)\s+(.+)$")
        .expect("BUG: invalid PIPE regex literal")
});

/// `pipe:` expressions: `pipe:value function` applies the function named by
/// the expression after the variable to the variable's value.
pub struct PipeExpressionEvaluator;

impl ExpressionEvaluator for PipeExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        let caps = PIPE
            .captures(body)
            .ok_or_else(|| TalesError::PipeSyntax(body.to_string()))?;
        let (source, target) = (&caps[1], caps[2].trim());
        let argument = engine.evaluate_with_prefix(PATH_PREFIX, source, ctx)?;
        match engine.evaluate(target, ctx)? {
            Value::Function(function) => {
                function
                    .call(&argument)
                    .map_err(|fault| TalesError::PipeFailed {
                        expression: target.to_string(),
                        fault,
                    })
            }
            other => Err(TalesError::NotCallable {
                expression: target.to_string(),
                type_name: other.type_name().to_string(),
            }),
        }
    }
}

/// Evaluates expression text in any registered language.
///
/// Text starting with `prefix:` selects the language named by the prefix;
/// anything else uses the default language.
pub struct ExpressionEngine {
    evaluators: HashMap<String, Arc<dyn ExpressionEvaluator>>,
    resolver: ValueResolver,
    default_prefix: String,
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        Self::new(PATH_PREFIX)
    }
}

impl ExpressionEngine {
    /// An engine with the standard languages: `path`, `local`, `global`,
    /// `defined`, `string`, `not`, `structure` and `pipe`.
    pub fn new(default_prefix: impl Into<String>) -> Self {
        let mut engine = Self {
            evaluators: HashMap::new(),
            resolver: ValueResolver::default(),
            default_prefix: default_prefix.into(),
        };
        engine.register(
            PATH_PREFIX,
            Arc::new(PathExpressionEvaluator::new(RootScope::Unrestricted)),
        );
        engine.register(
            "local",
            Arc::new(PathExpressionEvaluator::new(RootScope::LocalsOnly)),
        );
        engine.register(
            "global",
            Arc::new(PathExpressionEvaluator::new(RootScope::GlobalsOnly)),
        );
        engine.register(
            "defined",
            Arc::new(PathExpressionEvaluator::new(RootScope::DefinedOnly)),
        );
        engine.register("string", Arc::new(StringExpressionEvaluator));
        engine.register("not", Arc::new(NotExpressionEvaluator));
        engine.register("structure", Arc::new(StructureExpressionEvaluator));
        engine.register("pipe", Arc::new(PipeExpressionEvaluator));
        engine
    }

    pub fn with_resolver(mut self, resolver: ValueResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn register(&mut self, prefix: impl Into<String>, evaluator: Arc<dyn ExpressionEvaluator>) {
        self.evaluators.insert(prefix.into(), evaluator);
    }

    pub fn resolver(&self) -> &ValueResolver {
        &self.resolver
    }

    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    pub fn evaluate(&self, expression: &str, ctx: &EvaluationContext<'_>) -> Result<Value, TalesError> {
        let expression = expression.trim_start();
        let (prefix, body) = match split_prefix(expression) {
            Some((prefix, body)) => (prefix, body),
            None => (self.default_prefix.as_str(), expression),
        };
        self.evaluate_with_prefix(prefix, body, ctx)
    }

    pub fn evaluate_with_prefix(
        &self,
        prefix: &str,
        body: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Value, TalesError> {
        let evaluator = self
            .evaluators
            .get(prefix)
            .ok_or_else(|| TalesError::UnknownPrefix(prefix.to_string()))?;
        evaluator.evaluate(body, ctx, self)
    }
}

/// Splits `prefix:body` when the text before the first `:` is a valid
/// language name.
fn split_prefix(expression: &str) -> Option<(&str, &str)> {
    let (prefix, body) = expression.split_once(':')?;
    let mut chars = prefix.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some((prefix, body))
}
