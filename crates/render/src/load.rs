//! The `load:` expression type: renders a template document, or one of its
//! macros, with the variables in scope and yields the output as markup.

use crate::context::{ExpressionContext, RenderState};
use crate::error::RenderError;
use crate::processor::ContextProcessor;
use crate::renderer::passes;
use crate::vocabulary::Vocabulary;
use std::cell::Cell;
use std::sync::Arc;
use zpt_dom::{Document, NodeKind};
use zpt_tales::{EvaluationContext, ExpressionEngine, ExpressionEvaluator, TalesError, Value};

/// Nested `load:` renders allowed on one thread.
pub const MAX_LOAD_DEPTH: usize = 16;

thread_local! {
    static LOAD_DEPTH: Cell<usize> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Option<Self> {
        LOAD_DEPTH.with(|depth| {
            if depth.get() >= MAX_LOAD_DEPTH {
                return None;
            }
            depth.set(depth.get() + 1);
            Some(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        LOAD_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Evaluates its body and renders the resulting template or macro. Null and
/// `default` pass through untouched; the markup comes back as a structure
/// value so `content`/`replace` insert it without escaping.
pub struct LoadExpressionEvaluator {
    vocabulary: Arc<Vocabulary>,
}

impl LoadExpressionEvaluator {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    fn render(&self, value: &Value, ctx: &EvaluationContext<'_>, engine: &ExpressionEngine) -> Result<String, RenderError> {
        let (document, template) = match value {
            Value::Document(template) => (Document::clone(template.document()), Some(Arc::clone(template))),
            Value::Macro(definition) => {
                let mut document = Document::new();
                let root = document.root();
                let copy = document.import_subtree(&definition.document, definition.node);
                document.append_child(root, copy)?;
                (document, ctx.template.cloned())
            }
            other => {
                return Err(RenderError::Tales(TalesError::NotLoadable {
                    expression: String::new(),
                    type_name: other.type_name().to_string(),
                }));
            }
        };

        let mut state = RenderState::new(document, ctx.model, engine).with_options(ctx.options.clone());
        state.template = template;
        state.globals = ctx.globals.clone();
        for (name, strategy) in passes(&self.vocabulary, None) {
            log::trace!("Running {} pass of a loaded template", name);
            let mut root = ExpressionContext::new(state.document.root());
            root.locals = ctx.locals.clone();
            root.repetitions = ctx.repetitions.clone();
            ContextProcessor::new(strategy).process(&mut state, root)?;
        }

        let document = &state.document;
        let mut markup = String::new();
        for &child in document.children(document.root()) {
            if !matches!(document.kind(child), NodeKind::DocumentType(_)) {
                markup.push_str(&document.node_to_xml(child)?);
            }
        }
        Ok(markup)
    }
}

impl ExpressionEvaluator for LoadExpressionEvaluator {
    fn evaluate(
        &self,
        body: &str,
        ctx: &EvaluationContext<'_>,
        engine: &ExpressionEngine,
    ) -> Result<Value, TalesError> {
        let expression = body.trim();
        let value = engine.evaluate(expression, ctx)?;
        match value {
            Value::Null | Value::Default => return Ok(value),
            Value::Document(_) | Value::Macro(_) => {}
            other => {
                return Err(TalesError::NotLoadable {
                    expression: expression.to_string(),
                    type_name: other.type_name().to_string(),
                });
            }
        }

        let failed = |source: RenderError| TalesError::Load {
            expression: expression.to_string(),
            source: Box::new(source),
        };
        let Some(_guard) = DepthGuard::enter() else {
            return Err(failed(RenderError::MacroDepth {
                node: ctx.describe_node(),
                limit: MAX_LOAD_DEPTH,
            }));
        };
        let markup = self.render(&value, ctx, engine).map_err(failed)?;
        Ok(Value::structure(Value::String(markup)))
    }
}
