//! Per-node evaluation state and the state shared by a whole render.

use crate::error::RenderError;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use zpt_dom::{Document, NodeId};
use zpt_tales::{
    Definitions, EvaluationContext, ExpressionEngine, RepetitionInfo, RootScope, TalesError,
    TemplateDocument, Value, ValueMap,
};

/// Signals an in-flight render to stop. Checked between contexts, never in
/// the middle of a tree mutation.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State shared by every context of one render pass: the document being
/// rewritten and the global definitions.
pub struct RenderState<'r> {
    pub document: Document,
    pub globals: Definitions,
    pub model: &'r Value,
    pub options: ValueMap,
    pub template: Option<Arc<TemplateDocument>>,
    pub engine: &'r ExpressionEngine,
    pub cancellation: Option<CancellationFlag>,
}

impl<'r> RenderState<'r> {
    pub fn new(document: Document, model: &'r Value, engine: &'r ExpressionEngine) -> Self {
        Self {
            document,
            globals: Definitions::new(),
            model,
            options: ValueMap::new(),
            template: None,
            engine,
            cancellation: None,
        }
    }

    pub fn with_options(mut self, options: ValueMap) -> Self {
        self.options = options;
        self
    }

    pub fn with_template(mut self, template: Arc<TemplateDocument>) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_cancellation(mut self, flag: Option<CancellationFlag>) -> Self {
        self.cancellation = flag;
        self
    }

    pub fn check_cancelled(&self) -> Result<(), RenderError> {
        match &self.cancellation {
            Some(flag) if flag.is_cancelled() => Err(RenderError::Cancelled),
            _ => Ok(()),
        }
    }

    /// A read-only view of the scopes visible at `ctx`.
    pub fn view<'a>(&'a self, ctx: &'a ExpressionContext) -> EvaluationContext<'a> {
        EvaluationContext {
            document: &self.document,
            node: ctx.node,
            model: self.model,
            locals: &ctx.locals,
            globals: &self.globals,
            repetitions: &ctx.repetitions,
            options: &self.options,
            template: self.template.as_ref(),
            error: ctx.error.as_ref(),
            root_scope: RootScope::Unrestricted,
        }
    }

    pub fn evaluate(&self, expression: &str, ctx: &ExpressionContext) -> Result<Value, TalesError> {
        self.engine.evaluate(expression, &self.view(ctx))
    }

    /// Describes a node for error messages.
    pub fn describe(&self, node: NodeId) -> String {
        let ctx = ExpressionContext::new(node);
        self.view(&ctx).describe_node()
    }
}

/// Handles failures raised beneath the element that registered it.
pub struct HandlerFrame {
    pub strategy: Rc<dyn ContextStrategy>,
    pub context: Rc<ExpressionContext>,
}

impl Clone for HandlerFrame {
    fn clone(&self) -> Self {
        Self {
            strategy: Rc::clone(&self.strategy),
            context: Rc::clone(&self.context),
        }
    }
}

/// The evaluation environment of one node.
///
/// Locals, repetitions and error handlers are copied into each child, so
/// changes made below a node never reach its siblings or ancestors. Globals
/// live in [`RenderState`] and are shared by the whole walk.
#[derive(Clone)]
pub struct ExpressionContext {
    pub node: NodeId,
    pub locals: Definitions,
    pub repetitions: HashMap<String, RepetitionInfo>,
    pub error_handlers: Vec<HandlerFrame>,
    /// The error being handled, bound only while `on-error` is evaluated.
    pub error: Option<Value>,
    /// Number of macro expansions enclosing this node.
    pub macro_depth: usize,
}

impl ExpressionContext {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            locals: Definitions::new(),
            repetitions: HashMap::new(),
            error_handlers: Vec::new(),
            error: None,
            macro_depth: 0,
        }
    }

    pub fn create_child(&self, node: NodeId) -> Self {
        Self {
            node,
            error: None,
            ..self.clone()
        }
    }
}

/// What the processor does after a strategy has handled a context.
pub struct ProcessingResult {
    pub process_children: bool,
    /// Contexts processed after the children, each as if it were a child.
    pub additional_contexts: Vec<ExpressionContext>,
    /// Replace the element by its children once they have been processed.
    pub unwrap: bool,
}

impl ProcessingResult {
    pub fn noop() -> Self {
        Self {
            process_children: true,
            additional_contexts: Vec::new(),
            unwrap: false,
        }
    }

    pub fn without_children() -> Self {
        Self {
            process_children: false,
            additional_contexts: Vec::new(),
            unwrap: false,
        }
    }

    pub fn with_additional_contexts(mut self, contexts: Vec<ExpressionContext>) -> Self {
        self.additional_contexts = contexts;
        self
    }

    pub fn unwrapping(mut self) -> Self {
        self.unwrap = true;
        self
    }
}

/// The per-node behaviour of one pass over the context tree.
pub trait ContextStrategy {
    fn process(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError>;

    /// Whether this strategy registers itself as an error handler for the
    /// descendants of every context it processes.
    fn handles_errors(&self) -> bool {
        false
    }

    /// Tries to recover from `error`, raised beneath `ctx`. `Ok(None)` means
    /// the error was not handled here.
    fn handle_error(
        &self,
        _state: &mut RenderState<'_>,
        _error: &RenderError,
        _ctx: &ExpressionContext,
    ) -> Result<Option<ProcessingResult>, RenderError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_copies_do_not_leak_upwards() {
        let doc = zpt_dom::parse_document("<a><b/></a>", None).unwrap();
        let a = doc.document_element().unwrap();
        let b = doc.children(a)[0];
        let mut parent = ExpressionContext::new(a);
        parent.locals.insert("x".to_string(), Value::Int(1));
        parent.error = Some(Value::from("boom"));

        let mut child = parent.create_child(b);
        child.locals.insert("y".to_string(), Value::Int(2));
        assert_eq!(child.locals["x"], Value::Int(1));
        assert!(child.error.is_none());
        assert!(!parent.locals.contains_key("y"));
    }

    #[test]
    fn cancellation_is_reported() {
        let doc = Document::new();
        let model = Value::Null;
        let engine = ExpressionEngine::default();
        let flag = CancellationFlag::new();
        let state = RenderState::new(doc, &model, &engine).with_cancellation(Some(flag.clone()));
        assert!(state.check_cancelled().is_ok());
        flag.cancel();
        assert!(matches!(state.check_cancelled(), Err(RenderError::Cancelled)));
    }
}
