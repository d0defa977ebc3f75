use crate::context::{ContextStrategy, ExpressionContext, HandlerFrame, ProcessingResult, RenderState};
use crate::error::RenderError;
use std::rc::Rc;
use zpt_dom::NodeId;

/// Walks the context tree in pre-order, running one strategy per element.
///
/// A context's children are processed, each to completion, before its
/// additional contexts. An element whose result asks to be unwrapped is
/// replaced by its children between the two, so the children still see the
/// element's error handler. Contexts whose node has been detached from the
/// document by the time they are reached are skipped.
pub struct ContextProcessor {
    strategy: Rc<dyn ContextStrategy>,
}

impl ContextProcessor {
    pub fn new(strategy: Rc<dyn ContextStrategy>) -> Self {
        Self { strategy }
    }

    pub fn process(&self, state: &mut RenderState<'_>, root: ExpressionContext) -> Result<(), RenderError> {
        let mut open = vec![Step::Visit(root)];
        while let Some(step) = open.pop() {
            let mut ctx = match step {
                Step::Visit(ctx) => ctx,
                Step::Unwrap(node) => {
                    if state.document.is_attached(node) {
                        let children = state.document.children(node).to_vec();
                        state.document.replace_with(node, &children)?;
                    }
                    continue;
                }
            };
            state.check_cancelled()?;
            if !state.document.is_attached(ctx.node) {
                log::trace!("Skipping detached node {:?}", ctx.node);
                continue;
            }

            let result = match self.strategy.process(state, &mut ctx) {
                Ok(result) => result,
                Err(error) => recover(state, &ctx, error)?,
            };

            let mut child_handlers = ctx.error_handlers.clone();
            if self.strategy.handles_errors() {
                child_handlers.push(HandlerFrame {
                    strategy: Rc::clone(&self.strategy),
                    context: Rc::new(ctx.clone()),
                });
            }

            open.extend(result.additional_contexts.into_iter().rev().map(Step::Visit));
            if result.unwrap {
                open.push(Step::Unwrap(ctx.node));
            }
            if result.process_children {
                let children: Vec<_> = state
                    .document
                    .children(ctx.node)
                    .iter()
                    .copied()
                    .filter(|&child| state.document.is_element(child))
                    .collect();
                for child in children.into_iter().rev() {
                    let mut child_ctx = ctx.create_child(child);
                    child_ctx.error_handlers = child_handlers.clone();
                    open.push(Step::Visit(child_ctx));
                }
            }
        }
        Ok(())
    }
}

enum Step {
    Visit(ExpressionContext),
    Unwrap(NodeId),
}

/// Offers `error` to the handlers registered above `ctx`, innermost first.
/// A handler that fails replaces the error it was given with its own.
fn recover(
    state: &mut RenderState<'_>,
    ctx: &ExpressionContext,
    mut error: RenderError,
) -> Result<ProcessingResult, RenderError> {
    if error.is_cancelled() {
        return Err(error);
    }
    for frame in ctx.error_handlers.iter().rev() {
        match frame.strategy.handle_error(state, &error, &frame.context) {
            Ok(Some(result)) => return Ok(result),
            Ok(None) => {}
            Err(handling_error) => {
                log::error!(
                    "Error handler at {} failed: {}",
                    state.describe(frame.context.node),
                    handling_error
                );
                error = handling_error;
            }
        }
    }
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancellationFlag;
    use std::cell::RefCell;
    use zpt_dom::{Document, NodeId, parse_document};
    use zpt_tales::{ExpressionEngine, Value};

    /// Records visit order; splits `<x>` elements into two extra siblings.
    #[derive(Default)]
    struct Recorder {
        visited: RefCell<Vec<String>>,
    }

    impl ContextStrategy for Recorder {
        fn process(
            &self,
            state: &mut RenderState<'_>,
            ctx: &mut ExpressionContext,
        ) -> Result<ProcessingResult, RenderError> {
            let Some(element) = state.document.element(ctx.node) else {
                return Ok(ProcessingResult::noop());
            };
            let name = element.name.local.clone();
            self.visited.borrow_mut().push(name.clone());
            if name == "x" {
                let doc = &mut state.document;
                let mut extra = Vec::new();
                for label in ["x1", "x2"] {
                    let node = doc.create_element(zpt_dom::QName::local(label));
                    doc.insert_before(ctx.node, node)?;
                    extra.push(ctx.create_child(node));
                }
                return Ok(ProcessingResult::noop().with_additional_contexts(extra));
            }
            Ok(ProcessingResult::noop())
        }
    }

    fn run(strategy: Rc<dyn ContextStrategy>, doc: Document) -> Result<Document, RenderError> {
        let model = Value::Null;
        let engine = ExpressionEngine::default();
        let mut state = RenderState::new(doc, &model, &engine);
        let root = ExpressionContext::new(state.document.root());
        ContextProcessor::new(strategy).process(&mut state, root)?;
        Ok(state.document)
    }

    #[test]
    fn children_before_additional_contexts() {
        let recorder = Rc::new(Recorder::default());
        let doc = parse_document("<r><x><c/></x><s/></r>", None).unwrap();
        run(recorder.clone(), doc).unwrap();
        assert_eq!(
            *recorder.visited.borrow(),
            vec!["r", "x", "c", "x1", "x2", "s"]
        );
    }

    struct Remover;

    impl ContextStrategy for Remover {
        fn process(
            &self,
            state: &mut RenderState<'_>,
            ctx: &mut ExpressionContext,
        ) -> Result<ProcessingResult, RenderError> {
            if let Some(element) = state.document.element(ctx.node)
                && element.name.local == "gone"
            {
                let next: Vec<NodeId> = state.document.children(ctx.node).to_vec();
                state.document.detach(ctx.node);
                let contexts = next.into_iter().map(|n| ctx.create_child(n)).collect();
                return Ok(ProcessingResult::without_children().with_additional_contexts(contexts));
            }
            if let Some(element) = state.document.element(ctx.node)
                && element.name.local == "fail"
            {
                return Err(RenderError::ContentAndReplace {
                    node: "fail".to_string(),
                });
            }
            Ok(ProcessingResult::noop())
        }
    }

    #[test]
    fn detached_contexts_are_skipped() {
        let doc = parse_document("<r><gone><fail/></gone></r>", None).unwrap();
        let out = run(Rc::new(Remover), doc).unwrap();
        assert_eq!(out.node_to_xml(out.root()).unwrap(), "<r/>");
    }

    struct Unwrapper;

    impl ContextStrategy for Unwrapper {
        fn process(
            &self,
            state: &mut RenderState<'_>,
            ctx: &mut ExpressionContext,
        ) -> Result<ProcessingResult, RenderError> {
            match state.document.element(ctx.node) {
                Some(element) if element.name.local == "w" => Ok(ProcessingResult::noop().unwrapping()),
                Some(element) if element.name.local == "fail" => Err(RenderError::ContentAndReplace {
                    node: "fail".to_string(),
                }),
                _ => Ok(ProcessingResult::noop()),
            }
        }

        fn handles_errors(&self) -> bool {
            true
        }

        fn handle_error(
            &self,
            state: &mut RenderState<'_>,
            _error: &RenderError,
            ctx: &ExpressionContext,
        ) -> Result<Option<ProcessingResult>, RenderError> {
            let doc = &mut state.document;
            doc.clear_children(ctx.node);
            let text = doc.create_text("handled");
            doc.append_child(ctx.node, text)?;
            Ok(Some(ProcessingResult::without_children()))
        }
    }

    #[test]
    fn unwrapped_elements_keep_handling_errors_of_their_children() {
        let doc = parse_document("<r><w>a<w><b/></w></w><w><fail/><c/></w></r>", None).unwrap();
        let out = run(Rc::new(Unwrapper), doc).unwrap();
        assert_eq!(out.node_to_xml(out.root()).unwrap(), "<r>a<b/>handled</r>");
    }

    #[test]
    fn unhandled_errors_abort_the_walk() {
        let doc = parse_document("<r><fail/></r>", None).unwrap();
        assert!(matches!(
            run(Rc::new(Remover), doc),
            Err(RenderError::ContentAndReplace { .. })
        ));
    }

    #[test]
    fn cancellation_stops_before_the_next_context() {
        let model = Value::Null;
        let engine = ExpressionEngine::default();
        let flag = CancellationFlag::new();
        flag.cancel();
        let doc = parse_document("<r/>", None).unwrap();
        let mut state = RenderState::new(doc, &model, &engine).with_cancellation(Some(flag));
        let root = ExpressionContext::new(state.document.root());
        let result = ContextProcessor::new(Rc::new(Remover)).process(&mut state, root);
        assert!(matches!(result, Err(RenderError::Cancelled)));
    }
}
