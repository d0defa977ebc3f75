//! The METAL pass: macro use, macro extension and slot filling.
//!
//! An element carrying `use-macro` or `extend-macro` is replaced by a copy of
//! the macro it names. Before the copy goes into the document, its
//! `define-slot` elements are replaced by the caller's `fill-slot` elements.
//! A macro that itself extends another macro contributes its own fillers to
//! the base macro, each one overridden by a caller filler of the same name.
//!
//! The expanded macro is then processed like any other element, so macro
//! calls inside it are expanded in turn.

mod slots;

use crate::context::{ContextStrategy, ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::sync::Arc;
use zpt_dom::NodeId;
use zpt_tales::{MacroDefinition, Value};

/// Nesting limit for macro expansion; self-referencing macros hit it.
pub const MAX_MACRO_DEPTH: usize = 64;

pub struct MetalStrategy {
    vocabulary: Arc<Vocabulary>,
    max_depth: usize,
}

impl MetalStrategy {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            max_depth: MAX_MACRO_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The attribute naming the macro `node` calls, if any. `use-macro` wins
    /// over `extend-macro`.
    fn macro_reference(&self, state: &RenderState<'_>, node: NodeId) -> Option<String> {
        let vocab = &*self.vocabulary;
        [&vocab.use_macro, &vocab.extend_macro]
            .into_iter()
            .find_map(|spec| state.document.attribute(node, spec))
            .map(|expression| expression.trim().to_string())
    }

    /// Evaluates a macro reference found on `node` in the scope of `ctx`.
    fn load_macro(
        &self,
        state: &RenderState<'_>,
        ctx: &ExpressionContext,
        node: NodeId,
        expression: &str,
    ) -> Result<MacroDefinition, RenderError> {
        match state.evaluate(expression, ctx) {
            Ok(Value::Macro(definition)) => Ok(definition),
            Ok(Value::Null) => Err(RenderError::MacroNotFound {
                expression: expression.to_string(),
                node: state.describe(node),
                source: None,
            }),
            Ok(other) => Err(RenderError::NotAMacro {
                expression: expression.to_string(),
                node: state.describe(node),
                type_name: other.type_name().to_string(),
            }),
            Err(source) => Err(RenderError::MacroNotFound {
                expression: expression.to_string(),
                node: state.describe(node),
                source: Some(source),
            }),
        }
    }

    /// Builds the fully expanded replacement for `caller`, detached from the
    /// document, along with the definition it was finally copied from.
    fn expand(
        &self,
        state: &mut RenderState<'_>,
        ctx: &ExpressionContext,
        expression: &str,
    ) -> Result<(NodeId, MacroDefinition), RenderError> {
        let vocab = &*self.vocabulary;
        let caller = ctx.node;
        let mut definition = self.load_macro(state, ctx, caller, expression)?;
        log::trace!(
            "Expanding macro '{}' at {}",
            definition.name,
            state.describe(caller)
        );

        let doc = &mut state.document;
        let mut current = doc.import_subtree(&definition.document, definition.node);
        let mut fillers = slots::collect_fillers(doc, caller, vocab);
        slots::fill_slots(doc, current, &mut fillers, vocab)?;

        let mut layers = 0;
        while let Some(base_expression) = state
            .document
            .attribute(current, &vocab.extend_macro)
            .map(|e| e.trim().to_string())
        {
            layers += 1;
            if layers > self.max_depth {
                return Err(RenderError::MacroDepth {
                    node: state.describe(caller),
                    limit: self.max_depth,
                });
            }
            let base = self.load_macro(state, ctx, current, &base_expression)?;
            log::trace!("Macro '{}' extends '{}'", definition.name, base.name);

            let doc = &mut state.document;
            let base_copy = doc.import_subtree(&base.document, base.node);
            for (name, filler) in slots::collect_fillers(doc, current, vocab) {
                fillers.entry(name).or_insert(filler);
            }
            slots::fill_slots(doc, base_copy, &mut fillers, vocab)?;
            current = base_copy;
            definition = base;
        }
        Ok((current, definition))
    }

    /// Redeclares the namespaces in scope at the macro's definition that the
    /// copy's new position does not already bind.
    fn carry_namespaces(state: &mut RenderState<'_>, node: NodeId, definition: &MacroDefinition) {
        let missing: Vec<_> = definition
            .document
            .in_scope_namespaces(definition.node)
            .into_iter()
            .filter(|ns| {
                state.document.lookup_namespace(node, ns.prefix.as_deref()).as_deref()
                    != Some(ns.uri.as_str())
            })
            .collect();
        if let Some(element) = state.document.element_mut(node) {
            element.namespaces.extend(missing);
        }
    }
}

impl ContextStrategy for MetalStrategy {
    fn process(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError> {
        if !state.document.is_element(ctx.node) {
            return Ok(ProcessingResult::noop());
        }
        let Some(expression) = self.macro_reference(state, ctx.node) else {
            return Ok(ProcessingResult::noop());
        };
        if ctx.macro_depth >= self.max_depth {
            return Err(RenderError::MacroDepth {
                node: state.describe(ctx.node),
                limit: self.max_depth,
            });
        }

        let (expanded, definition) = self.expand(state, ctx, &expression)?;
        state.document.replace_with(ctx.node, &[expanded])?;
        Self::carry_namespaces(state, expanded, &definition);

        ctx.node = expanded;
        ctx.macro_depth += 1;
        Ok(ProcessingResult::noop())
    }
}
