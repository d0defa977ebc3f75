//! The final pass: strips the TAL and METAL vocabulary from the output.

use crate::context::{ContextStrategy, ExpressionContext, ProcessingResult, RenderState};
use crate::error::RenderError;
use crate::vocabulary::Vocabulary;
use std::sync::Arc;

/// Omits elements in the TAL or METAL namespace, keeping their children, and
/// removes TAL and METAL attributes and namespace declarations everywhere
/// else.
pub struct CleanupStrategy {
    vocabulary: Arc<Vocabulary>,
}

impl CleanupStrategy {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }
}

impl ContextStrategy for CleanupStrategy {
    fn process(
        &self,
        state: &mut RenderState<'_>,
        ctx: &mut ExpressionContext,
    ) -> Result<ProcessingResult, RenderError> {
        let vocab = &*self.vocabulary;
        if vocab.is_zpt_element(&state.document, ctx.node) {
            return Ok(ProcessingResult::noop().unwrapping());
        }

        if let Some(element) = state.document.element_mut(ctx.node) {
            element.attributes.retain(|attr| !vocab.is_zpt_name(&attr.name));
            element.namespaces.retain(|ns| !vocab.is_zpt_uri(&ns.uri));
        }
        Ok(ProcessingResult::noop())
    }
}
