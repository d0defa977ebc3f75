//! Rendering of Zope Page Templates.
//!
//! A render walks the template's document tree once per pass through the
//! [`ContextProcessor`], each pass supplying a [`ContextStrategy`]:
//!
//! 1. [`MetalStrategy`] expands `use-macro`/`extend-macro` and fills slots;
//! 2. [`TalStrategy`] applies the TAL attribute rules;
//! 3. [`AnnotationStrategy`] adds source comments, when configured;
//! 4. [`CleanupStrategy`] removes what is left of the TAL/METAL vocabulary.
//!
//! [`Renderer`] wires the passes together from a [`RenderingConfig`] and
//! registers the `load:` expression type, which runs the same passes over a
//! nested template.

pub mod annotation;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod error;
pub mod load;
pub mod metal;
pub mod processor;
pub mod renderer;
pub mod tal;
pub mod vocabulary;

pub use annotation::AnnotationStrategy;
pub use cleanup::CleanupStrategy;
pub use config::{METAL_NAMESPACE, RenderingConfig, RenderingConfigBuilder, TAL_NAMESPACE};
pub use context::{
    CancellationFlag, ContextStrategy, ExpressionContext, HandlerFrame, ProcessingResult,
    RenderState,
};
pub use error::RenderError;
pub use load::{LoadExpressionEvaluator, MAX_LOAD_DEPTH};
pub use metal::{MAX_MACRO_DEPTH, MetalStrategy};
pub use processor::ContextProcessor;
pub use renderer::Renderer;
pub use tal::TalStrategy;
pub use vocabulary::Vocabulary;
