//! Zope Page Templates for Rust.
//!
//! Templates are XML documents annotated with TAL attributes (`tal:content`,
//! `tal:repeat`, ...) and METAL macros (`metal:use-macro`, `metal:fill-slot`,
//! ...). Attribute values are TALES expressions evaluated against a host
//! model, usually built from JSON:
//!
//! ```
//! let markup = r#"<ul xmlns:tal="http://xml.zope.org/namespaces/tal">
//!   <li tal:repeat="name here/names" tal:content="name"/>
//! </ul>"#;
//! let html = zpt::render_str(markup, &serde_json::json!({"names": ["Ada", "Grace"]}))?;
//! assert!(html.contains("<li>Ada</li>"));
//! # Ok::<(), zpt::RenderError>(())
//! ```
//!
//! For repeated rendering, build a [`Renderer`] once and parse templates with
//! [`Renderer::parse_template`] or load them from a [`TemplateDirectory`].

use std::path::Path;
use std::sync::Arc;

pub use zpt_dom::{Document, DomError, NodeId, QName, SerializeOptions, parse_document};
pub use zpt_render::{
    CancellationFlag, ContextProcessor, ContextStrategy, ExpressionContext, METAL_NAMESPACE,
    ProcessingResult, RenderError, RenderingConfig, RenderingConfigBuilder, Renderer,
    TAL_NAMESPACE,
};
pub use zpt_resource::{FilesystemResourceProvider, InMemoryResourceProvider};
pub use zpt_tales::{
    Callable, DynamicObject, EvaluationContext, ExpressionEngine, ExpressionEvaluator, HostObject, Member,
    MemberKind, TalesError, TemplateDirectory, TemplateDocument, Value, ValueMap, ValueResolver,
};
pub use zpt_traits::{ResourceError, ResourceProvider};

/// Renders a template held in memory against a JSON model with the default
/// configuration.
pub fn render_str(markup: &str, model: &serde_json::Value) -> Result<String, RenderError> {
    Renderer::default().render_str(markup, &Value::from(model.clone()))
}

/// Renders the template file at `path` against a JSON model. Other templates
/// in the same directory are reachable through `container`.
pub fn render_file(path: impl AsRef<Path>, model: &serde_json::Value) -> Result<String, RenderError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ResourceError::NotFound(path.display().to_string()))?;
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    log::debug!("Rendering '{}' from {}", name, base.display());

    let renderer = Renderer::default();
    let directory = renderer.directory(Arc::new(FilesystemResourceProvider::new(base)));
    renderer.render_file(&directory, name, &Value::from(model.clone()))
}
