use crate::annotation::AnnotationStrategy;
use crate::cleanup::CleanupStrategy;
use crate::config::RenderingConfig;
use crate::context::{CancellationFlag, ContextStrategy, ExpressionContext, RenderState};
use crate::error::RenderError;
use crate::load::LoadExpressionEvaluator;
use crate::metal::MetalStrategy;
use crate::processor::ContextProcessor;
use crate::tal::TalStrategy;
use crate::vocabulary::Vocabulary;
use std::rc::Rc;
use std::sync::Arc;
use zpt_dom::{Document, SerializeOptions, parse_document};
use zpt_tales::{ExpressionEngine, ExpressionEvaluator, TemplateDirectory, TemplateDocument, Value};
use zpt_traits::ResourceProvider;

/// Renders template documents against host models.
///
/// A render copies the template's pristine document and runs four passes over
/// the copy: METAL expansion, TAL, source annotation when enabled, and
/// cleanup of the TAL/METAL vocabulary. Template documents are never
/// modified, so one template can be rendered any number of times.
pub struct Renderer {
    config: RenderingConfig,
    engine: ExpressionEngine,
    vocabulary: Arc<Vocabulary>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderingConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RenderingConfig) -> Self {
        let vocabulary = Arc::new(Vocabulary::new(&config));
        let engine = with_load(
            ExpressionEngine::new(config.default_expression_type.clone()),
            &vocabulary,
        );
        Self {
            config,
            engine,
            vocabulary,
        }
    }

    /// Registers an additional expression language under `prefix`.
    pub fn with_evaluator(mut self, prefix: impl Into<String>, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.engine.register(prefix, evaluator);
        self
    }

    /// Replaces the expression engine, for example to use a custom resolution
    /// chain. `load:` is registered on the new engine.
    pub fn with_engine(mut self, engine: ExpressionEngine) -> Self {
        self.engine = with_load(engine, &self.vocabulary);
        self
    }

    pub fn config(&self) -> &RenderingConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Wraps a parsed document as a template, indexing its macros.
    pub fn template(&self, document: Document) -> Arc<TemplateDocument> {
        Arc::new(TemplateDocument::new(
            Arc::new(document),
            &self.vocabulary.define_macro,
        ))
    }

    pub fn parse_template(&self, markup: &str, name: Option<&str>) -> Result<Arc<TemplateDocument>, RenderError> {
        Ok(self.template(parse_document(markup, name)?))
    }

    /// A directory of templates read through `provider`, rooted at its base.
    pub fn directory(&self, provider: Arc<dyn ResourceProvider>) -> TemplateDirectory {
        TemplateDirectory::new(provider, "", self.vocabulary.define_macro.clone())
    }

    fn passes(&self) -> Vec<(&'static str, Rc<dyn ContextStrategy>)> {
        let annotation = self.config.include_source_annotation.then(|| {
            AnnotationStrategy::new(Arc::clone(&self.vocabulary))
                .with_base_path(self.config.source_annotation_base_path.clone())
        });
        passes(&self.vocabulary, annotation)
    }

    /// Renders `template` against `model`, returning the rendered document.
    pub fn render(
        &self,
        template: &Arc<TemplateDocument>,
        model: &Value,
        cancellation: Option<CancellationFlag>,
    ) -> Result<Document, RenderError> {
        let document = Document::clone(template.document());
        let mut state = RenderState::new(document, model, &self.engine)
            .with_options(self.config.options())
            .with_template(Arc::clone(template))
            .with_cancellation(cancellation);

        for (name, strategy) in self.passes() {
            log::debug!("Running {} pass over {:?}", name, template.name());
            let root = ExpressionContext::new(state.document.root());
            ContextProcessor::new(strategy).process(&mut state, root)?;
        }
        Ok(state.document)
    }

    pub fn render_to_string(
        &self,
        template: &Arc<TemplateDocument>,
        model: &Value,
        cancellation: Option<CancellationFlag>,
    ) -> Result<String, RenderError> {
        let document = self.render(template, model, cancellation)?;
        let options = SerializeOptions::default().with_xml_declaration(!self.config.omit_xml_declaration);
        Ok(document.to_xml(&options)?)
    }

    /// Parses and renders a template held in memory.
    pub fn render_str(&self, markup: &str, model: &Value) -> Result<String, RenderError> {
        let template = self.parse_template(markup, None)?;
        self.render_to_string(&template, model, None)
    }

    /// Renders the template at `path` inside `directory`. The template sees
    /// the directory holding it as `container`.
    pub fn render_file(
        &self,
        directory: &TemplateDirectory,
        path: &str,
        model: &Value,
    ) -> Result<String, RenderError> {
        let template = directory.load_document(path)?;
        self.render_to_string(&template, model, None)
    }
}

fn with_load(mut engine: ExpressionEngine, vocabulary: &Arc<Vocabulary>) -> ExpressionEngine {
    engine.register("load", Arc::new(LoadExpressionEvaluator::new(Arc::clone(vocabulary))));
    engine
}

/// The passes of one render in order, with source annotation between TAL and
/// cleanup when given.
pub(crate) fn passes(
    vocabulary: &Arc<Vocabulary>,
    annotation: Option<AnnotationStrategy>,
) -> Vec<(&'static str, Rc<dyn ContextStrategy>)> {
    let mut passes: Vec<(&'static str, Rc<dyn ContextStrategy>)> = vec![
        ("metal", Rc::new(MetalStrategy::new(Arc::clone(vocabulary)))),
        ("tal", Rc::new(TalStrategy::new(Arc::clone(vocabulary)))),
    ];
    if let Some(annotation) = annotation {
        passes.push(("annotation", Rc::new(annotation)));
    }
    passes.push(("cleanup", Rc::new(CleanupStrategy::new(Arc::clone(vocabulary)))));
    passes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zpt_traits::InMemoryResourceProvider;

    const NS: &str = r#"xmlns:tal="http://xml.zope.org/namespaces/tal" xmlns:metal="http://xml.zope.org/namespaces/metal""#;

    #[test]
    fn renders_tal_and_strips_the_vocabulary() {
        let markup = format!(
            r#"<ul {NS}><li tal:repeat="item here/items" tal:content="item"/></ul>"#
        );
        let model = Value::from(json!({"items": ["a", "b"]}));
        let out = Renderer::default().render_str(&markup, &model).unwrap();
        assert_eq!(out, "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn template_documents_are_not_modified() {
        let renderer = Renderer::default();
        let template = renderer
            .parse_template(&format!(r#"<p {NS} tal:content="here/x"/>"#), Some("p.pt"))
            .unwrap();
        let first = renderer
            .render_to_string(&template, &Value::from(json!({"x": 1})), None)
            .unwrap();
        let second = renderer
            .render_to_string(&template, &Value::from(json!({"x": 2})), None)
            .unwrap();
        assert_eq!(first, "<p>1</p>");
        assert_eq!(second, "<p>2</p>");
    }

    #[test]
    fn options_and_xml_declaration_follow_config() {
        let config = RenderingConfig::builder()
            .with_keyword_option("title", "Hello")
            .with_xml_declaration(true)
            .build();
        let out = Renderer::new(config)
            .render_str(&format!(r#"<h1 {NS} tal:content="options/title"/>"#), &Value::Null)
            .unwrap();
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<h1>Hello</h1>");
    }

    #[test]
    fn macros_load_from_the_container() {
        let provider = InMemoryResourceProvider::new();
        provider
            .add(
                "shared/layout.pt",
                format!(r#"<html {NS} metal:define-macro="page"><body metal:define-slot="body">empty</body></html>"#),
            )
            .unwrap();
        provider
            .add(
                "index.pt",
                format!(
                    r#"<html {NS} metal:use-macro="container/shared/layout.pt/macros/page"><body metal:fill-slot="body"><p tal:content="here/msg"/></body></html>"#
                ),
            )
            .unwrap();
        let renderer = Renderer::default();
        let directory = renderer.directory(Arc::new(provider));
        let out = renderer
            .render_file(&directory, "index.pt", &Value::from(json!({"msg": "hi"})))
            .unwrap();
        assert_eq!(out, "<html><body><p>hi</p></body></html>");
    }

    #[test]
    fn cancelled_renders_fail() {
        let renderer = Renderer::default();
        let template = renderer.parse_template("<p/>", None).unwrap();
        let flag = CancellationFlag::new();
        flag.cancel();
        let err = renderer.render(&template, &Value::Null, Some(flag)).unwrap_err();
        assert!(err.is_cancelled());
    }
}
