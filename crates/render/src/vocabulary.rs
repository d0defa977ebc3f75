use crate::config::RenderingConfig;
use zpt_dom::{AttributeSpec, Document, NamespaceSpec, NodeId, QName};

/// The TAL and METAL attribute names, bound to the configured namespaces.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub tal: NamespaceSpec,
    pub metal: NamespaceSpec,

    pub define: AttributeSpec,
    pub condition: AttributeSpec,
    pub repeat: AttributeSpec,
    pub content: AttributeSpec,
    pub replace: AttributeSpec,
    pub attributes: AttributeSpec,
    pub omit_tag: AttributeSpec,
    pub on_error: AttributeSpec,

    pub define_macro: AttributeSpec,
    pub extend_macro: AttributeSpec,
    pub use_macro: AttributeSpec,
    pub define_slot: AttributeSpec,
    pub fill_slot: AttributeSpec,
}

impl Vocabulary {
    pub fn new(config: &RenderingConfig) -> Self {
        let tal = config.tal();
        let metal = config.metal();
        Self {
            define: tal.attribute("define"),
            condition: tal.attribute("condition"),
            repeat: tal.attribute("repeat"),
            content: tal.attribute("content"),
            replace: tal.attribute("replace"),
            attributes: tal.attribute("attributes"),
            omit_tag: tal.attribute("omit-tag"),
            on_error: tal.attribute("on-error"),
            define_macro: metal.attribute("define-macro"),
            extend_macro: metal.attribute("extend-macro"),
            use_macro: metal.attribute("use-macro"),
            define_slot: metal.attribute("define-slot"),
            fill_slot: metal.attribute("fill-slot"),
            tal,
            metal,
        }
    }

    /// Whether a name belongs to the TAL or METAL namespace.
    pub fn is_zpt_name(&self, name: &QName) -> bool {
        self.tal.matches(name) || self.metal.matches(name)
    }

    pub fn is_zpt_element(&self, doc: &Document, node: NodeId) -> bool {
        doc.element(node)
            .is_some_and(|element| self.is_zpt_name(&element.name))
    }

    pub fn is_zpt_uri(&self, uri: &str) -> bool {
        uri == self.tal.uri || uri == self.metal.uri
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(&RenderingConfig::default())
    }
}
