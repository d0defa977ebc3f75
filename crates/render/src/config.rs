use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zpt_dom::NamespaceSpec;
use zpt_tales::{Value, ValueMap};

pub const TAL_NAMESPACE: &str = "http://xml.zope.org/namespaces/tal";
pub const METAL_NAMESPACE: &str = "http://xml.zope.org/namespaces/metal";

/// Settings for one [`crate::Renderer`].
///
/// Every field has a default, so a JSON document only needs to name the
/// settings it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Expression language used when an expression has no `prefix:`.
    pub default_expression_type: String,
    pub tal_namespace: String,
    pub metal_namespace: String,
    /// Prefix accepted for TAL attributes whose namespace is not declared.
    pub tal_prefix: String,
    pub metal_prefix: String,
    /// Insert comments naming the source document and line of key elements.
    pub include_source_annotation: bool,
    /// Stripped from the front of document names in source annotations.
    pub source_annotation_base_path: Option<String>,
    /// Exposed to templates as `options`.
    pub keyword_options: BTreeMap<String, serde_json::Value>,
    pub omit_xml_declaration: bool,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            default_expression_type: "path".to_string(),
            tal_namespace: TAL_NAMESPACE.to_string(),
            metal_namespace: METAL_NAMESPACE.to_string(),
            tal_prefix: "tal".to_string(),
            metal_prefix: "metal".to_string(),
            include_source_annotation: false,
            source_annotation_base_path: None,
            keyword_options: BTreeMap::new(),
            omit_xml_declaration: true,
        }
    }
}

impl RenderingConfig {
    pub fn builder() -> RenderingConfigBuilder {
        RenderingConfigBuilder::default()
    }

    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn tal(&self) -> NamespaceSpec {
        NamespaceSpec::new(&self.tal_namespace, &self.tal_prefix)
    }

    pub fn metal(&self) -> NamespaceSpec {
        NamespaceSpec::new(&self.metal_namespace, &self.metal_prefix)
    }

    /// The keyword options as template values.
    pub fn options(&self) -> ValueMap {
        self.keyword_options
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone())))
            .collect()
    }
}

/// Builds a [`RenderingConfig`], starting from the defaults.
#[derive(Debug, Clone, Default)]
pub struct RenderingConfigBuilder {
    config: RenderingConfig,
}

impl RenderingConfigBuilder {
    pub fn with_default_expression_type(mut self, prefix: impl Into<String>) -> Self {
        self.config.default_expression_type = prefix.into();
        self
    }

    pub fn with_tal_namespace(mut self, uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.config.tal_namespace = uri.into();
        self.config.tal_prefix = prefix.into();
        self
    }

    pub fn with_metal_namespace(mut self, uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.config.metal_namespace = uri.into();
        self.config.metal_prefix = prefix.into();
        self
    }

    pub fn with_source_annotation(mut self, enabled: bool) -> Self {
        self.config.include_source_annotation = enabled;
        self
    }

    pub fn with_source_annotation_base_path(mut self, base: impl Into<String>) -> Self {
        self.config.source_annotation_base_path = Some(base.into());
        self
    }

    pub fn with_keyword_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.keyword_options.insert(key.into(), value.into());
        self
    }

    pub fn with_xml_declaration(mut self, enabled: bool) -> Self {
        self.config.omit_xml_declaration = !enabled;
        self
    }

    pub fn build(self) -> RenderingConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_only_named_settings() {
        let config = RenderingConfig::from_json(
            r#"{"include_source_annotation": true, "keyword_options": {"lang": "en"}}"#,
        )
        .unwrap();
        assert!(config.include_source_annotation);
        assert_eq!(config.default_expression_type, "path");
        assert_eq!(config.tal_namespace, TAL_NAMESPACE);
        assert_eq!(config.options()["lang"], Value::from("en"));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(
            RenderingConfig::from_json("{not json"),
            Err(RenderError::Config(_))
        ));
    }

    #[test]
    fn builder_sets_fields() {
        let config = RenderingConfig::builder()
            .with_default_expression_type("string")
            .with_tal_namespace("urn:tal", "t")
            .with_keyword_option("debug", true)
            .with_xml_declaration(true)
            .build();
        assert_eq!(config.default_expression_type, "string");
        assert_eq!(config.tal().uri, "urn:tal");
        assert_eq!(config.tal().prefix, "t");
        assert_eq!(config.options()["debug"], Value::Bool(true));
        assert!(!config.omit_xml_declaration);
    }
}
