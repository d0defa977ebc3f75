use crate::QName;

/// A namespace accepted for ZPT vocabulary: matched either by its URI or, for
/// names that carry no namespace, by its conventional prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    pub uri: String,
    pub prefix: String,
}

impl NamespaceSpec {
    pub fn new(uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, name: &QName) -> bool {
        match &name.namespace {
            Some(namespace) => *namespace == self.uri,
            None => name.prefix.as_deref() == Some(self.prefix.as_str()),
        }
    }

    pub fn attribute(&self, local: impl Into<String>) -> AttributeSpec {
        AttributeSpec::new(local).with_namespace(self.clone())
    }
}

/// Identifies an attribute by local name plus any of several namespace aliases.
///
/// An `AttributeSpec` with no namespaces matches only un-namespaced,
/// un-prefixed attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    pub local: String,
    pub namespaces: Vec<NamespaceSpec>,
}

impl AttributeSpec {
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            namespaces: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: NamespaceSpec) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn matches(&self, name: &QName) -> bool {
        if name.local != self.local {
            return false;
        }
        if self.namespaces.is_empty() {
            return name.namespace.is_none() && name.prefix.is_none();
        }
        self.namespaces.iter().any(|ns| ns.matches(name))
    }

    /// The canonical name used when this attribute is written to a node.
    pub fn qname(&self) -> QName {
        match self.namespaces.first() {
            Some(ns) => QName::namespaced(ns.uri.clone(), Some(&ns.prefix), self.local.clone()),
            None => QName::local(self.local.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAL: &str = "http://xml.zope.org/namespaces/tal";

    #[test]
    fn matches_by_uri_regardless_of_prefix() {
        let spec = NamespaceSpec::new(TAL, "tal").attribute("content");
        assert!(spec.matches(&QName::namespaced(TAL, Some("t"), "content")));
        assert!(!spec.matches(&QName::namespaced("urn:other", Some("tal"), "content")));
    }

    #[test]
    fn matches_conventional_prefix_without_namespace() {
        let spec = NamespaceSpec::new(TAL, "tal").attribute("define");
        let name = QName {
            namespace: None,
            prefix: Some("tal".to_string()),
            local: "define".to_string(),
        };
        assert!(spec.matches(&name));
        assert!(!spec.matches(&QName::local("define")));
    }

    #[test]
    fn plain_spec_matches_only_plain_names() {
        let spec = AttributeSpec::new("href");
        assert!(spec.matches(&QName::local("href")));
        assert!(!spec.matches(&QName::namespaced(TAL, Some("tal"), "href")));
    }

    #[test]
    fn qname_uses_first_alias() {
        let spec = NamespaceSpec::new(TAL, "tal")
            .attribute("repeat")
            .with_namespace(NamespaceSpec::new("urn:legacy", "z"));
        assert_eq!(spec.qname().qualified(), "tal:repeat");
        assert_eq!(spec.qname().namespace.as_deref(), Some(TAL));
    }
}
