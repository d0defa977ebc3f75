//! Template documents and template directories as seen from expressions.
//!
//! `template` evaluates to the [`TemplateDocument`] being rendered and
//! `container` to the [`TemplateDirectory`] holding it. Both expose macros
//! through ordinary path segments (`template/macros/page`,
//! `container/layout.pt/macros/page`).

use crate::error::TalesError;
use crate::value::{Value, ValueMap};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use zpt_dom::{AttributeSpec, Document, NodeId, parse_document};
use zpt_traits::{ResourceProvider, join_path};

/// A `define-macro` element inside an immutable template document.
///
/// Holds the document by `Arc`; users deep-copy the subtree into their own
/// document before changing it.
#[derive(Clone)]
pub struct MacroDefinition {
    pub name: String,
    pub document: Arc<Document>,
    pub node: NodeId,
}

impl fmt::Debug for MacroDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroDefinition")
            .field("name", &self.name)
            .field("document", &self.document.name())
            .field("node", &self.node)
            .finish()
    }
}

pub struct TemplateDocument {
    document: Arc<Document>,
    macros: BTreeMap<String, MacroDefinition>,
    container: Option<TemplateDirectory>,
}

impl TemplateDocument {
    /// Indexes every element carrying `define_macro`. When a name is defined
    /// twice the first definition in document order is kept.
    pub fn new(document: Arc<Document>, define_macro: &AttributeSpec) -> Self {
        let mut macros = BTreeMap::new();
        for node in document.descendants(document.root()) {
            let Some(name) = document.attribute(node, define_macro) else {
                continue;
            };
            let name = name.trim().to_string();
            if macros.contains_key(&name) {
                log::warn!(
                    "Macro '{}' is defined more than once in {:?}; keeping the first",
                    name,
                    document.name()
                );
                continue;
            }
            macros.insert(
                name.clone(),
                MacroDefinition {
                    name,
                    document: Arc::clone(&document),
                    node,
                },
            );
        }
        Self {
            document,
            macros,
            container: None,
        }
    }

    pub fn with_container(mut self, container: TemplateDirectory) -> Self {
        self.container = Some(container);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.document.name()
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn macros(&self) -> &BTreeMap<String, MacroDefinition> {
        &self.macros
    }

    pub fn container(&self) -> Option<&TemplateDirectory> {
        self.container.as_ref()
    }

    /// Named members: `macros` and `name`.
    pub fn try_get(&self, name: &str) -> Option<Value> {
        match name {
            "macros" => Some(Value::Map(
                self.macros
                    .iter()
                    .map(|(name, definition)| (name.clone(), Value::Macro(definition.clone())))
                    .collect::<ValueMap>(),
            )),
            "name" => Some(self.name().map(Value::from).unwrap_or_default()),
            _ => None,
        }
    }
}

impl fmt::Debug for TemplateDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDocument")
            .field("name", &self.name())
            .field("macros", &self.macros.keys().collect::<Vec<_>>())
            .finish()
    }
}

type DocumentCache = Arc<RwLock<HashMap<String, Arc<TemplateDocument>>>>;

/// How a directory reaches the shared document cache. The container stored
/// inside a cached document only holds it weakly, otherwise the cache would
/// own itself.
#[derive(Clone)]
enum CacheHandle {
    Owned(DocumentCache),
    Borrowed(Weak<RwLock<HashMap<String, Arc<TemplateDocument>>>>),
}

impl CacheHandle {
    fn get(&self) -> Option<DocumentCache> {
        match self {
            CacheHandle::Owned(cache) => Some(Arc::clone(cache)),
            CacheHandle::Borrowed(cache) => cache.upgrade(),
        }
    }
}

/// A directory of templates reachable through a [`ResourceProvider`].
///
/// Documents loaded through a directory are parsed once and shared by every
/// directory value derived from the same root, for as long as one of those
/// values is alive.
#[derive(Clone)]
pub struct TemplateDirectory {
    provider: Arc<dyn ResourceProvider>,
    path: String,
    define_macro: AttributeSpec,
    loaded: CacheHandle,
}

impl TemplateDirectory {
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        path: impl Into<String>,
        define_macro: AttributeSpec,
    ) -> Self {
        Self {
            provider,
            path: path.into(),
            define_macro,
            loaded: CacheHandle::Owned(Arc::new(RwLock::new(HashMap::new()))),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    fn child(&self, path: String) -> Self {
        let loaded = match self.loaded.get() {
            Some(cache) => CacheHandle::Owned(cache),
            None => self.loaded.clone(),
        };
        Self {
            provider: Arc::clone(&self.provider),
            path,
            define_macro: self.define_macro.clone(),
            loaded,
        }
    }

    fn container_for(&self, path: &str) -> Self {
        let parent = path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("");
        let loaded = match &self.loaded {
            CacheHandle::Owned(cache) => CacheHandle::Borrowed(Arc::downgrade(cache)),
            borrowed => borrowed.clone(),
        };
        Self {
            provider: Arc::clone(&self.provider),
            path: parent.to_string(),
            define_macro: self.define_macro.clone(),
            loaded,
        }
    }

    /// Resolves `name` to a subdirectory or a parsed template document.
    pub fn try_get(&self, name: &str) -> Result<Option<Value>, TalesError> {
        let path = join_path(&self.path, name);
        if self.provider.is_directory(&path) {
            return Ok(Some(Value::Directory(self.child(path))));
        }
        if !self.provider.exists(&path) {
            return Ok(None);
        }
        self.load_document(&path)
            .map(|document| Some(Value::Document(document)))
            .map_err(|e| TalesError::Template {
                path,
                source: Box::new(e),
            })
    }

    /// Loads and parses the template at `path`, relative to the provider root.
    pub fn load_document(&self, path: &str) -> Result<Arc<TemplateDocument>, TalesError> {
        let cache = self.loaded.get();
        if let Some(cache) = &cache
            && let Ok(loaded) = cache.read()
            && let Some(document) = loaded.get(path)
        {
            return Ok(Arc::clone(document));
        }

        let text = self.provider.load_text(path)?;
        let parsed = parse_document(&text, Some(path))?;
        let document = Arc::new(
            TemplateDocument::new(Arc::new(parsed), &self.define_macro)
                .with_container(self.container_for(path)),
        );
        log::debug!(
            "Loaded template '{}' with {} macro(s) via {}",
            path,
            document.macros().len(),
            self.provider.name()
        );
        if let Some(cache) = cache
            && let Ok(mut loaded) = cache.write()
        {
            loaded.insert(path.to_string(), Arc::clone(&document));
        }
        Ok(document)
    }
}

impl fmt::Debug for TemplateDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDirectory")
            .field("path", &self.path)
            .field("provider", &self.provider.name())
            .finish()
    }
}
