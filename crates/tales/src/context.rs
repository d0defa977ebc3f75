use crate::repetition::RepetitionInfo;
use crate::template::TemplateDocument;
use crate::value::{Value, ValueMap};
use std::collections::HashMap;
use std::sync::Arc;
use zpt_dom::{Document, NodeId};

/// Variable bindings: `define`d names and repeat loop variables.
pub type Definitions = HashMap<String, Value>;

/// Restricts where the first segment of a path is looked up. Later segments
/// are never restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootScope {
    /// Builtins, local and global variables, then the model.
    #[default]
    Unrestricted,
    LocalsOnly,
    GlobalsOnly,
    /// Local, then global variables; builtins and the model are hidden.
    DefinedOnly,
}

/// A read-only view of everything an expression can see at one node.
///
/// The renderer owns the scopes; this view borrows them for the duration of
/// one evaluation.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub document: &'a Document,
    pub node: NodeId,
    pub model: &'a Value,
    pub locals: &'a Definitions,
    pub globals: &'a Definitions,
    pub repetitions: &'a HashMap<String, RepetitionInfo>,
    pub options: &'a ValueMap,
    pub template: Option<&'a Arc<TemplateDocument>>,
    /// Bound while an `on-error` statement is evaluated.
    pub error: Option<&'a Value>,
    pub root_scope: RootScope,
}

impl<'a> EvaluationContext<'a> {
    pub fn with_root_scope(self, root_scope: RootScope) -> Self {
        Self { root_scope, ..self }
    }

    /// The current element's attributes keyed by qualified name.
    pub fn attributes(&self) -> ValueMap {
        self.document
            .element(self.node)
            .map(|element| {
                element
                    .attributes
                    .iter()
                    .map(|attr| (attr.name.qualified(), Value::from(attr.value.as_str())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks up one of the builtin names (`here`, `repeat`, `options`, ...).
    pub fn builtin(&self, name: &str) -> Option<Value> {
        let value = match name {
            "here" => self.model.clone(),
            "repeat" => Value::Map(
                self.repetitions
                    .iter()
                    .map(|(name, info)| (name.clone(), Value::Repetition(info.clone())))
                    .collect(),
            ),
            "options" => Value::Map(self.options.clone()),
            "nothing" => Value::Null,
            "default" => Value::Default,
            "attrs" => Value::Map(self.attributes()),
            "template" => self
                .template
                .map(|template| Value::Document(Arc::clone(template)))
                .unwrap_or_default(),
            "container" => self
                .template
                .and_then(|template| template.container())
                .map(|directory| Value::Directory(directory.clone()))
                .unwrap_or_default(),
            "error" => self.error?.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// All builtins as a map, the value of `context`.
    pub fn builtins(&self) -> ValueMap {
        [
            "here",
            "repeat",
            "options",
            "nothing",
            "default",
            "attrs",
            "template",
            "container",
            "error",
        ]
        .into_iter()
        .filter_map(|name| self.builtin(name).map(|value| (name.to_string(), value)))
        .collect()
    }

    /// A short description of the current node for error messages.
    pub fn describe_node(&self) -> String {
        let name = match self.document.element(self.node) {
            Some(element) => format!("<{}>", element.name.qualified()),
            None => format!("node {}", self.node.index()),
        };
        match self.document.source(self.node) {
            Some(source) => format!("{} in {}", name, source),
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zpt_dom::parse_document;

    #[test]
    fn builtins_reflect_scopes() {
        let doc = parse_document(r#"<p class="x" id="y"/>"#, Some("t.pt")).unwrap();
        let node = doc.document_element().unwrap();
        let model = Value::from("model");
        let (locals, globals, repetitions) = (Definitions::new(), Definitions::new(), HashMap::new());
        let mut options = ValueMap::new();
        options.insert("mode".to_string(), Value::from("fast"));
        let ctx = EvaluationContext {
            document: &doc,
            node,
            model: &model,
            locals: &locals,
            globals: &globals,
            repetitions: &repetitions,
            options: &options,
            template: None,
            error: None,
            root_scope: RootScope::Unrestricted,
        };

        assert_eq!(ctx.builtin("here"), Some(Value::from("model")));
        assert_eq!(ctx.builtin("nothing"), Some(Value::Null));
        assert_eq!(ctx.builtin("default"), Some(Value::Default));
        assert_eq!(ctx.builtin("template"), Some(Value::Null));
        assert_eq!(ctx.builtin("error"), None);
        assert_eq!(ctx.builtin("unknown"), None);

        let Some(Value::Map(attrs)) = ctx.builtin("attrs") else {
            panic!("expected attrs map");
        };
        assert_eq!(attrs["class"], Value::from("x"));
        assert_eq!(attrs.len(), 2);

        let Some(Value::Map(opts)) = ctx.builtin("options") else {
            panic!("expected options map");
        };
        assert_eq!(opts["mode"], Value::from("fast"));

        assert!(!ctx.builtins().contains_key("error"));
        assert!(ctx.describe_node().starts_with("<p> in t.pt (line 1"));
    }
}
