//! The values produced and consumed by TALES expressions.

use crate::error::HostFault;
use crate::host::{Callable, DynamicObject, HostObject};
use crate::repetition::RepetitionInfo;
use crate::template::{MacroDefinition, TemplateDirectory, TemplateDocument};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type ValueMap = BTreeMap<String, Value>;

/// A value in the data model seen by templates.
///
/// Plain data (`Null` through `IntMap`) is owned; host objects, dynamic
/// objects and template artefacts are shared behind `Arc`s so values clone
/// cheaply as they move between scopes.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    /// The cancel token (`default`): leave the target of the statement unchanged.
    Default,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(ValueMap),
    IntMap(BTreeMap<i64, Value>),
    Object(Arc<dyn HostObject>),
    Dynamic(Arc<dyn DynamicObject>),
    Directory(TemplateDirectory),
    Document(Arc<TemplateDocument>),
    Macro(MacroDefinition),
    Repetition(RepetitionInfo),
    /// A value inserted as markup rather than escaped text (`structure:`).
    Structure(Box<Value>),
    Function(Callable),
}

impl Value {
    pub fn object<T: HostObject>(object: T) -> Self {
        Value::Object(Arc::new(object))
    }

    pub fn dynamic<T: DynamicObject + 'static>(object: T) -> Self {
        Value::Dynamic(Arc::new(object))
    }

    pub fn function(
        function: impl Fn(&Value) -> Result<Value, HostFault> + Send + Sync + 'static,
    ) -> Self {
        Value::Function(Callable::new(function))
    }

    /// Marks a value for insertion as markup. Null and the cancel token keep
    /// their meaning and are returned unchanged.
    pub fn structure(value: Value) -> Self {
        match value {
            Value::Null | Value::Default | Value::Structure(_) => value,
            other => Value::Structure(Box::new(other)),
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Value::Structure(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Value::Default)
    }

    /// TALES truthiness: `null`, `false`, zero and the empty string are false.
    /// Everything else, including the cancel token, is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Structure(inner) => inner.is_truthy(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The items of a value usable as a `repeat` source.
    pub fn as_sequence(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items.clone()),
            Value::IntMap(map) => Some(map.values().cloned().collect()),
            Value::Map(map) => Some(map.values().cloned().collect()),
            Value::Object(object) => object.as_sequence(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Default => "default",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::IntMap(_) => "integer-keyed map",
            Value::Object(object) => object.type_name(),
            Value::Dynamic(_) => "dynamic object",
            Value::Directory(_) => "template directory",
            Value::Document(_) => "template document",
            Value::Macro(_) => "macro",
            Value::Repetition(_) => "repetition",
            Value::Structure(_) => "structure",
            Value::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Default => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => write_map(f, map.iter()),
            Value::IntMap(map) => write_map(f, map.iter()),
            Value::Object(object) => f.write_str(&object.display()),
            Value::Dynamic(object) => f.write_str(&object.display()),
            Value::Directory(directory) => f.write_str(directory.path()),
            Value::Document(document) => f.write_str(document.name().unwrap_or("template")),
            Value::Macro(definition) => write!(f, "macro '{}'", definition.name),
            Value::Repetition(info) => write!(f, "repetition '{}' {}/{}", info.name, info.number(), info.length()),
            Value::Structure(inner) => write!(f, "{}", inner),
            Value::Function(_) => f.write_str("function"),
        }
    }
}

fn write_map<'a, K: fmt::Display + 'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a K, &'a Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", key, value)?;
    }
    f.write_str("}")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Default => f.write_str("Default"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Value::IntMap(map) => f.debug_tuple("IntMap").field(map).finish(),
            Value::Object(object) => write!(f, "Object({})", object.type_name()),
            Value::Dynamic(object) => write!(f, "Dynamic({})", object.display()),
            Value::Directory(directory) => write!(f, "Directory({:?})", directory.path()),
            Value::Document(document) => write!(f, "Document({:?})", document.name()),
            Value::Macro(definition) => write!(f, "Macro({:?})", definition.name),
            Value::Repetition(info) => write!(f, "Repetition({:?}, {})", info.name, info.index),
            Value::Structure(inner) => f.debug_tuple("Structure").field(inner).finish(),
            Value::Function(_) => f.write_str("Function"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Default, Value::Default) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::IntMap(a), Value::IntMap(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Dynamic(a), Value::Dynamic(b)) => Arc::ptr_eq(a, b),
            (Value::Document(a), Value::Document(b)) => Arc::ptr_eq(a, b),
            (Value::Macro(a), Value::Macro(b)) => {
                Arc::ptr_eq(&a.document, &b.document) && a.node == b.node
            }
            (Value::Structure(a), Value::Structure(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
