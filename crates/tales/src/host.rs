//! Host objects: caller types exposed to templates.
//!
//! A [`HostObject`] publishes a static table of readable members. Resolving a
//! member picks, in order, a property, then a zero-argument method, then a
//! field with the requested name. The chosen accessor is cached per
//! `(type, member)` for the life of the process, since member lookup runs for
//! nearly every path segment a template evaluates.

use crate::error::{HostFault, TalesError};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

/// Reads a member from a host object. Receives the object as `&dyn Any` so
/// member tables can be declared as plain `static` slices.
pub type Getter = fn(&dyn Any) -> Result<Value, HostFault>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Method,
    Field,
}

#[derive(Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    pub kind: MemberKind,
    pub getter: Getter,
}

impl Member {
    pub const fn property(name: &'static str, getter: Getter) -> Self {
        Self {
            name,
            kind: MemberKind::Property,
            getter,
        }
    }

    pub const fn method(name: &'static str, getter: Getter) -> Self {
        Self {
            name,
            kind: MemberKind::Method,
            getter,
        }
    }

    pub const fn field(name: &'static str, getter: Getter) -> Self {
        Self {
            name,
            kind: MemberKind::Field,
            getter,
        }
    }
}

/// A caller type whose members can be read by path expressions.
pub trait HostObject: Any + Send + Sync {
    /// The readable members of this type.
    fn members(&self) -> &'static [Member];

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Text used when the object itself is written into the output.
    fn display(&self) -> String {
        self.type_name().to_string()
    }

    /// String-keyed entries, consulted before members.
    fn get_key(&self, _key: &str) -> Option<Value> {
        None
    }

    /// Integer-keyed entries, consulted before members.
    fn get_int_key(&self, _key: i64) -> Option<Value> {
        None
    }

    /// Items when the object is used as a sequence.
    fn as_sequence(&self) -> Option<Vec<Value>> {
        None
    }
}

/// An object resolving member names at run time.
pub trait DynamicObject: Send + Sync {
    /// Returns `Ok(None)` when the object has no such member.
    fn try_get_member(&self, name: &str) -> Result<Option<Value>, HostFault>;

    fn display(&self) -> String {
        "dynamic object".to_string()
    }
}

type HostFn = dyn Fn(&Value) -> Result<Value, HostFault> + Send + Sync;

/// A host function of one argument, applied by `pipe:` expressions.
#[derive(Clone)]
pub struct Callable(Arc<HostFn>);

impl Callable {
    pub fn new(function: impl Fn(&Value) -> Result<Value, HostFault> + Send + Sync + 'static) -> Self {
        Callable(Arc::new(function))
    }

    pub fn call(&self, argument: &Value) -> Result<Value, HostFault> {
        (self.0)(argument)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable")
    }
}

type AccessorCache = HashMap<TypeId, HashMap<String, Option<Getter>>>;

static ACCESSOR_CACHE: LazyLock<RwLock<AccessorCache>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

fn find_accessor(members: &[Member], name: &str) -> Option<Getter> {
    [MemberKind::Property, MemberKind::Method, MemberKind::Field]
        .iter()
        .find_map(|kind| {
            members
                .iter()
                .find(|member| member.kind == *kind && member.name == name)
                .map(|member| member.getter)
        })
}

fn cached_accessor(object: &dyn HostObject, name: &str) -> Option<Getter> {
    let type_id = object.as_any().type_id();
    if let Ok(cache) = ACCESSOR_CACHE.read()
        && let Some(entry) = cache.get(&type_id).and_then(|members| members.get(name))
    {
        return *entry;
    }

    let accessor = find_accessor(object.members(), name);
    // Racing writers store the same accessor; last write wins.
    if let Ok(mut cache) = ACCESSOR_CACHE.write() {
        cache
            .entry(type_id)
            .or_default()
            .insert(name.to_string(), accessor);
    }
    accessor
}

/// Reads `name` from a host object, `Ok(None)` when it has no such member.
pub fn read_member(object: &dyn HostObject, name: &str) -> Result<Option<Value>, TalesError> {
    let Some(getter) = cached_accessor(object, name) else {
        return Ok(None);
    };
    getter(object.as_any())
        .map(Some)
        .map_err(|fault| TalesError::HostMember {
            type_name: object.type_name().to_string(),
            member: name.to_string(),
            fault,
        })
}

/// Number of cached `(type, member)` accessors.
pub fn cached_accessor_count() -> usize {
    ACCESSOR_CACHE
        .read()
        .map(|cache| cache.values().map(HashMap::len).sum())
        .unwrap_or(0)
}

/// Downcasts a getter's receiver, reporting a fault on type mismatch.
pub fn downcast<T: Any>(object: &dyn Any) -> Result<&T, HostFault> {
    object.downcast_ref::<T>().ok_or_else(|| {
        HostFault::new(format!(
            "accessor applied to a value that is not {}",
            std::any::type_name::<T>()
        ))
    })
}
