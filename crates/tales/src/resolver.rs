//! The value resolution chain: `(name, host) → value`.
//!
//! A fixed, ordered list of strategies. The first strategy that finds the
//! name wins; a strategy that does not apply to the host, or applies but does
//! not find the name, passes to the next one. "Not found" is `Ok(None)`,
//! errors are reserved for genuine host faults.
//!
//! | # | Strategy | Host |
//! |---|---|---|
//! | 1 | [`ContextStrategy`] | the expression context |
//! | 2 | [`TemplateDirectoryStrategy`] | a template directory |
//! | 3 | [`NamedValueStrategy`] | repetition info, template documents |
//! | 4 | [`StringKeyedStrategy`] | string-keyed maps |
//! | 5 | [`IntegerKeyedStrategy`] | integer-keyed maps |
//! | 6 | [`DynamicObjectStrategy`] | dynamic objects |
//! | 7 | [`SequenceStrategy`] | sequences |
//! | 8 | [`HostObjectStrategy`] | host objects with a member table |

use crate::context::{EvaluationContext, RootScope};
use crate::error::TalesError;
use crate::host::read_member;
use crate::value::Value;

/// What a name is being looked up in.
#[derive(Clone, Copy)]
pub enum Host<'h, 'a> {
    /// The root of a path: variables, builtins, then the model.
    Context(&'h EvaluationContext<'a>),
    Value(&'h Value),
}

pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `chain` is the full resolver, for strategies that redirect the lookup
    /// to another host.
    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError>;
}

pub struct ValueResolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(ContextStrategy),
                Box::new(TemplateDirectoryStrategy),
                Box::new(NamedValueStrategy),
                Box::new(StringKeyedStrategy),
                Box::new(IntegerKeyedStrategy),
                Box::new(DynamicObjectStrategy),
                Box::new(SequenceStrategy),
                Box::new(HostObjectStrategy),
            ],
        }
    }
}

impl ValueResolver {
    /// Appends a strategy after the standard ones.
    pub fn with_strategy(mut self, strategy: Box<dyn ResolutionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, name: &str, host: Host<'_, '_>) -> Result<Option<Value>, TalesError> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.try_get(name, host, self)? {
                log::trace!("Resolved '{}' via {}", name, strategy.name());
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Variables and builtins at the root of a path. `context` comes first, then
/// local and global variables, then the other builtins, so variables shadow
/// builtins and the model. Unresolved names fall through to the model when
/// the root scope is unrestricted.
pub struct ContextStrategy;

impl ResolutionStrategy for ContextStrategy {
    fn name(&self) -> &'static str {
        "context"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        let Host::Context(ctx) = host else {
            return Ok(None);
        };
        match ctx.root_scope {
            RootScope::LocalsOnly => Ok(ctx.locals.get(name).cloned()),
            RootScope::GlobalsOnly => Ok(ctx.globals.get(name).cloned()),
            RootScope::DefinedOnly => Ok(ctx
                .locals
                .get(name)
                .or_else(|| ctx.globals.get(name))
                .cloned()),
            RootScope::Unrestricted => {
                if name == "context" {
                    return Ok(Some(Value::Map(ctx.builtins())));
                }
                if let Some(value) = ctx.locals.get(name).or_else(|| ctx.globals.get(name)) {
                    return Ok(Some(value.clone()));
                }
                if let Some(value) = ctx.builtin(name) {
                    return Ok(Some(value));
                }
                chain.resolve(name, Host::Value(ctx.model))
            }
        }
    }
}

pub struct TemplateDirectoryStrategy;

impl ResolutionStrategy for TemplateDirectoryStrategy {
    fn name(&self) -> &'static str {
        "template-directory"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        match host {
            Host::Value(Value::Directory(directory)) => directory.try_get(name),
            _ => Ok(None),
        }
    }
}

/// Values that publish a fixed set of named members.
pub struct NamedValueStrategy;

impl ResolutionStrategy for NamedValueStrategy {
    fn name(&self) -> &'static str {
        "named-value"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        Ok(match host {
            Host::Value(Value::Repetition(info)) => info.try_get(name),
            Host::Value(Value::Document(document)) => document.try_get(name),
            _ => None,
        })
    }
}

pub struct StringKeyedStrategy;

impl ResolutionStrategy for StringKeyedStrategy {
    fn name(&self) -> &'static str {
        "string-keyed-map"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        Ok(match host {
            Host::Value(Value::Map(map)) => map.get(name).cloned(),
            Host::Value(Value::Object(object)) => object.get_key(name),
            _ => None,
        })
    }
}

pub struct IntegerKeyedStrategy;

impl ResolutionStrategy for IntegerKeyedStrategy {
    fn name(&self) -> &'static str {
        "integer-keyed-map"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        let Ok(key) = name.parse::<i64>() else {
            return Ok(None);
        };
        Ok(match host {
            Host::Value(Value::IntMap(map)) => map.get(&key).cloned(),
            Host::Value(Value::Object(object)) => object.get_int_key(key),
            _ => None,
        })
    }
}

pub struct DynamicObjectStrategy;

impl ResolutionStrategy for DynamicObjectStrategy {
    fn name(&self) -> &'static str {
        "dynamic-object"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        let Host::Value(Value::Dynamic(object)) = host else {
            return Ok(None);
        };
        object
            .try_get_member(name)
            .map_err(|fault| TalesError::HostMember {
                type_name: object.display(),
                member: name.to_string(),
                fault,
            })
    }
}

/// Zero-based, bounds-checked indexing. Only plain non-negative integers
/// are indices.
pub struct SequenceStrategy;

impl ResolutionStrategy for SequenceStrategy {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(None);
        }
        let Ok(index) = name.parse::<usize>() else {
            return Ok(None);
        };
        Ok(match host {
            Host::Value(Value::List(items)) => items.get(index).cloned(),
            Host::Value(Value::Object(object)) => object
                .as_sequence()
                .and_then(|items| items.into_iter().nth(index)),
            _ => None,
        })
    }
}

pub struct HostObjectStrategy;

impl ResolutionStrategy for HostObjectStrategy {
    fn name(&self) -> &'static str {
        "host-object"
    }

    fn try_get(
        &self,
        name: &str,
        host: Host<'_, '_>,
        _chain: &ValueResolver,
    ) -> Result<Option<Value>, TalesError> {
        match host {
            Host::Value(Value::Object(object)) => read_member(object.as_ref(), name),
            _ => Ok(None),
        }
    }
}
