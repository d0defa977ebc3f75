//! TALES, the expression languages used inside TAL and METAL attributes.
//!
//! The primary language is the path expression (`here/items/0 | nothing`),
//! parsed by [`parser`] and walked against an [`EvaluationContext`] through
//! the ordered strategies of [`resolver`]. `string:`, `not:`, `structure:`
//! and `pipe:` expressions and the scope-limited `local:`/`global:`/`defined:`
//! path variants are provided by [`evaluator`].
//!
//! Values flowing through expressions are modelled by [`Value`]; arbitrary
//! host types participate by implementing [`HostObject`] or [`DynamicObject`].

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod host;
pub mod parser;
pub mod repetition;
pub mod resolver;
mod string_expr;
pub mod template;
pub mod value;
pub mod walker;

pub use ast::{AlternateExpression, PathExpression, PathPart};
pub use context::{Definitions, EvaluationContext, RootScope};
pub use error::{HostFault, TalesError};
pub use evaluator::{
    ExpressionEngine, ExpressionEvaluator, NotExpressionEvaluator, PathExpressionEvaluator,
    PipeExpressionEvaluator, StringExpressionEvaluator, StructureExpressionEvaluator,
};
pub use host::{Callable, DynamicObject, HostObject, Member, MemberKind};
pub use parser::parse_path_expression;
pub use repetition::RepetitionInfo;
pub use resolver::{Host, ResolutionStrategy, ValueResolver};
pub use template::{MacroDefinition, TemplateDirectory, TemplateDocument};
pub use value::{Value, ValueMap};
