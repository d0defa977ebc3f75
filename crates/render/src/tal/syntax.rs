//! Parsers for the textual forms of TAL attribute values.

use regex::Regex;
use std::sync::LazyLock;

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:(local|global)\s+)?(\S+)\s+(.+)$")
        .expect("BUG: invalid DEFINITION regex literal")
});

static ATTRIBUTE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:([^\s:]+):)?([^\s:]+)\s+(.+)$")
        .expect("BUG: invalid ATTRIBUTE_DEFINITION regex literal")
});

static REPEAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(\S+)\s+(.+)$").expect("BUG: invalid REPEAT regex literal")
});

static CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:(text|structure)\s+)?(.*)$")
        .expect("BUG: invalid CONTENT regex literal")
});

/// Splits a `;`-separated attribute value into trimmed, non-empty clauses.
/// `;;` stands for a literal `;`.
pub(crate) fn split_clauses(value: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ';' {
            current.push(c);
            continue;
        }
        if chars.peek() == Some(&';') {
            chars.next();
            current.push(';');
            continue;
        }
        clauses.push(std::mem::take(&mut current));
    }
    clauses.push(current);
    clauses
        .into_iter()
        .map(|clause| clause.trim().to_string())
        .filter(|clause| !clause.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scope {
    Local,
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Definition {
    pub scope: Scope,
    pub name: String,
    pub expression: String,
}

/// Parses `[local|global] name expression`.
pub(crate) fn parse_definition(clause: &str) -> Option<Definition> {
    let caps = DEFINITION.captures(clause)?;
    let scope = match caps.get(1).map(|m| m.as_str()) {
        Some("global") => Scope::Global,
        _ => Scope::Local,
    };
    Some(Definition {
        scope,
        name: caps.get(2)?.as_str().to_string(),
        expression: caps.get(3)?.as_str().to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeDefinition {
    pub prefix: Option<String>,
    pub name: String,
    pub expression: String,
}

impl AttributeDefinition {
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }
}

/// Parses `[prefix:]name expression`.
pub(crate) fn parse_attribute_definition(clause: &str) -> Option<AttributeDefinition> {
    let caps = ATTRIBUTE_DEFINITION.captures(clause)?;
    Some(AttributeDefinition {
        prefix: caps.get(1).map(|m| m.as_str().to_string()),
        name: caps.get(2)?.as_str().to_string(),
        expression: caps.get(3)?.as_str().to_string(),
    })
}

/// Parses `variable expression`.
pub(crate) fn parse_repeat(value: &str) -> Option<(String, String)> {
    let caps = REPEAT.captures(value.trim())?;
    Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentExpression {
    pub structure: bool,
    pub expression: String,
}

/// Parses `[text|structure] expression`.
pub(crate) fn parse_content(value: &str) -> ContentExpression {
    let value = value.trim();
    match CONTENT.captures(value) {
        Some(caps) => ContentExpression {
            structure: caps.get(1).is_some_and(|m| m.as_str() == "structure"),
            expression: caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string(),
        },
        None => ContentExpression {
            structure: false,
            expression: value.to_string(),
        },
    }
}
