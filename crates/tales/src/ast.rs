//! Defines the Abstract Syntax Tree for TALES path expressions.
use std::fmt;

/// A parsed path expression: `|`-separated alternates, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    /// The expression text as written.
    pub text: String,
    pub alternates: Vec<AlternateExpression>,
}

/// One `/`-separated lookup chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateExpression {
    pub parts: Vec<PathPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPart {
    pub name: String,
    /// When set, `name` is a variable whose value supplies the real segment.
    pub interpolated: bool,
}

impl PathPart {
    pub fn literal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interpolated: false,
        }
    }

    pub fn interpolated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interpolated: true,
        }
    }
}

impl AlternateExpression {
    /// A single-part path naming one variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            parts: vec![PathPart::literal(name)],
        }
    }
}

impl fmt::Display for PathPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interpolated {
            write!(f, "?{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

impl fmt::Display for AlternateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
