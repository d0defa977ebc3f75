//! A `nom`-based parser for TALES path expressions.
use crate::ast::{AlternateExpression, PathExpression, PathPart};
use crate::error::TalesError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, satisfy},
    combinator::{all_consuming, map, recognize},
    sequence::{pair, preceded},
};

const ALTERNATE_SEPARATOR: char = '|';
const PART_SEPARATOR: char = '/';

// --- Main Public Parser ---

/// Parses `a/b | c/?d` into alternates of path parts.
///
/// Alternates are trimmed; parts are not. The first part of each alternate
/// must be a variable name, later parts may also contain spaces and
/// `. , ~ -`, start with a digit, or be `?variable` for interpolation.
pub fn parse_path_expression(input: &str) -> Result<PathExpression, TalesError> {
    let alternates = input
        .split(ALTERNATE_SEPARATOR)
        .map(str::trim)
        .map(|alternate| parse_alternate(input, alternate))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PathExpression {
        text: input.to_string(),
        alternates,
    })
}

fn parse_alternate(expression: &str, alternate: &str) -> Result<AlternateExpression, TalesError> {
    if alternate.is_empty() {
        return Err(TalesError::path_parse(
            expression,
            alternate,
            "alternate expressions cannot be empty:",
        ));
    }
    let parts = alternate
        .split(PART_SEPARATOR)
        .enumerate()
        .map(|(index, part)| parse_part(expression, index, part))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AlternateExpression { parts })
}

fn parse_part(expression: &str, index: usize, part: &str) -> Result<PathPart, TalesError> {
    if part.is_empty() {
        return Err(TalesError::path_parse(
            expression,
            part,
            "path parts cannot be empty:",
        ));
    }
    let result = if index == 0 {
        all_consuming(map(variable_name, |name: &str| PathPart::literal(name))).parse(part)
    } else {
        all_consuming(later_part).parse(part)
    };
    match result {
        Ok((_, parsed)) => Ok(parsed),
        Err(_) if index == 0 => Err(TalesError::path_parse(
            expression,
            part,
            "invalid variable name",
        )),
        Err(_) => Err(TalesError::path_parse(expression, part, "invalid path part")),
    }
}

// --- Combinators ---

fn variable_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn relaxed_part(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '.' | ',' | '~' | '-'))
        .parse(input)
}

fn later_part(input: &str) -> IResult<&str, PathPart> {
    alt((
        map(preceded(char('?'), variable_name), |name: &str| {
            PathPart::interpolated(name)
        }),
        map(relaxed_part, |name: &str| PathPart::literal(name)),
    ))
    .parse(input)
}
