use crate::core::AqlError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, multispace0},
    combinator::recognize,
    sequence::{delimited, pair},
    IResult,
};

pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// ASCII identifier: a letter or underscore followed by letters, digits or underscores.
pub fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

pub fn is_identifier(s: &str) -> bool {
    matches!(identifier(s), Ok(("", _)))
}

pub fn validate_identifier(s: &str) -> Result<&str, AqlError> {
    if is_identifier(s) {
        Ok(s)
    } else {
        Err(AqlError::InvalidIdentifier(s.to_string()))
    }
}

/// Validates a select column list: `*`, `COUNT(*)` or comma-separated identifiers.
pub fn validate_column_list(columns: &str) -> Result<(), AqlError> {
    let columns = columns.trim();
    if columns == "*" || columns.eq_ignore_ascii_case("COUNT(*)") {
        return Ok(());
    }
    for column in columns.split(',') {
        validate_identifier(column.trim())?;
    }
    Ok(())
}
