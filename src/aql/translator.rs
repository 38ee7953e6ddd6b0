//! AQL to SQL translation.
//!
//! Dispatch is by leading keyword, then each shape is parsed in full. Clause
//! boundaries are the first occurrence of `DARI`, `DENGAN` and `DIMANA`, and a
//! clause may not contain a `;` outside a quoted literal.

use super::common::{identifier, ws};
use super::statement::StatementKind;
use crate::core::AqlError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{char, multispace0, multispace1},
    combinator::{eof, rest},
    error::{Error, ErrorKind},
    IResult,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Backend-native replacement for `LIHAT LAHAN`.
pub const LIST_TABLES_SQL: &str = "SELECT tablename FROM pg_catalog.pg_tables \
    WHERE schemaname != 'pg_catalog' AND schemaname != 'information_schema'";

/// How text outside the eight known shapes is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Unknown or malformed statements are rejected.
    #[default]
    Strict,
    /// Unknown or malformed statements are forwarded unchanged.
    Passthrough,
}

#[derive(Debug, Clone, Copy)]
enum Matcher {
    Prefix(&'static str),
    Exact(&'static str),
}

impl Matcher {
    fn matches(self, query: &str) -> bool {
        match self {
            Self::Prefix(prefix) => query.starts_with(prefix),
            Self::Exact(text) => query == text,
        }
    }
}

struct TranslationRule {
    kind: StatementKind,
    matcher: Matcher,
    /// `None` when the text carries the keyword but not the full shape.
    rewrite: fn(&str) -> Option<String>,
}

const RULES: &[TranslationRule] = &[
    TranslationRule {
        kind: StatementKind::CreateTable,
        matcher: Matcher::Prefix("LAHAN "),
        rewrite: rewrite_create_table,
    },
    TranslationRule {
        kind: StatementKind::Insert,
        matcher: Matcher::Prefix("TANAM KE "),
        rewrite: rewrite_insert,
    },
    TranslationRule {
        kind: StatementKind::Select,
        matcher: Matcher::Prefix("PANEN "),
        rewrite: rewrite_select,
    },
    TranslationRule {
        kind: StatementKind::Update,
        matcher: Matcher::Prefix("PUPUK "),
        rewrite: rewrite_update,
    },
    TranslationRule {
        kind: StatementKind::Delete,
        matcher: Matcher::Prefix("GUSUR DARI "),
        rewrite: rewrite_delete,
    },
    TranslationRule {
        kind: StatementKind::DropTable,
        matcher: Matcher::Prefix("BAKAR LAHAN "),
        rewrite: rewrite_drop_table,
    },
    TranslationRule {
        kind: StatementKind::ShowTables,
        matcher: Matcher::Exact("LIHAT LAHAN"),
        rewrite: rewrite_show_tables,
    },
    TranslationRule {
        kind: StatementKind::Count,
        matcher: Matcher::Prefix("HITUNG "),
        rewrite: rewrite_count,
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    mode: TranslationMode,
}

impl Translator {
    #[must_use]
    pub const fn new(mode: TranslationMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> TranslationMode {
        self.mode
    }

    /// Statement kind recognized from the leading keyword, if any.
    pub fn classify(aql: &str) -> Option<StatementKind> {
        let query = aql.trim();
        RULES
            .iter()
            .find(|rule| rule.matcher.matches(query))
            .map(|rule| rule.kind)
    }

    /// Converts AQL text to SQL text.
    pub fn to_sql(&self, aql: &str) -> Result<String, AqlError> {
        let query = aql.trim();
        if query.is_empty() && self.mode == TranslationMode::Strict {
            return Err(AqlError::EmptyStatement);
        }

        let Some(rule) = RULES.iter().find(|rule| rule.matcher.matches(query)) else {
            return match self.mode {
                TranslationMode::Strict => Err(AqlError::UnrecognizedStatement(query.to_string())),
                TranslationMode::Passthrough => {
                    warn!(statement = query, "no AQL shape matched, forwarding text unchanged");
                    Ok(query.to_string())
                }
            };
        };

        match ((rule.rewrite)(query), self.mode) {
            (Some(sql), _) => Ok(sql),
            (None, TranslationMode::Strict) => Err(AqlError::MalformedStatement {
                kind: rule.kind,
                text: query.to_string(),
            }),
            (None, TranslationMode::Passthrough) => {
                warn!(
                    kind = %rule.kind,
                    statement = query,
                    "malformed AQL statement, forwarding text unchanged"
                );
                Ok(query.to_string())
            }
        }
    }
}

fn fail(input: &str) -> nom::Err<Error<&str>> {
    nom::Err::Error(Error::new(input, ErrorKind::Char))
}

/// True when every `;` sits inside a closed single-quoted literal.
fn is_single_statement(text: &str) -> bool {
    let mut quoted = false;
    for c in text.chars() {
        match c {
            '\'' => quoted = !quoted,
            ';' if !quoted => return false,
            _ => {}
        }
    }
    !quoted
}

/// A non-empty clause holding a single statement, trimmed.
fn clause(text: &str) -> Result<&str, nom::Err<Error<&str>>> {
    let text = text.trim();
    if text.is_empty() || !is_single_statement(text) {
        return Err(fail(text));
    }
    Ok(text)
}

/// Everything before the closing parenthesis that ends the input.
fn enclosed_tail(input: &str) -> IResult<&str, &str> {
    let inner = input.strip_suffix(')').ok_or_else(|| fail(input))?;
    Ok(("", clause(inner)?))
}

/// Optional `DIMANA <condition>` ending the statement.
fn where_tail(input: &str) -> IResult<&str, Option<&str>> {
    if input.is_empty() {
        return Ok((input, None));
    }
    let (input, _) = multispace1(input)?;
    let (input, _) = tag("DIMANA")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, condition) = rest(input)?;
    Ok((input, Some(clause(condition)?)))
}

// LAHAN data_pohon (id VARCHAR(50), status VARCHAR(20))
fn create_table(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag("LAHAN")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, columns) = enclosed_tail(input)?;
    Ok((input, (name, columns)))
}

// TANAM KE data_pohon (id, status) BIBIT ('P001', 'SEHAT')
fn insert(input: &str) -> IResult<&str, (&str, &str, &str)> {
    let (input, _) = tag("TANAM KE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, table) = identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = char('(')(input)?;
    let (input, columns) = take_until(")")(input)?;
    let columns = clause(columns)?;
    let (input, _) = char(')')(input)?;
    let (input, _) = ws(tag("BIBIT"))(input)?;
    let (input, _) = char('(')(input)?;
    let (input, values) = enclosed_tail(input)?;
    Ok((input, (table, columns, values)))
}

/// `<keyword> <columns> DARI <table> [DIMANA <condition>]`, shared by PANEN and HITUNG.
fn read_from<'a>(
    keyword: &'static str,
    input: &'a str,
) -> IResult<&'a str, (&'a str, &'a str, Option<&'a str>)> {
    let (input, _) = tag(keyword)(input)?;
    let (input, _) = multispace1(input)?;
    let (input, columns) = take_until(" DARI ")(input)?;
    let columns = clause(columns)?;
    let (input, _) = tag(" DARI")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, table) = identifier(input)?;
    let (input, filter) = where_tail(input)?;
    Ok((input, (columns, table, filter)))
}

// PUPUK data_pohon DENGAN status='SAKIT' DIMANA id='P001'
fn update(input: &str) -> IResult<&str, (&str, &str, Option<&str>)> {
    let (input, _) = tag("PUPUK")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, table) = identifier(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = tag("DENGAN")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, set) = alt((take_until(" DIMANA "), rest))(input)?;
    let set = clause(set)?;
    let (input, filter) = where_tail(input)?;
    Ok((input, (table, set, filter)))
}

// GUSUR DARI data_pohon DIMANA id='P001'
fn delete(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = tag("GUSUR DARI")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, table) = identifier(input)?;
    let (input, filter) = where_tail(input)?;
    Ok((input, (table, filter)))
}

// BAKAR LAHAN data_pohon
fn drop_table(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag("BAKAR LAHAN")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, name) = identifier(input)?;
    let (input, _) = eof(input)?;
    Ok((input, name))
}

fn with_filter(mut sql: String, filter: Option<&str>) -> String {
    if let Some(condition) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

fn rewrite_create_table(query: &str) -> Option<String> {
    let (_, (name, columns)) = create_table(query).ok()?;
    Some(format!("CREATE TABLE {name} ({columns})"))
}

fn rewrite_insert(query: &str) -> Option<String> {
    let (_, (table, columns, values)) = insert(query).ok()?;
    Some(format!("INSERT INTO {table} ({columns}) VALUES ({values})"))
}

fn rewrite_select(query: &str) -> Option<String> {
    let (_, (columns, table, filter)) = read_from("PANEN", query).ok()?;
    Some(with_filter(format!("SELECT {columns} FROM {table}"), filter))
}

fn rewrite_update(query: &str) -> Option<String> {
    let (_, (table, set, filter)) = update(query).ok()?;
    Some(with_filter(format!("UPDATE {table} SET {set}"), filter))
}

fn rewrite_delete(query: &str) -> Option<String> {
    let (_, (table, filter)) = delete(query).ok()?;
    Some(with_filter(format!("DELETE FROM {table}"), filter))
}

fn rewrite_drop_table(query: &str) -> Option<String> {
    let (_, name) = drop_table(query).ok()?;
    Some(format!("DROP TABLE {name}"))
}

fn rewrite_show_tables(_query: &str) -> Option<String> {
    Some(LIST_TABLES_SQL.to_string())
}

fn rewrite_count(query: &str) -> Option<String> {
    let (_, (columns, table, filter)) = read_from("HITUNG", query).ok()?;
    Some(with_filter(format!("SELECT {columns} FROM {table}"), filter))
}
