//! AQL statement text for the eight supported operation kinds.
//!
//! Inputs are assumed to be validated by the caller; the builder only joins
//! tokens and never fails.

use crate::core::Value;

pub struct QueryBuilder;

impl QueryBuilder {
    /// `LAHAN <table> (<columns>)`, or `LAHAN <table>` when no columns are given.
    pub fn create_table(table: &str, columns: &str) -> String {
        if columns.trim().is_empty() {
            format!("LAHAN {table}")
        } else {
            format!("LAHAN {table} ({columns})")
        }
    }

    /// `TANAM KE <table> (<columns>) BIBIT (<values>)`
    pub fn insert<C: AsRef<str>>(table: &str, columns: &[C], values: &[Value]) -> String {
        let literals: Vec<String> = values.iter().map(Value::to_literal).collect();
        Self::insert_literals(table, columns, &literals)
    }

    /// Same shape as [`QueryBuilder::insert`] with pre-rendered value tokens.
    pub fn insert_literals<C: AsRef<str>, V: AsRef<str>>(
        table: &str,
        columns: &[C],
        values: &[V],
    ) -> String {
        format!(
            "TANAM KE {table} ({}) BIBIT ({})",
            join(columns),
            join(values)
        )
    }

    /// `PANEN <columns> DARI <table> [DIMANA <where>]`
    pub fn select(table: &str, columns: &str, filter: Option<&str>) -> String {
        with_filter(format!("PANEN {columns} DARI {table}"), filter)
    }

    /// `PUPUK <table> DENGAN <set> [DIMANA <where>]`
    pub fn update(table: &str, set: &str, filter: Option<&str>) -> String {
        with_filter(format!("PUPUK {table} DENGAN {set}"), filter)
    }

    /// `GUSUR DARI <table> [DIMANA <where>]`
    pub fn delete(table: &str, filter: Option<&str>) -> String {
        with_filter(format!("GUSUR DARI {table}"), filter)
    }

    /// `BAKAR LAHAN <table>`. Only the safe executor's drop gate should send this
    /// to a relational backend.
    pub fn drop_table(table: &str) -> String {
        format!("BAKAR LAHAN {table}")
    }

    pub fn show_tables() -> String {
        "LIHAT LAHAN".to_string()
    }

    /// `HITUNG COUNT(*) DARI <table> [DIMANA <where>]`
    pub fn count(table: &str, filter: Option<&str>) -> String {
        with_filter(format!("HITUNG COUNT(*) DARI {table}"), filter)
    }
}

fn with_filter(mut query: String, filter: Option<&str>) -> String {
    if let Some(filter) = filter.filter(|f| !f.is_empty()) {
        query.push_str(" DIMANA ");
        query.push_str(filter);
    }
    query
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}
