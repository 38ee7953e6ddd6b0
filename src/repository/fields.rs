// Lenient conversion of loosely typed records into trees

use super::tree::{Tree, TreeStatus};
use crate::core::{Row, Value};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value as Json};

pub type Record = Map<String, Json>;

/// String form of any non-null field, empty when missing.
pub fn get_string(record: &Record, key: &str) -> String {
    match record.get(key) {
        None | Some(Json::Null) => String::new(),
        Some(Json::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numbers only; integral values may arrive as floats.
pub fn get_int(record: &Record, key: &str) -> i64 {
    record.get(key).and_then(Json::as_f64).map_or(0, |f| f as i64)
}

pub fn get_float(record: &Record, key: &str) -> f64 {
    record.get(key).and_then(Json::as_f64).unwrap_or(0.0)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn parse_status(text: &str) -> Option<TreeStatus> {
    if text.is_empty() {
        return None;
    }
    match text.parse() {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unknown tree status");
            None
        }
    }
}

pub fn tree_from_record(record: &Record) -> Tree {
    Tree {
        id: get_string(record, "id"),
        code: get_string(record, "code"),
        species_id: get_string(record, "species_id"),
        location_id: get_string(record, "location_id"),
        planting_date: parse_date(&get_string(record, "planting_date")),
        age_years: get_int(record, "age_years"),
        height_meters: get_float(record, "height_meters"),
        diameter_cm: get_float(record, "diameter_cm"),
        status: parse_status(&get_string(record, "status")),
        health_score: get_int(record, "health_score"),
        notes: get_string(record, "notes"),
        registered_by: get_string(record, "registered_by"),
        created_at: parse_timestamp(&get_string(record, "created_at")),
        updated_at: parse_timestamp(&get_string(record, "updated_at")),
    }
}

fn row_text(row: &Row, column: &str) -> String {
    match row.get(column) {
        None | Some(Value::Null) => String::new(),
        Some(value) => value.to_string(),
    }
}

fn row_date(row: &Row, column: &str) -> Option<NaiveDate> {
    match row.get(column)? {
        Value::Date(d) => Some(*d),
        Value::Timestamp(t) => Some(t.date_naive()),
        Value::Text(s) => parse_date(s),
        _ => None,
    }
}

fn row_timestamp(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    match row.get(column)? {
        Value::Timestamp(t) => Some(*t),
        Value::Text(s) => parse_timestamp(s),
        _ => None,
    }
}

pub fn tree_from_row(row: &Row) -> Tree {
    let int = |column: &str| row.get(column).and_then(Value::as_int).unwrap_or(0);
    let real = |column: &str| row.get(column).and_then(Value::as_real).unwrap_or(0.0);
    Tree {
        id: row_text(row, "id"),
        code: row_text(row, "code"),
        species_id: row_text(row, "species_id"),
        location_id: row_text(row, "location_id"),
        planting_date: row_date(row, "planting_date"),
        age_years: int("age_years"),
        height_meters: real("height_meters"),
        diameter_cm: real("diameter_cm"),
        status: parse_status(&row_text(row, "status")),
        health_score: int("health_score"),
        notes: row_text(row, "notes"),
        registered_by: row_text(row, "registered_by"),
        created_at: row_timestamp(row, "created_at"),
        updated_at: row_timestamp(row, "updated_at"),
    }
}
