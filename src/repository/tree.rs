use crate::aql::{Assignment, Predicate};
use crate::core::{AqlError, Value};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Table (SawitDB collection) holding trees.
pub const TREES: &str = "trees";

/// Column order used for inserts.
pub const TREE_COLUMNS: [&str; 14] = [
    "id",
    "code",
    "species_id",
    "location_id",
    "planting_date",
    "age_years",
    "height_meters",
    "diameter_cm",
    "status",
    "health_score",
    "notes",
    "registered_by",
    "created_at",
    "updated_at",
];

/// Date and timestamp columns; the relational schema gives the audit pair a default.
const DATE_COLUMNS: [&str; 3] = ["planting_date", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TreeStatus {
    Sehat,
    Sakit,
    Mati,
    Dipupuk,
    Dipantau,
}

impl TreeStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sehat => "SEHAT",
            Self::Sakit => "SAKIT",
            Self::Mati => "MATI",
            Self::Dipupuk => "DIPUPUK",
            Self::Dipantau => "DIPANTAU",
        }
    }
}

impl std::fmt::Display for TreeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeStatus {
    type Err = AqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SEHAT" => Ok(Self::Sehat),
            "SAKIT" => Ok(Self::Sakit),
            "MATI" => Ok(Self::Mati),
            "DIPUPUK" => Ok(Self::Dipupuk),
            "DIPANTAU" => Ok(Self::Dipantau),
            _ => Err(AqlError::InvalidStatus(s.to_string())),
        }
    }
}

impl From<TreeStatus> for Value {
    fn from(status: TreeStatus) -> Self {
        Self::Text(status.as_str().to_string())
    }
}

/// A tree as stored by either backend.
///
/// Fields a backend did not return keep their zero value: empty strings, `0`,
/// and `None` for dates and status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub id: String,
    /// Human-readable code such as `C001`.
    pub code: String,
    pub species_id: String,
    pub location_id: String,
    pub planting_date: Option<NaiveDate>,
    pub age_years: i64,
    pub height_meters: f64,
    pub diameter_cm: f64,
    pub status: Option<TreeStatus>,
    pub health_score: i64,
    pub notes: String,
    pub registered_by: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn optional<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

impl Tree {
    /// Values in [`TREE_COLUMNS`] order.
    pub fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.as_str()),
            Value::from(self.code.as_str()),
            Value::from(self.species_id.as_str()),
            Value::from(self.location_id.as_str()),
            optional(self.planting_date),
            Value::Integer(self.age_years),
            Value::Real(self.height_meters),
            Value::Real(self.diameter_cm),
            optional(self.status),
            Value::Integer(self.health_score),
            Value::from(self.notes.as_str()),
            Value::from(self.registered_by.as_str()),
            optional(self.created_at),
            optional(self.updated_at),
        ]
    }

    /// Insert columns and values, leaving out unset dates so column defaults apply.
    pub fn insert_columns(&self) -> (Vec<&'static str>, Vec<Value>) {
        TREE_COLUMNS
            .into_iter()
            .zip(self.values())
            .filter(|(column, value)| !(value.is_null() && DATE_COLUMNS.contains(column)))
            .unzip()
    }

    /// Assignments written by a full update; identity and audit columns are left alone,
    /// and an unset planting date keeps the stored one.
    pub fn update_assignments(&self, now: DateTime<Utc>) -> Vec<Assignment> {
        let mut assignments = vec![
            Assignment::new("species_id", self.species_id.as_str()),
            Assignment::new("location_id", self.location_id.as_str()),
        ];
        if let Some(date) = self.planting_date {
            assignments.push(Assignment::new("planting_date", date));
        }
        assignments.extend([
            Assignment::new("age_years", self.age_years),
            Assignment::new("height_meters", self.height_meters),
            Assignment::new("diameter_cm", self.diameter_cm),
            Assignment::new("status", optional(self.status)),
            Assignment::new("health_score", self.health_score),
            Assignment::new("notes", self.notes.as_str()),
            Assignment::new("updated_at", now),
        ]);
        assignments
    }
}

pub fn status_assignments(
    status: TreeStatus,
    health_score: i64,
    now: DateTime<Utc>,
) -> Vec<Assignment> {
    vec![
        Assignment::new("status", status),
        Assignment::new("health_score", health_score),
        Assignment::new("updated_at", now),
    ]
}

/// Criteria for [`TreeRepository::find_all`]. `limit == 0` means no limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeFilter {
    pub location_id: Option<String>,
    pub species_id: Option<String>,
    pub status: Option<TreeStatus>,
    pub limit: usize,
    pub offset: usize,
}

impl TreeFilter {
    pub fn matches(&self, tree: &Tree) -> bool {
        self.location_id.as_ref().is_none_or(|l| *l == tree.location_id)
            && self.species_id.as_ref().is_none_or(|s| *s == tree.species_id)
            && self.status.is_none_or(|s| tree.status == Some(s))
    }

    /// Equality predicates for the set criteria, `None` when nothing is set.
    pub fn predicate(&self) -> Option<Predicate> {
        let mut predicates = Vec::new();
        if let Some(location) = &self.location_id {
            predicates.push(Predicate::eq("location_id", location.as_str()));
        }
        if let Some(species) = &self.species_id {
            predicates.push(Predicate::eq("species_id", species.as_str()));
        }
        if let Some(status) = self.status {
            predicates.push(Predicate::eq("status", status));
        }
        Predicate::all(predicates)
    }

    /// Applies offset, then limit.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        let items = items.into_iter().skip(self.offset);
        if self.limit == 0 {
            items.collect()
        } else {
            items.take(self.limit).collect()
        }
    }
}

/// Storage of trees, implemented for SawitDB and for relational backends.
#[async_trait]
pub trait TreeRepository: Send + Sync {
    async fn create(&self, tree: &Tree) -> Result<(), AqlError>;

    async fn find_by_id(&self, id: &str) -> Result<Tree, AqlError>;

    async fn find_by_code(&self, code: &str) -> Result<Tree, AqlError>;

    async fn find_all(&self, filter: &TreeFilter) -> Result<Vec<Tree>, AqlError>;

    async fn update(&self, tree: &Tree) -> Result<(), AqlError>;

    async fn update_status(
        &self,
        id: &str,
        status: TreeStatus,
        health_score: i64,
    ) -> Result<(), AqlError>;

    async fn delete(&self, id: &str) -> Result<(), AqlError>;

    /// Next free `C<nnn>` code.
    async fn next_code(&self) -> Result<String, AqlError>;

    async fn count_by_location(&self, location_id: &str) -> Result<i64, AqlError>;

    async fn count_by_status(&self, status: TreeStatus) -> Result<i64, AqlError>;
}

/// Number in a `C<n>` code.
pub fn code_number(code: &str) -> Option<u64> {
    let digits: String = code
        .strip_prefix('C')?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn format_code(number: u64) -> String {
    format!("C{number:03}")
}

/// Code following `max`, the highest code number in use.
pub fn next_code_after(max: u64) -> Result<String, AqlError> {
    max.checked_add(1)
        .map(format_code)
        .ok_or(AqlError::CodesExhausted(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(code: &str, status: TreeStatus) -> Tree {
        Tree {
            code: code.to_string(),
            location_id: "L1".to_string(),
            status: Some(status),
            ..Tree::default()
        }
    }

    #[test]
    fn test_status_round_trip_and_invalid() {
        assert_eq!("dipantau".parse::<TreeStatus>().unwrap(), TreeStatus::Dipantau);
        assert_eq!(TreeStatus::Sehat.to_string(), "SEHAT");
        assert!(matches!("LAYU".parse::<TreeStatus>(), Err(AqlError::InvalidStatus(_))));
    }

    #[test]
    fn test_filter_then_paginate() {
        let trees = vec![
            tree("C001", TreeStatus::Sehat),
            tree("C002", TreeStatus::Sakit),
            tree("C003", TreeStatus::Sehat),
            tree("C004", TreeStatus::Mati),
            tree("C005", TreeStatus::Sehat),
        ];
        let filter = TreeFilter {
            status: Some(TreeStatus::Sehat),
            limit: 2,
            offset: 1,
            ..TreeFilter::default()
        };
        let matched: Vec<Tree> = trees.into_iter().filter(|t| filter.matches(t)).collect();
        let page = filter.paginate(matched);
        let codes: Vec<_> = page.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["C003", "C005"]);
    }

    #[test]
    fn test_zero_limit_is_unlimited() {
        let filter = TreeFilter {
            offset: 1,
            ..TreeFilter::default()
        };
        assert_eq!(filter.paginate(vec![1, 2, 3]), vec![2, 3]);
        assert!(filter.paginate(Vec::<i32>::new()).is_empty());
    }

    #[test]
    fn test_insert_columns_skip_unset_dates() {
        let mut tree = Tree {
            id: "T1".to_string(),
            code: "C001".to_string(),
            ..Tree::default()
        };
        let (columns, values) = tree.insert_columns();
        assert_eq!(columns.len(), 11);
        assert_eq!(values.len(), 11);
        assert!(!columns.contains(&"planting_date"));
        assert!(!columns.contains(&"created_at"));
        assert!(columns.contains(&"status"));

        tree.planting_date = NaiveDate::from_ymd_opt(2020, 3, 1);
        let (columns, values) = tree.insert_columns();
        assert_eq!(columns[4], "planting_date");
        assert_eq!(values[4], Value::from(NaiveDate::from_ymd_opt(2020, 3, 1).unwrap()));
    }

    #[test]
    fn test_update_keeps_unset_planting_date() {
        let now = Utc::now();
        let mut tree = Tree::default();
        let columns = |t: &Tree| -> Vec<String> {
            t.update_assignments(now).into_iter().map(|a| a.column).collect()
        };
        assert!(!columns(&tree).iter().any(|c| c == "planting_date"));
        tree.planting_date = NaiveDate::from_ymd_opt(2019, 7, 12);
        assert_eq!(columns(&tree)[2], "planting_date");
    }

    #[test]
    fn test_filter_predicate() {
        let filter = TreeFilter {
            location_id: Some("L1".to_string()),
            status: Some(TreeStatus::Sakit),
            ..TreeFilter::default()
        };
        assert_eq!(
            filter.predicate().map(|p| p.to_string()).as_deref(),
            Some("location_id='L1' AND status='SAKIT'")
        );
        assert_eq!(TreeFilter::default().predicate(), None);
    }

    #[test]
    fn test_code_number() {
        assert_eq!(code_number("C042"), Some(42));
        assert_eq!(code_number("C7x"), Some(7));
        assert_eq!(code_number("T001"), None);
        assert_eq!(code_number("C"), None);
        assert_eq!(format_code(43), "C043");
        assert_eq!(format_code(1000), "C1000");
    }

    #[test]
    fn test_next_code_after_wide_numbers() {
        assert_eq!(next_code_after(0).unwrap(), "C001");
        assert_eq!(next_code_after(4_294_967_295).unwrap(), "C4294967296");
        assert!(matches!(
            next_code_after(u64::MAX),
            Err(AqlError::CodesExhausted(u64::MAX))
        ));
    }
}
