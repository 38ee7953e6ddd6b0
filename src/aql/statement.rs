use super::builder::QueryBuilder;
use super::common::{validate_column_list, validate_identifier};
use crate::core::{AqlError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    Insert,
    Select,
    Update,
    Delete,
    DropTable,
    ShowTables,
    Count,
}

impl StatementKind {
    pub const ALL: [Self; 8] = [
        Self::CreateTable,
        Self::Insert,
        Self::Select,
        Self::Update,
        Self::Delete,
        Self::DropTable,
        Self::ShowTables,
        Self::Count,
    ];

    /// Leading AQL keyword of the statement shape.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::CreateTable => "LAHAN",
            Self::Insert => "TANAM KE",
            Self::Select => "PANEN",
            Self::Update => "PUPUK",
            Self::Delete => "GUSUR DARI",
            Self::DropTable => "BAKAR LAHAN",
            Self::ShowTables => "LIHAT LAHAN",
            Self::Count => "HITUNG",
        }
    }

    /// `CONFIRM_<OPERATION>_<TABLE>`, e.g. `CONFIRM_BAKAR_LAHAN_logs_pohon`.
    #[must_use]
    pub fn confirmation_token(self, table: &str) -> String {
        format!("CONFIRM_{}_{table}", self.keyword().replace(' ', "_"))
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateTable => "create-table",
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::DropTable => "drop-table",
            Self::ShowTables => "list-tables",
            Self::Count => "count",
        };
        f.write_str(name)
    }
}

/// WHERE clause of select, update, delete and count statements.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, Value),
    And(Box<Predicate>, Box<Predicate>),
    /// Free text appended verbatim; never parameterized.
    Raw(String),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    /// Conjunction of all predicates, `None` when the iterator is empty.
    pub fn all(predicates: impl IntoIterator<Item = Self>) -> Option<Self> {
        predicates.into_iter().reduce(Self::and)
    }

    fn render(&self, out: &mut Renderer) -> String {
        match self {
            Self::Eq(column, value) => format!("{column}={}", out.value(value)),
            Self::And(left, right) => format!("{} AND {}", left.render(out), right.render(out)),
            Self::Raw(text) => text.clone(),
        }
    }

    fn columns<'a>(&'a self, acc: &mut Vec<&'a str>) {
        match self {
            Self::Eq(column, _) => acc.push(column),
            Self::And(left, right) => {
                left.columns(acc);
                right.columns(acc);
            }
            Self::Raw(_) => {}
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&mut Renderer::inline()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A typed AQL statement.
///
/// `Display` renders the inline AQL text sent to SawitDB. The relational path
/// uses [`AqlStatement::render_placeholders`] instead so that values travel as
/// bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum AqlStatement {
    CreateTable {
        name: String,
        /// Column definitions, passed through as written.
        columns: String,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<Value>,
    },
    Select {
        table: String,
        columns: String,
        filter: Option<Predicate>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        filter: Option<Predicate>,
    },
    Delete {
        table: String,
        filter: Option<Predicate>,
    },
    DropTable {
        name: String,
    },
    ShowTables,
    Count {
        table: String,
        filter: Option<Predicate>,
    },
}

impl AqlStatement {
    #[must_use]
    pub const fn kind(&self) -> StatementKind {
        match self {
            Self::CreateTable { .. } => StatementKind::CreateTable,
            Self::Insert { .. } => StatementKind::Insert,
            Self::Select { .. } => StatementKind::Select,
            Self::Update { .. } => StatementKind::Update,
            Self::Delete { .. } => StatementKind::Delete,
            Self::DropTable { .. } => StatementKind::DropTable,
            Self::ShowTables => StatementKind::ShowTables,
            Self::Count { .. } => StatementKind::Count,
        }
    }

    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { name, .. } | Self::DropTable { name } => Some(name),
            Self::Insert { table, .. }
            | Self::Select { table, .. }
            | Self::Update { table, .. }
            | Self::Delete { table, .. }
            | Self::Count { table, .. } => Some(table),
            Self::ShowTables => None,
        }
    }

    /// Checks every table and column name that ends up in statement text.
    pub fn validate(&self) -> Result<(), AqlError> {
        if let Some(table) = self.table() {
            validate_identifier(table)?;
        }
        let mut columns: Vec<&str> = Vec::new();
        match self {
            Self::Insert { columns: cols, values, .. } => {
                if cols.len() != values.len() {
                    return Err(AqlError::MalformedStatement {
                        kind: StatementKind::Insert,
                        text: format!("{} columns for {} values", cols.len(), values.len()),
                    });
                }
                columns.extend(cols.iter().map(String::as_str));
            }
            Self::Select { columns: list, filter, .. } => {
                validate_column_list(list)?;
                if let Some(filter) = filter {
                    filter.columns(&mut columns);
                }
            }
            Self::Update { assignments, filter, .. } => {
                columns.extend(assignments.iter().map(|a| a.column.as_str()));
                if let Some(filter) = filter {
                    filter.columns(&mut columns);
                }
            }
            Self::Delete { filter, .. } | Self::Count { filter, .. } => {
                if let Some(filter) = filter {
                    filter.columns(&mut columns);
                }
            }
            Self::CreateTable { .. } | Self::DropTable { .. } | Self::ShowTables => {}
        }
        for column in columns {
            validate_identifier(column)?;
        }
        Ok(())
    }

    /// AQL text with `$1..$n` in place of every value, plus the ordered values.
    #[must_use]
    pub fn render_placeholders(&self) -> (String, Vec<Value>) {
        let mut out = Renderer::placeholders();
        let text = self.render(&mut out);
        (text, out.params)
    }

    fn render(&self, out: &mut Renderer) -> String {
        match self {
            Self::CreateTable { name, columns } => QueryBuilder::create_table(name, columns),
            Self::Insert { table, columns, values } => {
                let literals: Vec<String> = values.iter().map(|v| out.value(v)).collect();
                QueryBuilder::insert_literals(table, columns, &literals)
            }
            Self::Select { table, columns, filter } => {
                let filter = filter.as_ref().map(|p| p.render(out));
                QueryBuilder::select(table, columns, filter.as_deref())
            }
            Self::Update { table, assignments, filter } => {
                let set = assignments
                    .iter()
                    .map(|a| format!("{}={}", a.column, out.value(&a.value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let filter = filter.as_ref().map(|p| p.render(out));
                QueryBuilder::update(table, &set, filter.as_deref())
            }
            Self::Delete { table, filter } => {
                let filter = filter.as_ref().map(|p| p.render(out));
                QueryBuilder::delete(table, filter.as_deref())
            }
            Self::DropTable { name } => QueryBuilder::drop_table(name),
            Self::ShowTables => QueryBuilder::show_tables(),
            Self::Count { table, filter } => {
                let filter = filter.as_ref().map(|p| p.render(out));
                QueryBuilder::count(table, filter.as_deref())
            }
        }
    }
}

impl std::fmt::Display for AqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(&mut Renderer::inline()))
    }
}

/// Emits values either inline as literals or as numbered placeholders.
struct Renderer {
    placeholders: bool,
    params: Vec<Value>,
}

impl Renderer {
    const fn inline() -> Self {
        Self {
            placeholders: false,
            params: Vec::new(),
        }
    }

    const fn placeholders() -> Self {
        Self {
            placeholders: true,
            params: Vec::new(),
        }
    }

    fn value(&mut self, value: &Value) -> String {
        if self.placeholders {
            self.params.push(value.clone());
            format!("${}", self.params.len())
        } else {
            value.to_literal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select_by_code(code: &str) -> AqlStatement {
        AqlStatement::Select {
            table: "trees".to_string(),
            columns: "*".to_string(),
            filter: Some(Predicate::eq("code", code)),
        }
    }

    #[test]
    fn test_inline_rendering_matches_builder() {
        assert_eq!(
            select_by_code("C001").to_string(),
            QueryBuilder::select("trees", "*", Some("code='C001'"))
        );
    }

    #[test]
    fn test_placeholder_rendering() {
        let stmt = AqlStatement::Update {
            table: "trees".to_string(),
            assignments: vec![
                Assignment::new("status", "SAKIT"),
                Assignment::new("health_score", 40),
            ],
            filter: Some(Predicate::eq("id", "T1").and(Predicate::eq("location_id", "L1"))),
        };
        let (text, params) = stmt.render_placeholders();
        assert_eq!(
            text,
            "PUPUK trees DENGAN status=$1, health_score=$2 DIMANA id=$3 AND location_id=$4"
        );
        assert_eq!(
            params,
            vec![
                Value::from("SAKIT"),
                Value::Integer(40),
                Value::from("T1"),
                Value::from("L1")
            ]
        );
    }

    #[test]
    fn test_quote_in_value_stays_out_of_placeholder_text() {
        let (text, params) = select_by_code("C001' OR '1'='1").render_placeholders();
        assert_eq!(text, "PANEN * DARI trees DIMANA code=$1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_identifiers() {
        let stmt = AqlStatement::DropTable {
            name: "trees; DROP TABLE users".to_string(),
        };
        assert!(matches!(stmt.validate(), Err(AqlError::InvalidIdentifier(_))));

        let stmt = AqlStatement::Select {
            table: "trees".to_string(),
            columns: "*".to_string(),
            filter: Some(Predicate::eq("code = 'x' OR 1", "C001")),
        };
        assert!(matches!(stmt.validate(), Err(AqlError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_validate_insert_arity() {
        let stmt = AqlStatement::Insert {
            table: "trees".to_string(),
            columns: vec!["id".to_string(), "code".to_string()],
            values: vec![Value::from("T1")],
        };
        assert!(matches!(
            stmt.validate(),
            Err(AqlError::MalformedStatement { kind: StatementKind::Insert, .. })
        ));
    }

    #[test]
    fn test_predicate_all() {
        assert_eq!(Predicate::all(Vec::new()), None);
        let combined = Predicate::all(vec![
            Predicate::eq("status", "SEHAT"),
            Predicate::eq("location_id", "L1"),
        ]);
        assert_eq!(
            combined.map(|p| p.to_string()).as_deref(),
            Some("status='SEHAT' AND location_id='L1'")
        );
    }

    #[test]
    fn test_confirmation_token() {
        assert_eq!(
            StatementKind::DropTable.confirmation_token("logs_pohon"),
            "CONFIRM_BAKAR_LAHAN_logs_pohon"
        );
    }
}
