// Module declarations
mod builder;
mod common;
mod statement;
mod translator;

// Re-export all public types
pub use builder::QueryBuilder;
pub use common::{is_identifier, validate_identifier};
pub use statement::{AqlStatement, Assignment, Predicate, StatementKind};
pub use translator::{TranslationMode, Translator, LIST_TABLES_SQL};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;

    fn translate(stmt: &AqlStatement) -> String {
        Translator::default().to_sql(&stmt.to_string()).unwrap()
    }

    #[test]
    fn test_build_then_translate_select() {
        let aql = QueryBuilder::select("trees", "*", Some("code='C001'"));
        assert_eq!(aql, "PANEN * DARI trees DIMANA code='C001'");
        assert_eq!(
            Translator::default().to_sql(&aql).unwrap(),
            "SELECT * FROM trees WHERE code='C001'"
        );
    }

    #[test]
    fn test_every_shape_translates() {
        let cases = vec![
            (
                AqlStatement::CreateTable {
                    name: "logs".to_string(),
                    columns: "id TEXT, note TEXT".to_string(),
                },
                "CREATE TABLE logs (id TEXT, note TEXT)",
            ),
            (
                AqlStatement::Insert {
                    table: "logs".to_string(),
                    columns: vec!["id".to_string(), "note".to_string()],
                    values: vec![Value::from("L1"), Value::from("ok")],
                },
                "INSERT INTO logs (id, note) VALUES ('L1', 'ok')",
            ),
            (
                AqlStatement::Select {
                    table: "logs".to_string(),
                    columns: "id".to_string(),
                    filter: None,
                },
                "SELECT id FROM logs",
            ),
            (
                AqlStatement::Update {
                    table: "logs".to_string(),
                    assignments: vec![Assignment::new("note", "done")],
                    filter: Some(Predicate::eq("id", "L1")),
                },
                "UPDATE logs SET note='done' WHERE id='L1'",
            ),
            (
                AqlStatement::Delete {
                    table: "logs".to_string(),
                    filter: Some(Predicate::eq("id", "L1")),
                },
                "DELETE FROM logs WHERE id='L1'",
            ),
            (
                AqlStatement::DropTable {
                    name: "logs".to_string(),
                },
                "DROP TABLE logs",
            ),
            (AqlStatement::ShowTables, LIST_TABLES_SQL),
            (
                AqlStatement::Count {
                    table: "logs".to_string(),
                    filter: Some(Predicate::eq("note", "ok")),
                },
                "SELECT COUNT(*) FROM logs WHERE note='ok'",
            ),
        ];

        assert_eq!(cases.len(), StatementKind::ALL.len());
        for (stmt, expected) in cases {
            assert_eq!(translate(&stmt), expected, "{} statement", stmt.kind());
            assert_eq!(Translator::classify(&stmt.to_string()), Some(stmt.kind()));
        }
    }

    #[test]
    fn test_placeholder_template_translates() {
        let stmt = AqlStatement::Insert {
            table: "trees".to_string(),
            columns: vec!["id".to_string(), "code".to_string()],
            values: vec![Value::from("T1"), Value::from("C001")],
        };
        let (template, params) = stmt.render_placeholders();
        assert_eq!(
            Translator::default().to_sql(&template).unwrap(),
            "INSERT INTO trees (id, code) VALUES ($1, $2)"
        );
        assert_eq!(params.len(), 2);
    }
}
