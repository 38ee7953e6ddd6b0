use super::backend::{Backend, BoundQuery, RowCursor};
use crate::aql::{AqlStatement, Assignment, Predicate, StatementKind, TranslationMode, Translator};
use crate::core::{AqlError, Value};
use crate::logging::AUDIT_TARGET;
use chrono::{SecondsFormat, Utc};

/// Parameters of a guarded `BAKAR LAHAN`.
#[derive(Debug, Clone, Default)]
pub struct DropTableRequest {
    pub table: String,
    /// Must equal `CONFIRM_BAKAR_LAHAN_<table>`.
    pub confirmation: String,
    pub justification: String,
    pub requested_by: String,
}

impl DropTableRequest {
    pub fn expected_confirmation(&self) -> String {
        StatementKind::DropTable.confirmation_token(&self.table)
    }
}

/// Entry point for every operation against the relational backend.
///
/// Statements are validated, rendered with placeholders, translated and then
/// executed with their values bound. Backend errors are returned unchanged.
pub struct SafeExecutor<B> {
    backend: B,
    translator: Translator,
}

impl<B: Backend> SafeExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self::with_mode(backend, TranslationMode::Strict)
    }

    pub fn with_mode(backend: B, mode: TranslationMode) -> Self {
        Self {
            backend,
            translator: Translator::new(mode),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validates and translates a statement into SQL with bound parameters.
    pub fn prepare(&self, stmt: &AqlStatement) -> Result<BoundQuery, AqlError> {
        stmt.validate()?;
        let (aql, params) = stmt.render_placeholders();
        let sql = self.translator.to_sql(&aql)?;
        tracing::debug!(kind = %stmt.kind(), aql = %aql, sql = %sql, "translated statement");
        Ok(BoundQuery::new(sql, params))
    }

    async fn execute(&self, stmt: &AqlStatement) -> Result<u64, AqlError> {
        let query = self.prepare(stmt)?;
        self.backend.execute(&query).await
    }

    async fn query(&self, stmt: &AqlStatement) -> Result<RowCursor, AqlError> {
        let query = self.prepare(stmt)?;
        self.backend.query(&query).await
    }

    /// `LAHAN <table> (<columns>)`; column definitions are passed through as written.
    pub async fn create_table(&self, table: &str, columns: &str) -> Result<(), AqlError> {
        tracing::info!(table, "creating table");
        self.execute(&AqlStatement::CreateTable {
            name: table.to_string(),
            columns: columns.to_string(),
        })
        .await
        .map(|_| ())
    }

    pub async fn insert(
        &self,
        table: &str,
        columns: &[&str],
        values: Vec<Value>,
    ) -> Result<u64, AqlError> {
        self.execute(&AqlStatement::Insert {
            table: table.to_string(),
            columns: columns.iter().map(ToString::to_string).collect(),
            values,
        })
        .await
    }

    pub async fn select(
        &self,
        table: &str,
        columns: &str,
        filter: Option<Predicate>,
    ) -> Result<RowCursor, AqlError> {
        self.query(&AqlStatement::Select {
            table: table.to_string(),
            columns: columns.to_string(),
            filter,
        })
        .await
    }

    pub async fn update(
        &self,
        table: &str,
        assignments: Vec<Assignment>,
        filter: Option<Predicate>,
    ) -> Result<u64, AqlError> {
        self.execute(&AqlStatement::Update {
            table: table.to_string(),
            assignments,
            filter,
        })
        .await
    }

    pub async fn delete(&self, table: &str, filter: Option<Predicate>) -> Result<u64, AqlError> {
        self.execute(&AqlStatement::Delete {
            table: table.to_string(),
            filter,
        })
        .await
    }

    pub async fn show_tables(&self) -> Result<RowCursor, AqlError> {
        self.query(&AqlStatement::ShowTables).await
    }

    pub async fn count(&self, table: &str, filter: Option<Predicate>) -> Result<i64, AqlError> {
        let query = self.prepare(&AqlStatement::Count {
            table: table.to_string(),
            filter,
        })?;
        let row = self.backend.query_row(&query).await?;
        row.as_ref()
            .and_then(|r| r.first())
            .and_then(Value::as_int)
            .ok_or_else(|| AqlError::Backend(format!("COUNT on '{table}' returned no integer")))
    }

    /// Drops a table after the confirmation gate passes.
    ///
    /// The drop only reaches the backend when the token matches and both the
    /// justification and the requester are present. An executed drop is always
    /// bracketed by a warn-level audit event and a terminal info or error event.
    pub async fn safe_drop_table(&self, request: &DropTableRequest) -> Result<(), AqlError> {
        let table = request.table.as_str();
        let requested_by = request.requested_by.as_str();

        if request.confirmation != request.expected_confirmation() {
            tracing::error!(
                target: AUDIT_TARGET,
                table,
                requested_by,
                "security violation: BAKAR LAHAN attempted without confirmation"
            );
            return Err(AqlError::ConfirmationMismatch {
                table: table.to_string(),
            });
        }

        let missing = if request.justification.trim().is_empty() {
            Some("justification")
        } else if requested_by.trim().is_empty() {
            Some("requester")
        } else {
            None
        };
        if let Some(field) = missing {
            tracing::error!(
                target: AUDIT_TARGET,
                table,
                requested_by,
                missing = field,
                "BAKAR LAHAN blocked"
            );
            return Err(AqlError::MissingMetadata(field));
        }

        let query = match self.prepare(&AqlStatement::DropTable {
            name: table.to_string(),
        }) {
            Ok(query) => query,
            Err(e) => {
                tracing::error!(
                    target: AUDIT_TARGET,
                    table,
                    requested_by,
                    error = %e,
                    "BAKAR LAHAN blocked"
                );
                return Err(e);
            }
        };

        tracing::warn!(
            target: AUDIT_TARGET,
            table,
            justification = %request.justification,
            requested_by,
            timestamp = %Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "BAKAR LAHAN initiated"
        );

        match self.backend.execute(&query).await {
            Ok(_) => {
                tracing::info!(target: AUDIT_TARGET, table, requested_by, "BAKAR LAHAN succeeded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(target: AUDIT_TARGET, table, error = %e, "BAKAR LAHAN failed");
                Err(AqlError::DropFailed {
                    table: table.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::RecordingBackend;
    use crate::logging::capture::AuditCapture;
    use tracing::Level;

    fn executor() -> (RecordingBackend, SafeExecutor<RecordingBackend>) {
        let backend = RecordingBackend::new();
        (backend.clone(), SafeExecutor::new(backend))
    }

    fn drop_request(table: &str) -> DropTableRequest {
        DropTableRequest {
            table: table.to_string(),
            confirmation: format!("CONFIRM_BAKAR_LAHAN_{table}"),
            justification: "Migration to schema version 2.0".to_string(),
            requested_by: "admin@tree-id.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_binds_values() {
        let (backend, exec) = executor();
        backend.set_affected(1);
        let affected = exec
            .insert(
                "trees",
                &["id", "code"],
                vec![Value::from("T1"), Value::from("C001' OR '1'='1")],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let calls = backend.calls();
        assert_eq!(calls[0].sql, "INSERT INTO trees (id, code) VALUES ($1, $2)");
        assert_eq!(calls[0].params[1], Value::from("C001' OR '1'='1"));
    }

    #[tokio::test]
    async fn test_select_and_update_sql() {
        let (backend, exec) = executor();
        backend.push_rows(&["code"], vec![vec![Value::from("C001")]]);
        let rows = exec
            .select("trees", "code", Some(Predicate::eq("status", "SEHAT")))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        exec.update(
            "trees",
            vec![Assignment::new("status", "SAKIT")],
            Some(Predicate::eq("id", "T1")),
        )
        .await
        .unwrap();
        exec.delete("trees", Some(Predicate::eq("id", "T1"))).await.unwrap();

        assert_eq!(
            backend.sql(),
            vec![
                "SELECT code FROM trees WHERE status=$1",
                "UPDATE trees SET status=$1 WHERE id=$2",
                "DELETE FROM trees WHERE id=$1",
            ]
        );
    }

    #[tokio::test]
    async fn test_count_reads_first_column() {
        let (backend, exec) = executor();
        backend.push_rows(&["count"], vec![vec![Value::Integer(7)]]);
        assert_eq!(exec.count("trees", None).await.unwrap(), 7);
        assert_eq!(backend.sql(), vec!["SELECT COUNT(*) FROM trees"]);

        assert!(matches!(exec.count("trees", None).await, Err(AqlError::Backend(_))));
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_executes() {
        let (backend, exec) = executor();
        let err = exec.delete("trees; --", None).await.unwrap_err();
        assert!(matches!(err, AqlError::InvalidIdentifier(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_returned_unchanged() {
        let (backend, exec) = executor();
        backend.fail_next("relation \"pohon\" does not exist");
        let err = exec.show_tables().await.unwrap_err();
        assert!(matches!(err, AqlError::Backend(ref m) if m.contains("pohon")));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_drop_confirmation_mismatch_never_executes() {
        let capture = AuditCapture::default();
        let _guard = capture.install();
        let (backend, exec) = executor();

        let mut request = drop_request("logs_pohon");
        request.confirmation = "CONFIRM_BAKAR_LAHAN_trees".to_string();
        let err = exec.safe_drop_table(&request).await.unwrap_err();

        assert!(
            matches!(err, AqlError::ConfirmationMismatch { ref table } if table == "logs_pohon")
        );
        assert!(backend.calls().is_empty());
        let entries = capture.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, Level::ERROR);
        assert_eq!(entries[0].field("requested_by"), Some("admin@tree-id.com"));
    }

    #[tokio::test]
    async fn test_drop_missing_metadata_never_executes() {
        let (backend, exec) = executor();

        let mut request = drop_request("logs_pohon");
        request.justification = "  ".to_string();
        assert!(matches!(
            exec.safe_drop_table(&request).await,
            Err(AqlError::MissingMetadata("justification"))
        ));

        let mut request = drop_request("logs_pohon");
        request.requested_by = String::new();
        assert!(matches!(
            exec.safe_drop_table(&request).await,
            Err(AqlError::MissingMetadata("requester"))
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_drop_executes_once_with_audit_trail() {
        let capture = AuditCapture::default();
        let _guard = capture.install();
        let (backend, exec) = executor();

        exec.safe_drop_table(&drop_request("logs_pohon")).await.unwrap();

        assert_eq!(backend.sql(), vec!["DROP TABLE logs_pohon"]);
        let entries = capture.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, Level::WARN);
        assert_eq!(entries[0].field("table"), Some("logs_pohon"));
        assert_eq!(
            entries[0].field("justification"),
            Some("Migration to schema version 2.0")
        );
        assert!(entries[0].field("timestamp").is_some());
        assert_eq!(entries[1].level, Level::INFO);
    }

    #[tokio::test]
    async fn test_drop_failure_is_wrapped_and_audited() {
        let capture = AuditCapture::default();
        let _guard = capture.install();
        let (backend, exec) = executor();
        backend.fail_next("table \"logs_pohon\" does not exist");

        let err = exec.safe_drop_table(&drop_request("logs_pohon")).await.unwrap_err();

        assert!(matches!(err, AqlError::DropFailed { .. }));
        assert!(matches!(err.root(), AqlError::Backend(_)));
        let levels: Vec<_> = capture.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![Level::WARN, Level::ERROR]);
    }
}
