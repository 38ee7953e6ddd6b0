use super::fields::{Record, tree_from_record};
use super::tree::{
    TREE_COLUMNS, TREES, Tree, TreeFilter, TreeRepository, TreeStatus, code_number,
    next_code_after, status_assignments,
};
use crate::aql::{AqlStatement, Predicate};
use crate::core::AqlError;
use crate::network::{Connector, RemoteClient, TcpConnector};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as Json;
use std::sync::Arc;

/// Rows carried in a response `data` field.
///
/// SawitDB sends either a JSON document encoded as a string or the document
/// itself. A string starting with `Error` is an engine failure reported as data.
pub fn parse_records(data: Json) -> Result<Vec<Record>, AqlError> {
    let data = match data {
        Json::String(text) if text.starts_with("Error") => return Err(AqlError::Engine(text)),
        Json::String(text) => serde_json::from_str(&text)?,
        other => other,
    };
    match data {
        Json::Null => Ok(Vec::new()),
        Json::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Json::Object(record) => Ok(record),
                other => Err(AqlError::Protocol(format!("expected a row object, got {other}"))),
            })
            .collect(),
        other => Err(AqlError::Protocol(format!("expected a list of rows, got {other}"))),
    }
}

/// Trees stored in SawitDB.
///
/// Filtering and pagination happen in memory: list operations fetch the whole
/// collection because the engine's predicates cannot be relied on.
pub struct SawitTreeRepository<C: Connector = TcpConnector> {
    client: Arc<RemoteClient<C>>,
}

impl<C: Connector> SawitTreeRepository<C> {
    pub const fn new(client: Arc<RemoteClient<C>>) -> Self {
        Self { client }
    }

    /// Creates the repository and makes sure the `trees` collection exists.
    pub async fn open(client: Arc<RemoteClient<C>>) -> Self {
        let repo = Self::new(client);
        repo.ensure_collection().await;
        repo
    }

    /// Issues `LAHAN trees`. The engine treats it as idempotent, so failures are only logged.
    pub async fn ensure_collection(&self) {
        let stmt = AqlStatement::CreateTable {
            name: TREES.to_string(),
            columns: String::new(),
        };
        if let Err(e) = self.send(&stmt).await {
            tracing::warn!(error = %e, "could not ensure trees collection");
        }
    }

    pub fn client(&self) -> &RemoteClient<C> {
        &self.client
    }

    async fn send(&self, stmt: &AqlStatement) -> Result<Json, AqlError> {
        stmt.validate()?;
        self.client.query(&stmt.to_string()).await
    }

    async fn select(
        &self,
        columns: &str,
        filter: Option<Predicate>,
    ) -> Result<Vec<Record>, AqlError> {
        let data = self
            .send(&AqlStatement::Select {
                table: TREES.to_string(),
                columns: columns.to_string(),
                filter,
            })
            .await?;
        parse_records(data)
    }

    async fn select_trees(&self, filter: Option<Predicate>) -> Result<Vec<Tree>, AqlError> {
        Ok(self.select("*", filter).await?.iter().map(tree_from_record).collect())
    }

    async fn find_one(&self, field: &'static str, value: &str) -> Result<Tree, AqlError> {
        let trees = self
            .select_trees(Some(Predicate::eq(field, value)))
            .await
            .map_err(|e| e.context("failed to query tree"))?;
        trees
            .into_iter()
            .find(|t| match field {
                "id" => t.id == value,
                _ => t.code == value,
            })
            .ok_or_else(|| AqlError::NotFound {
                entity: "tree",
                field,
                value: value.to_string(),
            })
    }

    async fn count_matching(&self, filter: TreeFilter) -> Result<i64, AqlError> {
        let trees = self
            .select_trees(filter.predicate())
            .await
            .map_err(|e| e.context("failed to count trees"))?;
        let count = trees.iter().filter(|t| filter.matches(t)).count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl<C: Connector> TreeRepository for SawitTreeRepository<C> {
    async fn create(&self, tree: &Tree) -> Result<(), AqlError> {
        let stmt = AqlStatement::Insert {
            table: TREES.to_string(),
            columns: TREE_COLUMNS.iter().map(ToString::to_string).collect(),
            values: tree.values(),
        };
        self.send(&stmt)
            .await
            .map_err(|e| e.context("failed to create tree"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Tree, AqlError> {
        self.find_one("id", id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Tree, AqlError> {
        self.find_one("code", code).await
    }

    async fn find_all(&self, filter: &TreeFilter) -> Result<Vec<Tree>, AqlError> {
        let trees = self
            .select_trees(None)
            .await
            .map_err(|e| e.context("failed to query trees"))?;
        let matched = trees.into_iter().filter(|t| filter.matches(t)).collect();
        Ok(filter.paginate(matched))
    }

    async fn update(&self, tree: &Tree) -> Result<(), AqlError> {
        let stmt = AqlStatement::Update {
            table: TREES.to_string(),
            assignments: tree.update_assignments(Utc::now()),
            filter: Some(Predicate::eq("id", tree.id.as_str())),
        };
        self.send(&stmt)
            .await
            .map_err(|e| e.context("failed to update tree"))?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: TreeStatus,
        health_score: i64,
    ) -> Result<(), AqlError> {
        let stmt = AqlStatement::Update {
            table: TREES.to_string(),
            assignments: status_assignments(status, health_score, Utc::now()),
            filter: Some(Predicate::eq("id", id)),
        };
        self.send(&stmt)
            .await
            .map_err(|e| e.context("failed to update status"))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AqlError> {
        let stmt = AqlStatement::Delete {
            table: TREES.to_string(),
            filter: Some(Predicate::eq("id", id)),
        };
        self.send(&stmt)
            .await
            .map_err(|e| e.context("failed to delete tree"))?;
        Ok(())
    }

    async fn next_code(&self) -> Result<String, AqlError> {
        let records = self
            .select("code", None)
            .await
            .map_err(|e| e.context("failed to query codes"))?;
        let max = records
            .iter()
            .filter_map(|r| r.get("code").and_then(Json::as_str))
            .filter_map(code_number)
            .max()
            .unwrap_or(0);
        next_code_after(max)
    }

    async fn count_by_location(&self, location_id: &str) -> Result<i64, AqlError> {
        self.count_matching(TreeFilter {
            location_id: Some(location_id.to_string()),
            ..TreeFilter::default()
        })
        .await
    }

    async fn count_by_status(&self, status: TreeStatus) -> Result<i64, AqlError> {
        self.count_matching(TreeFilter {
            status: Some(status),
            ..TreeFilter::default()
        })
        .await
    }
}
