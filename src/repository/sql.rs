use super::fields::tree_from_row;
use super::tree::{
    TREES, Tree, TreeFilter, TreeRepository, TreeStatus, code_number, next_code_after,
    status_assignments,
};
use crate::aql::Predicate;
use crate::core::{AqlError, Value};
use crate::executor::{Backend, SafeExecutor};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Trees in a relational database, reached only through the [`SafeExecutor`].
pub struct SqlTreeRepository<B> {
    executor: Arc<SafeExecutor<B>>,
}

impl<B: Backend> SqlTreeRepository<B> {
    pub const fn new(executor: Arc<SafeExecutor<B>>) -> Self {
        Self { executor }
    }

    async fn find_one(&self, field: &'static str, value: &str) -> Result<Tree, AqlError> {
        let mut cursor = self
            .executor
            .select(TREES, "*", Some(Predicate::eq(field, value)))
            .await?;
        match cursor.next().await.transpose()? {
            Some(row) => Ok(tree_from_row(&row)),
            None => Err(AqlError::NotFound {
                entity: "tree",
                field,
                value: value.to_string(),
            }),
        }
    }
}

/// `1=1 [ORDER BY code] [LIMIT n] [OFFSET m]`, appended after the filter predicates.
fn pagination(filter: &TreeFilter) -> Option<Predicate> {
    let mut suffix = String::new();
    if filter.limit > 0 {
        suffix.push_str(&format!(" LIMIT {}", filter.limit));
    }
    if filter.offset > 0 {
        suffix.push_str(&format!(" OFFSET {}", filter.offset));
    }
    (!suffix.is_empty()).then(|| Predicate::raw(format!("1=1 ORDER BY code{suffix}")))
}

#[async_trait]
impl<B: Backend> TreeRepository for SqlTreeRepository<B> {
    async fn create(&self, tree: &Tree) -> Result<(), AqlError> {
        let (columns, values) = tree.insert_columns();
        self.executor.insert(TREES, &columns, values).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Tree, AqlError> {
        self.find_one("id", id).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Tree, AqlError> {
        self.find_one("code", code).await
    }

    async fn find_all(&self, filter: &TreeFilter) -> Result<Vec<Tree>, AqlError> {
        let predicate = Predicate::all(filter.predicate().into_iter().chain(pagination(filter)));
        let rows = self.executor.select(TREES, "*", predicate).await?.try_collect().await?;
        Ok(rows.iter().map(tree_from_row).collect())
    }

    async fn update(&self, tree: &Tree) -> Result<(), AqlError> {
        self.executor
            .update(
                TREES,
                tree.update_assignments(Utc::now()),
                Some(Predicate::eq("id", tree.id.as_str())),
            )
            .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &str,
        status: TreeStatus,
        health_score: i64,
    ) -> Result<(), AqlError> {
        self.executor
            .update(
                TREES,
                status_assignments(status, health_score, Utc::now()),
                Some(Predicate::eq("id", id)),
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AqlError> {
        self.executor.delete(TREES, Some(Predicate::eq("id", id))).await?;
        Ok(())
    }

    async fn next_code(&self) -> Result<String, AqlError> {
        let mut cursor = self
            .executor
            .select(TREES, "code", Some(Predicate::raw("1=1 ORDER BY code DESC LIMIT 1")))
            .await?;
        let max = cursor
            .next()
            .await
            .transpose()?
            .and_then(|row| row.first().and_then(Value::as_text).and_then(code_number))
            .unwrap_or(0);
        next_code_after(max)
    }

    async fn count_by_location(&self, location_id: &str) -> Result<i64, AqlError> {
        self.executor
            .count(TREES, Some(Predicate::eq("location_id", location_id)))
            .await
    }

    async fn count_by_status(&self, status: TreeStatus) -> Result<i64, AqlError> {
        self.executor
            .count(TREES, Some(Predicate::eq("status", status)))
            .await
    }
}
