//! The storage capability every store implements.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ColumnConditions, ConnectorError, ConnectorLabel, ConnectorResult, EntityInfo, Row};

/// Selection of fields a caller wants back from a read.
///
/// Connectors may return more fields than requested; primary key fields are
/// always included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    /// Every column of the entity.
    #[default]
    All,
    /// Only the named columns.
    Only(Vec<String>),
}

impl Fields {
    /// Every column of the entity.
    pub fn all() -> Self {
        Self::All
    }

    /// Only the named columns.
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if `name` is part of the selection.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.iter().any(|n| n == name),
        }
    }

    /// Drops the fields of `row` that are not selected, keeping key fields of `entity`.
    pub fn project(&self, entity: &EntityInfo, row: Row) -> Row {
        match self {
            Self::All => row,
            Self::Only(_) => {
                let keys = entity.def.key_set();
                row.into_iter()
                    .filter(|(name, _)| self.contains(name) || keys.contains(name.as_str()))
                    .collect()
            }
        }
    }
}

/// One page of a range or scan result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Rows of this page, in store order.
    pub rows: Vec<Row>,
    /// Token to request the next page with, `None` when exhausted.
    pub next_token: Option<String>,
}

impl Page {
    /// Creates a page from rows and an optional continuation token.
    pub fn new(rows: Vec<Row>, next_token: Option<String>) -> Self {
        Self { rows, next_token }
    }
}

/// Storage capability over named entities keyed by partition and clustering fields.
///
/// Every operation takes the [`EntityInfo`] it applies to. Cancellation is
/// expressed by dropping the returned future.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Creates or overwrites a row.
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()>;

    /// Reads the row identified by the key fields in `keys`.
    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row>;

    /// Reads a page of rows matching `conditions`, starting after `token`.
    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page>;

    /// Reads a page of all rows of the entity, starting after `token`.
    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page>;

    /// Deletes the row identified by the key fields in `keys`.
    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()>;

    /// Creates a row, failing with [`ConnectorError::AlreadyExists`] if present.
    async fn create_if_not_exists(&self, _entity: &EntityInfo, _values: &Row) -> ConnectorResult<()> {
        Err(ConnectorError::Unsupported("create_if_not_exists"))
    }

    /// Deletes every row matching `conditions`.
    async fn remove_range(
        &self,
        _entity: &EntityInfo,
        _conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        Err(ConnectorError::Unsupported("remove_range"))
    }

    /// Checks that the store is reachable.
    async fn ping(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Releases resources held by the connector.
    async fn shutdown(&self) -> ConnectorResult<()> {
        Ok(())
    }

    /// Returns the label of this connector for tracing and metrics.
    fn label(&self) -> ConnectorLabel {
        ConnectorLabel::new_static("connector")
    }
}

#[async_trait]
impl<T> Connector for Arc<T>
where
    T: Connector + ?Sized,
{
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        (**self).upsert(entity, values).await
    }

    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row> {
        (**self).read(entity, keys, fields).await
    }

    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        (**self).range(entity, conditions, fields, token, limit).await
    }

    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        (**self).scan(entity, fields, token, limit).await
    }

    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        (**self).remove(entity, keys).await
    }

    async fn create_if_not_exists(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        (**self).create_if_not_exists(entity, values).await
    }

    async fn remove_range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        (**self).remove_range(entity, conditions).await
    }

    async fn ping(&self) -> ConnectorResult<()> {
        (**self).ping().await
    }

    async fn shutdown(&self) -> ConnectorResult<()> {
        (**self).shutdown().await
    }

    fn label(&self) -> ConnectorLabel {
        (**self).label()
    }
}

#[async_trait]
impl<T> Connector for Box<T>
where
    T: Connector + ?Sized,
{
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        (**self).upsert(entity, values).await
    }

    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row> {
        (**self).read(entity, keys, fields).await
    }

    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        (**self).range(entity, conditions, fields, token, limit).await
    }

    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        (**self).scan(entity, fields, token, limit).await
    }

    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        (**self).remove(entity, keys).await
    }

    async fn create_if_not_exists(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        (**self).create_if_not_exists(entity, values).await
    }

    async fn remove_range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        (**self).remove_range(entity, conditions).await
    }

    async fn ping(&self) -> ConnectorResult<()> {
        (**self).ping().await
    }

    async fn shutdown(&self) -> ConnectorResult<()> {
        (**self).shutdown().await
    }

    fn label(&self) -> ConnectorLabel {
        (**self).label()
    }
}
