//! Moka connector implementation.

use async_trait::async_trait;
use moka::future::Cache;
use smol_str::SmolStr;
use tessera_core::{
    ColumnConditions, Connector, ConnectorError, ConnectorLabel, ConnectorResult, EntityInfo,
    Fields, Page, Raw, Row,
};
use tessera_format::{BincodeFormat, Format, FormatExt};

use crate::metrics::record_capacity;

/// Address of a row inside a [`MokaConnector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    /// Entity the row belongs to (reference and name).
    pub entity: SmolStr,
    /// Encoded primary key values, in declaration order.
    pub key: Raw,
}

impl StoreKey {
    /// Approximate heap footprint of the key.
    pub(crate) fn memory_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.entity.len() + self.key.len()
    }
}

/// In-memory key-value connector powered by Moka.
///
/// Rows are stored whole, addressed by entity and the encoded values of every
/// primary key column. Reads of missing rows fail with
/// [`ConnectorError::NotFound`]. `scan` walks the rows of one entity in key
/// order; `range` is not supported.
///
/// # Type Parameters
///
/// * `S` - Format used to encode primary key values. Default: [`BincodeFormat`].
///
/// # Caveats
///
/// - Data is **not persisted** and **not shared** across processes
/// - When capacity is exceeded, rows are evicted; a read may then report
///   `NotFound` for a row that was written earlier
#[derive(Clone)]
pub struct MokaConnector<S = BincodeFormat>
where
    S: Format,
{
    /// The underlying Moka async cache instance.
    pub cache: Cache<StoreKey, Row>,
    /// Format used to encode primary key values.
    pub key_format: S,
    /// Label identifying this connector.
    pub label: ConnectorLabel,
}

impl<S> std::fmt::Debug for MokaConnector<S>
where
    S: Format,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaConnector")
            .field("label", &self.label)
            .field("cache", &self.cache)
            .field("key_format", &self.key_format)
            .finish()
    }
}

impl MokaConnector<BincodeFormat> {
    /// Creates a new builder for `MokaConnector`.
    ///
    /// Capacity must be configured with `max_entries` or `max_bytes` before
    /// `build` becomes available.
    pub fn builder() -> crate::builder::MokaConnectorBuilder<crate::builder::NoCapacity> {
        crate::builder::MokaConnectorBuilder::new()
    }
}

impl<S> MokaConnector<S>
where
    S: Format,
{
    /// Returns the underlying cache, mostly useful for `run_pending_tasks` in tests.
    pub fn cache(&self) -> &Cache<StoreKey, Row> {
        &self.cache
    }

    fn entity_id(entity: &EntityInfo) -> SmolStr {
        SmolStr::from(entity.to_string())
    }

    fn store_key(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<StoreKey> {
        let mut parts = Vec::with_capacity(entity.def.key.partition_keys.len());
        for name in entity.def.key.names() {
            let value = values.get(name).ok_or_else(|| {
                ConnectorError::InvalidArgument(format!(
                    "missing primary key field `{name}` for {entity}"
                ))
            })?;
            parts.push(value);
        }
        Ok(StoreKey {
            entity: Self::entity_id(entity),
            key: self.key_format.encode(&parts)?,
        })
    }

    fn record_capacity(&self) {
        record_capacity(
            self.label.as_str(),
            self.cache.entry_count(),
            self.cache.weighted_size(),
        );
    }
}

fn parse_offset(token: Option<&str>) -> ConnectorResult<usize> {
    token
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| ConnectorError::InvalidArgument(format!("invalid page token `{t}`")))
        })
        .transpose()
        .map(|offset| offset.unwrap_or(0))
}

#[async_trait]
impl<S> Connector for MokaConnector<S>
where
    S: Format + Send + Sync,
{
    #[tracing::instrument(skip_all, fields(entity = %entity), level = "trace")]
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        let key = self.store_key(entity, values)?;
        self.cache.insert(key, values.clone()).await;
        self.record_capacity();
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(entity = %entity), level = "trace")]
    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row> {
        let key = self.store_key(entity, keys)?;
        match self.cache.get(&key).await {
            Some(row) => Ok(fields.project(entity, row)),
            None => Err(ConnectorError::NotFound(format!("row of {entity}"))),
        }
    }

    async fn range(
        &self,
        _entity: &EntityInfo,
        _conditions: &ColumnConditions,
        _fields: &Fields,
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        Err(ConnectorError::Unsupported("range"))
    }

    #[tracing::instrument(skip_all, fields(entity = %entity), level = "trace")]
    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        let offset = parse_offset(token)?;
        let entity_id = Self::entity_id(entity);

        let mut entries: Vec<(Raw, Row)> = self
            .cache
            .iter()
            .filter(|(key, _)| key.entity == entity_id)
            .map(|(key, row)| (key.key.clone(), row))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let total = entries.len();
        let rows: Vec<Row> = entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, row)| fields.project(entity, row))
            .collect();
        let next = offset + rows.len();
        let next_token = (next < total && !rows.is_empty()).then(|| next.to_string());

        Ok(Page::new(rows, next_token))
    }

    #[tracing::instrument(skip_all, fields(entity = %entity), level = "trace")]
    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        let key = self.store_key(entity, keys)?;
        self.cache.remove(&key).await;
        self.record_capacity();
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(entity = %entity), level = "trace")]
    async fn create_if_not_exists(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        let key = self.store_key(entity, values)?;
        let row = values.clone();
        let entry = self
            .cache
            .entry(key)
            .or_insert_with(async move { row })
            .await;
        if entry.is_fresh() {
            self.record_capacity();
            Ok(())
        } else {
            Err(ConnectorError::AlreadyExists(format!("row of {entity}")))
        }
    }

    fn label(&self) -> ConnectorLabel {
        self.label.clone()
    }
}
