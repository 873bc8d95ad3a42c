//! The fallback connector.

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tessera_core::{
    ColumnConditions, Connector, ConnectorError, ConnectorLabel, ConnectorResult, EntityInfo,
    FieldValue, Fields, Offload, Page, Raw, Row,
};
use tessera_format::{BincodeFormat, Format, FormatError, FormatExt};
use tracing::debug;

use super::builder::FallbackConnectorBuilder;
use super::key::{RangeQuery, RangeResults, cache_key};
use super::schema::{VALUE_COLUMN, entry_row, key_row, key_value_entity};
use super::writes::CacheWrites;
use crate::config::FallbackConfig;
use crate::error::CacheWriteError;
use crate::metrics;
use crate::offload::OffloadManager;

/// A connector that keeps a fallback copy of everything it sees.
///
/// Every operation goes to the **origin**, whose result is always the one
/// returned. Alongside, successful reads and ranges, upserts and removes are
/// mirrored into the **fallback** store as key-value entries: the key is
/// derived from the primary key fields (or the range query), the value is the
/// encoded row (or page). When the origin fails a read, range or scan, the
/// fallback entry under the same key is decoded and returned instead. If that
/// does not work out either, the caller gets the origin's error unchanged.
///
/// Fallback failures are never returned to callers. They are logged at
/// `debug` and counted when the `metrics` feature is enabled.
///
/// # Type Parameters
///
/// * `O` - Origin connector, the source of truth.
/// * `F` - Fallback connector. Cloned into every cache write.
/// * `E` - Format of cache keys and values. Default: [`BincodeFormat`].
/// * `D` - Offload used by background writes. Default: [`OffloadManager`].
///
/// # Cache writes
///
/// Writes run in the background by default: the operation returns without
/// waiting for the fallback, and the write keeps running even if the
/// operation's future is dropped. Concurrent background writes to the same
/// key are not ordered; the last one to finish wins. Use
/// [`FallbackConnectorBuilder::inline_writes`] to await writes instead, and
/// [`flush`](Self::flush) to wait for background ones.
///
/// Background writes are spawned with tokio and need a running runtime.
///
/// # Example
///
/// ```
/// use tessera::FallbackConnector;
/// use tessera_format::JsonFormat;
/// use tessera_moka::MokaConnector;
/// # use tessera_test::MemoryConnector;
///
/// # let origin = MemoryConnector::new();
/// let fallback = MokaConnector::builder().max_entries(10_000).build();
/// let connector = FallbackConnector::builder(origin, fallback, JsonFormat)
///     .label("accounts")
///     .build();
/// # let _ = connector;
/// ```
pub struct FallbackConnector<O, F, E = BincodeFormat, D = OffloadManager> {
    pub(super) origin: O,
    pub(super) fallback: F,
    pub(super) encoder: E,
    pub(super) writes: CacheWrites<D>,
    pub(super) label: ConnectorLabel,
}

impl<O, F, E> FallbackConnector<O, F, E, OffloadManager>
where
    O: Connector,
    F: Connector + Clone + 'static,
    E: Format + Clone + 'static,
{
    /// Creates a connector with background cache writes on a default
    /// [`OffloadManager`].
    pub fn new(origin: O, fallback: F, encoder: E) -> Self {
        Self::builder(origin, fallback, encoder).build()
    }

    /// Creates a builder with the three required collaborators.
    pub fn builder(origin: O, fallback: F, encoder: E) -> FallbackConnectorBuilder<O, F, E> {
        FallbackConnectorBuilder::new(origin, fallback, encoder)
    }

    /// Creates a connector whose cache-write strategy comes from `config`.
    pub fn from_config(origin: O, fallback: F, encoder: E, config: &FallbackConfig) -> Self {
        FallbackConnectorBuilder::new(origin, fallback, encoder)
            .config(config)
            .build()
    }
}

impl<O, F, E, D> FallbackConnector<O, F, E, D>
where
    O: Connector,
    F: Connector + Clone + 'static,
    E: Format + Clone + 'static,
    D: Offload,
{
    /// Returns the origin connector.
    pub fn origin(&self) -> &O {
        &self.origin
    }

    /// Returns the fallback connector.
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Returns the format of cache keys and values.
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Returns the cache-write strategy.
    pub fn writes(&self) -> &CacheWrites<D> {
        &self.writes
    }

    /// Waits until background cache writes dispatched so far have finished.
    pub async fn flush(&self) {
        self.writes.drain().await;
    }

    async fn cache_write<W>(&self, kind: &'static str, work: W)
    where
        W: Future<Output = Result<(), CacheWriteError>> + Send + 'static,
    {
        let label = self.label.clone();
        let observed = async move {
            let result = work.await;
            metrics::record_cache_write(label.as_str(), kind, result.is_ok());
            result
        };
        if let Err(error) = self.writes.dispatch(kind, observed).await {
            debug!(connector = %self.label, kind, ?error, "Cache write failed");
        }
    }

    /// Answers from the fallback after the origin failed.
    ///
    /// `None` means the origin error stands.
    async fn recover<T>(
        &self,
        operation: &'static str,
        entity: &EntityInfo,
        key: Result<Raw, FormatError>,
    ) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        match self.lookup(entity, key).await {
            Ok(value) => {
                debug!(connector = %self.label, operation, "Origin failed, answered from fallback");
                metrics::record_fallback_recovery(self.label.as_str(), operation, true);
                Some(value)
            }
            Err(error) => {
                debug!(connector = %self.label, operation, ?error, "Fallback has no usable entry");
                metrics::record_fallback_recovery(self.label.as_str(), operation, false);
                None
            }
        }
    }

    async fn lookup<T>(
        &self,
        entity: &EntityInfo,
        key: Result<Raw, FormatError>,
    ) -> ConnectorResult<T>
    where
        T: DeserializeOwned + Send,
    {
        let key = key?;
        let entry = self
            .fallback
            .read(&key_value_entity(entity), &key_row(key), &Fields::All)
            .await?;
        let value = entry
            .get(VALUE_COLUMN)
            .and_then(FieldValue::as_blob)
            .ok_or_else(|| ConnectorError::NotFound(format!("cache value of {entity}")))?;
        Ok(self.encoder.decode(value)?)
    }
}

/// Stores `value` under `key` in the fallback.
fn store<F, E, T>(
    fallback: F,
    encoder: E,
    entity: EntityInfo,
    key: Result<Raw, FormatError>,
    value: T,
) -> impl Future<Output = Result<(), CacheWriteError>> + Send + 'static
where
    F: Connector + 'static,
    E: Format + 'static,
    T: Serialize + Send + 'static,
{
    async move {
        let key = key.map_err(CacheWriteError::Key)?;
        let value = encoder.encode(&value).map_err(CacheWriteError::Value)?;
        fallback
            .upsert(&entity, &entry_row(key, value))
            .await
            .map_err(CacheWriteError::Fallback)
    }
}

/// Removes the entry under `key` from the fallback.
fn evict<F>(
    fallback: F,
    entity: EntityInfo,
    key: Result<Raw, FormatError>,
) -> impl Future<Output = Result<(), CacheWriteError>> + Send + 'static
where
    F: Connector + 'static,
{
    async move {
        let key = key.map_err(CacheWriteError::Key)?;
        fallback
            .remove(&entity, &key_row(key))
            .await
            .map_err(CacheWriteError::Fallback)
    }
}

#[async_trait]
impl<O, F, E, D> Connector for FallbackConnector<O, F, E, D>
where
    O: Connector,
    F: Connector + Clone + 'static,
    E: Format + Clone + 'static,
    D: Offload,
{
    #[tracing::instrument(skip_all, fields(entity = %entity, connector = %self.label), level = "trace")]
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        let key = cache_key(&self.encoder, entity, values);
        let work = store(
            self.fallback.clone(),
            self.encoder.clone(),
            key_value_entity(entity),
            key,
            values.clone(),
        );
        self.cache_write("cache_upsert", work).await;
        self.origin.upsert(entity, values).await
    }

    #[tracing::instrument(skip_all, fields(entity = %entity, connector = %self.label), level = "trace")]
    async fn read(&self, entity: &EntityInfo, keys: &Row, _fields: &Fields) -> ConnectorResult<Row> {
        let key = cache_key(&self.encoder, entity, keys);
        match self.origin.read(entity, keys, &Fields::All).await {
            Ok(row) => {
                let work = store(
                    self.fallback.clone(),
                    self.encoder.clone(),
                    key_value_entity(entity),
                    key,
                    row.clone(),
                );
                self.cache_write("cache_read", work).await;
                Ok(row)
            }
            Err(error) => match self.recover::<Row>("read", entity, key).await {
                Some(row) => Ok(row),
                None => Err(error),
            },
        }
    }

    #[tracing::instrument(skip_all, fields(entity = %entity, connector = %self.label), level = "trace")]
    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        _fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        let key = RangeQuery::new(conditions, token, limit).cache_key(&self.encoder);
        match self
            .origin
            .range(entity, conditions, &Fields::All, token, limit)
            .await
        {
            Ok(page) => {
                let work = store(
                    self.fallback.clone(),
                    self.encoder.clone(),
                    key_value_entity(entity),
                    key,
                    RangeResults::from(page.clone()),
                );
                self.cache_write("cache_range", work).await;
                Ok(page)
            }
            Err(error) => match self.recover::<RangeResults>("range", entity, key).await {
                Some(results) => Ok(results.into()),
                None => Err(error),
            },
        }
    }

    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.range(entity, &ColumnConditions::new(), fields, token, limit)
            .await
    }

    #[tracing::instrument(skip_all, fields(entity = %entity, connector = %self.label), level = "trace")]
    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        let key = cache_key(&self.encoder, entity, keys);
        let work = evict(self.fallback.clone(), key_value_entity(entity), key);
        self.cache_write("cache_remove", work).await;
        self.origin.remove(entity, keys).await
    }

    async fn create_if_not_exists(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        self.origin.create_if_not_exists(entity, values).await
    }

    async fn remove_range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        self.origin.remove_range(entity, conditions).await
    }

    async fn ping(&self) -> ConnectorResult<()> {
        self.origin.ping().await
    }

    #[tracing::instrument(skip_all, fields(connector = %self.label), level = "debug")]
    async fn shutdown(&self) -> ConnectorResult<()> {
        self.flush().await;
        let result = self.origin.shutdown().await;
        if let Err(error) = self.fallback.shutdown().await {
            debug!(?error, "Fallback shutdown failed");
        }
        result
    }

    fn label(&self) -> ConnectorLabel {
        self.label.clone()
    }
}
