use std::sync::Arc;

use async_trait::async_trait;
use tessera_core::{
    ColumnConditions, Connector, ConnectorLabel, ConnectorResult, EntityInfo, Fields, Page, Row,
};
use tokio::sync::watch;

/// Wraps a connector and holds its writes back until [`open`](Self::open) is called.
///
/// Reads are never held back. Useful to observe that a caller did not wait
/// for a write.
#[derive(Clone, Debug)]
pub struct GatedConnector<C> {
    inner: C,
    gate: Arc<watch::Sender<bool>>,
}

impl<C> GatedConnector<C> {
    /// Wraps `inner` with the gate closed.
    pub fn closed(inner: C) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gate: Arc::new(gate),
        }
    }

    /// Releases held and future writes.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn pass(&self) {
        let mut gate = self.gate.subscribe();
        // Err only if the sender is gone, and we hold it.
        let _ = gate.wait_for(|open| *open).await;
    }
}

#[async_trait]
impl<C> Connector for GatedConnector<C>
where
    C: Connector,
{
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        self.pass().await;
        self.inner.upsert(entity, values).await
    }

    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row> {
        self.inner.read(entity, keys, fields).await
    }

    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.inner.range(entity, conditions, fields, token, limit).await
    }

    async fn scan(
        &self,
        entity: &EntityInfo,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.inner.scan(entity, fields, token, limit).await
    }

    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        self.pass().await;
        self.inner.remove(entity, keys).await
    }

    fn label(&self) -> ConnectorLabel {
        self.inner.label()
    }
}
