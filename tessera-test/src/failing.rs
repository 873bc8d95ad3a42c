use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tessera_core::{
    ColumnConditions, Connector, ConnectorError, ConnectorLabel, ConnectorResult, EntityInfo,
    Fields, Page, Row,
};

/// A connector whose every operation fails with a connection error.
#[derive(Clone, Debug, Default)]
pub struct FailingConnector {
    calls: Arc<AtomicUsize>,
}

impl FailingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> ConnectorResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ConnectorError::connection(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "connector always fails",
        )))
    }
}

#[async_trait]
impl Connector for FailingConnector {
    async fn upsert(&self, _entity: &EntityInfo, _values: &Row) -> ConnectorResult<()> {
        self.fail()
    }

    async fn read(&self, _entity: &EntityInfo, _keys: &Row, _fields: &Fields) -> ConnectorResult<Row> {
        self.fail()
    }

    async fn range(
        &self,
        _entity: &EntityInfo,
        _conditions: &ColumnConditions,
        _fields: &Fields,
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        self.fail()
    }

    async fn scan(
        &self,
        _entity: &EntityInfo,
        _fields: &Fields,
        _token: Option<&str>,
        _limit: usize,
    ) -> ConnectorResult<Page> {
        self.fail()
    }

    async fn remove(&self, _entity: &EntityInfo, _keys: &Row) -> ConnectorResult<()> {
        self.fail()
    }

    async fn create_if_not_exists(&self, _entity: &EntityInfo, _values: &Row) -> ConnectorResult<()> {
        self.fail()
    }

    async fn remove_range(
        &self,
        _entity: &EntityInfo,
        _conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        self.fail()
    }

    async fn ping(&self) -> ConnectorResult<()> {
        self.fail()
    }

    async fn shutdown(&self) -> ConnectorResult<()> {
        self.fail()
    }

    fn label(&self) -> ConnectorLabel {
        ConnectorLabel::new_static("failing")
    }
}
