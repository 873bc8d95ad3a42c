use std::cmp::Ordering as CmpOrdering;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tessera_core::{
    ColumnConditions, Connector, ConnectorError, ConnectorLabel, ConnectorResult, EntityInfo,
    FieldValue, Fields, Page, Raw, Row,
};
use tessera_format::{BincodeFormat, FormatExt};

/// Operation counters shared by all clones of a connector.
#[derive(Debug, Default)]
pub struct ConnectorCounters {
    pub upsert_count: AtomicUsize,
    pub read_count: AtomicUsize,
    pub range_count: AtomicUsize,
    pub remove_count: AtomicUsize,
}

impl ConnectorCounters {
    pub fn upsert_count(&self) -> usize {
        self.upsert_count.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.read_count.load(Ordering::SeqCst)
    }

    pub fn range_count(&self) -> usize {
        self.range_count.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.remove_count.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.upsert_count.store(0, Ordering::SeqCst);
        self.read_count.store(0, Ordering::SeqCst);
        self.range_count.store(0, Ordering::SeqCst);
        self.remove_count.store(0, Ordering::SeqCst);
    }
}

/// Location of a row: its entity and encoded primary key values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowAddress {
    entity: String,
    key: Raw,
}

/// A complete in-memory connector.
///
/// Supports every operation, including conditional ranges with offset page
/// tokens. [`set_available(false)`](Self::set_available) simulates an outage:
/// every operation then fails with [`ConnectorError::Connection`] until the
/// connector is made available again. Clones share rows, counters and
/// availability.
#[derive(Clone, Debug)]
pub struct MemoryConnector {
    pub rows: Arc<DashMap<RowAddress, Row>>,
    pub counters: Arc<ConnectorCounters>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(DashMap::new()),
            counters: Arc::new(ConnectorCounters::default()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reads a row directly, ignoring availability and counters.
    pub fn get(&self, entity: &EntityInfo, keys: &Row) -> Option<Row> {
        let address = address(entity, keys).ok()?;
        self.rows.get(&address).map(|row| row.value().clone())
    }

    /// Rows of `entity`, in primary key order.
    pub fn rows_of(&self, entity: &EntityInfo) -> Vec<Row> {
        let id = entity.to_string();
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|entry| entry.key().entity == id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| compare_keys(entity, a, b));
        rows
    }

    fn check_available(&self) -> ConnectorResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(ConnectorError::connection(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "memory connector is unavailable",
            )))
        }
    }
}

fn address(entity: &EntityInfo, values: &Row) -> ConnectorResult<RowAddress> {
    let mut parts: Vec<&FieldValue> = Vec::new();
    for name in entity.def.key.names() {
        let value = values.get(name).ok_or_else(|| {
            ConnectorError::InvalidArgument(format!("missing primary key field `{name}`"))
        })?;
        parts.push(value);
    }
    Ok(RowAddress {
        entity: entity.to_string(),
        key: BincodeFormat.encode(&parts)?,
    })
}

fn compare_keys(entity: &EntityInfo, a: &Row, b: &Row) -> CmpOrdering {
    for name in entity.def.key.names() {
        let ordering = a
            .get(name)
            .partial_cmp(&b.get(name))
            .unwrap_or(CmpOrdering::Equal);
        if ordering != CmpOrdering::Equal {
            return ordering;
        }
    }
    CmpOrdering::Equal
}

fn matches(conditions: &ColumnConditions, row: &Row) -> bool {
    conditions.iter().all(|(field, list)| {
        row.get(field)
            .is_some_and(|value| list.iter().all(|condition| condition.matches(value)))
    })
}

fn parse_offset(token: Option<&str>) -> ConnectorResult<usize> {
    match token {
        None => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| ConnectorError::InvalidArgument(format!("invalid page token `{token}`"))),
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn upsert(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        self.counters.upsert_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.rows.insert(address(entity, values)?, values.clone());
        Ok(())
    }

    async fn read(&self, entity: &EntityInfo, keys: &Row, fields: &Fields) -> ConnectorResult<Row> {
        self.counters.read_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let address = address(entity, keys)?;
        match self.rows.get(&address) {
            Some(row) => Ok(fields.project(entity, row.value().clone())),
            None => Err(ConnectorError::NotFound(format!("row of {entity}"))),
        }
    }

    async fn range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
        fields: &Fields,
        token: Option<&str>,
        limit: usize,
    ) -> ConnectorResult<Page> {
        self.counters.range_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let offset = parse_offset(token)?;

        let matching: Vec<Row> = self
            .rows_of(entity)
            .into_iter()
            .filter(|row| matches(conditions, row))
            .collect();
        let total = matching.len();
        let rows: Vec<Row> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| fields.project(entity, row))
            .collect();
        let next = offset + rows.len();
        let next_token = (next < total && !rows.is_empty()).then(|| next.to_string());

        Ok(Page::new(rows, next_token))
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

    async fn remove(&self, entity: &EntityInfo, keys: &Row) -> ConnectorResult<()> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.rows.remove(&address(entity, keys)?);
        Ok(())
    }

    async fn create_if_not_exists(&self, entity: &EntityInfo, values: &Row) -> ConnectorResult<()> {
        self.counters.upsert_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        match self.rows.entry(address(entity, values)?) {
            Entry::Occupied(_) => Err(ConnectorError::AlreadyExists(format!("row of {entity}"))),
            Entry::Vacant(slot) => {
                slot.insert(values.clone());
                Ok(())
            }
        }
    }

    async fn remove_range(
        &self,
        entity: &EntityInfo,
        conditions: &ColumnConditions,
    ) -> ConnectorResult<()> {
        self.counters.remove_count.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let id = entity.to_string();
        self.rows
            .retain(|address, row| address.entity != id || !matches(conditions, row));
        Ok(())
    }

    async fn ping(&self) -> ConnectorResult<()> {
        self.check_available()
    }

    fn label(&self) -> ConnectorLabel {
        ConnectorLabel::new_static("memory")
    }
}
