//! Builder for configuring [`MokaConnector`].

use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;
use tessera_core::{ConnectorLabel, FieldValue, Row};
use tessera_format::{BincodeFormat, Format};

use crate::connector::{MokaConnector, StoreKey};

/// Marker type: capacity has not been configured yet.
///
/// This is the initial state of a [`MokaConnectorBuilder`]. You must call either
/// [`max_entries()`](MokaConnectorBuilder::max_entries) or
/// [`max_bytes()`](MokaConnectorBuilder::max_bytes) before calling `build()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: row-count capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: byte-based capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for creating and configuring a [`MokaConnector`].
///
/// Capacity uses the typestate pattern: `build()` only exists once a capacity
/// has been chosen, and only one kind of capacity can be chosen.
///
/// ```
/// use tessera_moka::{EvictionPolicy, MokaConnector};
///
/// let connector = MokaConnector::builder()
///     .label("fallback-cache")
///     .max_bytes(64 * 1024 * 1024)
///     .eviction_policy(EvictionPolicy::tiny_lfu())
///     .build();
/// # let _ = connector;
/// ```
pub struct MokaConnectorBuilder<Cap, S = BincodeFormat>
where
    S: Format,
{
    capacity: Cap,
    key_format: S,
    label: ConnectorLabel,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaConnectorBuilder<NoCapacity, BincodeFormat> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            key_format: BincodeFormat,
            label: ConnectorLabel::new_static("moka"),
            eviction_policy: None,
        }
    }
}

impl Default for MokaConnectorBuilder<NoCapacity, BincodeFormat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MokaConnectorBuilder<NoCapacity, S>
where
    S: Format,
{
    /// Sets the maximum number of rows the store can hold.
    pub fn max_entries(self, capacity: u64) -> MokaConnectorBuilder<EntryCapacity, S> {
        MokaConnectorBuilder {
            capacity: EntryCapacity(capacity),
            key_format: self.key_format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Sets the approximate memory budget in bytes.
    ///
    /// Row sizes are estimated from key bytes, field names and value payloads.
    pub fn max_bytes(self, bytes: u64) -> MokaConnectorBuilder<ByteCapacity, S> {
        MokaConnectorBuilder {
            capacity: ByteCapacity(bytes),
            key_format: self.key_format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<Cap, S> MokaConnectorBuilder<Cap, S>
where
    S: Format,
{
    /// Sets a custom label for this connector.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: impl Into<ConnectorLabel>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// # Default
    ///
    /// TinyLFU for entry capacity, LRU for byte capacity.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    /// Sets the format used to encode primary key values.
    pub fn key_format<NewS>(self, key_format: NewS) -> MokaConnectorBuilder<Cap, NewS>
    where
        NewS: Format,
    {
        MokaConnectorBuilder {
            capacity: self.capacity,
            key_format,
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl<S> MokaConnectorBuilder<EntryCapacity, S>
where
    S: Format,
{
    /// Builds the [`MokaConnector`] with row-count based capacity.
    pub fn build(self) -> MokaConnector<S> {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<StoreKey, Row> = CacheBuilder::new(self.capacity.0)
            .eviction_policy(policy)
            .build();

        MokaConnector {
            cache,
            key_format: self.key_format,
            label: self.label,
        }
    }
}

impl<S> MokaConnectorBuilder<ByteCapacity, S>
where
    S: Format,
{
    /// Builds the [`MokaConnector`] with byte-based capacity.
    ///
    /// Defaults to LRU eviction: TinyLFU admission can reject new rows even
    /// when eviction could make room.
    pub fn build(self) -> MokaConnector<S> {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<StoreKey, Row> = CacheBuilder::new(self.capacity.0)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .build();

        MokaConnector {
            cache,
            key_format: self.key_format,
            label: self.label,
        }
    }
}

fn byte_weigher(key: &StoreKey, row: &Row) -> u32 {
    let row_size: usize = row
        .iter()
        .map(|(name, value)| name.len() + value_size(value))
        .sum();
    (key.memory_size() + row_size).min(u32::MAX as usize) as u32
}

fn value_size(value: &FieldValue) -> usize {
    let payload = match value {
        FieldValue::String(s) => s.len(),
        FieldValue::Blob(b) => b.len(),
        _ => 0,
    };
    std::mem::size_of::<FieldValue>() + payload
}
