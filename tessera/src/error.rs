//! Errors of cache-write housekeeping.

use tessera_core::ConnectorError;
use tessera_format::FormatError;
use thiserror::Error;

/// Failure of a single cache write to the fallback store.
///
/// These never reach callers of the fallback connector: the origin's outcome
/// is always the result of record. They are logged and counted instead.
#[derive(Debug, Error)]
pub enum CacheWriteError {
    /// The cache key could not be encoded.
    #[error("failed to derive cache key")]
    Key(#[source] FormatError),

    /// The cache value could not be encoded.
    #[error("failed to encode cache value")]
    Value(#[source] FormatError),

    /// The fallback store rejected the write.
    #[error("fallback store write failed")]
    Fallback(#[source] ConnectorError),
}
