//! Connector error type.

use thiserror::Error;

/// Result type returned by every [`Connector`](crate::Connector) operation.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Describes general groups of errors in connector interaction.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row with the same primary key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The connector does not implement the operation.
    #[error("operation `{0}` is not supported by this connector")]
    Unsupported(&'static str),

    /// The caller supplied arguments the connector cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Network or availability error while reaching the store.
    #[error(transparent)]
    Connection(Box<dyn std::error::Error + Send + Sync>),

    /// Internal store error, state or computation error.
    ///
    /// Any error not bound to network interaction.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl ConnectorError {
    /// Wraps any error as a connection error.
    pub fn connection(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Connection(error.into())
    }

    /// Wraps any error as an internal error.
    pub fn internal(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Internal(error.into())
    }

    /// Returns `true` for [`ConnectorError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
