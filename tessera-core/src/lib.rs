#![warn(missing_docs)]
//! # tessera-core
//!
//! Core traits and types for the Tessera data-access layer.
//!
//! This crate provides the narrow interfaces every storage implementation
//! agrees on, so that connectors can be stacked and decorated freely:
//!
//! - **Describe** what is stored ([`EntityInfo`], [`EntityDefinition`], [`FieldValue`])
//! - **Constrain** range queries ([`Condition`], [`ColumnConditions`])
//! - **Access** a store ([`Connector`])
//! - **Execute** background work ([`Offload`])
//!
//! A connector never needs to know whether it is talking to a database, an
//! in-memory map or another connector wrapping both.

pub mod condition;
pub mod connector;
pub mod entity;
pub mod error;
pub mod label;
pub mod offload;
pub mod value;

pub use condition::{ColumnConditions, Condition, Operator, canonicalize};
pub use connector::{Connector, Fields, Page};
pub use entity::{ClusteringKey, ColumnDefinition, EntityDefinition, EntityInfo, EntityRef, PrimaryKey};
pub use error::{ConnectorError, ConnectorResult};
pub use label::ConnectorLabel;
pub use offload::Offload;
#[doc(hidden)]
pub use smol_str::SmolStr;
pub use value::{FieldValue, Row, Type};

/// Raw byte data type used for encoded keys and values.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
