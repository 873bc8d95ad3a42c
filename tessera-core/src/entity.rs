//! Entity identity and schema description.
//!
//! An [`EntityInfo`] pairs *where* an entity lives ([`EntityRef`]) with *what*
//! it looks like ([`EntityDefinition`]). Connectors receive it on every call
//! and must treat it as read-only.
//!
//! ```
//! use tessera_core::{EntityDefinition, EntityInfo, EntityRef, Type};
//!
//! let def = EntityDefinition::new("account")
//!     .partition_key("id")
//!     .clustering_key("created", true)
//!     .column("id", Type::Int64)
//!     .column("created", Type::Timestamp)
//!     .column("email", Type::String);
//!
//! let entity = EntityInfo::new(EntityRef::new("billing", "prod"), def);
//! assert_eq!(entity.name(), "account");
//! assert!(entity.def.key_set().contains("created"));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::value::Type;

/// Namespace an entity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Logical scope (keyspace, database, tenant).
    pub scope: SmolStr,
    /// Prefix shared by related entities within the scope.
    pub name_prefix: SmolStr,
    /// Schema version of the entity.
    pub version: i32,
}

impl EntityRef {
    /// Creates a reference at schema version zero.
    pub fn new(scope: impl Into<SmolStr>, name_prefix: impl Into<SmolStr>) -> Self {
        Self {
            scope: scope.into(),
            name_prefix: name_prefix.into(),
            version: 0,
        }
    }

    /// Sets the schema version.
    pub fn version(self, version: i32) -> Self {
        Self { version, ..self }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:v{}", self.scope, self.name_prefix, self.version)
    }
}

/// A clustering column and its sort direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusteringKey {
    /// Column name.
    pub name: String,
    /// Whether rows are stored in descending order of this column.
    pub descending: bool,
}

/// Partition and clustering columns identifying a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    /// Columns that decide placement.
    pub partition_keys: Vec<String>,
    /// Columns that order rows within a partition.
    pub clustering_keys: Vec<ClusteringKey>,
}

impl PrimaryKey {
    /// Iterates over partition keys followed by clustering keys.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partition_keys
            .iter()
            .map(String::as_str)
            .chain(self.clustering_keys.iter().map(|c| c.name.as_str()))
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column type.
    pub column_type: Type,
}

/// Schema of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Entity name.
    pub name: String,
    /// Primary key layout.
    pub key: PrimaryKey,
    /// All columns, including key columns.
    pub columns: Vec<ColumnDefinition>,
}

impl EntityDefinition {
    /// Creates an empty definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a partition key column name.
    pub fn partition_key(mut self, name: impl Into<String>) -> Self {
        self.key.partition_keys.push(name.into());
        self
    }

    /// Appends a clustering key column name.
    pub fn clustering_key(mut self, name: impl Into<String>, descending: bool) -> Self {
        self.key.clustering_keys.push(ClusteringKey {
            name: name.into(),
            descending,
        });
        self
    }

    /// Appends a column.
    pub fn column(mut self, name: impl Into<String>, column_type: Type) -> Self {
        self.columns.push(ColumnDefinition {
            name: name.into(),
            column_type,
        });
        self
    }

    /// Returns the set of all primary key column names.
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.key.names().collect()
    }

    /// Returns the column name to type mapping.
    pub fn column_types(&self) -> HashMap<&str, Type> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect()
    }
}

/// Identifies a logical entity: its namespace plus its schema.
///
/// The definition is shared behind an `Arc`, so cloning an `EntityInfo` is
/// cheap and does not copy the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    /// Namespace of the entity.
    pub entity_ref: EntityRef,
    /// Schema of the entity.
    pub def: Arc<EntityDefinition>,
}

impl EntityInfo {
    /// Creates entity info from a reference and a definition.
    pub fn new(entity_ref: EntityRef, def: impl Into<Arc<EntityDefinition>>) -> Self {
        Self {
            entity_ref,
            def: def.into(),
        }
    }

    /// Returns the entity name from its definition.
    pub fn name(&self) -> &str {
        &self.def.name
    }
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_ref, self.def.name)
    }
}
