//! Key-value view of an entity, as stored in the fallback.
//!
//! The fallback never sees the origin's schema. Every entity is mirrored as a
//! two-column entity with the same reference and name: a blob `key` (the
//! partition key) and a blob `value`.

use tessera_core::{EntityDefinition, EntityInfo, FieldValue, Raw, Row, Type};

/// Column holding the encoded cache key.
pub const KEY_COLUMN: &str = "key";

/// Column holding the encoded cache value.
pub const VALUE_COLUMN: &str = "value";

/// Derives the fallback entity for `entity`.
///
/// Pure function of its input: equal entities give equal results.
pub fn key_value_entity(entity: &EntityInfo) -> EntityInfo {
    let def = EntityDefinition::new(entity.name())
        .partition_key(KEY_COLUMN)
        .column(KEY_COLUMN, Type::Blob)
        .column(VALUE_COLUMN, Type::Blob);
    EntityInfo::new(entity.entity_ref.clone(), def)
}

/// Row addressing a single cache entry.
pub(crate) fn key_row(key: Raw) -> Row {
    Row::from([(KEY_COLUMN.to_string(), FieldValue::Blob(key))])
}

/// Row of a complete cache entry.
pub(crate) fn entry_row(key: Raw, value: Raw) -> Row {
    Row::from([
        (KEY_COLUMN.to_string(), FieldValue::Blob(key)),
        (VALUE_COLUMN.to_string(), FieldValue::Blob(value)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::EntityRef;

    #[test]
    fn keeps_identity_and_replaces_schema() {
        let entity = EntityInfo::new(
            EntityRef::new("shop", "orders").version(2),
            EntityDefinition::new("order")
                .partition_key("tenant")
                .clustering_key("id", true)
                .column("tenant", Type::String)
                .column("id", Type::Int64)
                .column("total", Type::Double),
        );

        let kv = key_value_entity(&entity);
        assert_eq!(kv.entity_ref, entity.entity_ref);
        assert_eq!(kv.name(), "order");
        assert_eq!(kv.def.key.partition_keys, vec![KEY_COLUMN.to_string()]);
        assert!(kv.def.key.clustering_keys.is_empty());

        let types = kv.def.column_types();
        assert_eq!(types.len(), 2);
        assert_eq!(types[KEY_COLUMN], Type::Blob);
        assert_eq!(types[VALUE_COLUMN], Type::Blob);

        assert_eq!(key_value_entity(&entity), kv);
    }
}
