use pretty_assertions::assert_eq;
use serde::de::DeserializeOwned;
use tessera::fallback::{KEY_COLUMN, RangeQuery, RangeResults, VALUE_COLUMN, cache_key, key_value_entity};
use tessera::{
    CacheWrites, ColumnConditions, Condition, Connector, ConnectorError, EntityDefinition,
    EntityInfo, EntityRef, FallbackConfig, FallbackConnector, FieldValue, Fields, Operator, Page,
    Row, Type, WriteMode,
};
use tessera_core::Raw;
use tessera_format::{BincodeFormat, DecodeTarget, Format, FormatError, FormatExt, FormatTypeId, JsonFormat};
use tessera_moka::MokaConnector;
use tessera_test::tracing::EventCapture;
use tessera_test::{FailingConnector, GatedConnector, MemoryConnector, row};

fn accounts() -> EntityInfo {
    EntityInfo::new(
        EntityRef::new("bank", "core"),
        EntityDefinition::new("account")
            .partition_key("id")
            .column("id", Type::Int64)
            .column("owner", Type::String)
            .column("balance", Type::Int64),
    )
}

fn account(id: i64, owner: &str, balance: i64) -> Row {
    row([
        ("id", FieldValue::Int64(id)),
        ("owner", FieldValue::from(owner)),
        ("balance", FieldValue::Int64(balance)),
    ])
}

fn id(id: i64) -> Row {
    row([("id", FieldValue::Int64(id))])
}

fn rich() -> ColumnConditions {
    ColumnConditions::from([(
        "balance".to_string(),
        vec![Condition::new(Operator::GtOrEq, 100i64)],
    )])
}

/// Decodes the fallback entry stored under `key`.
fn cached<T: DeserializeOwned>(fallback: &MemoryConnector, entity: &EntityInfo, key: Raw) -> Option<T> {
    let entry = fallback.get(&key_value_entity(entity), &row([(KEY_COLUMN, FieldValue::Blob(key))]))?;
    let value = entry.get(VALUE_COLUMN)?.as_blob()?;
    BincodeFormat.decode(value).ok()
}

fn cached_row(fallback: &MemoryConnector, keys: &Row) -> Option<Row> {
    let key = cache_key(&BincodeFormat, &accounts(), keys).unwrap();
    cached(fallback, &accounts(), key)
}

/// Overwrites the fallback entry under `key` with bytes no format accepts.
async fn corrupt_entry(fallback: &MemoryConnector, key: Raw) {
    fallback
        .upsert(
            &key_value_entity(&accounts()),
            &row([
                (KEY_COLUMN, FieldValue::Blob(key)),
                (VALUE_COLUMN, FieldValue::Blob(Raw::from_static(&[0xff, 0xff, 0xff]))),
            ]),
        )
        .await
        .unwrap();
}

fn inline(
    origin: &MemoryConnector,
    fallback: &MemoryConnector,
) -> FallbackConnector<MemoryConnector, MemoryConnector> {
    FallbackConnector::builder(origin.clone(), fallback.clone(), BincodeFormat)
        .inline_writes()
        .build()
}

#[tokio::test]
async fn recovery_ignores_non_key_fields_and_field_order() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);

    let mut written = Row::new();
    written.insert("balance".into(), FieldValue::Int64(10));
    written.insert("owner".into(), "ann".into());
    written.insert("id".into(), FieldValue::Int64(1));
    connector.upsert(&accounts(), &written).await.unwrap();

    origin.set_available(false);
    let found = connector.read(&accounts(), &id(1), &Fields::All).await.unwrap();
    assert_eq!(found, account(1, "ann", 10));
}

#[tokio::test]
async fn read_prefers_origin_and_refreshes_fallback() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    // changed behind the connector's back
    origin.upsert(&accounts(), &account(1, "ann", 75)).await.unwrap();

    let found = connector
        .read(&accounts(), &id(1), &Fields::only(["owner"]))
        .await
        .unwrap();
    assert_eq!(found, account(1, "ann", 75));
    assert_eq!(cached_row(&fallback, &id(1)), Some(account(1, "ann", 75)));
    assert_eq!(origin.counters.read_count(), 1);
    assert_eq!(fallback.counters.read_count(), 0);
}

#[tokio::test]
async fn fallback_masks_origin_failure_on_read() {
    let capture = EventCapture::start();
    let origin = MemoryConnector::new();
    let fallback = MokaConnector::builder().max_entries(100).build();
    let connector = FallbackConnector::builder(origin.clone(), fallback, JsonFormat)
        .inline_writes()
        .build();

    connector.upsert(&accounts(), &account(7, "bob", 300)).await.unwrap();
    origin.set_available(false);

    let found = connector.read(&accounts(), &id(7), &Fields::All).await.unwrap();
    assert_eq!(found, account(7, "bob", 300));
    assert!(capture.contains("Origin failed, answered from fallback"));
}

#[tokio::test]
async fn origin_error_passes_through_without_usable_entry() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);

    // origin says not found, fallback has nothing
    let missing = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(missing, Err(ConnectorError::NotFound(_))));

    origin.set_available(false);
    let down = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(down, Err(ConnectorError::Connection(_))));

    // corrupt entry under the right key
    let key = cache_key(&BincodeFormat, &accounts(), &id(1)).unwrap();
    corrupt_entry(&fallback, key).await;
    let corrupt = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(corrupt, Err(ConnectorError::Connection(_))));

    // fallback unavailable too
    fallback.set_available(false);
    let both_down = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(both_down, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn upsert_result_comes_from_origin() {
    let capture = EventCapture::start();
    let origin = MemoryConnector::new();
    let fallback = FailingConnector::new();
    let connector = FallbackConnector::builder(origin.clone(), fallback.clone(), BincodeFormat)
        .inline_writes()
        .build();

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    assert_eq!(origin.get(&accounts(), &id(1)), Some(account(1, "ann", 10)));
    assert_eq!(fallback.call_count(), 1);
    assert!(capture.contains("Cache write failed"));

    origin.set_available(false);
    let result = connector.upsert(&accounts(), &account(2, "bob", 20)).await;
    assert!(matches!(result, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn upsert_survives_failing_fallback_in_background() {
    let origin = MemoryConnector::new();
    let fallback = FailingConnector::new();
    let connector = FallbackConnector::new(origin.clone(), fallback.clone(), BincodeFormat);

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    connector.flush().await;
    assert_eq!(origin.get(&accounts(), &id(1)), Some(account(1, "ann", 10)));
    assert_eq!(fallback.call_count(), 1);
}

#[tokio::test]
async fn range_and_scan_are_served_from_fallback() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);
    for (n, balance) in [(1, 50), (2, 150), (3, 250), (4, 350)] {
        origin.upsert(&accounts(), &account(n, "x", balance)).await.unwrap();
    }

    let page = connector
        .range(&accounts(), &rich(), &Fields::All, None, 2)
        .await
        .unwrap();
    assert_eq!(page.rows, vec![account(2, "x", 150), account(3, "x", 250)]);
    let scanned = connector.scan(&accounts(), &Fields::All, None, 10).await.unwrap();
    assert_eq!(scanned.rows.len(), 4);

    let key = RangeQuery::new(&rich(), None, 2).cache_key(&BincodeFormat).unwrap();
    let stored: RangeResults = cached(&fallback, &accounts(), key).unwrap();
    assert_eq!(Page::from(stored), page);

    origin.set_available(false);
    let recovered = connector
        .range(&accounts(), &rich(), &Fields::All, None, 2)
        .await
        .unwrap();
    assert_eq!(recovered, page);
    let rescanned = connector.scan(&accounts(), &Fields::All, None, 10).await.unwrap();
    assert_eq!(rescanned, scanned);

    // a different page was never cached
    let next = connector
        .range(&accounts(), &rich(), &Fields::All, page.next_token.as_deref(), 2)
        .await;
    assert!(matches!(next, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn range_and_scan_return_origin_error_without_usable_page() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);
    for (n, balance) in [(1, 50), (2, 150), (3, 250)] {
        origin.upsert(&accounts(), &account(n, "x", balance)).await.unwrap();
    }
    connector
        .range(&accounts(), &rich(), &Fields::All, None, 2)
        .await
        .unwrap();
    connector.scan(&accounts(), &Fields::All, None, 10).await.unwrap();
    connector.scan(&accounts(), &Fields::All, None, 2).await.unwrap();

    let range_key = RangeQuery::new(&rich(), None, 2).cache_key(&BincodeFormat).unwrap();
    corrupt_entry(&fallback, range_key).await;
    let scan_key = RangeQuery::new(&ColumnConditions::new(), None, 10)
        .cache_key(&BincodeFormat)
        .unwrap();
    corrupt_entry(&fallback, scan_key).await;
    origin.set_available(false);

    let range = connector.range(&accounts(), &rich(), &Fields::All, None, 2).await;
    assert!(matches!(range, Err(ConnectorError::Connection(_))));
    let scan = connector.scan(&accounts(), &Fields::All, None, 10).await;
    assert!(matches!(scan, Err(ConnectorError::Connection(_))));

    // the intact scan page is served until the fallback goes down as well
    let intact = connector.scan(&accounts(), &Fields::All, None, 2).await.unwrap();
    assert_eq!(intact.rows.len(), 2);
    fallback.set_available(false);
    let scan = connector.scan(&accounts(), &Fields::All, None, 2).await;
    assert!(matches!(scan, Err(ConnectorError::Connection(_))));
    let range = connector.range(&accounts(), &rich(), &Fields::All, None, 2).await;
    assert!(matches!(range, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn origin_results_survive_failing_fallback() {
    let origin = MemoryConnector::new();
    for (n, balance) in [(1, 50), (2, 150), (3, 250)] {
        origin.upsert(&accounts(), &account(n, "x", balance)).await.unwrap();
    }
    let fallback = FailingConnector::new();
    let inline_writes = FallbackConnector::builder(origin.clone(), fallback.clone(), BincodeFormat)
        .inline_writes()
        .build();
    let background = FallbackConnector::new(origin.clone(), fallback.clone(), BincodeFormat);

    for (connector, calls) in [(inline_writes, 3), (background, 6)] {
        let found = connector.read(&accounts(), &id(2), &Fields::All).await.unwrap();
        assert_eq!(found, account(2, "x", 150));

        let page = connector
            .range(&accounts(), &rich(), &Fields::All, None, 10)
            .await
            .unwrap();
        assert_eq!(page.rows, vec![account(2, "x", 150), account(3, "x", 250)]);

        let scanned = connector.scan(&accounts(), &Fields::All, None, 10).await.unwrap();
        assert_eq!(scanned.rows.len(), 3);

        connector.flush().await;
        assert_eq!(fallback.call_count(), calls);
    }
}

#[tokio::test]
async fn equivalent_conditions_share_a_cache_entry() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);
    for (n, balance) in [(1, 50), (2, 150), (3, 250)] {
        origin.upsert(&accounts(), &account(n, "x", balance)).await.unwrap();
    }

    let window = |first: Operator, second: Operator| {
        let bound = |op| match op {
            Operator::Gt => Condition::new(op, 100i64),
            _ => Condition::new(op, 300i64),
        };
        ColumnConditions::from([("balance".to_string(), vec![bound(first), bound(second)])])
    };

    let page = connector
        .range(&accounts(), &window(Operator::Gt, Operator::Lt), &Fields::All, None, 10)
        .await
        .unwrap();
    origin.set_available(false);
    let recovered = connector
        .range(&accounts(), &window(Operator::Lt, Operator::Gt), &Fields::All, None, 10)
        .await
        .unwrap();
    assert_eq!(recovered, page);
}

#[tokio::test]
async fn remove_returns_origin_result_and_clears_fallback() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    assert!(cached_row(&fallback, &id(1)).is_some());

    connector.remove(&accounts(), &id(1)).await.unwrap();
    assert_eq!(cached_row(&fallback, &id(1)), None);
    assert_eq!(origin.get(&accounts(), &id(1)), None);

    origin.set_available(false);
    let result = connector.remove(&accounts(), &id(1)).await;
    assert!(matches!(result, Err(ConnectorError::Connection(_))));
    let read = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(read, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn remove_ignores_failing_fallback() {
    let origin = MemoryConnector::new();
    let connector = FallbackConnector::builder(origin.clone(), FailingConnector::new(), BincodeFormat)
        .inline_writes()
        .build();

    origin.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    connector.remove(&accounts(), &id(1)).await.unwrap();
    assert!(origin.is_empty());
}

async fn exercise<C: Connector>(connector: &C, drain: impl AsyncFn()) {
    for n in 1..=4 {
        connector.upsert(&accounts(), &account(n, "x", n * 100)).await.unwrap();
    }
    drain().await;
    connector.read(&accounts(), &id(1), &Fields::All).await.unwrap();
    connector.remove(&accounts(), &id(2)).await.unwrap();
    connector.range(&accounts(), &rich(), &Fields::All, None, 2).await.unwrap();
    drain().await;
    connector.upsert(&accounts(), &account(3, "y", 999)).await.unwrap();
    drain().await;
}

/// Fallback entries with values decoded, so row field order does not matter.
fn snapshot(fallback: &MemoryConnector) -> Vec<(Row, serde_json::Value)> {
    fallback
        .rows_of(&key_value_entity(&accounts()))
        .into_iter()
        .map(|mut entry| {
            let value = entry.remove(VALUE_COLUMN).unwrap();
            let decoded = serde_json::from_slice(value.as_blob().unwrap()).unwrap();
            (entry, decoded)
        })
        .collect()
}

#[tokio::test]
async fn inline_and_background_writes_converge() {
    let inline_fallback = MemoryConnector::new();
    let inline_connector =
        FallbackConnector::builder(MemoryConnector::new(), inline_fallback.clone(), JsonFormat)
            .inline_writes()
            .build();
    exercise(&inline_connector, async || {}).await;

    let background_fallback = MemoryConnector::new();
    let background_connector = FallbackConnector::new(
        MemoryConnector::new(),
        background_fallback.clone(),
        JsonFormat,
    );
    exercise(&background_connector, async || background_connector.flush().await).await;

    // rows 1, 3 and 4 plus one range page
    assert_eq!(inline_fallback.len(), 4);
    assert_eq!(snapshot(&inline_fallback), snapshot(&background_fallback));
}

#[tokio::test]
async fn background_writes_do_not_hold_the_caller() {
    let origin = MemoryConnector::new();
    let fallback = GatedConnector::closed(MemoryConnector::new());
    let connector = FallbackConnector::new(origin.clone(), fallback.clone(), BincodeFormat);

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    assert_eq!(origin.len(), 1);
    assert!(fallback.inner().is_empty());

    fallback.open();
    connector.flush().await;
    assert_eq!(cached_row(fallback.inner(), &id(1)), Some(account(1, "ann", 10)));
}

#[tokio::test]
async fn shutdown_drains_background_writes() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = FallbackConnector::new(origin.clone(), fallback.clone(), BincodeFormat);

    for n in 1..=3 {
        connector.upsert(&accounts(), &account(n, "x", n)).await.unwrap();
    }
    connector.shutdown().await.unwrap();
    assert_eq!(fallback.len(), 3);
}

#[tokio::test]
async fn other_operations_go_to_origin_only() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = inline(&origin, &fallback);

    connector
        .create_if_not_exists(&accounts(), &account(1, "ann", 10))
        .await
        .unwrap();
    let duplicate = connector.create_if_not_exists(&accounts(), &account(1, "ann", 10)).await;
    assert!(matches!(duplicate, Err(ConnectorError::AlreadyExists(_))));

    connector.remove_range(&accounts(), &ColumnConditions::new()).await.unwrap();
    assert!(origin.is_empty());
    assert!(fallback.is_empty());
    assert_eq!(fallback.counters.upsert_count(), 0);

    connector.ping().await.unwrap();
    origin.set_available(false);
    assert!(connector.ping().await.is_err());
}

#[derive(Debug, Clone, Copy)]
struct UnencodableFormat;

impl Format for UnencodableFormat {
    fn encode_value(&self, _value: &dyn tessera_format::erased_serde::Serialize) -> Result<Raw, FormatError> {
        Err(FormatError::serialize("cannot encode"))
    }

    fn decode_into(&self, _data: &[u8], _target: &mut dyn DecodeTarget) -> Result<(), FormatError> {
        Err(FormatError::deserialize("cannot decode"))
    }

    fn format_type_id(&self) -> FormatTypeId {
        FormatTypeId::Custom("unencodable")
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}

#[tokio::test]
async fn key_encoding_failure_skips_the_fallback() {
    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = FallbackConnector::builder(origin.clone(), fallback.clone(), UnencodableFormat)
        .inline_writes()
        .build();

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    assert_eq!(fallback.counters.upsert_count(), 0);

    origin.set_available(false);
    let result = connector.read(&accounts(), &id(1), &Fields::All).await;
    assert!(matches!(result, Err(ConnectorError::Connection(_))));
    assert_eq!(fallback.counters.read_count(), 0);
}

#[tokio::test]
async fn built_from_yaml_config() {
    let config: FallbackConfig =
        serde_saphyr::from_str("writes: inline\nlabel: accounts\n").unwrap();
    assert_eq!(config.writes, WriteMode::Inline);

    let origin = MemoryConnector::new();
    let fallback = MemoryConnector::new();
    let connector = FallbackConnector::from_config(origin, fallback.clone(), BincodeFormat, &config);
    assert!(connector.writes().is_inline());
    assert_eq!(connector.label().as_str(), "accounts");

    connector.upsert(&accounts(), &account(1, "ann", 10)).await.unwrap();
    assert_eq!(fallback.len(), 1);

    let background = FallbackConnector::from_config(
        MemoryConnector::new(),
        MemoryConnector::new(),
        BincodeFormat,
        &FallbackConfig::default(),
    );
    assert!(matches!(background.writes(), CacheWrites::Background(_)));
    assert_eq!(background.label().as_str(), "fallback");
}
