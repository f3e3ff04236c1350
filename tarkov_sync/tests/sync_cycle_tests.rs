use std::time::Duration;
use tarkov_common::GameMode;
use tarkov_sync::market::Backoff;
use tarkov_sync::repository::{ReadOnlyRepository, SequencedWriteRepository};
use tarkov_sync::{
    Database, ItemValuer, LootLine, MarketClient, MarketSettings, Reconciler, ReportService,
    SyncError, ValuationPolicy,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPDATED: &str = "2024-05-01T12:00:00.000Z";
const USD: &str = "5696686a4bdc2da3298b456a";
const EUR: &str = "569668774bdc2da2298b4568";
const KEY: &str = "5780cf7f2459777de4559322";
const GPU: &str = "57347ca924597744596b4e71";
const RIFLE: &str = "5447a9cd4bdc2dbd208b4567";

// Test fixtures - one consistent snapshot of both sources

fn market_item(
    bsg_id: &str,
    name: &str,
    price: Option<i64>,
    banned: bool,
    trader: (i64, &str),
) -> serde_json::Value {
    serde_json::json!({
        "uid": format!("uid-{}", bsg_id),
        "bsgId": bsg_id,
        "name": name,
        "shortName": name,
        "bannedOnFlea": banned,
        "avg24hPrice": price,
        "traderName": "Peacekeeper",
        "traderPrice": trader.0,
        "traderPriceCur": trader.1,
        "updated": UPDATED,
        "icon": "",
        "imgBig": format!("https://example.com/{}.png", bsg_id),
        "tags": ["Test"]
    })
}

fn pvp_items() -> serde_json::Value {
    serde_json::json!([
        market_item(USD, "Dollars", None, true, (95, "₽")),
        market_item(EUR, "Euros", None, true, (105, "₽")),
        market_item(KEY, "Marked key", Some(2_000_000), false, (20_000, "₽")),
        market_item(GPU, "Graphics card", None, true, (1_200, "$")),
        market_item(RIFLE, "M4A1", Some(40_000), false, (30_000, "₽"))
    ])
}

fn pve_items() -> serde_json::Value {
    serde_json::json!([
        market_item(USD, "Dollars", None, true, (95, "₽")),
        market_item(EUR, "Euros", None, true, (105, "₽")),
        market_item(KEY, "Marked key", Some(900_000), false, (20_000, "₽")),
        market_item(GPU, "Graphics card", Some(250_000), false, (1_200, "$"))
    ])
}

fn slots() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "items": [
                {"id": RIFLE, "width": 4, "height": 2},
                {"id": KEY, "width": 1, "height": 1},
                null
            ]
        }
    })
}

fn keys() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "items": [
                {"id": KEY, "name": "Marked key", "properties": {"uses": 10}},
                {"id": "not-synced", "name": "Unknown key", "properties": {"uses": 5}}
            ]
        }
    })
}

async fn mount_sources(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v1/items/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pvp_items()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pve/items/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pve_items()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("FetchItemSlots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slots()))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("FetchKeys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(keys()))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer, retries: u32) -> MarketClient {
    MarketClient::new(&MarketSettings {
        market_url: server.uri(),
        graphql_url: format!("{}/graphql", server.uri()),
        api_key: "secret".to_string(),
        retries,
        backoff: Backoff::none(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_full_cycle_populates_database() {
    let server = MockServer::start().await;
    mount_sources(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("tarkov.db")).unwrap();
    let reconciler = Reconciler::new(&db);

    let report = reconciler.run_cycle(&client_for(&server, 0)).await.unwrap();

    assert_eq!(report.pvp.inserted, 5);
    assert_eq!(report.pvp.prices_inserted, 5);
    assert_eq!(report.pve.inserted, 0);
    assert_eq!(report.pve.unchanged, 4);
    assert_eq!(report.pve.prices_inserted, 4);
    assert_eq!(report.slots.updated, 1);
    assert_eq!(report.slots.filtered, 1);
    assert_eq!(report.keys.inserted, 1);
    assert_eq!(report.keys.skipped, 1);

    let gpu = reconciler.items().find_by_tarkov_id(GPU).unwrap();
    assert!(gpu.pvp_banned_on_flea);
    assert_eq!(gpu.pvp_flea_price, None);
    assert!(!gpu.pve_banned_on_flea);
    assert_eq!(gpu.pve_flea_price, Some(250_000));
    assert_eq!(gpu.icon_link.as_deref(), Some(&*format!("https://example.com/{}.png", GPU)));

    let rifle = reconciler.items().find_by_tarkov_id(RIFLE).unwrap();
    assert_eq!((rifle.horizontal_slots, rifle.vertical_slots), (4, 2));

    let key_item = reconciler.items().find_by_tarkov_id(KEY).unwrap();
    assert_eq!(reconciler.keys().find_by_item_id(key_item.id).unwrap().unwrap().uses, 10);
}

#[tokio::test]
async fn test_second_cycle_writes_nothing() {
    let server = MockServer::start().await;
    mount_sources(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("tarkov.db")).unwrap();
    let reconciler = Reconciler::new(&db);
    let client = client_for(&server, 0);

    reconciler.run_cycle(&client).await.unwrap();
    let items_before = reconciler.items().read_all().unwrap();
    let prices_before = reconciler.prices().count(&[]).unwrap();

    let report = reconciler.run_cycle(&client).await.unwrap();
    assert_eq!(report.pvp.inserted + report.pvp.updated + report.pvp.prices_inserted, 0);
    assert_eq!(report.pve.inserted + report.pve.updated + report.pve.prices_inserted, 0);
    assert_eq!(report.slots.updated, 0);
    assert_eq!(report.keys.inserted + report.keys.updated, 0);

    assert_eq!(reconciler.items().read_all().unwrap(), items_before);
    assert_eq!(reconciler.prices().count(&[]).unwrap(), prices_before);
}

#[tokio::test]
async fn test_cycle_aborts_when_query_retries_run_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/items/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pvp_items()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/pve/items/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pve_items()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let db = Database::open_in_memory().unwrap();
    let reconciler = Reconciler::new(&db);

    let result = reconciler.run_cycle(&client_for(&server, 2)).await;
    match result {
        Err(SyncError::Query(e)) => {
            assert_eq!(e.operation, "FetchItemSlots");
            assert_eq!(e.attempts, 3);
        }
        other => panic!("Expected SyncError::Query, got: {other:?}"),
    }

    // Item phases completed before the failure and stay committed
    assert_eq!(reconciler.items().count(&[]).unwrap(), 5);
    assert_eq!(reconciler.keys().count(&[]).unwrap(), 0);
}

#[tokio::test]
async fn test_cycle_aborts_on_market_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let db = Database::open_in_memory().unwrap();
    let reconciler = Reconciler::new(&db);

    let result = reconciler.run_cycle(&client_for(&server, 0)).await;
    assert!(matches!(result, Err(SyncError::Fetch(_))));
    assert_eq!(reconciler.items().count(&[]).unwrap(), 0);
}

#[tokio::test]
async fn test_synced_data_values_reports() {
    let server = MockServer::start().await;
    mount_sources(&server).await;

    let db = Database::open_in_memory().unwrap();
    let reconciler = Reconciler::new(&db);

    // Valuation is unavailable until the basis items are synced
    assert!(matches!(
        ItemValuer::load(reconciler.items(), ValuationPolicy::FleaOnly),
        Err(SyncError::MissingCurrencyBasis { .. })
    ));

    reconciler.run_cycle(&client_for(&server, 0)).await.unwrap();
    let valuer = ItemValuer::load(reconciler.items(), ValuationPolicy::FleaOnly).unwrap();

    let gpu = reconciler.items().find_by_tarkov_id(GPU).unwrap();
    assert_eq!(valuer.item_value(&gpu, GameMode::Pvp), 1_200 * 95);
    assert_eq!(valuer.item_value(&gpu, GameMode::Pve), 250_000);

    let key = reconciler.items().find_by_tarkov_id(KEY).unwrap();
    let rifle = reconciler.items().find_by_tarkov_id(RIFLE).unwrap();
    let reports = ReportService::new(&db);
    let id = reports
        .submit(1, key.id, GameMode::Pvp, &[LootLine::new(gpu.id, 1), LootLine::new(rifle.id, 2)])
        .unwrap();

    let valuation = reports.valuate(id, &valuer).unwrap();
    assert_eq!(valuation.total, 114_000 + 80_000);
    // Marked key: 2 000 000 on the flea over 10 uses
    assert_eq!(valuation.price_per_use, Some(200_000));
    assert_eq!(valuation.profit, Some(-6_000));
    assert!(reconciler.items().find_by_id(key.id).is_ok());
}
