//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need Docker, so they are
//! ignored by default. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use domain::{
    Cart, CatalogItem, ItemId, MAX_LINE_QUANTITY, Money, PurchaseLine, Purchaser, Receipt,
    ReceiptCode,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CartStore, InventoryStore, PostgresStore, ReceiptQuery, ReceiptStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE cart_lines, carts, catalog_items, receipts")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn item(id: &str, cents: i64, stock: u32) -> CatalogItem {
    CatalogItem::new(id, format!("Item {id}"), Money::from_cents(cents), stock).unwrap()
}

fn receipt(code: &str, purchaser: &str, cents: i64, hours_ago: i64) -> Receipt {
    Receipt::issue(
        ReceiptCode::new(code).unwrap(),
        Purchaser::new(purchaser).unwrap(),
        vec![PurchaseLine {
            item_id: ItemId::new("SKU-001"),
            title: "Widget".to_string(),
            quantity: 2,
            unit_price: Money::from_cents(cents),
        }],
        Utc::now() - Duration::hours(hours_ago),
    )
}

#[tokio::test]
#[ignore]
#[serial]
async fn cart_round_trip_keeps_line_order() {
    let store = get_test_store().await;
    store.put_item(&item("SKU-B", 500, 3)).await.unwrap();

    let mut cart = Cart::new(Some(Purchaser::new("alice@example.com").unwrap()));
    cart.add_line("SKU-B", 2).unwrap();
    cart.add_line("SKU-GONE", 1).unwrap();
    let cart_id = store.create_cart(&cart).await.unwrap();

    let resolved = store.load_cart_with_items(cart_id).await.unwrap().unwrap();
    assert_eq!(resolved.cart, cart);
    assert_eq!(resolved.lines[0].item.as_ref().unwrap().price.cents(), 500);
    assert!(resolved.lines[1].item.is_none());
}

#[tokio::test]
#[ignore]
#[serial]
async fn largest_line_quantity_is_stored_intact() {
    let store = get_test_store().await;
    let mut cart = Cart::new(None);
    let cart_id = store.create_cart(&cart).await.unwrap();

    cart.add_line("SKU-001", MAX_LINE_QUANTITY).unwrap();
    cart.add_line("SKU-002", MAX_LINE_QUANTITY).unwrap();
    store.save_cart(&cart).await.unwrap();

    let loaded = store.get_cart(cart_id).await.unwrap().unwrap();
    assert_eq!(loaded.lines()[0].quantity, MAX_LINE_QUANTITY);
    assert_eq!(loaded.total_quantity(), 2 * u64::from(MAX_LINE_QUANTITY));
}

#[tokio::test]
#[ignore]
#[serial]
async fn save_and_remove_lines() {
    let store = get_test_store().await;
    let mut cart = Cart::new(None);
    let cart_id = store.create_cart(&cart).await.unwrap();

    cart.add_line("SKU-001", 1).unwrap();
    cart.add_line("SKU-002", 4).unwrap();
    store.save_cart(&cart).await.unwrap();

    store
        .remove_line(cart_id, &ItemId::new("SKU-001"))
        .await
        .unwrap();
    // Absent line is a no-op
    store
        .remove_line(cart_id, &ItemId::new("SKU-001"))
        .await
        .unwrap();

    let stored = store.get_cart(cart_id).await.unwrap().unwrap();
    assert_eq!(stored.lines().len(), 1);
    assert_eq!(stored.lines()[0].quantity, 4);

    let missing = store
        .remove_line(common::CartId::new(), &ItemId::new("SKU-002"))
        .await;
    assert!(matches!(missing, Err(StoreError::CartNotFound(_))));
}

#[tokio::test]
#[ignore]
#[serial]
async fn decrement_guards_against_oversell() {
    let store = get_test_store().await;
    let sku = ItemId::new("SKU-001");
    store.put_item(&item("SKU-001", 1000, 3)).await.unwrap();

    assert_eq!(store.decrement_stock(&sku, 2).await.unwrap(), 1);

    let err = store.decrement_stock(&sku, 2).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));
    assert_eq!(store.read_stock(&sku).await.unwrap(), 1);

    let missing = store.decrement_stock(&ItemId::new("SKU-404"), 1).await;
    assert!(matches!(missing, Err(StoreError::ItemNotFound(_))));
}

#[tokio::test]
#[ignore]
#[serial]
async fn concurrent_decrements_never_oversell() {
    let store = get_test_store().await;
    let sku = ItemId::new("SKU-HOT");
    store.put_item(&item("SKU-HOT", 100, 5)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        let sku = sku.clone();
        handles.push(tokio::spawn(async move {
            store.decrement_stock(&sku, 1).await.is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(store.read_stock(&sku).await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
#[serial]
async fn list_items_filters_inactive() {
    let store = get_test_store().await;
    store.put_item(&item("SKU-B", 100, 1)).await.unwrap();
    store.put_item(&item("SKU-A", 100, 1)).await.unwrap();
    store
        .put_item(&item("SKU-C", 100, 1).deactivated())
        .await
        .unwrap();

    let active = store.list_items(true).await.unwrap();
    let ids: Vec<_> = active.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["SKU-A", "SKU-B"]);

    assert_eq!(store.list_items(false).await.unwrap().len(), 3);
}

#[tokio::test]
#[ignore]
#[serial]
async fn duplicate_receipt_code_maps_to_collision() {
    let store = get_test_store().await;
    store
        .insert_receipt(&receipt("TICKET-1-1", "alice@example.com", 100, 0))
        .await
        .unwrap();

    let err = store
        .insert_receipt(&receipt("TICKET-1-1", "bob@example.com", 100, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::CodeCollision(_)));
}

#[tokio::test]
#[ignore]
#[serial]
async fn receipts_query_and_summary() {
    let store = get_test_store().await;
    let older = receipt("TICKET-1-1", "alice@example.com", 1000, 5);
    let newer = receipt("TICKET-2-2", "alice@example.com", 250, 1);
    store.insert_receipt(&older).await.unwrap();
    store.insert_receipt(&newer).await.unwrap();
    store
        .insert_receipt(&receipt("TICKET-3-3", "bob@example.com", 50, 0))
        .await
        .unwrap();

    let alice = Purchaser::new("alice@example.com").unwrap();
    let found = store
        .find_receipts(ReceiptQuery::for_purchaser(alice))
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].id(), newer.id());
    assert_eq!(found[0].lines(), newer.lines());

    let by_code = store
        .get_receipt_by_code(older.code())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.total_amount().cents(), 2000);

    let recent = store
        .sales_summary(ReceiptQuery::new().from_timestamp(Utc::now() - Duration::hours(2)))
        .await
        .unwrap();
    assert_eq!(recent.total_orders, 2);
    assert_eq!(recent.total_sales.cents(), 600);

    let empty = store
        .sales_summary(ReceiptQuery::new().from_timestamp(Utc::now() + Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(empty.total_orders, 0);
    assert!(empty.average_order_value.is_zero());
}
