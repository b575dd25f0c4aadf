//! Runs the conditional updates against a real Postgres.
//!
//! Ignored by default. Run with
//! `DATABASE_URL=postgres://… cargo test -p courier-store -- --ignored`.

use chrono::Utc;
use courier_core::{Addon, Order, OrderItem, OrderRepository, OrderStatus};
use courier_store::app_config::DatabaseConfig;
use courier_store::{DbClient, StoreOrderRepository};
use rust_decimal_macros::dec;
use std::sync::Arc;
use uuid::Uuid;

async fn repository() -> Option<(DbClient, StoreOrderRepository)> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        }
    };
    let client = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 5,
        acquire_timeout_seconds: 3,
    })
    .await
    .unwrap();
    client.migrate().await.unwrap();
    let repo = StoreOrderRepository::new(client.pool.clone());
    Some((client, repo))
}

async fn seed_order(
    client: &DbClient,
    repo: &StoreOrderRepository,
    driver: Option<Uuid>,
    status: OrderStatus,
) -> Order {
    let food_id: i64 = sqlx::query_scalar("SELECT id FROM foods ORDER BY id LIMIT 1")
        .fetch_one(&client.pool)
        .await
        .unwrap();

    let mut order = Order::new(
        Uuid::new_v4(),
        "1 Main St".to_string(),
        None,
        dec!(13.49),
        dec!(2.00),
        None,
    );
    order.driver_id = driver;
    order.status = status;
    let items = vec![OrderItem::new(
        order.id,
        food_id,
        1,
        dec!(9.99),
        vec![Addon::new("Bacon", dec!(1.50))],
    )];
    repo.create_order(&order, &items).await.unwrap();
    order
}

#[tokio::test]
#[ignore]
async fn test_create_and_read_back_items() {
    let Some((client, repo)) = repository().await else {
        return;
    };
    let order = seed_order(&client, &repo, None, OrderStatus::Pending).await;

    let stored = repo.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.total_amount, dec!(13.49));
    assert_eq!(stored.delivery_fee, dec!(2.00));

    let items = repo.list_items(&[order.id]).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].addons_details, vec![Addon::new("Bacon", dec!(1.50))]);
}

#[tokio::test]
#[ignore]
async fn test_claim_unassigned_is_conditional() {
    let Some((client, repo)) = repository().await else {
        return;
    };
    let order = seed_order(&client, &repo, None, OrderStatus::Confirmed).await;
    let driver = Uuid::new_v4();

    let claimed = repo
        .claim_unassigned(order.id, driver, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.driver_id, Some(driver));
    assert_eq!(claimed.status, OrderStatus::OutForDelivery);
    assert!(claimed.assigned_at.is_some());

    let again = repo
        .claim_unassigned(order.id, Uuid::new_v4(), Utc::now())
        .await
        .unwrap();
    assert!(again.is_none());

    let cancelled = seed_order(&client, &repo, None, OrderStatus::Cancelled).await;
    let closed = repo
        .claim_unassigned(cancelled.id, driver, Utc::now())
        .await
        .unwrap();
    assert!(closed.is_none());
}

#[tokio::test]
#[ignore]
async fn test_confirm_assignment_checks_holder_and_status() {
    let Some((client, repo)) = repository().await else {
        return;
    };
    let driver = Uuid::new_v4();
    let order = seed_order(&client, &repo, Some(driver), OrderStatus::Preparing).await;

    let stale = repo
        .confirm_assignment(order.id, driver, OrderStatus::Pending, Utc::now())
        .await
        .unwrap();
    assert!(stale.is_none());

    let stranger = repo
        .confirm_assignment(order.id, Uuid::new_v4(), OrderStatus::Preparing, Utc::now())
        .await
        .unwrap();
    assert!(stranger.is_none());

    let confirmed = repo
        .confirm_assignment(order.id, driver, OrderStatus::Preparing, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(confirmed.status, OrderStatus::OutForDelivery);
    assert!(confirmed.assigned_at.is_some());
}

#[tokio::test]
#[ignore]
async fn test_transition_status_requires_expected_status() {
    let Some((client, repo)) = repository().await else {
        return;
    };
    let order = seed_order(&client, &repo, None, OrderStatus::Pending).await;

    let stale = repo
        .transition_status(order.id, OrderStatus::Confirmed, OrderStatus::Preparing, Utc::now())
        .await
        .unwrap();
    assert!(stale.is_none());

    let updated = repo
        .transition_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_racing_claims_have_single_winner() {
    let Some((client, repo)) = repository().await else {
        return;
    };
    let repo = Arc::new(repo);

    for _ in 0..10 {
        let order_id = seed_order(&client, &repo, None, OrderStatus::Pending).await.id;
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let repo = repo.clone();
                let driver = Uuid::new_v4();
                tokio::spawn(async move {
                    let claimed = repo
                        .claim_unassigned(order_id, driver, Utc::now())
                        .await
                        .unwrap();
                    (driver, claimed)
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            let (driver, claimed) = handle.await.unwrap();
            if claimed.is_some() {
                winners.push(driver);
            }
        }

        assert_eq!(winners.len(), 1);
        let persisted = repo.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(persisted.driver_id, Some(winners[0]));
    }
}
