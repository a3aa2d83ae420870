//! Status selection: paid orders only, optimistic merge, rollback on failure.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use chrono::Utc;
use shop_schemas::{Order, OrderStatus, ProductSnapshot};
use shop_watch::{OrderBoard, Session, StatusSink, StatusUpdater, WatchError, WatchResult};
use uuid::Uuid;

fn order(n: u128, paid: bool) -> Order {
    Order {
        id: Uuid::from_u128(n),
        user: None,
        product: ProductSnapshot {
            id: Uuid::from_u128(900),
            name: "Adhirasam".to_string(),
            image: None,
            price: 150,
        },
        quantity: 1,
        total_price: 150,
        address: None,
        paid,
        status: OrderStatus::Placed,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, Uuid, OrderStatus)>>,
    fail: AtomicBool,
}

#[async_trait::async_trait]
impl StatusSink for RecordingSink {
    async fn update_status(
        &self,
        token: &str,
        order_id: Uuid,
        status: OrderStatus,
    ) -> WatchResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((token.to_string(), order_id, status));
        if self.fail.load(Ordering::SeqCst) {
            return Err(WatchError::Server {
                status: 500,
                message: "Server error".to_string(),
            });
        }
        Ok(())
    }
}

fn setup() -> (Arc<RecordingSink>, StatusUpdater, OrderBoard) {
    let sink = Arc::new(RecordingSink::default());
    let session = Session::in_memory();
    session.set_token("admin-token").unwrap();
    let updater = StatusUpdater::new(sink.clone(), session);
    let board = OrderBoard::new(vec![order(1, true), order(2, false), order(3, true)]);
    (sink, updater, board)
}

#[test]
fn only_paid_orders_expose_a_status_control() {
    let (_, _, board) = setup();
    let control = board.status_control(Uuid::from_u128(1)).unwrap();
    assert_eq!(control.current, OrderStatus::Placed);
    assert_eq!(control.options, OrderStatus::ALL);
    assert!(board.status_control(Uuid::from_u128(2)).is_none());
    assert!(board.status_control(Uuid::from_u128(99)).is_none());
}

#[tokio::test]
async fn unpaid_and_unknown_orders_are_rejected_locally() {
    let (sink, updater, mut board) = setup();

    let err = updater
        .select(&mut board, Uuid::from_u128(2), OrderStatus::Packed)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::NotPaid(_)));

    let err = updater
        .select(&mut board, Uuid::from_u128(99), OrderStatus::Packed)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::UnknownOrder(_)));

    assert!(sink.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn success_updates_only_the_selected_order() {
    let (sink, updater, mut board) = setup();

    updater
        .select(&mut board, Uuid::from_u128(3), OrderStatus::Shipped)
        .await
        .unwrap();

    let statuses: Vec<OrderStatus> = board.orders().iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::Placed, OrderStatus::Placed, OrderStatus::Shipped]
    );
    assert_eq!(
        *sink.calls.lock().unwrap(),
        vec![(
            "admin-token".to_string(),
            Uuid::from_u128(3),
            OrderStatus::Shipped
        )]
    );

    // Backwards moves are allowed.
    updater
        .select(&mut board, Uuid::from_u128(3), OrderStatus::Packed)
        .await
        .unwrap();
    assert_eq!(board.get(Uuid::from_u128(3)).unwrap().status, OrderStatus::Packed);
}

#[tokio::test]
async fn failure_rolls_the_displayed_status_back() {
    let (sink, updater, mut board) = setup();
    updater
        .select(&mut board, Uuid::from_u128(1), OrderStatus::Packed)
        .await
        .unwrap();

    sink.fail.store(true, Ordering::SeqCst);
    let err = updater
        .select(&mut board, Uuid::from_u128(1), OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::Server { status: 500, .. }));
    assert_eq!(board.get(Uuid::from_u128(1)).unwrap().status, OrderStatus::Packed);
}

#[tokio::test]
async fn missing_token_sends_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let updater = StatusUpdater::new(sink.clone(), Session::in_memory());
    let mut board = OrderBoard::new(vec![order(1, true)]);

    let err = updater
        .select(&mut board, Uuid::from_u128(1), OrderStatus::Packed)
        .await
        .unwrap_err();
    assert!(matches!(err, WatchError::AuthMissing));
    assert_eq!(board.get(Uuid::from_u128(1)).unwrap().status, OrderStatus::Placed);
    assert!(sink.calls.lock().unwrap().is_empty());
}
