//! Transition detection over sequences of polls.
//!
//! An alert fires for order O at poll N iff O is paid at N and O was present
//! and unpaid at N-1.

use chrono::{TimeZone, Utc};
use shop_schemas::{Order, OrderStatus, ProductSnapshot};
use shop_watch::{detect_transitions, PollState};
use uuid::Uuid;

fn order(n: u128, paid: bool) -> Order {
    Order {
        id: Uuid::from_u128(n),
        user: None,
        product: ProductSnapshot {
            id: Uuid::from_u128(900),
            name: "Kaju katli".to_string(),
            image: None,
            price: 400,
        },
        quantity: 1,
        total_price: 400,
        address: None,
        paid,
        status: OrderStatus::Placed,
        // Higher ids are newer.
        created_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
            + chrono::Duration::minutes(n as i64),
    }
}

fn ids(orders: &[Order]) -> Vec<u128> {
    orders.iter().map(|o| o.id.as_u128()).collect()
}

#[test]
fn unseen_paid_order_is_not_a_transition() {
    let previous = vec![order(1, false)];
    let current = vec![order(1, true), order(2, true)];
    assert_eq!(ids(&detect_transitions(&previous, &current)), vec![1]);
}

#[test]
fn first_poll_never_reports_transitions() {
    let fetched = vec![order(1, true), order(2, false), order(3, true)];
    let (state, newly) = PollState::new().advance(fetched);
    assert!(newly.is_empty());
    // Snapshot is stored newest first.
    assert_eq!(ids(state.snapshot()), vec![3, 2, 1]);
}

#[test]
fn already_paid_orders_never_refire() {
    let paid = vec![order(1, true), order(2, true)];
    assert!(detect_transitions(&paid, &paid).is_empty());

    let mut state = PollState::new();
    let mut fired = Vec::new();
    for list in [
        vec![order(1, false)],
        vec![order(1, true)],
        vec![order(1, true)],
        vec![order(1, true)],
    ] {
        let (next, newly) = state.advance(list);
        state = next;
        fired.extend(ids(&newly));
    }
    assert_eq!(fired, vec![1], "exactly one alert for one transition");
}

#[test]
fn sequence_of_polls_fires_once_per_observed_flip() {
    let polls = vec![
        vec![order(1, false), order(2, false)],
        // 1 flips; 3 appears already paid.
        vec![order(1, true), order(2, false), order(3, true)],
        // 2 disappears (e.g. filtered) while unpaid.
        vec![order(1, true), order(3, true)],
        // 2 comes back paid: it was absent at the previous poll, so no alert.
        vec![order(1, true), order(2, true), order(3, true), order(4, false)],
        // 4 flips.
        vec![order(1, true), order(2, true), order(3, true), order(4, true)],
    ];
    let expected: Vec<Vec<u128>> = vec![vec![], vec![1], vec![], vec![], vec![4]];

    let mut state = PollState::new();
    for (n, (list, want)) in polls.into_iter().zip(expected).enumerate() {
        let (next, newly) = state.advance(list);
        state = next;
        assert_eq!(ids(&newly), want, "poll {n}");
    }
}

#[test]
fn batch_keeps_newest_first_order() {
    let previous = vec![order(1, false), order(2, false), order(3, false)];
    let (state, _) = PollState::new().advance(previous);
    let (_, newly) = state.advance(vec![order(1, true), order(3, true), order(2, true)]);
    assert_eq!(ids(&newly), vec![3, 2, 1]);
}
