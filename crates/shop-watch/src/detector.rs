//! Payment transition detection.
//!
//! Pure functions over order snapshots: no IO, no clock, no async. The
//! poller threads a [`PollState`] through its loop; everything else here is
//! deterministic given its inputs.

use std::collections::HashMap;

use shop_schemas::Order;
use uuid::Uuid;

/// Sort by `created_at`, newest first. Stable for equal timestamps.
pub fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Orders in `current` that are paid now and were seen unpaid in `previous`.
///
/// An order absent from `previous` never qualifies, even if it is already
/// paid: there is no observed `false` to compare against. Output keeps the
/// order of `current`.
pub fn detect_transitions(previous: &[Order], current: &[Order]) -> Vec<Order> {
    let was_paid: HashMap<Uuid, bool> = previous.iter().map(|o| (o.id, o.paid)).collect();
    current
        .iter()
        .filter(|o| o.paid && was_paid.get(&o.id) == Some(&false))
        .cloned()
        .collect()
}

/// The snapshot held between polls.
#[derive(Debug, Clone, Default)]
pub struct PollState {
    snapshot: Vec<Order>,
}

impl PollState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &[Order] {
        &self.snapshot
    }

    /// Sort `fetched`, diff it against the held snapshot, then replace the
    /// snapshot with it unconditionally.
    pub fn advance(self, mut fetched: Vec<Order>) -> (PollState, Vec<Order>) {
        sort_newest_first(&mut fetched);
        let newly_paid = detect_transitions(&self.snapshot, &fetched);
        (PollState { snapshot: fetched }, newly_paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shop_schemas::{OrderStatus, ProductSnapshot};

    fn order(n: u128, paid: bool, minute: u32) -> Order {
        Order {
            id: Uuid::from_u128(n),
            user: None,
            product: ProductSnapshot {
                id: Uuid::from_u128(1000),
                name: "Mysore pak".to_string(),
                image: None,
                price: 250,
            },
            quantity: 1,
            total_price: 250,
            address: None,
            paid,
            status: OrderStatus::Placed,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn sort_puts_newest_first() {
        let mut orders = vec![order(1, false, 1), order(2, false, 30), order(3, false, 15)];
        sort_newest_first(&mut orders);
        let ids: Vec<u128> = orders.iter().map(|o| o.id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn advance_replaces_snapshot_even_without_transitions() {
        let (state, newly) = PollState::new().advance(vec![order(1, true, 0)]);
        assert!(newly.is_empty());
        assert_eq!(state.snapshot().len(), 1);

        let (state, newly) = state.advance(vec![]);
        assert!(newly.is_empty());
        assert!(state.snapshot().is_empty());
    }
}
