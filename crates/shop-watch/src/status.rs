//! Operator status changes for paid orders.

use std::sync::Arc;

use shop_schemas::{Order, OrderStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    client::StatusSink,
    error::{WatchError, WatchResult},
    session::Session,
};

/// What a status selector offers for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusControl {
    pub current: OrderStatus,
    pub options: [OrderStatus; 5],
}

/// The orders currently on display.
#[derive(Debug, Clone, Default)]
pub struct OrderBoard {
    orders: Vec<Order>,
}

impl OrderBoard {
    pub fn new(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Replace everything with a fresh snapshot.
    pub fn replace(&mut self, orders: Vec<Order>) {
        self.orders = orders;
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// `None` for unpaid or unknown orders: they get no status control.
    pub fn status_control(&self, id: Uuid) -> Option<StatusControl> {
        self.get(id).filter(|o| o.paid).map(|o| StatusControl {
            current: o.status,
            options: OrderStatus::ALL,
        })
    }

    /// Set one order's displayed status; returns the previous value.
    fn set_status(&mut self, id: Uuid, status: OrderStatus) -> Option<OrderStatus> {
        let order = self.orders.iter_mut().find(|o| o.id == id)?;
        Some(std::mem::replace(&mut order.status, status))
    }
}

pub struct StatusUpdater {
    sink: Arc<dyn StatusSink>,
    session: Session,
}

impl StatusUpdater {
    pub fn new(sink: Arc<dyn StatusSink>, session: Session) -> Self {
        Self { sink, session }
    }

    /// Apply `status` to order `id` locally, then persist it. On failure the
    /// displayed status goes back to what it was and the error is returned.
    pub async fn select(
        &self,
        board: &mut OrderBoard,
        id: Uuid,
        status: OrderStatus,
    ) -> WatchResult<()> {
        if board.status_control(id).is_none() {
            return Err(match board.get(id) {
                Some(_) => WatchError::NotPaid(id),
                None => WatchError::UnknownOrder(id),
            });
        }
        let token = self.session.token().ok_or(WatchError::AuthMissing)?;

        let previous = board
            .set_status(id, status)
            .ok_or(WatchError::UnknownOrder(id))?;
        if previous.is_backward_move(status) {
            warn!(order_id = %id, from = %previous, to = %status, "status moved backwards");
        }

        match self.sink.update_status(&token, id, status).await {
            Ok(()) => {
                info!(order_id = %id, from = %previous, to = %status, "status updated");
                Ok(())
            }
            Err(err) => {
                board.set_status(id, previous);
                warn!(order_id = %id, error = %err, "status update failed; reverted");
                Err(err)
            }
        }
    }
}
