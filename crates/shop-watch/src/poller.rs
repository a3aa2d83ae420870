//! Periodic order polling.
//!
//! [`spawn_order_poller`] starts a Tokio task that fetches the full order
//! list on every tick (the first tick fires immediately), runs the detector
//! and reports the outcome on an mpsc channel. The task lives until
//! [`PollerHandle::stop`] is awaited, the handle is dropped, the receiver
//! goes away, or the credential is missing or rejected.

use std::{sync::Arc, time::Duration};

use shop_schemas::Order;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    client::OrderFeed,
    detector::PollState,
    error::WatchError,
    notifier::Notifier,
    session::Session,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum PollEvent {
    /// A successful fetch. `orders` is the new snapshot, newest first.
    Refreshed {
        orders: Vec<Order>,
        newly_paid: Vec<Order>,
    },
    /// The fetch failed; the previous snapshot is kept and polling goes on.
    FetchFailed(WatchError),
    /// Terminal: the loop has exited.
    Stopped(WatchError),
}

/// Owner of a running poller. Dropping it aborts the task.
pub struct PollerHandle {
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancel the timer and wait for the task to finish. No tick runs after
    /// this returns.
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled is the expected outcome.
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub fn spawn_order_poller(
    feed: Arc<dyn OrderFeed>,
    session: Session,
    notifier: Notifier,
    period: Duration,
    events: mpsc::Sender<PollEvent>,
) -> PollerHandle {
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = PollState::new();

        loop {
            ticker.tick().await;

            let Some(token) = session.token() else {
                warn!("order poller stopped: not signed in");
                let _ = events.send(PollEvent::Stopped(WatchError::AuthMissing)).await;
                break;
            };

            let event = match feed.all_orders(&token).await {
                Ok(fetched) => {
                    let (next, newly_paid) = std::mem::take(&mut state).advance(fetched);
                    state = next;
                    if !newly_paid.is_empty() {
                        info!(count = newly_paid.len(), "new paid orders");
                        notifier.alert(&newly_paid);
                    }
                    PollEvent::Refreshed {
                        orders: state.snapshot().to_vec(),
                        newly_paid,
                    }
                }
                Err(err) if err.is_auth_failure() => {
                    warn!(error = %err, "order poller stopped: credential rejected");
                    let _ = events.send(PollEvent::Stopped(err)).await;
                    break;
                }
                Err(err) => {
                    warn!(error = %err, kept = state.snapshot().len(), "order fetch failed");
                    PollEvent::FetchFailed(err)
                }
            };

            if events.send(event).await.is_err() {
                debug!("order poller stopped: receiver dropped");
                break;
            }
        }
    });

    PollerHandle { task: Some(task) }
}
