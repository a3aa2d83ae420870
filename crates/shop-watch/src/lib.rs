//! Operator-side order workflow for the storefront.
//!
//! - [`poller`]: fetches the order list on a fixed interval.
//! - [`detector`]: finds orders whose `paid` flag went false -> true.
//! - [`notifier`]: rings the alarm once per batch of newly paid orders.
//! - [`status`]: status changes for paid orders with rollback on failure.
//! - [`session`]: the persisted token and sound flag.
//! - [`client`]: the REST client and the seams the workflow depends on.

pub mod client;
pub mod detector;
pub mod error;
pub mod notifier;
pub mod poller;
pub mod session;
pub mod status;

pub use client::{OrderFeed, ShopClient, StatusSink};
pub use detector::{detect_transitions, sort_newest_first, PollState};
pub use error::{WatchError, WatchResult};
pub use notifier::{AlarmSink, Notifier, RingPlan, TerminalBell};
pub use poller::{spawn_order_poller, PollEvent, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use session::{Session, SessionStore, ENV_SESSION_PATH};
pub use status::{OrderBoard, StatusControl, StatusUpdater};
