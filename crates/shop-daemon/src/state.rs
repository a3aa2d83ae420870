//! Shared runtime state for shop-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The store handle is
//! cheap to clone; everything else is immutable after boot.

use std::sync::OnceLock;
use std::time::Instant;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use shop_config::{AddressConfig, DaemonConfig};
use shop_db::{Store, DEFAULT_SESSION_TTL_HOURS};

use crate::validation::AddressRule;

/// Static build metadata included in health responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub store: Store,
    pub build: BuildInfo,
    pub address_rule: AddressRule,
    /// Lifetime of tokens issued at login.
    pub session_ttl: Duration,
}

/// A century; longer lifetimes are clamped.
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365 * 100;

fn ttl_from_hours(hours: u64) -> Duration {
    Duration::hours(hours.min(MAX_SESSION_TTL_HOURS) as i64)
}

impl AppState {
    pub fn new(
        store: Store,
        daemon: &DaemonConfig,
        address: &AddressConfig,
    ) -> anyhow::Result<Self> {
        // Touch the clock so uptime counts from boot, not first request.
        uptime_secs();
        Ok(Self {
            store,
            build: BuildInfo {
                service: "shop-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            address_rule: AddressRule::from_config(address)?,
            session_ttl: ttl_from_hours(daemon.session_ttl_hours),
        })
    }

    /// Fresh in-memory state with default config. Used by tests and
    /// `--memory` dev runs.
    pub fn in_memory() -> Self {
        Self {
            store: Store::memory(),
            build: BuildInfo {
                service: "shop-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            address_rule: AddressRule::default(),
            session_ttl: ttl_from_hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }
}

/// Seconds since the first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs()
}
