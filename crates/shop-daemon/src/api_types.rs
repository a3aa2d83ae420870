//! Daemon-only response types. Shared request/response bodies live in
//! `shop_schemas`; no business logic lives here.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /api/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub uptime_secs: u64,
}

// ---------------------------------------------------------------------------
// PATCH /api/orders/update-status/:id
// ---------------------------------------------------------------------------

/// Raw `{status}` body. Parsed with [`shop_schemas::OrderStatus::parse`] so
/// an unknown value is a 400 with a specific message instead of a generic
/// body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    #[serde(default)]
    pub status: String,
}
