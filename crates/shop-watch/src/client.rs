//! HTTP client for the storefront REST API.
//!
//! The poller and the status updater depend on the [`OrderFeed`] and
//! [`StatusSink`] seams, not on [`ShopClient`] directly.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use shop_schemas::{
    ErrorBody, LoginRequest, LoginResponse, MessageResponse, Order, OrderStatus, Role,
    SignupRequest, StatusUpdateRequest,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::{WatchError, WatchResult};

/// Source of the full order list.
#[async_trait::async_trait]
pub trait OrderFeed: Send + Sync {
    async fn all_orders(&self, token: &str) -> WatchResult<Vec<Order>>;
}

/// Destination for operator status changes.
#[async_trait::async_trait]
pub trait StatusSink: Send + Sync {
    async fn update_status(&self, token: &str, order_id: Uuid, status: OrderStatus)
        -> WatchResult<()>;
}

#[derive(Debug, Clone)]
pub struct ShopClient {
    http: reqwest::Client,
    base_url: String,
}

impl ShopClient {
    /// `base_url` includes the `/api` prefix, e.g. `http://127.0.0.1:5000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `admin = true` asks the server to refuse customer accounts.
    pub async fn login(&self, email: &str, password: &str, admin: bool) -> WatchResult<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            role: admin.then_some(Role::Admin),
        };
        let resp = self.http.post(self.url("auth/login")).json(&body).send().await?;
        decode(resp).await
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> WatchResult<String> {
        let body = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp = self.http.post(self.url("auth/signup")).json(&body).send().await?;
        let msg: MessageResponse = decode(resp).await?;
        Ok(msg.message)
    }

    /// Revoke `token` on the server.
    pub async fn logout(&self, token: &str) -> WatchResult<()> {
        let resp = self
            .http
            .post(self.url("auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        check(resp).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl OrderFeed for ShopClient {
    async fn all_orders(&self, token: &str) -> WatchResult<Vec<Order>> {
        let resp = self
            .http
            .get(self.url("orders/all"))
            .bearer_auth(token)
            .send()
            .await?;
        decode(resp).await
    }
}

#[async_trait::async_trait]
impl StatusSink for ShopClient {
    async fn update_status(
        &self,
        token: &str,
        order_id: Uuid,
        status: OrderStatus,
    ) -> WatchResult<()> {
        let resp = self
            .http
            .patch(self.url(&format!("orders/update-status/{order_id}")))
            .bearer_auth(token)
            .json(&StatusUpdateRequest { status })
            .send()
            .await?;
        // Success carries only `{message}`; callers merge locally.
        check(resp).await.map(|_| ())
    }
}

/// Map a non-2xx response to `WatchError::Server`, reading `{message}` when
/// the body has one.
async fn check(resp: Response) -> WatchResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or_else(|_| fallback_message(status, &text));
    debug!(status = status.as_u16(), %message, "request rejected");
    Err(WatchError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> WatchResult<T> {
    let resp = check(resp).await?;
    resp.json::<T>()
        .await
        .map_err(|e| WatchError::Network(format!("response decode failed: {e}")))
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
