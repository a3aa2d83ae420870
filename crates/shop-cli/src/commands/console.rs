//! Order console: login, alarm controls, listing, watching, status changes.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use shop_config::WatchConfig;
use shop_schemas::{Order, OrderStatus};
use shop_watch::{
    spawn_order_poller, AlarmSink, Notifier, OrderBoard, OrderFeed, PollEvent, RingPlan, Session,
    ShopClient, StatusUpdater, TerminalBell, WatchError,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ops;

const ENV_API_URL: &str = "SHOP_API_URL";

pub struct Console {
    pub session: Session,
    pub client: ShopClient,
    pub watch: WatchConfig,
}

impl Console {
    pub fn open(config_paths: &[String], api: Option<&str>) -> Result<Self> {
        let loaded = ops::load_config(config_paths)?;
        let watch = loaded.typed()?.watch;

        let base_url = match api {
            Some(url) => url.to_string(),
            None => std::env::var(ENV_API_URL)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| watch.base_url.clone()),
        };

        let session = Session::open_default().context("open session")?;
        Ok(Self {
            session,
            client: ShopClient::new(base_url),
            watch,
        })
    }

    pub fn notifier(&self) -> Notifier {
        let sink: Arc<dyn AlarmSink> = Arc::new(TerminalBell);
        Notifier::new(self.session.clone(), Some(sink), RingPlan::from(&self.watch))
    }

    fn token(&self) -> Result<String> {
        Ok(self.session.token().ok_or(WatchError::AuthMissing)?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let resp = self.client.login(email, password, true).await?;
        self.session.set_token(&resp.token)?;
        println!(
            "logged_in=true name={} role={}",
            resp.user.name,
            resp.user.role.as_str()
        );
        Ok(())
    }

    /// Forget the local token. The server-side revoke is attempted first; a
    /// stale or unreachable session still clears locally.
    pub async fn logout(&self) -> Result<()> {
        let revoked = match self.session.token() {
            Some(token) => match self.client.logout(&token).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(error = %err, "server-side logout failed; clearing local session");
                    false
                }
            },
            None => false,
        };
        self.session.clear_token().context("clear session token")?;
        println!("logged_out=true revoked={revoked}");
        Ok(())
    }

    pub async fn list(&self) -> Result<()> {
        let token = self.token()?;
        let mut orders = self.client.all_orders(&token).await?;
        shop_watch::sort_newest_first(&mut orders);
        if orders.is_empty() {
            println!("no orders");
        }
        for o in &orders {
            println!("{}", order_line(o));
        }
        Ok(())
    }

    /// Poll until Ctrl-C or until the credential is missing or rejected.
    pub async fn watch(&self, interval_secs: Option<u64>) -> Result<()> {
        let secs = interval_secs.unwrap_or(self.watch.poll_interval_secs).max(1);
        let (tx, mut rx) = mpsc::channel(32);
        let handle = spawn_order_poller(
            Arc::new(self.client.clone()),
            self.session.clone(),
            self.notifier(),
            Duration::from_secs(secs),
            tx,
        );
        info!(interval_secs = secs, api = self.client.base_url(), "watching orders");
        if !self.session.sound_enabled() {
            eprintln!("sound is off; run `shop sound enable` to hear payment alerts");
        }

        let outcome = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break Ok(()),
                ev = rx.recv() => match ev {
                    Some(PollEvent::Refreshed { orders, newly_paid }) => {
                        for o in &newly_paid {
                            println!("PAID {}", order_line(o));
                        }
                        println!(
                            "refreshed orders={} unpaid={} newly_paid={}",
                            orders.len(),
                            orders.iter().filter(|o| !o.paid).count(),
                            newly_paid.len()
                        );
                    }
                    Some(PollEvent::FetchFailed(err)) => {
                        eprintln!("fetch failed: {err}; keeping previous orders");
                    }
                    Some(PollEvent::Stopped(err)) => break Err(err),
                    None => break Ok(()),
                },
            }
        };

        handle.stop().await;
        outcome.map_err(|e| anyhow::Error::new(e).context("order watch stopped"))
    }

    pub async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
        let token = self.token()?;
        let mut board = OrderBoard::new(self.client.all_orders(&token).await?);
        if let Some(order) = board.get(order_id) {
            if order.status.is_backward_move(status) {
                eprintln!("note: moving {} back from {} to {}", order_id, order.status, status);
            }
        }

        let updater = StatusUpdater::new(Arc::new(self.client.clone()), self.session.clone());
        updater.select(&mut board, order_id, status).await?;

        if let Some(order) = board.get(order_id) {
            println!("updated=true {}", order_line(order));
        }
        Ok(())
    }
}

fn order_line(o: &Order) -> String {
    let customer = o.user.as_ref().map(|c| c.name.as_str()).unwrap_or("-");
    format!(
        "{} {} {:<6} {:<16} {}x {} total={} customer={}",
        o.id,
        o.created_at.format("%Y-%m-%d %H:%M"),
        if o.paid { "PAID" } else { "UNPAID" },
        o.status.as_str(),
        o.quantity,
        o.product.name,
        o.total_price,
        customer
    )
}
