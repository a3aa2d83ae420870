//! shop-daemon entry point.
//!
//! Thin on purpose: load config, open the store, wire middleware, serve.
//! Route handlers live in `routes.rs`; shared state in `state.rs`.

use std::{net::SocketAddr, path::Path, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use shop_config::{secrets, LoadedConfig, ShopConfig, StoreBackend};
use shop_daemon::{routes, state::AppState};
use shop_db::{SeedOutcome, Store};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_CONFIG: &str = "SHOP_CONFIG";
const ENV_DAEMON_ADDR: &str = "SHOP_DAEMON_ADDR";
const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = load_config()?;
    let mut cfg = loaded.typed()?;
    if std::env::args().skip(1).any(|a| a == "--memory") {
        cfg.store.backend = StoreBackend::Memory;
    }
    info!(config_hash = %loaded.config_hash, backend = ?cfg.store.backend, "config loaded");

    let store = open_store(&loaded, &cfg).await?;
    seed_admin_if_configured(&loaded, &store).await?;

    let shared = Arc::new(AppState::new(store, &cfg.daemon, &cfg.address)?);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&cfg));

    let addr = bind_addr(&cfg)?;
    info!("shop-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// `SHOP_CONFIG` is a comma-separated list of YAML layers, lowest precedence
/// first. Without it, `config/base.yaml` is used when present and built-in
/// defaults otherwise.
fn load_config() -> anyhow::Result<LoadedConfig> {
    let paths: Vec<String> = match std::env::var(ENV_CONFIG) {
        Ok(v) if !v.trim().is_empty() => v
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        _ if Path::new(DEFAULT_CONFIG_PATH).exists() => vec![DEFAULT_CONFIG_PATH.to_string()],
        _ => Vec::new(),
    };
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    shop_config::load_layered_yaml(&refs).context("load config")
}

async fn open_store(loaded: &LoadedConfig, cfg: &ShopConfig) -> anyhow::Result<Store> {
    let resolved = secrets::resolve_store_secrets(&loaded.config_json, cfg.store.backend)?;
    match (cfg.store.backend, resolved.database_url) {
        (StoreBackend::Postgres, Some(url)) => {
            let pool = shop_db::connect(&url).await?;
            shop_db::migrate(&pool).await?;
            Ok(Store::postgres(pool))
        }
        _ => {
            warn!("using in-memory store; data is lost on exit");
            Ok(Store::memory())
        }
    }
}

/// Seed the default admin when its credentials are configured. Missing
/// credentials are not fatal here; `shop admin seed` reports them.
async fn seed_admin_if_configured(loaded: &LoadedConfig, store: &Store) -> anyhow::Result<()> {
    let seed = match secrets::resolve_admin_seed(&loaded.config_json) {
        Ok(seed) => seed,
        Err(err) => {
            info!("admin seed skipped: {err}");
            return Ok(());
        }
    };
    match shop_db::seed_admin(store, &seed.email, &seed.password).await? {
        SeedOutcome::Created(user) => info!(user_id = %user.user_id, "default admin created"),
        SeedOutcome::AlreadyExists => info!("default admin already exists"),
    }
    Ok(())
}

fn bind_addr(cfg: &ShopConfig) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var(ENV_DAEMON_ADDR).unwrap_or_else(|_| cfg.daemon.addr.clone());
    raw.parse()
        .with_context(|| format!("invalid bind address {raw:?}"))
}

fn cors_from_config(cfg: &ShopConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .daemon
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
