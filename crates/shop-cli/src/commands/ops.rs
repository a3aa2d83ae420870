//! Config loading and database-side operator commands.

use std::path::Path;

use anyhow::{Context, Result};
use shop_config::{secrets, LoadedConfig, StoreBackend};
use shop_db::{SeedOutcome, Store};
use sqlx::PgPool;

const ENV_CONFIG: &str = "SHOP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/base.yaml";

/// Explicit `--config` paths win, then `$SHOP_CONFIG` (comma-separated), then
/// `config/base.yaml` if it exists, then built-in defaults.
pub fn load_config(explicit: &[String]) -> Result<LoadedConfig> {
    let paths: Vec<String> = if !explicit.is_empty() {
        explicit.to_vec()
    } else {
        match std::env::var(ENV_CONFIG) {
            Ok(v) if !v.trim().is_empty() => v
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ if Path::new(DEFAULT_CONFIG_PATH).exists() => vec![DEFAULT_CONFIG_PATH.to_string()],
            _ => Vec::new(),
        }
    };
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    shop_config::load_layered_yaml(&refs).context("load config")
}

/// Connect to Postgres using the configured database URL env var.
pub async fn connect(loaded: &LoadedConfig) -> Result<PgPool> {
    let resolved = secrets::resolve_store_secrets(&loaded.config_json, StoreBackend::Postgres)?;
    let url = resolved
        .database_url
        .context("postgres backend resolved without a database url")?;
    shop_db::connect(&url).await
}

pub async fn seed_admin(loaded: &LoadedConfig) -> Result<()> {
    let seed = secrets::resolve_admin_seed(&loaded.config_json)?;
    let pool = connect(loaded).await?;
    shop_db::migrate(&pool).await?;
    let store = Store::postgres(pool);

    match shop_db::seed_admin(&store, &seed.email, &seed.password).await? {
        SeedOutcome::Created(user) => {
            println!("admin_seeded=created user_id={} email={}", user.user_id, user.email);
        }
        SeedOutcome::AlreadyExists => {
            println!("admin_seeded=exists email={}", seed.email);
        }
    }
    Ok(())
}
