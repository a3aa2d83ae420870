//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"SHOP_DATABASE_URL"`).
//! - Binaries resolve secrets once at startup and pass the resolved structs
//!   into constructors; nothing else reads `std::env::var` for secrets.
//! - `Debug` impls on secret-carrying structs **redact** values.
//! - Error messages reference the env var **NAME**, never the value.

use anyhow::{bail, Result};
use serde_json::Value;

use crate::StoreBackend;

pub const DEFAULT_DATABASE_URL_ENV: &str = "SHOP_DATABASE_URL";
pub const DEFAULT_ADMIN_EMAIL_ENV: &str = "SHOP_ADMIN_EMAIL";
pub const DEFAULT_ADMIN_PASSWORD_ENV: &str = "SHOP_ADMIN_PASSWORD";

/// Secrets needed to open the order store.
#[derive(Clone)]
pub struct StoreSecrets {
    /// `None` for the in-memory backend.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for StoreSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSecrets")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

/// Credentials for the default admin account created by `shop admin seed`.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The email is not secret; the password is.
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Read a non-empty string value at `pointer` from a JSON config.
fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `None` if the variable is unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve store secrets for `backend`.
///
/// Postgres requires the database URL env var; the in-memory backend needs
/// nothing.
pub fn resolve_store_secrets(config_json: &Value, backend: StoreBackend) -> Result<StoreSecrets> {
    let var = read_str_at(config_json, "/store/database_url_env")
        .unwrap_or_else(|| DEFAULT_DATABASE_URL_ENV.to_string());

    match backend {
        StoreBackend::Memory => Ok(StoreSecrets { database_url: None }),
        StoreBackend::Postgres => {
            let Some(url) = resolve_env(&var) else {
                bail!(
                    "SECRETS_MISSING backend=postgres: required env var '{}' \
                     (database url) is not set or empty",
                    var
                );
            };
            Ok(StoreSecrets {
                database_url: Some(url),
            })
        }
    }
}

/// Resolve the default admin credentials. Both values are required.
pub fn resolve_admin_seed(config_json: &Value) -> Result<AdminSeed> {
    let email_var = read_str_at(config_json, "/admin/email_env")
        .unwrap_or_else(|| DEFAULT_ADMIN_EMAIL_ENV.to_string());
    let password_var = read_str_at(config_json, "/admin/password_env")
        .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD_ENV.to_string());

    let Some(email) = resolve_env(&email_var) else {
        bail!(
            "SECRETS_MISSING admin seed: required env var '{}' (admin email) is not set or empty",
            email_var
        );
    };
    let Some(password) = resolve_env(&password_var) else {
        bail!(
            "SECRETS_MISSING admin seed: required env var '{}' (admin password) is not set or empty",
            password_var
        );
    };

    Ok(AdminSeed {
        email: email.trim().to_string(),
        password,
    })
}
