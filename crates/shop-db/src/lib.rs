//! Persistence for the storefront: accounts, sessions, addresses, products
//! and orders.
//!
//! [`Store`] is the single handle the daemon and CLI hold. It dispatches to
//! either the Postgres backend (production) or the in-memory backend (tests
//! and `--memory` dev runs); both honor the same contracts:
//! - order listings are newest first (`created_at` descending);
//! - `paid` only ever moves false -> true;
//! - address mutations return the owner's full address list, or `None` when
//!   the address does not exist for that owner.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use shop_schemas::{
    Address, AddressInput, Order, OrderStatus, Product, ProductInput, Role, UserProfile,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;
use uuid::Uuid;

pub mod credentials;
mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

pub const ENV_DB_URL: &str = "SHOP_DATABASE_URL";

/// Default bearer-token lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: u64 = 24 * 7;

/// Connect to Postgres at `url`.
pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Connect to Postgres using SHOP_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='orders'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_orders_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_orders_table: bool,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Full account row, including the credential digest. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    /// bcrypt hash string; carries its own salt and cost.
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub enum InsertUserOutcome {
    Inserted(UserRecord),
    DuplicateEmail,
}

/// An order plus the id of the account that placed it.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub owner_id: Uuid,
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner_id: Uuid,
    pub product: Product,
    pub quantity: u32,
    pub address: Option<Address>,
}

impl NewOrder {
    /// `None` when price times quantity does not fit in an `i64`.
    pub fn total_price(&self) -> Option<i64> {
        self.product.price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone)]
pub enum SeedOutcome {
    Created(UserRecord),
    AlreadyExists,
}

/// Create the admin account `email` unless an account with that email exists.
pub async fn seed_admin(store: &Store, email: &str, password: &str) -> Result<SeedOutcome> {
    if store.find_user_by_email(email).await?.is_some() {
        return Ok(SeedOutcome::AlreadyExists);
    }
    let outcome = store
        .insert_user(NewUser {
            name: "Admin".to_string(),
            email: email.to_string(),
            password_hash: credentials::hash_password(password)?,
            role: Role::Admin,
        })
        .await?;
    Ok(match outcome {
        InsertUserOutcome::Inserted(rec) => {
            info!(user_id = %rec.user_id, "admin account seeded");
            SeedOutcome::Created(rec)
        }
        // Lost a race with a concurrent seed.
        InsertUserOutcome::DuplicateEmail => SeedOutcome::AlreadyExists,
    })
}

/// Normalize an email for lookup and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Storage handle. Cheap to clone.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Postgres(PgStore),
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            Store::Memory(s) => s.$method($($arg),*).await,
            Store::Postgres(s) => s.$method($($arg),*).await,
        }
    };
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::new())
    }

    pub fn postgres(pool: PgPool) -> Self {
        Store::Postgres(PgStore::new(pool))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Postgres(_) => "postgres",
        }
    }

    // -- accounts -----------------------------------------------------------

    pub async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome> {
        dispatch!(self, insert_user(user))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        dispatch!(self, find_user_by_email(email))
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        dispatch!(self, find_user(user_id))
    }

    /// Issue a new opaque bearer token for `user_id`, valid for `ttl`.
    /// Expired sessions are purged as a side effect.
    pub async fn create_session(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let expires_at = Utc::now() + ttl;
        dispatch!(self, create_session(user_id, expires_at))
    }

    /// The account behind `token`; `None` when unknown, revoked or expired.
    pub async fn session_user(&self, token: &str) -> Result<Option<UserRecord>> {
        dispatch!(self, session_user(token, Utc::now()))
    }

    /// Revoke `token`. Returns whether a session was removed.
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        dispatch!(self, delete_session(token))
    }

    // -- addresses ----------------------------------------------------------

    pub async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        dispatch!(self, list_addresses(user_id))
    }

    pub async fn find_address(&self, user_id: Uuid, address_id: Uuid) -> Result<Option<Address>> {
        dispatch!(self, find_address(user_id, address_id))
    }

    pub async fn add_address(&self, user_id: Uuid, input: AddressInput) -> Result<Vec<Address>> {
        dispatch!(self, add_address(user_id, input))
    }

    pub async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<Option<Vec<Address>>> {
        dispatch!(self, update_address(user_id, address_id, input))
    }

    pub async fn delete_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Vec<Address>>> {
        dispatch!(self, delete_address(user_id, address_id))
    }

    // -- products -----------------------------------------------------------

    pub async fn insert_product(&self, input: ProductInput) -> Result<Product> {
        dispatch!(self, insert_product(input))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        dispatch!(self, list_products())
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>> {
        dispatch!(self, get_product(product_id))
    }

    // -- orders -------------------------------------------------------------

    pub async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        dispatch!(self, insert_order(new))
    }

    /// Every order with its customer attached, newest first.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        dispatch!(self, list_orders())
    }

    pub async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        dispatch!(self, list_orders_for_user(user_id))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderRecord>> {
        dispatch!(self, get_order(order_id))
    }

    /// `None` when the order does not exist.
    pub async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        dispatch!(self, set_order_status(order_id, status))
    }

    /// Flip `paid` to true. Idempotent; `None` when the order does not exist.
    pub async fn mark_order_paid(&self, order_id: Uuid) -> Result<Option<Order>> {
        dispatch!(self, mark_order_paid(order_id))
    }
}
