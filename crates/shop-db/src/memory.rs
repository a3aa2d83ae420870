use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shop_schemas::{
    Address, AddressInput, Customer, Order, OrderStatus, Product, ProductInput,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{normalize_email, InsertUserOutcome, NewOrder, NewUser, OrderRecord, UserRecord};

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    /// token -> (owner, expiry)
    sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    /// Per-owner address lists, in insertion order.
    addresses: HashMap<Uuid, Vec<Address>>,
    products: Vec<Product>,
    /// Insertion order; listings sort a copy.
    orders: Vec<OrderRecord>,
}

impl Inner {
    fn customer(&self, user_id: Uuid) -> Option<Customer> {
        self.users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| Customer {
                id: u.user_id,
                name: u.name.clone(),
                email: u.email.clone(),
            })
    }

    fn with_customer(&self, rec: &OrderRecord) -> Order {
        let mut order = rec.order.clone();
        order.user = self.customer(rec.owner_id);
        order
    }
}

/// In-process store. Contents are lost when the last clone is dropped.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

fn newest_first(orders: &mut [Order]) {
    // Stable sort; callers pass newest-inserted first so ties keep that order.
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome> {
        let mut g = self.inner.write().await;
        let email = normalize_email(&user.email);
        if g.users.iter().any(|u| u.email == email) {
            return Ok(InsertUserOutcome::DuplicateEmail);
        }
        let rec = UserRecord {
            user_id: Uuid::new_v4(),
            name: user.name,
            email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        g.users.push(rec.clone());
        Ok(InsertUserOutcome::Inserted(rec))
    }

    pub(crate) async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = normalize_email(email);
        let g = self.inner.read().await;
        Ok(g.users.iter().find(|u| u.email == email).cloned())
    }

    pub(crate) async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let g = self.inner.read().await;
        Ok(g.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    pub(crate) async fn create_session(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let mut g = self.inner.write().await;
        g.sessions.retain(|_, (_, exp)| *exp > now);
        g.sessions.insert(token.clone(), (user_id, expires_at));
        Ok(token)
    }

    pub(crate) async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        let g = self.inner.read().await;
        let Some((user_id, expires_at)) = g.sessions.get(token) else {
            return Ok(None);
        };
        if *expires_at <= now {
            return Ok(None);
        }
        Ok(g.users.iter().find(|u| u.user_id == *user_id).cloned())
    }

    pub(crate) async fn delete_session(&self, token: &str) -> Result<bool> {
        Ok(self.inner.write().await.sessions.remove(token).is_some())
    }

    pub(crate) async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let g = self.inner.read().await;
        Ok(g.addresses.get(&user_id).cloned().unwrap_or_default())
    }

    pub(crate) async fn find_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Address>> {
        let g = self.inner.read().await;
        Ok(g
            .addresses
            .get(&user_id)
            .and_then(|list| list.iter().find(|a| a.id == address_id))
            .cloned())
    }

    pub(crate) async fn add_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<Vec<Address>> {
        let mut g = self.inner.write().await;
        let list = g.addresses.entry(user_id).or_default();
        list.push(input.into_address(Uuid::new_v4()));
        Ok(list.clone())
    }

    pub(crate) async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<Option<Vec<Address>>> {
        let mut g = self.inner.write().await;
        let Some(list) = g.addresses.get_mut(&user_id) else {
            return Ok(None);
        };
        let Some(slot) = list.iter_mut().find(|a| a.id == address_id) else {
            return Ok(None);
        };
        *slot = input.into_address(address_id);
        Ok(Some(list.clone()))
    }

    pub(crate) async fn delete_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Vec<Address>>> {
        let mut g = self.inner.write().await;
        let Some(list) = g.addresses.get_mut(&user_id) else {
            return Ok(None);
        };
        let before = list.len();
        list.retain(|a| a.id != address_id);
        if list.len() == before {
            return Ok(None);
        }
        Ok(Some(list.clone()))
    }

    pub(crate) async fn insert_product(&self, input: ProductInput) -> Result<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            price: input.price,
            image: input.image,
            created_at: Utc::now(),
        };
        self.inner.write().await.products.push(product.clone());
        Ok(product)
    }

    pub(crate) async fn list_products(&self) -> Result<Vec<Product>> {
        let mut products = self.inner.read().await.products.clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    pub(crate) async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>> {
        let g = self.inner.read().await;
        Ok(g.products.iter().find(|p| p.id == product_id).cloned())
    }

    pub(crate) async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let order = Order {
            id: Uuid::new_v4(),
            user: None,
            product: new.product.snapshot(),
            quantity: new.quantity,
            total_price: new.total_price().context("order total overflows")?,
            address: new.address.clone(),
            paid: false,
            status: OrderStatus::Placed,
            created_at: Utc::now(),
        };
        let mut g = self.inner.write().await;
        let rec = OrderRecord {
            owner_id: new.owner_id,
            order,
        };
        let out = g.with_customer(&rec);
        g.orders.push(rec);
        Ok(out)
    }

    pub(crate) async fn list_orders(&self) -> Result<Vec<Order>> {
        let g = self.inner.read().await;
        let mut out: Vec<Order> = g.orders.iter().rev().map(|r| g.with_customer(r)).collect();
        newest_first(&mut out);
        Ok(out)
    }

    pub(crate) async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let g = self.inner.read().await;
        let mut out: Vec<Order> = g
            .orders
            .iter()
            .rev()
            .filter(|r| r.owner_id == user_id)
            .map(|r| g.with_customer(r))
            .collect();
        newest_first(&mut out);
        Ok(out)
    }

    pub(crate) async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderRecord>> {
        let g = self.inner.read().await;
        Ok(g
            .orders
            .iter()
            .find(|r| r.order.id == order_id)
            .map(|r| OrderRecord {
                owner_id: r.owner_id,
                order: g.with_customer(r),
            }))
    }

    pub(crate) async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let mut g = self.inner.write().await;
        let Some(idx) = g.orders.iter().position(|r| r.order.id == order_id) else {
            return Ok(None);
        };
        g.orders[idx].order.status = status;
        let out = g.with_customer(&g.orders[idx]);
        Ok(Some(out))
    }

    pub(crate) async fn mark_order_paid(&self, order_id: Uuid) -> Result<Option<Order>> {
        let mut g = self.inner.write().await;
        let Some(idx) = g.orders.iter().position(|r| r.order.id == order_id) else {
            return Ok(None);
        };
        g.orders[idx].order.paid = true;
        let out = g.with_customer(&g.orders[idx]);
        Ok(Some(out))
    }
}
