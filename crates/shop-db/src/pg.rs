use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use shop_schemas::{
    Address, AddressInput, Customer, Order, OrderStatus, Product, ProductInput, ProductSnapshot,
    Role,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{normalize_email, InsertUserOutcome, NewOrder, NewUser, OrderRecord, UserRecord};

/// SQLSTATE for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

const ORDER_COLUMNS: &str = r#"
    o.order_id, o.user_id, o.product, o.quantity, o.total_price, o.address,
    o.paid, o.status, o.created_at,
    u.name as customer_name, u.email as customer_email
"#;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.try_get("role")?;
    Ok(UserRecord {
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: Role::parse(&role).ok_or_else(|| anyhow!("invalid role in db: {role}"))?,
        created_at: row.try_get("created_at")?,
    })
}

fn address_from_row(row: &PgRow) -> Result<Address> {
    Ok(Address {
        id: row.try_get("address_id")?,
        street: row.try_get("street")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        pincode: row.try_get("pincode")?,
        phone: row.try_get("phone")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<OrderRecord> {
    let owner_id: Uuid = row.try_get("user_id")?;
    let Json(product): Json<ProductSnapshot> = row.try_get("product")?;
    let address: Option<Json<Address>> = row.try_get("address")?;
    let quantity: i32 = row.try_get("quantity")?;
    let status: String = row.try_get("status")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let order = Order {
        id: row.try_get("order_id")?,
        user: Some(Customer {
            id: owner_id,
            name: row.try_get("customer_name")?,
            email: row.try_get("customer_email")?,
        }),
        product,
        quantity: u32::try_from(quantity).context("negative quantity in db")?,
        total_price: row.try_get("total_price")?,
        address: address.map(|Json(a)| a),
        paid: row.try_get("paid")?,
        status: OrderStatus::parse(&status)
            .ok_or_else(|| anyhow!("invalid order status in db: {status}"))?,
        created_at,
    };
    Ok(OrderRecord { owner_id, order })
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) async fn insert_user(&self, user: NewUser) -> Result<InsertUserOutcome> {
        let res = sqlx::query(
            r#"
            insert into users (user_id, name, email, password_hash, role)
            values ($1, $2, $3, $4, $5)
            returning user_id, name, email, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match res {
            Ok(row) => Ok(InsertUserOutcome::Inserted(user_from_row(&row)?)),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Ok(InsertUserOutcome::DuplicateEmail)
            }
            Err(e) => Err(e).context("insert_user failed"),
        }
    }

    pub(crate) async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            r#"
            select user_id, name, email, password_hash, role, created_at
            from users where email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .context("find_user_by_email failed")?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub(crate) async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            r#"
            select user_id, name, email, password_hash, role, created_at
            from users where user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("find_user failed")?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub(crate) async fn create_session(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        sqlx::query("delete from sessions where expires_at <= now()")
            .execute(&self.pool)
            .await
            .context("purge expired sessions failed")?;

        let token = Uuid::new_v4().simple().to_string();
        sqlx::query("insert into sessions (token, user_id, expires_at) values ($1, $2, $3)")
            .bind(&token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .context("create_session failed")?;
        Ok(token)
    }

    pub(crate) async fn delete_session(&self, token: &str) -> Result<bool> {
        let res = sqlx::query("delete from sessions where token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .context("delete_session failed")?;
        Ok(res.rows_affected() > 0)
    }

    pub(crate) async fn session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            r#"
            select u.user_id, u.name, u.email, u.password_hash, u.role, u.created_at
            from sessions s join users u on u.user_id = s.user_id
            where s.token = $1 and s.expires_at > $2
            "#,
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("session_user failed")?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub(crate) async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let rows = sqlx::query(
            r#"
            select address_id, street, city, state, pincode, phone
            from addresses where user_id = $1
            order by position asc
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("list_addresses failed")?;
        rows.iter().map(address_from_row).collect()
    }

    pub(crate) async fn find_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Address>> {
        let row = sqlx::query(
            r#"
            select address_id, street, city, state, pincode, phone
            from addresses where user_id = $1 and address_id = $2
            "#,
        )
        .bind(user_id)
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await
        .context("find_address failed")?;
        row.as_ref().map(address_from_row).transpose()
    }

    pub(crate) async fn add_address(
        &self,
        user_id: Uuid,
        input: AddressInput,
    ) -> Result<Vec<Address>> {
        sqlx::query(
            r#"
            insert into addresses (address_id, user_id, street, city, state, pincode, phone)
            values ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .bind(&input.phone)
        .execute(&self.pool)
        .await
        .context("add_address failed")?;
        self.list_addresses(user_id).await
    }

    pub(crate) async fn update_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
        input: AddressInput,
    ) -> Result<Option<Vec<Address>>> {
        let res = sqlx::query(
            r#"
            update addresses
            set street = $3, city = $4, state = $5, pincode = $6, phone = $7
            where user_id = $1 and address_id = $2
            "#,
        )
        .bind(user_id)
        .bind(address_id)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .bind(&input.phone)
        .execute(&self.pool)
        .await
        .context("update_address failed")?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(self.list_addresses(user_id).await?))
    }

    pub(crate) async fn delete_address(
        &self,
        user_id: Uuid,
        address_id: Uuid,
    ) -> Result<Option<Vec<Address>>> {
        let res = sqlx::query("delete from addresses where user_id = $1 and address_id = $2")
            .bind(user_id)
            .bind(address_id)
            .execute(&self.pool)
            .await
            .context("delete_address failed")?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(self.list_addresses(user_id).await?))
    }

    pub(crate) async fn insert_product(&self, input: ProductInput) -> Result<Product> {
        let row = sqlx::query(
            r#"
            insert into products (product_id, name, description, price, image)
            values ($1, $2, $3, $4, $5)
            returning product_id, name, description, price, image, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.image)
        .fetch_one(&self.pool)
        .await
        .context("insert_product failed")?;
        product_from_row(&row)
    }

    pub(crate) async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            select product_id, name, description, price, image, created_at
            from products order by created_at desc
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list_products failed")?;
        rows.iter().map(product_from_row).collect()
    }

    pub(crate) async fn get_product(&self, product_id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            select product_id, name, description, price, image, created_at
            from products where product_id = $1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .context("get_product failed")?;
        row.as_ref().map(product_from_row).transpose()
    }

    pub(crate) async fn insert_order(&self, new: NewOrder) -> Result<Order> {
        let order_id = Uuid::new_v4();
        let quantity = i32::try_from(new.quantity).context("quantity out of range")?;
        sqlx::query(
            r#"
            insert into orders (order_id, user_id, product, quantity, total_price, address)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(new.owner_id)
        .bind(Json(new.product.snapshot()))
        .bind(quantity)
        .bind(new.total_price().context("order total overflows")?)
        .bind(new.address.clone().map(Json))
        .execute(&self.pool)
        .await
        .context("insert_order failed")?;

        let rec = self
            .get_order(order_id)
            .await?
            .ok_or_else(|| anyhow!("order {order_id} missing right after insert"))?;
        Ok(rec.order)
    }

    pub(crate) async fn list_orders(&self) -> Result<Vec<Order>> {
        let sql = format!(
            "select {ORDER_COLUMNS} from orders o join users u on u.user_id = o.user_id \
             order by o.created_at desc"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .context("list_orders failed")?;
        rows.iter()
            .map(|r| order_from_row(r).map(|rec| rec.order))
            .collect()
    }

    pub(crate) async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let sql = format!(
            "select {ORDER_COLUMNS} from orders o join users u on u.user_id = o.user_id \
             where o.user_id = $1 order by o.created_at desc"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("list_orders_for_user failed")?;
        rows.iter()
            .map(|r| order_from_row(r).map(|rec| rec.order))
            .collect()
    }

    pub(crate) async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderRecord>> {
        let sql = format!(
            "select {ORDER_COLUMNS} from orders o join users u on u.user_id = o.user_id \
             where o.order_id = $1"
        );
        let row = sqlx::query(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await
            .context("get_order failed")?;
        row.as_ref().map(order_from_row).transpose()
    }

    pub(crate) async fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>> {
        let res = sqlx::query("update orders set status = $2 where order_id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("set_order_status failed")?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get_order(order_id).await?.map(|rec| rec.order))
    }

    pub(crate) async fn mark_order_paid(&self, order_id: Uuid) -> Result<Option<Order>> {
        // `paid` is monotonic: the update never writes false.
        let res = sqlx::query("update orders set paid = true where order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .context("mark_order_paid failed")?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(self.get_order(order_id).await?.map(|rec| rec.order))
    }
}
