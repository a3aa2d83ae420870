//! Axum router and all HTTP handlers for shop-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use shop_db::{credentials, InsertUserOutcome, NewOrder, NewUser};
use shop_schemas::{
    AddressInput, AddressesResponse, CreateOrderRequest, LoginRequest, LoginResponse,
    MessageResponse, OrderStatus, ProductInput, Role, SignupRequest,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{HealthResponse, StatusBody},
    auth::{AdminUser, AuthUser, SessionAuth},
    error::{ApiError, ApiResult},
    state::{uptime_secs, AppState},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/:id", get(get_product))
        .route("/api/orders", post(create_order))
        .route("/api/orders/mine", get(my_orders))
        .route("/api/orders/all", get(all_orders))
        .route("/api/orders/update-status/:id", patch(update_status))
        .route("/api/orders/mark-paid/:id", patch(mark_paid))
        .route(
            "/api/profile/addresses",
            get(list_addresses).post(add_address),
        )
        .route(
            "/api/profile/addresses/:id",
            put(update_address).delete(delete_address),
        )
        .with_state(state)
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            store: st.store.backend_name(),
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Register a customer account. Signup never grants the admin role.
pub(crate) async fn signup(
    State(st): State<Arc<AppState>>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Name, email and password are required"));
    }

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || credentials::hash_password(&password))
        .await
        .map_err(anyhow::Error::from)??;
    let outcome = st
        .store
        .insert_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::User,
        })
        .await?;

    match outcome {
        InsertUserOutcome::Inserted(user) => {
            info!(user_id = %user.user_id, "account registered");
            Ok((StatusCode::CREATED, message("User registered successfully")))
        }
        InsertUserOutcome::DuplicateEmail => Err(ApiError::bad_request("User already exists")),
    }
}

/// Exchange credentials for a session token.
///
/// Unknown email and wrong password produce the same 400 so the response
/// does not reveal which accounts exist. `role: "admin"` is sent by the
/// operator console and refuses customer accounts with 403.
pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = body?;

    let found = st.store.find_user_by_email(&req.email).await?;
    let user = match found {
        Some(user) => {
            let password = req.password;
            let hash = user.password_hash.clone();
            let ok =
                tokio::task::spawn_blocking(move || credentials::verify_password(&password, &hash))
                    .await
                    .map_err(anyhow::Error::from)?;
            ok.then_some(user)
        }
        None => None,
    }
    .ok_or_else(|| ApiError::bad_request("Invalid credentials"))?;

    if req.role == Some(Role::Admin) && user.role != Role::Admin {
        warn!(user_id = %user.user_id, "admin login refused for customer account");
        return Err(ApiError::forbidden("Access denied: admin only"));
    }

    let token = st.store.create_session(user.user_id, st.session_ttl).await?;
    info!(user_id = %user.user_id, role = user.role.as_str(), "login");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: user.profile(),
    }))
}

/// Revoke the caller's bearer token. Other sessions of the same account stay
/// valid.
pub(crate) async fn logout(
    State(st): State<Arc<AppState>>,
    SessionAuth { token, user }: SessionAuth,
) -> ApiResult<Json<MessageResponse>> {
    st.store.delete_session(&token).await?;
    info!(user_id = %user.user_id, "logout");
    Ok(message("Logged out"))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub(crate) async fn list_products(State(st): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(st.store.list_products().await?))
}

pub(crate) async fn get_product(
    State(st): State<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let product = st
        .store
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;
    Ok(Json(product))
}

pub(crate) async fn create_product(
    State(st): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = body?;
    if input.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }
    if input.price < 0 {
        return Err(ApiError::bad_request("Price must not be negative"));
    }
    let product = st.store.insert_product(input).await?;
    info!(product_id = %product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Place an order. The product is copied into the order as a snapshot so
/// later catalogue edits never rewrite history.
pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = body?;
    if req.quantity == 0 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }

    let product = st
        .store
        .get_product(req.product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))?;

    let address = match req.address_id {
        Some(address_id) => Some(
            st.store
                .find_address(user.user_id, address_id)
                .await?
                .ok_or_else(|| ApiError::not_found("Address not found"))?,
        ),
        None => None,
    };

    let new = NewOrder {
        owner_id: user.user_id,
        product,
        quantity: req.quantity,
        address,
    };
    if new.total_price().is_none() {
        warn!(
            user_id = %user.user_id,
            product_id = %req.product_id,
            quantity = req.quantity,
            "order total overflows"
        );
        return Err(ApiError::bad_request("Order total is too large"));
    }
    let order = st.store.insert_order(new).await?;

    info!(order_id = %order.id, user_id = %user.user_id, total = order.total_price, "order placed");
    Ok((StatusCode::CREATED, Json(order)))
}

pub(crate) async fn my_orders(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(st.store.list_orders_for_user(user.user_id).await?))
}

/// Every order, newest first, with the customer attached. Polled by the
/// operator console.
pub(crate) async fn all_orders(
    State(st): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(st.store.list_orders().await?))
}

/// Move a paid order to a new fulfilment status.
///
/// Any valid status may be chosen, including an earlier one; the only gate is
/// payment. Unpaid orders keep their status until payment is confirmed.
pub(crate) async fn update_status(
    State(st): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Path(id) = id?;
    let Json(req) = body?;

    let status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid status: {:?}", req.status)))?;

    let record = st
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    if !record.order.paid {
        return Err(ApiError::bad_request("Order is not paid yet"));
    }

    st.store
        .set_order_status(id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    info!(
        order_id = %id,
        admin_id = %admin.user_id,
        from = record.order.status.as_str(),
        to = status.as_str(),
        "order status updated"
    );

    Ok(message("Order status updated"))
}

/// Confirm payment. Only the order's owner or an admin may do this; repeating
/// it is a no-op.
pub(crate) async fn mark_paid(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;

    let record = st
        .store
        .get_order(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    if record.owner_id != user.user_id && user.role != Role::Admin {
        return Err(ApiError::forbidden("Access denied"));
    }

    let order = st
        .store
        .mark_order_paid(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if !record.order.paid {
        info!(order_id = %id, "order paid");
    }
    Ok(Json(order))
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

pub(crate) async fn list_addresses(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<AddressesResponse>> {
    let addresses = st.store.list_addresses(user.user_id).await?;
    Ok(Json(AddressesResponse { addresses }))
}

pub(crate) async fn add_address(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    body: Result<Json<AddressInput>, JsonRejection>,
) -> ApiResult<Json<AddressesResponse>> {
    let Json(input) = body?;
    st.address_rule.check(&input).map_err(ApiError::bad_request)?;

    let addresses = st.store.add_address(user.user_id, input).await?;
    Ok(Json(AddressesResponse { addresses }))
}

pub(crate) async fn update_address(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AddressInput>, JsonRejection>,
) -> ApiResult<Json<AddressesResponse>> {
    let Path(id) = id?;
    let Json(input) = body?;
    st.address_rule.check(&input).map_err(ApiError::bad_request)?;

    let addresses = st
        .store
        .update_address(user.user_id, id, input)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;
    Ok(Json(AddressesResponse { addresses }))
}

pub(crate) async fn delete_address(
    State(st): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<AddressesResponse>> {
    let Path(id) = id?;
    let addresses = st
        .store
        .delete_address(user.user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Address not found"))?;
    Ok(Json(AddressesResponse { addresses }))
}
