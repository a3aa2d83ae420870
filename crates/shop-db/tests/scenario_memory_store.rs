//! Scenario: in-memory store contracts.
//!
//! # Invariants under test
//! 1. Order listings are newest first and carry the customer.
//! 2. `mark_order_paid` is idempotent and never clears `paid`.
//! 3. Address mutations are scoped to the owner; unknown ids yield `None`.
//! 4. Duplicate emails (case-insensitive) are refused.
//! 5. Session tokens resolve back to their account until they expire or are
//!    revoked.
//! 6. An order total that overflows is refused, not wrapped.

use shop_db::{InsertUserOutcome, NewOrder, NewUser, Store};
use shop_schemas::{AddressInput, OrderStatus, ProductInput, Role};
use chrono::Duration;
use uuid::Uuid;

async fn user(store: &Store, email: &str) -> shop_db::UserRecord {
    match store
        .insert_user(NewUser {
            name: "Priya".to_string(),
            email: email.to_string(),
            password_hash: "h".to_string(),
            role: Role::User,
        })
        .await
        .unwrap()
    {
        InsertUserOutcome::Inserted(u) => u,
        InsertUserOutcome::DuplicateEmail => panic!("unexpected duplicate"),
    }
}

fn coimbatore() -> AddressInput {
    AddressInput {
        street: "12 Race Course Rd".to_string(),
        city: "Coimbatore".to_string(),
        state: "Tamil Nadu".to_string(),
        pincode: "641018".to_string(),
        phone: "9876543210".to_string(),
    }
}

#[tokio::test]
async fn orders_list_newest_first_with_customer() {
    let store = Store::memory();
    let u = user(&store, "priya@shop.test").await;
    let product = store
        .insert_product(ProductInput {
            name: "Filter Coffee".to_string(),
            price: 250,
            ..Default::default()
        })
        .await
        .unwrap();

    let first = store
        .insert_order(NewOrder {
            owner_id: u.user_id,
            product: product.clone(),
            quantity: 2,
            address: None,
        })
        .await
        .unwrap();
    let second = store
        .insert_order(NewOrder {
            owner_id: u.user_id,
            product,
            quantity: 1,
            address: None,
        })
        .await
        .unwrap();

    assert_eq!(first.total_price, 500);
    assert!(!first.paid);
    assert_eq!(first.status, OrderStatus::Placed);

    let all = store.list_orders().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.id, "newest order must come first");
    assert_eq!(all[1].id, first.id);
    assert_eq!(all[0].user.as_ref().unwrap().name, "Priya");

    let mine = store.list_orders_for_user(u.user_id).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(store.list_orders_for_user(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn mark_paid_is_idempotent_and_status_updates_persist() {
    let store = Store::memory();
    let u = user(&store, "a@shop.test").await;
    let product = store
        .insert_product(ProductInput {
            name: "Mug".to_string(),
            price: 99,
            ..Default::default()
        })
        .await
        .unwrap();
    let order = store
        .insert_order(NewOrder {
            owner_id: u.user_id,
            product,
            quantity: 1,
            address: None,
        })
        .await
        .unwrap();

    assert!(store.mark_order_paid(order.id).await.unwrap().unwrap().paid);
    assert!(store.mark_order_paid(order.id).await.unwrap().unwrap().paid);

    let shipped = store
        .set_order_status(order.id, OrderStatus::Shipped)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert!(shipped.paid, "status change must not touch paid");

    let rec = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(rec.owner_id, u.user_id);
    assert_eq!(rec.order.status, OrderStatus::Shipped);

    assert!(store.mark_order_paid(Uuid::new_v4()).await.unwrap().is_none());
    assert!(store
        .set_order_status(Uuid::new_v4(), OrderStatus::Packed)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn address_mutations_are_owner_scoped() {
    let store = Store::memory();
    let owner = user(&store, "owner@shop.test").await;
    let other = user(&store, "other@shop.test").await;

    let list = store.add_address(owner.user_id, coimbatore()).await.unwrap();
    assert_eq!(list.len(), 1);
    let id = list[0].id;

    // Another account cannot see or touch it.
    assert!(store.find_address(other.user_id, id).await.unwrap().is_none());
    assert!(store
        .update_address(other.user_id, id, coimbatore())
        .await
        .unwrap()
        .is_none());
    assert!(store.delete_address(other.user_id, id).await.unwrap().is_none());

    let mut changed = coimbatore();
    changed.street = "1 Avinashi Rd".to_string();
    let list = store
        .update_address(owner.user_id, id, changed)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(list[0].street, "1 Avinashi Rd");
    assert_eq!(list[0].id, id, "update keeps the address id");

    let list = store.delete_address(owner.user_id, id).await.unwrap().unwrap();
    assert!(list.is_empty());
    assert!(store.delete_address(owner.user_id, id).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_refused_case_insensitively() {
    let store = Store::memory();
    user(&store, "Dup@Shop.test").await;
    let again = store
        .insert_user(NewUser {
            name: "x".to_string(),
            email: "dup@shop.TEST ".to_string(),
            password_hash: "h".to_string(),
            role: Role::User,
        })
        .await
        .unwrap();
    assert!(matches!(again, InsertUserOutcome::DuplicateEmail));
}

#[tokio::test]
async fn session_token_resolves_to_account() {
    let store = Store::memory();
    let u = user(&store, "s@shop.test").await;
    let token = store.create_session(u.user_id, Duration::hours(1)).await.unwrap();

    let resolved = store.session_user(&token).await.unwrap().unwrap();
    assert_eq!(resolved.user_id, u.user_id);
    assert!(store.session_user("not-a-token").await.unwrap().is_none());
}

#[tokio::test]
async fn expired_session_no_longer_resolves() {
    let store = Store::memory();
    let u = user(&store, "e@shop.test").await;
    let stale = store.create_session(u.user_id, Duration::seconds(-1)).await.unwrap();
    assert!(store.session_user(&stale).await.unwrap().is_none());

    // Issuing a fresh session purges the stale one entirely.
    let fresh = store.create_session(u.user_id, Duration::hours(1)).await.unwrap();
    assert!(!store.delete_session(&stale).await.unwrap());
    assert!(store.session_user(&fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn revoked_session_no_longer_resolves() {
    let store = Store::memory();
    let u = user(&store, "r@shop.test").await;
    let keep = store.create_session(u.user_id, Duration::hours(1)).await.unwrap();
    let token = store.create_session(u.user_id, Duration::hours(1)).await.unwrap();

    assert!(store.delete_session(&token).await.unwrap());
    assert!(store.session_user(&token).await.unwrap().is_none());
    assert!(!store.delete_session(&token).await.unwrap(), "second revoke is a no-op");
    assert!(store.session_user(&keep).await.unwrap().is_some());
}

#[tokio::test]
async fn overflowing_order_total_is_refused() {
    let store = Store::memory();
    let u = user(&store, "big@shop.test").await;
    let product = store
        .insert_product(ProductInput {
            name: "Gold bar".to_string(),
            price: i64::MAX / 2,
            ..Default::default()
        })
        .await
        .unwrap();

    let new = NewOrder {
        owner_id: u.user_id,
        product,
        quantity: 3,
        address: None,
    };
    assert_eq!(new.total_price(), None);
    assert!(store.insert_order(new).await.is_err());
    assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn seed_admin_is_idempotent() {
    let store = Store::memory();
    let first = shop_db::seed_admin(&store, "admin@shop.test", "pw").await.unwrap();
    let shop_db::SeedOutcome::Created(admin) = first else {
        panic!("first seed must create the admin");
    };
    assert_eq!(admin.role, Role::Admin);
    assert!(shop_db::credentials::verify_password("pw", &admin.password_hash));

    let second = shop_db::seed_admin(&store, "ADMIN@shop.test", "other").await.unwrap();
    assert!(matches!(second, shop_db::SeedOutcome::AlreadyExists));
}
