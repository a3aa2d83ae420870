//! Bearer-token extractors.
//!
//! `AuthUser` accepts any signed-in account; `AdminUser` additionally
//! requires the admin role; `SessionAuth` also hands over the token itself
//! for logout. All fail closed: a missing or malformed header is 401, and so
//! is a token that is unknown, revoked or expired.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shop_db::UserRecord;
use shop_schemas::Role;

use crate::{error::ApiError, state::AppState};

pub struct AuthUser(pub UserRecord);

pub struct SessionAuth {
    pub token: String,
    pub user: UserRecord,
}

pub struct AdminUser(pub UserRecord);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;
    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;
    Ok(token)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for SessionAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state
            .store
            .session_user(token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;
        Ok(SessionAuth {
            token: token.to_string(),
            user,
        })
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let SessionAuth { user, .. } = SessionAuth::from_request_parts(parts, state).await?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(ApiError::forbidden("Access denied: admin only"));
        }
        Ok(AdminUser(user))
    }
}
