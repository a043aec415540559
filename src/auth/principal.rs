use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use uuid::Uuid;

use super::jwt::{SESSION_COOKIE, decode_token};
use crate::{
    db::entities::{role, user},
    error::AppError,
    state::AppState,
};

/// Something that may be signed in.
pub trait Authenticatable {
    fn is_authenticated(&self) -> bool;
    fn is_active(&self) -> bool;
    /// Stable label used in logs and views, usually the email.
    fn identity(&self) -> &str;
}

pub trait HasRoles {
    fn has_role(&self, name: &str) -> bool;
}

/// The signed-in user of a request, reloaded from the store each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub active: bool,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn from_user(user: &user::Model, roles: &[role::Model]) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            active: user.active,
            roles: roles.iter().map(|role| role.name.clone()).collect(),
        }
    }
}

impl Authenticatable for Principal {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn identity(&self) -> &str {
        &self.email
    }
}

impl HasRoles for Principal {
    fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|role| role == name)
    }
}

/// Token from `Authorization: Bearer`, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }
    cookie_value(headers, SESSION_COOKIE)
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves the principal behind a request. Missing, invalid or expired
/// tokens and tokens for deleted users all resolve to `None`.
pub async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, AppError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let Some(user_id) = decode_token(&state.jwt, &token).and_then(|claims| claims.user_id())
    else {
        return Ok(None);
    };

    let principal = state
        .store
        .user_with_roles(user_id)
        .await?
        .map(|(user, roles)| Principal::from_user(&user, &roles));
    Ok(principal)
}

/// Extractor for handlers that work with or without a signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Option<Principal>);

impl FromRequestParts<Arc<AppState>> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentPrincipal>().cloned() {
            return Ok(current);
        }

        let current = CurrentPrincipal(resolve(state, &parts.headers).await?);
        parts.extensions.insert(current.clone());
        Ok(current)
    }
}
