use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use super::principal::{Authenticatable, HasRoles};
use crate::error::AppError;

/// How a request's principal relates to the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    /// Signed in but lacking the admin role, or deactivated.
    AuthenticatedNoAdminRole,
    AuthenticatedAdmin,
}

/// Proof that the gate admitted the caller. Only [`AdminGate::admit`] can
/// produce one, and every admin operation asks for it.
#[derive(Debug, Clone)]
pub struct AdminAccess {
    identity: String,
}

impl AdminAccess {
    pub fn identity(&self) -> &str {
        &self.identity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    Unauthenticated,
    Forbidden,
}

impl GateRejection {
    /// Anonymous callers go to the login page and come back to `next`.
    pub fn into_response_for(self, next: &str) -> Response {
        match self {
            GateRejection::Unauthenticated => Redirect::to(&login_url(next)).into_response(),
            GateRejection::Forbidden => {
                AppError::forbidden("Administrator role required").into_response()
            }
        }
    }
}

pub fn login_url(next: &str) -> String {
    format!("/login?next={}", urlencoding::encode(next))
}

#[derive(Debug, Clone)]
pub struct AdminGate {
    admin_role: String,
}

impl AdminGate {
    pub fn new(admin_role: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
        }
    }

    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    pub fn classify<P>(&self, principal: Option<&P>) -> Access
    where
        P: Authenticatable + HasRoles,
    {
        match principal {
            Some(p) if p.is_authenticated() => {
                if p.is_active() && p.has_role(&self.admin_role) {
                    Access::AuthenticatedAdmin
                } else {
                    Access::AuthenticatedNoAdminRole
                }
            }
            _ => Access::Anonymous,
        }
    }

    pub fn is_accessible<P>(&self, principal: Option<&P>) -> bool
    where
        P: Authenticatable + HasRoles,
    {
        self.classify(principal) == Access::AuthenticatedAdmin
    }

    pub fn admit<P>(&self, principal: Option<&P>) -> Result<AdminAccess, GateRejection>
    where
        P: Authenticatable + HasRoles,
    {
        match (self.classify(principal), principal) {
            (Access::AuthenticatedAdmin, Some(p)) => Ok(AdminAccess {
                identity: p.identity().to_string(),
            }),
            (Access::AuthenticatedNoAdminRole, _) => Err(GateRejection::Forbidden),
            _ => Err(GateRejection::Unauthenticated),
        }
    }
}

/// Handlers behind the admin layer receive the proof it stored.
impl<S> FromRequestParts<S> for AdminAccess
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminAccess>()
            .cloned()
            .ok_or_else(|| AppError::forbidden("Administrator role required"))
    }
}

#[cfg(test)]
pub(crate) fn test_access(identity: &str) -> AdminAccess {
    AdminAccess {
        identity: identity.to_string(),
    }
}
