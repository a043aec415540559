use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use super::principal::CurrentPrincipal;
use crate::state::AppState;

/// Runs the admin gate in front of every route it wraps. Admitted requests
/// carry an [`AdminAccess`](super::gate::AdminAccess) in their extensions.
#[derive(Clone)]
pub struct RequireAdminLayer {
    state: Arc<AppState>,
}

impl RequireAdminLayer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[derive(Clone)]
pub struct RequireAdmin<S> {
    inner: S,
    state: Arc<AppState>,
}

impl<S> Layer<S> for RequireAdminLayer {
    type Service = RequireAdmin<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequireAdmin {
            inner,
            state: Arc::clone(&self.state),
        }
    }
}

impl<S> Service<Request<Body>> for RequireAdmin<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = Arc::clone(&self.state);
        // the ready service goes into the future; a fresh clone stays behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();
            let next = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string());

            let current = match CurrentPrincipal::from_request_parts(&mut parts, &state).await {
                Ok(current) => current,
                Err(err) => return Ok(err.into_response()),
            };

            match state.gate.admit(current.0.as_ref()) {
                Ok(access) => {
                    tracing::debug!(admin = access.identity(), path = %parts.uri.path(), "admin access granted");
                    parts.extensions.insert(access);
                }
                Err(rejection) => {
                    tracing::info!(path = %parts.uri.path(), ?rejection, "admin access denied");
                    return Ok(rejection.into_response_for(&next));
                }
            }

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}
