use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use askama::Template;
use axum::{
    Form, Router,
    extract::{ConnectInfo, FromRequestParts, Query, State},
    http::{StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;

use super::{HtmlError, project_name, render};
use crate::{
    auth::jwt::SESSION_COOKIE,
    error::AppError,
    state::AppState,
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    project_name: String,
    next: String,
    email: String,
    error: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let peer = || {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        };

        Ok(ClientIp(forwarded.or_else(peer)))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .with_state(state)
}

async fn login_page(Query(query): Query<LoginQuery>) -> Result<Html<String>, HtmlError> {
    let template = LoginTemplate {
        project_name: project_name(),
        next: safe_next(query.next.as_deref()),
        email: String::new(),
        error: String::new(),
    };
    render(&template, "login page")
}

async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());

    match state.login.login(&form.email, &form.password, ip).await {
        Ok(outcome) => {
            let cookie = session_cookie(
                &outcome.tokens.access_token,
                state.config.session_ttl_secs,
                SECURE_COOKIES,
            );
            ([(header::SET_COOKIE, cookie)], Redirect::to(&next)).into_response()
        }
        Err(AppError::Unauthorized(message)) => {
            let template = LoginTemplate {
                project_name: project_name(),
                next,
                email: form.email,
                error: message,
            };
            match render(&template, "login page") {
                Ok(page) => (StatusCode::UNAUTHORIZED, page).into_response(),
                Err(err) => err.into_response(),
            }
        }
        Err(err) => err.into_response(),
    }
}

async fn logout() -> Response {
    let cleared = session_cookie("", 0, SECURE_COOKIES);
    ([(header::SET_COOKIE, cleared)], Redirect::to("/")).into_response()
}

/// Release builds only send the session cookie over HTTPS.
const SECURE_COOKIES: bool = !cfg!(debug_assertions);

fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{safe_next, session_cookie};

    #[test]
    fn secure_flag_is_added_on_request() {
        let plain = session_cookie("abc", 60, false);
        assert_eq!(plain, "session=abc; HttpOnly; Path=/; SameSite=Lax; Max-Age=60");

        let secure = session_cookie("abc", 60, true);
        assert!(secure.ends_with("; Secure"));
        assert!(secure.contains("HttpOnly"));
    }

    #[test]
    fn next_must_be_a_local_path() {
        assert_eq!(safe_next(Some("/admin/users?page=2")), "/admin/users?page=2");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
