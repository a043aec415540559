use std::sync::Arc;

use askama::Template;
use axum::{Router, http::StatusCode, response::Html};
use tower_http::trace::TraceLayer;

use crate::{middleware::catch_panic_layer, state::AppState};

pub mod admin;
pub mod api;
pub mod session;
pub mod site;

pub(crate) type HtmlError = (StatusCode, Html<String>);

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(site::router(state.clone()))
        .merge(api::router(state.clone()))
        .merge(session::router(state.clone()))
        .merge(admin::router(state))
}

/// The router with the panic and tracing layers the server runs with.
pub fn app(state: Arc<AppState>) -> Router {
    router(state)
        .layer(catch_panic_layer())
        .layer(TraceLayer::new_for_http())
}

pub(crate) fn render<T: Template>(template: &T, what: &'static str) -> Result<Html<String>, HtmlError> {
    template.render().map(Html).map_err(|err| {
        tracing::error!(error = %err, template = what, "template rendering failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("failed to render {what}")),
        )
    })
}

pub(crate) fn project_name() -> String {
    env!("CARGO_PKG_NAME")
        .split(['_', '-'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    #[test]
    fn project_name_is_title_cased() {
        assert_eq!(super::project_name(), "Admin Portal");
    }
}
