use std::sync::Arc;

use askama::Template;
use axum::{Router, response::Html, routing::get};
use chrono::Local;

use super::{HtmlError, project_name, render};
use crate::{auth::CurrentPrincipal, state::AppState};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    now: String,
    project_name: String,
    signed_in: bool,
    signed_in_as: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new().route("/", get(index)).with_state(state)
}

async fn index(CurrentPrincipal(principal): CurrentPrincipal) -> Result<Html<String>, HtmlError> {
    let template = IndexTemplate {
        now: Local::now().to_rfc3339(),
        project_name: project_name(),
        signed_in: principal.is_some(),
        signed_in_as: principal.map(|p| p.email).unwrap_or_default(),
    };
    render(&template, "index")
}
