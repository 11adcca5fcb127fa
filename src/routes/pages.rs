use axum::response::Html;

use crate::{auth::MaybeUser, errors::ApiError, templates};

/// GET /pages/about/
pub async fn about(user: MaybeUser) -> Result<Html<String>, ApiError> {
    templates::render("pages/about.html", &templates::context(user.view().as_ref()))
}

/// GET /pages/rules/
pub async fn rules(user: MaybeUser) -> Result<Html<String>, ApiError> {
    templates::render("pages/rules.html", &templates::context(user.view().as_ref()))
}
