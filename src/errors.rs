use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error;
use tracing::error;

use crate::templates;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not Found")]
    NotFound,
    /// The visitor must log in before reaching `next`.
    #[error("Login required")]
    LoginRequired { next: String },
    /// Someone other than the author tried to change a post or comment.
    #[error("Only the author may do this")]
    NotAuthor { back_to: String },
    #[error("Too many requests")]
    TooManyRequests,
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convert our errors to HTML responses.
///
/// Missing records get the 404 page, anonymous visitors are sent to the login
/// form and anything unexpected is logged and shown the 500 page.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => error_page(StatusCode::NOT_FOUND, "pages/404.html"),
            ApiError::LoginRequired { next } => login_redirect(&next).into_response(),
            ApiError::NotAuthor { back_to } => Redirect::to(&back_to).into_response(),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                Html("<h1>429</h1><p>Too many attempts, try again later.</p>"),
            )
                .into_response(),
            ApiError::Template(err) => {
                error!("Template error: {:?}", err);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "pages/500.html")
            }
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                error_page(StatusCode::INTERNAL_SERVER_ERROR, "pages/500.html")
            }
        }
    }
}

fn login_redirect(next: &str) -> Redirect {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => Redirect::to(&format!("/auth/login/?{query}")),
        Err(_) => Redirect::to("/auth/login/"),
    }
}

fn error_page(status: StatusCode, template: &str) -> Response {
    match templates::render_plain(template) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!("Failed to render {}: {:?}", template, err);
            (status, status.canonical_reason().unwrap_or("Error")).into_response()
        }
    }
}

/// Fallback for routes that match nothing.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
