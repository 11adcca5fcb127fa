mod account;
mod category;
mod comment;
mod health;
mod pages;
mod post;
mod user;

use axum::{Router, routing::get};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{errors::{ApiError, not_found}, states::AppState};

/// Builds the whole site.
pub fn router(state: AppState) -> Router {
    let max_in_flight = state.config.max_concurrent_requests.max(1);

    Router::new()
        // Listings
        .route("/", get(post::index))
        .route("/category/{category_slug}/", get(category::category_posts))
        .route("/profile/{username}/", get(user::profile))
        // Posts (create/edit/delete need a login)
        .route("/posts/create/", get(post::create_post_form).post(post::create_post))
        .route("/posts/{post_id}/", get(post::post_detail))
        .route("/posts/{post_id}/edit/", get(post::edit_post_form).post(post::edit_post))
        .route("/posts/{post_id}/delete/", get(post::delete_post_form).post(post::delete_post))
        // Comments
        .route("/posts/{post_id}/comment/", axum::routing::post(comment::add_comment))
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(comment::edit_comment_form).post(comment::edit_comment),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(comment::delete_comment_form).post(comment::delete_comment),
        )
        // Accounts
        .route("/edit_profile/", get(user::edit_profile_form).post(user::edit_profile))
        .route(
            "/auth/registration/",
            get(account::registration_form).post(account::register),
        )
        .route("/auth/login/", get(account::login_form).post(account::login))
        .route("/auth/logout/", axum::routing::post(account::logout))
        // Static pages
        .route("/pages/about/", get(pages::about))
        .route("/pages/rules/", get(pages::rules))
        .route("/health", get(health::health_check))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_in_flight))
}

/// Ids that do not parse can never match a record.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

fn post_url(id: &Uuid) -> String {
    format!("/posts/{id}/")
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}
