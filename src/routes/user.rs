use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::{
    auth::{CurrentUser, MaybeUser},
    dto::{FieldErrors, Page, PaginationParams, ProfileForm, UserView, field_errors},
    errors::ApiError,
    models::User,
    states::AppState,
    templates,
};

use super::profile_url;

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// GET /profile/{username}/?page=N
///
/// The owner also sees their drafts and scheduled posts.
pub async fn profile(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Html<String>, ApiError> {
    let owner = state
        .store
        .user_by_username(&username)
        .ok_or(ApiError::NotFound)?;

    let now = Utc::now();
    let is_owner = user.id() == Some(owner.id);
    let posts = state.store.author_posts(&owner.id, is_owner, now);
    let page = Page::paginate(posts, params.page.as_deref(), state.config.posts_per_page)
        .map(|posts| state.store.post_views(posts, now));

    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("profile", &UserView::from(&owner));
    ctx.insert("is_owner", &is_owner);
    ctx.insert("page_obj", &page);
    templates::render("blog/profile.html", &ctx)
}

/// GET /edit_profile/
pub async fn edit_profile_form(CurrentUser(user): CurrentUser) -> Result<Response, ApiError> {
    let form = ProfileForm {
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        email: user.email.clone(),
    };
    profile_form_page(&user, &form, &FieldErrors::new())
}

/// POST /edit_profile/
pub async fn edit_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    let mut errors = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => field_errors(&e),
    };
    let username = form.username.trim().to_string();
    if state.store.username_taken_by_other(&username, &user.id) {
        errors.entry("username".into()).or_default().push(USERNAME_TAKEN.into());
    }
    if !errors.is_empty() {
        return profile_form_page(&user, &form, &errors);
    }

    let updated = User {
        username,
        email: form.email.trim().to_string(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        ..user.clone()
    };

    // The username may have been claimed between the check and the save.
    if !state.store.update_user(updated.clone()) {
        let mut errors = FieldErrors::new();
        errors.insert("username".into(), vec![USERNAME_TAKEN.into()]);
        return profile_form_page(&user, &form, &errors);
    }

    info!("Profile updated: {} -> {}", user.username, updated.username);
    Ok(Redirect::to(&profile_url(&updated.username)).into_response())
}

fn profile_form_page(user: &User, form: &ProfileForm, errors: &FieldErrors) -> Result<Response, ApiError> {
    let mut ctx = templates::context(Some(&UserView::from(user)));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(templates::render("blog/user.html", &ctx)?.into_response())
}
