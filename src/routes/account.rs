use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        MaybeUser, create_token, expired_session_cookie, hash_password_blocking, session_cookie,
        verify_password_blocking,
    },
    dto::{FieldErrors, LoginForm, LoginQuery, RegistrationForm, field_errors},
    errors::ApiError,
    models::User,
    states::AppState,
    templates,
};

use super::profile_url;

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// GET /auth/registration/
pub async fn registration_form(user: MaybeUser) -> Result<Html<String>, ApiError> {
    registration_page(&user, &RegistrationForm::default(), &FieldErrors::new())
}

/// POST /auth/registration/
/// Body: username, email, password1, password2
pub async fn register(
    State(state): State<AppState>,
    user: MaybeUser,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, ApiError> {
    if let Err(e) = form.validate() {
        return Ok(registration_page(&user, &form, &field_errors(&e))?.into_response());
    }

    let hashed_password =
        hash_password_blocking(form.password1.clone(), state.config.bcrypt_cost).await?;
    let new_user = User {
        id: Uuid::new_v4(),
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        first_name: String::new(),
        last_name: String::new(),
        hashed_password,
        date_joined: Utc::now(),
    };
    let username = new_user.username.clone();

    if !state.store.insert_user(new_user) {
        let mut errors = FieldErrors::new();
        errors.insert(
            "username".into(),
            vec!["A user with that username already exists.".into()],
        );
        return Ok(registration_page(&user, &form, &errors)?.into_response());
    }

    info!("New user registered: {}", username);
    Ok(Redirect::to("/auth/login/").into_response())
}

/// GET /auth/login/?next=/path/
pub async fn login_form(
    user: MaybeUser,
    Query(query): Query<LoginQuery>,
) -> Result<Html<String>, ApiError> {
    login_page(&user, &LoginForm::default(), query.next.as_deref(), None)
}

/// POST /auth/login/?next=/path/
/// Body: username, password
pub async fn login(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if state.login_limiter.check().is_err() {
        warn!("Login rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    let account = state.store.user_by_username(form.username.trim());
    let valid = match &account {
        Some(account) => {
            verify_password_blocking(form.password.clone(), account.hashed_password.clone()).await?
        }
        None => false,
    };

    let Some(account) = account.filter(|_| valid) else {
        warn!("Failed login for username: {}", form.username);
        return Ok(login_page(&user, &form, query.next.as_deref(), Some(BAD_CREDENTIALS))?.into_response());
    };

    let token = create_token(&account, &state.config.jwt_secret, state.config.session_hours)?;
    info!("User logged in: {}", account.username);

    let target = safe_next(query.next.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| profile_url(&account.username));

    Ok((jar.add(session_cookie(token)), Redirect::to(&target)).into_response())
}

/// POST /auth/logout/
pub async fn logout(jar: CookieJar) -> Result<Response, ApiError> {
    let page = templates::render("registration/logged_out.html", &templates::context(None))?;
    Ok((jar.remove(expired_session_cookie()), page).into_response())
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

fn registration_page(user: &MaybeUser, form: &RegistrationForm, errors: &FieldErrors) -> Result<Html<String>, ApiError> {
    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    templates::render("registration/registration_form.html", &ctx)
}

fn login_page(
    user: &MaybeUser,
    form: &LoginForm,
    next: Option<&str>,
    error: Option<&str>,
) -> Result<Html<String>, ApiError> {
    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("form", form);
    ctx.insert("next", &safe_next(next));
    ctx.insert("error", &error);
    templates::render("registration/login.html", &ctx)
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_next(Some("/posts/create/")), Some("/posts/create/"));
        assert_eq!(safe_next(Some("//evil.example")), None);
        assert_eq!(safe_next(Some("https://evil.example")), None);
        assert_eq!(safe_next(Some("/\\evil.example")), None);
        assert_eq!(safe_next(None), None);
    }
}
