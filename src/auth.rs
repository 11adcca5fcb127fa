use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{dto::UserView, errors::ApiError, models::User, states::AppState};

/// Name of the cookie holding the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub username: String,
    pub exp: usize,
}

pub fn create_token(user: &User, secret: &str, lifetime_hours: i64) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(lifetime_hours))
        .ok_or_else(|| ApiError::InternalError("Failed to calculate expiration".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::InternalError(format!("Token Creation failed: {}", e)))
}

pub fn validate_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

/// Session token from the cookie, or from an `Authorization: Bearer` header
/// for non-browser clients.
fn request_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Resolves the signed-in user. Tokens for deleted or unknown users count as
/// anonymous.
fn session_user(headers: &HeaderMap, state: &AppState) -> Option<User> {
    let token = request_token(headers)?;
    let claims = validate_token(&token, &state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).ok()?;
    state.store.user(&user_id)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    hash(password, cost).map_err(|e| ApiError::InternalError(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, ApiError> {
    verify(password, hashed)
        .map_err(|e| ApiError::InternalError(format!("Password verification failed: {}", e)))
}

/// Hashes on the blocking pool so bcrypt does not stall the async workers.
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password hashing task failed: {}", e)))?
}

pub async fn verify_password_blocking(password: String, hashed: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(|e| ApiError::InternalError(format!("Password verification task failed: {}", e)))?
}

/// Extractor for handlers that need a signed-in user.
///
/// Anonymous visitors are redirected to the login form with the current path
/// and query as `next`.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn view(&self) -> UserView {
        UserView::from(&self.0)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_user(&parts.headers, state)
            .map(CurrentUser)
            .ok_or_else(|| ApiError::LoginRequired {
                next: parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/")
                    .to_string(),
            })
    }
}

/// Extractor for pages that look different when someone is signed in.
pub struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub fn view(&self) -> Option<UserView> {
        self.0.as_ref().map(UserView::from)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(session_user(&parts.headers, state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "anna".into(),
            email: "anna@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            hashed_password: String::new(),
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_keeps_the_subject() {
        let user = user();
        let token = create_token(&user, "secret", 1).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "anna");
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = create_token(&user(), "secret", 1).unwrap();
        assert!(validate_token(&token, "other").is_none());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_token(&user(), "secret", -2).unwrap();
        assert!(validate_token(&token, "secret").is_none());
    }

    #[test]
    fn token_is_read_from_cookie_then_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(request_token(&headers).as_deref(), Some("from-header"));

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session=from-cookie"));
        assert_eq!(request_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn passwords_verify_against_their_hash() {
        let hashed = hash_password("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &hashed).unwrap());
        assert!(!verify_password("hunter23", &hashed).unwrap());
    }

    #[tokio::test]
    async fn blocking_pool_helpers_hash_and_verify() {
        let hashed = hash_password_blocking("hunter22".into(), 4).await.unwrap();
        assert!(verify_password_blocking("hunter22".into(), hashed.clone()).await.unwrap());
        assert!(!verify_password_blocking("hunter23".into(), hashed).await.unwrap());
    }
}
