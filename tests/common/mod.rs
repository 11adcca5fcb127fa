#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use blog::{
    AppState, Config, Store,
    auth::{create_token, hash_password},
    models::{Category, Comment, Post, User},
    router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "s3cret-pass";

pub struct Site {
    pub app: Router,
    pub state: AppState,
    pub store: Store,
}

impl Site {
    pub fn new() -> Self {
        Self::with_config(Config::for_tests())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Store::default();
        let state = AppState::new(config, store.clone());
        Self {
            app: router(state.clone()),
            state,
            store,
        }
    }

    pub fn user(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            hashed_password: hash_password(PASSWORD, 4).unwrap(),
            date_joined: Utc::now(),
        };
        assert!(self.store.insert_user(user.clone()));
        user
    }

    /// `Cookie` header value that signs `user` in.
    pub fn session(&self, user: &User) -> String {
        let token = create_token(user, &self.state.config.jwt_secret, 1).unwrap();
        format!("session={token}")
    }

    pub fn category(&self, slug: &str, is_published: bool) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            title: format!("Category {slug}"),
            description: String::new(),
            slug: slug.to_string(),
            is_published,
            created_at: Utc::now(),
        };
        assert!(self.store.insert_category(category.clone()));
        category
    }

    pub fn post(&self, author: &User, category: &Category, title: &str, is_published: bool, age: Duration) -> Post {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: title.to_string(),
            text: format!("Text of {title}"),
            pub_date: now - age,
            author_id: author.id,
            category_id: category.id,
            location_id: None,
            is_published,
            created_at: now,
        };
        self.store.save_post(post.clone());
        post
    }

    pub fn comment(&self, author: &User, post: &Post, text: &str) -> Comment {
        let comment = Comment {
            id: Uuid::new_v4(),
            text: text.to_string(),
            post_id: post.id,
            author_id: author.id,
            created_at: Utc::now(),
        };
        self.store.save_comment(comment.clone());
        comment
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = session {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, session: Option<&str>, fields: &[(&str, &str)]) -> Response<Body> {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = session {
            request = request.header(header::COOKIE, cookie);
        }
        let body = serde_urlencoded::to_string(fields).unwrap();
        self.send(request.body(Body::from(body)).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap()
}

/// Number of post cards in a listing page.
pub fn post_cards(html: &str) -> usize {
    html.matches("<article class=\"post\">").count()
}
