use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{CurrentUser, MaybeUser},
    dto::{CommentForm, FieldErrors, Page, PaginationParams, PostForm, UserView},
    errors::ApiError,
    models::{Post, User},
    states::AppState,
    templates,
};

use super::{parse_id, post_url, profile_url};

/// GET /?page=N
pub async fn index(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<PaginationParams>,
) -> Result<Html<String>, ApiError> {
    let now = Utc::now();
    let posts = state.store.visible_posts(now);
    let page = Page::paginate(posts, params.page.as_deref(), state.config.posts_per_page)
        .map(|posts| state.store.post_views(posts, now));

    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("page_obj", &page);
    templates::render("blog/index.html", &ctx)
}

/// GET /posts/{post_id}/
///
/// Hidden posts are shown to their author only.
pub async fn post_detail(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(post_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let now = Utc::now();
    let post = state.store.post(&parse_id(&post_id)?).ok_or(ApiError::NotFound)?;

    let is_author = user.id() == Some(post.author_id);
    if !is_author && !state.store.is_visible(&post, now) {
        return Err(ApiError::NotFound);
    }

    let comments = state.store.post_comments(&post.id);
    let view = state.store.post_view(post, now).ok_or(ApiError::NotFound)?;

    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("post", &view);
    ctx.insert("comments", &comments);
    ctx.insert("form", &CommentForm::default());
    ctx.insert("is_author", &is_author);
    templates::render("blog/detail.html", &ctx)
}

/// GET /posts/create/
pub async fn create_post_form(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    post_form_page(&state, &user.view(), &PostForm::initial(Utc::now()), &FieldErrors::new(), None)
}

/// POST /posts/create/
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PostForm>,
) -> Result<Response, ApiError> {
    let data = match form.clean(&state.store) {
        Ok(data) => data,
        Err(errors) => return post_form_page(&state, &UserView::from(&user), &form, &errors, None),
    };

    let post = Post {
        id: Uuid::new_v4(),
        title: data.title,
        text: data.text,
        pub_date: data.pub_date,
        author_id: user.id,
        category_id: data.category_id,
        location_id: data.location_id,
        is_published: data.is_published,
        created_at: Utc::now(),
    };

    info!("Post created: {} by user {}", post.id, user.username);
    state.store.save_post(post);

    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// GET /posts/{post_id}/edit/
pub async fn edit_post_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    let post = own_post(&state, &user, &post_id)?;
    post_form_page(
        &state,
        &UserView::from(&user),
        &PostForm::from_post(&post),
        &FieldErrors::new(),
        Some(&post),
    )
}

/// POST /posts/{post_id}/edit/
pub async fn edit_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Form(form): Form<PostForm>,
) -> Result<Response, ApiError> {
    let mut post = own_post(&state, &user, &post_id)?;

    let data = match form.clean(&state.store) {
        Ok(data) => data,
        Err(errors) => {
            return post_form_page(&state, &UserView::from(&user), &form, &errors, Some(&post));
        }
    };

    post.title = data.title;
    post.text = data.text;
    post.pub_date = data.pub_date;
    post.category_id = data.category_id;
    post.location_id = data.location_id;
    post.is_published = data.is_published;

    let post_id = post.id;
    state.store.save_post(post);
    info!("Post updated: {} by user {}", post_id, user.username);

    Ok(Redirect::to(&post_url(&post_id)).into_response())
}

/// GET /posts/{post_id}/delete/
///
/// Confirmation page: the post form, read-only.
pub async fn delete_post_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    let post = own_post(&state, &user, &post_id)?;

    let mut ctx = form_context(&state, &UserView::from(&user), &PostForm::from_post(&post), &FieldErrors::new());
    ctx.insert("post_id", &post.id);
    ctx.insert("deleting", &true);
    Ok(templates::render("blog/create.html", &ctx)?.into_response())
}

/// POST /posts/{post_id}/delete/
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<Response, ApiError> {
    let post = own_post(&state, &user, &post_id)?;

    state.store.delete_post(&post.id);
    info!("Post deleted: {} by user {}", post.id, user.username);

    Ok(Redirect::to(&profile_url(&user.username)).into_response())
}

/// Loads a post for its author; anyone else is sent back to the post page.
fn own_post(state: &AppState, user: &User, raw_id: &str) -> Result<Post, ApiError> {
    let post = state.store.post(&parse_id(raw_id)?).ok_or(ApiError::NotFound)?;
    if post.author_id != user.id {
        return Err(ApiError::NotAuthor {
            back_to: post_url(&post.id),
        });
    }
    Ok(post)
}

fn form_context(state: &AppState, user: &UserView, form: &PostForm, errors: &FieldErrors) -> tera::Context {
    let mut ctx = templates::context(Some(user));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("categories", &state.store.category_choices());
    ctx.insert("locations", &state.store.location_choices());
    ctx.insert("deleting", &false);
    ctx
}

fn post_form_page(
    state: &AppState,
    user: &UserView,
    form: &PostForm,
    errors: &FieldErrors,
    editing: Option<&Post>,
) -> Result<Response, ApiError> {
    let mut ctx = form_context(state, user, form, errors);
    ctx.insert("post_id", &editing.map(|p| p.id));
    Ok(templates::render("blog/create.html", &ctx)?.into_response())
}
