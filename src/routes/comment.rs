use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    dto::{CommentForm, CommentView, FieldErrors, UserView},
    errors::ApiError,
    models::{Comment, User},
    states::AppState,
    templates,
};

use super::{parse_id, post_url};

/// POST /posts/{post_id}/comment/
///
/// Invalid comments are dropped; the visitor always lands back on the post.
pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ApiError> {
    let post = state.store.post(&parse_id(&post_id)?).ok_or(ApiError::NotFound)?;
    if post.author_id != user.id && !state.store.is_visible(&post, Utc::now()) {
        return Err(ApiError::NotFound);
    }

    if let Ok(text) = form.clean() {
        let comment = Comment {
            id: Uuid::new_v4(),
            text,
            post_id: post.id,
            author_id: user.id,
            created_at: Utc::now(),
        };
        info!("Comment {} added to post {} by {}", comment.id, post.id, user.username);
        state.store.save_comment(comment);
    }

    Ok(Redirect::to(&post_url(&post.id)).into_response())
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let comment = own_comment(&state, &user, &post_id, &comment_id)?;
    let form = CommentForm {
        text: comment.text.clone(),
    };
    comment_page(&user, &comment, Some(&form), &FieldErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ApiError> {
    let mut comment = own_comment(&state, &user, &post_id, &comment_id)?;

    match form.clean() {
        Ok(text) => {
            comment.text = text;
            let post_id = comment.post_id;
            info!("Comment {} edited by {}", comment.id, user.username);
            state.store.save_comment(comment);
            Ok(Redirect::to(&post_url(&post_id)).into_response())
        }
        Err(errors) => comment_page(&user, &comment, Some(&form), &errors),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete_comment_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let comment = own_comment(&state, &user, &post_id, &comment_id)?;
    comment_page(&user, &comment, None, &FieldErrors::new())
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let comment = own_comment(&state, &user, &post_id, &comment_id)?;
    state.store.delete_comment(&comment.id);
    info!("Comment {} deleted by {}", comment.id, user.username);
    Ok(Redirect::to(&post_url(&comment.post_id)).into_response())
}

/// A comment must exist under the given post, and only its author may
/// change it.
fn own_comment(state: &AppState, user: &User, post_id: &str, comment_id: &str) -> Result<Comment, ApiError> {
    let post_id = parse_id(post_id)?;
    let comment = state
        .store
        .comment(&parse_id(comment_id)?)
        .filter(|c| c.post_id == post_id)
        .ok_or(ApiError::NotFound)?;

    if comment.author_id != user.id {
        return Err(ApiError::NotAuthor {
            back_to: post_url(&post_id),
        });
    }
    Ok(comment)
}

/// Edit form when `form` is given, delete confirmation otherwise.
fn comment_page(
    user: &User,
    comment: &Comment,
    form: Option<&CommentForm>,
    errors: &FieldErrors,
) -> Result<Response, ApiError> {
    let mut ctx = templates::context(Some(&UserView::from(user)));
    ctx.insert("comment", &CommentView::new(comment, user));
    ctx.insert("form", &form);
    ctx.insert("errors", errors);
    Ok(templates::render("blog/comment.html", &ctx)?.into_response())
}
