use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use chrono::Utc;

use crate::{
    auth::MaybeUser,
    dto::{CategoryView, Page, PaginationParams},
    errors::ApiError,
    states::AppState,
    templates,
};

/// GET /category/{category_slug}/?page=N
pub async fn category_posts(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(slug): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Result<Html<String>, ApiError> {
    let category = state
        .store
        .published_category_by_slug(&slug)
        .ok_or(ApiError::NotFound)?;

    let now = Utc::now();
    let posts = state.store.category_posts(&category.id, now);
    let page = Page::paginate(posts, params.page.as_deref(), state.config.posts_per_page)
        .map(|posts| state.store.post_views(posts, now));

    let mut ctx = templates::context(user.view().as_ref());
    ctx.insert("category", &CategoryView::from(&category));
    ctx.insert("page_obj", &page);
    templates::render("blog/category.html", &ctx)
}
