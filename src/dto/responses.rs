use std::num::IntErrorKind;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, Comment, User};

/// Display format used for dates in every template.
pub const DATE_FORMAT: &str = "%d %B %Y, %H:%M";

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub date_joined: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            date_joined: user.date_joined.format(DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            title: category.title.clone(),
            description: category.description.clone(),
            slug: category.slug.clone(),
            is_published: category.is_published,
        }
    }
}

/// A post joined with its author, category, location and comment count.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub author: UserView,
    pub category: CategoryView,
    pub location: Option<String>,
    pub is_published: bool,
    pub is_visible: bool,
    pub comment_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    pub created_at: String,
    pub author: UserView,
}

impl CommentView {
    pub fn new(comment: &Comment, author: &User) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            text: comment.text.clone(),
            created_at: comment.created_at.format(DATE_FORMAT).to_string(),
            author: author.into(),
        }
    }
}

/// `?page=` query parameter. Kept as a string so junk values fall back to the
/// first page instead of being rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<String>,
}

/// One page of an ordered listing
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: usize,
    pub next_page_number: usize,
}

impl<T> Page<T> {
    /// Cuts `items` down to the requested page.
    ///
    /// A missing or non-numeric page gives the first page, an out-of-range
    /// number (however large) gives the last one.
    pub fn paginate(items: Vec<T>, requested: Option<&str>, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let count = items.len();
        let num_pages = count.div_ceil(per_page).max(1);

        let number = match requested.map(|raw| raw.trim().parse::<i64>()) {
            None => 1,
            Some(Ok(n)) if n < 1 || (n as usize) > num_pages => num_pages,
            Some(Ok(n)) => n as usize,
            Some(Err(e)) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                num_pages
            }
            Some(Err(_)) => 1,
        };

        let start = (number - 1) * per_page;
        let object_list: Vec<T> = items.into_iter().skip(start).take(per_page).collect();

        Self {
            object_list,
            number,
            num_pages,
            count,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: number.saturating_sub(1).max(1),
            next_page_number: (number + 1).min(num_pages),
        }
    }

    /// Converts the items of this page, keeping the page numbers.
    pub fn map<U>(self, convert: impl FnOnce(Vec<T>) -> Vec<U>) -> Page<U> {
        Page {
            object_list: convert(self.object_list),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.has_previous,
            has_next: self.has_next,
            previous_page_number: self.previous_page_number,
            next_page_number: self.next_page_number,
        }
    }
}
