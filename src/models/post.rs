use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Category;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// A post is public only when it is published, its publication date has
    /// passed and its category is published too.
    pub fn is_visible(&self, category: &Category, now: DateTime<Utc>) -> bool {
        self.is_published
            && self.pub_date <= now
            && category.is_published
            && category.id == self.category_id
    }
}
