use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::{
    dto::{CategoryView, CommentView, PostView, UserView},
    models::{Category, Comment, Location, Post, User},
};

/// In-memory tables shared by every request.
///
/// Each map is independently sharded, so readers never block each other.
/// Lookups copy records out; no map guard is held while another entry of the
/// same map is written.
#[derive(Clone, Default)]
pub struct Store {
    pub users: Arc<DashMap<Uuid, User>>,
    pub username_index: Arc<DashMap<String, Uuid>>, // Quick lookup by username
    pub categories: Arc<DashMap<Uuid, Category>>,
    pub slug_index: Arc<DashMap<String, Uuid>>,
    pub locations: Arc<DashMap<Uuid, Location>>,
    pub posts: Arc<DashMap<Uuid, Post>>,
    pub comments: Arc<DashMap<Uuid, Comment>>,
}

impl Store {
    // ------------------------------------------------------------------ users

    /// Inserts a user unless the username is taken.
    pub fn insert_user(&self, user: User) -> bool {
        match self.username_index.entry(user.username.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                true
            }
        }
    }

    pub fn user(&self, id: &Uuid) -> Option<User> {
        self.users.get(id).map(|u| u.value().clone())
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        let id = *self.username_index.get(username)?;
        self.user(&id)
    }

    /// Saves profile changes, moving the username index entry when the name
    /// changes. Returns false if the new username belongs to someone else.
    pub fn update_user(&self, user: User) -> bool {
        let Some(previous) = self.user(&user.id) else {
            return false;
        };

        if previous.username != user.username {
            match self.username_index.entry(user.username.clone()) {
                Entry::Occupied(_) => return false,
                Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
            self.username_index.remove(&previous.username);
        }

        self.users.insert(user.id, user);
        true
    }

    pub fn username_taken_by_other(&self, username: &str, me: &Uuid) -> bool {
        self.username_index
            .get(username)
            .is_some_and(|owner| *owner != *me)
    }

    // ------------------------------------------------------ categories/places

    /// Inserts a category unless its slug is already used.
    pub fn insert_category(&self, category: Category) -> bool {
        match self.slug_index.entry(category.slug.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(category.id);
                self.categories.insert(category.id, category);
                true
            }
        }
    }

    pub fn category(&self, id: &Uuid) -> Option<Category> {
        self.categories.get(id).map(|c| c.value().clone())
    }

    pub fn published_category_by_slug(&self, slug: &str) -> Option<Category> {
        let id = *self.slug_index.get(slug)?;
        self.category(&id).filter(|c| c.is_published)
    }

    /// Categories offered in the post form, by title.
    pub fn category_choices(&self) -> Vec<CategoryView> {
        let mut categories: Vec<CategoryView> =
            self.categories.iter().map(|c| CategoryView::from(c.value())).collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        categories
    }

    pub fn insert_location(&self, location: Location) {
        self.locations.insert(location.id, location);
    }

    /// Published locations offered in the post form, by name.
    pub fn location_choices(&self) -> Vec<Location> {
        let mut locations: Vec<Location> = self
            .locations
            .iter()
            .filter(|l| l.is_published)
            .map(|l| l.value().clone())
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        locations
    }

    // ------------------------------------------------------------------ posts

    pub fn post(&self, id: &Uuid) -> Option<Post> {
        self.posts.get(id).map(|p| p.value().clone())
    }

    pub fn save_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// Removes a post together with its comments.
    pub fn delete_post(&self, id: &Uuid) -> Option<Post> {
        let (_, post) = self.posts.remove(id)?;
        self.comments.retain(|_, c| c.post_id != *id);
        Some(post)
    }

    pub fn is_visible(&self, post: &Post, now: DateTime<Utc>) -> bool {
        self.category(&post.category_id)
            .is_some_and(|category| post.is_visible(&category, now))
    }

    /// Index listing: every publicly visible post, newest first.
    pub fn visible_posts(&self, now: DateTime<Utc>) -> Vec<Post> {
        self.sorted_posts(|p| self.is_visible(p, now))
    }

    /// Category listing: the category's publicly visible posts, newest first.
    pub fn category_posts(&self, category_id: &Uuid, now: DateTime<Utc>) -> Vec<Post> {
        self.sorted_posts(|p| p.category_id == *category_id && self.is_visible(p, now))
    }

    /// Profile listing. Hidden posts are included only for their author.
    pub fn author_posts(&self, author_id: &Uuid, include_hidden: bool, now: DateTime<Utc>) -> Vec<Post> {
        self.sorted_posts(|p| p.author_id == *author_id && (include_hidden || self.is_visible(p, now)))
    }

    fn sorted_posts(&self, keep: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| keep(p))
            .collect();

        // Newest publication first; creation time breaks ties.
        posts.sort_by(|a, b| {
            b.pub_date
                .cmp(&a.pub_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        posts
    }

    /// Joins posts with their author, category, location and comment count.
    /// Posts whose author or category vanished are skipped.
    pub fn post_views(&self, posts: Vec<Post>, now: DateTime<Utc>) -> Vec<PostView> {
        let counts = self.comment_counts();
        posts
            .into_iter()
            .filter_map(|post| self.build_post_view(post, &counts, now))
            .collect()
    }

    pub fn post_view(&self, post: Post, now: DateTime<Utc>) -> Option<PostView> {
        let counts = self.comment_counts();
        self.build_post_view(post, &counts, now)
    }

    fn build_post_view(
        &self,
        post: Post,
        counts: &HashMap<Uuid, usize>,
        now: DateTime<Utc>,
    ) -> Option<PostView> {
        let author = self.user(&post.author_id)?;
        let category = self.category(&post.category_id)?;
        let location = post
            .location_id
            .and_then(|id| self.locations.get(&id).map(|l| l.value().clone()))
            .filter(|l| l.is_published)
            .map(|l| l.name);

        Some(PostView {
            id: post.id,
            is_visible: post.is_visible(&category, now),
            pub_date: post.pub_date.format(crate::dto::DATE_FORMAT).to_string(),
            comment_count: counts.get(&post.id).copied().unwrap_or(0),
            author: UserView::from(&author),
            category: CategoryView::from(&category),
            location,
            is_published: post.is_published,
            title: post.title,
            text: post.text,
        })
    }

    // --------------------------------------------------------------- comments

    pub fn comment(&self, id: &Uuid) -> Option<Comment> {
        self.comments.get(id).map(|c| c.value().clone())
    }

    pub fn save_comment(&self, comment: Comment) {
        self.comments.insert(comment.id, comment);
    }

    pub fn delete_comment(&self, id: &Uuid) -> Option<Comment> {
        self.comments.remove(id).map(|(_, c)| c)
    }

    /// Comments under a post, oldest first.
    pub fn post_comments(&self, post_id: &Uuid) -> Vec<CommentView> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == *post_id)
            .map(|c| c.value().clone())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        comments
            .iter()
            .filter_map(|c| self.user(&c.author_id).map(|author| CommentView::new(c, &author)))
            .collect()
    }

    fn comment_counts(&self) -> HashMap<Uuid, usize> {
        let mut counts = HashMap::new();
        for comment in self.comments.iter() {
            *counts.entry(comment.post_id).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(store: &Store, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: format!("{username}@example.com"),
            first_name: String::new(),
            last_name: String::new(),
            hashed_password: String::new(),
            date_joined: Utc::now(),
        };
        assert!(store.insert_user(user.clone()));
        user
    }

    fn category(store: &Store, slug: &str, is_published: bool) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            title: slug.to_uppercase(),
            description: String::new(),
            slug: slug.into(),
            is_published,
            created_at: Utc::now(),
        };
        assert!(store.insert_category(category.clone()));
        category
    }

    fn post(store: &Store, author: &User, category: &Category, offset: Duration) -> Post {
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: "t".into(),
            text: "x".into(),
            pub_date: now + offset,
            author_id: author.id,
            category_id: category.id,
            location_id: None,
            is_published: true,
            created_at: now,
        };
        store.save_post(post.clone());
        post
    }

    #[test]
    fn usernames_are_unique() {
        let store = Store::default();
        let first = user(&store, "anna");
        let mut clash = first.clone();
        clash.id = Uuid::new_v4();
        assert!(!store.insert_user(clash));
        assert_eq!(store.users.len(), 1);
    }

    #[test]
    fn renaming_moves_the_index_entry() {
        let store = Store::default();
        let mut anna = user(&store, "anna");
        user(&store, "bob");

        anna.username = "bob".into();
        assert!(!store.update_user(anna.clone()));

        anna.username = "annie".into();
        assert!(store.update_user(anna.clone()));
        assert!(store.user_by_username("anna").is_none());
        assert_eq!(store.user_by_username("annie").unwrap().id, anna.id);
    }

    #[test]
    fn index_lists_only_visible_posts_newest_first() {
        let store = Store::default();
        let author = user(&store, "anna");
        let open = category(&store, "open", true);
        let closed = category(&store, "closed", false);

        let older = post(&store, &author, &open, Duration::days(-2));
        let newer = post(&store, &author, &open, Duration::days(-1));
        post(&store, &author, &open, Duration::days(1));
        post(&store, &author, &closed, Duration::days(-1));
        let mut draft = post(&store, &author, &open, Duration::days(-1));
        draft.is_published = false;
        store.save_post(draft);

        let ids: Vec<Uuid> = store.visible_posts(Utc::now()).iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        assert_eq!(store.author_posts(&author.id, true, Utc::now()).len(), 5);
        assert_eq!(store.author_posts(&author.id, false, Utc::now()).len(), 2);
    }

    #[test]
    fn deleting_a_post_removes_its_comments() {
        let store = Store::default();
        let author = user(&store, "anna");
        let open = category(&store, "open", true);
        let doomed = post(&store, &author, &open, Duration::days(-1));
        let kept = post(&store, &author, &open, Duration::days(-1));

        for post_id in [doomed.id, doomed.id, kept.id] {
            store.save_comment(Comment {
                id: Uuid::new_v4(),
                text: "hi".into(),
                post_id,
                author_id: author.id,
                created_at: Utc::now(),
            });
        }

        store.delete_post(&doomed.id);
        assert_eq!(store.comments.len(), 1);
        let view = store.post_view(kept, Utc::now()).unwrap();
        assert_eq!(view.comment_count, 1);
    }

    #[test]
    fn unpublished_category_slug_is_not_found() {
        let store = Store::default();
        category(&store, "hidden", false);
        category(&store, "shown", true);
        assert!(store.published_category_by_slug("hidden").is_none());
        assert!(store.published_category_by_slug("shown").is_some());
        assert!(store.published_category_by_slug("missing").is_none());
    }
}
