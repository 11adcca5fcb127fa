use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    models::{Category, Location},
    store::Store,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub categories: Vec<CategoryFixture>,
    pub locations: Vec<LocationFixture>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryFixture {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    #[serde(default = "published")]
    pub is_published: bool,
}

#[derive(Debug, Deserialize)]
pub struct LocationFixture {
    pub name: String,
    #[serde(default = "published")]
    pub is_published: bool,
}

fn published() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("cannot read fixtures: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed fixtures: {0}")]
    Json(#[from] serde_json::Error),
}

impl Fixtures {
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Inserts categories and locations, skipping slugs that already exist.
    pub fn load_into(self, store: &Store) {
        let now = Utc::now();
        let mut loaded = 0;

        for fixture in self.categories {
            let category = Category {
                id: Uuid::new_v4(),
                title: fixture.title,
                description: fixture.description,
                slug: fixture.slug,
                is_published: fixture.is_published,
                created_at: now,
            };
            let slug = category.slug.clone();
            if store.insert_category(category) {
                loaded += 1;
            } else {
                warn!("Skipping duplicate category slug: {}", slug);
            }
        }

        for fixture in self.locations {
            store.insert_location(Location {
                id: Uuid::new_v4(),
                name: fixture.name,
                is_published: fixture.is_published,
                created_at: now,
            });
            loaded += 1;
        }

        info!("Loaded {} fixture records", loaded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_slugs_are_skipped() {
        let fixtures: Fixtures = serde_json::from_str(
            r#"{
                "categories": [
                    {"title": "Travel", "slug": "travel"},
                    {"title": "Travel again", "slug": "travel"},
                    {"title": "Drafts", "slug": "drafts", "is_published": false}
                ],
                "locations": [{"name": "Island"}]
            }"#,
        )
        .unwrap();

        let store = Store::default();
        fixtures.load_into(&store);

        assert_eq!(store.categories.len(), 2);
        assert_eq!(store.locations.len(), 1);
        assert!(store.published_category_by_slug("drafts").is_none());
        assert_eq!(store.published_category_by_slug("travel").unwrap().title, "Travel");
    }

    #[test]
    fn bundled_fixture_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/blog.json");
        let fixtures = Fixtures::from_file(&path).unwrap();
        assert_eq!(fixtures.categories.len(), 3);
        assert_eq!(fixtures.locations.len(), 3);
    }
}
