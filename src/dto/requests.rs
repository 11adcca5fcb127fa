use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::{models::Post, store::Store};

/// Field name -> messages, ready to be shown next to each form input.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Value of the `datetime-local` input.
const INPUT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const ACCEPTED_DATE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

fn add_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message("This field is required.".into()));
    }
    Ok(())
}

fn username_chars(value: &str) -> Result<(), ValidationError> {
    let ok = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'));
    if !ok {
        return Err(ValidationError::new("username").with_message(
            "Letters, digits and @/./+/-/_ only.".into(),
        ));
    }
    Ok(())
}

fn optional_email(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && !value.validate_email() {
        return Err(ValidationError::new("email").with_message("Enter a valid email address.".into()));
    }
    Ok(())
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Post create/edit form as submitted by the browser.
#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
#[serde(default)]
pub struct PostForm {
    #[validate(
        length(max = 256, message = "Title must be 1-256 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    /// Checkbox; browsers omit it when unchecked.
    pub is_published: Option<String>,
}

/// Post fields after validation
#[derive(Debug, Clone)]
pub struct PostData {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: Uuid,
    pub location_id: Option<Uuid>,
    pub is_published: bool,
}

impl PostForm {
    /// Blank form for a new post: published now.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            pub_date: now.format(INPUT_DATE_FORMAT).to_string(),
            is_published: Some("on".to_string()),
            ..Default::default()
        }
    }

    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date.format(INPUT_DATE_FORMAT).to_string(),
            category: post.category_id.to_string(),
            location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            is_published: post.is_published.then(|| "on".to_string()),
        }
    }

    pub fn clean(&self, store: &Store) -> Result<PostData, FieldErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => field_errors(&e),
        };

        let pub_date = parse_pub_date(&self.pub_date);
        if pub_date.is_none() {
            add_error(&mut errors, "pub_date", "Enter a valid date and time.");
        }

        let category_id = Uuid::parse_str(self.category.trim())
            .ok()
            .filter(|id| store.categories.contains_key(id));
        if category_id.is_none() {
            add_error(&mut errors, "category", "Select a valid category.");
        }

        let location_id = match self.location.trim() {
            "" => Ok(None),
            raw => Uuid::parse_str(raw)
                .ok()
                .filter(|id| store.locations.contains_key(id))
                .map(Some)
                .ok_or(()),
        };
        if location_id.is_err() {
            add_error(&mut errors, "location", "Select a valid location.");
        }

        match (pub_date, category_id, location_id) {
            (Some(pub_date), Some(category_id), Ok(location_id)) if errors.is_empty() => {
                Ok(PostData {
                    title: self.title.trim().to_string(),
                    text: self.text.clone(),
                    pub_date,
                    category_id,
                    location_id,
                    is_published: self.is_published.is_some(),
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
#[serde(default)]
pub struct CommentForm {
    #[validate(
        length(max = 2000, message = "Comments are limited to 2000 characters"),
        custom(function = "not_blank")
    )]
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> Result<String, FieldErrors> {
        self.validate().map_err(|e| field_errors(&e))?;
        Ok(self.text.trim().to_string())
    }
}

#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(
        length(min = 3, max = 150, message = "Username must be 3-150 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,
    #[validate(custom(function = "optional_email"))]
    pub email: String,
}

#[derive(Debug, Clone, Default, Validate, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(
        length(min = 3, max = 150, message = "Username must be 3-150 characters"),
        custom(function = "username_chars")
    )]
    pub username: String,
    #[validate(custom(function = "optional_email"))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password1: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_matching_passwords() {
        let form = RegistrationForm {
            username: "leo".into(),
            email: String::new(),
            password1: "correct horse".into(),
            password2: "battery staple".into(),
        };
        let errors = field_errors(&form.validate().unwrap_err());
        assert!(errors.contains_key("password2"));
        assert!(!errors.contains_key("email"));
    }

    #[test]
    fn usernames_reject_spaces() {
        let form = ProfileForm {
            username: "two words".into(),
            email: "a@example.com".into(),
            ..Default::default()
        };
        let errors = field_errors(&form.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("username"));
    }

    #[test]
    fn blank_comment_is_invalid() {
        let form = CommentForm { text: "   ".into() };
        assert!(form.clean().unwrap_err().contains_key("text"));
        let form = CommentForm { text: " nice post ".into() };
        assert_eq!(form.clean().unwrap(), "nice post");
    }

    #[test]
    fn pub_date_accepts_browser_and_plain_formats() {
        assert!(parse_pub_date("2024-05-01T10:30").is_some());
        assert!(parse_pub_date("2024-05-01 10:30:15").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }

    #[test]
    fn post_form_reports_unknown_category() {
        let store = Store::default();
        let form = PostForm {
            title: "Trip".into(),
            text: "Went somewhere".into(),
            pub_date: "2024-05-01T10:30".into(),
            category: Uuid::new_v4().to_string(),
            ..Default::default()
        };
        let errors = form.clean(&store).unwrap_err();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["category"]);
    }

    #[test]
    fn whitespace_title_is_required() {
        let store = Store::default();
        let form = PostForm {
            title: "   ".into(),
            text: "Went somewhere".into(),
            pub_date: "2024-05-01T10:30".into(),
            ..Default::default()
        };
        let errors = form.clean(&store).unwrap_err();
        assert_eq!(errors["title"], vec!["This field is required.".to_string()]);
    }

    #[test]
    fn post_form_reports_unknown_or_malformed_location() {
        let store = Store::default();
        let category = crate::models::Category {
            id: Uuid::new_v4(),
            title: "Travel".into(),
            description: String::new(),
            slug: "travel".into(),
            is_published: true,
            created_at: Utc::now(),
        };
        let category_id = category.id.to_string();
        store.insert_category(category);

        for location in [Uuid::new_v4().to_string(), "not-an-id".to_string()] {
            let form = PostForm {
                title: "Trip".into(),
                text: "Went somewhere".into(),
                pub_date: "2024-05-01T10:30".into(),
                category: category_id.clone(),
                location,
                ..Default::default()
            };
            let errors = form.clean(&store).unwrap_err();
            assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["location"]);
        }
    }

    #[test]
    fn profile_email_may_stay_blank() {
        let form = ProfileForm {
            username: "leo".into(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        let form = ProfileForm {
            username: "leo".into(),
            email: "not an address".into(),
            ..Default::default()
        };
        assert!(field_errors(&form.validate().unwrap_err()).contains_key("email"));
    }
}
