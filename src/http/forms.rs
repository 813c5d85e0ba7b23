use serde::Deserialize;

use crate::http::FieldErrors;

const TEXT_MAX: usize = 10_000;
const IMAGE_KEY_MAX: usize = 512;
const USERNAME_MAX: usize = 30;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

/// Submitted fields for creating or editing a post. `group` carries a slug;
/// it resolves to an id in the handler since that needs a lookup.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

impl PostForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.text.trim().is_empty() {
            errors.insert("text", "text is required".to_string());
        } else if self.text.len() > TEXT_MAX {
            errors.insert("text", format!("text must be at most {} characters", TEXT_MAX));
        }
        if let Some(group) = &self.group {
            if group.trim().is_empty() {
                errors.insert("group", "group slug must not be blank".to_string());
            }
        }
        if let Some(image) = &self.image {
            if image.len() > IMAGE_KEY_MAX {
                errors.insert("image", "image key too long".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.text.trim().is_empty() {
            errors.insert("text", "text is required".to_string());
        } else if self.text.len() > TEXT_MAX {
            errors.insert("text", format!("text must be at most {} characters", TEXT_MAX));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.insert("username", "username is required".to_string());
        } else if username.len() > USERNAME_MAX {
            errors.insert(
                "username",
                format!("username must be at most {} characters", USERNAME_MAX),
            );
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            errors.insert(
                "username",
                "username may contain only letters, digits and underscores".to_string(),
            );
        }
        if self.password.len() < PASSWORD_MIN {
            errors.insert(
                "password",
                format!("password must be at least {} characters", PASSWORD_MIN),
            );
        } else if self.password.len() > PASSWORD_MAX {
            errors.insert(
                "password",
                format!("password must be at most {} characters", PASSWORD_MAX),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GroupForm {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl GroupForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.title.trim().is_empty() {
            errors.insert("title", "title is required".to_string());
        }
        let slug = self.slug.trim();
        if slug.is_empty() {
            errors.insert("slug", "slug is required".to_string());
        } else if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.insert(
                "slug",
                "slug may contain only lowercase letters, digits and hyphens".to_string(),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_form_requires_text() {
        let form = PostForm {
            text: "   ".to_string(),
            group: None,
            image: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains_key("text"));
    }

    #[test]
    fn post_form_rejects_blank_group_slug() {
        let form = PostForm {
            text: "hello".to_string(),
            group: Some("".to_string()),
            image: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains_key("group"));
    }

    #[test]
    fn post_form_accepts_optional_fields() {
        let form = PostForm {
            text: "hello".to_string(),
            group: Some("cooking".to_string()),
            image: Some("posts/abc.jpg".to_string()),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn signup_form_rejects_bad_username() {
        let form = SignupForm {
            username: "has spaces".to_string(),
            password: "longenough".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains_key("username"));
    }

    #[test]
    fn group_form_rejects_uppercase_slug() {
        let form = GroupForm {
            title: "Cooking".to_string(),
            slug: "Cooking".to_string(),
            description: "recipes".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.contains_key("slug"));
    }
}
