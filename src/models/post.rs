// Yatube - A blog with groups, comments and author subscriptions
// Copyright (C) 2025 Yatube Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Post, group and comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BlogError, BlogResult};

/// Number of characters a post shows when displayed inline
pub const POST_PREVIEW_CHARS: usize = 15;

/// A named category of posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Request to create a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl NewGroup {
    pub fn validate(&self) -> BlogResult<()> {
        let slug = self.slug.as_str();
        if slug.is_empty() {
            return Err(BlogError::Validation("group slug must not be empty".into()));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BlogError::Validation(format!(
                "group slug `{slug}` may only contain letters, digits, `-` and `_`"
            )));
        }
        if self.title.trim().is_empty() {
            return Err(BlogError::Validation("group title must not be empty".into()));
        }
        Ok(())
    }
}

/// A post as listed on every page, with its author and group denormalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    /// Unique identifier
    pub id: i64,

    /// Body text
    pub text: String,

    /// When this post was created
    pub created_at: DateTime<Utc>,

    /// Author of the post
    pub author_id: i64,
    pub author_username: String,

    /// Group the post belongs to, if any
    pub group_id: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,

    /// Stored path of the attached image
    pub image: Option<String>,
}

impl Post {
    /// The first `POST_PREVIEW_CHARS` characters of the text
    pub fn preview(&self) -> &str {
        match self.text.char_indices().nth(POST_PREVIEW_CHARS) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.preview())
    }
}

/// Request to create a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn validate(&self) -> BlogResult<()> {
        validate_text("post", &self.text)
    }
}

/// Author edit of an existing post; replaces text and group, and the image
/// when one is given
pub type PostEdit = NewPost;

/// A comment under a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A post with everything its detail page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,

    /// Total number of posts by the same author
    pub author_posts_count: i64,

    /// Comments, oldest first
    pub comments: Vec<Comment>,
}

/// Reject blank text for posts and comments
pub fn validate_text(kind: &str, text: &str) -> BlogResult<()> {
    if text.trim().is_empty() {
        return Err(BlogError::Validation(format!("{kind} text must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_with_text(text: &str) -> Post {
        Post {
            id: 1,
            text: text.to_string(),
            created_at: Utc::now(),
            author_id: 1,
            author_username: "author".to_string(),
            group_id: None,
            group_slug: None,
            group_title: None,
            image: None,
        }
    }

    #[test]
    fn post_displays_first_fifteen_characters() {
        let post = post_with_text("Тестовый пост про длинный текст");
        assert_eq!(post.to_string(), "Тестовый пост п");
        assert_eq!(post.to_string().chars().count(), POST_PREVIEW_CHARS);

        let short = post_with_text("short");
        assert_eq!(short.to_string(), "short");
    }

    #[test]
    fn group_displays_title() {
        let group = Group {
            id: 1,
            slug: "test-slug".into(),
            title: "Тестовая группа".into(),
            description: "Тестовое описание".into(),
        };
        assert_eq!(group.to_string(), "Тестовая группа");
    }

    #[test]
    fn blank_text_is_rejected() {
        let post = NewPost {
            text: "   ".into(),
            ..Default::default()
        };
        assert!(matches!(post.validate(), Err(BlogError::Validation(_))));
        assert!(validate_text("comment", "ok").is_ok());
    }

    #[test]
    fn group_slug_must_be_slug_like() {
        let mut group = NewGroup {
            slug: "cats and dogs".into(),
            title: "Pets".into(),
            description: String::new(),
        };
        assert!(group.validate().is_err());
        group.slug = "cats-and_dogs2".into();
        assert!(group.validate().is_ok());
    }
}
