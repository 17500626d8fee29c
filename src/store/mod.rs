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

//! Entity store
//!
//! Uses SQLite for users, groups, posts, comments and follows.

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{conflict_on_unique, BlogError, BlogResult};
use crate::models::{
    validate_text, Comment, Follow, Group, NewGroup, NewPost, Post, PostEdit, User,
};

/// Columns of a listed post; every post query starts from this
pub(crate) const POST_SELECT: &str = r#"
    SELECT p.id, p.text, p.created_at, p.author_id, u.username AS author_username,
           p.group_id, g.slug AS group_slug, g.title AS group_title, p.image
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.text, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

/// Persistent store for blog entities
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the database file named by the configuration
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }

        info!("Opening database at {}", config.database_path.display());

        Self::connect(&config.database_url(), config.db_max_connections)
            .await
            .context("Failed to open database")
    }

    /// Connect to a SQLite URL and make sure the schema exists
    ///
    /// `sqlite::memory:` needs `max_connections == 1`, every connection
    /// would otherwise see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> BlogResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> BlogResult<()> {
        debug!("Initializing schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS post_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                slug TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                group_id INTEGER REFERENCES post_groups(id) ON DELETE SET NULL,
                image TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC, id DESC);
            CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
            CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id);

            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);

            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                UNIQUE (user_id, author_id)
            );

            CREATE INDEX IF NOT EXISTS idx_follows_author ON follows(author_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Schema initialized");

        Ok(())
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ===== USERS =====

    /// Register a user with a unique username
    pub async fn create_user(&self, username: &str, created_at: DateTime<Utc>) -> BlogResult<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(BlogError::Validation("username must not be empty".into()));
        }

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, created_at) VALUES (?, ?) RETURNING id, username, created_at",
        )
        .bind(username)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("username `{username}` is taken")))?;

        info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Get a user by username
    pub async fn user_by_username(&self, username: &str) -> BlogResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // ===== GROUPS =====

    /// Create a group with a unique slug
    pub async fn create_group(&self, group: &NewGroup) -> BlogResult<Group> {
        group.validate()?;

        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO post_groups (slug, title, description)
            VALUES (?, ?, ?)
            RETURNING id, slug, title, description
            "#,
        )
        .bind(&group.slug)
        .bind(group.title.trim())
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, format!("group slug `{}` is taken", group.slug)))?;

        info!("Created group {} ({})", created.slug, created.id);
        Ok(created)
    }

    /// Get a group by slug
    pub async fn group_by_slug(&self, slug: &str) -> BlogResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM post_groups WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    /// Get a group by ID
    pub async fn group_by_id(&self, id: i64) -> BlogResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, slug, title, description FROM post_groups WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    // ===== POSTS =====

    /// Store a new post; the group, if any, must already exist
    pub async fn insert_post(
        &self,
        author_id: i64,
        post: &NewPost,
        created_at: DateTime<Utc>,
    ) -> BlogResult<Post> {
        post.validate()?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (text, created_at, author_id, group_id, image)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&post.text)
        .bind(created_at)
        .bind(author_id)
        .bind(post.group_id)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id = id, author_id, "Inserted post");

        self.post_by_id(id)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("post {id}")))
    }

    /// Replace the text and group of a post; the image only when a new one is given
    pub async fn update_post(&self, id: i64, edit: &PostEdit) -> BlogResult<Post> {
        edit.validate()?;

        let result = sqlx::query(
            "UPDATE posts SET text = ?, group_id = ?, image = COALESCE(?, image) WHERE id = ?",
        )
            .bind(&edit.text)
            .bind(edit.group_id)
            .bind(&edit.image)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BlogError::NotFound(format!("post {id}")));
        }

        debug!(post_id = id, "Updated post");

        self.post_by_id(id)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("post {id}")))
    }

    /// Get a post by ID
    pub async fn post_by_id(&self, id: i64) -> BlogResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Number of posts written by a user
    pub async fn count_posts_by_author(&self, author_id: i64) -> BlogResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // ===== COMMENTS =====

    /// Store a comment under a post
    pub async fn insert_comment(
        &self,
        post_id: i64,
        author_id: i64,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> BlogResult<Comment> {
        validate_text("comment", text)?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO comments (post_id, author_id, text, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(comment_id = id, post_id, "Inserted comment");

        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Comments under a post, oldest first
    pub async fn comments_for_post(&self, post_id: i64) -> BlogResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(comments)
    }

    // ===== FOLLOWS =====

    /// Add a follow edge; returns `None` when it already existed
    pub async fn follow(
        &self,
        user_id: i64,
        author_id: i64,
        created_at: DateTime<Utc>,
    ) -> BlogResult<Option<Follow>> {
        let follow = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO follows (user_id, author_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, author_id) DO NOTHING
            RETURNING id, user_id, author_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .bind(created_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(follow)
    }

    /// Remove a follow edge; returns false when there was none
    pub async fn unfollow(&self, user_id: i64, author_id: i64) -> BlogResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether `user_id` follows `author_id`
    pub async fn is_following(&self, user_id: i64, author_id: i64) -> BlogResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ? AND author_id = ?)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Number of authors a user follows
    pub async fn count_following(&self, user_id: i64) -> BlogResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM follows WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_store() -> Store {
        Store::connect("sqlite::memory:", 1)
            .await
            .expect("in-memory store")
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = memory_store().await;
        store.create_user("author", Utc::now()).await.unwrap();

        let err = store.create_user("author", Utc::now()).await.unwrap_err();
        assert!(matches!(err, BlogError::Conflict(_)), "{err:?}");

        let err = store.create_user("   ", Utc::now()).await.unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[tokio::test]
    async fn group_slugs_are_unique() {
        let store = memory_store().await;
        let group = NewGroup {
            slug: "test-slug".into(),
            title: "Тестовая группа".into(),
            description: "Тестовое описание".into(),
        };
        let created = store.create_group(&group).await.unwrap();
        assert_eq!(
            store.group_by_slug("test-slug").await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(store.group_by_id(created.id).await.unwrap(), Some(created));

        let err = store.create_group(&group).await.unwrap_err();
        assert!(matches!(err, BlogError::Conflict(_)));
    }

    #[tokio::test]
    async fn post_round_trips_with_author_and_group() {
        let store = memory_store().await;
        let author = store.create_user("author", Utc::now()).await.unwrap();
        let group = store
            .create_group(&NewGroup {
                slug: "g1".into(),
                title: "Group one".into(),
                description: String::new(),
            })
            .await
            .unwrap();

        let post = store
            .insert_post(
                author.id,
                &NewPost {
                    text: "Тестовый пост".into(),
                    group_id: Some(group.id),
                    image: Some("posts/test_image.gif".into()),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        assert_eq!(post.author_username, "author");
        assert_eq!(post.group_slug.as_deref(), Some("g1"));
        assert_eq!(post.group_title.as_deref(), Some("Group one"));
        assert_eq!(post.image.as_deref(), Some("posts/test_image.gif"));
        assert_eq!(store.post_by_id(post.id).await.unwrap(), Some(post));
        assert_eq!(store.count_posts_by_author(author.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_of_missing_post_is_not_found() {
        let store = memory_store().await;
        let edit = PostEdit {
            text: "text".into(),
            ..Default::default()
        };
        let err = store.update_post(42, &edit).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[tokio::test]
    async fn comments_list_oldest_first() {
        let store = memory_store().await;
        let author = store.create_user("author", Utc::now()).await.unwrap();
        let post = store
            .insert_post(author.id, &NewPost { text: "post".into(), ..Default::default() }, Utc::now())
            .await
            .unwrap();

        let first = store.insert_comment(post.id, author.id, "first", Utc::now()).await.unwrap();
        let second = store.insert_comment(post.id, author.id, "second", Utc::now()).await.unwrap();
        assert_eq!(first.author_username, "author");

        let comments = store.comments_for_post(post.id).await.unwrap();
        assert_eq!(comments, vec![first, second]);
    }

    #[tokio::test]
    async fn follow_edges_are_unique() {
        let store = memory_store().await;
        let user = store.create_user("user", Utc::now()).await.unwrap();
        let author = store.create_user("author", Utc::now()).await.unwrap();

        let edge = store.follow(user.id, author.id, Utc::now()).await.unwrap().unwrap();
        assert_eq!((edge.user_id, edge.author_id), (user.id, author.id));
        assert!(store.follow(user.id, author.id, Utc::now()).await.unwrap().is_none());
        assert_eq!(store.count_following(user.id).await.unwrap(), 1);
        assert!(store.is_following(user.id, author.id).await.unwrap());
        assert!(!store.is_following(author.id, user.id).await.unwrap());

        assert!(store.unfollow(user.id, author.id).await.unwrap());
        assert!(!store.unfollow(user.id, author.id).await.unwrap());
        assert_eq!(store.count_following(user.id).await.unwrap(), 0);
    }
}
