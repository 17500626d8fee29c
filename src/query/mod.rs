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

//! Listing queries
//!
//! Every listing is ordered newest first with the post id as tie-break, so
//! page boundaries stay stable between requests. Unknown slugs and
//! usernames simply match nothing; turning that into "not found" is up to
//! the caller.

use std::time::Instant;

use crate::error::BlogResult;
use crate::log_query;
use crate::models::{Post, TimelineKind};
use crate::store::{Store, POST_SELECT};

const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.id DESC";

/// Builds ordered post listings on top of the store
#[derive(Clone)]
pub struct PostQuery {
    store: Store,
}

impl PostQuery {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Run the listing for a timeline kind
    pub async fn fetch(&self, kind: &TimelineKind) -> BlogResult<Vec<Post>> {
        let started = Instant::now();

        let posts = match kind {
            TimelineKind::Home => self.home().await?,
            TimelineKind::Group { slug } => self.by_group(slug).await?,
            TimelineKind::Author { username } => self.by_author(username).await?,
            TimelineKind::Feed { username } => self.feed(username).await?,
        };

        log_query!(kind, posts.len(), started.elapsed().as_millis() as u64);
        Ok(posts)
    }

    /// Every post
    pub async fn home(&self) -> BlogResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!("{POST_SELECT} {NEWEST_FIRST}"))
            .fetch_all(self.store.pool())
            .await?;

        Ok(posts)
    }

    /// Posts whose group has the given slug
    pub async fn by_group(&self, slug: &str) -> BlogResult<Vec<Post>> {
        let posts =
            sqlx::query_as::<_, Post>(&format!("{POST_SELECT} WHERE g.slug = ? {NEWEST_FIRST}"))
                .bind(slug)
                .fetch_all(self.store.pool())
                .await?;

        Ok(posts)
    }

    /// Posts written by the given user
    pub async fn by_author(&self, username: &str) -> BlogResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_SELECT} WHERE u.username = ? {NEWEST_FIRST}"
        ))
        .bind(username)
        .fetch_all(self.store.pool())
        .await?;

        Ok(posts)
    }

    /// Posts by every author the given user follows
    pub async fn feed(&self, username: &str) -> BlogResult<Vec<Post>> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"{POST_SELECT}
            WHERE p.author_id IN (
                SELECT f.author_id
                FROM follows f
                JOIN users follower ON follower.id = f.user_id
                WHERE follower.username = ?
            )
            {NEWEST_FIRST}"#
        ))
        .bind(username)
        .fetch_all(self.store.pool())
        .await?;

        Ok(posts)
    }
}
