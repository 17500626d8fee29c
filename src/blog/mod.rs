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

//! Blog operations behind each page of the site
//!
//! Combines the store, the listing queries, pagination and the home
//! timeline cache. Unknown groups, users and posts surface here as
//! [`BlogError::NotFound`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{Clock, PageCache};
use crate::config::Config;
use crate::error::{BlogError, BlogResult};
use crate::models::{
    AuthorProfile, Comment, Group, GroupPage, IndexPage, NewGroup, NewPost, Post, PostDetail,
    PostEdit, ProfilePage, TimelineKind, User,
};
use crate::pagination::{paginate, requested_number, Page};
use crate::query::PostQuery;
use crate::store::Store;

/// Cache key prefix of the home timeline
const INDEX_CACHE_KEY: &str = "posts:index";

/// The blog application core
#[derive(Clone)]
pub struct Blog {
    store: Store,
    posts: PostQuery,
    cache: PageCache,
    clock: Arc<dyn Clock>,
    page_size: usize,
    index_ttl: Duration,
}

impl Blog {
    pub fn new(store: Store, cache: PageCache, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            posts: PostQuery::new(store.clone()),
            store,
            cache,
            clock,
            page_size: config.page_size,
            index_ttl: config.index_cache_ttl(),
        }
    }

    // ===== LISTINGS =====

    /// Home timeline, served from the cache while it is fresh
    pub async fn index(&self, page: Option<&str>) -> BlogResult<IndexPage> {
        let key = format!(
            "{INDEX_CACHE_KEY}?page={}",
            requested_number(page).unwrap_or(1)
        );

        self.cache
            .get_or_compute(&key, self.index_ttl, || async {
                let posts = self.posts.fetch(&TimelineKind::Home).await?;
                Ok::<_, BlogError>(paginate(posts, self.page_size, page))
            })
            .await
    }

    /// Posts of one group
    pub async fn group_posts(&self, slug: &str, page: Option<&str>) -> BlogResult<GroupPage> {
        let group = self
            .store
            .group_by_slug(slug)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("group `{slug}`")))?;

        let posts = self
            .posts
            .fetch(&TimelineKind::Group {
                slug: group.slug.clone(),
            })
            .await?;

        Ok(GroupPage {
            group,
            page: paginate(posts, self.page_size, page),
        })
    }

    /// Posts of one author, with whether `viewer` follows them
    pub async fn profile(
        &self,
        username: &str,
        page: Option<&str>,
        viewer: Option<&str>,
    ) -> BlogResult<ProfilePage> {
        let author = self.require_user(username).await?;
        let posts = self
            .posts
            .fetch(&TimelineKind::Author {
                username: author.username.clone(),
            })
            .await?;

        let following = match viewer {
            Some(name) => match self.store.user_by_username(name).await? {
                Some(viewer) => self.store.is_following(viewer.id, author.id).await?,
                None => false,
            },
            None => false,
        };

        let following_count = self.store.count_following(author.id).await?;
        let page = paginate(posts, self.page_size, page);

        Ok(ProfilePage {
            profile: AuthorProfile {
                posts_count: page.count as i64,
                following_count,
                author,
                following,
            },
            page,
        })
    }

    /// Posts by the authors `username` follows
    pub async fn follow_index(&self, username: &str, page: Option<&str>) -> BlogResult<Page<Post>> {
        let user = self.require_user(username).await?;
        let posts = self
            .posts
            .fetch(&TimelineKind::Feed {
                username: user.username,
            })
            .await?;

        Ok(paginate(posts, self.page_size, page))
    }

    // ===== POSTS =====

    /// A single post with its comments
    pub async fn post_detail(&self, post_id: i64) -> BlogResult<PostDetail> {
        let post = self.require_post(post_id).await?;
        let author_posts_count = self.store.count_posts_by_author(post.author_id).await?;
        let comments = self.store.comments_for_post(post.id).await?;

        Ok(PostDetail {
            post,
            author_posts_count,
            comments,
        })
    }

    /// Publish a post as `author`
    pub async fn create_post(&self, author: &str, post: NewPost) -> BlogResult<Post> {
        post.validate()?;
        let author = self.require_user(author).await?;
        self.check_group(post.group_id).await?;

        let created = self
            .store
            .insert_post(author.id, &post, self.clock.now())
            .await?;

        info!(post_id = created.id, author = %author, "Post created");
        Ok(created)
    }

    /// Change a post; only its author may do this
    pub async fn edit_post(&self, editor: &str, post_id: i64, edit: PostEdit) -> BlogResult<Post> {
        let post = self.require_post(post_id).await?;
        if post.author_username != editor {
            return Err(BlogError::Forbidden(format!(
                "post {post_id} belongs to {}",
                post.author_username
            )));
        }

        edit.validate()?;
        self.check_group(edit.group_id).await?;

        let updated = self.store.update_post(post.id, &edit).await?;

        info!(post_id, "Post edited");
        Ok(updated)
    }

    /// Comment on a post as `author`
    pub async fn add_comment(&self, author: &str, post_id: i64, text: &str) -> BlogResult<Comment> {
        let author = self.require_user(author).await?;
        let post = self.require_post(post_id).await?;

        let comment = self
            .store
            .insert_comment(post.id, author.id, text, self.clock.now())
            .await?;

        debug!(comment_id = comment.id, post_id, "Comment added");
        Ok(comment)
    }

    // ===== FOLLOWS =====

    /// Subscribe `username` to `author`; returns whether a new subscription was made
    ///
    /// Following yourself is accepted and does nothing.
    pub async fn profile_follow(&self, username: &str, author: &str) -> BlogResult<bool> {
        let user = self.require_user(username).await?;
        let author = self.require_user(author).await?;

        if user.id == author.id {
            debug!(user = %user, "Ignoring self-follow");
            return Ok(false);
        }

        match self.store.follow(user.id, author.id, self.clock.now()).await? {
            Some(follow) => {
                info!(follow_id = follow.id, user = %user, author = %author, "Followed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unsubscribe `username` from `author`; returns whether a subscription existed
    pub async fn profile_unfollow(&self, username: &str, author: &str) -> BlogResult<bool> {
        let user = self.require_user(username).await?;
        let author = self.require_user(author).await?;

        let removed = self.store.unfollow(user.id, author.id).await?;
        if removed {
            info!(user = %user, author = %author, "Unfollowed");
        }
        Ok(removed)
    }

    // ===== ADMINISTRATION =====

    pub async fn register_user(&self, username: &str) -> BlogResult<User> {
        self.store.create_user(username, self.clock.now()).await
    }

    pub async fn create_group(&self, group: NewGroup) -> BlogResult<Group> {
        self.store.create_group(&group).await
    }

    /// Drop the cached home timeline
    pub async fn clear_cache(&self) -> BlogResult<()> {
        self.cache.clear().await?;
        Ok(())
    }

    // ===== HELPERS =====

    async fn require_user(&self, username: &str) -> BlogResult<User> {
        self.store
            .user_by_username(username)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("user `{username}`")))
    }

    async fn require_post(&self, post_id: i64) -> BlogResult<Post> {
        self.store
            .post_by_id(post_id)
            .await?
            .ok_or_else(|| BlogError::NotFound(format!("post {post_id}")))
    }

    async fn check_group(&self, group_id: Option<i64>) -> BlogResult<()> {
        if let Some(id) = group_id {
            if self.store.group_by_id(id).await?.is_none() {
                return Err(BlogError::Validation(format!("group {id} does not exist")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryCache};
    use crate::store::tests::memory_store;
    use chrono::{TimeZone, Utc};

    pub(crate) struct Fixture {
        pub blog: Blog,
        pub clock: ManualClock,
        pub cache: Arc<MemoryCache>,
    }

    pub(crate) async fn fixture(page_size: usize) -> Fixture {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let config = Config {
            page_size,
            ..Config::default()
        };
        let cache = Arc::new(MemoryCache::new(shared.clone(), config.index_cache_max_entries));
        let blog = Blog::new(
            memory_store().await,
            PageCache::new(cache.clone()),
            shared,
            &config,
        );
        Fixture { blog, clock, cache }
    }

    fn text(t: &str) -> NewPost {
        NewPost {
            text: t.to_string(),
            ..Default::default()
        }
    }

    async fn group(blog: &Blog, slug: &str) -> Group {
        blog.create_group(NewGroup {
            slug: slug.into(),
            title: format!("Group {slug}"),
            description: "Тестовое описание".into(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn eleven_posts_paginate_into_ten_and_one() {
        let Fixture { blog, clock, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        let g = group(&blog, "test-slug").await;

        for i in 0..11 {
            clock.advance(Duration::from_secs(1));
            let post = NewPost {
                text: format!("Тестовый пост {i}"),
                group_id: Some(g.id),
                image: None,
            };
            blog.create_post("author", post).await.unwrap();
        }

        let first = blog.index(None).await.unwrap();
        assert_eq!(first.len(), 10);
        assert!(first.has_next);
        assert_eq!(first.items[0].text, "Тестовый пост 10");

        let second = blog.index(Some("2")).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(!second.has_next);
        assert_eq!(second.items[0].text, "Тестовый пост 0");

        let group_page = blog.group_posts("test-slug", Some("2")).await.unwrap().page;
        assert_eq!(group_page.len(), 1);

        let profile = blog.profile("author", None, None).await.unwrap();
        assert_eq!(profile.page.len(), 10);
        assert_eq!(profile.profile.posts_count, 11);
    }

    #[tokio::test]
    async fn index_is_cached_until_cleared() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.create_post("author", text("first")).await.unwrap();

        let before = blog.index(None).await.unwrap();
        blog.create_post("author", text("second")).await.unwrap();

        let cached = blog.index(None).await.unwrap();
        assert_eq!(cached, before);

        blog.clear_cache().await.unwrap();
        let fresh = blog.index(None).await.unwrap();
        assert_ne!(fresh, before);
        assert_eq!(fresh.count, 2);
        assert_eq!(fresh.items[0].text, "second");
    }

    #[tokio::test]
    async fn index_cache_expires_after_ttl() {
        let Fixture { blog, clock, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.create_post("author", text("first")).await.unwrap();

        let before = blog.index(None).await.unwrap();
        blog.create_post("author", text("second")).await.unwrap();

        clock.advance(Duration::from_secs(19));
        assert_eq!(blog.index(None).await.unwrap(), before);

        clock.advance(Duration::from_secs(1));
        assert_eq!(blog.index(None).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn junk_page_values_share_one_cache_entry() {
        let Fixture { blog, clock, cache } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.create_post("author", text("only")).await.unwrap();

        for i in 0..1000 {
            let page = blog.index(Some(format!("junk{i}").as_str())).await.unwrap();
            assert_eq!(page.number, 1);
        }
        blog.index(Some("1")).await.unwrap();
        blog.index(None).await.unwrap();
        assert_eq!(cache.len().await, 1);

        blog.index(Some("02")).await.unwrap();
        blog.index(Some("2")).await.unwrap();
        assert_eq!(cache.len().await, 2);

        clock.advance(Duration::from_secs(3600));
        blog.index(Some("3")).await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn other_listings_are_not_cached() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        let g = group(&blog, "g1").await;
        let in_group = NewPost {
            group_id: Some(g.id),
            ..text("one")
        };

        blog.create_post("author", in_group.clone()).await.unwrap();
        assert_eq!(blog.group_posts("g1", None).await.unwrap().page.count, 1);
        blog.create_post("author", in_group).await.unwrap();
        assert_eq!(blog.group_posts("g1", None).await.unwrap().page.count, 2);
        assert_eq!(blog.profile("author", None, None).await.unwrap().page.count, 2);
    }

    #[tokio::test]
    async fn unknown_group_user_and_post_are_not_found() {
        let Fixture { blog, .. } = fixture(10).await;

        let err = blog.group_posts("missing", None).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
        let err = blog.profile("ghost", None, None).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
        let err = blog.post_detail(404).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
        let err = blog.follow_index("ghost", None).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[tokio::test]
    async fn follow_feed_tracks_subscriptions() {
        let Fixture { blog, clock, .. } = fixture(10).await;
        blog.register_user("user").await.unwrap();
        blog.register_user("author").await.unwrap();
        blog.create_post("author", text("before follow")).await.unwrap();

        assert!(blog.follow_index("user", None).await.unwrap().is_empty());

        assert!(blog.profile_follow("user", "author").await.unwrap());
        assert!(!blog.profile_follow("user", "author").await.unwrap());

        clock.advance(Duration::from_secs(5));
        let new_post = blog.create_post("author", text("after follow")).await.unwrap();

        let feed = blog.follow_index("user", None).await.unwrap();
        assert_eq!(feed.count, 2);
        assert_eq!(feed.items[0], new_post);

        // Subscriptions are one-way
        assert!(blog.follow_index("author", None).await.unwrap().is_empty());

        let profile = blog.profile("author", None, Some("user")).await.unwrap();
        assert!(profile.profile.following);
        let reader = blog.profile("user", None, Some("author")).await.unwrap();
        assert!(!reader.profile.following);
        assert_eq!(reader.profile.following_count, 1);

        assert!(blog.profile_unfollow("user", "author").await.unwrap());
        assert!(!blog.profile_unfollow("user", "author").await.unwrap());
        assert!(blog.follow_index("user", None).await.unwrap().is_empty());
        let profile = blog.profile("author", None, Some("user")).await.unwrap();
        assert!(!profile.profile.following);
    }

    #[tokio::test]
    async fn self_follow_is_a_no_op() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.create_post("author", text("mine")).await.unwrap();

        assert!(!blog.profile_follow("author", "author").await.unwrap());
        assert!(blog.follow_index("author", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_author_can_edit() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.register_user("other").await.unwrap();
        let g = group(&blog, "g1").await;
        let post = blog.create_post("author", text("original")).await.unwrap();

        let edit = PostEdit {
            text: "changed".into(),
            group_id: Some(g.id),
            image: None,
        };

        let err = blog.edit_post("other", post.id, edit.clone()).await.unwrap_err();
        assert!(matches!(err, BlogError::Forbidden(_)));
        assert_eq!(blog.post_detail(post.id).await.unwrap().post.text, "original");

        let edited = blog.edit_post("author", post.id, edit).await.unwrap();
        assert_eq!(edited.id, post.id);
        assert_eq!(edited.text, "changed");
        assert_eq!(edited.group_slug.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn edit_without_image_keeps_the_stored_one() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        let post = blog
            .create_post(
                "author",
                NewPost {
                    image: Some("posts/small.gif".into()),
                    ..text("with picture")
                },
            )
            .await
            .unwrap();

        let edited = blog.edit_post("author", post.id, text("new text")).await.unwrap();
        assert_eq!(edited.text, "new text");
        assert_eq!(edited.image.as_deref(), Some("posts/small.gif"));

        let replaced = NewPost {
            image: Some("posts/big.gif".into()),
            ..text("new text")
        };
        let edited = blog.edit_post("author", post.id, replaced).await.unwrap();
        assert_eq!(edited.image.as_deref(), Some("posts/big.gif"));
    }

    #[tokio::test]
    async fn create_post_validates_input() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();

        let err = blog.create_post("author", text("  ")).await.unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));

        let err = blog
            .create_post(
                "author",
                NewPost {
                    group_id: Some(99),
                    ..text("orphan")
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));

        let err = blog.create_post("ghost", text("hello")).await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[tokio::test]
    async fn comments_show_on_post_detail() {
        let Fixture { blog, .. } = fixture(10).await;
        blog.register_user("author").await.unwrap();
        blog.register_user("reader").await.unwrap();
        let post = blog.create_post("author", text("post")).await.unwrap();

        let comment = blog.add_comment("reader", post.id, "Тестовый комментарий").await.unwrap();
        assert_eq!(comment.author_username, "reader");

        let detail = blog.post_detail(post.id).await.unwrap();
        assert_eq!(detail.comments, vec![comment]);
        assert_eq!(detail.author_posts_count, 1);

        let err = blog.add_comment("reader", 999, "lost").await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
        let err = blog.add_comment("reader", post.id, "").await.unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }
}
